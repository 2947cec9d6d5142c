use crate::engine::mode::ModeKind;
use crate::geometry::Rect;

/// One paw print as the renderer should draw it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkView {
    pub rect: Rect,
    pub angle_degrees: f32,
    pub alpha: f32,
}

/// Speech bubble shown during a rampage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bubble {
    pub text: &'static str,
    pub rect: Rect,
}

/// Everything the renderer needs for one frame. Rectangles only, no pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub mode: ModeKind,
    pub sprite: Rect,
    /// Oldest first.
    pub marks: Vec<MarkView>,
    pub bubble: Option<Bubble>,
}

impl Frame {
    /// Regions that must receive input (sprite, marks, bubble). Everything
    /// else on the overlay is click-through.
    pub fn mask_rects(&self) -> Vec<Rect> {
        let mut rects = Vec::with_capacity(self.marks.len() + 2);
        rects.push(self.sprite);
        rects.extend(self.marks.iter().map(|m| m.rect));
        if let Some(bubble) = &self.bubble {
            rects.push(bubble.rect);
        }
        rects
    }
}
