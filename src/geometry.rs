use glam::Vec2;

/// Axis-aligned rectangle in overlay pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Rect of size `size` with its top-left corner at `pos`.
    pub fn at(pos: Vec2, size: Vec2) -> Self {
        Self::new(pos.x, pos.y, size.x, size.y)
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.w, self.y + self.h)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    /// Corners in clockwise order starting top-left.
    pub fn corners(&self) -> [Vec2; 4] {
        let (lo, hi) = (self.min(), self.max());
        [
            lo,
            Vec2::new(hi.x, lo.y),
            hi,
            Vec2::new(lo.x, hi.y),
        ]
    }

    #[cfg(test)]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.x + self.w && p.y >= self.y && p.y <= self.y + self.h
    }

    /// Smallest rect covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let lo = self.min().min(other.min());
        let hi = self.max().max(other.max());
        Rect::new(lo.x, lo.y, hi.x - lo.x, hi.y - lo.y)
    }

    /// Uniform random point inside the rect.
    pub fn random_point(&self, rng: &mut fastrand::Rng) -> Vec2 {
        Vec2::new(self.x + rng.f32() * self.w, self.y + rng.f32() * self.h)
    }
}

/// Straight-line move from `from` to `to` over `duration` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearPath {
    pub from: Vec2,
    pub to: Vec2,
    pub start: f64,
    pub duration: f64,
}

impl LinearPath {
    /// Interpolation parameter, unclamped. Zero-length paths are complete.
    pub fn progress(&self, now: f64) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (now - self.start) / self.duration
    }

    pub fn point_at(&self, t: f64) -> Vec2 {
        self.from + (self.to - self.from) * t as f32
    }

    pub fn end_time(&self) -> f64 {
        self.start + self.duration
    }

    pub fn length(&self) -> f32 {
        self.from.distance(self.to)
    }
}

/// Screen edges, used to pick where the sprite leaves or enters from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom];

    pub fn opposite(self) -> Self {
        match self {
            Edge::Left => Edge::Right,
            Edge::Right => Edge::Left,
            Edge::Top => Edge::Bottom,
            Edge::Bottom => Edge::Top,
        }
    }
}

/// What the core knows about the displays: the work rect the pointer is
/// driven inside, and the union of every monitor for off-screen picks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenGeometry {
    pub available: Rect,
    pub virtual_desktop: Rect,
}

impl ScreenGeometry {
    pub fn single(available: Rect) -> Self {
        Self {
            available,
            virtual_desktop: available,
        }
    }

    /// Random point `margin` pixels beyond `edge` of the virtual desktop,
    /// spread uniformly along that edge.
    pub fn offscreen_point(&self, edge: Edge, margin: f32, rng: &mut fastrand::Rng) -> Vec2 {
        let v = &self.virtual_desktop;
        let (lo, hi) = (v.min(), v.max());
        match edge {
            Edge::Left => Vec2::new(lo.x - margin, lo.y + rng.f32() * v.h),
            Edge::Right => Vec2::new(hi.x + margin, lo.y + rng.f32() * v.h),
            Edge::Top => Vec2::new(lo.x + rng.f32() * v.w, lo.y - margin),
            Edge::Bottom => Vec2::new(lo.x + rng.f32() * v.w, hi.y + margin),
        }
    }

    /// Off-screen point beyond a randomly chosen edge.
    pub fn random_offscreen_point(&self, margin: f32, rng: &mut fastrand::Rng) -> Vec2 {
        let edge = Edge::ALL[rng.usize(0..Edge::ALL.len())];
        self.offscreen_point(edge, margin, rng)
    }

    #[cfg(test)]
    pub fn is_offscreen(&self, p: Vec2) -> bool {
        !self.virtual_desktop.contains(p)
    }
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        Self::single(Rect::new(0.0, 0.0, 1920.0, 1080.0))
    }
}
