use std::collections::VecDeque;

use glam::Vec2;

/// Seconds a paw mark stays visible before it is dropped.
pub const FADE_WINDOW: f64 = 2.0;
/// Speed (px/tick) above which the sprite leaves marks.
const SPEED_THRESHOLD: f32 = 0.1;
/// Acceleration (px/tick/s) above which the sprite leaves marks.
const ACCEL_THRESHOLD: f32 = 0.5;
/// Spawn interval at rest (seconds).
const BASE_INTERVAL: f64 = 0.5;
/// Fastest allowed spawn cadence (seconds).
const MIN_INTERVAL: f64 = 0.2;
/// How quickly the cadence tightens with speed.
const SPAWN_RATE_FACTOR: f64 = 4.0;
/// Vertical offset applied to every other mark (left/right paw).
const PAW_STAGGER: f32 = 10.0;

/// A single paw print. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailMark {
    pub pos: Vec2,
    pub angle_degrees: f32,
    pub born: f64,
}

impl TrailMark {
    /// Linear fade from 1.0 at birth to 0.0 at the end of the window.
    pub fn alpha(&self, now: f64) -> f32 {
        let elapsed = (now - self.born).max(0.0);
        (1.0 - elapsed / FADE_WINDOW).clamp(0.0, 1.0) as f32
    }

    pub fn is_live(&self, now: f64) -> bool {
        now - self.born < FADE_WINDOW
    }
}

/// Time-ordered paw prints with speed-dependent spawn throttling.
pub struct PawTrail {
    marks: VecDeque<TrailMark>,
    last_spawn: Option<f64>,
    spawned: u64,
}

/// Spawn interval for a given speed, floored at `MIN_INTERVAL`.
pub fn spawn_interval(speed: f32) -> f64 {
    (BASE_INTERVAL / (1.0 + SPAWN_RATE_FACTOR * speed as f64)).max(MIN_INTERVAL)
}

impl PawTrail {
    pub fn new() -> Self {
        Self {
            marks: VecDeque::with_capacity(32),
            last_spawn: None,
            spawned: 0,
        }
    }

    /// Append a mark if the sprite is moving enough and the cadence allows.
    /// Returns true when a mark was added.
    pub fn maybe_spawn(
        &mut self,
        pos: Vec2,
        velocity: Vec2,
        speed: f32,
        acceleration: f32,
        now: f64,
    ) -> bool {
        if speed <= SPEED_THRESHOLD && acceleration <= ACCEL_THRESHOLD {
            return false;
        }
        if let Some(last) = self.last_spawn {
            if now - last < spawn_interval(speed) {
                return false;
            }
        }

        let angle_degrees = if velocity == Vec2::ZERO {
            0.0
        } else {
            velocity.y.atan2(velocity.x).to_degrees()
        };
        let stagger = if self.spawned % 2 == 1 { PAW_STAGGER } else { 0.0 };

        self.marks.push_back(TrailMark {
            pos: pos + Vec2::new(0.0, stagger),
            angle_degrees,
            born: now,
        });
        self.last_spawn = Some(now);
        self.spawned += 1;
        true
    }

    /// Drop marks older than the fade window. Call before every read pass.
    pub fn purge_expired(&mut self, now: f64) {
        while let Some(front) = self.marks.front() {
            if now - front.born > FADE_WINDOW {
                self.marks.pop_front();
            } else {
                break;
            }
        }
    }

    /// Live marks, oldest first.
    pub fn live(&self, now: f64) -> impl Iterator<Item = &TrailMark> {
        self.marks.iter().filter(move |m| m.is_live(now))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.marks.len()
    }
}
