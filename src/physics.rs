use glam::Vec2;

/// Fixed simulation timestep (seconds). Acceleration estimates always use
/// this, not the measured frame time.
pub const TICK_DT: f32 = 0.016;
/// How strongly the sprite accelerates toward its target.
const ACCEL: f32 = 0.03;
/// Velocity multiplier applied every tick.
const FRICTION: f32 = 0.75;
/// Extra offset proportional to velocity, for a parallax feel.
const PARALLAX: f32 = 0.15;
/// Constant horizontal drift so the sprite leads the cursor.
const LEAD_BIAS: f32 = -1.0;
/// Per-axis velocity below this snaps to zero when settling.
const SETTLE_EPSILON: f32 = 0.05;

/// Whether tiny velocities are snapped to zero after friction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClampPolicy {
    /// Calm following: lets the sprite come fully to rest.
    Settle,
    /// Rampage and takeover chase: never snaps, keeps creeping in.
    Continuous,
}

/// Spring constants for one chase profile.
#[derive(Debug, Clone, Copy)]
pub struct Tuning {
    pub accel: f32,
    pub friction: f32,
    pub parallax: f32,
    pub lead_bias: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            accel: ACCEL,
            friction: FRICTION,
            parallax: PARALLAX,
            lead_bias: LEAD_BIAS,
        }
    }
}

/// Sprite kinematic state. Previous velocity is kept for acceleration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    pub prev_velocity: Vec2,
}

/// Speed and acceleration magnitudes derived from one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    /// Displacement per tick the sprite actually makes (parallax and lead
    /// bias included).
    pub velocity: Vec2,
    pub speed: f32,
    pub acceleration: f32,
}

impl Body {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            prev_velocity: Vec2::ZERO,
        }
    }

    /// Teleport and stop.
    pub fn place(&mut self, position: Vec2) {
        self.position = position;
        self.velocity = Vec2::ZERO;
        self.prev_velocity = Vec2::ZERO;
    }

    /// Move along a scripted path: position is set directly and velocity
    /// becomes the per-tick displacement.
    pub fn slide_to(&mut self, position: Vec2) {
        self.prev_velocity = self.velocity;
        self.velocity = position - self.position;
        self.position = position;
    }

    /// Advance one tick toward `target`.
    pub fn integrate(&mut self, target: Vec2, tuning: &Tuning, clamp: ClampPolicy) {
        self.prev_velocity = self.velocity;

        let delta = target - self.position;
        self.velocity += delta * tuning.accel;
        self.velocity *= tuning.friction;

        if clamp == ClampPolicy::Settle {
            if self.velocity.x.abs() < SETTLE_EPSILON {
                self.velocity.x = 0.0;
            }
            if self.velocity.y.abs() < SETTLE_EPSILON {
                self.velocity.y = 0.0;
            }
        }

        self.position += self.velocity
            + Vec2::new(tuning.lead_bias, 0.0)
            + self.velocity * tuning.parallax;
    }

    /// Speed/acceleration for trail spawning.
    ///
    /// Speed and heading are taken from the displacement actually applied
    /// (parallax and lead bias included), not raw `velocity`: at rest the bias
    /// keeps `velocity.x` near 0.87 while the sprite does not move.
    pub fn sample(&self, tuning: &Tuning) -> MotionSample {
        let effective =
            self.velocity * (1.0 + tuning.parallax) + Vec2::new(tuning.lead_bias, 0.0);
        MotionSample {
            velocity: effective,
            speed: effective.length(),
            acceleration: (self.velocity - self.prev_velocity).length() / TICK_DT,
        }
    }

    /// Same as `sample` for bodies moved by `slide_to` (no lead bias).
    pub fn scripted_sample(&self) -> MotionSample {
        MotionSample {
            velocity: self.velocity,
            speed: self.velocity.length(),
            acceleration: (self.velocity - self.prev_velocity).length() / TICK_DT,
        }
    }
}

/// Where the sprite wants to be relative to the cursor: just left of it,
/// vertically centered.
pub fn follow_target(cursor: Vec2, sprite_size: Vec2) -> Vec2 {
    Vec2::new(cursor.x - sprite_size.x, cursor.y - sprite_size.y * 0.5)
}
