use std::str::FromStr;

use glam::Vec2;

/// UDP port the cancel command is expected on.
pub const DEFAULT_PORT: u16 = 47474;
/// Default delay before a rampage starts (seconds).
const DEFAULT_RAMPAGE_DELAY: (f64, f64) = (600.0, 1200.0);
/// Default wait between scripted runs while idle (seconds).
const DEFAULT_RUN_GAP: (f64, f64) = (8.0, 20.0);

/// Deployment knobs. Algorithm constants live next to the code using them.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the signal listener binds on all interfaces.
    pub port: u16,
    /// Seconds until a rampage activates, drawn uniformly.
    pub rampage_delay: (f64, f64),
    /// Seconds between scripted runs while idle, drawn uniformly.
    pub run_gap: (f64, f64),
    /// Sprite pixel size (from the asset loader).
    pub sprite_size: Vec2,
    /// Paw mark pixel size.
    pub mark_size: Vec2,
    /// Speech bubble box size.
    pub bubble_size: Vec2,
    /// Fixed RNG seed for reproducible sessions.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            rampage_delay: DEFAULT_RAMPAGE_DELAY,
            run_gap: DEFAULT_RUN_GAP,
            sprite_size: Vec2::new(96.0, 96.0),
            mark_size: Vec2::new(24.0, 24.0),
            bubble_size: Vec2::new(220.0, 64.0),
            seed: None,
        }
    }
}

impl Config {
    /// Defaults overridden by `PAWCHASE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(port) = parse_var(&lookup, "PAWCHASE_PORT") {
            cfg.port = port;
        }
        if let Some(seed) = parse_var(&lookup, "PAWCHASE_SEED") {
            cfg.seed = Some(seed);
        }

        cfg.rampage_delay = parse_range(
            &lookup,
            ("PAWCHASE_RAMPAGE_MIN", "PAWCHASE_RAMPAGE_MAX"),
            cfg.rampage_delay,
        );
        cfg.run_gap = parse_range(&lookup, ("PAWCHASE_RUN_MIN", "PAWCHASE_RUN_MAX"), cfg.run_gap);
        cfg.sprite_size = parse_size(
            &lookup,
            ("PAWCHASE_SPRITE_W", "PAWCHASE_SPRITE_H"),
            cfg.sprite_size,
        );
        cfg.mark_size = parse_size(&lookup, ("PAWCHASE_MARK_W", "PAWCHASE_MARK_H"), cfg.mark_size);

        cfg
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("{key}={raw:?} is not valid, using default");
            None
        }
    }
}

/// Seconds range from a min/max pair. Both ends must be positive and ordered.
fn parse_range<F>(lookup: &F, (min_key, max_key): (&str, &str), default: (f64, f64)) -> (f64, f64)
where
    F: Fn(&str) -> Option<String>,
{
    let min = parse_var::<f64, _>(lookup, min_key).unwrap_or(default.0);
    let max = parse_var::<f64, _>(lookup, max_key).unwrap_or(default.1);
    if min > 0.0 && min <= max {
        (min, max)
    } else {
        log::warn!("Ignoring {min_key}..{max_key} = {min}..{max}, keeping defaults");
        default
    }
}

/// Pixel size from a width/height pair. Non-positive dimensions keep the default.
fn parse_size<F>(lookup: &F, (w_key, h_key): (&str, &str), default: Vec2) -> Vec2
where
    F: Fn(&str) -> Option<String>,
{
    let w = parse_var::<f32, _>(lookup, w_key).unwrap_or(default.x);
    let h = parse_var::<f32, _>(lookup, h_key).unwrap_or(default.y);
    if w > 0.0 && h > 0.0 {
        Vec2::new(w, h)
    } else {
        log::warn!("Ignoring {w_key}x{h_key} = {w}x{h}, keeping defaults");
        default
    }
}
