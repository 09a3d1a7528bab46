//! Glitch-sweep title.
//!
//! A band sweeps back and forth across the pre-rendered label; thin vertical
//! slices inside the band are shifted up or down by noise that fades with
//! distance from the band's center.

pub mod canvas;

use rand::Rng;
use rand::rngs::SmallRng;

#[cfg(feature = "serde")]
use serde::Deserialize;

pub const SLICE_PX: f64 = 3.0;
pub const BREAK_RADIUS: f64 = 50.0;
pub const SWEEP_MARGIN: f64 = 40.0;
pub const TIME_STEP: f64 = 0.04;
const MAX_JITTER_PX: f64 = 6.0;
const WOBBLE_PX: f64 = 0.6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(rename_all = "snake_case"))]
pub enum NoiseMode {
    /// Repeatable hash of (slice, time).
    #[default]
    Hashed,
    Random,
}

/// One slice copy: source and destination share `x`/`width`, destination y is `y_offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SliceDraw {
    pub x: f64,
    pub width: f64,
    pub y_offset: f64,
}

/// `fract(sin(seed·999)·10000)`, sign preserved like a float remainder.
pub fn hash_noise(seed: f64) -> f64 {
    ((seed * 999.0).sin() * 10_000.0) % 1.0
}

pub struct GlitchTitle {
    t: f64,
    noise: NoiseMode,
    rng: SmallRng,
}

impl GlitchTitle {
    pub fn new(noise: NoiseMode, rng: SmallRng) -> Self {
        Self { t: 0.0, noise, rng }
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn restart(&mut self) {
        self.t = 0.0;
    }

    /// Center of the glitch band for the current time. Travels from `-margin`
    /// to `width + margin` and back.
    pub fn sweep(&self, width: f64) -> f64 {
        ((self.t * 0.6).cos() * -0.5 + 0.5) * (width + SWEEP_MARGIN * 2.0) - SWEEP_MARGIN
    }

    /// Slices for this frame, then advance time one step.
    pub fn frame(&mut self, width: f64) -> Vec<SliceDraw> {
        let sweep = self.sweep(width);
        let mut out = Vec::with_capacity((width / SLICE_PX).ceil() as usize);
        let mut x = 0.0;
        while x < width {
            let dist = (x - sweep).abs();
            let mut y_offset = 0.0;
            if dist < BREAK_RADIUS {
                let strength = 1.0 - dist / BREAK_RADIUS;
                let noise = match self.noise {
                    NoiseMode::Hashed => hash_noise(((x + self.t * 40.0) / 10.0).floor()),
                    NoiseMode::Random => self.rng.random::<f64>(),
                };
                y_offset = (noise - 0.5) * strength * MAX_JITTER_PX;
                y_offset += (self.t * 0.8).sin() * WOBBLE_PX;
            }
            out.push(SliceDraw {
                x,
                width: SLICE_PX.min(width - x),
                y_offset,
            });
            x += SLICE_PX;
        }
        self.t += TIME_STEP;
        out
    }
}
