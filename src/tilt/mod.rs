//! Device tilt: input mapping, smoothing, parallax and gloss.
//!
//! Inputs only move the *target*. Each frame the current rotation covers a
//! fixed fraction of the remaining distance, so the device lags behind the
//! pointer with a little inertia instead of snapping.

pub mod rig;

use crate::config::TiltConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TiltState {
    pub current_x: f64,
    pub current_y: f64,
    pub target_x: f64,
    pub target_y: f64,
}

pub struct Tilt {
    config: TiltConfig,
    state: TiltState,
}

impl Tilt {
    pub fn new(config: TiltConfig) -> Self {
        Self {
            config,
            state: TiltState::default(),
        }
    }

    pub fn state(&self) -> TiltState {
        self.state
    }

    pub fn max_tilt(&self) -> f64 {
        self.config.max_tilt
    }

    fn clamp(&self, v: f64) -> f64 {
        if v.is_finite() {
            v.clamp(-self.config.max_tilt, self.config.max_tilt)
        } else {
            0.0
        }
    }

    pub fn set_target(&mut self, x: f64, y: f64) {
        self.state.target_x = self.clamp(x);
        self.state.target_y = self.clamp(y);
    }

    /// Pointer or touch at `(px, py)` relative to an element of `width × height`.
    /// Pointer low on the element tips the top away (negative X).
    pub fn point_at(&mut self, px: f64, py: f64, width: f64, height: f64) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let cx = width / 2.0;
        let cy = height / 2.0;
        let max = self.config.max_tilt;
        self.set_target(((py - cy) / cy) * -max, ((px - cx) / cx) * max);
    }

    /// `deviceorientation` sample. Either angle may be missing on some hardware.
    pub fn orient(&mut self, beta: Option<f64>, gamma: Option<f64>) {
        let (Some(beta), Some(gamma)) = (beta, gamma) else {
            return;
        };
        let gain = self.config.orientation_gain;
        self.set_target(-(beta - self.config.rest_beta) * gain, gamma * gain);
    }

    /// Pointer/touch left the device.
    pub fn release(&mut self) {
        self.state.target_x = 0.0;
        self.state.target_y = 0.0;
    }

    /// One frame of exponential smoothing.
    pub fn step(&mut self) -> TiltState {
        let k = self.config.smoothing;
        let s = &mut self.state;
        s.current_x += (s.target_x - s.current_x) * k;
        s.current_y += (s.target_y - s.current_y) * k;
        *s
    }

    /// CSS transform for the device body.
    pub fn transform_css(&self) -> String {
        format!(
            "rotateX({:.3}deg) rotateY({:.3}deg)",
            self.state.current_x, self.state.current_y
        )
    }

    /// Screen offset in px for a layer at `depth`. Deeper (larger) layers travel further.
    pub fn parallax(&self, depth: f64) -> (f64, f64) {
        let k = depth * self.config.parallax_px;
        (self.state.current_y * k, -self.state.current_x * k)
    }

    pub fn gloss(&self) -> Gloss {
        Gloss::from_rotation(self.state.current_x, self.state.current_y, self.config.max_tilt)
    }
}

/// Specular highlight drawn over the device face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gloss {
    /// Highlight center, percent of the element box.
    pub x_pct: f64,
    pub y_pct: f64,
    /// Peak alpha of the highlight.
    pub intensity: f64,
    /// Direction of the sheen band, degrees.
    pub angle_deg: f64,
}

impl Gloss {
    const BASE: f64 = 0.12;
    const RANGE: f64 = 0.18;
    const TRAVEL_PCT: f64 = 40.0;

    pub fn from_rotation(rot_x: f64, rot_y: f64, max_tilt: f64) -> Self {
        let nx = (rot_x / max_tilt).clamp(-1.0, 1.0);
        let ny = (rot_y / max_tilt).clamp(-1.0, 1.0);
        // Highlight slides opposite to the face turning away from the light.
        let x_pct = 50.0 - ny * Self::TRAVEL_PCT;
        let y_pct = 50.0 + nx * Self::TRAVEL_PCT;
        let magnitude = (nx.hypot(ny) / std::f64::consts::SQRT_2).min(1.0);
        Self {
            x_pct,
            y_pct,
            intensity: Self::BASE + Self::RANGE * magnitude,
            angle_deg: 135.0 + ny * 25.0 - nx * 25.0,
        }
    }

    pub fn to_css(self) -> String {
        format!(
            "linear-gradient({:.1}deg, rgba(255,255,255,{:.3}) 0%, rgba(255,255,255,0) 45%), \
             radial-gradient(circle at {:.1}% {:.1}%, rgba(255,255,255,{:.3}) 0%, rgba(255,255,255,0) 60%)",
            self.angle_deg,
            self.intensity * 0.5,
            self.x_pct,
            self.y_pct,
            self.intensity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tilt() -> Tilt {
        Tilt::new(TiltConfig::default())
    }

    #[test]
    fn pointer_corners_hit_the_limits() {
        let mut t = tilt();
        t.point_at(200.0, 0.0, 200.0, 100.0);
        assert_eq!(t.state().target_x, 6.0);
        assert_eq!(t.state().target_y, 6.0);
        t.point_at(-500.0, 900.0, 200.0, 100.0);
        assert_eq!(t.state().target_x, -6.0);
        assert_eq!(t.state().target_y, -6.0);
    }

    #[test]
    fn centre_is_flat() {
        let mut t = tilt();
        t.point_at(100.0, 50.0, 200.0, 100.0);
        assert_eq!((t.state().target_x, t.state().target_y), (0.0, 0.0));
    }

    #[test]
    fn step_moves_a_fraction() {
        let mut t = tilt();
        t.set_target(5.0, -5.0);
        let s = t.step();
        assert!((s.current_x - 0.4).abs() < 1e-12);
        assert!((s.current_y + 0.4).abs() < 1e-12);
    }

    #[test]
    fn orientation_missing_axis_is_ignored() {
        let mut t = tilt();
        t.set_target(3.0, 3.0);
        t.orient(Some(10.0), None);
        assert_eq!(t.state().target_x, 3.0);
        t.orient(Some(45.0), Some(8.0));
        assert_eq!(t.state().target_x, 0.0);
        assert_eq!(t.state().target_y, 2.0);
    }

    #[test]
    fn nan_targets_are_flattened() {
        let mut t = tilt();
        t.set_target(f64::NAN, f64::INFINITY);
        assert_eq!((t.state().target_x, t.state().target_y), (0.0, 0.0));
    }

    #[test]
    fn gloss_at_rest_is_centered() {
        let g = Gloss::from_rotation(0.0, 0.0, 6.0);
        assert_eq!((g.x_pct, g.y_pct), (50.0, 50.0));
        assert!((g.intensity - 0.12).abs() < 1e-12);
        assert_eq!(g.angle_deg, 135.0);
    }
}
