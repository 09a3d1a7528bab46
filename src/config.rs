//! Tunables for the whole device. Defaults reproduce the shipped page.
//!
//! With the `serde` feature every struct deserializes with `#[serde(default)]`
//! so a page only needs to pass the fields it wants to override.

use crate::audio::{CueSheet, PendingPolicy};
use crate::error::{DeviceError, Result};
use crate::game::round::RevealPolicy;
use crate::title::NoiseMode;

#[cfg(feature = "serde")]
use serde::Deserialize;

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct DeviceConfig {
    pub round: RoundConfig,
    pub tilt: TiltConfig,
    pub title: TitleConfig,
    pub audio: AudioConfig,
    pub particles: ParticleConfig,
}

/// Round pacing, in milliseconds.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct RoundConfig {
    pub countdown_ticks: u8,
    pub countdown_interval_ms: u32,
    pub round_pause_ms: u32,
    pub reveal_delay_ms: u32,
    pub blink_interval_ms: u32,
    pub reveal: RevealPolicy,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: 3,
            countdown_interval_ms: 600,
            round_pause_ms: 1200,
            reveal_delay_ms: 400,
            blink_interval_ms: 800,
            reveal: RevealPolicy::Immediate,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct TiltConfig {
    /// Max rotation per axis, degrees.
    pub max_tilt: f64,
    /// Fraction of the remaining distance covered each frame.
    pub smoothing: f64,
    /// Pixels of translation per degree per unit of `data-depth`.
    pub parallax_px: f64,
    /// Device-orientation beta treated as "flat" (phone held at reading angle).
    pub rest_beta: f64,
    pub orientation_gain: f64,
}

impl Default for TiltConfig {
    fn default() -> Self {
        Self {
            max_tilt: 6.0,
            smoothing: 0.08,
            parallax_px: 1.5,
            rest_beta: 45.0,
            orientation_gain: 0.25,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct TitleConfig {
    pub text: String,
    pub font: String,
    pub color: String,
    pub width: u32,
    pub height: u32,
    pub noise: NoiseMode,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            text: "WHO'S RYAN".to_string(),
            font: "900 20px \"Arial Black\"".to_string(),
            color: "#121e12".to_string(),
            width: 160,
            height: 36,
            noise: NoiseMode::Hashed,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct AudioConfig {
    pub enabled: bool,
    /// Prefix joined with each sound's file name.
    pub base_url: String,
    pub pending: PendingPolicy,
    pub max_pending: usize,
    pub cues: CueSheet,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "sounds/".to_string(),
            pending: PendingPolicy::Queue,
            max_pending: 16,
            cues: CueSheet::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct ParticleConfig {
    pub enabled: bool,
    pub count: usize,
    pub opacity: f64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            count: 500,
            opacity: 0.65,
        }
    }
}

impl DeviceConfig {
    #[cfg(feature = "serde_json")]
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: DeviceConfig =
            serde_json::from_str(json).map_err(|e| DeviceError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let r = &self.round;
        if r.countdown_ticks == 0 {
            return Err(DeviceError::Config("round.countdown_ticks must be > 0".into()));
        }
        if r.countdown_interval_ms == 0 || r.round_pause_ms == 0 || r.blink_interval_ms == 0 {
            return Err(DeviceError::Config("round intervals must be > 0 ms".into()));
        }
        let t = &self.tilt;
        if !(t.smoothing > 0.0 && t.smoothing <= 1.0) {
            return Err(DeviceError::Config("tilt.smoothing must be in (0, 1]".into()));
        }
        if !(t.max_tilt.is_finite() && t.max_tilt > 0.0) {
            return Err(DeviceError::Config("tilt.max_tilt must be > 0".into()));
        }
        if self.title.width == 0 || self.title.height == 0 {
            return Err(DeviceError::Config("title canvas must not be empty".into()));
        }
        for (name, cue) in self.audio.cues.iter() {
            if !(0.0..=1.0).contains(&cue.gain) {
                return Err(DeviceError::Config(format!("audio.cues.{name}.gain must be in [0, 1]")));
            }
            if !(cue.rate.is_finite() && cue.rate > 0.0) {
                return Err(DeviceError::Config(format!("audio.cues.{name}.rate must be > 0")));
            }
        }
        if !(0.0..=1.0).contains(&self.particles.opacity) {
            return Err(DeviceError::Config("particles.opacity must be in [0, 1]".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        DeviceConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_smoothing_rejected() {
        let mut cfg = DeviceConfig::default();
        cfg.tilt.smoothing = 0.0;
        assert!(matches!(cfg.validate(), Err(DeviceError::Config(_))));
    }

    #[test]
    fn zero_interval_rejected() {
        let mut cfg = DeviceConfig::default();
        cfg.round.countdown_interval_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn cue_gain_out_of_range_rejected() {
        let mut cfg = DeviceConfig::default();
        cfg.audio.cues.win.gain = 1.5;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("audio.cues.win.gain"));

        let mut cfg = DeviceConfig::default();
        cfg.audio.cues.tick.rate = 0.0;
        assert!(matches!(cfg.validate(), Err(DeviceError::Config(_))));
    }

    #[cfg(feature = "serde_json")]
    #[test]
    fn cue_overrides_from_json() {
        let cfg = DeviceConfig::from_json(r#"{ "audio": { "cues": { "start": { "gain": 0.3, "rate": 1.0 } } } }"#)
            .unwrap();
        assert_eq!(cfg.audio.cues.start.gain, 0.3);
        assert_eq!(cfg.audio.cues.tick, CueSheet::default().tick);
        assert!(DeviceConfig::from_json(r#"{ "audio": { "cues": { "lose": { "gain": -1.0, "rate": 1.0 } } } }"#).is_err());
    }

    #[cfg(feature = "serde_json")]
    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = DeviceConfig::from_json(
            r#"{ "round": { "reveal": "at_zero", "round_pause_ms": 2000 }, "tilt": { "max_tilt": 8.0 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.round.reveal, RevealPolicy::AtZero);
        assert_eq!(cfg.round.round_pause_ms, 2000);
        assert_eq!(cfg.round.countdown_interval_ms, 600);
        assert_eq!(cfg.tilt.max_tilt, 8.0);
        assert_eq!(cfg.tilt.smoothing, 0.08);
        assert_eq!(cfg.title.text, "WHO'S RYAN");
    }

    #[cfg(feature = "serde_json")]
    #[test]
    fn invalid_json_values_are_config_errors() {
        let err = DeviceConfig::from_json(r#"{ "tilt": { "smoothing": 1.5 } }"#).unwrap_err();
        assert!(matches!(err, DeviceError::Config(_)));
        assert!(DeviceConfig::from_json("not json").is_err());
    }
}
