//! RPS Device core crate.
//!
//! A Rock-Paper-Scissors toy rendered as a little handheld: a countdown round
//! loop against a uniformly random opponent, a glitching title, a tilting
//! body with parallax layers and gloss, a particle backdrop, and sound cues
//! that respect browser autoplay rules.
//!
//! The game logic (`game`, `tilt`, `title`, `audio`, `particles`) is plain
//! Rust and runs under `cargo test` on the host. `device` and the `*::canvas`
//! / `*::rig` / `*::web` modules are the browser glue.

use wasm_bindgen::prelude::*;

pub mod audio;
pub mod config;
mod device;
pub mod error;
pub mod game;
pub mod particles;
pub mod schedule;
pub mod tilt;
pub mod title;

pub use config::DeviceConfig;
pub use error::DeviceError;

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    let level = if cfg!(debug_assertions) {
        log::Level::Debug
    } else {
        log::Level::Info
    };
    // A second init (hot reload) just keeps the first logger.
    console_log::init_with_level(level).ok();
}

// -----------------------------------------------------------------------------
// Entrypoints
// -----------------------------------------------------------------------------

/// Boot the device with the built-in defaults.
#[wasm_bindgen]
pub fn start_device() -> Result<(), JsValue> {
    device::boot(DeviceConfig::default())?;
    Ok(())
}

/// Boot the device with JSON overrides, e.g. `{"round":{"reveal":"at_zero"}}`.
#[cfg(feature = "serde_json")]
#[wasm_bindgen]
pub fn start_device_with_config(json: &str) -> Result<(), JsValue> {
    device::boot(DeviceConfig::from_json(json)?)?;
    Ok(())
}
