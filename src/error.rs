//! Error taxonomy for the device.
//!
//! Only boot can fail hard (missing markup, bad config). Everything that
//! happens after boot is logged and degraded instead of surfaced.

use wasm_bindgen::JsValue;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("missing element: {0}")]
    MissingElement(&'static str),
    #[error("javascript error: {0}")]
    Js(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("audio unavailable: {0}")]
    AudioUnavailable(String),
}

impl From<JsValue> for DeviceError {
    fn from(value: JsValue) -> Self {
        DeviceError::Js(value.as_string().unwrap_or_else(|| format!("{value:?}")))
    }
}

impl From<DeviceError> for JsValue {
    fn from(err: DeviceError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

pub type Result<T, E = DeviceError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_selector() {
        let err = DeviceError::MissingElement(".screen-text");
        assert_eq!(err.to_string(), "missing element: .screen-text");
    }

    #[test]
    fn config_errors_carry_reason() {
        let err = DeviceError::Config("tilt.smoothing must be in (0, 1]".into());
        assert!(err.to_string().contains("smoothing"));
    }
}
