// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! Runtime configuration from the `params` string passed to setup.
//!
//! The string is a comma-separated list of `key=value` pairs and bare flags:
//!
//! ```text
//! width=1280,height=720,fullscreen,title=Kiosk
//! ```

use crate::error::ConfigError;

/// Initial window width when none is configured.
pub const DEFAULT_WIDTH: u32 = 1024;
/// Initial window height when none is configured.
pub const DEFAULT_HEIGHT: u32 = 768;

/// Backend configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FdoConfig {
    /// Initial window width in logical pixels.
    pub width: u32,
    /// Initial window height in logical pixels.
    pub height: u32,
    /// Start fullscreen.
    pub fullscreen: bool,
    /// Toplevel title.
    pub title: String,
}

impl Default for FdoConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fullscreen: false,
            title: String::from("Cog"),
        }
    }
}

impl FdoConfig {
    /// Parses `params`; `None` or an empty string yields the defaults.
    ///
    /// Unknown keys are ignored with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidNumber`] if `width` or `height` is not a
    /// positive integer.
    pub fn parse(params: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let Some(params) = params else {
            return Ok(config);
        };

        for item in params.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = match item.split_once('=') {
                Some((key, value)) => (key.trim(), Some(value.trim())),
                None => (item, None),
            };
            match (key, value) {
                ("width", Some(value)) => config.width = parse_dimension(key, value)?,
                ("height", Some(value)) => config.height = parse_dimension(key, value)?,
                ("fullscreen", None) => config.fullscreen = true,
                ("fullscreen", Some(value)) => {
                    config.fullscreen = matches!(value, "1" | "true" | "yes");
                }
                ("title", Some(value)) => config.title = value.to_owned(),
                _ => log::warn!("ignoring unknown backend parameter `{item}`"),
            }
        }
        Ok(config)
    }
}

fn parse_dimension(key: &str, value: &str) -> Result<u32, ConfigError> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            key: key.to_owned(),
            value: value.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_HEIGHT, DEFAULT_WIDTH, FdoConfig};
    use crate::error::ConfigError;

    #[test]
    fn missing_params_use_defaults() {
        assert_eq!(FdoConfig::parse(None), Ok(FdoConfig::default()));
        assert_eq!(FdoConfig::parse(Some("")), Ok(FdoConfig::default()));
    }

    #[test]
    fn parses_all_keys() {
        let config =
            FdoConfig::parse(Some("width=1280, height=720,fullscreen,title=Kiosk")).unwrap();
        assert_eq!(
            config,
            FdoConfig {
                width: 1280,
                height: 720,
                fullscreen: true,
                title: "Kiosk".into(),
            }
        );
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = FdoConfig::parse(Some("vsync=off,width=800")).unwrap();
        assert_eq!(config.width, 800);
        assert_eq!(config.height, DEFAULT_HEIGHT);
    }

    #[test]
    fn rejects_bad_dimensions() {
        for params in ["width=wide", "height=0", "width=-3"] {
            let err = FdoConfig::parse(Some(params)).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidNumber { .. }), "{params}");
        }
        assert_eq!(FdoConfig::default().width, DEFAULT_WIDTH);
    }
}
