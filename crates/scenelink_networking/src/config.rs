//! # Sync Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file is a valid config.
//!
//! ```toml
//! client_id = 3
//! server_host = "10.0.0.5"
//! update_targets = ["10.0.0.6:5557", "10.0.0.7:5557"]
//! light_intensity_factor = 0.5
//! scene_scale = 0.01
//! ```

use std::path::Path;

use scenelink_protocol::LoadSettings;
use scenelink_shared::{
    CLIENT_ID, DISTRIBUTION_PORT, MAX_UPDATE_FRAME, SERVER_ID, TICK_RATE, UPDATE_PORT,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Participant configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// This participant's id when running as a client; frames carrying it
    /// are ignored on receipt.
    pub client_id: u8,
    /// The server's participant id. Must differ from `client_id`.
    pub server_id: u8,
    /// Scene id stamped on update records.
    pub scene_id: u8,
    /// Host serving the scene package.
    pub server_host: String,
    /// Scene package stream port.
    pub distribution_port: u16,
    /// Port every live frame is broadcast on.
    pub update_port: u16,
    /// Ticks per second.
    pub tick_rate: u32,
    /// Where parameter updates are sent (`host:port`).
    pub update_targets: Vec<String>,
    /// Soft limit for one update frame.
    pub max_update_frame: usize,
    /// Resolve textures when loading a scene.
    pub load_textures: bool,
    /// Multiplier for light intensity.
    pub light_intensity_factor: f32,
    /// Multiplier for light range and camera clip planes.
    pub scene_scale: f32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            client_id: CLIENT_ID,
            server_id: SERVER_ID,
            scene_id: 0,
            server_host: "127.0.0.1".to_owned(),
            distribution_port: DISTRIBUTION_PORT,
            update_port: UPDATE_PORT,
            tick_rate: TICK_RATE,
            update_targets: Vec::new(),
            max_update_frame: MAX_UPDATE_FRAME,
            load_textures: true,
            light_intensity_factor: 1.0,
            scene_scale: 1.0,
        }
    }
}

impl SyncConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id == self.server_id {
            return Err(ConfigError::Invalid(format!(
                "client_id {} collides with server_id",
                self.client_id
            )));
        }
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tick_rate must be positive".to_owned()));
        }
        if !(self.light_intensity_factor.is_finite() && self.light_intensity_factor >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "light_intensity_factor {} must be finite and non-negative",
                self.light_intensity_factor
            )));
        }
        if !(self.scene_scale.is_finite() && self.scene_scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "scene_scale {} must be finite and positive",
                self.scene_scale
            )));
        }
        // Header plus one fixed-size record.
        if self.max_update_frame < 3 + 8 + 16 {
            return Err(ConfigError::Invalid(format!(
                "max_update_frame {} cannot hold a single update",
                self.max_update_frame
            )));
        }
        Ok(())
    }

    /// Receiver-side scene load settings.
    #[must_use]
    pub const fn load_settings(&self) -> LoadSettings {
        LoadSettings {
            load_textures: self.load_textures,
            light_intensity_factor: self.light_intensity_factor,
            scene_scale: self.scene_scale,
        }
    }

    /// `host:port` of the scene package stream.
    #[must_use]
    pub fn distribution_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.distribution_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(SyncConfig::from_toml_str("").unwrap(), SyncConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = SyncConfig::from_toml_str(
            r#"
            client_id = 7
            server_host = "10.0.0.5"
            update_targets = ["10.0.0.6:5557"]
            light_intensity_factor = 0.5
            scene_scale = 0.01
            load_textures = false
            "#,
        )
        .unwrap();
        assert_eq!(config.client_id, 7);
        assert_eq!(config.distribution_addr(), "10.0.0.5:5555");
        assert_eq!(config.update_targets, vec!["10.0.0.6:5557".to_owned()]);

        let settings = config.load_settings();
        assert!(!settings.load_textures);
        assert_eq!(settings.light_intensity_factor, 0.5);
        assert_eq!(settings.scene_scale, 0.01);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            SyncConfig::from_toml_str("tick_rate = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SyncConfig::from_toml_str("scene_scale = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SyncConfig::from_toml_str("max_update_frame = 4"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_default_ids_differ() {
        let config = SyncConfig::default();
        assert_ne!(config.client_id, config.server_id);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_colliding_ids_rejected() {
        assert!(matches!(
            SyncConfig::from_toml_str("client_id = 1"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(SyncConfig::from_toml_str("client_id = 1\nserver_id = 9").is_ok());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            SyncConfig::from_toml_str("client_id = \"one\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SyncConfig::load("/definitely/not/here.toml"),
            Err(ConfigError::Read { .. })
        ));
    }
}
