//! Places, networks and thresholds the context service reasons about.

use crate::error::{ContextError, Result};
use crate::geo::GeoPoint;
use serde::{Deserialize, Serialize};

/// Location of home; it will not change.
pub const DEFAULT_HOME: GeoPoint = GeoPoint::from_degrees_unchecked(59.40365215, 17.94339358);

/// Location of the work place (Electrum); neither will this.
pub const DEFAULT_WORK: GeoPoint = GeoPoint::from_degrees_unchecked(59.404694, 17.949911);

/// Distance below which the user counts as "at" a place.
pub const DEFAULT_PROXIMITY_THRESHOLD_M: f64 = 100.0;

pub const DEFAULT_HOME_SSID: &str = "HALLNET_5";
pub const DEFAULT_WORK_SSID: &str = "eduroam";
pub const DEFAULT_DISCONNECTED_TOKEN: &str = "disconnected";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub home: GeoPoint,
    pub work: GeoPoint,
    pub proximity_threshold_m: f64,
    pub home_ssid: String,
    pub work_ssid: String,
    /// Network association value meaning "not on any WiFi".
    pub disconnected_token: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            home: DEFAULT_HOME,
            work: DEFAULT_WORK,
            proximity_threshold_m: DEFAULT_PROXIMITY_THRESHOLD_M,
            home_ssid: DEFAULT_HOME_SSID.to_string(),
            work_ssid: DEFAULT_WORK_SSID.to_string(),
            disconnected_token: DEFAULT_DISCONNECTED_TOKEN.to_string(),
        }
    }
}

impl ContextConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.proximity_threshold_m.is_finite() || self.proximity_threshold_m <= 0.0 {
            return Err(ContextError::InvalidConfig(format!(
                "proximity_threshold_m must be a positive number of meters, got {}",
                self.proximity_threshold_m
            )));
        }
        for (field, value) in [
            ("home_ssid", &self.home_ssid),
            ("work_ssid", &self.work_ssid),
            ("disconnected_token", &self.disconnected_token),
        ] {
            if value.trim().is_empty() {
                return Err(ContextError::InvalidConfig(format!("{} must not be empty", field)));
            }
        }
        if self.disconnected_token == self.home_ssid || self.disconnected_token == self.work_ssid {
            return Err(ContextError::InvalidConfig(format!(
                "disconnected_token '{}' collides with a configured SSID",
                self.disconnected_token
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ContextConfig::default();
        config.validate().unwrap();
        assert!(GeoPoint::new(DEFAULT_HOME.lat(), DEFAULT_HOME.lon()).is_ok());
        assert!(GeoPoint::new(DEFAULT_WORK.lat(), DEFAULT_WORK.lon()).is_ok());
    }

    #[test]
    fn test_rejects_bad_threshold() {
        for threshold in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let config = ContextConfig {
                proximity_threshold_m: threshold,
                ..ContextConfig::default()
            };
            assert!(matches!(config.validate(), Err(ContextError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_rejects_sentinel_collision() {
        let config = ContextConfig {
            disconnected_token: "eduroam".to_string(),
            ..ContextConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ContextConfig = toml::from_str(
            r#"
            home_ssid = "MyHome"
            work = { lat = 48.8566, lon = 2.3522 }
            "#,
        )
        .unwrap();
        assert_eq!(config.home_ssid, "MyHome");
        assert_eq!(config.work.lat(), 48.8566);
        assert_eq!(config.home, DEFAULT_HOME);
        assert_eq!(config.proximity_threshold_m, 100.0);
    }

    #[test]
    fn test_toml_rejects_invalid_coordinate() {
        let result: std::result::Result<ContextConfig, _> =
            toml::from_str("home = { lat = 91.0, lon = 0.0 }");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("invalid coordinate"), "{err}");
    }
}
