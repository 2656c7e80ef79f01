//! Device selection.
//!
//! Pure decision logic - no I/O, no clock.

use crate::config::ContextConfig;
use crate::geo::GeoPoint;
use crate::state::ContextState;
use sensemusic_events::DeviceRole;
use serde::Serialize;

/// Where the user appears to be, and so which device should play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeviceVerdict {
    /// Near home or on the home network: play on the PC.
    AtHome,
    /// Near work or on the work network: play on the laptop.
    AtWorkLocation,
    /// Anywhere else: play on the phone.
    Mobile,
}

impl DeviceVerdict {
    /// Human-readable rationale, published as the context event payload.
    ///
    /// Players select on keywords in these sentences.
    pub fn rationale(&self) -> &'static str {
        match self {
            DeviceVerdict::AtHome => "I'm at home, probably want to play music on PC.",
            DeviceVerdict::AtWorkLocation => "I'm in Electrum, laptop is a good candidate.",
            DeviceVerdict::Mobile => "I'm mobile. Should I just play back on the phone?",
        }
    }

    pub fn target_role(&self) -> DeviceRole {
        match self {
            DeviceVerdict::AtHome => DeviceRole::Pc,
            DeviceVerdict::AtWorkLocation => DeviceRole::Laptop,
            DeviceVerdict::Mobile => DeviceRole::Phone,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeviceVerdict::AtHome => "AtHome",
            DeviceVerdict::AtWorkLocation => "AtWorkLocation",
            DeviceVerdict::Mobile => "Mobile",
        }
    }
}

impl std::fmt::Display for DeviceVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Maps a known location plus network association to a verdict.
#[derive(Debug, Clone)]
pub struct DeviceSelector {
    home: GeoPoint,
    work: GeoPoint,
    threshold_m: f64,
    home_ssid: String,
    work_ssid: String,
}

impl DeviceSelector {
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            home: config.home,
            work: config.work,
            threshold_m: config.proximity_threshold_m,
            home_ssid: config.home_ssid.clone(),
            work_ssid: config.work_ssid.clone(),
        }
    }

    /// Resolve the verdict.
    ///
    /// Priority (first match wins):
    /// 1. AtHome (near home, or on the home network)
    /// 2. AtWorkLocation (near work, or on the work network)
    /// 3. Mobile (fallback)
    ///
    /// Being near home therefore beats being on the work network.
    pub fn select(&self, location: &GeoPoint, network_association: &str) -> DeviceVerdict {
        if location.distance_to(&self.home) < self.threshold_m
            || network_association == self.home_ssid
        {
            return DeviceVerdict::AtHome;
        }

        if location.distance_to(&self.work) < self.threshold_m
            || network_association == self.work_ssid
        {
            return DeviceVerdict::AtWorkLocation;
        }

        DeviceVerdict::Mobile
    }

    /// `None` while the location is unknown; there is no verdict then.
    pub fn select_for(&self, state: &ContextState) -> Option<DeviceVerdict> {
        let location = state.current_location()?;
        Some(self.select(&location, state.network_association()))
    }
}
