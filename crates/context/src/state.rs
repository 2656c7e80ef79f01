//! Belief about the user's context.

use crate::geo::GeoPoint;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Network axis of the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkState {
    Disconnected,
    Connected,
}

/// Location axis of the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationState {
    Unknown,
    Known,
}

/// Last known location and network association of the user's phone.
///
/// The two axes are independent. Only `ContextService` mutates this.
#[derive(Debug, Clone, Serialize)]
pub struct ContextState {
    current_location: Option<GeoPoint>,
    network_association: String,
    #[serde(skip)]
    disconnected_token: String,
    location_updated_at: Option<DateTime<Utc>>,
    network_updated_at: DateTime<Utc>,
}

impl ContextState {
    /// Fresh state: location unknown, network disconnected.
    pub fn new(disconnected_token: impl Into<String>) -> Self {
        let disconnected_token = disconnected_token.into();
        Self {
            current_location: None,
            network_association: disconnected_token.clone(),
            disconnected_token,
            location_updated_at: None,
            network_updated_at: Utc::now(),
        }
    }

    pub fn current_location(&self) -> Option<GeoPoint> {
        self.current_location
    }

    /// SSID, or the disconnected sentinel.
    pub fn network_association(&self) -> &str {
        &self.network_association
    }

    pub fn location_updated_at(&self) -> Option<DateTime<Utc>> {
        self.location_updated_at
    }

    pub fn network_updated_at(&self) -> DateTime<Utc> {
        self.network_updated_at
    }

    pub fn location_state(&self) -> LocationState {
        match self.current_location {
            Some(_) => LocationState::Known,
            None => LocationState::Unknown,
        }
    }

    pub fn network_state(&self) -> NetworkState {
        if self.network_association == self.disconnected_token {
            NetworkState::Disconnected
        } else {
            NetworkState::Connected
        }
    }

    /// Distance from the current location to `place`; `None` while unknown.
    pub fn distance_to(&self, place: &GeoPoint) -> Option<f64> {
        self.current_location.map(|here| here.distance_to(place))
    }

    /// Last write wins, no staleness check.
    pub(crate) fn update_location(&mut self, location: GeoPoint, at: DateTime<Utc>) {
        self.current_location = Some(location);
        self.location_updated_at = Some(at);
    }

    /// Returns false when already associated with `ssid`.
    pub(crate) fn connect(&mut self, ssid: &str, at: DateTime<Utc>) -> bool {
        if ssid == self.disconnected_token {
            return self.disconnect(at);
        }
        if self.network_association == ssid {
            return false;
        }
        self.network_association = ssid.to_string();
        self.network_updated_at = at;
        true
    }

    /// Returns false when already disconnected.
    pub(crate) fn disconnect(&mut self, at: DateTime<Utc>) -> bool {
        if self.network_state() == NetworkState::Disconnected {
            return false;
        }
        self.network_association = self.disconnected_token.clone();
        self.network_updated_at = at;
        true
    }
}
