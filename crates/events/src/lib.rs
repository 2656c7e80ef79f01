//! Shared event contracts for every SenseMusic service.
//!
//! This crate defines the event shape that flows over the bus, the
//! subscription query language used to filter it, and the `EventBus`
//! trait that services publish and subscribe through.

mod bus;
mod event;
mod query;

pub use bus::{
    EventBus, EventBusRef, EventHandler, InMemoryEventBus, NullEventBus, PublishError,
    SubscriptionHandle,
};
pub use event::{DeviceRole, Event, EventValue};
pub use query::{matches, Operator, QueryError, SubscriptionQuery, Term};

/// Event names as constants to prevent typos.
pub mod event_names {
    /// Phone reported a new position ("lat,lon").
    pub const PHONE_LOCATION: &str = "PhoneLocation";
    /// Phone joined a WiFi network (payload is the SSID).
    pub const PHONE_WIFI_CONNECT: &str = "PhoneWifiConnect";
    /// Phone left its WiFi network.
    pub const PHONE_WIFI_DISCONNECT: &str = "PhoneWifiDisconnect";
    /// User wants music now.
    pub const PLAY_SOME_MUSIC: &str = "PlaySomeMusic";
    /// Inferred playback context, consumed by players.
    pub const SENSE_MUSIC_CONTEXT: &str = "SenseMusicContext";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_wire_shape() {
        let event = Event::new(event_names::SENSE_MUSIC_CONTEXT, "I'm mobile.").with_sequence(3);
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["name"], "SenseMusicContext");
        assert_eq!(json["value"], "I'm mobile.");
        assert_eq!(json["sequence"], 3);
        assert!(json["timestamp"].is_string());
    }
}
