//! Context service - turns raw phone events into context events.

use crate::config::ContextConfig;
use crate::error::{ContextError, Result};
use crate::geo::GeoPoint;
use crate::selector::{DeviceSelector, DeviceVerdict};
use crate::state::{ContextState, NetworkState};
use sensemusic_events::{event_names, Event, EventBusRef, SubscriptionHandle, SubscriptionQuery};

/// Outcome of handling one inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum Handled {
    LocationUpdated(GeoPoint),
    NetworkChanged(NetworkState),
    /// Connect/disconnect that matched the current association.
    NetworkUnchanged,
    /// Play intent answered with this context event.
    Published(Event),
    /// Play intent while the location is unknown; nothing was published.
    LocationUnknown,
    /// Event this service does not react to.
    Ignored,
}

/// Owns the context belief and answers play intents.
///
/// All handling is sequential: the service is either driven directly
/// through [`ContextService::handle`] or moved into a single bus
/// subscription by [`ContextService::attach`].
pub struct ContextService {
    config: ContextConfig,
    selector: DeviceSelector,
    state: ContextState,
    bus: EventBusRef,
    next_sequence: u64,
}

impl ContextService {
    pub fn new(config: ContextConfig, bus: EventBusRef) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            selector: DeviceSelector::new(&config),
            state: ContextState::new(config.disconnected_token.clone()),
            config,
            bus,
            next_sequence: 0,
        })
    }

    pub fn state(&self) -> &ContextState {
        &self.state
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Sequence number the next published context event will carry.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Every event name the service consumes, as one query.
    pub fn subscription_query() -> SubscriptionQuery {
        SubscriptionQuery::any_name(&[
            event_names::PHONE_LOCATION,
            event_names::PHONE_WIFI_CONNECT,
            event_names::PHONE_WIFI_DISCONNECT,
            event_names::PLAY_SOME_MUSIC,
        ])
    }

    /// Apply one event. Errors leave the state untouched.
    pub fn handle(&mut self, event: &Event) -> Result<Handled> {
        match event.name.as_str() {
            event_names::PHONE_LOCATION => self.on_location(event),
            event_names::PHONE_WIFI_CONNECT => {
                let ssid = event.value.to_string();
                let changed = self.state.connect(&ssid, event.timestamp);
                Ok(self.on_network(changed))
            }
            event_names::PHONE_WIFI_DISCONNECT => {
                let changed = self.state.disconnect(event.timestamp);
                Ok(self.on_network(changed))
            }
            event_names::PLAY_SOME_MUSIC => self.on_play_intent(),
            _ => Ok(Handled::Ignored),
        }
    }

    /// Handle an event and log any failure; never panics on bad input.
    pub fn dispatch(&mut self, event: Event) {
        if let Err(e) = self.handle(&event) {
            tracing::warn!(name = %event.name, seq = event.sequence, "Failed to handle event: {}", e);
        }
    }

    /// Move the service onto the bus as one subscription.
    ///
    /// The bus serializes callbacks per subscription, so the state is only
    /// ever touched from one thread at a time.
    pub fn attach(self) -> SubscriptionHandle {
        let bus = self.bus.clone();
        let query = Self::subscription_query();
        tracing::info!(query = %query, "Context service attached");
        let mut service = self;
        bus.subscribe(query, Box::new(move |event| service.dispatch(event)))
    }

    fn on_location(&mut self, event: &Event) -> Result<Handled> {
        let payload = event.value.to_string();
        let location: GeoPoint = payload
            .parse()
            .map_err(|source| ContextError::MalformedLocation {
                payload: payload.clone(),
                source,
            })?;

        self.state.update_location(location, event.timestamp);
        tracing::debug!(%location, "Location updated");
        Ok(Handled::LocationUpdated(location))
    }

    fn on_network(&self, changed: bool) -> Handled {
        if !changed {
            tracing::debug!(
                network = self.state.network_association(),
                "Network association unchanged"
            );
            return Handled::NetworkUnchanged;
        }

        let network_state = self.state.network_state();
        tracing::debug!(
            network = self.state.network_association(),
            state = ?network_state,
            "Network association changed"
        );
        Handled::NetworkChanged(network_state)
    }

    fn on_play_intent(&mut self) -> Result<Handled> {
        let Some(verdict) = self.selector.select_for(&self.state) else {
            tracing::info!("Play intent while location is unknown, not publishing");
            return Ok(Handled::LocationUnknown);
        };

        tracing::debug!(
            home_m = ?self.state.distance_to(&self.config.home),
            work_m = ?self.state.distance_to(&self.config.work),
            network = self.state.network_association(),
            "Play intent"
        );

        self.publish_verdict(verdict).map(Handled::Published)
    }

    fn publish_verdict(&mut self, verdict: DeviceVerdict) -> Result<Event> {
        let sequence = self.next_sequence;
        // Advanced on every attempt; a gap downstream reveals a lost publish.
        self.next_sequence += 1;

        let event =
            Event::new(event_names::SENSE_MUSIC_CONTEXT, verdict.rationale()).with_sequence(sequence);
        self.bus.publish(event.clone())?;

        tracing::info!(
            verdict = %verdict,
            target = %verdict.target_role(),
            seq = sequence,
            "Published context"
        );
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensemusic_events::{EventBus, InMemoryEventBus, PublishError};
    use std::sync::Arc;

    fn service() -> (Arc<InMemoryEventBus>, ContextService) {
        let bus = Arc::new(InMemoryEventBus::new());
        let service = ContextService::new(ContextConfig::default(), bus.clone()).unwrap();
        (bus, service)
    }

    fn location(payload: &str) -> Event {
        Event::new(event_names::PHONE_LOCATION, payload)
    }

    fn play() -> Event {
        Event::new(event_names::PLAY_SOME_MUSIC, "")
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = ContextConfig {
            proximity_threshold_m: -1.0,
            ..ContextConfig::default()
        };
        let result = ContextService::new(config, Arc::new(InMemoryEventBus::new()));
        assert!(matches!(result, Err(ContextError::InvalidConfig(_))));
    }

    #[test]
    fn test_play_without_location_publishes_nothing() {
        let (bus, mut service) = service();
        service
            .handle(&Event::new(event_names::PHONE_WIFI_CONNECT, "HALLNET_5"))
            .unwrap();

        assert_eq!(service.handle(&play()).unwrap(), Handled::LocationUnknown);
        assert!(bus.is_empty());
        assert_eq!(service.next_sequence(), 0);
    }

    #[test]
    fn test_play_at_home() {
        let (bus, mut service) = service();
        service.handle(&location("59.40365,17.94340")).unwrap();

        let Handled::Published(event) = service.handle(&play()).unwrap() else {
            panic!("expected a published context event");
        };
        assert_eq!(event.name, event_names::SENSE_MUSIC_CONTEXT);
        assert_eq!(event.value.to_string(), DeviceVerdict::AtHome.rationale());
        assert_eq!(bus.events(), vec![event]);
    }

    #[test]
    fn test_play_on_work_network() {
        let (bus, mut service) = service();
        service.handle(&location("59.3293,18.0686")).unwrap();
        service
            .handle(&Event::new(event_names::PHONE_WIFI_CONNECT, "eduroam"))
            .unwrap();
        service.handle(&play()).unwrap();

        let published = bus.events_named(event_names::SENSE_MUSIC_CONTEXT);
        assert_eq!(published.len(), 1);
        assert!(published[0].value.to_string().contains("laptop"));
    }

    #[test]
    fn test_play_while_mobile() {
        let (bus, mut service) = service();
        service.handle(&location("59.3293, 18.0686")).unwrap();
        service.handle(&play()).unwrap();
        assert_eq!(
            bus.events()[0].value.to_string(),
            DeviceVerdict::Mobile.rationale()
        );
    }

    #[test]
    fn test_malformed_location_leaves_state_unchanged() {
        let (_bus, mut service) = service();
        service.handle(&location("59.40365,17.94340")).unwrap();
        let before = service.state().current_location();

        for payload in ["nowhere", "59.4", "123,0"] {
            let err = service.handle(&location(payload)).unwrap_err();
            assert!(matches!(err, ContextError::MalformedLocation { .. }), "{payload}");
        }
        let err = service
            .handle(&Event::new(event_names::PHONE_LOCATION, 59.4))
            .unwrap_err();
        assert!(err.to_string().contains("59.4"));

        assert_eq!(service.state().current_location(), before);
    }

    #[test]
    fn test_dispatch_survives_bad_events() {
        let (bus, mut service) = service();
        service.dispatch(location("garbage"));
        service.dispatch(location("59.40365,17.94340"));
        service.dispatch(play());
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn test_network_transitions() {
        let (_bus, mut service) = service();
        let connect = Event::new(event_names::PHONE_WIFI_CONNECT, "eduroam");
        let disconnect = Event::new(event_names::PHONE_WIFI_DISCONNECT, "");

        assert_eq!(
            service.handle(&connect).unwrap(),
            Handled::NetworkChanged(NetworkState::Connected)
        );
        assert_eq!(service.handle(&connect).unwrap(), Handled::NetworkUnchanged);
        assert_eq!(service.state().network_association(), "eduroam");

        assert_eq!(
            service.handle(&disconnect).unwrap(),
            Handled::NetworkChanged(NetworkState::Disconnected)
        );
        assert_eq!(service.handle(&disconnect).unwrap(), Handled::NetworkUnchanged);
        assert_eq!(service.state().network_association(), "disconnected");
    }

    #[test]
    fn test_unrelated_events_are_ignored() {
        let (bus, mut service) = service();
        let event = Event::new(event_names::SENSE_MUSIC_CONTEXT, "I'm mobile.");
        assert_eq!(service.handle(&event).unwrap(), Handled::Ignored);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_sequence_strictly_increases() {
        let (bus, mut service) = service();
        service.handle(&location("59.40365,17.94340")).unwrap();
        for _ in 0..5 {
            service.handle(&play()).unwrap();
        }
        let sequences: Vec<u64> = bus.events().iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_failed_publish_still_advances_sequence() {
        let (bus, mut service) = service();
        service.handle(&location("59.40365,17.94340")).unwrap();
        bus.close();

        let err = service.handle(&play()).unwrap_err();
        assert!(matches!(err, ContextError::Publish(PublishError::Closed)));
        assert_eq!(service.next_sequence(), 1);
    }

    #[test]
    fn test_attach_routes_bus_events() {
        let bus = Arc::new(InMemoryEventBus::new());
        let service = ContextService::new(ContextConfig::default(), bus.clone()).unwrap();
        service.attach();
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(location("59.404694,17.949911")).unwrap();
        bus.publish(play()).unwrap();

        let published = bus.events_named(event_names::SENSE_MUSIC_CONTEXT);
        assert_eq!(published.len(), 1);
        assert_eq!(
            published[0].value.to_string(),
            DeviceVerdict::AtWorkLocation.rationale()
        );
    }
}
