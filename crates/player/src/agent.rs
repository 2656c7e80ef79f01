//! Player agent - plays a track when a context event names this device.

use crate::error::{AgentError, Result};
use crate::tracks::{RandomTrackSelector, TrackPool, TrackSelector};
use sensemusic_audio::AudioOutput;
use sensemusic_events::{
    event_names, DeviceRole, Event, EventBus, QueryError, SubscriptionHandle, SubscriptionQuery,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Payload keywords that address each role, as a query fragment.
fn role_keywords(role: DeviceRole) -> &'static str {
    match role {
        DeviceRole::Laptop => "laptop",
        DeviceRole::Pc => "(home OR PC)",
        DeviceRole::Phone => "mobile",
    }
}

/// Query text a player for `role` subscribes with.
pub fn role_query_text(role: DeviceRole) -> String {
    format!(
        "name:{} AND {}",
        event_names::SENSE_MUSIC_CONTEXT,
        role_keywords(role)
    )
}

pub fn role_query(role: DeviceRole) -> std::result::Result<SubscriptionQuery, QueryError> {
    SubscriptionQuery::parse(&role_query_text(role))
}

pub struct PlayerAgent {
    role: DeviceRole,
    query: SubscriptionQuery,
    pool: TrackPool,
    selector: Box<dyn TrackSelector>,
    audio: Arc<dyn AudioOutput>,
    plays: u64,
}

impl PlayerAgent {
    /// Agent for `role` that picks tracks at random.
    pub fn new(role: DeviceRole, pool: TrackPool, audio: Arc<dyn AudioOutput>) -> Result<Self> {
        let query = role_query(role)?;
        if pool.is_empty() {
            return Err(AgentError::EmptyTrackPool);
        }
        Ok(Self {
            role,
            query,
            pool,
            selector: Box::new(RandomTrackSelector::new()),
            audio,
            plays: 0,
        })
    }

    pub fn with_selector(mut self, selector: impl TrackSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    pub fn role(&self) -> DeviceRole {
        self.role
    }

    pub fn query(&self) -> &SubscriptionQuery {
        &self.query
    }

    /// Tracks started so far.
    pub fn plays(&self) -> u64 {
        self.plays
    }

    /// Play a track if `event` is addressed to this device.
    ///
    /// Returns the track started, or `None` when the event does not match.
    pub fn on_event(&mut self, event: &Event) -> Result<Option<PathBuf>> {
        // Delivery may be looser than the query.
        if !self.query.matches(event) {
            tracing::trace!(name = %event.name, seq = event.sequence, "Event not for this player");
            return Ok(None);
        }

        let len = self.pool.len();
        let index = self.selector.select(len).ok_or(AgentError::EmptyTrackPool)?;
        let track = self
            .pool
            .path(index)
            .ok_or(AgentError::InvalidTrackIndex { index, len })?;

        tracing::info!(
            role = %self.role,
            track = %track.display(),
            seq = event.sequence,
            context = %event.value,
            "Playing track"
        );

        self.audio
            .play_track(&track)
            .map_err(|source| AgentError::Playback {
                track: track.clone(),
                source,
            })?;
        self.plays += 1;
        Ok(Some(track))
    }

    /// Handle an event and log any failure.
    pub fn dispatch(&mut self, event: Event) {
        if let Err(e) = self.on_event(&event) {
            tracing::warn!(role = %self.role, seq = event.sequence, "Playback failed: {}", e);
        }
    }

    /// Move the agent onto `bus` under its role query.
    pub fn attach(self, bus: &dyn EventBus) -> SubscriptionHandle {
        let query = self.query.clone();
        tracing::info!(role = %self.role, query = %query, "Player attached");
        let mut agent = self;
        bus.subscribe(query, Box::new(move |event| agent.dispatch(event)))
    }
}
