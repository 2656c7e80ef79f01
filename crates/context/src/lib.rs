//! Context inference for SenseMusic.
//!
//! This crate keeps a belief about where the user is and decides which
//! device should play when music is requested. It tracks:
//! - Phone location (last reported coordinate)
//! - WiFi association (SSID, or disconnected)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Domain Layer                             │
//! │  geo.rs      - GeoPoint and great-circle distance (pure)    │
//! │  state.rs    - ContextState, the two independent axes       │
//! │  selector.rs - DeviceVerdict and priority resolution (pure) │
//! │  config.rs   - places, SSIDs, proximity threshold           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Application Layer                          │
//! │  service.rs  - event handling and context publication       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sensemusic_context::{ContextConfig, ContextService};
//! use std::sync::Arc;
//!
//! let bus = Arc::new(LocalBus::new());
//! let service = ContextService::new(ContextConfig::default(), bus.clone())?;
//! service.attach();
//! ```

mod config;
mod error;
mod geo;
mod selector;
mod service;
mod state;

pub use config::{
    ContextConfig, DEFAULT_DISCONNECTED_TOKEN, DEFAULT_HOME, DEFAULT_HOME_SSID,
    DEFAULT_PROXIMITY_THRESHOLD_M, DEFAULT_WORK, DEFAULT_WORK_SSID,
};
pub use error::{ContextError, Result};
pub use geo::{GeoError, GeoPoint, EARTH_RADIUS_M};
pub use selector::{DeviceSelector, DeviceVerdict};
pub use service::{ContextService, Handled};
pub use state::{ContextState, LocationState, NetworkState};
