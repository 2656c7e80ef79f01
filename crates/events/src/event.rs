//! Event model shared by every bus participant.
//!
//! This is the single source of truth for the wire shape
//! `{name, value, sequence, timestamp}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload carried by an event: free text or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventValue {
    Number(f64),
    Text(String),
}

impl EventValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            EventValue::Text(text) => Some(text),
            EventValue::Number(_) => None,
        }
    }
}

/// String form used by keyword matching and payload parsing.
impl std::fmt::Display for EventValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventValue::Text(text) => f.write_str(text),
            EventValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for EventValue {
    fn from(value: &str) -> Self {
        EventValue::Text(value.to_string())
    }
}

impl From<String> for EventValue {
    fn from(value: String) -> Self {
        EventValue::Text(value)
    }
}

impl From<f64> for EventValue {
    fn from(value: f64) -> Self {
        EventValue::Number(value)
    }
}

impl From<i64> for EventValue {
    fn from(value: i64) -> Self {
        EventValue::Number(value as f64)
    }
}

/// A single message travelling over the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name (e.g. "PhoneLocation").
    pub name: String,
    /// Payload.
    pub value: EventValue,
    /// Per-publisher counter, for ordering diagnostics only.
    #[serde(default)]
    pub sequence: u64,
    /// Time the event was created.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an event stamped with the current time and sequence 0.
    pub fn new(name: impl Into<String>, value: impl Into<EventValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            sequence: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Decode one event from its JSON wire form.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Class of physical device a player runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    Laptop,
    Pc,
    Phone,
}

impl DeviceRole {
    pub fn label(&self) -> &'static str {
        match self {
            DeviceRole::Laptop => "laptop",
            DeviceRole::Pc => "pc",
            DeviceRole::Phone => "phone",
        }
    }
}

impl std::fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for DeviceRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "laptop" => Ok(DeviceRole::Laptop),
            "pc" => Ok(DeviceRole::Pc),
            "phone" => Ok(DeviceRole::Phone),
            other => Err(format!("unknown device role '{}' (expected laptop, pc or phone)", other)),
        }
    }
}
