//! Line-delimited JSON event feed.
//!
//! Each non-empty line is one event in its wire form, for example
//! `{"name": "PhoneLocation", "value": "59.40365,17.94340"}`. Lines
//! starting with `#` are comments.

use sensemusic_events::{Event, EventBus, EventBusRef, PublishError};
use std::io::BufRead;
use std::thread::JoinHandle;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    pub published: usize,
    pub rejected: usize,
}

/// Publish every event read from `reader` until EOF or the bus closes.
pub fn publish_lines<R: BufRead>(reader: R, bus: &dyn EventBus) -> FeedStats {
    let mut stats = FeedStats::default();

    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(line = line_number, "Failed to read event feed: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let event = match Event::from_json(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(line = line_number, "Skipping malformed event: {}", e);
                stats.rejected += 1;
                continue;
            }
        };

        tracing::debug!(name = %event.name, value = %event.value, "Feeding event");
        match bus.publish(event) {
            Ok(()) => stats.published += 1,
            Err(PublishError::Closed) => {
                tracing::debug!("Bus closed, stopping event feed");
                break;
            }
            Err(e) => {
                tracing::warn!(line = line_number, "Failed to publish event: {}", e);
                stats.rejected += 1;
            }
        }
    }

    stats
}

/// Feed stdin to `bus` on a background thread.
pub fn spawn_stdin_feed(bus: EventBusRef) -> std::io::Result<JoinHandle<FeedStats>> {
    std::thread::Builder::new()
        .name("stdin-feed".to_string())
        .spawn(move || {
            let stats = publish_lines(std::io::stdin().lock(), bus.as_ref());
            tracing::info!(
                published = stats.published,
                rejected = stats.rejected,
                "Event feed ended"
            );
            stats
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensemusic_events::InMemoryEventBus;
    use std::io::Cursor;

    #[test]
    fn test_publishes_each_line() {
        let bus = InMemoryEventBus::new();
        let input = r#"
# phone at home
{"name": "PhoneLocation", "value": "59.40365,17.94340"}
{"name": "PhoneWifiConnect", "value": "HALLNET_5", "sequence": 4}

{"name": "PlaySomeMusic", "value": 1}
"#;
        let stats = publish_lines(Cursor::new(input), &bus);

        assert_eq!(stats, FeedStats { published: 3, rejected: 0 });
        let names: Vec<String> = bus.events().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["PhoneLocation", "PhoneWifiConnect", "PlaySomeMusic"]);
        assert_eq!(bus.events()[1].sequence, 4);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let bus = InMemoryEventBus::new();
        let input = "not json\n{\"name\": \"PlaySomeMusic\"}\n{\"name\": \"PlaySomeMusic\", \"value\": \"\"}\n";
        let stats = publish_lines(Cursor::new(input), &bus);
        assert_eq!(stats, FeedStats { published: 1, rejected: 2 });
    }

    #[test]
    fn test_stops_when_bus_closes() {
        let bus = InMemoryEventBus::new();
        bus.close();
        let input = "{\"name\": \"A\", \"value\": 1}\n{\"name\": \"B\", \"value\": 2}\n";
        let stats = publish_lines(Cursor::new(input), &bus);
        assert_eq!(stats, FeedStats::default());
    }
}
