//! Event data structures
//!
//! An [`Event`] is created once, at `track()` time, and never mutated
//! afterwards. It travels queue → in-flight batch → back to the queue on
//! failure, or is discarded on a terminal outcome.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Free-form key/value map used for payloads and metadata
pub type Properties = HashMap<String, Value>;

/// One immutable record of a tracked occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Properties>,
    /// Epoch milliseconds at creation; preserved through persistence
    pub issued_at: i64,
    /// Global metadata already merged with event-level metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Properties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
}

impl Event {
    /// Create a bare event stamped with the current time
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
            issued_at: chrono::Utc::now().timestamp_millis(),
            metadata: None,
            session_id: None,
            platform: None,
        }
    }
}

/// Where an event was produced, tagged by `"type"` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Platform {
    Web {
        browser: BrowserInfo,
        device: DeviceInfo,
        os: OsInfo,
    },
    Native {
        device: DeviceInfo,
        os: OsInfo,
    },
    Server,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserInfo {
    pub name: String,
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsInfo {
    pub name: String,
    pub version: Option<String>,
}

/// Capability implemented by strongly-typed events
///
/// ```
/// use courier_core::{Properties, TrackEvent};
/// use serde_json::json;
///
/// struct Purchase {
///     order_id: String,
///     amount: f64,
/// }
///
/// impl TrackEvent for Purchase {
///     fn name(&self) -> &str {
///         "purchase"
///     }
///
///     fn to_payload(&self) -> Option<Properties> {
///         let mut payload = Properties::new();
///         payload.insert("orderId".to_string(), json!(self.order_id));
///         payload.insert("amount".to_string(), json!(self.amount));
///         Some(payload)
///     }
/// }
/// ```
pub trait TrackEvent {
    fn name(&self) -> &str;
    fn to_payload(&self) -> Option<Properties>;
}

/// Capability implemented by strongly-typed metadata
pub trait TrackMetadata {
    fn to_map(&self) -> Properties;
}

/// Untyped event: a name plus an optional payload
#[derive(Debug, Clone, PartialEq)]
pub struct NamedEvent {
    pub name: String,
    pub payload: Option<Properties>,
}

impl NamedEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Properties) -> Self {
        self.payload = Some(payload);
        self
    }
}

impl TrackEvent for NamedEvent {
    fn name(&self) -> &str {
        &self.name
    }

    fn to_payload(&self) -> Option<Properties> {
        self.payload.clone()
    }
}

/// Untyped metadata backed by a plain map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataMap(pub Properties);

impl TrackMetadata for MetadataMap {
    fn to_map(&self) -> Properties {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_creation_stamps_time() {
        let before = chrono::Utc::now().timestamp_millis();
        let event = Event::new("app.open");
        assert_eq!(event.name, "app.open");
        assert!(event.issued_at >= before);
        assert!(event.payload.is_none());
    }

    #[test]
    fn test_event_wire_keys_are_camel_case() {
        let mut event = Event::new("signup");
        event.session_id = Some("1700000000000-123456".to_string());
        event.platform = Some(Platform::Server);

        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("issuedAt").is_some());
        assert_eq!(value["sessionId"], json!("1700000000000-123456"));
        assert_eq!(value["platform"], json!({"type": "server"}));
        assert!(value.get("payload").is_none());
    }

    #[test]
    fn test_platform_discriminator() {
        let native = Platform::Native {
            device: DeviceInfo {
                name: "build-host".to_string(),
                version: None,
            },
            os: OsInfo {
                name: "Linux".to_string(),
                version: Some("6.1".to_string()),
            },
        };
        let value = serde_json::to_value(&native).unwrap();
        assert_eq!(value["type"], json!("native"));
        assert_eq!(value["os"]["name"], json!("Linux"));

        let parsed: Platform = serde_json::from_value(json!({
            "type": "web",
            "browser": {"name": "Firefox", "version": "128"},
            "device": {"name": "desktop", "version": null},
            "os": {"name": "macOS", "version": "14"}
        }))
        .unwrap();
        assert!(matches!(parsed, Platform::Web { .. }));
    }

    #[test]
    fn test_named_event_payload() {
        let mut payload = Properties::new();
        payload.insert("button".to_string(), json!("submit"));
        let event = NamedEvent::new("click").with_payload(payload.clone());
        assert_eq!(event.name(), "click");
        assert_eq!(event.to_payload(), Some(payload));
    }
}
