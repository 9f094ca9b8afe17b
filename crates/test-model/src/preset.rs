use serde::{Deserialize, Serialize};

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    /// A piece of reply text.
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    /// The stream breaks with the given message.
    #[serde(rename = "error")]
    Error(String),
}

/// The preset response for one user turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request is rejected up front with this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failure: None,
        }
    }

    /// Creates a response that streams `text` in a single event.
    #[inline]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::with_events([PresetEvent::MessageDelta(text.into())])
    }

    /// Creates a response whose request fails before any event.
    #[inline]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            events: vec![],
            failure: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let response = PresetResponse::with_events([
            PresetEvent::MessageDelta("Try X, ".to_owned()),
            PresetEvent::MessageDelta("Y, Z".to_owned()),
            PresetEvent::Error("connection reset".to_owned()),
        ]);

        let serialized = serde_json::to_string(&response).unwrap();
        let deserialized: PresetResponse =
            serde_json::from_str(&serialized).unwrap();
        assert_eq!(response, deserialized);

        let failing: PresetResponse =
            serde_json::from_str(r#"{"events": [], "failure": "quota"}"#)
                .unwrap();
        assert_eq!(failing, PresetResponse::failing("quota"));
    }
}
