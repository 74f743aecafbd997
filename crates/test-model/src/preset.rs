use reflexion_model::ToolCallRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    #[serde(rename = "tool_call")]
    ToolCall(ToolCallRequest),
}

/// The preset response for one model request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request will fail in the first `failures` attempts.
    /// `Some(0)` means the request will fail infinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failures: Option<u64>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failures: None,
        }
    }

    /// Creates a response that only streams `text`.
    #[inline]
    pub fn with_text<S: Into<String>>(text: S) -> Self {
        Self::with_events([PresetEvent::MessageDelta(text.into())])
    }

    /// Creates a response consisting of a single tool call, which is what a
    /// structured-output request expects.
    #[inline]
    pub fn with_tool_call<ID: Into<String>, N: Into<String>>(
        id: ID,
        name: N,
        arguments: Value,
    ) -> Self {
        Self::with_events([PresetEvent::ToolCall(ToolCallRequest {
            id: id.into(),
            name: name.into(),
            arguments,
        })])
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_wire_format() {
        let response = PresetResponse::with_events([
            PresetEvent::MessageDelta("Looking it up.".to_owned()),
            PresetEvent::ToolCall(ToolCallRequest {
                id: "1".to_owned(),
                name: "web_search".to_owned(),
                arguments: json!({ "query": "isro launches" }),
            }),
        ]);

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "events": [
                    { "type": "message_delta", "data": "Looking it up." },
                    {
                        "type": "tool_call",
                        "data": {
                            "id": "1",
                            "name": "web_search",
                            "arguments": { "query": "isro launches" }
                        }
                    }
                ]
            })
        );

        let parsed: PresetResponse = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, response);
        assert_eq!(parsed.failures, None);
    }
}
