use booksense_model::{ModelFinishReason, ModelMessage, ModelRequest};
use serde::{Deserialize, Serialize};

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub model_version: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    pub code: Option<u16>,
    pub message: String,
    pub status: Option<String>,
}

// --------------------------
// Types in both directions
// --------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    // Set on reasoning summaries of thinking models, which are not part of
    // the visible reply.
    #[serde(default, skip_serializing_if = "is_false")]
    pub thought: bool,
}

#[inline]
fn is_false(value: &bool) -> bool {
    !*value
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(req: &ModelRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: req.messages.iter().map(create_content).collect(),
    }
}

#[inline]
fn create_content(msg: &ModelMessage) -> Content {
    let role = match msg {
        ModelMessage::User(_) => "user",
        ModelMessage::Model(_) => "model",
    };
    Content {
        role: Some(role.to_owned()),
        parts: vec![Part {
            text: Some(msg.text().to_owned()),
            thought: false,
        }],
    }
}

/// What a candidate's finish reason means for the reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinishReason {
    Finished(ModelFinishReason),
    Blocked(String),
}

pub fn parse_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Finished(ModelFinishReason::Stop),
        "MAX_TOKENS" => FinishReason::Finished(ModelFinishReason::MaxTokens),
        "SAFETY" | "RECITATION" | "LANGUAGE" | "BLOCKLIST"
        | "PROHIBITED_CONTENT" | "SPII" | "OTHER" => {
            FinishReason::Blocked(reason.to_owned())
        }
        _ => FinishReason::Finished(ModelFinishReason::Other),
    }
}

impl Candidate {
    /// Returns the visible text in this candidate, skipping thoughts.
    pub fn text(&self) -> Option<String> {
        let parts = &self.content.as_ref()?.parts;
        let texts: Vec<&str> = parts
            .iter()
            .filter(|p| !p.thought)
            .filter_map(|p| p.text.as_deref())
            .collect();
        if texts.is_empty() {
            return None;
        }
        Some(texts.concat())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            model: "gemini-2.5-flash".to_owned(),
            messages: vec![
                ModelMessage::Model("Hi, I am BookSense.".to_owned()),
                ModelMessage::User("Recommend 3 books".to_owned()),
            ],
        };
        let body = serde_json::to_value(create_request(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [
                    { "role": "model", "parts": [{ "text": "Hi, I am BookSense." }] },
                    { "role": "user", "parts": [{ "text": "Recommend 3 books" }] },
                ]
            })
        );
    }

    #[test]
    fn test_candidate_text_skips_thoughts() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Let me think", "thought": true },
                        { "text": "Try " },
                        { "text": "Dune" }
                    ]
                }
            }],
            "modelVersion": "gemini-2.5-flash"
        }))
        .unwrap();
        assert_eq!(resp.candidates[0].text().as_deref(), Some("Try Dune"));
        assert_eq!(resp.model_version.as_deref(), Some("gemini-2.5-flash"));
    }

    #[test]
    fn test_finish_reasons() {
        assert_eq!(
            parse_finish_reason("STOP"),
            FinishReason::Finished(ModelFinishReason::Stop)
        );
        assert_eq!(
            parse_finish_reason("SAFETY"),
            FinishReason::Blocked("SAFETY".to_owned())
        );
        assert_eq!(
            parse_finish_reason("FINISH_REASON_UNSPECIFIED"),
            FinishReason::Finished(ModelFinishReason::Other)
        );
    }
}
