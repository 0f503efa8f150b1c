//! Request DTOs for the advisory service
//!
//! These types are both the HTTP request bodies and the values cache keys are
//! derived from. User ids serialize as `userId`, which places every cached
//! answer in the user's key namespace.

use serde::{Deserialize, Serialize};

/// Maximum accepted length of a chat message in characters
pub const MAX_MESSAGE_LENGTH: usize = 4000;

// == Advisory Request ==
/// A request to the remote advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdvisoryRequest {
    /// Product recommendations for a user's desired effects
    Recommendations(RecommendationRequest),
    /// A conversational question
    Chat(ChatRequest),
}

impl AdvisoryRequest {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            AdvisoryRequest::Recommendations(req) => req.user_id.as_deref(),
            AdvisoryRequest::Chat(req) => req.user_id.as_deref(),
        }
    }

    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if let Some(user_id) = self.user_id() {
            if user_id.is_empty() || user_id.contains(':') {
                return Some("userId must be non-empty and must not contain ':'".to_string());
            }
        }

        match self {
            AdvisoryRequest::Recommendations(req) => {
                if req.effects.is_empty() {
                    return Some("At least one effect is required".to_string());
                }
            }
            AdvisoryRequest::Chat(req) => {
                if req.message.trim().is_empty() {
                    return Some("Message cannot be empty".to_string());
                }
                if req.message.chars().count() > MAX_MESSAGE_LENGTH {
                    return Some(format!(
                        "Message exceeds maximum length of {} characters",
                        MAX_MESSAGE_LENGTH
                    ));
                }
            }
        }
        None
    }
}

// == Recommendation Request ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Desired effects, in priority order
    pub effects: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub avoid: Vec<String>,
}

// == Chat Request ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub message: String,
    /// Previous turns of the conversation, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_request_deserialize() {
        let json = r#"{"kind":"recommendations","userId":"u1","effects":["happy"]}"#;
        let req: AdvisoryRequest = serde_json::from_str(json).unwrap();

        assert_eq!(req.user_id(), Some("u1"));
        assert!(matches!(req, AdvisoryRequest::Recommendations(ref r) if r.effects == ["happy"]));
    }

    #[test]
    fn test_chat_request_deserialize() {
        let json = r#"{"kind":"chat","message":"hello"}"#;
        let req: AdvisoryRequest = serde_json::from_str(json).unwrap();

        assert_eq!(req.user_id(), None);
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_serialized_form_is_flat() {
        let req = AdvisoryRequest::Recommendations(RecommendationRequest {
            user_id: Some("u1".into()),
            effects: vec!["relaxed".into()],
            experience_level: None,
            avoid: vec![],
        });
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value["kind"], "recommendations");
        assert_eq!(value["userId"], "u1");
        assert!(value.get("avoid").is_none());
    }

    #[test]
    fn test_validate_empty_effects() {
        let req = AdvisoryRequest::Recommendations(RecommendationRequest {
            user_id: None,
            effects: vec![],
            experience_level: None,
            avoid: vec![],
        });
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_user_id_with_separator() {
        let req = AdvisoryRequest::Chat(ChatRequest {
            user_id: Some("a:b".into()),
            message: "hi".into(),
            history: vec![],
        });
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_long_message() {
        let req = AdvisoryRequest::Chat(ChatRequest {
            user_id: None,
            message: "x".repeat(MAX_MESSAGE_LENGTH + 1),
            history: vec![],
        });
        assert!(req.validate().is_some());
    }
}
