//! Generative-AI chat backend / AI 聊天后端
//!
//! Talks to the Gemini generateContent API: a system instruction steers the
//! model toward flashcard generation, and a `generate_cards` function
//! declaration lets it return structured front/back pairs instead of prose.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One prior chat turn as sent by the client. `role` 1 is the user, anything
/// else the model (mirrors the mobile client's history encoding).
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryMessage {
    pub role: i64,
    pub parts: Vec<String>,
}

/// A flashcard suggested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSuggestion {
    pub front: String,
    pub back: String,
}

/// Parsed chat reply: free text plus any structured card suggestions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatReply {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<CardSuggestion>>,
    /// Raw response parts, passed through for the client's own parsing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_response_parts: Option<Value>,
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

fn system_context(language: &str) -> String {
    format!(
        "Please help a user with a question. Please provide a concise short answer. \
         You can generate new cards for the users. In this case: do not ask the user \
         to give you front and back text of each card, you need to come up with it as \
         an assistant. Just ask about what kind of cards they need, and how many. Also, \
         if not clear from the context: level and details of the topic. Front and back \
         sides both should be text only. Always use the tool to suggest flashcards. Do \
         not suggest flashcards in the text directly. User's language is {}. Reply in \
         user's language.",
        language
    )
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    /// Send one chat turn and parse the reply.
    pub async fn chat(
        &self,
        message: &str,
        language: &str,
        history: &[HistoryMessage],
    ) -> Result<ChatReply, String> {
        if self.api_key.is_empty() {
            return Err("AI backend API key not configured".to_string());
        }

        let mut contents: Vec<Value> = history
            .iter()
            .map(|h| {
                json!({
                    "role": if h.role == 1 { "user" } else { "model" },
                    "parts": h.parts.iter().map(|p| json!({"text": p})).collect::<Vec<_>>(),
                })
            })
            .collect();
        contents.push(json!({
            "role": "user",
            "parts": [{"text": message}],
        }));

        let body = json!({
            "system_instruction": {
                "parts": [{"text": system_context(language)}]
            },
            "contents": contents,
            "tools": [{
                "function_declarations": [{
                    "name": "generate_cards",
                    "description": "Generates flashcards for the user. Each item in \
                        front_sides must correspond to an item in back_sides.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "front_sides": {
                                "type": "array",
                                "items": {"type": "string"}
                            },
                            "back_sides": {
                                "type": "array",
                                "items": {"type": "string"}
                            }
                        },
                        "required": ["front_sides", "back_sides"]
                    }
                }]
            }]
        });

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("AI backend request failed: {}", e))?;

        if !resp.status().is_success() {
            return Err(format!("AI backend returned HTTP {}", resp.status()));
        }

        let response: Value = resp
            .json()
            .await
            .map_err(|e| format!("invalid AI backend response: {}", e))?;

        parse_response(&response)
    }
}

/// Pull text and `generate_cards` calls out of the first candidate's parts.
fn parse_response(response: &Value) -> Result<ChatReply, String> {
    let parts = response
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| "AI backend response has no content parts".to_string())?;

    let mut reply = ChatReply {
        original_response_parts: Some(Value::Array(parts.clone())),
        ..Default::default()
    };

    for part in parts {
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            reply.message.push_str(text);
        } else if let Some(call) = part.get("functionCall") {
            let name = call.get("name").and_then(|n| n.as_str()).unwrap_or("");
            if name != "generate_cards" {
                tracing::warn!("AI backend called unknown function {:?}", name);
                continue;
            }
            if let Some(cards) = extract_cards(call.get("args")) {
                reply.cards = Some(cards);
            }
        }
    }

    Ok(reply)
}

/// Zip front_sides/back_sides into card suggestions. Mismatched lengths mean
/// the call is malformed and yields no cards.
fn extract_cards(args: Option<&Value>) -> Option<Vec<CardSuggestion>> {
    let args = args?;
    let fronts = string_array(args.get("front_sides")?)?;
    let backs = string_array(args.get("back_sides")?)?;
    if fronts.len() != backs.len() {
        tracing::warn!(
            "generate_cards arguments mismatched: {} fronts, {} backs",
            fronts.len(),
            backs.len()
        );
        return None;
    }
    Some(
        fronts
            .into_iter()
            .zip(backs)
            .map(|(front, back)| CardSuggestion { front, back })
            .collect(),
    )
}

fn string_array(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(|s| s.to_string()))
        .collect()
}

/// Canned reply used when the config enables fake mode (offline development).
pub fn fake_reply() -> ChatReply {
    ChatReply {
        message: "Fake response from AI".to_string(),
        cards: None,
        original_response_parts: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_only_response() {
        let response = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Hello "},
                        {"text": "there"}
                    ]
                }
            }]
        });
        let reply = parse_response(&response).unwrap();
        assert_eq!(reply.message, "Hello there");
        assert!(reply.cards.is_none());
        assert!(reply.original_response_parts.is_some());
    }

    #[test]
    fn test_parse_function_call_response() {
        let response = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here are your cards."},
                        {"functionCall": {
                            "name": "generate_cards",
                            "args": {
                                "front_sides": ["perro", "gato"],
                                "back_sides": ["dog", "cat"]
                            }
                        }}
                    ]
                }
            }]
        });
        let reply = parse_response(&response).unwrap();
        assert_eq!(reply.message, "Here are your cards.");
        assert_eq!(
            reply.cards.unwrap(),
            vec![
                CardSuggestion {
                    front: "perro".into(),
                    back: "dog".into()
                },
                CardSuggestion {
                    front: "gato".into(),
                    back: "cat".into()
                },
            ]
        );
    }

    #[test]
    fn test_mismatched_card_sides_are_dropped() {
        let response = json!({
            "candidates": [{
                "content": {
                    "parts": [{"functionCall": {
                        "name": "generate_cards",
                        "args": {
                            "front_sides": ["uno", "dos"],
                            "back_sides": ["one"]
                        }
                    }}]
                }
            }]
        });
        let reply = parse_response(&response).unwrap();
        assert!(reply.cards.is_none());
    }

    #[test]
    fn test_empty_response_is_error() {
        assert!(parse_response(&json!({})).is_err());
        assert!(parse_response(&json!({"candidates": []})).is_err());
    }
}
