//! Response-shape probing.
//!
//! Completion backends disagree on where the generated text lives. The known
//! shapes are tried in [`EXTRACTION_ORDER`] and the first one that yields
//! non-blank text wins.

use serde_json::Value;

/// A known location of generated text in a backend reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{"content": "..."}` (llama.cpp)
    ContentString,
    /// `{"content": [{"text": ".."}, {"content": ".."}]}`
    ContentSegments,
    /// `{"choices": [{"text": "..."}]}`
    ChoiceText,
    /// `{"choices": [{"content": "..."}]}`
    ChoiceContentString,
    /// `{"choices": [{"content": [{"text": ".."}]}]}`
    ChoiceContentSegments,
    /// `{"generation": "..."}`
    Generation,
    /// `{"response": "..."}` (Ollama)
    Response,
}

/// Probe order, highest priority first.
pub const EXTRACTION_ORDER: [ResponseShape; 7] = [
    ResponseShape::ContentString,
    ResponseShape::ContentSegments,
    ResponseShape::ChoiceText,
    ResponseShape::ChoiceContentString,
    ResponseShape::ChoiceContentSegments,
    ResponseShape::Generation,
    ResponseShape::Response,
];

impl ResponseShape {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ContentString => "content",
            Self::ContentSegments => "content[]",
            Self::ChoiceText => "choices[0].text",
            Self::ChoiceContentString => "choices[0].content",
            Self::ChoiceContentSegments => "choices[0].content[]",
            Self::Generation => "generation",
            Self::Response => "response",
        }
    }

    /// Raw text at this location, if the location holds the expected type.
    pub fn probe(&self, reply: &Value) -> Option<String> {
        match self {
            Self::ContentString => string_at(reply.get("content")),
            Self::ContentSegments => segments_at(reply.get("content")),
            Self::ChoiceText => string_at(first_choice(reply).and_then(|c| c.get("text"))),
            Self::ChoiceContentString => {
                string_at(first_choice(reply).and_then(|c| c.get("content")))
            }
            Self::ChoiceContentSegments => {
                segments_at(first_choice(reply).and_then(|c| c.get("content")))
            }
            Self::Generation => string_at(reply.get("generation")),
            Self::Response => string_at(reply.get("response")),
        }
    }
}

/// First non-blank text in probe order, trimmed, with the shape it came from.
pub fn extract_text(reply: &Value) -> Option<(ResponseShape, String)> {
    EXTRACTION_ORDER.iter().find_map(|shape| {
        shape
            .probe(reply)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .map(|text| (*shape, text))
    })
}

fn first_choice(reply: &Value) -> Option<&Value> {
    reply.get("choices")?.as_array()?.first()
}

fn string_at(value: Option<&Value>) -> Option<String> {
    value?.as_str().map(str::to_string)
}

fn segments_at(value: Option<&Value>) -> Option<String> {
    let segments = value?.as_array()?;
    let joined: String = segments
        .iter()
        .filter_map(|segment| {
            segment
                .get("text")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .or_else(|| segment.get("content").and_then(Value::as_str))
        })
        .collect();
    Some(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_llama_cpp_content() {
        let reply = json!({"content": "  1810  ", "stop": true});
        let (shape, text) = extract_text(&reply).unwrap();
        assert_eq!(shape, ResponseShape::ContentString);
        assert_eq!(text, "1810");
    }

    #[test]
    fn test_content_segments_join() {
        let reply = json!({"content": [{"text": "Hola "}, {"content": "mundo"}, {"other": 1}]});
        let (shape, text) = extract_text(&reply).unwrap();
        assert_eq!(shape, ResponseShape::ContentSegments);
        assert_eq!(text, "Hola mundo");
    }

    #[test]
    fn test_blank_content_falls_through() {
        let reply = json!({"content": "   ", "choices": [{"text": "from choices"}]});
        let (shape, text) = extract_text(&reply).unwrap();
        assert_eq!(shape, ResponseShape::ChoiceText);
        assert_eq!(text, "from choices");
    }

    #[test]
    fn test_choice_content_segments() {
        let reply = json!({"choices": [{"content": [{"text": "a"}, {"text": "b"}]}]});
        let (shape, text) = extract_text(&reply).unwrap();
        assert_eq!(shape, ResponseShape::ChoiceContentSegments);
        assert_eq!(text, "ab");
    }

    #[test]
    fn test_generation_and_ollama_response() {
        let (shape, _) = extract_text(&json!({"generation": "g"})).unwrap();
        assert_eq!(shape, ResponseShape::Generation);

        let (shape, text) = extract_text(&json!({"model": "m", "response": "r", "done": true})).unwrap();
        assert_eq!(shape, ResponseShape::Response);
        assert_eq!(text, "r");
    }

    #[test]
    fn test_priority_prefers_content_over_response() {
        let reply = json!({"response": "second", "content": "first"});
        assert_eq!(extract_text(&reply).unwrap().1, "first");
    }

    #[test]
    fn test_nothing_usable() {
        assert!(extract_text(&json!({})).is_none());
        assert!(extract_text(&json!({"content": 42, "choices": []})).is_none());
        assert!(extract_text(&json!("plain string")).is_none());
    }
}
