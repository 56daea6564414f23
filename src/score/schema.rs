//! Response schema requested from the recognition service.

use serde_json::{json, Value};

/// Returns the JSON schema describing the structured output the recognition
/// service is asked to produce for a set of page images.
///
/// Rectangles are `[top, left, bottom, right]` on a 0-1000 scale relative to
/// the page image. Frame IDs are deliberately absent: they are assigned
/// locally at ingestion.
pub fn response_schema() -> Value {
    let rect = json!({
        "type": "array",
        "items": { "type": "number" },
        "minItems": 4,
        "maxItems": 4,
        "description": "[top, left, bottom, right] on a 0-1000 scale"
    });

    json!({
        "type": "object",
        "properties": {
            "tempo": {
                "type": "number",
                "description": "Tempo in beats per minute"
            },
            "frames": {
                "type": "array",
                "description": "Musical events in performance order",
                "items": {
                    "type": "object",
                    "properties": {
                        "pageIndex": {
                            "type": "integer",
                            "description": "Zero-based index of the page image"
                        },
                        "notes": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Pitches that start together, e.g. \"C4\", \"F#5\", or \"rest\""
                        },
                        "duration": {
                            "type": "number",
                            "description": "Length in beats"
                        },
                        "region": rect.clone(),
                        "highlights": {
                            "type": "array",
                            "items": rect,
                            "description": "One box per sounding note head"
                        }
                    },
                    "required": ["pageIndex", "notes", "duration", "region", "highlights"]
                }
            }
        },
        "required": ["tempo", "frames"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_has_required_fields() {
        let schema = response_schema();
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("tempo")));
        assert!(required.contains(&json!("frames")));

        let frame = &schema["properties"]["frames"]["items"];
        assert_eq!(frame["properties"]["region"]["minItems"], json!(4));
        assert!(frame["properties"].get("id").is_none());
    }
}
