//! Typed response shapes for every capability request.
//!
//! Each shape derives `JsonSchema`; [`ResponseShape::strict_schema`] turns
//! the generated schema into the strict form structured-output backends
//! expect:
//!
//! 1. `additionalProperties: false` on every object
//! 2. every property listed in `required`
//! 3. `$ref`s inlined, `definitions` and `$schema` removed
//!
//! Parsing is plain serde deserialization; a mismatch is a
//! [`ValidationError::Schema`] and gets retried like any other rejection.

use schemars::{gen::SchemaGenerator, schema::Schema, schema_for, JsonSchema};
use serde::de::{self, DeserializeOwned, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::ValidationError;
use crate::types::answer::AnswerExcerpt;

/// A type the capability can be asked to produce.
///
/// Implemented for anything that is `JsonSchema + DeserializeOwned`.
pub trait ResponseShape: JsonSchema + DeserializeOwned {
    fn strict_schema() -> Value {
        let mut schema = serde_json::to_value(schema_for!(Self)).unwrap_or_default();

        let definitions = match &mut schema {
            Value::Object(map) => {
                map.remove("$schema");
                map.remove("definitions")
            }
            _ => None,
        };

        tighten(&mut schema, definitions.as_ref());
        schema
    }

    fn shape_name() -> String {
        <Self as JsonSchema>::schema_name()
    }

    /// Strictly deserialize a capability response.
    fn parse(value: Value) -> Result<Self, ValidationError> {
        if value.is_null() {
            return Err(ValidationError::EmptyResponse);
        }
        serde_json::from_value(value).map_err(|e| ValidationError::Schema(e.to_string()))
    }
}

impl<T: JsonSchema + DeserializeOwned> ResponseShape for T {}

fn tighten(node: &mut Value, definitions: Option<&Value>) {
    match node {
        Value::Object(map) => {
            let inlined = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|reference| reference.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.and_then(|defs| defs.get(name)))
                .cloned();

            if let Some(definition) = inlined {
                *node = definition;
                tighten(node, definitions);
                return;
            }

            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));

                let required: Option<Vec<Value>> = map
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| props.keys().cloned().map(Value::String).collect());
                if let Some(required) = required {
                    map.insert("required".to_string(), Value::Array(required));
                }
            }

            for child in map.values_mut() {
                tighten(child, definitions);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                tighten(item, definitions);
            }
        }
        _ => {}
    }
}

// =============================================================================
// Sentence numbers
// =============================================================================

/// A sentence number as returned by the model.
///
/// Accepts a JSON integer or a numeric string; advertised as `integer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SentenceRef(pub i64);

impl JsonSchema for SentenceRef {
    fn schema_name() -> String {
        "SentenceRef".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        <i64>::json_schema(gen)
    }

    fn is_referenceable() -> bool {
        false
    }
}

impl<'de> Deserialize<'de> for SentenceRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SentenceRefVisitor;

        impl<'de> Visitor<'de> for SentenceRefVisitor {
            type Value = SentenceRef;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a sentence number as integer or numeric string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<SentenceRef, E> {
                Ok(SentenceRef(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<SentenceRef, E> {
                i64::try_from(v)
                    .map(SentenceRef)
                    .map_err(|_| E::custom(format!("sentence number {} out of range", v)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<SentenceRef, E> {
                if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
                    Ok(SentenceRef(v as i64))
                } else {
                    Err(E::custom(format!("sentence number {} is not an integer", v)))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<SentenceRef, E> {
                v.trim()
                    .parse::<i64>()
                    .map(SentenceRef)
                    .map_err(|_| E::custom(format!("sentence number {:?} is not numeric", v)))
            }
        }

        deserializer.deserialize_any(SentenceRefVisitor)
    }
}

// =============================================================================
// Shapes
// =============================================================================

/// Segmentation: `{segmentation: [{sentences: [int]}]}`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SegmentationResponse {
    pub segmentation: Vec<SegmentItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SegmentItem {
    pub sentences: Vec<SentenceRef>,
}

/// Abstraction: `{decontextualized_paragraphs: [{para_num, para}]}`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AbstractionResponse {
    pub decontextualized_paragraphs: Vec<ParagraphItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ParagraphItem {
    #[serde(default)]
    pub para_num: i64,
    pub para: String,
}

/// QUD generation: `{num_quds, quds: [{qud}]}`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QudResponse {
    #[serde(default)]
    pub num_quds: i64,
    pub quds: Vec<QudItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QudItem {
    pub qud: String,
}

/// Cross-answering: `{excerpts: [{question, sentence_nums, sentences}]}`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnswerResponse {
    pub excerpts: Vec<ExcerptItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExcerptItem {
    pub question: String,
    pub sentence_nums: Vec<SentenceRef>,
    #[serde(default)]
    pub sentences: Vec<String>,
}

impl From<ExcerptItem> for AnswerExcerpt {
    fn from(item: ExcerptItem) -> Self {
        AnswerExcerpt {
            question: item.question,
            sentence_nums: item.sentence_nums.into_iter().map(|n| n.0).collect(),
            sentences: item.sentences,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strict_schema_inlines_and_requires() {
        let schema = AnswerResponse::strict_schema();
        let root = schema.as_object().unwrap();

        assert!(!root.contains_key("definitions"));
        assert!(!root.contains_key("$schema"));
        assert_eq!(root["additionalProperties"], json!(false));

        let excerpt = &schema["properties"]["excerpts"]["items"];
        assert!(excerpt.get("$ref").is_none(), "nested shapes must be inlined");
        assert_eq!(excerpt["additionalProperties"], json!(false));

        let required: Vec<&str> = excerpt["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(required.contains(&"question"));
        assert!(required.contains(&"sentence_nums"));
        assert!(required.contains(&"sentences"), "defaulted fields stay required");
    }

    #[test]
    fn test_sentence_ref_schema_is_integer() {
        let schema = SegmentationResponse::strict_schema();
        let items = &schema["properties"]["segmentation"]["items"]["properties"]["sentences"]["items"];
        assert_eq!(items["type"], json!("integer"));
    }

    #[test]
    fn test_sentence_ref_accepts_strings() {
        let parsed = SegmentationResponse::parse(json!({
            "segmentation": [{"sentences": [1, "2", " 3 "]}]
        }))
        .unwrap();

        let numbers: Vec<i64> = parsed.segmentation[0].sentences.iter().map(|s| s.0).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_sentence_ref_rejects_garbage() {
        let result = SegmentationResponse::parse(json!({
            "segmentation": [{"sentences": ["three"]}]
        }));
        assert!(matches!(result, Err(ValidationError::Schema(_))));
    }

    #[test]
    fn test_parse_null_is_empty_response() {
        assert_eq!(
            QudResponse::parse(Value::Null).unwrap_err(),
            ValidationError::EmptyResponse
        );
    }

    #[test]
    fn test_parse_missing_field_is_schema_error() {
        let result = QudResponse::parse(json!({"num_quds": 1}));
        assert!(matches!(result, Err(ValidationError::Schema(_))));
    }
}
