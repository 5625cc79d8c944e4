//! Structured-output schema sent to Gemini as `generationConfig.responseSchema`.
//!
//! The schema constrains the provider to emit JSON of the
//! [`crate::package::LearningPackage`] shape instead of free text. It uses
//! Gemini's OpenAPI-subset dialect (upper-case type names, `propertyOrdering`).
//!
//! The client still validates every reply after parsing: providers can and do
//! deviate from a declared schema.

use serde_json::{json, Value};

/// Wire names of the ten required top-level fields, in presentation order.
pub const REQUIRED_FIELDS: [&str; 10] = [
    "expertSummary",
    "simpleExplanation",
    "keyContributions",
    "methodologyFlowchart",
    "visualDiagramDescription",
    "videoScript",
    "pythonCode",
    "flashcards",
    "quiz",
    "additionalInsights",
];

/// Build the response schema for a learning package.
pub fn learning_package_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "expertSummary": {
                "type": "STRING",
                "description": "High-level academic summary for experts"
            },
            "simpleExplanation": {
                "type": "STRING",
                "description": "Beginner-friendly explanation using analogies"
            },
            "keyContributions": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of key contributions"
            },
            "methodologyFlowchart": {
                "type": "STRING",
                "description": "Mermaid.js graph TD syntax. Use simple alphanumeric node IDs (e.g. NodeA). \
Wrap ALL node labels in double quotes. Example: A[\"Input Data\"] --> B[\"Process (Layer 1)\"]"
            },
            "visualDiagramDescription": {
                "type": "STRING",
                "description": "Text description of architecture diagrams and pipelines"
            },
            "videoScript": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "scene": { "type": "STRING" },
                        "visual": { "type": "STRING", "description": "Visual direction for the scene" },
                        "narration": { "type": "STRING", "description": "Spoken text" }
                    },
                    "required": ["scene", "visual", "narration"],
                    "propertyOrdering": ["scene", "visual", "narration"]
                }
            },
            "pythonCode": {
                "type": "STRING",
                "description": "Reproducible Python code demonstrating the core idea"
            },
            "flashcards": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "front": { "type": "STRING" },
                        "back": { "type": "STRING" }
                    },
                    "required": ["front", "back"],
                    "propertyOrdering": ["front", "back"]
                }
            },
            "quiz": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "question": { "type": "STRING" },
                        "options": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" },
                            "minItems": 2
                        },
                        "correctAnswerIndex": {
                            "type": "INTEGER",
                            "description": "Zero-based index into options"
                        }
                    },
                    "required": ["question", "options", "correctAnswerIndex"],
                    "propertyOrdering": ["question", "options", "correctAnswerIndex"]
                }
            },
            "additionalInsights": {
                "type": "STRING",
                "description": "Future scope and limitations"
            }
        },
        "required": REQUIRED_FIELDS,
        "propertyOrdering": REQUIRED_FIELDS
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_required_field_has_a_property() {
        let schema = learning_package_schema();
        let props = schema["properties"].as_object().unwrap();
        assert_eq!(props.len(), REQUIRED_FIELDS.len());
        for field in REQUIRED_FIELDS {
            assert!(props.contains_key(field), "missing property {field}");
        }
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, REQUIRED_FIELDS);
    }

    #[test]
    fn nested_objects_declare_required() {
        let schema = learning_package_schema();
        let quiz_item = &schema["properties"]["quiz"]["items"];
        assert_eq!(quiz_item["type"], "OBJECT");
        assert_eq!(quiz_item["required"].as_array().unwrap().len(), 3);
        assert_eq!(quiz_item["properties"]["options"]["minItems"], 2);
        assert_eq!(
            schema["properties"]["videoScript"]["items"]["required"]
                .as_array()
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn flowchart_description_demands_quoted_labels() {
        let schema = learning_package_schema();
        let desc = schema["properties"]["methodologyFlowchart"]["description"]
            .as_str()
            .unwrap();
        assert!(desc.contains("double quotes"));
        assert!(desc.contains("alphanumeric"));
    }
}
