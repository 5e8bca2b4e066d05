//! Parameters of a new imagery batch.

use once_cell::sync::Lazy;
use serde_json::json;

use super::{
    Constraints, FieldDescriptor, FieldType, Format, FormSchema, LengthRange, NumericConstraints,
    NumericKind, Numericality, TextConstraints,
};

pub const BATCH_NAME_PATTERN: &str = "[a-zA-Z0-9-+_,]+";

pub static NEW_BATCH_FORM: Lazy<FormSchema> = Lazy::new(|| {
    FormSchema::new(vec![
        FieldDescriptor {
            field_type: FieldType::Text,
            name: "name",
            full_name: "Batch name",
            default: None,
            step: None,
            constraints: Constraints::Text(TextConstraints {
                length: LengthRange {
                    minimum: 4,
                    maximum: 50,
                },
                kind: "string",
                format: Format {
                    pattern: BATCH_NAME_PATTERN,
                    flags: "i",
                },
            }),
        },
        integer_field("width", "Images width", 1000, 100, 1000),
        integer_field("height", "Images height", 1000, 100, 1000),
        integer_field("zoomLevel", "Zoom level", 18, 3, 21),
    ])
});

fn integer_field(
    name: &'static str,
    full_name: &'static str,
    default: u32,
    min: u32,
    max: u32,
) -> FieldDescriptor {
    FieldDescriptor {
        field_type: FieldType::Number,
        name,
        full_name,
        default: Some(json!(default)),
        step: None,
        constraints: Constraints::Numeric(NumericConstraints {
            numericality: Numericality {
                greater_than_or_equal_to: f64::from(min),
                less_than_or_equal_to: f64::from(max),
            },
            kind: NumericKind::Integer,
        }),
    }
}
