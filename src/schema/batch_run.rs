//! Options accepted when starting a batch run.

use once_cell::sync::Lazy;
use serde_json::json;

use super::{
    Constraints, FieldDescriptor, FieldType, FormSchema, NumericConstraints, NumericKind,
    Numericality,
};

pub static BATCH_RUN_FORM: Lazy<FormSchema> = Lazy::new(|| {
    FormSchema::new(vec![
        FieldDescriptor {
            field_type: FieldType::Number,
            name: "coverage",
            full_name: "Task coverage",
            default: Some(json!(0.005)),
            step: Some(0.005),
            constraints: Constraints::Numeric(NumericConstraints {
                numericality: Numericality {
                    greater_than_or_equal_to: 0.0,
                    less_than_or_equal_to: 1.0,
                },
                kind: NumericKind::Number,
            }),
        },
        sleep_field("sleep_min", "Minimum sleep time", 0),
        sleep_field("sleep_max", "Maximum sleep time", 3),
    ])
});

fn sleep_field(name: &'static str, full_name: &'static str, default: u32) -> FieldDescriptor {
    FieldDescriptor {
        field_type: FieldType::Number,
        name,
        full_name,
        default: Some(json!(default)),
        step: None,
        constraints: Constraints::Numeric(NumericConstraints {
            numericality: Numericality {
                greater_than_or_equal_to: 0.0,
                less_than_or_equal_to: 1000.0,
            },
            kind: NumericKind::Integer,
        }),
    }
}
