use poolmap::{validate_form, FormKind, Violation};
use serde_json::{json, Map, Value};

fn values(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[test]
fn new_batch_scenarios() {
    let short = validate_form(FormKind::NewBatch, &values(json!({ "name": "ab" }))).unwrap_err();
    assert!(short
        .iter()
        .any(|v| matches!(v, Violation::TooShort { field: "name", min: 4 })));

    assert!(validate_form(FormKind::NewBatch, &values(json!({ "name": "valid_Name-1" }))).is_ok());

    let narrow = validate_form(
        FormKind::NewBatch,
        &values(json!({ "name": "valid_Name-1", "width": 50 })),
    )
    .unwrap_err();
    assert_eq!(narrow.len(), 1);
    assert_eq!(narrow[0].field(), "width");

    assert!(validate_form(
        FormKind::NewBatch,
        &values(json!({ "name": "valid_Name-1", "width": 500 }))
    )
    .is_ok());
}

#[test]
fn run_form_defaults_are_valid() {
    let schema = FormKind::BatchRun.schema();
    assert_eq!(
        Value::Object(schema.defaults()),
        json!({ "coverage": 0.005, "sleep_min": 0, "sleep_max": 3 })
    );
    assert!(validate_form(FormKind::BatchRun, &Map::new()).is_ok());
}

#[test]
fn text_pairs_from_a_cli_validate_like_json() {
    let schema = FormKind::NewBatch.schema();
    let parsed = schema.parse_pairs([("name", "harbour,2"), ("zoomLevel", "22")]);
    let errs = validate_form(FormKind::NewBatch, &parsed).unwrap_err();
    assert_eq!(errs.len(), 1);
    assert!(matches!(errs[0], Violation::AboveMaximum { field: "zoomLevel", .. }));
}

#[test]
fn schema_json_keeps_renderer_keys() {
    let json = serde_json::to_value(FormKind::NewBatch.schema()).unwrap();
    let name = &json[0];
    assert_eq!(name["name"], "name");
    assert_eq!(name["constraints"]["length"]["minimum"], 4);
    assert_eq!(name["constraints"]["format"]["flags"], "i");
    assert_eq!(json[3]["constraints"]["numericality"]["lessThanOrEqualTo"], 21.0);
}
