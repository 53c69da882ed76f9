use rstest::rstest;
use serde_json::{json, Value};

use super::*;

#[rstest]
#[case(json!(null), false)]
#[case(json!(false), false)]
#[case(json!(true), true)]
#[case(json!(0), false)]
#[case(json!(0.0), false)]
#[case(json!(-3), true)]
#[case(json!(""), false)]
#[case(json!("no"), true)]
#[case(json!([]), true)]
#[case(json!({}), true)]
fn truthiness(#[case] value: Value, #[case] expected: bool) {
    assert_eq!(is_truthy(Some(&value)), expected);
}

#[test]
fn missing_is_falsy() {
    assert!(!is_truthy(None));
}

#[rstest]
#[case(json!("Ada"), Some("Ada"))]
#[case(json!(42), Some("42"))]
#[case(json!(true), Some("true"))]
#[case(json!([1, 2]), Some("[1,2]"))]
#[case(json!(null), None)]
fn text_form(#[case] value: Value, #[case] expected: Option<&str>) {
    assert_eq!(to_text(Some(&value)).as_deref(), expected);
}

#[test]
fn call_listener_reports_panic() {
    assert!(call_listener("a", || {}));
    assert!(!call_listener("a", || panic!("boom")));
}

#[test]
fn kind_names() {
    assert_eq!(value_kind(&json!([1])), "array");
    assert_eq!(value_kind(&json!(1.5)), "number");
    assert_eq!(value_kind(&json!(null)), "null");
}
