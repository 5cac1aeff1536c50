use modelwire_json::{ErrorKind, IdentityInfo};
use modelwire_types::Ticks;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn parse(value: Value) -> (modelwire_json::Result<IdentityInfo>, Vec<String>) {
    let Value::Object(map) = value else {
        panic!("fixture must be an object");
    };
    let mut fields = map.into_iter().peekable();
    let info = IdentityInfo::read(&mut fields, "$");
    (info, fields.map(|(name, _)| name).collect())
}

// ── Parsing ──────────────────────────────────────────────────────

#[test]
fn full_header() {
    let (info, rest) = parse(json!({
        "Type": "Person",
        "id": 7,
        "ticks": "3",
        "toStr": "Bob",
        "name": "Bob"
    }));
    let info = info.unwrap();
    assert_eq!(info.type_name, "Person");
    assert_eq!(info.id.as_deref(), Some("7"));
    assert_eq!(info.ticks, Some(Ticks::new(3)));
    assert_eq!(info.to_str.as_deref(), Some("Bob"));
    assert_eq!(info.is_new, None);
    assert_eq!(rest, vec!["name"]);
}

#[test]
fn stops_at_first_non_header_field() {
    let (info, rest) = parse(json!({"Type": "Person", "name": "Bob", "id": 7}));
    assert_eq!(info.unwrap().id, None);
    assert_eq!(rest, vec!["name", "id"]);
}

#[test]
fn null_fields_are_absent() {
    let (info, _) = parse(json!({"Type": "Person", "id": null, "ticks": null, "isNew": null}));
    let info = info.unwrap();
    assert_eq!(info.id, None);
    assert_eq!(info.ticks, None);
    assert!(!info.is_new());
}

#[test]
fn ticks_as_number_or_string() {
    let (a, _) = parse(json!({"Type": "T", "ticks": 12}));
    let (b, _) = parse(json!({"Type": "T", "ticks": " 12 "}));
    assert_eq!(a.unwrap().ticks, Some(Ticks::new(12)));
    assert_eq!(b.unwrap().ticks, Some(Ticks::new(12)));
}

#[test]
fn malformed_fields() {
    for value in [
        json!({"id": 1}),
        json!({"Type": "T", "ticks": "soon"}),
        json!({"Type": "T", "isNew": "yes"}),
        json!({"Type": ["T"]}),
    ] {
        let (info, _) = parse(value);
        assert_eq!(info.unwrap_err().kind(), ErrorKind::MalformedHeader);
    }
}

#[test]
fn new_with_id_rejected() {
    let (info, _) = parse(json!({"Type": "Person", "isNew": true, "id": "5"}));
    let err = info.unwrap().assert_is_new_id("$").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedHeader);
    assert!(err.to_string().contains("is new but has id '5'"));
}

#[test]
fn new_without_id_accepted() {
    let (info, _) = parse(json!({"Type": "Person", "isNew": true, "id": null}));
    assert!(info.unwrap().assert_is_new_id("$").is_ok());
}

// ── Display ──────────────────────────────────────────────────────

#[test]
fn display_saved() {
    let (info, _) = parse(json!({"Type": "Person", "id": 7, "ticks": "3", "toStr": "Bob"}));
    assert_eq!(info.unwrap().to_string(), "Person 7 (Ticks 3): Bob");
}

#[test]
fn display_new() {
    let (info, _) = parse(json!({"Type": "Person", "isNew": true, "toStr": "Ann"}));
    assert_eq!(info.unwrap().to_string(), "Person New: Ann");
}
