mod common;

use common::{audited_person, converter_with_gates, order_id, saved_person, OrderEntity};
use modelwire_json::{AccessPolicy, ErrorKind};
use modelwire_model::EntityHeader;
use modelwire_types::{PrimaryKey, Ticks};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_policy(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("access.toml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

const POLICY: &str = r#"
[access]
mode = "enforce"
deny-read = ["Person.Age", "Person[AuditMixin].CreatedBy"]
deny-write = ["Person.Name"]
"#;

// ── Policy file ──────────────────────────────────────────────────

#[test]
fn denied_reads_are_projected_out() {
    let (_dir, path) = write_policy(POLICY);
    let conv = converter_with_gates(AccessPolicy::load_from(&path).into_gates());

    let json = conv.write(&audited_person(7, "Bob", "admin")).unwrap();
    assert!(json.get("age").is_none());
    assert_eq!(json["name"], json!("Bob"));
    assert_eq!(json["mixins"]["AuditMixin"], json!({"Type": "AuditMixin"}));
}

#[test]
fn denied_writes_fail_the_read() {
    let (_dir, path) = write_policy(POLICY);
    let conv = converter_with_gates(AccessPolicy::load_from(&path).into_gates());

    let mut bob = saved_person(7, 1, "Bob", 40);
    let err = conv
        .read_into(json!({"Type": "Person", "id": 7, "name": "Mallory"}), &mut bob)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnauthorizedWrite);
    assert!(err.to_string().contains("write of Person.Name is denied by access policy"));
    assert_eq!(bob.name, "Bob");

    conv.read_into(json!({"Type": "Person", "id": 7, "age": 41}), &mut bob)
        .unwrap();
    assert_eq!(bob.age, 41);
}

#[test]
fn clean_entity_names_match_policy_entries() {
    let (_dir, path) = write_policy("[access]\ndeny-read = [\"Order.TotalCents\"]\n");
    let order = OrderEntity {
        header: EntityHeader::saved(PrimaryKey::Guid(order_id()), Ticks::new(1)),
        total_cents: 450,
        ..Default::default()
    };
    let json = converter_with_gates(AccessPolicy::load_from(&path).into_gates())
        .write(&order)
        .unwrap();
    assert!(json.get("totalCents").is_none());
    assert_eq!(json["Type"], json!("Order"));
}

#[test]
fn missing_policy_file_allows_everything() {
    let dir = tempfile::tempdir().unwrap();
    let policy = AccessPolicy::load_from(dir.path().join("access.toml"));
    assert!(!policy.has_policy_file());

    let json = converter_with_gates(policy.into_gates())
        .write(&saved_person(7, 1, "Bob", 40))
        .unwrap();
    assert_eq!(json["age"], json!(40));
}

#[test]
fn unrestricted_file_ignores_lists() {
    let (_dir, path) = write_policy("[access]\nmode = \"unrestricted\"\ndeny-write = [\"Person.Name\"]\n");
    let mut bob = saved_person(7, 1, "Bob", 40);
    converter_with_gates(AccessPolicy::load_from(&path).into_gates())
        .read_into(json!({"Type": "Person", "id": 7, "name": "Rob"}), &mut bob)
        .unwrap();
    assert_eq!(bob.name, "Rob");
}
