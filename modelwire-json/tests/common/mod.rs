//! Shared fixtures for JSON conversion tests.

#![allow(dead_code)]

use modelwire_json::{AccessGates, EntityConverter};
use modelwire_model::{
    Describe, Entity, EntityHeader, EntityOptions, MemoryStore, Modifiable, PropertyTable, TypeRegistry,
};
use modelwire_types::{KeyFormat, PrimaryKey, Ticks};
use std::fmt;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

macro_rules! entity_impls {
    ($ty:ty) => {
        impl Modifiable for $ty {
            fn as_entity(&self) -> Option<&dyn Entity> {
                Some(self)
            }

            fn as_entity_mut(&mut self) -> Option<&mut dyn Entity> {
                Some(self)
            }
        }

        impl Entity for $ty {
            fn header(&self) -> &EntityHeader {
                &self.header
            }

            fn header_mut(&mut self) -> &mut EntityHeader {
                &mut self.header
            }
        }
    };
}

// ── Embedded ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
}

impl Describe for Address {
    fn describe(props: &mut PropertyTable<Self>) {
        props
            .value("Street", |a| &a.street, |a| &mut a.street)
            .value("City", |a| &a.city, |a| &mut a.city);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.street, self.city)
    }
}

impl Modifiable for Address {}

// ── Mixin ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditMixin {
    pub created_by: String,
}

impl Describe for AuditMixin {
    fn describe(props: &mut PropertyTable<Self>) {
        props.value("CreatedBy", |m| &m.created_by, |m| &mut m.created_by);
    }
}

impl fmt::Display for AuditMixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "audit by {}", self.created_by)
    }
}

impl Modifiable for AuditMixin {
    fn is_mixin(&self) -> bool {
        true
    }
}

// ── Entities ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Person {
    pub header: EntityHeader,
    pub name: String,
    pub age: u32,
    pub address: Option<Address>,
}

impl Describe for Person {
    fn describe(props: &mut PropertyTable<Self>) {
        props
            .value("Name", |p| &p.name, |p| &mut p.name)
            .value("Age", |p| &p.age, |p| &mut p.age)
            .object("Address", |p| &p.address, |p| &mut p.address);
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

entity_impls!(Person);

/// Registered under the clean name `Order`, with GUID keys and no ticks.
#[derive(Debug, Clone, Default)]
pub struct OrderEntity {
    pub header: EntityHeader,
    pub customer: Option<Person>,
    pub lines: Vec<String>,
    pub total_cents: i64,
}

impl Describe for OrderEntity {
    fn describe(props: &mut PropertyTable<Self>) {
        props
            .object("Customer", |o| &o.customer, |o| &mut o.customer)
            .value("Lines", |o| &o.lines, |o| &mut o.lines)
            .value("TotalCents", |o| &o.total_cents, |o| &mut o.total_cents);
    }
}

impl fmt::Display for OrderEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order of {} cents", self.total_cents)
    }
}

entity_impls!(OrderEntity);

/// An entity with text keys, assignable to [`Owner`] alongside [`Person`].
#[derive(Debug, Clone, Default)]
pub struct Company {
    pub header: EntityHeader,
    pub name: String,
}

impl Describe for Company {
    fn describe(props: &mut PropertyTable<Self>) {
        props.value("Name", |c| &c.name, |c| &mut c.name);
    }
}

impl fmt::Display for Company {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

entity_impls!(Company);

/// Never registered.
#[derive(Debug, Clone, Default)]
pub struct Stray {
    pub header: EntityHeader,
    pub label: String,
}

impl Describe for Stray {
    fn describe(props: &mut PropertyTable<Self>) {
        props.value("Label", |s| &s.label, |s| &mut s.label);
    }
}

impl fmt::Display for Stray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

entity_impls!(Stray);

// ── Polymorphic ──────────────────────────────────────────────────

/// Marker for anything that can own a kennel.
pub struct Owner;

#[derive(Debug, Default)]
pub struct Kennel {
    pub owner: Option<Box<dyn Modifiable>>,
    pub capacity: u8,
}

impl Describe for Kennel {
    fn describe(props: &mut PropertyTable<Self>) {
        props
            .polymorphic::<Owner>("Owner", |k| &k.owner, |k| &mut k.owner)
            .value("Capacity", |k| &k.capacity, |k| &mut k.capacity);
    }
}

impl fmt::Display for Kennel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kennel for {}", self.capacity)
    }
}

impl Modifiable for Kennel {}

// ── Builders ─────────────────────────────────────────────────────

/// Routes converter logs to the test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn person(name: &str, age: u32) -> Person {
    Person {
        name: name.to_string(),
        age,
        ..Default::default()
    }
}

pub fn saved_person(id: i64, ticks: i64, name: &str, age: u32) -> Person {
    Person {
        header: EntityHeader::saved(PrimaryKey::Int(id), Ticks::new(ticks)),
        ..person(name, age)
    }
}

/// A saved person carrying the declared `AuditMixin`.
pub fn audited_person(id: i64, name: &str, created_by: &str) -> Person {
    let mut p = saved_person(id, 1, name, 30);
    registry().attach_mixins(&mut p);
    p.mixins_mut().get_mut::<AuditMixin>().unwrap().created_by = created_by.to_string();
    p
}

pub fn company(id: &str, name: &str) -> Company {
    Company {
        header: EntityHeader::saved(PrimaryKey::Text(id.to_string()), Ticks::new(1)),
        name: name.to_string(),
    }
}

pub fn order_id() -> Uuid {
    Uuid::parse_str("6f1c2a4e-3b7d-4c1e-9a55-0d2f8e61b7a3").unwrap()
}

pub fn registry() -> Arc<TypeRegistry> {
    Arc::new(
        TypeRegistry::builder()
            .entity::<Person>(EntityOptions::default())
            .entity::<OrderEntity>(EntityOptions::default().key(KeyFormat::Guid).unversioned())
            .entity::<Company>(EntityOptions::default().key(KeyFormat::Text))
            .embedded::<Address>()
            .embedded::<Kennel>()
            .mixin::<AuditMixin>()
            .entity_mixin::<Person, AuditMixin>()
            .assignable::<Person, Owner>()
            .assignable::<Company, Owner>()
            .build()
            .unwrap(),
    )
}

pub fn converter() -> EntityConverter {
    EntityConverter::builder(registry()).build()
}

pub fn converter_with_store(store: Arc<MemoryStore>) -> EntityConverter {
    EntityConverter::builder(registry()).store(store).build()
}

pub fn converter_with_gates(gates: AccessGates) -> EntityConverter {
    EntityConverter::builder(registry()).gates(gates).build()
}

pub fn converter_with(store: Arc<MemoryStore>, gates: AccessGates) -> EntityConverter {
    EntityConverter::builder(registry()).store(store).gates(gates).build()
}
