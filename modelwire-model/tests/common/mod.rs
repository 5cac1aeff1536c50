//! Shared fixtures for model tests.

#![allow(dead_code)]

use modelwire_model::{Describe, Entity, EntityHeader, Modifiable, PropertyTable};
use std::fmt;

#[derive(Debug, Clone, Default)]
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

#[derive(Debug, Clone, Default)]
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

#[derive(Debug, Clone, Default)]
pub struct PersonEntity {
    pub header: EntityHeader,
    pub name: String,
    pub age: u32,
    pub address: Option<Address>,
}

impl Describe for PersonEntity {
    fn describe(props: &mut PropertyTable<Self>) {
        props
            .value("Name", |p| &p.name, |p| &mut p.name)
            .value("Age", |p| &p.age, |p| &mut p.age)
            .object("Address", |p| &p.address, |p| &mut p.address);
    }
}

impl fmt::Display for PersonEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Modifiable for PersonEntity {
    fn as_entity(&self) -> Option<&dyn Entity> {
        Some(self)
    }

    fn as_entity_mut(&mut self) -> Option<&mut dyn Entity> {
        Some(self)
    }
}

impl Entity for PersonEntity {
    fn header(&self) -> &EntityHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut EntityHeader {
        &mut self.header
    }
}

/// Marker for anything that can own a pet.
pub struct Owner;

#[derive(Debug, Default)]
pub struct Kennel {
    pub owner: Option<Box<dyn Modifiable>>,
}

impl Describe for Kennel {
    fn describe(props: &mut PropertyTable<Self>) {
        props.polymorphic::<Owner>("Owner", |k| &k.owner, |k| &mut k.owner);
    }
}

impl fmt::Display for Kennel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("kennel")
    }
}

impl Modifiable for Kennel {}

pub fn person(name: &str, age: u32) -> PersonEntity {
    PersonEntity {
        name: name.to_string(),
        age,
        ..Default::default()
    }
}
