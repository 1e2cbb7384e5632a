//! Person model for the sample application
//!
//! `Person` is cached as a tagged hash entry; `PersonDirectory` stands in for
//! the authoritative data source consulted on a cache miss.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::cache::{EntityCodec, Schema};
use crate::error::Result;

/// Schema kind written to `_Type` for persons.
pub const PERSON_KIND: &str = "Person";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Person {
    pub id: i32,
    pub name: Option<String>,
    pub family: Option<String>,
}

impl Person {
    pub fn new(id: i32, name: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            family: Some(family.into()),
        }
    }

    /// `"{name} {family}"`, with missing parts left empty.
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.name.as_deref().unwrap_or_default(),
            self.family.as_deref().unwrap_or_default()
        )
    }

    pub fn schema() -> Result<Schema<Person>> {
        Schema::<Person>::builder(PERSON_KIND)
            .field("Id", |p| &p.id, |p| &mut p.id)
            .text("Name", |p| &p.name, |p| &mut p.name)
            .text("Family", |p| &p.family, |p| &mut p.family)
            .build()
    }

    pub fn codec() -> Result<EntityCodec<Person>> {
        Ok(EntityCodec::new(Self::schema()?))
    }
}

// == Person Directory ==
/// Authoritative person records, shared between handlers.
#[derive(Debug, Clone, Default)]
pub struct PersonDirectory {
    records: Arc<RwLock<HashMap<i32, Person>>>,
}

impl PersonDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding the single sample record `1 => Mahyar Hoorbakht`.
    pub fn seeded() -> Self {
        let records = HashMap::from([(1, Person::new(1, "Mahyar", "Hoorbakht"))]);
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    pub async fn find(&self, id: i32) -> Option<Person> {
        self.records.read().await.get(&id).cloned()
    }

    pub async fn insert(&self, person: Person) {
        self.records.write().await.insert(person.id, person);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
