//! Canonical keys for reference entities.
//!
//! A key is the identity-bearing projection of an entity: two values with equal
//! keys are the same entity for the whole run. Incidental fields (birth year,
//! email, display name) travel alongside the key in the interning table but
//! never take part in comparisons.

use crate::model::{PluginData, Person, Tag, User};

/// Cast and crew identity. Names compare exactly, case included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PersonKey {
    pub last_name: String,
    pub middle_name: String,
    pub first_name: String,
}

impl PersonKey {
    pub fn of(person: &Person) -> Self {
        Self {
            last_name: person.last_name.clone(),
            middle_name: person.middle_name.clone(),
            first_name: person.first_name.clone(),
        }
    }
}

/// User identity: last and first name, case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserKey {
    last_name: String,
    first_name: String,
}

impl UserKey {
    pub fn of(user: &User) -> Self {
        Self {
            last_name: user.last_name.to_lowercase(),
            first_name: user.first_name.to_lowercase(),
        }
    }
}

/// Tag identity: the full path, case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagKey(String);

impl TagKey {
    pub fn of(tag: &Tag) -> Self {
        Self(tag.full_name.to_lowercase())
    }
}

/// Plugin identity: the class identifier, compared as a GUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginKey(String);

impl PluginKey {
    pub fn of(plugin: &PluginData) -> Self {
        Self::from_class_id(&plugin.class_id)
    }

    pub fn from_class_id(class_id: &str) -> Self {
        Self(normalize_class_id(class_id))
    }

    /// Hyphenated lower-case form without braces, as stored in the output.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn normalize_class_id(class_id: &str) -> String {
    class_id
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .to_ascii_lowercase()
}
