//! CRDT value types backing a storage node
//!
//! A node stores bucket attributes and object metadata as maps of
//! last-writer-wins registers, and each bucket's object keys as an
//! observed-remove set. Concurrent updates from different actors merge
//! deterministically without coordination.

use crate::FieldMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// A last-writer-wins register holding one metadata value
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LwwRegister {
    value: Value,
    timestamp: DateTime<Utc>,
    actor: String,
}

impl LwwRegister {
    /// Create a register stamped with the current time
    pub fn new(value: Value, actor: impl Into<String>) -> Self {
        Self {
            value,
            timestamp: Utc::now(),
            actor: actor.into(),
        }
    }

    /// Get the current value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Overwrite the value, refreshing the timestamp
    pub fn set(&mut self, value: Value) {
        self.value = value;
        self.timestamp = Utc::now();
    }

    /// Merge with a concurrent copy (LWW semantics; actor id breaks ties)
    pub fn merge(&mut self, other: &Self) {
        if other.timestamp > self.timestamp
            || (other.timestamp == self.timestamp && other.actor > self.actor)
        {
            self.value = other.value.clone();
            self.timestamp = other.timestamp;
            self.actor = other.actor.clone();
        }
    }
}

/// A CRDT map of field names to LWW registers
///
/// Removal writes a null-register tombstone rather than dropping the entry,
/// so a late concurrent write can still lose to the removal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LwwMap {
    entries: BTreeMap<String, LwwRegister>,
    actor: String,
}

impl LwwMap {
    /// Create an empty map owned by `actor`
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            entries: BTreeMap::new(),
            actor: actor.into(),
        }
    }

    /// Write one field register
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        let register = LwwRegister::new(value, &self.actor);
        self.entries.insert(field.into(), register);
    }

    /// Remove one field register
    pub fn remove(&mut self, field: &str) {
        if let Some(register) = self.entries.get_mut(field) {
            register.set(Value::Null);
        }
    }

    /// Get a field's value, if live
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.entries
            .get(field)
            .map(LwwRegister::value)
            .filter(|value| !value.is_null())
    }

    /// Materialize the live fields as a plain mapping
    pub fn to_field_map(&self) -> FieldMap {
        self.entries
            .iter()
            .filter(|(_, register)| !register.value().is_null())
            .map(|(field, register)| (field.clone(), register.value().clone()))
            .collect()
    }

    /// Merge with a concurrent copy, register by register
    pub fn merge(&mut self, other: &Self) {
        for (field, other_register) in &other.entries {
            match self.entries.get_mut(field) {
                Some(register) => register.merge(other_register),
                None => {
                    self.entries.insert(field.clone(), other_register.clone());
                }
            }
        }
    }

    /// Number of live fields
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .filter(|register| !register.value().is_null())
            .count()
    }

    /// True when no field is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An observed-remove set of object keys
///
/// Adds win over concurrent removes: a remove only tombstones the add tags
/// it has observed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrSet {
    elements: BTreeMap<String, BTreeSet<String>>,
    tombstones: BTreeMap<String, BTreeSet<String>>,
    actor: String,
    counter: u64,
}

impl OrSet {
    /// Create an empty set owned by `actor`
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            elements: BTreeMap::new(),
            tombstones: BTreeMap::new(),
            actor: actor.into(),
            counter: 0,
        }
    }

    /// Add a member under a fresh unique tag
    pub fn add(&mut self, member: impl Into<String>) {
        self.counter += 1;
        let tag = format!("{}:{}", self.actor, self.counter);
        self.elements.entry(member.into()).or_default().insert(tag);
    }

    /// Remove every observed instance of a member
    pub fn remove(&mut self, member: &str) {
        if let Some(tags) = self.elements.remove(member) {
            self.tombstones
                .entry(member.to_string())
                .or_default()
                .extend(tags);
        }
    }

    /// Check membership
    pub fn contains(&self, member: &str) -> bool {
        self.elements.contains_key(member)
    }

    /// Current members, in lexicographic order
    pub fn members(&self) -> Vec<String> {
        self.elements.keys().cloned().collect()
    }

    /// Merge with a concurrent copy
    pub fn merge(&mut self, other: &Self) {
        for (member, tags) in &other.elements {
            self.elements
                .entry(member.clone())
                .or_default()
                .extend(tags.iter().cloned());
        }
        for (member, tags) in &other.tombstones {
            self.tombstones
                .entry(member.clone())
                .or_default()
                .extend(tags.iter().cloned());
        }

        // Drop tombstoned tags; a member with no surviving tag is gone
        for (member, tombstone_tags) in &self.tombstones {
            if let Some(tags) = self.elements.get_mut(member) {
                for tag in tombstone_tags {
                    tags.remove(tag);
                }
                if tags.is_empty() {
                    self.elements.remove(member);
                }
            }
        }
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True when no member is present
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
