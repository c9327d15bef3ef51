use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Minimum age is exclusive: a customer must be older than this.
pub const MIN_AGE_EXCLUSIVE: i32 = 18;

/// Customer record as stored in memory and in the snapshot file.
/// Field order matches the persisted layout: `firstName`, `lastName`, `age`, `id`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub id: i64,
}

impl Customer {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, age: i32, id: i64) -> Self {
        Self { first_name: first_name.into(), last_name: last_name.into(), age, id }
    }

    /// Validate first name, last name, then age; the first failing rule wins.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.first_name.trim().is_empty() {
            return Err(ModelError::InvalidFirstName);
        }
        if self.last_name.trim().is_empty() {
            return Err(ModelError::InvalidLastName);
        }
        if self.age <= MIN_AGE_EXCLUSIVE {
            return Err(ModelError::InvalidAge(self.age));
        }
        Ok(())
    }

    /// Store ordering: last name, then first name, both case-insensitive.
    pub fn cmp_by_name(&self, other: &Self) -> Ordering {
        cmp_ignore_case(&self.last_name, &other.last_name)
            .then_with(|| cmp_ignore_case(&self.first_name, &other.first_name))
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Ordinal comparison after mapping each char to its upper case form.
///
/// The mapping is one char to one char: a char whose upper case expands to
/// several chars (`ß` -> `SS`) is compared as itself.
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars().map(simple_upper).cmp(b.chars().map(simple_upper))
}

fn simple_upper(c: char) -> char {
    let mut up = c.to_uppercase();
    match (up.next(), up.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}
