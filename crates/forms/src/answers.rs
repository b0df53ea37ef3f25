//! Stored answer values.
//!
//! An instance's `formData` maps a data key (a field name, or a composed `parent_child` key
//! for subfields) to a value. Values are plain strings, except for the staff and board member
//! prefills which store lists of people.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The answer set of a form instance, keyed by data key.
pub type FormData = BTreeMap<String, FieldValue>;

/// A person row produced by the staff/board prefill.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonEntry {
    pub name: String,
    pub gender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

/// A single stored answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    People(Vec<PersonEntry>),
}

impl FieldValue {
    /// True when the value counts as "answered" for completion purposes: text that is not
    /// blank after trimming, or a non-empty people list.
    pub fn is_filled(&self) -> bool {
        match self {
            FieldValue::Text(text) => !text.trim().is_empty(),
            FieldValue::People(people) => !people.is_empty(),
        }
    }

    /// True when a prefilled value is worth seeding: a non-empty string or a non-empty list.
    ///
    /// Whitespace-only text still seeds.
    pub fn is_seedable(&self) -> bool {
        match self {
            FieldValue::Text(text) => !text.is_empty(),
            FieldValue::People(people) => !people.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::People(_) => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_values_read_strings_and_people() {
        let json = r#"{
            "project_name": "Water tanks",
            "organisation_board_members": [{"name": "Thandi Nkosi", "gender": "Female"}]
        }"#;
        let data: FormData = serde_json::from_str(json).unwrap();

        assert_eq!(data["project_name"], FieldValue::from("Water tanks"));
        match &data["organisation_board_members"] {
            FieldValue::People(people) => {
                assert_eq!(people.len(), 1);
                assert_eq!(people[0].position, None);
            }
            other => panic!("expected people, got {other:?}"),
        }
    }

    #[test]
    fn filled_ignores_surrounding_whitespace() {
        assert!(FieldValue::from(" x ").is_filled());
        assert!(!FieldValue::from("   ").is_filled());
        assert!(!FieldValue::People(vec![]).is_filled());
    }

    #[test]
    fn seedable_rejects_the_empty_string_and_the_empty_list() {
        assert!(!FieldValue::from("").is_seedable());
        assert!(FieldValue::from(" ").is_seedable());
        assert!(!FieldValue::People(vec![]).is_seedable());
    }
}
