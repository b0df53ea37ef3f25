//! Validated text primitives shared across the grants workspace.
//!
//! These types carry their invariants in the type itself so that callers deeper in the stack
//! (the form engine, the stores, the API layer) never need to re-check them.

use std::fmt;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input contained a character that is not allowed for this type
    #[error("Text contains an invalid character: {0:?}")]
    InvalidCharacter(char),
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction. If nothing is
/// left, construction fails.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// The name of a user role, as used by section `editable_by` lists and permission checks.
///
/// Role names are compared exactly (case-sensitive) after trimming. They may not contain
/// whitespace or commas, since role lists are configured as comma-separated values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleName(NonEmptyText);

impl RoleName {
    /// Creates a validated role name.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] for blank input and [`TextError::InvalidCharacter`] when the
    /// name contains whitespace or a comma.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let text = NonEmptyText::new(input)?;
        if let Some(bad) = text
            .as_str()
            .chars()
            .find(|c| c.is_whitespace() || *c == ',')
        {
            return Err(TextError::InvalidCharacter(bad));
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for RoleName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::str::FromStr for RoleName {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleName::new(s)
    }
}

impl serde::Serialize for RoleName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for RoleName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RoleName::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_input() {
        let text = NonEmptyText::new("  Siyakhula Trust  ").unwrap();
        assert_eq!(text.as_str(), "Siyakhula Trust");
    }

    #[test]
    fn non_empty_text_rejects_whitespace_only() {
        assert_eq!(NonEmptyText::new(" \t\n"), Err(TextError::Empty));
    }

    #[test]
    fn role_name_rejects_embedded_whitespace_and_commas() {
        assert_eq!(
            RoleName::new("PROGRAMME OFFICER"),
            Err(TextError::InvalidCharacter(' '))
        );
        assert_eq!(
            RoleName::new("ADMIN,USER"),
            Err(TextError::InvalidCharacter(','))
        );
    }

    #[test]
    fn role_name_deserialises_from_json_string() {
        let role: RoleName = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(role.as_str(), "ADMIN");

        let err = serde_json::from_str::<RoleName>("\"  \"");
        assert!(err.is_err());
    }
}
