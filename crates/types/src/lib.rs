//! Validated value types shared across the StudyShare crates.
//!
//! Everything that crosses a crate boundary by value (category names, user identities,
//! display labels) is wrapped here so that validation happens exactly once, at construction.

/// Errors that can occur when creating validated text types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input contained a character that is not permitted for this type
    #[error("Character {0:?} is not permitted")]
    InvalidCharacter(char),

    /// The input is a reserved name
    #[error("Name {0:?} is reserved")]
    Reserved(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
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

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
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

/// Name of a category.
///
/// A category name is both a display label and a single directory segment under the files
/// root, and it is persisted inside a comma-joined list. Construction therefore enforces:
///
/// - non-empty after trimming surrounding whitespace
/// - no path separators (`/`, `\`), commas, or control characters
/// - not `.` or `..`
///
/// Comparison is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CategoryName(NonEmptyText);

impl CategoryName {
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let text = NonEmptyText::new(input)?;

        if let Some(c) = text
            .as_str()
            .chars()
            .find(|c| matches!(c, '/' | '\\' | ',') || c.is_control())
        {
            return Err(TextError::InvalidCharacter(c));
        }

        if matches!(text.as_str(), "." | "..") {
            return Err(TextError::Reserved(text.into_string()));
        }

        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<std::path::Path> for CategoryName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(self.0.as_str())
    }
}

impl std::str::FromStr for CategoryName {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for CategoryName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for CategoryName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CategoryName::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Opaque, stable identity of a user as supplied by the transport.
///
/// Numeric identities are rendered in decimal, which is also the key used in the persisted
/// stats ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(NonEmptyText);

impl UserId {
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        NonEmptyText::new(input).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        // A formatted integer is never empty.
        Self(NonEmptyText(id.to_string()))
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for UserId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        UserId::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims() {
        let text = NonEmptyText::new("  hello ").unwrap();
        assert_eq!(text.as_str(), "hello");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace() {
        assert_eq!(NonEmptyText::new("   "), Err(TextError::Empty));
        assert_eq!(NonEmptyText::new(""), Err(TextError::Empty));
    }

    #[test]
    fn test_category_name_accepts_unicode() {
        let name = CategoryName::new("Ағылшын тілі").unwrap();
        assert_eq!(name.as_str(), "Ағылшын тілі");
    }

    #[test]
    fn test_category_name_trims() {
        let name = CategoryName::new("  Math ").unwrap();
        assert_eq!(name.as_str(), "Math");
    }

    #[test]
    fn test_category_name_rejects_separators() {
        assert_eq!(
            CategoryName::new("a/b"),
            Err(TextError::InvalidCharacter('/'))
        );
        assert_eq!(
            CategoryName::new("a\\b"),
            Err(TextError::InvalidCharacter('\\'))
        );
        assert_eq!(
            CategoryName::new("Math,Physics"),
            Err(TextError::InvalidCharacter(','))
        );
        assert_eq!(
            CategoryName::new("tab\there"),
            Err(TextError::InvalidCharacter('\t'))
        );
    }

    #[test]
    fn test_category_name_rejects_dot_segments() {
        assert!(matches!(CategoryName::new(".."), Err(TextError::Reserved(_))));
        assert!(matches!(CategoryName::new(" . "), Err(TextError::Reserved(_))));
        assert!(CategoryName::new("...notes").is_ok());
    }

    #[test]
    fn test_category_name_is_case_sensitive() {
        assert_ne!(
            CategoryName::new("math").unwrap(),
            CategoryName::new("Math").unwrap()
        );
    }

    #[test]
    fn test_user_id_from_integer() {
        let id = UserId::from(123456789_i64);
        assert_eq!(id.as_str(), "123456789");
    }

    #[test]
    fn test_serde_round_trip_rejects_invalid() {
        let ok: CategoryName = serde_json::from_str("\"Physics\"").unwrap();
        assert_eq!(ok.as_str(), "Physics");

        let bad: Result<CategoryName, _> = serde_json::from_str("\"../etc\"");
        assert!(bad.is_err());
    }
}
