//! Record definitions for extracted listing entries
//!
//! A record is built once per result block and never changes afterwards.

use std::fmt;

/// Column names in the order every record store writes them
pub const FIELD_NAMES: [&str; 4] = ["primary_key", "title", "link", "location"];

/// One extracted listing entry
///
/// Fields are trimmed and never empty: a blank input is replaced with
/// `"No <field-name>"`. Two records describe the same entity when their
/// `primary_key` matches; the pipeline deduplicates on that key alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    primary_key: String,
    title: String,
    link: String,
    location: String,
}

impl Record {
    /// Builds a normalized record from raw extracted text
    ///
    /// This never fails. Missing values end up as sentinel text so every
    /// consumer can rely on all four fields being present.
    ///
    /// # Example
    ///
    /// ```
    /// use listing_harvest::Record;
    ///
    /// let record = Record::new("  Acme Corp ", "", "https://example.com/1", "Remote");
    /// assert_eq!(record.primary_key(), "Acme Corp");
    /// assert_eq!(record.title(), "No title");
    /// ```
    pub fn new(
        primary_key: impl AsRef<str>,
        title: impl AsRef<str>,
        link: impl AsRef<str>,
        location: impl AsRef<str>,
    ) -> Self {
        Self {
            primary_key: normalize_field(FIELD_NAMES[0], primary_key.as_ref()),
            title: normalize_field(FIELD_NAMES[1], title.as_ref()),
            link: normalize_field(FIELD_NAMES[2], link.as_ref()),
            location: normalize_field(FIELD_NAMES[3], location.as_ref()),
        }
    }

    /// Same as [`Record::new`]
    pub fn normalize(
        primary_key: impl AsRef<str>,
        title: impl AsRef<str>,
        link: impl AsRef<str>,
        location: impl AsRef<str>,
    ) -> Self {
        Self::new(primary_key, title, link, location)
    }

    /// The deduplication key (company name for job listings)
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Returns the fields in store column order
    pub fn as_row(&self) -> [&str; 4] {
        [&self.primary_key, &self.title, &self.link, &self.location]
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} ({})", self.primary_key, self.title, self.location)
    }
}

/// Trims a raw value and substitutes the sentinel for blank input
fn normalize_field(name: &str, raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("No {}", name)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_get_sentinels() {
        let record = Record::new("", "", "", "");
        assert_eq!(record.primary_key(), "No primary_key");
        assert_eq!(record.title(), "No title");
        assert_eq!(record.link(), "No link");
        assert_eq!(record.location(), "No location");
    }

    #[test]
    fn test_normalize_matches_new() {
        assert_eq!(
            Record::normalize(" a ", "", "l", "x"),
            Record::new("a", "No title", "l", "x")
        );
    }

    #[test]
    fn test_fields_are_trimmed() {
        let record = Record::new(
            "\n  Acme Corp  ",
            " Software Engineer\t",
            "  https://example.com/jobs/1 ",
            " Austin, TX ",
        );
        assert_eq!(record.primary_key(), "Acme Corp");
        assert_eq!(record.title(), "Software Engineer");
        assert_eq!(record.link(), "https://example.com/jobs/1");
        assert_eq!(record.location(), "Austin, TX");
    }

    #[test]
    fn test_whitespace_only_field_is_blank() {
        let record = Record::new("Acme", "   ", "https://example.com", "Remote");
        assert_eq!(record.title(), "No title");
    }

    #[test]
    fn test_inner_whitespace_preserved() {
        let record = Record::new("Acme  Widgets", "Senior  Engineer", "l", "New York");
        assert_eq!(record.primary_key(), "Acme  Widgets");
        assert_eq!(record.title(), "Senior  Engineer");
    }

    #[test]
    fn test_row_order_matches_field_names() {
        let record = Record::new("Acme", "Engineer", "https://example.com", "Remote");
        assert_eq!(
            record.as_row(),
            ["Acme", "Engineer", "https://example.com", "Remote"]
        );
        assert_eq!(FIELD_NAMES, ["primary_key", "title", "link", "location"]);
    }

    #[test]
    fn test_display() {
        let record = Record::new("Acme", "Engineer", "https://example.com", "Remote");
        assert_eq!(record.to_string(), "Acme - Engineer (Remote)");
    }
}
