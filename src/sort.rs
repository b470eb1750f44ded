//! Sort expression parsing.
//!
//! A sort expression is a comma-separated list of `field [asc|desc]` terms,
//! as typically received from a client. Parsing never fails: empty segments
//! are dropped and anything that is not a trailing direction keyword is part
//! of the field text. Field names can be translated through a [`NameMap`]
//! (property name to column name) to produce an `ORDER BY` list for SQL.

use crate::mapping::NameMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Direction of a sort term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed `field direction` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortTerm {
    /// Field text as written by the caller.
    pub original_field: String,
    /// Field after mapping; equal to `original_field` when unmapped.
    pub mapped_field: String,
    pub direction: SortDirection,
}

/// A parsed sort expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    terms: Vec<SortTerm>,
}

/// Strip a case-insensitive trailing keyword such as `" desc"`.
fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let split = text.len().checked_sub(suffix.len())?;
    if !text.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = text.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

/// Split a trimmed segment into field text and direction.
fn split_direction(segment: &str) -> (&str, SortDirection) {
    if segment.eq_ignore_ascii_case("desc") {
        return ("", SortDirection::Desc);
    }
    if segment.eq_ignore_ascii_case("asc") {
        return ("", SortDirection::Asc);
    }
    if let Some(field) = strip_suffix_ignore_case(segment, " desc") {
        return (field.trim(), SortDirection::Desc);
    }
    if let Some(field) = strip_suffix_ignore_case(segment, " asc") {
        return (field.trim(), SortDirection::Asc);
    }
    (segment, SortDirection::Asc)
}

impl SortSpec {
    /// Parse a sort expression without field mapping.
    pub fn parse(raw: &str) -> Self {
        Self::parse_with_mapping(raw, None)
    }

    /// Parse a sort expression, translating fields through `mapping`.
    ///
    /// Lookups ignore case; unmapped fields keep their original text.
    pub fn parse_with_mapping(raw: &str, mapping: Option<&NameMap>) -> Self {
        let mut terms = Vec::new();

        for segment in raw.split(',') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let (field, direction) = split_direction(segment);
            if field.is_empty() {
                debug!(segment = %segment, "Dropping sort term without a field");
                continue;
            }

            let mapped_field = mapping
                .and_then(|m| m.get(field))
                .unwrap_or(field)
                .to_string();

            terms.push(SortTerm {
                original_field: field.to_string(),
                mapped_field,
                direction,
            });
        }

        Self { terms }
    }

    pub fn terms(&self) -> &[SortTerm] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms rendered with their original field names.
    pub fn parsed(&self) -> String {
        self.render(|t| t.original_field.as_str())
    }

    /// Terms rendered with their mapped field names.
    pub fn mapped(&self) -> String {
        self.render(|t| t.mapped_field.as_str())
    }

    /// `ORDER BY` clause built from the mapped rendering, if there are terms.
    pub fn order_by_clause(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(format!("ORDER BY {}", self.mapped()))
        }
    }

    /// Whether every mapped field is a plain, optionally qualified identifier.
    ///
    /// Field text is interpolated into SQL as-is; callers passing untrusted
    /// input should check this first.
    pub fn has_only_safe_identifiers(&self) -> bool {
        self.terms.iter().all(|t| {
            !t.mapped_field.is_empty()
                && t
                    .mapped_field
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        })
    }

    fn render<'a>(&'a self, field: impl Fn(&'a SortTerm) -> &'a str) -> String {
        self.terms
            .iter()
            .map(|t| format!("{} {}", field(t), t.direction))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromStr for SortSpec {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directions() {
        let spec = SortSpec::parse("name desc, age");
        assert_eq!(spec.parsed(), "name DESC,age ASC");
        assert_eq!(spec.mapped(), "name DESC,age ASC");
    }

    #[test]
    fn test_direction_keyword_is_case_insensitive() {
        let spec = SortSpec::parse("Name DeSc,Age ASC");
        assert_eq!(spec.terms()[0].original_field, "Name");
        assert_eq!(spec.terms()[0].direction, SortDirection::Desc);
        assert_eq!(spec.terms()[1].direction, SortDirection::Asc);
    }

    #[test]
    fn test_mapping_applies_to_mapped_rendering() {
        let mapping = NameMap::from([("FullName", "full_name")]);
        let spec = SortSpec::parse_with_mapping("fullname desc, age", Some(&mapping));
        assert_eq!(spec.parsed(), "fullname DESC,age ASC");
        assert_eq!(spec.mapped(), "full_name DESC,age ASC");
    }

    #[test]
    fn test_empty_input() {
        let spec = SortSpec::parse("");
        assert!(spec.is_empty());
        assert_eq!(spec.parsed(), "");
        assert_eq!(spec.order_by_clause(), None);
    }

    #[test]
    fn test_empty_segments_and_fields_are_dropped() {
        let spec = SortSpec::parse(" , name,, desc , asc");
        assert_eq!(spec.len(), 1);
        assert_eq!(spec.parsed(), "name ASC");
    }

    #[test]
    fn test_keyword_must_be_separated() {
        // "namedesc" has no separating space, so it is a field name
        let spec = SortSpec::parse("namedesc");
        assert_eq!(spec.parsed(), "namedesc ASC");
    }

    #[test]
    fn test_extra_inner_whitespace_is_trimmed() {
        let spec = SortSpec::parse("name    desc");
        assert_eq!(spec.terms()[0].original_field, "name");
    }

    #[test]
    fn test_non_ascii_field_does_not_panic() {
        let spec = SortSpec::parse("名前 desc,é");
        assert_eq!(spec.parsed(), "名前 DESC,é ASC");
    }

    #[test]
    fn test_order_by_clause_and_safety() {
        let spec = SortSpec::parse("u.name desc");
        assert_eq!(spec.order_by_clause().as_deref(), Some("ORDER BY u.name DESC"));
        assert!(spec.has_only_safe_identifiers());
        assert!(!SortSpec::parse("name; DROP TABLE users").has_only_safe_identifiers());
    }

    #[test]
    fn test_from_str_and_display_round_trip() {
        let spec: SortSpec = "a desc, b".parse().unwrap();
        assert_eq!(spec.to_string(), "a DESC,b ASC");
        assert_eq!(SortSpec::parse(&spec.to_string()), spec);
    }
}
