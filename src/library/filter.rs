//! Filter normalization.
//!
//! [`RawFilter`] is what a caller hands in (usually deserialized straight from
//! a query string). [`RawFilter::normalize`] turns it into a [`LibraryFilter`]
//! whose values are in the same form the stored columns are in, so the query
//! builder can compare them directly.
//!
//! Keys that are absent stay absent. A key that is present with an empty value
//! is still a predicate.

use serde::Deserialize;

/// User-supplied library criteria. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub attribution: Option<String>,
    pub role: Option<String>,
    #[serde(rename = "type")]
    pub publication_type: Option<String>,
    pub workspace: Option<String>,
    pub language: Option<String>,
    pub keyword: Option<String>,
    #[serde(alias = "stack")]
    pub collection: Option<String>,
    pub search: Option<String>,
    pub order_by: Option<String>,
    pub reverse: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// Sort key for library pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    Title,
    DatePublished,
    #[default]
    Updated,
}

impl OrderBy {
    /// Unrecognized or missing values fall back to [`OrderBy::Updated`].
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("title") => Self::Title,
            Some("datePublished") => Self::DatePublished,
            _ => Self::Updated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::DatePublished => "datePublished",
            Self::Updated => "updated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ordering {
    pub key: OrderBy,
    pub reverse: bool,
}

/// Canonical filter consumed by [`crate::library::query::Library`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryFilter {
    /// Lower-cased; matched as a case-insensitive substring of the name.
    pub title: Option<String>,
    /// Title-cased; matched exactly.
    pub publication_type: Option<String>,
    /// Matched exactly against `metadata.inLanguage` members.
    pub language: Option<String>,
    /// Lower-cased; matched exactly against `metadata.keywords` members.
    pub keyword: Option<String>,
    /// Normalized name; exact match on an attribution with role `author`.
    pub author: Option<String>,
    /// Normalized name; substring match on any attribution.
    pub attribution: Option<String>,
    /// Restricts `attribution` to one role.
    pub role: Option<String>,
    /// Stack tag name, case-sensitive.
    pub collection: Option<String>,
    /// Title-cased workspace tag name.
    pub workspace: Option<String>,
    /// Lower-cased; name, abstract, description, or keyword.
    pub search: Option<String>,
    pub ordering: Ordering,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl LibraryFilter {
    /// Number of WHERE predicates this filter contributes beyond ownership.
    pub fn predicate_count(&self) -> usize {
        [
            &self.title,
            &self.publication_type,
            &self.language,
            &self.keyword,
            &self.author,
            &self.attribution,
            &self.collection,
            &self.workspace,
            &self.search,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
    }
}

impl RawFilter {
    pub fn normalize(&self) -> LibraryFilter {
        LibraryFilter {
            title: self.title.as_deref().map(str::to_lowercase),
            publication_type: self.publication_type.as_deref().map(title_case),
            language: self.language.clone(),
            keyword: self.keyword.as_deref().map(str::to_lowercase),
            author: self.author.as_deref().map(normalize_name),
            attribution: self.attribution.as_deref().map(normalize_name),
            role: self.role.clone(),
            collection: self.collection.clone(),
            workspace: self.workspace.as_deref().map(title_case),
            search: self.search.as_deref().map(str::to_lowercase),
            ordering: Ordering {
                key: OrderBy::from_param(self.order_by.as_deref()),
                reverse: parse_flag(self.reverse.as_deref()),
            },
            limit: self.limit.as_deref().and_then(|v| v.trim().parse().ok()),
            offset: self.offset.as_deref().and_then(|v| v.trim().parse().ok()),
        }
    }
}

/// Fold a personal name to its matching form: lower-case, with every
/// character that is not a letter or digit removed (spaces included).
///
/// `"jo H. n'dOe"` and `"John Doe"` both become `"johndoe"`.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Upper-case the first character and lower-case the rest.
pub fn title_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => {
            let mut out: String = first.to_uppercase().collect();
            out.push_str(&chars.as_str().to_lowercase());
            out
        }
        None => String::new(),
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some(v) if v.eq_ignore_ascii_case("true") || v == "1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_name_strips_case_punctuation_and_spacing() {
        assert_eq!(normalize_name("jo H. n'dOe"), "johndoe");
        assert_eq!(normalize_name("John Doe"), "johndoe");
        assert_eq!(normalize_name("  John   DOE "), "johndoe");
        assert_eq!(normalize_name("Jané S. Doe"), "janésdoe");
    }

    #[test]
    fn title_case_handles_edges() {
        assert_eq!(title_case("book"), "Book");
        assert_eq!(title_case("RESEARCH"), "Research");
        assert_eq!(title_case("éCOLE"), "École");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn absent_keys_stay_absent() {
        let filter = RawFilter::default().normalize();
        assert_eq!(filter, LibraryFilter::default());
        assert_eq!(filter.predicate_count(), 0);
    }

    #[test]
    fn empty_values_stay_present() {
        let raw = RawFilter {
            title: Some(String::new()),
            ..RawFilter::default()
        };
        assert_eq!(raw.normalize().title.as_deref(), Some(""));
    }

    #[test]
    fn per_field_transforms() {
        let raw = RawFilter {
            title: Some("Super BOOK".into()),
            author: Some("John Doe".into()),
            attribution: Some("J. Smith".into()),
            role: Some("editor".into()),
            publication_type: Some("bOOK".into()),
            workspace: Some("research".into()),
            language: Some("EN".into()),
            keyword: Some("Rust".into()),
            collection: Some("MyStack".into()),
            search: Some("DUNE".into()),
            ..RawFilter::default()
        };
        let filter = raw.normalize();
        assert_eq!(filter.title.as_deref(), Some("super book"));
        assert_eq!(filter.author.as_deref(), Some("johndoe"));
        assert_eq!(filter.attribution.as_deref(), Some("jsmith"));
        assert_eq!(filter.role.as_deref(), Some("editor"));
        assert_eq!(filter.publication_type.as_deref(), Some("Book"));
        assert_eq!(filter.workspace.as_deref(), Some("Research"));
        assert_eq!(filter.language.as_deref(), Some("EN"));
        assert_eq!(filter.keyword.as_deref(), Some("rust"));
        assert_eq!(filter.collection.as_deref(), Some("MyStack"));
        assert_eq!(filter.search.as_deref(), Some("dune"));
        assert_eq!(filter.predicate_count(), 9);
    }

    #[test]
    fn ordering_falls_back_to_updated() {
        let raw = RawFilter {
            order_by: Some("popularity".into()),
            reverse: Some("yes".into()),
            ..RawFilter::default()
        };
        let ordering = raw.normalize().ordering;
        assert_eq!(ordering.key, OrderBy::Updated);
        assert!(!ordering.reverse);
    }

    #[test]
    fn ordering_and_paging_parse() {
        let raw = RawFilter {
            order_by: Some("datePublished".into()),
            reverse: Some("TRUE".into()),
            limit: Some("16".into()),
            offset: Some("nope".into()),
            ..RawFilter::default()
        };
        let filter = raw.normalize();
        assert_eq!(filter.ordering.key, OrderBy::DatePublished);
        assert!(filter.ordering.reverse);
        assert_eq!(filter.limit, Some(16));
        assert_eq!(filter.offset, None);
    }

    #[test]
    fn stack_is_an_alias_for_collection() {
        let raw: RawFilter = serde_json::from_str(r#"{"stack": "mystack", "orderBy": "title"}"#).unwrap();
        assert_eq!(raw.collection.as_deref(), Some("mystack"));
        assert_eq!(raw.order_by.as_deref(), Some("title"));
    }
}
