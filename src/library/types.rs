//! Record and projection types for the reading library.
//!
//! [`Publication`] is the library listing projection: every field a listing
//! shows, with its [`Attribution`]s and [`Tag`]s nested. [`NewPublication`] and
//! [`NewAttribution`] are the write-side inputs accepted by
//! [`crate::library::store`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contributor roles an attribution can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Author,
    Editor,
    Contributor,
    Creator,
    Illustrator,
    Publisher,
    Translator,
}

impl Role {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Author => "author",
            Self::Editor => "editor",
            Self::Contributor => "contributor",
            Self::Creator => "creator",
            Self::Illustrator => "illustrator",
            Self::Publisher => "publisher",
            Self::Translator => "translator",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "author" => Ok(Self::Author),
            "editor" => Ok(Self::Editor),
            "contributor" => Ok(Self::Contributor),
            "creator" => Ok(Self::Creator),
            "illustrator" => Ok(Self::Illustrator),
            "publisher" => Ok(Self::Publisher),
            "translator" => Ok(Self::Translator),
            _ => Err(format!("unknown attribution role: {s}")),
        }
    }
}

/// Tag kinds. Stacks are the reader's collections; workspaces group
/// publications by activity (e.g. "Research", "Teaching").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagType {
    Stack,
    Workspace,
    Flag,
}

impl TagType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stack => "stack",
            Self::Workspace => "workspace",
            Self::Flag => "flag",
        }
    }
}

impl std::fmt::Display for TagType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TagType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stack" => Ok(Self::Stack),
            "workspace" => Ok(Self::Workspace),
            "flag" => Ok(Self::Flag),
            _ => Err(format!("unknown tag type: {s}")),
        }
    }
}

/// A reader account. `auth_id` is the authentication subject the reader
/// was registered under.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reader {
    pub id: String,
    pub auth_id: String,
    pub name: Option<String>,
    pub published: String,
    pub updated: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribution {
    pub id: String,
    pub publication_id: String,
    pub role: String,
    pub name: String,
    /// Case-folded, punctuation-free form of `name` used for matching.
    pub normalized_name: String,
    pub published: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub reader_id: String,
    pub name: String,
    /// Stored as text so tag kinds written by other tools still load.
    #[serde(rename = "type")]
    pub tag_type: String,
    pub published: String,
    pub updated: String,
}

/// A publication as shown in library listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub publication_type: String,
    /// JSON document; `inLanguage` and `keywords` are arrays of strings.
    pub metadata: Option<serde_json::Value>,
    pub date_published: Option<String>,
    pub status: Option<String>,
    pub encoding_format: Option<String>,
    pub published: String,
    pub updated: String,
    pub deleted: Option<String>,
    pub resources: Option<serde_json::Value>,
    pub links: Option<serde_json::Value>,
    pub attributions: Vec<Attribution>,
    pub tags: Vec<Tag>,
}

/// One page of a reader's library plus the reader's own tags.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryPage {
    pub publications: Vec<Publication>,
    pub reader_tags: Vec<Tag>,
}

/// An attribution to create alongside a publication.
#[derive(Debug, Clone)]
pub struct NewAttribution {
    pub role: Role,
    pub name: String,
}

impl NewAttribution {
    pub fn new(role: Role, name: impl Into<String>) -> Self {
        Self {
            role,
            name: name.into(),
        }
    }
}

/// Input for [`crate::library::store::create_publication`].
#[derive(Debug, Clone)]
pub struct NewPublication {
    pub name: String,
    /// Normalized to title case on insert (`"book"` → `"Book"`).
    pub publication_type: String,
    pub abstract_text: Option<String>,
    pub description: Option<String>,
    pub in_language: Vec<String>,
    /// Lower-cased on insert.
    pub keywords: Vec<String>,
    pub date_published: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub encoding_format: Option<String>,
    pub resources: Option<serde_json::Value>,
    pub links: Option<serde_json::Value>,
    pub attributions: Vec<NewAttribution>,
}

impl Default for NewPublication {
    fn default() -> Self {
        Self {
            name: String::new(),
            publication_type: "Book".into(),
            abstract_text: None,
            description: None,
            in_language: Vec::new(),
            keywords: Vec::new(),
            date_published: None,
            status: None,
            encoding_format: None,
            resources: None,
            links: None,
            attributions: Vec::new(),
        }
    }
}

impl NewPublication {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_author(mut self, name: impl Into<String>) -> Self {
        self.attributions.push(NewAttribution::new(Role::Author, name));
        self
    }

    pub fn with_editor(mut self, name: impl Into<String>) -> Self {
        self.attributions.push(NewAttribution::new(Role::Editor, name));
        self
    }
}
