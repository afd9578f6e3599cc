use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Deserialize;
use std::path::Path;

use shelf::config::ShelfConfig;
use shelf::library::store;
use shelf::library::types::{NewAttribution, NewPublication, Role, TagType};

/// Import format: `{ "publications": [...] }`.
#[derive(Debug, Deserialize)]
struct ImportData {
    publications: Vec<ImportPublication>,
}

/// Accepts `"x"` or `["x", "y"]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(v) => vec![v],
            Self::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportPublication {
    name: String,
    #[serde(rename = "type")]
    publication_type: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    description: Option<String>,
    #[serde(default)]
    in_language: OneOrMany,
    #[serde(default)]
    keywords: OneOrMany,
    date_published: Option<DateTime<Utc>>,
    encoding_format: Option<String>,
    #[serde(default)]
    author: OneOrMany,
    #[serde(default)]
    editor: OneOrMany,
    #[serde(default)]
    translator: OneOrMany,
    #[serde(default)]
    stacks: Vec<String>,
    #[serde(default)]
    workspaces: Vec<String>,
    links: Option<serde_json::Value>,
    resources: Option<serde_json::Value>,
}

impl ImportPublication {
    /// Split into the write-path input and the tag names to attach.
    fn into_parts(self) -> (NewPublication, Vec<String>, Vec<String>) {
        let mut attributions = Vec::new();
        for (role, names) in [
            (Role::Author, self.author),
            (Role::Editor, self.editor),
            (Role::Translator, self.translator),
        ] {
            attributions.extend(
                names
                    .into_vec()
                    .into_iter()
                    .map(|name| NewAttribution::new(role, name)),
            );
        }

        let new = NewPublication {
            name: self.name,
            publication_type: self.publication_type.unwrap_or_else(|| "Book".into()),
            abstract_text: self.abstract_text,
            description: self.description,
            in_language: self.in_language.into_vec(),
            keywords: self.keywords.into_vec(),
            date_published: self.date_published,
            status: None,
            encoding_format: self.encoding_format,
            resources: self.resources,
            links: self.links,
            attributions,
        };
        (new, self.stacks, self.workspaces)
    }
}

/// What an import added.
#[derive(Debug, Default, PartialEq, Eq)]
struct ImportSummary {
    reader_id: String,
    publications: u64,
    memberships: u64,
}

/// Import publications from a JSON file into a reader's library, creating the
/// reader and any missing stack/workspace tags along the way.
pub fn import(config: &ShelfConfig, auth_id: &str, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;
    let data: ImportData = serde_json::from_str(&json).context("failed to parse import JSON")?;

    let db_path = config.resolved_db_path();
    let mut conn = shelf::db::open_database(&db_path)?;

    println!("Importing {} publications...", data.publications.len());
    let summary = import_data(&mut conn, auth_id, data)?;

    println!("Import complete:");
    println!("  Reader:                {}", summary.reader_id);
    println!("  Publications imported: {}", summary.publications);
    println!("  Tag memberships:       {}", summary.memberships);

    Ok(())
}

fn import_data(conn: &mut Connection, auth_id: &str, data: ImportData) -> Result<ImportSummary> {
    let reader = match store::find_reader_by_auth_id(conn, auth_id)? {
        Some(reader) => reader,
        None => store::create_reader(conn, auth_id, None)?,
    };
    let mut summary = ImportSummary {
        reader_id: reader.id.clone(),
        ..ImportSummary::default()
    };

    for item in data.publications {
        let (new, stacks, workspaces) = item.into_parts();
        let publication = store::create_publication(conn, &reader.id, &new)?;
        summary.publications += 1;

        let tags = stacks
            .iter()
            .map(|name| (name.as_str(), TagType::Stack))
            .chain(workspaces.iter().map(|name| (name.as_str(), TagType::Workspace)));
        for (name, tag_type) in tags {
            let lookup = match tag_type {
                TagType::Workspace => shelf::library::filter::title_case(name),
                _ => name.to_string(),
            };
            let tag = match store::find_tag(conn, &reader.id, &lookup, tag_type)? {
                Some(tag) => tag,
                None => store::create_tag(conn, &reader.id, name, tag_type)?,
            };
            if store::add_publication_to_tag(conn, &publication.id, &tag.id)? {
                summary.memberships += 1;
            }
        }
    }

    tracing::info!(
        reader_id = %summary.reader_id,
        publications = summary.publications,
        memberships = summary.memberships,
        "import finished"
    );
    Ok(summary)
}
