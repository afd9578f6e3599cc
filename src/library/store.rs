//! Write path: readers, publications with their attributions, tags, and
//! tag membership.
//!
//! Every mutation records an ActivityStreams-style entry (`Create`, `Update`,
//! `Delete`, `Add`, `Remove`) in `activity_log`, in the same transaction as
//! the change it records. Deletes are soft: they set `deleted`, and the
//! library read path treats such rows as absent.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::library::filter::{normalize_name, title_case};
use crate::library::types::{
    Attribution, NewPublication, Publication, Reader, Tag, TagType,
};

/// Fixed-width RFC 3339 (microseconds, `Z`), so text order is time order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn now() -> String {
    format_timestamp(Utc::now())
}

fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

// ── Readers ───────────────────────────────────────────────────────────────────

pub fn create_reader(conn: &Connection, auth_id: &str, name: Option<&str>) -> Result<Reader> {
    if auth_id.is_empty() {
        bail!("reader auth id must not be empty");
    }
    let id = new_id();
    let now = now();
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO readers (id, auth_id, name, published, updated) VALUES (?1, ?2, ?3, ?4, ?4)",
        params![id, auth_id, name, now],
    )
    .with_context(|| format!("failed to create reader for {auth_id}"))?;
    write_activity(&tx, &id, "Create", &id, None)?;
    tx.commit()?;

    tracing::info!(reader_id = %id, "reader created");
    Ok(Reader {
        id,
        auth_id: auth_id.to_string(),
        name: name.map(str::to_string),
        published: now.clone(),
        updated: now,
    })
}

pub fn find_reader_by_auth_id(conn: &Connection, auth_id: &str) -> Result<Option<Reader>> {
    query_reader(conn, "auth_id", auth_id)
}

pub fn get_reader(conn: &Connection, id: &str) -> Result<Option<Reader>> {
    query_reader(conn, "id", id)
}

fn query_reader(conn: &Connection, column: &str, value: &str) -> Result<Option<Reader>> {
    let reader = conn
        .query_row(
            &format!(
                "SELECT id, auth_id, name, published, updated FROM readers WHERE {column} = ?1"
            ),
            params![value],
            |row| {
                Ok(Reader {
                    id: row.get(0)?,
                    auth_id: row.get(1)?,
                    name: row.get(2)?,
                    published: row.get(3)?,
                    updated: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(reader)
}

// ── Publications ──────────────────────────────────────────────────────────────

/// Insert a publication and its attributions in one transaction.
///
/// `type` is title-cased, keywords are lower-cased, and each attribution gets
/// its `normalized_name`, so stored values line up with normalized filters.
pub fn create_publication(
    conn: &mut Connection,
    reader_id: &str,
    new: &NewPublication,
) -> Result<Publication> {
    if new.name.is_empty() {
        bail!("publication name must not be empty");
    }

    let tx = conn.transaction()?;
    let id = new_id();
    let now = now();

    let metadata = serde_json::json!({
        "inLanguage": new.in_language,
        "keywords": new.keywords.iter().map(|k| k.to_lowercase()).collect::<Vec<_>>(),
    });
    let publication_type = title_case(&new.publication_type);
    let date_published = new.date_published.map(format_timestamp);
    let resources = new.resources.as_ref().map(|v| v.to_string());
    let links = new.links.as_ref().map(|v| v.to_string());

    tx.execute(
        "INSERT INTO publications (id, reader_id, name, type, abstract, description, metadata, \
         date_published, status, encoding_format, resources, links, published, updated) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
        params![
            id,
            reader_id,
            new.name,
            publication_type,
            new.abstract_text,
            new.description,
            metadata.to_string(),
            date_published,
            new.status,
            new.encoding_format,
            resources,
            links,
            now,
        ],
    )
    .with_context(|| format!("failed to insert publication {:?}", new.name))?;

    let mut attributions = Vec::with_capacity(new.attributions.len());
    for attribution in &new.attributions {
        let attribution_id = new_id();
        let normalized = normalize_name(&attribution.name);
        tx.execute(
            "INSERT INTO attributions (id, publication_id, reader_id, role, name, normalized_name, published) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                attribution_id,
                id,
                reader_id,
                attribution.role.as_str(),
                attribution.name,
                normalized,
                now,
            ],
        )?;
        attributions.push(Attribution {
            id: attribution_id,
            publication_id: id.clone(),
            role: attribution.role.as_str().to_string(),
            name: attribution.name.clone(),
            normalized_name: normalized,
            published: now.clone(),
        });
    }

    write_activity(&tx, reader_id, "Create", &id, None)?;
    tx.commit()?;

    tracing::debug!(
        publication_id = %id,
        reader_id,
        attributions = attributions.len(),
        "publication created"
    );

    Ok(Publication {
        id,
        name: new.name.clone(),
        publication_type,
        metadata: Some(metadata),
        date_published,
        status: new.status.clone(),
        encoding_format: new.encoding_format.clone(),
        published: now.clone(),
        updated: now,
        deleted: None,
        resources: new.resources.clone(),
        links: new.links.clone(),
        attributions,
        tags: Vec::new(),
    })
}

/// Bump a publication's `updated` timestamp.
pub fn touch_publication(conn: &Connection, publication_id: &str) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    let reader_id = live_publication_owner(&tx, publication_id)?;
    tx.execute(
        "UPDATE publications SET updated = ?1 WHERE id = ?2",
        params![now(), publication_id],
    )?;
    write_activity(&tx, &reader_id, "Update", publication_id, None)?;
    tx.commit()?;
    Ok(())
}

/// Soft-delete a publication.
pub fn delete_publication(conn: &Connection, publication_id: &str) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    let reader_id = live_publication_owner(&tx, publication_id)?;
    tx.execute(
        "UPDATE publications SET deleted = ?1 WHERE id = ?2",
        params![now(), publication_id],
    )?;
    write_activity(&tx, &reader_id, "Delete", publication_id, None)?;
    tx.commit()?;
    tracing::info!(publication_id, "publication deleted");
    Ok(())
}

fn live_publication_owner(conn: &Connection, publication_id: &str) -> Result<String> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT reader_id FROM publications WHERE id = ?1 AND deleted IS NULL",
            params![publication_id],
            |row| row.get(0),
        )
        .optional()?;
    match owner {
        Some(reader_id) => Ok(reader_id),
        None => bail!("publication not found: {publication_id}"),
    }
}

// ── Tags ──────────────────────────────────────────────────────────────────────

/// Create a tag. Workspace names are stored title-cased; stack names as given.
pub fn create_tag(conn: &Connection, reader_id: &str, name: &str, tag_type: TagType) -> Result<Tag> {
    if name.is_empty() {
        bail!("tag name must not be empty");
    }
    let name = match tag_type {
        TagType::Workspace => title_case(name),
        TagType::Stack | TagType::Flag => name.to_string(),
    };
    let id = new_id();
    let now = now();

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO tags (id, reader_id, name, type, published, updated) VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![id, reader_id, name, tag_type.as_str(), now],
    )
    .with_context(|| format!("failed to create {tag_type} tag {name:?}"))?;
    write_activity(&tx, reader_id, "Create", &id, None)?;
    tx.commit()?;

    Ok(Tag {
        id,
        reader_id: reader_id.to_string(),
        name,
        tag_type: tag_type.as_str().to_string(),
        published: now.clone(),
        updated: now,
    })
}

/// Soft-delete a tag. Memberships stay in place but stop matching.
pub fn delete_tag(conn: &Connection, tag_id: &str) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    let reader_id = live_tag_owner(&tx, tag_id)?;
    tx.execute(
        "UPDATE tags SET deleted = ?1 WHERE id = ?2",
        params![now(), tag_id],
    )?;
    write_activity(&tx, &reader_id, "Delete", tag_id, None)?;
    tx.commit()?;
    Ok(())
}

fn live_tag_owner(conn: &Connection, tag_id: &str) -> Result<String> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT reader_id FROM tags WHERE id = ?1 AND deleted IS NULL",
            params![tag_id],
            |row| row.get(0),
        )
        .optional()?;
    match owner {
        Some(reader_id) => Ok(reader_id),
        None => bail!("tag not found: {tag_id}"),
    }
}

/// Put a publication in a tag. Both must be live and owned by the same reader.
///
/// Returns `false` when the membership already existed; nothing is written then.
pub fn add_publication_to_tag(conn: &Connection, publication_id: &str, tag_id: &str) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;
    let reader_id = live_publication_owner(&tx, publication_id)?;
    let tag_owner = live_tag_owner(&tx, tag_id)?;
    if reader_id != tag_owner {
        bail!("tag {tag_id} and publication {publication_id} belong to different readers");
    }

    let inserted = tx.execute(
        "INSERT OR IGNORE INTO publication_tags (publication_id, tag_id) VALUES (?1, ?2)",
        params![publication_id, tag_id],
    )? > 0;
    if inserted {
        write_activity(&tx, &reader_id, "Add", publication_id, Some(tag_id))?;
    }
    tx.commit()?;
    Ok(inserted)
}

pub fn remove_publication_from_tag(
    conn: &Connection,
    publication_id: &str,
    tag_id: &str,
) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    let reader_id = live_tag_owner(&tx, tag_id)?;
    let removed = tx.execute(
        "DELETE FROM publication_tags WHERE publication_id = ?1 AND tag_id = ?2",
        params![publication_id, tag_id],
    )?;
    if removed > 0 {
        write_activity(&tx, &reader_id, "Remove", publication_id, Some(tag_id))?;
    }
    tx.commit()?;
    Ok(())
}

/// Look up a reader's live tag by type and exact name.
pub fn find_tag(
    conn: &Connection,
    reader_id: &str,
    name: &str,
    tag_type: TagType,
) -> Result<Option<Tag>> {
    let tag = conn
        .query_row(
            "SELECT id, reader_id, name, type, published, updated FROM tags \
             WHERE reader_id = ?1 AND name = ?2 AND type = ?3 AND deleted IS NULL",
            params![reader_id, name, tag_type.as_str()],
            crate::library::query::tag_from_row,
        )
        .optional()?;
    Ok(tag)
}

// ── Activity log ──────────────────────────────────────────────────────────────

/// Write an entry to the activity_log table.
pub(crate) fn write_activity(
    conn: &Connection,
    reader_id: &str,
    activity_type: &str,
    object_id: &str,
    target_id: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO activity_log (reader_id, type, object_id, target_id, published) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![reader_id, activity_type, object_id, target_id, now()],
    )?;
    Ok(())
}
