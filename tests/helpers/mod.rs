#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use rusqlite::{params, Connection};
use shelf::library::store;
use shelf::library::types::{NewPublication, Publication, Reader, Tag, TagType};
use shelf::library::{Library, RawFilter};

/// Open a fresh in-memory database with functions, schema, and migrations applied.
pub fn test_db() -> Connection {
    shelf::db::open_in_memory().unwrap()
}

pub fn reader(conn: &Connection, auth_id: &str) -> Reader {
    store::create_reader(conn, auth_id, None).unwrap()
}

pub fn add(conn: &mut Connection, reader: &Reader, new: NewPublication) -> Publication {
    store::create_publication(conn, &reader.id, &new).unwrap()
}

pub fn named(conn: &mut Connection, reader: &Reader, name: &str) -> Publication {
    add(conn, reader, NewPublication::named(name))
}

pub fn stack(conn: &Connection, reader: &Reader, name: &str) -> Tag {
    store::create_tag(conn, &reader.id, name, TagType::Stack).unwrap()
}

pub fn workspace(conn: &Connection, reader: &Reader, name: &str) -> Tag {
    store::create_tag(conn, &reader.id, name, TagType::Workspace).unwrap()
}

pub fn tag(conn: &Connection, publication: &Publication, tag: &Tag) {
    store::add_publication_to_tag(conn, &publication.id, &tag.id).unwrap();
}

/// Force a publication's `updated` timestamp to `minute` minutes past 2024-01-01.
pub fn set_updated(conn: &Connection, publication: &Publication, minute: u32) {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap();
    conn.execute(
        "UPDATE publications SET updated = ?1 WHERE id = ?2",
        params![store::format_timestamp(at), publication.id],
    )
    .unwrap();
}

pub fn year(y: i32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, 6, 1, 0, 0, 0).unwrap()
}

/// Names of every matching publication, in order.
pub fn names(conn: &Connection, reader: &Reader, filter: &RawFilter) -> Vec<String> {
    Library::new(conn)
        .page(&reader.id, usize::MAX, None, filter)
        .unwrap()
        .publications
        .into_iter()
        .map(|p| p.name)
        .collect()
}

pub fn count(conn: &Connection, reader: &Reader, filter: &RawFilter) -> u64 {
    Library::new(conn).count(&reader.id, filter).unwrap()
}

pub fn ordered(order_by: &str, reverse: bool) -> RawFilter {
    RawFilter {
        order_by: Some(order_by.into()),
        reverse: reverse.then(|| "true".to_string()),
        ..RawFilter::default()
    }
}
