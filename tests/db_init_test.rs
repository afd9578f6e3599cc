mod helpers;

use helpers::{named, reader, stack, tag};
use shelf::db::{self, migrations};
use shelf::library::store;

#[test]
fn open_database_creates_parent_dirs_and_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("library.db");

    let conn = db::open_database(&path).unwrap();
    assert!(path.exists());

    let busy: i64 = conn
        .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
        .unwrap();
    assert_eq!(busy, 5000);

    let journal: String = conn
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal.to_lowercase(), "wal");

    assert_eq!(
        migrations::get_schema_version(&conn).unwrap(),
        migrations::CURRENT_SCHEMA_VERSION
    );
}

#[test]
fn reopening_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("library.db");

    let reader_id = {
        let mut conn = db::open_database(&path).unwrap();
        let r = reader(&conn, "auth0|reader");
        named(&mut conn, &r, "persisted");
        r.id
    };

    let conn = db::open_database(&path).unwrap();
    let found = store::find_reader_by_auth_id(&conn, "auth0|reader")
        .unwrap()
        .unwrap();
    assert_eq!(found.id, reader_id);
    let report = db::check_database_health(&conn).unwrap();
    assert_eq!(report.publication_count, 1);
}

#[test]
fn health_report_counts_live_and_deleted_rows() {
    let mut conn = helpers::test_db();
    let r = reader(&conn, "auth0|reader");
    let kept = named(&mut conn, &r, "kept");
    let gone = named(&mut conn, &r, "gone");
    let s = stack(&conn, &r, "mystack");
    tag(&conn, &kept, &s);
    store::delete_publication(&conn, &gone.id).unwrap();

    let report = db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.reader_count, 1);
    assert_eq!(report.publication_count, 1);
    assert_eq!(report.deleted_publication_count, 1);
    assert_eq!(report.tag_count, 1);
    // reader, two publications, and the tag are created; one add, one delete
    assert_eq!(report.activity_count, 6);
}
