//! Read path: filter → joins + predicates → distinct ids → ordered page → hydrate.
//!
//! [`Library::count`] and [`Library::page`] share one [`QueryPlan`]. The plan
//! holds the join clauses, the WHERE fragments, and their bound values, and
//! renders a single "distinct matching publication ids" subquery. Counting
//! wraps that subquery in `COUNT(*)`; paging selects publications whose id is
//! in it, orders them, and applies `LIMIT`/`OFFSET`. The attribution and tag
//! joins can multiply rows, but the id set cannot.
//!
//! Ordering always ends in `p.id` in the same direction as the primary key, so
//! a reversed listing is the exact mirror of the forward one.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::HashMap;

use crate::error::LibraryResult;
use crate::library::filter::{LibraryFilter, OrderBy, Ordering, RawFilter};
use crate::library::types::{Attribution, LibraryPage, Publication, Tag};

const AUTHOR_JOIN: &str = " JOIN attributions a_author ON a_author.publication_id = p.id";
const ATTRIBUTION_JOIN: &str = " JOIN attributions a_any ON a_any.publication_id = p.id";
const COLLECTION_JOIN: &str = " JOIN publication_tags pt_collection ON pt_collection.publication_id = p.id \
     JOIN tags t_collection ON t_collection.id = pt_collection.tag_id";
const WORKSPACE_JOIN: &str = " JOIN publication_tags pt_workspace ON pt_workspace.publication_id = p.id \
     JOIN tags t_workspace ON t_workspace.id = pt_workspace.tag_id";

const KEYWORD_MEMBER: &str =
    "EXISTS (SELECT 1 FROM json_each(p.metadata, '$.keywords') k WHERE k.value = ?)";
const LANGUAGE_MEMBER: &str =
    "EXISTS (SELECT 1 FROM json_each(p.metadata, '$.inLanguage') l WHERE l.value = ?)";
const SEARCH_GROUP: &str = "(instr(casefold(p.name), ?) > 0 \
     OR instr(casefold(p.abstract), ?) > 0 \
     OR instr(casefold(p.description), ?) > 0 \
     OR EXISTS (SELECT 1 FROM json_each(p.metadata, '$.keywords') k WHERE k.value = ?))";

/// Ids bound per hydration statement.
const HYDRATE_CHUNK: usize = 500;

const PUBLICATION_COLUMNS: &str = "p.id, p.name, p.type, p.metadata, p.date_published, p.status, \
     p.encoding_format, p.published, p.updated, p.deleted, p.resources, p.links";

// ── Query plan ────────────────────────────────────────────────────────────────

/// Joins, WHERE fragments, and bound values for one library query.
///
/// Values are positional (`?`) and appear only in WHERE fragments, so their
/// order is the order fragments were pushed.
#[derive(Debug)]
struct QueryPlan {
    joins: Vec<&'static str>,
    predicates: Vec<&'static str>,
    values: Vec<Value>,
}

impl QueryPlan {
    fn new(reader_id: &str, filter: &LibraryFilter) -> Self {
        let mut plan = Self {
            joins: Vec::new(),
            predicates: Vec::new(),
            values: Vec::new(),
        };

        plan.bind("p.reader_id = ?", [reader_id]);
        plan.bind("p.deleted IS NULL", []);

        if let Some(title) = &filter.title {
            plan.bind("instr(casefold(p.name), ?) > 0", [title.as_str()]);
        }
        if let Some(publication_type) = &filter.publication_type {
            plan.bind("p.type = ?", [publication_type.as_str()]);
        }
        if let Some(language) = &filter.language {
            plan.bind(LANGUAGE_MEMBER, [language.as_str()]);
        }
        if let Some(keyword) = &filter.keyword {
            plan.bind(KEYWORD_MEMBER, [keyword.as_str()]);
        }
        if let Some(author) = &filter.author {
            plan.joins.push(AUTHOR_JOIN);
            plan.bind("a_author.normalized_name = ?", [author.as_str()]);
            plan.bind("a_author.role = 'author'", []);
        }
        if let Some(attribution) = &filter.attribution {
            plan.joins.push(ATTRIBUTION_JOIN);
            plan.bind("instr(a_any.normalized_name, ?) > 0", [attribution.as_str()]);
            if let Some(role) = &filter.role {
                plan.bind("a_any.role = ?", [role.as_str()]);
            }
        }
        if let Some(collection) = &filter.collection {
            plan.joins.push(COLLECTION_JOIN);
            plan.bind("t_collection.name = ?", [collection.as_str()]);
            plan.bind("t_collection.type = 'stack'", []);
            plan.bind("t_collection.deleted IS NULL", []);
        }
        if let Some(workspace) = &filter.workspace {
            plan.joins.push(WORKSPACE_JOIN);
            plan.bind("t_workspace.name = ?", [workspace.as_str()]);
            plan.bind("t_workspace.type = 'workspace'", []);
            plan.bind("t_workspace.deleted IS NULL", []);
        }
        if let Some(search) = &filter.search {
            let s = search.as_str();
            plan.bind(SEARCH_GROUP, [s, s, s, s]);
        }

        plan
    }

    fn bind<const N: usize>(&mut self, fragment: &'static str, values: [&str; N]) {
        self.predicates.push(fragment);
        self.values
            .extend(values.into_iter().map(|v| Value::Text(v.to_string())));
    }

    /// `SELECT DISTINCT p.id ...` over every join and predicate.
    fn matching_ids_sql(&self) -> String {
        format!(
            "SELECT DISTINCT p.id FROM publications p{} WHERE {}",
            self.joins.concat(),
            self.predicates.join(" AND ")
        )
    }

    fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM ({})", self.matching_ids_sql())
    }

    fn page_sql(&self, ordering: Ordering) -> String {
        format!(
            "SELECT p.id FROM publications p WHERE p.id IN ({}) ORDER BY {} LIMIT ? OFFSET ?",
            self.matching_ids_sql(),
            order_clause(ordering)
        )
    }
}

fn order_clause(ordering: Ordering) -> &'static str {
    match (ordering.key, ordering.reverse) {
        (OrderBy::Title, false) => "casefold(p.name) ASC, p.name ASC, p.id ASC",
        (OrderBy::Title, true) => "casefold(p.name) DESC, p.name DESC, p.id DESC",
        (OrderBy::DatePublished, false) => "p.date_published ASC NULLS FIRST, p.id ASC",
        (OrderBy::DatePublished, true) => "p.date_published DESC NULLS LAST, p.id DESC",
        (OrderBy::Updated, false) => "p.updated DESC, p.id DESC",
        (OrderBy::Updated, true) => "p.updated ASC, p.id ASC",
    }
}

fn to_sql_int(n: usize) -> Value {
    Value::Integer(i64::try_from(n).unwrap_or(i64::MAX))
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Read-only view over one connection's library tables.
///
/// An unknown `reader_id` is not an error: it owns nothing, so counts are zero
/// and pages are empty. Resolving an auth subject to a reader (and reporting a
/// missing one) is the caller's job.
pub struct Library<'c> {
    conn: &'c Connection,
}

impl<'c> Library<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Number of distinct, non-deleted publications of `reader_id` matching `filter`.
    pub fn count(&self, reader_id: &str, filter: &RawFilter) -> LibraryResult<u64> {
        let filter = filter.normalize();
        let plan = QueryPlan::new(reader_id, &filter);

        let total: i64 = self.conn.query_row(
            &plan.count_sql(),
            params_from_iter(plan.values.iter()),
            |row| row.get(0),
        )?;

        tracing::debug!(
            reader_id,
            predicates = filter.predicate_count(),
            total,
            "library count"
        );
        Ok(total as u64)
    }

    /// One ordered page of `reader_id`'s library, plus the reader's tags.
    ///
    /// `offset` defaults to 0. Ordering comes from the filter's `orderBy` and
    /// `reverse` keys.
    pub fn page(
        &self,
        reader_id: &str,
        limit: usize,
        offset: Option<usize>,
        filter: &RawFilter,
    ) -> LibraryResult<LibraryPage> {
        let filter = filter.normalize();
        let offset = offset.unwrap_or(0);
        let plan = QueryPlan::new(reader_id, &filter);

        let mut values = plan.values.clone();
        values.push(to_sql_int(limit));
        values.push(to_sql_int(offset));

        let mut stmt = self.conn.prepare(&plan.page_sql(filter.ordering))?;
        let ids: Vec<String> = stmt
            .query_map(params_from_iter(values.iter()), |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let publications = self.hydrate(&ids)?;
        let reader_tags = self.reader_tags(reader_id)?;

        tracing::debug!(
            reader_id,
            predicates = filter.predicate_count(),
            order_by = filter.ordering.key.as_str(),
            reverse = filter.ordering.reverse,
            limit,
            offset,
            returned = publications.len(),
            "library page"
        );

        Ok(LibraryPage {
            publications,
            reader_tags,
        })
    }

    /// The reader's non-deleted tags, by name.
    pub fn reader_tags(&self, reader_id: &str) -> LibraryResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, reader_id, name, type, published, updated FROM tags \
             WHERE reader_id = ?1 AND deleted IS NULL ORDER BY name, id",
        )?;
        let tags = stmt
            .query_map(params![reader_id], tag_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    /// Load full records for `ids` and return them in the same order.
    ///
    /// Lookups bind at most [`HYDRATE_CHUNK`] ids per statement, so an
    /// unbounded page stays under SQLite's bound-parameter limit.
    fn hydrate(&self, ids: &[String]) -> LibraryResult<Vec<Publication>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows = HashMap::with_capacity(ids.len());
        let mut attributions = HashMap::new();
        let mut tags = HashMap::new();
        for chunk in ids.chunks(HYDRATE_CHUNK) {
            rows.extend(self.fetch_publications(chunk)?);
            attributions.extend(self.fetch_attributions(chunk)?);
            tags.extend(self.fetch_tags(chunk)?);
        }

        let mut publications = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(mut publication) = rows.remove(id) {
                publication.attributions = attributions.remove(id).unwrap_or_default();
                publication.tags = tags.remove(id).unwrap_or_default();
                publications.push(publication);
            }
        }
        Ok(publications)
    }

    fn fetch_publications(&self, ids: &[String]) -> LibraryResult<HashMap<String, Publication>> {
        let sql = format!(
            "SELECT {PUBLICATION_COLUMNS} FROM publications p WHERE p.id IN ({})",
            placeholders(ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(ids.iter()), |row| {
                Ok(Publication {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    publication_type: row.get(2)?,
                    metadata: json_column(row, 3)?,
                    date_published: row.get(4)?,
                    status: row.get(5)?,
                    encoding_format: row.get(6)?,
                    published: row.get(7)?,
                    updated: row.get(8)?,
                    deleted: row.get(9)?,
                    resources: json_column(row, 10)?,
                    links: json_column(row, 11)?,
                    attributions: Vec::new(),
                    tags: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows.into_iter().map(|p| (p.id.clone(), p)).collect())
    }

    fn fetch_attributions(
        &self,
        ids: &[String],
    ) -> LibraryResult<HashMap<String, Vec<Attribution>>> {
        let sql = format!(
            "SELECT id, publication_id, role, name, normalized_name, published \
             FROM attributions WHERE publication_id IN ({}) ORDER BY rowid",
            placeholders(ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(ids.iter()), |row| {
                Ok(Attribution {
                    id: row.get(0)?,
                    publication_id: row.get(1)?,
                    role: row.get(2)?,
                    name: row.get(3)?,
                    normalized_name: row.get(4)?,
                    published: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut map: HashMap<String, Vec<Attribution>> = HashMap::new();
        for attribution in rows {
            map.entry(attribution.publication_id.clone())
                .or_default()
                .push(attribution);
        }
        Ok(map)
    }

    fn fetch_tags(&self, ids: &[String]) -> LibraryResult<HashMap<String, Vec<Tag>>> {
        let sql = format!(
            "SELECT pt.publication_id, t.id, t.reader_id, t.name, t.type, t.published, t.updated \
             FROM publication_tags pt JOIN tags t ON t.id = pt.tag_id \
             WHERE pt.publication_id IN ({}) AND t.deleted IS NULL ORDER BY t.name, t.id",
            placeholders(ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(ids.iter()), |row| {
                let publication_id: String = row.get(0)?;
                Ok((
                    publication_id,
                    Tag {
                        id: row.get(1)?,
                        reader_id: row.get(2)?,
                        name: row.get(3)?,
                        tag_type: row.get(4)?,
                        published: row.get(5)?,
                        updated: row.get(6)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut map: HashMap<String, Vec<Tag>> = HashMap::new();
        for (publication_id, tag) in rows {
            map.entry(publication_id).or_default().push(tag);
        }
        Ok(map)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Decode a JSON text column; unparseable JSON reads as absent.
fn json_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<serde_json::Value>> {
    let text: Option<String> = row.get(idx)?;
    Ok(text.and_then(|s| serde_json::from_str(&s).ok()))
}

pub(crate) fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        reader_id: row.get(1)?,
        name: row.get(2)?,
        tag_type: row.get(3)?,
        published: row.get(4)?,
        updated: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::error::LibraryError;

    fn plan_for(raw: RawFilter) -> QueryPlan {
        QueryPlan::new("reader-1", &raw.normalize())
    }

    #[test]
    fn empty_filter_only_scopes_to_owner() {
        let plan = plan_for(RawFilter::default());
        assert!(plan.joins.is_empty());
        assert_eq!(plan.predicates, vec!["p.reader_id = ?", "p.deleted IS NULL"]);
        assert_eq!(plan.values, vec![Value::Text("reader-1".into())]);
    }

    #[test]
    fn author_and_attribution_join_separately() {
        let plan = plan_for(RawFilter {
            author: Some("John Doe".into()),
            attribution: Some("smith".into()),
            role: Some("editor".into()),
            ..RawFilter::default()
        });
        assert_eq!(plan.joins, vec![AUTHOR_JOIN, ATTRIBUTION_JOIN]);
        let sql = plan.matching_ids_sql();
        assert!(sql.contains("a_author.role = 'author'"));
        assert!(sql.contains("a_any.role = ?"));
        assert_eq!(
            plan.values,
            vec![
                Value::Text("reader-1".into()),
                Value::Text("johndoe".into()),
                Value::Text("smith".into()),
                Value::Text("editor".into()),
            ]
        );
    }

    #[test]
    fn role_without_attribution_adds_nothing() {
        let plan = plan_for(RawFilter {
            author: Some("John Doe".into()),
            role: Some("editor".into()),
            ..RawFilter::default()
        });
        assert!(!plan.matching_ids_sql().contains("a_any"));
        assert_eq!(plan.values.len(), 2);
    }

    #[test]
    fn search_binds_every_alternative() {
        let plan = plan_for(RawFilter {
            search: Some("Dune".into()),
            ..RawFilter::default()
        });
        assert_eq!(plan.values.len(), 5);
        assert!(plan.values[1..]
            .iter()
            .all(|v| *v == Value::Text("dune".into())));
    }

    #[test]
    fn placeholders_match_bound_values() {
        let plan = plan_for(RawFilter {
            title: Some("a".into()),
            publication_type: Some("book".into()),
            language: Some("en".into()),
            keyword: Some("k".into()),
            author: Some("x".into()),
            attribution: Some("y".into()),
            role: Some("editor".into()),
            collection: Some("c".into()),
            workspace: Some("w".into()),
            search: Some("s".into()),
            ..RawFilter::default()
        });
        let sql = plan.matching_ids_sql();
        assert_eq!(sql.matches('?').count(), plan.values.len());
    }

    #[test]
    fn reversed_orders_mirror_forward_orders() {
        for key in [OrderBy::Title, OrderBy::DatePublished, OrderBy::Updated] {
            let forward = order_clause(Ordering { key, reverse: false });
            let backward = order_clause(Ordering { key, reverse: true });
            let flipped = forward
                .replace("ASC", "TMP")
                .replace("DESC", "ASC")
                .replace("TMP", "DESC")
                .replace("NULLS FIRST", "NULLS LAST");
            assert_eq!(flipped, backward, "{key:?}");
        }
    }

    #[test]
    fn unknown_reader_yields_empty_results() {
        let conn = db::open_in_memory().unwrap();
        let library = Library::new(&conn);
        assert_eq!(library.count("nobody", &RawFilter::default()).unwrap(), 0);
        let page = library.page("nobody", 10, None, &RawFilter::default()).unwrap();
        assert!(page.publications.is_empty());
        assert!(page.reader_tags.is_empty());
    }

    #[test]
    fn storage_failure_propagates() {
        let conn = db::open_in_memory().unwrap();
        conn.execute_batch("DROP TABLE publication_tags; DROP TABLE attributions; DROP TABLE publications;")
            .unwrap();
        let library = Library::new(&conn);

        let err = library.count("reader-1", &RawFilter::default()).unwrap_err();
        assert!(matches!(err, LibraryError::Storage(_)));

        let err = library
            .page("reader-1", 10, None, &RawFilter::default())
            .unwrap_err();
        assert!(matches!(err, LibraryError::Storage(_)));
    }
}
