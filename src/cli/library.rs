use anyhow::{bail, Result};

use shelf::config::ShelfConfig;
use shelf::library::{store, Library, RawFilter};

/// Print one page of a reader's library from the terminal.
pub fn library(config: &ShelfConfig, auth_id: &str, filter: &RawFilter, json: bool) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = shelf::db::open_database(&db_path)?;

    let Some(reader) = store::find_reader_by_auth_id(&conn, auth_id)? else {
        bail!("reader not found: {auth_id}");
    };

    let normalized = filter.normalize();
    let limit = config.library.page_size(normalized.limit);

    let library = Library::new(&conn);
    let total = library.count(&reader.id, filter)?;
    let page = library.page(&reader.id, limit, normalized.offset, filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.publications.is_empty() {
        println!("No publications found ({total} total).");
        return Ok(());
    }

    let start = normalized.offset.unwrap_or(0);
    println!(
        "Showing {}-{} of {} (ordered by {}{})\n",
        start + 1,
        start + page.publications.len(),
        total,
        normalized.ordering.key.as_str(),
        if normalized.ordering.reverse { ", reversed" } else { "" }
    );

    for (i, publication) in page.publications.iter().enumerate() {
        let authors: Vec<&str> = publication
            .attributions
            .iter()
            .filter(|a| a.role == "author")
            .map(|a| a.name.as_str())
            .collect();
        let tags: Vec<&str> = publication.tags.iter().map(|t| t.name.as_str()).collect();

        println!(
            "  {}. {} [{}] {}",
            start + i + 1,
            publication.name,
            publication.publication_type,
            publication.id
        );
        if !authors.is_empty() {
            println!("     by {}", authors.join(", "));
        }
        if let Some(ref date) = publication.date_published {
            println!("     published {date}");
        }
        if !tags.is_empty() {
            println!("     tags: {}", tags.join(", "));
        }
    }

    Ok(())
}
