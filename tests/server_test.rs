mod helpers;

use std::sync::{Arc, Mutex};

use helpers::{add, named, reader, stack, tag, test_db};
use shelf::config::ShelfConfig;
use shelf::library::types::NewPublication;

/// Serve a router over `conn` on an ephemeral port and return its base URL.
async fn spawn_server(conn: rusqlite::Connection) -> String {
    let app = shelf::server::router(
        Arc::new(Mutex::new(conn)),
        Arc::new(ShelfConfig::default()),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn get_json(url: &str) -> (u16, serde_json::Value) {
    let resp = reqwest::get(url).await.unwrap();
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap();
    (status, serde_json::from_str(&body).unwrap())
}

#[tokio::test]
async fn library_filters_by_stack_alias() {
    let mut conn = test_db();
    let r = reader(&conn, "auth0|reader");
    named(&mut conn, &r, "Publication A");
    let b = add(&mut conn, &r, NewPublication::named("Publication B").with_author("John Doe"));
    let s = stack(&conn, &r, "mystack");
    tag(&conn, &b, &s);

    let base = spawn_server(conn).await;
    let (status, body) = get_json(&format!("{base}/readers/{}/library?stack=mystack", r.id)).await;

    assert_eq!(status, 200);
    assert_eq!(body["type"], "Collection");
    assert_eq!(body["totalItems"], 1);
    assert_eq!(body["items"][0]["name"], "Publication B");
    assert_eq!(body["items"][0]["attributions"][0]["name"], "John Doe");
    assert_eq!(body["items"][0]["tags"][0]["name"], "mystack");
    assert_eq!(body["tags"][0]["type"], "stack");
}

#[tokio::test]
async fn library_reports_total_beyond_page() {
    let mut conn = test_db();
    let r = reader(&conn, "auth0|reader");
    for i in 0..12 {
        named(&mut conn, &r, &format!("Publication {i:02}"));
    }

    let base = spawn_server(conn).await;
    let (status, body) = get_json(&format!(
        "{base}/readers/{}/library?orderBy=title&limit=5&offset=10",
        r.id
    ))
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["totalItems"], 12);
    assert_eq!(body["pageSize"], 5);
    assert_eq!(body["offset"], 10);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "Publication 10");
}

#[tokio::test]
async fn unparseable_limit_uses_default_page_size() {
    let mut conn = test_db();
    let r = reader(&conn, "auth0|reader");
    for i in 0..12 {
        named(&mut conn, &r, &format!("Publication {i}"));
    }

    let base = spawn_server(conn).await;
    let (_, body) = get_json(&format!("{base}/readers/{}/library?limit=lots", r.id)).await;

    assert_eq!(body["pageSize"], 10);
    assert_eq!(body["items"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn unknown_reader_is_not_found() {
    let base = spawn_server(test_db()).await;

    let (status, body) = get_json(&format!("{base}/readers/nobody/library")).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _) = get_json(&format!("{base}/readers/nobody/tags")).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn tags_endpoint_lists_reader_tags() {
    let conn = test_db();
    let r = reader(&conn, "auth0|reader");
    stack(&conn, &r, "to read");
    stack(&conn, &r, "favourites");

    let base = spawn_server(conn).await;
    let (status, body) = get_json(&format!("{base}/readers/{}/tags", r.id)).await;

    assert_eq!(status, 200);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["favourites", "to read"]);
}

#[tokio::test]
async fn health_reports_version() {
    let base = spawn_server(test_db()).await;
    let (status, body) = get_json(&format!("{base}/health")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
