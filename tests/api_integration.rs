use notion_sync::api::{NotionClient, RemoteSource};
use notion_sync::assets::AssetStore;
use notion_sync::config::NotionSettings;
use notion_sync::storage::Paths;
use notion_sync::{Block, DocumentKind, DocumentStatus};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(uri: String, database_id: Option<&str>) -> NotionSettings {
    NotionSettings {
        api_base: uri,
        database_id: database_id.map(str::to_string),
        ..NotionSettings::default()
    }
}

fn page(id: &str, title: &str, slug: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "object": "page",
        "id": id,
        "created_time": "2025-01-02T08:00:00.000Z",
        "last_edited_time": "2025-03-04T09:30:00.000Z",
        "cover": null,
        "properties": {
            "Title": { "type": "title", "title": [ { "plain_text": title, "text": { "content": title } } ] },
            "Slug": { "type": "rich_text", "rich_text": [ { "plain_text": slug, "text": { "content": slug } } ] },
            "Status": { "type": "select", "select": { "name": status } }
        }
    })
}

#[tokio::test]
async fn test_search_lists_titled_pages() {
    let mock_server = MockServer::start().await;

    let response = serde_json::json!({
        "object": "list",
        "results": [
            page("p1", "Hello", "hello", "Draft"),
            page("p2", "", "", "Published")
        ],
        "has_more": false,
        "next_cursor": null
    });

    Mock::given(method("POST"))
        .and(path("/v1/search"))
        .and(header("Authorization", "Bearer test_token"))
        .and(header("Notion-Version", "2022-06-28"))
        .and(body_partial_json(serde_json::json!({
            "filter": { "property": "object", "value": "page" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();

    let result = tokio::task::spawn_blocking(move || {
        let client = NotionClient::new("test_token".into(), &settings(uri, None))
            .unwrap()
            .disable_throttle();
        client.list_documents()
    })
    .await
    .unwrap();

    let docs = result.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "p1");
    assert_eq!(docs[0].slug, "hello");
    assert_eq!(docs[0].status, DocumentStatus::Draft);
    assert_eq!(docs[0].kind, DocumentKind::Post);
}

#[tokio::test]
async fn test_database_query_follows_pagination() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/databases/db1/query"))
        .and(body_partial_json(serde_json::json!({ "start_cursor": "cursor-2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [ page("p2", "Second", "second", "Published") ],
            "has_more": false,
            "next_cursor": null
        })))
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/databases/db1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [ page("p1", "First", "first", "Published") ],
            "has_more": true,
            "next_cursor": "cursor-2"
        })))
        .with_priority(2)
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();

    let docs = tokio::task::spawn_blocking(move || {
        let client = NotionClient::new("t".into(), &settings(uri, Some("db1")))
            .unwrap()
            .disable_throttle();
        client.list_documents()
    })
    .await
    .unwrap()
    .unwrap();

    let slugs: Vec<_> = docs.iter().map(|d| d.slug.as_str()).collect();
    assert_eq!(slugs, vec!["first", "second"]);
}

#[tokio::test]
async fn test_fetch_blocks_paginates_in_order() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/p1/children"))
        .and(query_param("start_cursor", "next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [
                { "type": "bulleted_list_item", "bulleted_list_item": { "rich_text": [ { "plain_text": "b" } ] } }
            ],
            "has_more": false,
            "next_cursor": null
        })))
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/p1/children"))
        .and(query_param("page_size", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [
                { "type": "paragraph", "paragraph": { "rich_text": [ { "plain_text": "a" } ] } }
            ],
            "has_more": true,
            "next_cursor": "next"
        })))
        .with_priority(2)
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();

    let blocks = tokio::task::spawn_blocking(move || {
        let client = NotionClient::new("t".into(), &settings(uri, None))
            .unwrap()
            .disable_throttle();
        client.fetch_blocks("p1")
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(blocks.len(), 2);
    assert!(matches!(blocks[0], Block::Paragraph(_)));
    assert!(matches!(blocks[1], Block::BulletedItem(_)));
}

#[tokio::test]
async fn test_api_error_handling() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();

    let result = tokio::task::spawn_blocking(move || {
        let client = NotionClient::new("bad_token".into(), &settings(uri, None))
            .unwrap()
            .disable_throttle();
        client.list_documents()
    })
    .await
    .unwrap();

    match result {
        Err(notion_sync::Error::Api { status, message, .. }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Unauthorized");
        }
        other => panic!("Expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_asset_download_once_per_identifier() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/f/ABCDEFGH12/img/name.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"PNGDATA".to_vec(), "image/png"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();

    let (first, second, files) = tokio::task::spawn_blocking(move || {
        let temp = tempfile::TempDir::new().unwrap();
        let paths = Paths::under(temp.path());
        paths.ensure_dirs().unwrap();
        let store = AssetStore::new(&paths).unwrap();

        let first = store
            .materialize(&format!("{}/f/ABCDEFGH12/img/name.png?sig=one", uri), "hello")
            .unwrap();
        let second = store
            .materialize(&format!("{}/f/ABCDEFGH12/img/name.png?sig=two", uri), "other")
            .unwrap();
        let files: Vec<String> = std::fs::read_dir(&paths.images_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        (first, second, files)
    })
    .await
    .unwrap();

    assert!(first.downloaded);
    assert_eq!(first.identifier, "ABCDEFGH");
    assert_eq!(first.file_name, "hello-ABCDEFGH.png");
    assert!(!second.downloaded);
    assert_eq!(second.public_path, "/images/hello-ABCDEFGH.png");
    assert_eq!(files, vec!["hello-ABCDEFGH.png".to_string()]);
}

#[tokio::test]
async fn test_asset_download_failure_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();

    let result = tokio::task::spawn_blocking(move || {
        let temp = tempfile::TempDir::new().unwrap();
        let paths = Paths::under(temp.path());
        paths.ensure_dirs().unwrap();
        AssetStore::new(&paths)
            .unwrap()
            .materialize(&format!("{}/expired.png", uri), "hello")
    })
    .await
    .unwrap();

    assert!(matches!(
        result,
        Err(notion_sync::Error::AssetDownload { .. })
    ));
}
