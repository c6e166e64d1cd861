//! Integration tests for the importer
//!
//! These tests use wiremock to stand in for both the image host and the
//! content store HTTP API.

use moto_harvest::config::{parse_config, Config};
use moto_harvest::importer::{HttpContentStore, Importer};
use moto_harvest::{
    parse_import_request, run_import, CredentialError, HarvestError, ImportEntry, ImportError,
    ImportStatus, ScrapedListing,
};
use reqwest::Client;
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const UPLOAD_PATH: &str = "/v2024-01-01/assets/images/test";
const MUTATE_PATH: &str = "/v2024-01-01/data/mutate/test";
const JPEG_BYTES: &[u8] = b"\xFF\xD8\xFF";

/// Creates a test configuration pointing at the mock content store
fn create_test_config(api_base: &str, token_env: &str) -> Config {
    parse_config(&format!(
        r#"
[source]
origin = "https://dealer.moto.it"
dealer-path = "avanzimoto"

[content-store]
project-id = "test"
dataset = "test"
api-version = "2024-01-01"
token-env = "{token_env}"
api-base = "{api_base}"
"#
    ))
    .expect("test config should be valid")
}

fn importer(server: &MockServer) -> Importer<HttpContentStore> {
    let config = create_test_config(&server.uri(), "UNUSED_TOKEN_ENV");
    let client = Client::new();
    let store = HttpContentStore::new(
        client.clone(),
        &config.content_store,
        Some("secret".to_string()),
    );
    Importer::new(store, client, "motorcycle")
}

fn listing(title: &str, images: Vec<String>) -> ScrapedListing {
    ScrapedListing {
        source_id: String::new(),
        title: title.to_string(),
        price: 4500,
        kilometers: 12000,
        year: 2019,
        thumbnail_url: String::new(),
        images,
        external_url: "https://dealer.moto.it/avanzimoto/Usato/1".to_string(),
        selected: true,
    }
}

async fn mount_created(server: &MockServer, id: &str) {
    Mock::given(method("POST"))
        .and(path(MUTATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transactionId": "tx",
            "results": [{ "id": id, "operation": "create" }]
        })))
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, request_path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == request_path)
        .collect()
}

#[tokio::test]
async fn test_import_uploads_images_and_creates_document() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/img/front.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(JPEG_BYTES.to_vec())
                .insert_header("content-type", "image/jpeg"),
        )
        .mount(&mock_server)
        .await;
    // /img/missing.jpg is not mounted and answers 404

    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .and(header("authorization", "Bearer secret"))
        .and(query_param("filename", "front.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "document": { "_id": "image-abc-800x600-jpg" }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(MUTATE_PATH))
        .and(header("authorization", "Bearer secret"))
        .and(query_param("returnIds", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "id": "doc-honda" }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let records = vec![listing(
        "HONDA CB 500 F",
        vec![
            format!("{}/img/front.jpg", base),
            format!("{}/img/missing.jpg", base),
        ],
    )];
    let results = importer(&mock_server).import_all(&records).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, ImportStatus::Success);
    assert_eq!(results[0].id.as_deref(), Some("doc-honda"));

    let creates = requests_to(&mock_server, MUTATE_PATH).await;
    let body: Value = serde_json::from_slice(&creates[0].body).unwrap();
    let document = &body["mutations"][0]["create"];
    assert_eq!(document["_type"], "motorcycle");
    assert_eq!(document["slug"]["current"], "honda-cb-500-f");
    assert_eq!(document["brand"], "HONDA");
    assert_eq!(document["isUsed"], true);
    assert_eq!(document["displacement"], 0);
    assert_eq!(
        document["description"],
        "Scraped from Moto.it. Original Link: https://dealer.moto.it/avanzimoto/Usato/1"
    );

    // Only the reachable image is referenced
    let images = document["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["asset"]["_ref"], "image-abc-800x600-jpg");

    let uploads = requests_to(&mock_server, UPLOAD_PATH).await;
    assert_eq!(uploads[0].body, JPEG_BYTES.to_vec());
}

#[tokio::test]
async fn test_permission_denied_aborts_import() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MUTATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "id": "doc-1" }]
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path(MUTATE_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "description": "Insufficient permissions; permission \"create\" required" }
        })))
        .mount(&mock_server)
        .await;

    let records = vec![
        listing("HONDA A", vec![]),
        listing("HONDA B", vec![]),
        listing("HONDA C", vec![]),
    ];
    let err = importer(&mock_server)
        .import_all(&records)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ImportError::Credential(CredentialError::InsufficientPrivilege)
    ));
    assert_eq!(requests_to(&mock_server, MUTATE_PATH).await.len(), 2);
}

#[tokio::test]
async fn test_rejected_document_does_not_stop_import() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MUTATE_PATH))
        .and(body_string_contains("KTM 390 DUKE"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "description": "Document is invalid" }
        })))
        .mount(&mock_server)
        .await;
    mount_created(&mock_server, "doc-ok").await;

    let records = vec![
        listing("HONDA CB 500 F", vec![]),
        listing("KTM 390 DUKE", vec![]),
        listing("YAMAHA MT-07", vec![]),
    ];
    let results = importer(&mock_server).import_all(&records).await.unwrap();

    let statuses: Vec<ImportStatus> = results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![ImportStatus::Success, ImportStatus::Error, ImportStatus::Success]
    );
    assert_eq!(results[1].title, "KTM 390 DUKE");
    assert_eq!(results[1].error.as_deref(), Some("HTTP 400: Document is invalid"));
}

#[tokio::test]
async fn test_missing_token_fails_before_any_request() {
    let mock_server = MockServer::start().await;
    mount_created(&mock_server, "doc-1").await;

    let token_env = "MOTO_HARVEST_IMPORT_TEST_UNSET_TOKEN";
    std::env::remove_var(token_env);
    let config = create_test_config(&mock_server.uri(), token_env);

    let err = run_import(&config, &[ImportEntry::Listing(listing("HONDA A", vec![]))])
        .await
        .unwrap_err();

    match err {
        HarvestError::Import(ImportError::Credential(CredentialError::Missing { env_var })) => {
            assert_eq!(env_var, token_env);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(requests_to(&mock_server, MUTATE_PATH).await.is_empty());
}

#[tokio::test]
async fn test_run_import_reads_token_from_env() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MUTATE_PATH))
        .and(header("authorization", "Bearer from-env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "id": "doc-env" }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let token_env = "MOTO_HARVEST_IMPORT_TEST_SET_TOKEN";
    std::env::set_var(token_env, "from-env");
    let config = create_test_config(&mock_server.uri(), token_env);

    let results = run_import(&config, &[ImportEntry::Listing(listing("HONDA A", vec![]))])
        .await
        .unwrap();
    assert_eq!(results[0].id.as_deref(), Some("doc-env"));
}

#[tokio::test]
async fn test_invalid_entry_fails_alone() {
    let mock_server = MockServer::start().await;
    mount_created(&mock_server, "doc-ok").await;

    let entries = parse_import_request(
        r#"{"bikes":[
            {"title":"HONDA A","price":100},
            {"title":"KTM","price":null},
            {"title":"HONDA C"}
        ]}"#,
    )
    .unwrap();
    let results = importer(&mock_server)
        .import_entries(&entries)
        .await
        .unwrap();

    let statuses: Vec<ImportStatus> = results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![ImportStatus::Success, ImportStatus::Error, ImportStatus::Success]
    );
    assert_eq!(results[1].title, "KTM");

    // Absent year falls back to the current year in the written document
    let creates = requests_to(&mock_server, MUTATE_PATH).await;
    assert_eq!(creates.len(), 2);
    let body: Value = serde_json::from_slice(&creates[1].body).unwrap();
    assert_eq!(
        body["mutations"][0]["create"]["year"],
        moto_harvest::crawler::current_year()
    );
}
