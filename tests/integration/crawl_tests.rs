//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a dealer catalog and run the full
//! crawl cycle end-to-end over HTTP.

use moto_harvest::config::{parse_config, Config};
use moto_harvest::crawler::run_crawl;
use moto_harvest::StopReason;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DEALER: &str = "avanzimoto";

/// Creates a test configuration pointing at the mock catalog
fn create_test_config(origin: &str, max_pages: u32, page_retries: u32) -> Config {
    parse_config(&format!(
        r#"
[source]
origin = "{origin}"
dealer-path = "{DEALER}"
max-pages = {max_pages}
page-retries = {page_retries}
retry-delay-ms = 10

[http]
user-agent = "TestBot/1.0"
timeout-secs = 5

[content-store]
project-id = "test"
dataset = "test"
"#
    ))
    .expect("test config should be valid")
}

fn card(title: &str, id: &str, price: &str, km: &str, year: &str) -> String {
    format!(
        r##"<div class="dlr-card">
            <a class="dlr-card__link" title="{title} - Annuncio {id}" href="/{DEALER}/Usato/{id}" data-target="#annuncio_{id}">
                <img class="dlr-card__image__imagefile" src="//img.example/{id}.jpg">
            </a>
            <ul>
                <li class="dlr-card__meta__item">{km} Km</li>
                <li class="dlr-card__meta__item">Immatricolata del {year}</li>
            </ul>
            <span class="dlr-card__extrainfo__price">€ {price}</span>
        </div>"##
    )
}

fn page(cards: &[String]) -> String {
    format!("<html><body>{}</body></html>", cards.concat())
}

async fn mount_listing_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/{}", DEALER, page_path)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/Detail/Detail", DEALER)))
        .and(query_param("ID", id))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_with_enrichment() {
    let mock_server = MockServer::start().await;

    mount_listing_page(
        &mock_server,
        "Usato",
        page(&[
            card("Honda CB 500 F (2017 - 19)", "1", "4.500", "12.300", "2019"),
            card("Ktm 390 Duke", "2", "3.900", "8.000", "2020"),
        ]),
    )
    .await;
    mount_listing_page(
        &mock_server,
        "Usato/pagina-2",
        page(&[
            card("Honda CB 500 F", "3", "4.400", "15.000", "2018"),
            card("Yamaha MT-07", "4", "5.900", "3.000", "2021"),
        ]),
    )
    .await;
    mount_listing_page(&mock_server, "Usato/pagina-3", page(&[])).await;

    mount_detail(
        &mock_server,
        "1",
        ResponseTemplate::new(200).set_body_string(
            r#"<script>var annuncio_1 = [{"href":"https://img.example/1-a.jpg"},{"href":"https://img.example/1-b.jpg"}];</script>"#,
        ),
    )
    .await;
    mount_detail(&mock_server, "2", ResponseTemplate::new(500)).await;
    mount_detail(
        &mock_server,
        "4",
        ResponseTemplate::new(200).set_body_string("<html>no gallery</html>"),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), 10, 0);
    let report = run_crawl(&config).await.expect("crawl should run");

    let titles: Vec<&str> = report.listings.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["HONDA CB 500 F", "KTM 390 DUKE", "YAMAHA MT-07"]);
    assert_eq!(report.duplicates_dropped, 1);
    assert_eq!(report.pages_crawled, 2);
    assert_eq!(report.stop_reason, StopReason::EmptyPage { page: 3 });

    let honda = &report.listings[0];
    assert_eq!(honda.source_id, "1");
    assert_eq!(honda.price, 4500);
    assert_eq!(honda.kilometers, 12300);
    assert_eq!(honda.year, 2019);
    assert_eq!(honda.thumbnail_url, "https://img.example/1.jpg");
    assert_eq!(
        honda.images,
        vec!["https://img.example/1-a.jpg", "https://img.example/1-b.jpg"]
    );
    assert_eq!(
        honda.external_url,
        format!("{}/{}/Usato/1", mock_server.uri(), DEALER)
    );

    // Detail failures keep the thumbnail
    assert_eq!(report.listings[1].images, vec!["https://img.example/2.jpg"]);
    assert_eq!(report.listings[2].images, vec!["https://img.example/4.jpg"]);

    assert_eq!(report.enrichment.enriched, 1);
    assert_eq!(report.enrichment.fetch_failed, 1);
    assert_eq!(report.enrichment.no_gallery, 1);

    // The duplicate's detail page was never requested
    let requests = mock_server.received_requests().await.unwrap_or_default();
    assert!(!requests
        .iter()
        .any(|r| r.url.query().unwrap_or("").contains("ID=3")));
}

#[tokio::test]
async fn test_crawl_stops_on_failed_page() {
    let mock_server = MockServer::start().await;

    mount_listing_page(
        &mock_server,
        "Usato",
        page(&[card("Ducati Monster", "10", "7.000", "20.000", "2016")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(format!("/{}/Usato/pagina-2", DEALER)))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/{}/Usato/pagina-3", DEALER)))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(&[card(
            "Bmw R 1250 GS",
            "11",
            "15.000",
            "1.000",
            "2022",
        )])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), 10, 0);
    let report = run_crawl(&config).await.expect("crawl should run");

    assert_eq!(report.listings.len(), 1);
    assert_eq!(report.listings[0].title, "DUCATI MONSTER");
    assert_eq!(
        report.stop_reason,
        StopReason::FetchFailed {
            page: 2,
            reason: "HTTP 503".to_string()
        }
    );
}

#[tokio::test]
async fn test_crawl_retries_transient_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/{}/Usato", DEALER)))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_listing_page(
        &mock_server,
        "Usato",
        page(&[card("Honda Africa Twin", "20", "11.000", "30.000", "2018")]),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), 1, 2);
    let report = run_crawl(&config).await.expect("crawl should run");

    assert_eq!(report.listings.len(), 1);
    assert_eq!(report.stop_reason, StopReason::PageLimit);
}

#[tokio::test]
async fn test_empty_catalog() {
    let mock_server = MockServer::start().await;

    mount_listing_page(&mock_server, "Usato", page(&[])).await;
    Mock::given(method("GET"))
        .and(path(format!("/{}/Usato/pagina-2", DEALER)))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), 10, 0);
    let report = run_crawl(&config).await.expect("crawl should run");

    assert!(report.listings.is_empty());
    assert_eq!(report.pages_crawled, 0);
    assert_eq!(report.stop_reason, StopReason::EmptyPage { page: 1 });
}
