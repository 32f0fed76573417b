//! Integration tests for xiv
//!
//! These tests drive the search and download pipeline end to end through a
//! scripted transport, so they never touch the network.

use std::sync::Arc;
use std::time::Duration;

use xiv::models::{Paper, SearchQuery};
use xiv::sources::mock::{MockResponse, MockTransport};
use xiv::sources::RecordingSleeper;
use xiv::ui::Diagnostics;
use xiv::utils::{render_papers, IndexSelection, OutputStyle, RetryConfig};
use xiv::{ArxivSource, Config, Downloader};

const FIXTURE: &str = include_str!("fixtures/arxiv_response.xml");

const CAPTCHA_PAGE: &str =
    "<!DOCTYPE html><html><head><title>Verify</title></head><body>Solve the CAPTCHA</body></html>";

fn pdf_bytes() -> Vec<u8> {
    let mut data = b"%PDF-1.7\n".to_vec();
    data.resize(200_000, b'x');
    data
}

async fn fixture_papers(since: Option<&str>) -> Vec<Paper> {
    let transport = Arc::new(MockTransport::new([MockResponse::text(FIXTURE)]));
    let source = ArxivSource::new(transport, Arc::new(RecordingSleeper::new()), Diagnostics::capture().0);

    let mut query = SearchQuery::new("all");
    if let Some(since) = since {
        query = query.since(since);
    }
    source.search(&query).await.unwrap()
}

#[tokio::test]
async fn test_search_fixture_extracts_records() {
    let papers = fixture_papers(None).await;

    assert_eq!(papers.len(), 2);
    assert_eq!(papers[0].title, "Learning Dexterous Grasping from Human Demonstrations");
    assert_eq!(papers[0].published, "2025-10-16");
    assert_eq!(papers[0].link, "http://arxiv.org/abs/2510.14967v1");
    assert_eq!(
        papers[0].authors,
        "Alice Zhang, Bob Okafor, Carla Mendes et al. (4)"
    );
    assert_eq!(
        papers[0].r#abstract,
        "We present a method for learning dexterous grasping policies from a small number of human demonstrations. The policy transfers to unseen objects."
    );
    assert!(papers[1].authors.contains("et al. (6)"));
}

#[tokio::test]
async fn test_search_fixture_since_filter() {
    assert_eq!(fixture_papers(Some("2025-10-16")).await.len(), 2);
    assert!(fixture_papers(Some("2025-10-17")).await.is_empty());
}

#[tokio::test]
async fn test_search_uses_configured_category_and_authors() {
    let (config, warnings) = Config::from_vars([
        ("XIV_CATEGORY", "cs.AI"),
        ("XIV_MAX_AUTHORS", "1"),
        ("XIV_RETRY_ATTEMPTS", "2"),
    ])
    .unwrap();
    assert!(warnings.is_empty());

    let transport = Arc::new(MockTransport::new([
        MockResponse::Status(503),
        MockResponse::text(FIXTURE),
    ]));
    let sleeper = Arc::new(RecordingSleeper::new());
    let (diag, captured) = Diagnostics::capture();
    let source = ArxivSource::new(transport.clone(), sleeper.clone(), diag)
        .retry(config.retry_config())
        .default_category(&config.category)
        .max_authors(config.max_authors);

    let papers = source.search(&SearchQuery::new("grasping")).await.unwrap();

    assert_eq!(papers[0].authors, "Alice Zhang et al. (4)");
    assert_eq!(sleeper.waits(), vec![Duration::from_secs(1)]);
    assert!(captured
        .contents()
        .contains("ArXiv unavailable (attempt 1/2), retrying in 1s... (Ctrl+C to cancel)"));

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].contains("cat%3Acs.AI"));
}

#[tokio::test]
async fn test_search_gives_up_after_budget() {
    let transport = Arc::new(MockTransport::new([
        MockResponse::Status(502),
        MockResponse::Status(502),
        MockResponse::Status(502),
    ]));
    let sleeper = Arc::new(RecordingSleeper::new());
    let (diag, captured) = Diagnostics::capture();
    let source = ArxivSource::new(transport.clone(), sleeper.clone(), diag);

    let papers = source.search(&SearchQuery::new("all")).await.unwrap();

    assert!(papers.is_empty());
    assert_eq!(transport.requests().len(), 3);
    assert_eq!(
        sleeper.waits(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
    assert!(captured.contents().contains("Error: HTTP 502"));
}

#[tokio::test]
async fn test_search_then_json_round_trip() {
    let papers = fixture_papers(None).await;

    let json = render_papers(&papers, OutputStyle::Json, false).unwrap();
    let parsed: Vec<Paper> = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed, papers);
}

#[tokio::test]
async fn test_batch_with_blocked_first_item() {
    let papers = fixture_papers(None).await;
    let dir = tempfile::tempdir().unwrap();

    let transport = Arc::new(MockTransport::new([
        MockResponse::text(CAPTCHA_PAGE),
        MockResponse::Body(pdf_bytes()),
    ]));
    let sleeper = Arc::new(RecordingSleeper::new());
    let (diag, captured) = Diagnostics::capture();
    let downloader = Downloader::new(transport.clone(), sleeper.clone(), diag)
        .retry(RetryConfig::default())
        .delay(Duration::from_secs(3));

    let report = downloader.download_all(&papers, dir.path(), None).await;

    assert_eq!(report.total, 2);
    assert_eq!(report.saved, 1);
    assert_eq!(report.blocked, 1);
    assert_eq!(report.failed, 0);
    assert!(!report.cancelled);

    assert!(!dir.path().join("2510.14967v1.pdf").exists());
    assert!(dir.path().join("2510.14802v1.pdf").exists());
    assert_eq!(
        transport.requests(),
        vec![
            "https://arxiv.org/pdf/2510.14967v1.pdf".to_string(),
            "https://arxiv.org/pdf/2510.14802v1.pdf".to_string(),
        ]
    );
    assert_eq!(sleeper.waits(), vec![Duration::from_secs(3)]);

    let out = captured.contents();
    assert!(out.contains("1/2 saved"));
    assert!(out.contains("1 CAPTCHA blocked"));
    assert!(out.contains("Rate limit triggered. Try:"));
}

#[tokio::test]
async fn test_batch_selection_downloads_only_chosen_items() {
    let papers = fixture_papers(None).await;
    let dir = tempfile::tempdir().unwrap();
    let selection = IndexSelection::parse("2", papers.len()).unwrap();

    let transport = Arc::new(MockTransport::new([MockResponse::Body(pdf_bytes())]));
    let (diag, captured) = Diagnostics::capture();
    let downloader = Downloader::new(transport.clone(), Arc::new(RecordingSleeper::new()), diag);

    let report = downloader
        .download_all(&papers, dir.path(), Some(&selection))
        .await;

    assert_eq!(report.saved, 1);
    assert_eq!(transport.requests().len(), 1);
    assert!(dir.path().join("2510.14802v1.pdf").exists());
    assert!(captured.contents().contains("[1/1]   2510.14802v1... OK"));
}

#[tokio::test]
async fn test_batch_cancelled_during_delay() {
    let papers = fixture_papers(None).await;
    let dir = tempfile::tempdir().unwrap();

    let transport = Arc::new(MockTransport::new([
        MockResponse::Body(pdf_bytes()),
        MockResponse::Body(pdf_bytes()),
    ]));
    let (diag, captured) = Diagnostics::capture();
    let downloader = Downloader::new(
        transport.clone(),
        Arc::new(RecordingSleeper::cancelling_at(0)),
        diag,
    );

    let report = downloader.download_all(&papers, dir.path(), None).await;

    assert!(report.cancelled);
    assert_eq!(report.saved, 1);
    assert_eq!(transport.requests().len(), 1);
    assert!(captured
        .contents()
        .contains("Download cancelled by user.\n1/2 saved before cancellation"));
}

#[tokio::test]
async fn test_retry_cancel_fails_item_but_batch_continues() {
    let papers = fixture_papers(None).await;
    let dir = tempfile::tempdir().unwrap();

    let transport = Arc::new(MockTransport::new([
        MockResponse::Timeout,
        MockResponse::Body(pdf_bytes()),
    ]));
    let sleeper = Arc::new(RecordingSleeper::cancelling_at(0));
    let (diag, captured) = Diagnostics::capture();
    let downloader = Downloader::new(transport.clone(), sleeper.clone(), diag);

    let report = downloader.download_all(&papers, dir.path(), None).await;

    assert!(!report.cancelled);
    assert_eq!(report.failed, 1);
    assert_eq!(report.saved, 1);
    assert_eq!(sleeper.waits().len(), 2);
    assert!(captured.contents().contains("retry 1s... cancelled\n"));
}
