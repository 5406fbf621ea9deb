// tests/extract_fixture.rs
use notice_watch::config::selectors::SelectorConfig;
use notice_watch::ingest::{self, ExtractPlan};
use notice_watch::render::document::{DocumentRenderer, StaticPages};
use notice_watch::render::PageRenderer;
use notice_watch::ExtractError;

const URL: &str = "https://notices.test/thong-bao";
const PAGE: &str = include_str!("fixtures/notice_page.html");

fn plan(server: &str, category: &str) -> ExtractPlan {
    let selectors = SelectorConfig::default();
    ExtractPlan {
        url: URL.into(),
        steps: selectors.navigation_steps(server, category),
        content: selectors.content,
        render_timeout_ms: 1_000,
        step_timeout_ms: 1_000,
    }
}

async fn run(plan: &ExtractPlan) -> Result<Vec<notice_watch::RawNotice>, ExtractError> {
    let renderer = DocumentRenderer::new(StaticPages::new().with_page(URL, PAGE));
    let mut session = renderer.new_session().await?;
    let out = ingest::extract(session.as_mut(), plan).await;
    session.close().await;
    out
}

#[tokio::test]
async fn default_selectors_read_fixture_in_order() {
    let notices = run(&plan("5 sao", "Hệ thống")).await.unwrap();
    assert_eq!(notices.len(), 3);

    assert_eq!(notices[0].content, "He thong 5 sao: chitogejo maintenance");
    assert!(notices[0].tags.contains("hệ thống"));
    assert!(notices[0].tags.contains("5 sao"));

    assert_eq!(notices[1].content, "chitogejo restart tonight");
    assert_eq!(notices[1].tags.len(), 1);

    assert_eq!(notices[2].content, "Patch notes 1.2.3");
    assert!(notices.iter().all(|n| n.occurred_at.is_none()));
}

#[tokio::test]
async fn label_match_falls_back_to_case_insensitive_substring() {
    assert!(run(&plan("5 SAO", "hệ THỐNG")).await.is_ok());
}

#[tokio::test]
async fn unknown_category_names_the_step() {
    let err = run(&plan("5 sao", "Khuyến mãi")).await.unwrap_err();
    match err {
        ExtractError::Navigation { step, reason } => {
            assert_eq!(step, "category");
            assert!(reason.contains("Sự kiện"), "{reason}");
        }
        other => panic!("expected navigation error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_labels_read_the_page_as_loaded() {
    let notices = run(&plan("", "")).await.unwrap();
    assert_eq!(notices.len(), 3);
}
