// src/ingest/mod.rs
pub mod scheduler;
pub mod types;

use metrics::{counter, histogram};
use scraper::{ElementRef, Html};

use crate::config::selectors::ContentSelectors;
use crate::config::AppConfig;
use crate::error::ExtractError;
use crate::render::dom::{self, inline_text_of, text_of};
use crate::render::PageSession;
use types::{NavigationStep, RawNotice};

/// Everything the extractor needs for one pass over the notice page.
#[derive(Debug, Clone)]
pub struct ExtractPlan {
    pub url: String,
    pub steps: Vec<NavigationStep>,
    pub content: ContentSelectors,
    pub render_timeout_ms: u64,
    pub step_timeout_ms: u64,
}

impl ExtractPlan {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.notice_url.clone(),
            steps: cfg
                .selectors
                .navigation_steps(&cfg.server_name, &cfg.category_name),
            content: cfg.selectors.content.clone(),
            render_timeout_ms: cfg.render_timeout_ms,
            step_timeout_ms: cfg.step_timeout_ms,
        }
    }
}

/// Open the page, run the navigation steps, wait for the list and read it.
/// Notices come back in document order; an empty list is not an error.
pub async fn extract(
    session: &mut dyn PageSession,
    plan: &ExtractPlan,
) -> Result<Vec<RawNotice>, ExtractError> {
    let t0 = std::time::Instant::now();

    tracing::info!(url = %plan.url, "opening notice page");
    session.open(&plan.url, plan.render_timeout_ms).await?;

    for step in &plan.steps {
        tracing::info!(step = %step.name, label = %step.label, "selecting");
        session.select(step, plan.step_timeout_ms).await?;
    }

    session
        .wait_for(&plan.content.ready, plan.render_timeout_ms)
        .await?;
    let html = session.html().await?;
    let notices = parse_notices(&html, &plan.content)?;

    histogram!("notice_extract_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("notice_extracted_total").increment(notices.len() as u64);
    tracing::info!(cards = notices.len(), "notice list read");
    Ok(notices)
}

/// Turn rendered HTML into notices using the content selectors.
pub fn parse_notices(html: &str, sel: &ContentSelectors) -> Result<Vec<RawNotice>, ExtractError> {
    let card_sel = dom::selector(&sel.card)?;
    let text_sel = sel.text.as_deref().map(dom::selector).transpose()?;
    let tag_sel = sel.tags.as_deref().map(dom::selector).transpose()?;
    let ts_sel = sel.timestamp.as_deref().map(dom::selector).transpose()?;

    let doc = Html::parse_document(html);
    let mut out = Vec::new();

    for card in doc.select(&card_sel) {
        let content = match &text_sel {
            Some(s) => join_texts(card.select(s), "\n"),
            None => text_of(card),
        };
        if content.is_empty() {
            continue;
        }

        let tags = match &tag_sel {
            Some(s) => card
                .select(s)
                .map(|t| text_of(t).to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            None => Default::default(),
        };

        let occurred_at = ts_sel.as_ref().and_then(|s| {
            card.select(s)
                .map(text_of)
                .find(|t| !t.is_empty())
        });

        out.push(RawNotice {
            content,
            tags,
            occurred_at,
        });
    }

    Ok(out)
}

fn join_texts<'a>(els: impl Iterator<Item = ElementRef<'a>>, sep: &str) -> String {
    els.map(inline_text_of)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::selectors::SelectorConfig;

    const LIST: &str = r#"
      <div class="list">
        <div style="padding: 8px; border-bottom: 1px solid #eee">
          <span class="ant-tag">Hệ thống</span><span class="ant-tag">5 SAO</span>
          <span class="ant-typography"> Bảo trì   máy chủ </span>
          <span class="ant-typography">chitogejo 10:00</span>
          <time>18/10/2026</time>
        </div>
        <div style="border-bottom: 1px solid #eee"><em>no typography here</em></div>
        <div style="border-bottom: 1px solid #eee">
          <span class="ant-typography">Second</span>
        </div>
      </div>"#;

    fn selectors() -> ContentSelectors {
        let mut s = SelectorConfig::default().content;
        s.timestamp = Some("time".into());
        s
    }

    #[test]
    fn parses_cards_in_document_order() {
        let notices = parse_notices(LIST, &selectors()).unwrap();
        assert_eq!(notices.len(), 2);

        let first = &notices[0];
        assert_eq!(first.content, "Bảo trì máy chủ\nchitogejo 10:00");
        assert!(first.tags.contains("hệ thống"));
        assert!(first.tags.contains("5 sao"));
        assert_eq!(first.occurred_at.as_deref(), Some("18/10/2026"));

        assert_eq!(notices[1].content, "Second");
        assert!(notices[1].tags.is_empty());
        assert_eq!(notices[1].occurred_at, None);
    }

    #[test]
    fn whole_card_text_when_no_text_selector() {
        let html = r#"<div class="card"><span class="badge">Hệ thống</span> Server <b>kame01td</b> up</div>"#;
        let sel = ContentSelectors {
            ready: "body".into(),
            card: "div.card".into(),
            text: None,
            tags: Some("span.badge".into()),
            timestamp: None,
        };
        let notices = parse_notices(html, &sel).unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].content, "Hệ thống Server kame01td up");
        assert_eq!(notices[0].tags.iter().next().map(String::as_str), Some("hệ thống"));
    }

    #[test]
    fn inline_markup_does_not_split_words() {
        let html = r#"<div style="border-bottom: 1px solid #eee">
          <span class="ant-tag">5 sao</span>
          <span class="ant-typography">chito<b>gejo</b> bảo <i>trì</i></span>
        </div>"#;
        let notices = parse_notices(html, &selectors()).unwrap();
        assert_eq!(notices[0].content, "chitogejo bảo trì");
    }

    #[test]
    fn empty_list_is_not_an_error() {
        let notices = parse_notices("<div class='ant-card'></div>", &selectors()).unwrap();
        assert!(notices.is_empty());
    }
}
