// src/render/dom.rs
//! Selector helpers over a parsed document, shared by the document backend
//! and the extractor.

use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractError;
use crate::ingest::types::NavigationStep;

pub fn selector(s: &str) -> Result<Selector, ExtractError> {
    Selector::parse(s).map_err(|e| ExtractError::Backend(format!("bad selector {s:?}: {e}")))
}

/// Collapse runs of whitespace (incl. NBSP) to one space and trim.
pub fn collapse_ws(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re = RE_WS.get_or_init(|| Regex::new(r"[\s\u{00A0}]+").expect("static regex"));
    re.replace_all(s, " ").trim().to_string()
}

/// Visible text of an element, whitespace-collapsed. Text nodes are
/// separated by a space, so sibling blocks never run together.
pub fn text_of(el: ElementRef<'_>) -> String {
    collapse_ws(&el.text().collect::<Vec<_>>().join(" "))
}

/// Text of an inline run such as a typography span: nodes are joined as-is,
/// so `chito<b>gejo</b>` reads `chitogejo`.
pub fn inline_text_of(el: ElementRef<'_>) -> String {
    collapse_ws(&el.text().collect::<String>())
}

/// Index of the candidate matching `label`: exact (trimmed) match first,
/// then case-insensitive substring.
pub fn pick_label(candidates: &[String], label: &str) -> Option<usize> {
    let want = collapse_ws(label);
    if let Some(i) = candidates.iter().position(|c| *c == want) {
        return Some(i);
    }
    let want = want.to_lowercase();
    candidates
        .iter()
        .position(|c| c.to_lowercase().contains(&want))
}

/// Result of looking up a navigation step's control in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Some required element is not on the page (yet).
    Missing(String),
    /// Candidates exist but none matches the label.
    NoLabel(Vec<String>),
    /// Found; carries the link target when the control is (inside) a link.
    Found { href: Option<String> },
}

pub fn locate(doc: &Html, step: &NavigationStep) -> Result<Lookup, ExtractError> {
    if let Some(opener) = step.opener.as_deref() {
        if doc.select(&selector(opener)?).next().is_none() {
            return Ok(Lookup::Missing(format!("opener `{opener}`")));
        }
    }

    let target = selector(&step.target)?;
    let candidates: Vec<ElementRef<'_>> = match step.scope.as_deref() {
        Some(scope) => {
            let wanted = step.scope_text.as_deref().map(|t| collapse_ws(t).to_lowercase());
            let scopes: Vec<ElementRef<'_>> = doc
                .select(&selector(scope)?)
                .filter(|el| match &wanted {
                    Some(w) => text_of(*el).to_lowercase().contains(w),
                    None => true,
                })
                .collect();
            if scopes.is_empty() {
                let what = match step.scope_text.as_deref() {
                    Some(t) => format!("scope `{scope}` containing {t:?}"),
                    None => format!("scope `{scope}`"),
                };
                return Ok(Lookup::Missing(what));
            }
            scopes.iter().flat_map(|s| s.select(&target)).collect()
        }
        None => doc.select(&target).collect(),
    };

    if candidates.is_empty() {
        return Ok(Lookup::Missing(format!("target `{}`", step.target)));
    }

    let texts: Vec<String> = candidates.iter().map(|el| text_of(*el)).collect();
    let Some(i) = pick_label(&texts, &step.label) else {
        return Ok(Lookup::NoLabel(texts));
    };

    Ok(Lookup::Found {
        href: link_of(candidates[i]),
    })
}

/// `href` of the element or of its nearest `<a>` ancestor.
fn link_of(el: ElementRef<'_>) -> Option<String> {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .find(|e| e.value().name() == "a")
        .and_then(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|h| !h.is_empty() && !h.starts_with('#') && !h.starts_with("javascript:"))
        .map(str::to_string)
}
