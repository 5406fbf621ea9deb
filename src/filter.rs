// src/filter.rs
//! Match predicate: required tags AND keyword, both case-insensitive.

use std::collections::BTreeSet;

use crate::ingest::types::RawNotice;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterConfig {
    /// Lowercased, trimmed, never contains empty strings.
    pub required_tags: BTreeSet<String>,
    pub keyword: String,
}

impl FilterConfig {
    pub fn new<I, S>(required_tags: I, keyword: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            required_tags: required_tags
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            keyword: keep_unless_blank(keyword.into()),
        }
    }
}

/// The keyword is a substring, so surrounding spaces are significant.
/// Only an all-whitespace keyword collapses to "match everything".
fn keep_unless_blank(keyword: String) -> String {
    if keyword.trim().is_empty() {
        String::new()
    } else {
        keyword
    }
}

/// True when the notice carries every required tag and contains the keyword.
/// Pure: no I/O, no state.
pub fn matches(notice: &RawNotice, config: &FilterConfig) -> bool {
    has_required_tags(notice, config) && contains_keyword(notice, config)
}

fn has_required_tags(notice: &RawNotice, config: &FilterConfig) -> bool {
    config.required_tags.iter().all(|req| {
        let req = req.to_lowercase();
        notice.tags.iter().any(|t| t.to_lowercase() == req)
    })
}

fn contains_keyword(notice: &RawNotice, config: &FilterConfig) -> bool {
    if config.keyword.is_empty() {
        return true;
    }
    notice
        .content
        .to_lowercase()
        .contains(&config.keyword.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_notice() -> RawNotice {
        RawNotice::new("He thong 5 sao: chitogejo maintenance").with_tags(["hệ thống", "5 sao"])
    }

    #[test]
    fn tags_and_keyword_both_required() {
        let cfg = FilterConfig::new(["hệ thống", "5 sao"], "chitogejo");
        assert!(matches(&scenario_notice(), &cfg));

        let wrong_kw = FilterConfig::new(["hệ thống", "5 sao"], "kame01td");
        assert!(!matches(&scenario_notice(), &wrong_kw));
    }

    #[test]
    fn missing_tag_fails_regardless_of_keyword() {
        let n = RawNotice::new("chitogejo maintenance").with_tags(["hệ thống"]);
        let cfg = FilterConfig::new(["hệ thống", "5 sao"], "chitogejo");
        assert!(!matches(&n, &cfg));
    }

    #[test]
    fn empty_notice_tags_fail_non_empty_requirement() {
        let n = RawNotice::new("anything");
        assert!(!matches(&n, &FilterConfig::new(["x"], "")));
    }

    #[test]
    fn empty_requirements_match_everything() {
        let n = RawNotice::new("whatever");
        assert!(matches(&n, &FilterConfig::default()));
        assert!(matches(&n, &FilterConfig::new(Vec::<String>::new(), "  ")));
    }

    #[test]
    fn case_insensitive_on_both_sides() {
        let n = RawNotice::new("Server CHITOGEJO down").with_tags(["HỆ THỐNG"]);
        let cfg = FilterConfig::new(["Hệ Thống"], "chiTogejo");
        assert!(matches(&n, &cfg));
    }

    #[test]
    fn keyword_spaces_are_part_of_the_match() {
        let cfg = FilterConfig::new(Vec::<String>::new(), " 5 sao");
        assert_eq!(cfg.keyword, " 5 sao");
        assert!(matches(&RawNotice::new("He thong 5 sao"), &cfg));
        assert!(!matches(&RawNotice::new("server15 sao"), &cfg));
    }

    #[test]
    fn deterministic() {
        let n = scenario_notice();
        let cfg = FilterConfig::new(["5 sao"], "maintenance");
        assert_eq!(matches(&n, &cfg), matches(&n, &cfg));
    }
}
