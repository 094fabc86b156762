//! Positional parser for short, loosely marked-up info lines.
//!
//! Match pages put several fields in a single paragraph with no semantic
//! markup, e.g.
//!
//! ```text
//! <p class="sb-datum">
//!   <a>1. Matchday</a> | <a>Sat, 9/12/20</a> |      3:00 PM
//! </p>
//! ```
//!
//! Fields are addressed by their index in the paragraph's child node list
//! (text, element and comment nodes all count). Each rule also states which
//! kind of node it expects there, so a layout change shows up as a
//! [`LayoutDrift`] instead of a silently wrong value.

use std::collections::BTreeMap;

use chrono::NaiveTime;
use scraper::node::Node;
use scraper::ElementRef;
use thiserror::Error;

use super::cleaner::{safe_strip, trailing_chars};

// ── Nodes ─────────────────────────────────────────────────────────────────────

/// One child node of an info line.
#[derive(Debug, Clone)]
pub enum LineNode<'a> {
    Text(&'a str),
    Element(ElementRef<'a>),
    Other,
}

impl<'a> LineNode<'a> {
    fn kind(&self) -> &'static str {
        match self {
            LineNode::Text(_) => "text",
            LineNode::Element(_) => "element",
            LineNode::Other => "other",
        }
    }
}

/// Child nodes of `line` in document order.
pub fn line_nodes(line: ElementRef<'_>) -> Vec<LineNode<'_>> {
    line.children()
        .map(|child| match child.value() {
            Node::Text(text) => LineNode::Text(&text.text),
            Node::Element(_) => ElementRef::wrap(child)
                .map(LineNode::Element)
                .unwrap_or(LineNode::Other),
            _ => LineNode::Other,
        })
        .collect()
}

// ── Rules ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Text,
    Element,
}

/// Where a field's text comes from once its node is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    /// First direct text child of an element, or the text node itself.
    Own,
    /// First direct text child of the first direct child element with this tag.
    Child(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub position: usize,
    pub expect: Expect,
    pub source: TextSource,
    /// Keep only this many trailing characters after trimming. A window
    /// that starts right after a digit is reported as rejected.
    pub tail: Option<usize>,
    pub validate: Option<fn(&str) -> bool>,
}

impl FieldRule {
    pub const fn new(field: &'static str, position: usize, expect: Expect, source: TextSource) -> Self {
        Self {
            field,
            position,
            expect,
            source,
            tail: None,
            validate: None,
        }
    }

    pub const fn tail(mut self, n: usize) -> Self {
        self.tail = Some(n);
        self
    }

    pub const fn validate(mut self, f: fn(&str) -> bool) -> Self {
        self.validate = Some(f);
        self
    }
}

/// `p.sb-datum`: matchday link, separator, date link, then "| <time>".
pub const DATE_LINE: &[FieldRule] = &[
    FieldRule::new("matchday", 1, Expect::Element, TextSource::Own),
    FieldRule::new("date", 3, Expect::Element, TextSource::Own),
    FieldRule::new("time", 4, Expect::Text, TextSource::Own)
        .tail(7)
        .validate(looks_like_time),
];

/// `p.sb-zusatzinfos`: a wrapper at index 1 holding the stadium link and the
/// attendance in `<strong>`.
pub const VENUE_LINE: &[FieldRule] = &[
    FieldRule::new("stadium", 1, Expect::Element, TextSource::Child("a")),
    FieldRule::new("attendance", 1, Expect::Element, TextSource::Child("strong")),
];

pub fn looks_like_time(s: &str) -> bool {
    NaiveTime::parse_from_str(s, "%I:%M %p").is_ok()
}

// ── Drift ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutDrift {
    #[error("{field}: no node at position {position} (line has {len})")]
    Missing {
        field: &'static str,
        position: usize,
        len: usize,
    },
    #[error("{field}: expected {expected:?} at position {position}, found {found}")]
    UnexpectedNode {
        field: &'static str,
        position: usize,
        expected: Expect,
        found: &'static str,
    },
    #[error("{field}: value {value:?} failed validation")]
    Rejected { field: &'static str, value: String },
}

// ── Parser ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ParsedLine {
    values: BTreeMap<&'static str, Option<String>>,
    pub drift: Vec<LayoutDrift>,
}

impl ParsedLine {
    pub fn get(&self, field: &str) -> Option<String> {
        self.values.get(field).cloned().flatten()
    }
}

pub fn parse_line(nodes: &[LineNode<'_>], rules: &[FieldRule]) -> ParsedLine {
    let mut parsed = ParsedLine::default();

    for rule in rules {
        let text = match extract(nodes, rule) {
            Ok(text) => text,
            Err(drift) => {
                parsed.drift.push(drift);
                None
            }
        };

        let (value, cut_mid_token) = match (text, rule.tail) {
            (Some(text), Some(n)) => {
                let window = trailing_chars(&text, n);
                let before = text[..text.len() - window.len()].chars().next_back();
                let split = before.is_some_and(|c| c.is_ascii_digit());
                (Some(window.trim().to_string()), split)
            }
            (text, _) => (text, false),
        };

        if let Some(v) = &value {
            let valid = rule.validate.is_none_or(|validate| validate(v));
            if cut_mid_token || !valid {
                parsed.drift.push(LayoutDrift::Rejected {
                    field: rule.field,
                    value: v.clone(),
                });
            }
        }

        parsed.values.insert(rule.field, value);
    }

    parsed
}

/// Stripped text of the rule's node, before any tail cut.
fn extract(nodes: &[LineNode<'_>], rule: &FieldRule) -> Result<Option<String>, LayoutDrift> {
    let node = nodes.get(rule.position).ok_or(LayoutDrift::Missing {
        field: rule.field,
        position: rule.position,
        len: nodes.len(),
    })?;

    let kind_ok = matches!(
        (rule.expect, node),
        (Expect::Text, LineNode::Text(_)) | (Expect::Element, LineNode::Element(_))
    );
    if !kind_ok {
        return Err(LayoutDrift::UnexpectedNode {
            field: rule.field,
            position: rule.position,
            expected: rule.expect,
            found: node.kind(),
        });
    }

    let raw = match (node, rule.source) {
        (LineNode::Text(t), _) => Some(t.to_string()),
        (LineNode::Element(el), TextSource::Own) => own_text(*el).map(str::to_string),
        (LineNode::Element(el), TextSource::Child(tag)) => child_element(*el, tag)
            .and_then(own_text)
            .map(str::to_string),
        (LineNode::Other, _) => None,
    };

    Ok(safe_strip(raw.as_deref()))
}

/// First direct text child of `el`.
pub fn own_text<'a>(el: ElementRef<'a>) -> Option<&'a str> {
    el.children().find_map(|child| match child.value() {
        Node::Text(text) => Some(&*text.text),
        _ => None,
    })
}

/// First direct child element of `el` with the given tag name.
pub fn child_element<'a>(el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == tag)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn parse_first(html: &str, css: &str, rules: &[FieldRule]) -> ParsedLine {
        let doc = Html::parse_fragment(html);
        let sel = Selector::parse(css).unwrap();
        let line = doc.select(&sel).next().expect("line present");
        parse_line(&line_nodes(line), rules)
    }

    #[test]
    fn test_date_line() {
        let parsed = parse_first(
            r#"<p class="sb-datum"> <a href="/md/1">1. Matchday</a> | <a href="/d/2020-09-12">Sat, 9/12/20</a> |          3:00 PM        </p>"#,
            "p.sb-datum",
            DATE_LINE,
        );
        assert_eq!(parsed.get("matchday").as_deref(), Some("1. Matchday"));
        assert_eq!(parsed.get("date").as_deref(), Some("Sat, 9/12/20"));
        assert_eq!(parsed.get("time").as_deref(), Some("3:00 PM"));
        assert!(parsed.drift.is_empty(), "{:?}", parsed.drift);
    }

    #[test]
    fn test_date_line_without_time_reports_drift() {
        let parsed = parse_first(
            r#"<p class="sb-datum"> <a>1. Matchday</a> | <a>Sat, 9/12/20</a></p>"#,
            "p.sb-datum",
            DATE_LINE,
        );
        assert_eq!(parsed.get("date").as_deref(), Some("Sat, 9/12/20"));
        assert_eq!(parsed.get("time"), None);
        assert_eq!(
            parsed.drift,
            vec![LayoutDrift::Missing { field: "time", position: 4, len: 4 }]
        );
    }

    #[test]
    fn test_shifted_layout_is_not_silently_accepted() {
        // Leading whitespace node dropped: every index is off by one.
        let parsed = parse_first(
            r#"<p class="sb-datum"><a>1. Matchday</a> | <a>Sat, 9/12/20</a> | 3:00 PM</p>"#,
            "p.sb-datum",
            DATE_LINE,
        );
        assert_eq!(parsed.get("matchday"), None);
        assert_eq!(parsed.get("date"), None);
        assert!(parsed
            .drift
            .iter()
            .any(|d| matches!(d, LayoutDrift::UnexpectedNode { field: "matchday", .. })));
        assert!(parsed
            .drift
            .iter()
            .any(|d| matches!(d, LayoutDrift::UnexpectedNode { field: "date", .. })));
    }

    #[test]
    fn test_rejected_time_keeps_raw_value() {
        let parsed = parse_first(
            r#"<p class="sb-datum"> <a>1. Matchday</a> | <a>Sat, 9/12/20</a> | unknown</p>"#,
            "p.sb-datum",
            DATE_LINE,
        );
        assert_eq!(parsed.get("time").as_deref(), Some("unknown"));
        assert!(matches!(
            parsed.drift.as_slice(),
            [LayoutDrift::Rejected { field: "time", .. }]
        ));
    }

    fn time_of(raw: &str) -> ParsedLine {
        parse_first(
            &format!(r#"<p class="sb-datum"> <a>5. Matchday</a> | <a>Sat, 10/24/20</a> |   {raw} </p>"#),
            "p.sb-datum",
            DATE_LINE,
        )
    }

    #[test]
    fn test_two_digit_hours_are_flagged() {
        for (raw, cut) in [("10:00 PM", "0:00 PM"), ("11:15 AM", "1:15 AM"), ("12:30 PM", "2:30 PM")] {
            let parsed = time_of(raw);
            assert_eq!(parsed.get("time").as_deref(), Some(cut));
            assert_eq!(
                parsed.drift,
                vec![LayoutDrift::Rejected { field: "time", value: cut.to_string() }],
                "{raw}"
            );
        }
    }

    #[test]
    fn test_one_digit_hour_fits_window() {
        let parsed = time_of("9:45 PM");
        assert_eq!(parsed.get("time").as_deref(), Some("9:45 PM"));
        assert!(parsed.drift.is_empty(), "{:?}", parsed.drift);
    }

    #[test]
    fn test_venue_line() {
        let parsed = parse_first(
            r#"<p class="sb-zusatzinfos"> <span><a href="/s/1">Anfield</a> <strong>Attendance: 52.000</strong></span> </p>"#,
            "p.sb-zusatzinfos",
            VENUE_LINE,
        );
        assert_eq!(parsed.get("stadium").as_deref(), Some("Anfield"));
        assert_eq!(parsed.get("attendance").as_deref(), Some("Attendance: 52.000"));
        assert!(parsed.drift.is_empty());
    }

    #[test]
    fn test_venue_line_missing_attendance() {
        let parsed = parse_first(
            r#"<p class="sb-zusatzinfos"> <span><a href="/s/1"> Anfield </a></span></p>"#,
            "p.sb-zusatzinfos",
            VENUE_LINE,
        );
        assert_eq!(parsed.get("stadium").as_deref(), Some("Anfield"));
        assert_eq!(parsed.get("attendance"), None);
    }

    #[test]
    fn test_looks_like_time() {
        assert!(looks_like_time("3:00 PM"));
        assert!(looks_like_time("11:30 AM"));
        assert!(!looks_like_time("Sat, 9/12/20"));
    }
}
