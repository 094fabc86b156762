use scraper::{Html, Selector};
use tracing::warn;

use super::cleaner::safe_strip;
use super::info_line::{child_element, line_nodes, own_text, parse_line, LayoutDrift, DATE_LINE, VENUE_LINE};
use super::ExtractError;

pub const FIXTURES_LINK_LABEL: &str = "All fixtures & results";

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector(format!("{css}: {e:?}")))
}

// ── Competition page ──────────────────────────────────────────────────────────

/// What the competition footer offers for the season fixture list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixturesLink {
    Found(String),
    /// The labelled link is there but carries no href.
    NoHref,
    Absent,
}

impl FixturesLink {
    pub fn into_href(self) -> Option<String> {
        match self {
            FixturesLink::Found(href) => Some(href),
            FixturesLink::NoHref | FixturesLink::Absent => None,
        }
    }
}

/// Target of the footer link labelled exactly "All fixtures & results".
pub fn parse_fixtures_link(doc: &Html) -> Result<FixturesLink, ExtractError> {
    let footer_sel = selector("div.footer-links")?;

    for footer in doc.select(&footer_sel) {
        let Some(link) = child_element(footer, "a") else { continue };

        // First text node anywhere under the link, compared verbatim.
        let label = link.text().next();
        if label != Some(FIXTURES_LINK_LABEL) {
            continue;
        }

        return Ok(match link.value().attr("href") {
            Some(href) => FixturesLink::Found(href.to_string()),
            None => FixturesLink::NoHref,
        });
    }

    Ok(FixturesLink::Absent)
}

// ── Fixture list page ─────────────────────────────────────────────────────────

/// Every result link target, in document order, duplicates included.
pub fn parse_result_links(doc: &Html) -> Result<Vec<String>, ExtractError> {
    let link_sel = selector("a.ergebnis-link")?;

    let mut hrefs = Vec::new();
    for link in doc.select(&link_sel) {
        match link.value().attr("href") {
            Some(href) => hrefs.push(href.to_string()),
            None => warn!("result link without href skipped"),
        }
    }

    Ok(hrefs)
}

// ── Match page ────────────────────────────────────────────────────────────────

/// Raw fields of a match page. Every field is optional; `drift` lists the
/// places where the page did not have the expected shape.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MatchDetails {
    pub home_club_href: Option<String>,
    pub home_club_position: Option<String>,
    pub away_club_href: Option<String>,
    pub away_club_position: Option<String>,
    pub matchday: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub stadium: Option<String>,
    pub attendance: Option<String>,
    pub result: Option<String>,
    pub drift: Vec<LayoutDrift>,
}

#[derive(Debug, Default)]
struct ClubPanel {
    href: Option<String>,
    position: Option<String>,
}

pub fn parse_match_page(doc: &Html) -> Result<MatchDetails, ExtractError> {
    let home = parse_club_panel(doc, "div.box-content div.sb-heim")?;
    let away = parse_club_panel(doc, "div.box-content div.sb-gast")?;

    let mut details = MatchDetails {
        home_club_href: home.href,
        home_club_position: home.position,
        away_club_href: away.href,
        away_club_position: away.position,
        ..Default::default()
    };

    let date_sel = selector("div.box-content p.sb-datum")?;
    if let Some(line) = doc.select(&date_sel).next() {
        let parsed = parse_line(&line_nodes(line), DATE_LINE);
        details.matchday = parsed.get("matchday");
        details.date = parsed.get("date");
        details.time = parsed.get("time");
        details.drift.extend(parsed.drift);
    }

    let venue_sel = selector("div.box-content p.sb-zusatzinfos")?;
    if let Some(line) = doc.select(&venue_sel).next() {
        let parsed = parse_line(&line_nodes(line), VENUE_LINE);
        details.stadium = parsed.get("stadium");
        details.attendance = parsed.get("attendance");
        details.drift.extend(parsed.drift);
    }

    let result_sel = selector("div.box-content div.ergebnis-wrap div.sb-endstand")?;
    details.result = doc
        .select(&result_sel)
        .next()
        .and_then(|el| safe_strip(own_text(el)));

    Ok(details)
}

fn parse_club_panel(doc: &Html, css: &str) -> Result<ClubPanel, ExtractError> {
    let panel_sel = selector(css)?;
    let a_sel = selector("a")?;

    let Some(panel) = doc.select(&panel_sel).next() else {
        return Ok(ClubPanel::default());
    };

    let href = panel
        .select(&a_sel)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string);

    let position = child_element(panel, "p").and_then(|p| safe_strip(own_text(p)));

    Ok(ClubPanel { href, position })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const COMPETITION_PAGE: &str = include_str!("../../fixtures/competition.html");
    const FIXTURES_PAGE: &str = include_str!("../../fixtures/fixtures.html");
    const MATCH_PAGE: &str = include_str!("../../fixtures/match.html");

    #[test]
    fn test_fixtures_link_found() {
        let doc = Html::parse_document(COMPETITION_PAGE);
        assert_eq!(
            parse_fixtures_link(&doc).unwrap(),
            FixturesLink::Found("/premier-league/gesamtspielplan/wettbewerb/GB1/saison_id/2020".into())
        );
    }

    #[test]
    fn test_fixtures_link_label_is_exact() {
        let doc = Html::parse_document(
            r#"<div class="footer-links"><a href="/a">all fixtures & results</a></div>
               <div class="footer-links"><a href="/b"> All fixtures & results</a></div>
               <div class="footer-links"><a href="/c">All fixtures &amp; results (2020)</a></div>"#,
        );
        assert_eq!(parse_fixtures_link(&doc).unwrap(), FixturesLink::Absent);
    }

    #[test]
    fn test_fixtures_link_without_href() {
        let doc = Html::parse_document(
            r#"<div class="footer-links"><a>All fixtures &amp; results</a></div>"#,
        );
        let link = parse_fixtures_link(&doc).unwrap();
        assert_eq!(link, FixturesLink::NoHref);
        assert_eq!(link.into_href(), None);
    }

    #[test]
    fn test_result_links_in_document_order() {
        let doc = Html::parse_document(FIXTURES_PAGE);
        let links = parse_result_links(&doc).unwrap();
        assert_eq!(
            links,
            vec![
                "/liverpool-fc_leeds-united/index/spielbericht/3426662",
                "/fulham-fc_arsenal-fc/index/spielbericht/3426663",
                "/liverpool-fc_leeds-united/index/spielbericht/3426662",
            ]
        );
    }

    #[test]
    fn test_result_links_empty_page() {
        let doc = Html::parse_document("<html><body><p>No fixtures</p></body></html>");
        assert!(parse_result_links(&doc).unwrap().is_empty());
    }

    #[test]
    fn test_match_page() {
        let doc = Html::parse_document(MATCH_PAGE);
        let details = parse_match_page(&doc).unwrap();

        assert_eq!(
            details.home_club_href.as_deref(),
            Some("/caykur-rizespor/spielplan/verein/126/saison_id/2020")
        );
        assert_eq!(details.home_club_position.as_deref(), Some("Position: 14"));
        assert_eq!(
            details.away_club_href.as_deref(),
            Some("/fenerbahce-sk/spielplan/verein/36/saison_id/2020")
        );
        assert_eq!(details.away_club_position.as_deref(), Some("Position: 2"));
        assert_eq!(details.matchday.as_deref(), Some("5. Matchday"));
        assert_eq!(details.date.as_deref(), Some("Sat, 10/24/20"));
        assert_eq!(details.time.as_deref(), Some("5:00 PM"));
        assert_eq!(details.stadium.as_deref(), Some("Caykur Didi Stadyumu"));
        assert_eq!(details.attendance.as_deref(), Some("Attendance: 0"));
        assert_eq!(details.result.as_deref(), Some("2:1"));
        assert!(details.drift.is_empty(), "{:?}", details.drift);
    }

    #[test]
    fn test_unplayed_match_page() {
        let doc = Html::parse_document(
            r#"<div class="box-content">
                 <div class="sb-heim"><p>Position: 1</p></div>
                 <div class="sb-gast"><a href="/club/2">Away</a></div>
                 <div class="ergebnis-wrap"><div class="sb-endstand"></div></div>
               </div>"#,
        );
        let details = parse_match_page(&doc).unwrap();
        assert_eq!(details.home_club_href, None);
        assert_eq!(details.home_club_position.as_deref(), Some("Position: 1"));
        assert_eq!(details.away_club_href.as_deref(), Some("/club/2"));
        assert_eq!(details.away_club_position, None);
        assert_eq!(details.result, None);
        assert_eq!(details.matchday, None);
        assert_eq!(details.stadium, None);
    }
}
