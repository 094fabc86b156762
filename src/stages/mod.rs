//! Stage handlers for the competition → fixture list → match crawl.
//!
//! Each stage is a pure function of (parsed page, inbound context). Stages 1
//! and 2 only fan out; stage 3 only emits a record. None of them fetch,
//! sleep or keep state, so the caller is free to run them in any order.

pub mod contracts;

use scraper::Html;
use tracing::{debug, warn};

use crate::models::{
    ClubRef, Context, EntityType, FixtureContext, GameRecord, MatchContext, Request, RootContext,
};
use crate::scraper::cleaner::parse_game_id;
use crate::scraper::parsers::{
    parse_fixtures_link, parse_match_page, parse_result_links, FixturesLink, FIXTURES_LINK_LABEL,
};
use crate::scraper::ExtractError;

/// What a stage produced for one page.
#[derive(Debug, Default, PartialEq)]
pub struct Outcome {
    pub requests: Vec<Request>,
    pub records: Vec<GameRecord>,
}

impl Outcome {
    fn requests(requests: Vec<Request>) -> Self {
        Self {
            requests,
            records: Vec::new(),
        }
    }

    fn record(record: GameRecord) -> Self {
        Self {
            requests: Vec::new(),
            records: vec![record],
        }
    }
}

/// Route a fetched page to the stage its context belongs to.
pub fn handle(page: &Html, url: &str, context: Context) -> Result<Outcome, ExtractError> {
    match context {
        Context::Competition(ctx) => {
            let link = parse_fixtures_link(page)?;
            match &link {
                FixturesLink::Found(_) => {}
                FixturesLink::NoHref => {
                    warn!("{}: '{}' link has no href, branch ends here", url, FIXTURES_LINK_LABEL)
                }
                FixturesLink::Absent => {
                    warn!("{}: no '{}' link, branch ends here", url, FIXTURES_LINK_LABEL)
                }
            }
            Ok(Outcome::requests(fixtures_request(link, ctx).into_iter().collect()))
        }
        Context::Fixtures(ctx) => {
            let requests = extract_game_urls(page, &ctx)?;
            debug!("{}: {} match links", url, requests.len());
            Ok(Outcome::requests(requests))
        }
        Context::Game(ctx) => parse_game(page, ctx).map(Outcome::record),
    }
}

// ── Stage 1 ───────────────────────────────────────────────────────────────────

/// Competition page → at most one request for the season fixture list.
pub fn parse_competition(page: &Html, ctx: RootContext) -> Result<Option<Request>, ExtractError> {
    Ok(fixtures_request(parse_fixtures_link(page)?, ctx))
}

fn fixtures_request(link: FixturesLink, ctx: RootContext) -> Option<Request> {
    link.into_href().map(|href| Request {
        url: href,
        context: Context::Fixtures(FixtureContext { parent: ctx.parent }),
    })
}

// ── Stage 2 ───────────────────────────────────────────────────────────────────

/// Fixture list page → one request per result link, document order,
/// duplicates kept.
pub fn extract_game_urls(page: &Html, ctx: &FixtureContext) -> Result<Vec<Request>, ExtractError> {
    let hrefs = parse_result_links(page)?;

    Ok(hrefs
        .into_iter()
        .map(|href| Request {
            url: href.clone(),
            context: Context::Game(MatchContext {
                parent: ctx.parent.clone(),
                href,
            }),
        })
        .collect())
}

// ── Stage 3 ───────────────────────────────────────────────────────────────────

/// Match page → exactly one record, or an error when `game_id` cannot be
/// derived from the href.
pub fn parse_game(page: &Html, ctx: MatchContext) -> Result<GameRecord, ExtractError> {
    let game_id = parse_game_id(&ctx.href)?;
    let details = parse_match_page(page)?;

    for drift in &details.drift {
        warn!("{}: layout drift: {}", ctx.href, drift);
    }

    Ok(GameRecord {
        context: ctx,
        kind: EntityType::Game,
        game_id,
        home_club: ClubRef::new(details.home_club_href),
        home_club_position: details.home_club_position,
        away_club: ClubRef::new(details.away_club_href),
        away_club_position: details.away_club_position,
        result: details.result,
        matchday: details.matchday,
        date: details.date,
        time: details.time,
        stadium: details.stadium,
        attendance: details.attendance,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
