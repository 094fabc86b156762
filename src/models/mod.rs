use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Contexts ──────────────────────────────────────────────────────────────────

/// Seed context handed to the competition stage. `parent` is whatever item
/// the crawl was started from and is never inspected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RootContext {
    pub parent: Value,
}

/// Context for a season fixture-list page. The page itself is not an
/// addressable entity, so it carries no `href` of its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixtureContext {
    pub parent: Value,
}

/// Context for a single match page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchContext {
    pub parent: Value,
    pub href: String,
}

/// Ancestry of the page being visited. The variant decides which stage
/// handles the page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Context {
    Competition(RootContext),
    Fixtures(FixtureContext),
    Game(MatchContext),
}

impl Context {
    pub fn parent(&self) -> &Value {
        match self {
            Context::Competition(c) => &c.parent,
            Context::Fixtures(c) => &c.parent,
            Context::Game(c) => &c.parent,
        }
    }

    /// Walks the nested `parent` chain outward, nearest ancestor first.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors {
            next: Some(self.parent()),
        }
    }

    pub fn stage_name(&self) -> &'static str {
        match self {
            Context::Competition(_) => "competition",
            Context::Fixtures(_) => "fixtures",
            Context::Game(_) => "game",
        }
    }
}

pub struct Ancestors<'a> {
    next: Option<&'a Value>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.get("parent");
        Some(current)
    }
}

// ── Fan-out ───────────────────────────────────────────────────────────────────

/// "Visit this URL, then hand the page to the stage named by `context`."
/// `url` is the link exactly as found on the page and may be relative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub url: String,
    pub context: Context,
}

// ── Game record ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Game,
    Club,
}

/// Unresolved reference to a club page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClubRef {
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub href: Option<String>,
}

impl ClubRef {
    pub fn new(href: Option<String>) -> Self {
        Self {
            kind: EntityType::Club,
            href,
        }
    }
}

/// Terminal record for one match page. The inbound context is flattened in,
/// so `parent` and `href` sit at the top level next to the extracted fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameRecord {
    #[serde(flatten)]
    pub context: MatchContext,
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub game_id: u64,
    pub home_club: ClubRef,
    pub home_club_position: Option<String>,
    pub away_club: ClubRef,
    pub away_club_position: Option<String>,
    pub result: Option<String>,
    pub matchday: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub stadium: Option<String>,
    pub attendance: Option<String>,
}

impl GameRecord {
    pub fn href(&self) -> &str {
        &self.context.href
    }
}
