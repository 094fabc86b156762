//! Live-site contracts: a sample page per stage and what the stage must
//! produce for it. `tfmkt-games check` runs them to catch markup changes.

use std::ops::RangeInclusive;

use serde_json::json;
use thiserror::Error;

use super::Outcome;
use crate::models::{Context, FixtureContext, MatchContext, RootContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Returns {
    Requests,
    Records,
}

pub struct Contract {
    pub stage: &'static str,
    pub url: &'static str,
    pub returns: Returns,
    pub count: RangeInclusive<usize>,
    /// Keys every emitted record must carry.
    pub scrapes: &'static [&'static str],
    context: fn() -> Context,
}

impl Contract {
    pub fn context(&self) -> Context {
        (self.context)()
    }

    pub fn verify(&self, outcome: &Outcome) -> Result<(), ContractViolation> {
        let (produced, other) = match self.returns {
            Returns::Requests => (outcome.requests.len(), outcome.records.len()),
            Returns::Records => (outcome.records.len(), outcome.requests.len()),
        };

        if other != 0 {
            return Err(ContractViolation::MixedOutput { stage: self.stage });
        }
        if !self.count.contains(&produced) {
            return Err(ContractViolation::Count {
                stage: self.stage,
                expected: self.count.clone(),
                got: produced,
            });
        }

        for record in &outcome.records {
            let value = serde_json::to_value(record).map_err(|e| self.unserializable(e))?;
            for key in self.scrapes {
                if value.get(key).is_none() {
                    return Err(ContractViolation::MissingField {
                        stage: self.stage,
                        field: *key,
                    });
                }
            }
        }

        Ok(())
    }

    fn unserializable(&self, e: serde_json::Error) -> ContractViolation {
        ContractViolation::Unserializable {
            stage: self.stage,
            reason: e.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ContractViolation {
    #[error("{stage}: expected {expected:?} outputs, got {got}")]
    Count {
        stage: &'static str,
        expected: RangeInclusive<usize>,
        got: usize,
    },
    #[error("{stage}: record lacks field {field:?}")]
    MissingField {
        stage: &'static str,
        field: &'static str,
    },
    #[error("{stage}: produced both requests and records")]
    MixedOutput { stage: &'static str },
    #[error("{stage}: record does not serialize: {reason}")]
    Unserializable { stage: &'static str, reason: String },
}

pub fn all() -> Vec<Contract> {
    vec![
        Contract {
            stage: "competition",
            url: "https://www.transfermarkt.co.uk/premier-league/startseite/wettbewerb/GB1",
            returns: Returns::Requests,
            count: 1..=1,
            scrapes: &[],
            context: || Context::Competition(RootContext { parent: json!("dummy") }),
        },
        Contract {
            stage: "fixtures",
            url: "https://www.transfermarkt.co.uk/premier-league/gesamtspielplan/wettbewerb/GB1/saison_id/2020",
            returns: Returns::Requests,
            count: 330..=390,
            scrapes: &[],
            context: || Context::Fixtures(FixtureContext { parent: json!({}) }),
        },
        Contract {
            stage: "game",
            url: "https://www.transfermarkt.co.uk/caykur-rizespor_fenerbahce-sk/index/spielbericht/3426662",
            returns: Returns::Records,
            count: 1..=1,
            scrapes: &[
                "type", "href", "parent", "game_id", "result", "matchday", "date", "time",
                "stadium", "attendance",
            ],
            context: || {
                Context::Game(MatchContext {
                    parent: json!({}),
                    href: "some_href/3".to_string(),
                })
            },
        },
    ]
}
