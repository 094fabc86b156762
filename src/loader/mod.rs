//! Seed loader: turns parent items (JSON lines) into competition requests.

use crate::models::{Context, Request, RootContext};
use anyhow::{Context as _, Result};
use serde_json::{json, Value};
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info, warn};
use url::Url;

/// Read one JSON parent item per line from `path`, or stdin when `path` is "-".
pub fn load_parents(path: &Path) -> Result<Vec<Value>> {
    if path == Path::new("-") {
        let stdin = std::io::stdin();
        return read_parents(stdin.lock());
    }

    let file = std::fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let parents = read_parents(std::io::BufReader::new(file))?;
    info!("{} parent items loaded from {:?}", parents.len(), path);
    Ok(parents)
}

pub fn read_parents(reader: impl BufRead) -> Result<Vec<Value>> {
    let mut parents = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read parents")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(item) if item.get("href").and_then(Value::as_str).is_some() => parents.push(item),
            Ok(_) => warn!("Line {}: parent item has no href, skipped", i + 1),
            Err(e) => warn!("Line {}: {}", i + 1, e),
        }
    }

    Ok(parents)
}

/// Parent item for a crawl started from a bare competition URL.
pub fn parent_from_url(url: &str) -> Value {
    json!({ "type": "competition", "href": url })
}

/// Point a competition href at a specific season.
/// "/premier-league/startseite/wettbewerb/GB1" + 2020
///   → "/premier-league/startseite/wettbewerb/GB1/plus/?saison_id=2020"
pub fn seasonize_href(href: &str, season: u16) -> String {
    format!("{}/plus/?saison_id={}", href.trim_end_matches('/'), season)
}

/// Build the competition-stage request for each parent item. Items whose href
/// cannot be resolved against `base_url` are skipped.
pub fn seed_requests(parents: Vec<Value>, base_url: &str, season: Option<u16>) -> Result<Vec<Request>> {
    let base = Url::parse(base_url).with_context(|| format!("Invalid base_url {:?}", base_url))?;

    let mut requests = Vec::with_capacity(parents.len());
    for parent in parents {
        let Some(href) = parent.get("href").and_then(Value::as_str) else {
            warn!("Parent item without href skipped");
            continue;
        };

        let href = match season {
            Some(season) => seasonize_href(href, season),
            None => href.to_string(),
        };

        let url = match base.join(&href) {
            Ok(url) => url.to_string(),
            Err(e) => {
                warn!("Cannot resolve {:?}: {}", href, e);
                continue;
            }
        };

        debug!("Seed {}", url);
        requests.push(Request {
            url,
            context: Context::Competition(RootContext { parent }),
        });
    }

    Ok(requests)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_parents_skips_bad_lines() {
        let input = concat!(
            r#"{"type":"competition","href":"/premier-league/startseite/wettbewerb/GB1"}"#,
            "\n\n",
            "not json\n",
            r#"{"type":"competition"}"#,
            "\n",
            r#"{"type":"competition","href":"/laliga/startseite/wettbewerb/ES1"}"#,
            "\n",
        );
        let parents = read_parents(input.as_bytes()).unwrap();
        assert_eq!(parents.len(), 2);
        assert_eq!(parents[1]["href"], "/laliga/startseite/wettbewerb/ES1");
    }

    #[test]
    fn test_seasonize_href() {
        assert_eq!(
            seasonize_href("/premier-league/startseite/wettbewerb/GB1/", 2020),
            "/premier-league/startseite/wettbewerb/GB1/plus/?saison_id=2020"
        );
    }

    #[test]
    fn test_seed_requests_resolve_and_keep_parent() {
        let parent = json!({ "type": "competition", "href": "/premier-league/startseite/wettbewerb/GB1" });
        let requests =
            seed_requests(vec![parent.clone()], "https://www.transfermarkt.co.uk", Some(2021)).unwrap();

        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url,
            "https://www.transfermarkt.co.uk/premier-league/startseite/wettbewerb/GB1/plus/?saison_id=2021"
        );
        assert_eq!(requests[0].context, Context::Competition(RootContext { parent }));
    }

    #[test]
    fn test_seed_from_absolute_url() {
        let url = "https://www.transfermarkt.co.uk/premier-league/startseite/wettbewerb/GB1";
        let requests = seed_requests(vec![parent_from_url(url)], "https://example.test", None).unwrap();
        assert_eq!(requests[0].url, url);
    }
}
