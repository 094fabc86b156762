use super::ExtractError;

// ── Text normalisation ────────────────────────────────────────────────────────

/// Trim surrounding whitespace. Absent stays absent; a blank string becomes
/// `Some("")` so "missing" and "empty" remain distinguishable.
pub fn safe_strip(s: Option<&str>) -> Option<String> {
    s.map(|s| s.trim().to_string())
}

/// Last `n` characters of `s`, or all of it when shorter.
/// "Sat, 9/12/20 | 3:00 PM" with n=7 → "3:00 PM"
pub fn trailing_chars(s: &str, n: usize) -> &str {
    let len = s.chars().count();
    if len <= n {
        return s;
    }
    match s.char_indices().nth(len - n) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

// ── Identifiers ───────────────────────────────────────────────────────────────

/// Numeric id from the trailing path segment of a match href.
/// "/caykur-rizespor_fenerbahce-sk/index/spielbericht/3426662" → 3426662
pub fn parse_game_id(href: &str) -> Result<u64, ExtractError> {
    let segment = href.rsplit('/').next().unwrap_or_default();

    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ExtractError::InvalidGameId {
            href: href.to_string(),
        });
    }

    segment.parse().map_err(|_| ExtractError::InvalidGameId {
        href: href.to_string(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
