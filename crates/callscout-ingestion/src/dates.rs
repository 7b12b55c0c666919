//! Deadline mining over extracted PDF text.
//!
//! Calls publish their dates near bilingual keywords ("deadline",
//! "προθεσμία", …). We inspect a fixed character window around each
//! keyword hit and parse anything date-shaped inside it, day-month-year
//! order, English or Greek month names.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

/// Characters inspected on each side of a keyword match.
pub const CONTEXT_WINDOW: usize = 300;

/// Candidates kept per document: calls typically publish an initial and
/// one revised deadline; anything beyond that is boilerplate noise.
pub const MAX_CANDIDATES: usize = 2;

lazy_static! {
    static ref KEYWORD_RE: Regex =
        Regex::new(r"(?i)deadline|προθεσμ|submission|closing date|λήξη").unwrap();

    static ref DATE_RE: Regex = Regex::new(
        r"(?xi)
        \d{1,2}[./-]\d{1,2}[./-]20\d{2}
        |
        \d{1,2}\s+
        (?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?
          |jul(?:y)?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?
          |nov(?:ember)?|dec(?:ember)?
          |ιαν|φεβ|μαρ|μάρ|απρ|μαι|μάι|μαΐ|ιουν|ιούν|ιουλ|ιούλ
          |αυγ|αύγ|σεπ|οκτ|νοε|νοέ|δεκ)
        \p{L}*\s+20\d{2}",
    )
    .unwrap();
}

/// Mine a document's text for deadline candidates: the chronologically
/// earliest [`MAX_CANDIDATES`] distinct dates found near a keyword.
pub fn mine_deadlines(text: &str) -> Vec<NaiveDate> {
    let mut found = BTreeSet::new();

    for keyword in KEYWORD_RE.find_iter(text) {
        let start = back_chars(text, keyword.start(), CONTEXT_WINDOW);
        let end = forward_chars(text, keyword.end(), CONTEXT_WINDOW);
        for candidate in DATE_RE.find_iter(&text[start..end]) {
            if let Some(date) = parse_date_token(candidate.as_str()) {
                found.insert(date);
            }
        }
    }

    found.into_iter().take(MAX_CANDIDATES).collect()
}

/// Parse one matched token, numeric (`3/4/2025`) or spelled out
/// (`15 March 2025`, `15 Μαρτίου 2025`), preferring day-month-year.
fn parse_date_token(token: &str) -> Option<NaiveDate> {
    let token = token.trim();

    if token.contains(['.', '/', '-']) {
        let parts: Vec<&str> = token.split(['.', '/', '-']).collect();
        if parts.len() != 3 {
            return None;
        }
        let day: u32 = parts[0].trim().parse().ok()?;
        let month: u32 = parts[1].trim().parse().ok()?;
        let year: i32 = parts[2].trim().parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let mut parts = token.split_whitespace();
    let day: u32 = parts.next()?.parse().ok()?;
    let month = month_from_name(parts.next()?)?;
    let year: i32 = parts.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Map an English or Greek month name (any grammatical form) to its
/// number by prefix.
fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    const MONTHS: [(&[&str], u32); 12] = [
        (&["jan", "ιαν"], 1),
        (&["feb", "φεβ"], 2),
        (&["mar", "μαρ", "μάρ"], 3),
        (&["apr", "απρ"], 4),
        (&["may", "μαι", "μάι", "μαΐ"], 5),
        (&["jun", "ιουν", "ιούν"], 6),
        (&["jul", "ιουλ", "ιούλ"], 7),
        (&["aug", "αυγ", "αύγ"], 8),
        (&["sep", "σεπ"], 9),
        (&["oct", "οκτ"], 10),
        (&["nov", "νοε", "νοέ"], 11),
        (&["dec", "δεκ"], 12),
    ];
    MONTHS
        .iter()
        .find(|(prefixes, _)| prefixes.iter().any(|p| lower.starts_with(p)))
        .map(|(_, m)| *m)
}

/// Walk back `n` characters from byte position `pos`, staying on char
/// boundaries (the window is defined in characters, and Greek text is
/// multi-byte).
fn back_chars(text: &str, pos: usize, n: usize) -> usize {
    let mut i = pos;
    for _ in 0..n {
        match text[..i].chars().next_back() {
            Some(c) => i -= c.len_utf8(),
            None => break,
        }
    }
    i
}

/// Walk forward `n` characters from byte position `pos`.
fn forward_chars(text: &str, pos: usize, n: usize) -> usize {
    let mut i = pos;
    for _ in 0..n {
        match text[i..].chars().next() {
            Some(c) => i += c.len_utf8(),
            None => break,
        }
    }
    i
}
