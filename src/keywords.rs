use crate::date::normalize_date;
use chrono::NaiveDate;
use serde::Serialize;

// ── Classification ────────────────────────────────────────────────────────────

/// Title and date recovered from a document's keywords.
///
/// A classification with neither field set means the document could not be
/// classified at all; one without a date is routed to the unclassified bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Vendor, merchant or title, with the keyword prefix removed.
    pub title: Option<String>,

    /// Document date, if a date keyword parsed under one of the accepted layouts.
    pub date: Option<NaiveDate>,
}

impl Classification {
    /// Returns `true` when neither a title nor a date was recovered.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.date.is_none()
    }
}

// ── Prefix vocabulary ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Date,
}

/// Checked in this order for each keyword; the first prefix that matches
/// decides the field.
const PREFIXES: [(&str, Field); 5] = [
    ("Title - ", Field::Title),
    ("Merchant - ", Field::Title),
    ("Date - ", Field::Date),
    ("vendor=", Field::Title),
    ("date=", Field::Date),
];

/// Strip `prefix` from `keyword`, ignoring ASCII case.
fn strip_prefix_ignore_case<'a>(keyword: &'a str, prefix: &str) -> Option<&'a str> {
    let head = keyword.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        keyword.get(prefix.len()..)
    } else {
        None
    }
}

fn match_keyword(keyword: &str) -> Option<(Field, &str)> {
    PREFIXES
        .iter()
        .find_map(|(prefix, field)| strip_prefix_ignore_case(keyword, prefix).map(|v| (*field, v)))
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Classify a document from its keywords.
///
/// Keywords are scanned in order and each one that matches a known prefix
/// overwrites the corresponding field, so the last match wins. A date keyword
/// whose value does not parse clears the date.
///
/// ```
/// use paperless_sorter::parse_keywords;
///
/// let c = parse_keywords(["Title - Acme Corp", "Date - 03/18/23"]);
/// assert_eq!(c.title.as_deref(), Some("Acme Corp"));
/// assert_eq!(c.date.map(|d| d.to_string()).as_deref(), Some("2023-03-18"));
/// ```
pub fn parse_keywords<I, S>(keywords: I) -> Classification
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result = Classification::default();

    for keyword in keywords {
        match match_keyword(keyword.as_ref()) {
            Some((Field::Title, value)) => result.title = Some(value.to_owned()),
            Some((Field::Date, value)) => result.date = normalize_date(value),
            None => {}
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn title_and_date() {
        let c = parse_keywords(["Title - Acme Corp", "Date - 03/18/23"]);
        assert_eq!(c.title.as_deref(), Some("Acme Corp"));
        assert_eq!(c.date, ymd(2023, 3, 18));
    }

    #[test]
    fn prefixes_are_case_insensitive() {
        let c = parse_keywords(["MERCHANT - Corner Shop", "DATE=18/Mar/23"]);
        assert_eq!(c.title.as_deref(), Some("Corner Shop"));
        assert_eq!(c.date, ymd(2023, 3, 18));

        let c = parse_keywords(["Vendor=Utility Co"]);
        assert_eq!(c.title.as_deref(), Some("Utility Co"));
        assert_eq!(c.date, None);
    }

    #[test]
    fn value_case_is_preserved() {
        let c = parse_keywords(["title - MiXeD Case"]);
        assert_eq!(c.title.as_deref(), Some("MiXeD Case"));
    }

    #[test]
    fn last_match_wins() {
        let c = parse_keywords([
            "Title - First",
            "vendor=Second",
            "date=01/01/22",
            "Date - 02/02/22",
        ]);
        assert_eq!(c.title.as_deref(), Some("Second"));
        assert_eq!(c.date, ymd(2022, 2, 2));
    }

    #[test]
    fn unparseable_later_date_clears_earlier_one() {
        let c = parse_keywords(["Date - 03/18/23", "date=not a date"]);
        assert_eq!(c.date, None);
    }

    #[test]
    fn unrelated_keywords_leave_result_empty() {
        let c = parse_keywords(["receipt", "Tax", "Titles - nope", ""]);
        assert!(c.is_empty());
    }

    #[test]
    fn keyword_shorter_than_prefix_does_not_panic() {
        let c = parse_keywords(["Da", "é", "Title -", "Merchant ñ"]);
        assert!(c.is_empty());
    }

    #[test]
    fn accented_lookalike_prefix_is_ignored() {
        let c = parse_keywords(["Titlé - x", "vendor=Café Nord"]);
        assert_eq!(c.title.as_deref(), Some("Café Nord"));
    }
}
