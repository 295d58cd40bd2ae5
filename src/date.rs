use chrono::NaiveDate;

/// Accepted keyword date layouts, tried in order.
///
/// `%y` maps two-digit years 00–69 to 2000–2069 and 70–99 to 1970–1999.
/// Four-digit years are not accepted.
pub const DATE_FORMATS: [&str; 2] = ["%m/%d/%y", "%d/%b/%y"];

/// Parse a keyword date value against [`DATE_FORMATS`].
///
/// Returns the first successful parse, or `None` when no layout matches.
///
/// ```
/// use chrono::NaiveDate;
/// use paperless_sorter::normalize_date;
///
/// assert_eq!(normalize_date("03/18/23"), NaiveDate::from_ymd_opt(2023, 3, 18));
/// assert_eq!(normalize_date("18/Mar/23"), NaiveDate::from_ymd_opt(2023, 3, 18));
/// assert_eq!(normalize_date("13/99/23"), None);
/// ```
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}
