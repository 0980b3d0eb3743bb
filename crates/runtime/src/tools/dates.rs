//! Lenient month parsing for tool arguments.
//!
//! Models pass months as free text ("May 2024", "2024-05", "may"). Every
//! accepted form resolves to the first day of that month.

use chrono::{Datelike, Months, NaiveDate};

// Years below this come from two-digit input matched by `%Y`.
const MIN_YEAR: i32 = 1000;

// Formats carrying a day of month.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %B %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%b %d %Y",
];

// Formats without a day; parsed with a leading "1 ".
const MONTH_FORMATS: &[&str] = &["%B %Y", "%b %Y", "%Y-%m", "%Y/%m", "%m/%Y", "%m-%Y", "%Y %B"];

/// A month argument after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMonth {
    /// First day of the resolved month.
    pub month: NaiveDate,
    /// True when the input could not be parsed and the current month was used.
    pub fell_back: bool,
}

/// Parse free text into the first day of a month.
///
/// A bare month name resolves within `today`'s year.
pub fn parse_month(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    let normalized = input
        .replace([',', '.'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if normalized.is_empty() {
        return None;
    }

    // Month-only forms go first: "%B %d %Y" would otherwise read "May 2024"
    // as day 20 of year 24.
    let with_day = format!("1 {normalized}");
    let parsed = MONTH_FORMATS
        .iter()
        .find_map(|fmt| parse_plausible(&with_day, &format!("%d {fmt}")))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| parse_plausible(&normalized, fmt))
        })
        .or_else(|| {
            let with_year = format!("1 {normalized} {}", today.year());
            ["%d %B %Y", "%d %b %Y"]
                .iter()
                .find_map(|fmt| parse_plausible(&with_year, fmt))
        })?;

    start_of_month(parsed)
}

fn parse_plausible(input: &str, fmt: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input, fmt)
        .ok()
        .filter(|date| date.year() >= MIN_YEAR)
}

/// Parse a month, falling back to the current month when the input is unparsable.
///
/// The fallback silently changes which records a tool reads, so it is logged
/// and reported through [`ResolvedMonth::fell_back`].
pub fn parse_month_or_now(input: &str, today: NaiveDate) -> ResolvedMonth {
    match parse_month(input, today) {
        Some(month) => ResolvedMonth {
            month,
            fell_back: false,
        },
        None => {
            let month = start_of_month(today).unwrap_or(today);
            tracing::warn!(input, fallback = %month, "unparsable month, using current month");
            ResolvedMonth {
                month,
                fell_back: true,
            }
        }
    }
}

pub fn start_of_month(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)
}

/// The first day of the month `n` months before `date`'s month.
pub fn months_before(date: NaiveDate, n: u32) -> Option<NaiveDate> {
    start_of_month(date)?.checked_sub_months(Months::new(n))
}
