// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Fiscal quarters and years under the two regional conventions.
//!
//! Sources report periods in three shapes: an explicit quarter label
//! (`Q3FY26`, `Q2 2025`), a bare quarter plus a separate year, or only the
//! month the results were released in. Everything is normalized here into a
//! [`FiscalPeriod`] before any comparison or deduplication happens.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::AmbiguousPeriodError;

static QUARTER_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^(?:Q([1-4])|([1-4])Q)\s*(?:FY\s*)?['"’]?(\d{4}|\d{2})?$"#)
        .expect("quarter label pattern")
});

static MONTH_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?(?:[\s,\-]+(\d{4}))?$",
    )
        .expect("month label pattern")
});

static QUARTER_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bQ([1-4])\s*(?:FY\s*)?['"’]?(\d{4}|\d{2})\b"#).expect("quarter text pattern")
});

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub fn number(self) -> u32 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }

    pub fn from_number(n: u32) -> Option<Self> {
        match n {
            1 => Some(Quarter::Q1),
            2 => Some(Quarter::Q2),
            3 => Some(Quarter::Q3),
            4 => Some(Quarter::Q4),
            _ => None,
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

impl FromStr for Quarter {
    type Err = AmbiguousPeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match PeriodSignal::parse(s)? {
            PeriodSignal::Quarter { quarter, .. } => Ok(quarter),
            PeriodSignal::ReleaseMonth { .. } => {
                Err(AmbiguousPeriodError::UnrecognizedSignal(s.to_string()))
            }
        }
    }
}

/// How a region maps calendar months onto fiscal quarters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiscalConvention {
    /// Fiscal year equals the calendar year (US, Korea, China).
    Calendar,
    /// April to March, labelled by the calendar year it ends in (India, Japan).
    AprilMarch,
}

impl FiscalConvention {
    pub fn name(self) -> &'static str {
        match self {
            FiscalConvention::Calendar => "calendar",
            FiscalConvention::AprilMarch => "april_march",
        }
    }

    /// The fiscal period a calendar month falls inside.
    pub fn period_containing(self, year: i32, month: u32) -> Result<FiscalPeriod, AmbiguousPeriodError> {
        if !(1..=12).contains(&month) {
            return Err(AmbiguousPeriodError::InvalidMonth(month));
        }
        let period = match self {
            FiscalConvention::Calendar => FiscalPeriod::new(quarter_of_month(month), year, self),
            FiscalConvention::AprilMarch if month >= 4 => {
                FiscalPeriod::new(quarter_of_month(month - 3), year + 1, self)
            }
            FiscalConvention::AprilMarch => FiscalPeriod::new(Quarter::Q4, year, self),
        };
        Ok(period)
    }

    /// The fiscal period whose results are published in the given release month.
    ///
    /// Results come out one to two months after a quarter closes, so the
    /// release month always maps to an earlier quarter, never to the quarter
    /// that contains it.
    pub fn period_reported_in(self, year: i32, month: u32) -> Result<FiscalPeriod, AmbiguousPeriodError> {
        let containing = self.period_containing(year, month)?;
        let period = match self {
            FiscalConvention::Calendar => containing.previous_quarter(),
            FiscalConvention::AprilMarch => {
                let (quarter, fiscal_year) = match month {
                    1..=5 => (Quarter::Q4, containing.year - 1),
                    6..=8 => (Quarter::Q1, containing.year),
                    9..=11 => (Quarter::Q2, containing.year),
                    _ => (Quarter::Q3, containing.year),
                };
                FiscalPeriod::new(quarter, fiscal_year, self)
            }
        };
        Ok(period)
    }
}

fn quarter_of_month(month: u32) -> Quarter {
    match month {
        1..=3 => Quarter::Q1,
        4..=6 => Quarter::Q2,
        7..=9 => Quarter::Q3,
        _ => Quarter::Q4,
    }
}

/// A reporting quarter in one fiscal convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiscalPeriod {
    pub quarter: Quarter,
    pub year: i32,
    pub convention: FiscalConvention,
}

impl FiscalPeriod {
    pub fn new(quarter: Quarter, year: i32, convention: FiscalConvention) -> Self {
        Self {
            quarter,
            year,
            convention,
        }
    }

    /// Total order by (year, quarter).
    ///
    /// Panics when the conventions differ: such periods must be converted with
    /// [`FiscalPeriod::calendar_quarter`] before they can be ordered.
    pub fn compare(&self, other: &FiscalPeriod) -> Ordering {
        assert_eq!(
            self.convention, other.convention,
            "cannot compare {} ({}) with {} ({})",
            self,
            self.convention.name(),
            other,
            other.convention.name()
        );
        (self.year, self.quarter).cmp(&(other.year, other.quarter))
    }

    pub fn previous_quarter(&self) -> FiscalPeriod {
        match self.quarter {
            Quarter::Q1 => FiscalPeriod::new(Quarter::Q4, self.year - 1, self.convention),
            q => {
                let previous = Quarter::from_number(q.number() - 1).unwrap_or(Quarter::Q1);
                FiscalPeriod::new(previous, self.year, self.convention)
            }
        }
    }

    pub fn same_quarter_prior_year(&self) -> FiscalPeriod {
        FiscalPeriod::new(self.quarter, self.year - 1, self.convention)
    }

    /// Calendar (year, quarter) this period covers, comparable across conventions.
    pub fn calendar_quarter(&self) -> (i32, Quarter) {
        match self.convention {
            FiscalConvention::Calendar => (self.year, self.quarter),
            FiscalConvention::AprilMarch => match self.quarter {
                Quarter::Q1 => (self.year - 1, Quarter::Q2),
                Quarter::Q2 => (self.year - 1, Quarter::Q3),
                Quarter::Q3 => (self.year - 1, Quarter::Q4),
                Quarter::Q4 => (self.year, Quarter::Q1),
            },
        }
    }

    /// `Q3FY26` for April-March periods, `Q3 2025` for calendar ones.
    pub fn label(&self) -> String {
        match self.convention {
            FiscalConvention::Calendar => format!("{} {}", self.quarter, self.year),
            FiscalConvention::AprilMarch => {
                format!("{}FY{:02}", self.quarter, self.year.rem_euclid(100))
            }
        }
    }
}

impl PartialOrd for FiscalPeriod {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.convention != other.convention {
            return None;
        }
        Some(self.compare(other))
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// What a source actually observed about a document's period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodSignal {
    /// An explicit fiscal quarter, possibly with the fiscal year it names.
    Quarter { quarter: Quarter, year: Option<i32> },
    /// The month results were released in, possibly with its calendar year.
    ReleaseMonth { month: u32, year: Option<i32> },
}

impl PeriodSignal {
    /// Accepts `Q3`, `3Q`, `Q3FY26`, `Q3 FY2026`, `Q4 FY'26`, `Q2 2025`,
    /// `Feb`, `February 2026` and ISO dates such as `2026-02-14`.
    pub fn parse(raw: &str) -> Result<Self, AmbiguousPeriodError> {
        let trimmed = raw.trim();

        if let Some(caps) = QUARTER_LABEL.captures(trimmed) {
            let digit = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
            let quarter = digit
                .and_then(|d| d.parse().ok())
                .and_then(Quarter::from_number)
                .ok_or_else(|| AmbiguousPeriodError::UnrecognizedSignal(raw.to_string()))?;
            let year = caps.get(3).and_then(|m| parse_year(m.as_str()));
            return Ok(PeriodSignal::Quarter { quarter, year });
        }

        if let Some(caps) = MONTH_LABEL.captures(trimmed) {
            let name = caps[1].to_lowercase();
            let abbrev = name.get(..3).unwrap_or_default();
            let month = MONTHS
                .iter()
                .position(|m| *m == abbrev)
                .map(|i| i as u32 + 1)
                .ok_or_else(|| AmbiguousPeriodError::UnrecognizedSignal(raw.to_string()))?;
            let year = caps.get(2).and_then(|m| parse_year(m.as_str()));
            return Ok(PeriodSignal::ReleaseMonth { month, year });
        }

        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(PeriodSignal::from_release_date(date));
        }

        Err(AmbiguousPeriodError::UnrecognizedSignal(raw.to_string()))
    }

    pub fn from_release_date(date: NaiveDate) -> Self {
        PeriodSignal::ReleaseMonth {
            month: date.month(),
            year: Some(date.year()),
        }
    }
}

impl fmt::Display for PeriodSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodSignal::Quarter { quarter, year: Some(y) } => write!(f, "{} {}", quarter, y),
            PeriodSignal::Quarter { quarter, year: None } => write!(f, "{}", quarter),
            PeriodSignal::ReleaseMonth { month, year } => {
                let name = (*month as usize)
                    .checked_sub(1)
                    .and_then(|i| MONTHS.get(i))
                    .copied()
                    .unwrap_or("?");
                match year {
                    Some(y) => write!(f, "{} {}", name, y),
                    None => write!(f, "{}", name),
                }
            }
        }
    }
}

fn parse_year(digits: &str) -> Option<i32> {
    let n: i32 = digits.parse().ok()?;
    match digits.len() {
        2 => Some(2000 + n),
        4 => Some(n),
        _ => None,
    }
}

/// Resolve a raw signal string plus an optional separately reported year.
///
/// A year embedded in the signal wins over `year`.
pub fn normalize(
    raw: &str,
    year: Option<i32>,
    convention: FiscalConvention,
) -> Result<FiscalPeriod, AmbiguousPeriodError> {
    let signal = PeriodSignal::parse(raw)?;
    normalize_signal(signal, year, convention)
}

pub fn normalize_signal(
    signal: PeriodSignal,
    year: Option<i32>,
    convention: FiscalConvention,
) -> Result<FiscalPeriod, AmbiguousPeriodError> {
    match signal {
        PeriodSignal::Quarter {
            quarter,
            year: embedded,
        } => {
            let year = embedded
                .or(year)
                .ok_or_else(|| AmbiguousPeriodError::MissingYear(signal.to_string()))?;
            Ok(FiscalPeriod::new(quarter, year, convention))
        }
        PeriodSignal::ReleaseMonth {
            month,
            year: embedded,
        } => {
            let year = embedded
                .or(year)
                .ok_or_else(|| AmbiguousPeriodError::MissingYear(signal.to_string()))?;
            convention.period_reported_in(year, month)
        }
    }
}

/// The explicit quarter label mentioned most often in a document's text.
///
/// Ties go to the label that appears first.
pub fn detect_period_in_text(text: &str, convention: FiscalConvention) -> Option<FiscalPeriod> {
    let mut counts: HashMap<(Quarter, i32), (usize, usize)> = HashMap::new();

    for (position, caps) in QUARTER_IN_TEXT.captures_iter(text).enumerate() {
        let quarter = caps[1].parse().ok().and_then(Quarter::from_number);
        let year = parse_year(&caps[2]);
        if let (Some(quarter), Some(year)) = (quarter, year) {
            let entry = counts.entry((quarter, year)).or_insert((0, position));
            entry.0 += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|((quarter, year), _)| FiscalPeriod::new(quarter, year, convention))
}

#[cfg(test)]
mod tests {
    use super::*;

    const IN: FiscalConvention = FiscalConvention::AprilMarch;
    const CAL: FiscalConvention = FiscalConvention::Calendar;

    fn period(q: Quarter, year: i32, convention: FiscalConvention) -> FiscalPeriod {
        FiscalPeriod::new(q, year, convention)
    }

    #[test]
    fn test_release_month_mapping_april_march() {
        let cases = [
            (1, Quarter::Q4, 2025),
            (2, Quarter::Q4, 2025),
            (3, Quarter::Q4, 2025),
            (4, Quarter::Q4, 2026),
            (5, Quarter::Q4, 2026),
            (6, Quarter::Q1, 2027),
            (7, Quarter::Q1, 2027),
            (8, Quarter::Q1, 2027),
            (9, Quarter::Q2, 2027),
            (10, Quarter::Q2, 2027),
            (11, Quarter::Q2, 2027),
            (12, Quarter::Q3, 2027),
        ];
        for (month, quarter, fiscal_year) in cases {
            let got = IN.period_reported_in(2026, month).unwrap();
            assert_eq!(got, period(quarter, fiscal_year, IN), "release month {}", month);
        }
    }

    #[test]
    fn test_february_release_is_prior_fiscal_year_q4() {
        let got = normalize("Feb", Some(2026), IN).unwrap();
        assert_eq!(got.quarter, Quarter::Q4);
        assert_eq!(got.year, 2025);
        assert_eq!(got.label(), "Q4FY25");
    }

    #[test]
    fn test_december_release_is_q3_of_same_calendar_year() {
        let got = normalize("Dec 2025", None, IN).unwrap();
        assert_eq!(got, period(Quarter::Q3, 2026, IN));
        // Q3 of FY26 is Oct-Dec 2025
        assert_eq!(got.calendar_quarter(), (2025, Quarter::Q4));
    }

    #[test]
    fn test_release_month_mapping_calendar() {
        assert_eq!(CAL.period_reported_in(2026, 2).unwrap(), period(Quarter::Q4, 2025, CAL));
        assert_eq!(CAL.period_reported_in(2026, 5).unwrap(), period(Quarter::Q1, 2026, CAL));
        assert_eq!(CAL.period_reported_in(2026, 8).unwrap(), period(Quarter::Q2, 2026, CAL));
        assert_eq!(CAL.period_reported_in(2026, 11).unwrap(), period(Quarter::Q3, 2026, CAL));
    }

    #[test]
    fn test_invalid_release_month() {
        assert_eq!(
            IN.period_reported_in(2026, 13),
            Err(AmbiguousPeriodError::InvalidMonth(13))
        );
    }

    #[test]
    fn test_parse_quarter_labels() {
        let cases = [
            ("Q3", Quarter::Q3, None),
            ("q2", Quarter::Q2, None),
            ("3Q", Quarter::Q3, None),
            ("Q3FY26", Quarter::Q3, Some(2026)),
            ("Q3 FY2026", Quarter::Q3, Some(2026)),
            ("Q4 FY'26", Quarter::Q4, Some(2026)),
            ("Q2 2025", Quarter::Q2, Some(2025)),
        ];
        for (raw, quarter, year) in cases {
            assert_eq!(
                PeriodSignal::parse(raw).unwrap(),
                PeriodSignal::Quarter { quarter, year },
                "{}",
                raw
            );
        }
    }

    #[test]
    fn test_parse_month_labels_and_dates() {
        assert_eq!(
            PeriodSignal::parse("February 2026").unwrap(),
            PeriodSignal::ReleaseMonth { month: 2, year: Some(2026) }
        );
        assert_eq!(
            PeriodSignal::parse("sept").unwrap(),
            PeriodSignal::ReleaseMonth { month: 9, year: None }
        );
        assert_eq!(
            PeriodSignal::parse("2025-11-14").unwrap(),
            PeriodSignal::ReleaseMonth { month: 11, year: Some(2025) }
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for raw in [
            "",
            "Q5",
            "H1 2025",
            "results",
            "Q3 FY202",
            "Junk",
            "Marketing",
            "Decision",
            "Augmented",
            "Mayday",
            "Octopus 2025",
            "Sept.ember",
        ] {
            assert!(PeriodSignal::parse(raw).is_err(), "{}", raw);
        }
    }

    #[test]
    fn test_normalize_missing_year_is_ambiguous() {
        assert_eq!(
            normalize("Q2", None, CAL),
            Err(AmbiguousPeriodError::MissingYear("Q2".to_string()))
        );
        assert!(matches!(
            normalize("Mar", None, IN),
            Err(AmbiguousPeriodError::MissingYear(_))
        ));
    }

    #[test]
    fn test_normalize_embedded_year_wins() {
        let got = normalize("Q1FY27", Some(2020), IN).unwrap();
        assert_eq!(got, period(Quarter::Q1, 2027, IN));
        let got = normalize("Q1", Some(2020), IN).unwrap();
        assert_eq!(got, period(Quarter::Q1, 2020, IN));
    }

    #[test]
    fn test_compare_orders_by_year_then_quarter() {
        let a = period(Quarter::Q4, 2025, IN);
        let b = period(Quarter::Q1, 2026, IN);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
        assert_eq!(a.compare(&a), Ordering::Equal);
        assert!(a < b);
    }

    #[test]
    #[should_panic(expected = "cannot compare")]
    fn test_compare_across_conventions_panics() {
        period(Quarter::Q1, 2026, IN).compare(&period(Quarter::Q1, 2026, CAL));
    }

    #[test]
    fn test_partial_cmp_across_conventions_is_none() {
        let a = period(Quarter::Q1, 2026, IN);
        let b = period(Quarter::Q1, 2026, CAL);
        assert_eq!(a.partial_cmp(&b), None);
    }

    #[test]
    fn test_previous_quarter_wraps_year() {
        assert_eq!(
            period(Quarter::Q1, 2026, IN).previous_quarter(),
            period(Quarter::Q4, 2025, IN)
        );
        assert_eq!(
            period(Quarter::Q3, 2026, IN).previous_quarter(),
            period(Quarter::Q2, 2026, IN)
        );
        assert_eq!(
            period(Quarter::Q3, 2026, CAL).same_quarter_prior_year(),
            period(Quarter::Q3, 2025, CAL)
        );
    }

    #[test]
    fn test_calendar_quarter_conversion() {
        assert_eq!(period(Quarter::Q1, 2026, IN).calendar_quarter(), (2025, Quarter::Q2));
        assert_eq!(period(Quarter::Q4, 2026, IN).calendar_quarter(), (2026, Quarter::Q1));
        assert_eq!(period(Quarter::Q4, 2026, CAL).calendar_quarter(), (2026, Quarter::Q4));
    }

    #[test]
    fn test_labels() {
        assert_eq!(period(Quarter::Q3, 2026, IN).label(), "Q3FY26");
        assert_eq!(period(Quarter::Q2, 2025, CAL).label(), "Q2 2025");
        assert_eq!(period(Quarter::Q1, 2009, IN).to_string(), "Q1FY09");
    }

    #[test]
    fn test_detect_period_in_text_prefers_most_common() {
        let text = "Earnings call Q2 FY26. Compared with Q1 FY26, our Q2FY26 revenue grew.";
        assert_eq!(detect_period_in_text(text, IN), Some(period(Quarter::Q2, 2026, IN)));
    }

    #[test]
    fn test_detect_period_in_text_tie_goes_to_first() {
        let text = "Q3 FY2025 versus Q4 FY2025";
        assert_eq!(detect_period_in_text(text, IN), Some(period(Quarter::Q3, 2025, IN)));
        assert_eq!(detect_period_in_text("no labels here", IN), None);
    }

    #[test]
    fn test_quarter_from_str() {
        assert_eq!("Q4".parse::<Quarter>().unwrap(), Quarter::Q4);
        assert!("Feb".parse::<Quarter>().is_err());
    }
}
