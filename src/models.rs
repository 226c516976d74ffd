// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::AmbiguousPeriodError;
use crate::fiscal::{self, FiscalConvention, FiscalPeriod, PeriodSignal, Quarter};
use crate::utils::safe_file_component;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    India,
    Us,
    Japan,
    Korea,
    China,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::India,
        Region::Us,
        Region::Japan,
        Region::Korea,
        Region::China,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Region::India => "india",
            Region::Us => "us",
            Region::Japan => "japan",
            Region::Korea => "korea",
            Region::China => "china",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Region::India => "India",
            Region::Us => "US",
            Region::Japan => "Japan",
            Region::Korea => "Korea",
            Region::China => "China",
        }
    }

    pub fn convention(self) -> FiscalConvention {
        match self {
            Region::India | Region::Japan => FiscalConvention::AprilMarch,
            Region::Us | Region::Korea | Region::China => FiscalConvention::Calendar,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Region {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|r| r.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid region '{}'. Use: india, us, japan, korea, or china",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Transcript,
    Presentation,
    PressRelease,
    BalanceSheet,
    Pnl,
    CashFlow,
    AnnualReport,
}

impl DocType {
    pub const ALL: [DocType; 7] = [
        DocType::Transcript,
        DocType::Presentation,
        DocType::PressRelease,
        DocType::BalanceSheet,
        DocType::Pnl,
        DocType::CashFlow,
        DocType::AnnualReport,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocType::Transcript => "transcript",
            DocType::Presentation => "presentation",
            DocType::PressRelease => "press_release",
            DocType::BalanceSheet => "balance_sheet",
            DocType::Pnl => "pnl",
            DocType::CashFlow => "cash_flow",
            DocType::AnnualReport => "annual_report",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['-', ' '], "_");
        DocType::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| anyhow::anyhow!("Unknown document type '{}'", s))
    }
}

/// Source id to trust level; lower is more authoritative.
///
/// Official exchange filings are 0, aggregators 1, company sites 2. The table
/// is fixed once the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourcePriorityTable(BTreeMap<String, u8>);

impl Default for SourcePriorityTable {
    fn default() -> Self {
        let entries = [
            ("bse", 0),
            ("nse", 0),
            ("edgar", 0),
            ("tdnet", 0),
            ("dart", 0),
            ("cninfo", 0),
            ("screener", 1),
            ("trendlyne", 1),
            ("tijori", 1),
            ("company_ir", 2),
        ];
        Self(
            entries
                .into_iter()
                .map(|(id, priority)| (id.to_string(), priority))
                .collect(),
        )
    }
}

impl SourcePriorityTable {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, source: &str) -> Option<u8> {
        self.0.get(source).copied()
    }

    pub fn insert(&mut self, source: impl Into<String>, priority: u8) {
        self.0.insert(source.into(), priority);
    }

    /// Defaults overlaid with configured entries.
    pub fn with_overrides(overrides: &BTreeMap<String, u8>) -> Self {
        let mut table = Self::default();
        for (source, priority) in overrides {
            table.insert(source.clone(), *priority);
        }
        table
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// A document as a source reports it, before its period is normalized and
/// before its priority is stamped from the source priority table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pub company: String,
    /// Quarter label, release month or release date as the source saw it.
    pub period: String,
    /// Year reported separately from `period`, if any.
    pub year: Option<i32>,
    pub doc_type: DocType,
    pub url: String,
    pub source: String,
    pub priority: u8,
    pub convention: FiscalConvention,
    pub release_date: Option<NaiveDate>,
}

impl RawDocument {
    pub fn new(
        company: impl Into<String>,
        period: impl Into<String>,
        year: Option<i32>,
        doc_type: DocType,
        url: impl Into<String>,
        convention: FiscalConvention,
    ) -> Self {
        Self {
            company: company.into(),
            period: period.into(),
            year,
            doc_type,
            url: url.into(),
            source: String::new(),
            priority: 0,
            convention,
            release_date: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>, priority: u8) -> Self {
        self.source = source.into();
        self.priority = priority;
        self
    }

    pub fn with_release_date(mut self, date: NaiveDate) -> Self {
        self.release_date = Some(date);
        self
    }

    /// Resolve the reported period, falling back to the release date when the
    /// period text is unusable.
    pub fn normalize(&self) -> Result<EarningsDocument, AmbiguousPeriodError> {
        let period = match fiscal::normalize(&self.period, self.year, self.convention) {
            Ok(period) => period,
            Err(err) => match self.release_date {
                Some(date) => fiscal::normalize_signal(
                    PeriodSignal::from_release_date(date),
                    None,
                    self.convention,
                )?,
                None => return Err(err),
            },
        };

        Ok(EarningsDocument {
            company: self.company.clone(),
            period,
            doc_type: self.doc_type,
            url: self.url.clone(),
            source: self.source.clone(),
            priority: self.priority,
            release_date: self.release_date,
        })
    }
}

/// One discovered earnings artifact with a resolved fiscal period.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EarningsDocument {
    pub company: String,
    pub period: FiscalPeriod,
    pub doc_type: DocType,
    pub url: String,
    pub source: String,
    pub priority: u8,
    pub release_date: Option<NaiveDate>,
}

impl EarningsDocument {
    pub fn quarter(&self) -> Quarter {
        self.period.quarter
    }

    pub fn year(&self) -> i32 {
        self.period.year
    }

    /// `{Company}_{period}_{doc_type}.{ext}`, safe for any filesystem.
    pub fn file_name(&self) -> String {
        let safe_company = safe_file_component(&self.company, 50);
        let period = self.period.label().replace(' ', "_");
        format!("{}_{}_{}.{}", safe_company, period, self.doc_type, self.extension())
    }

    fn extension(&self) -> &'static str {
        let url = self.url.to_lowercase();
        if url.contains(".ppt") {
            "pptx"
        } else if url.contains(".mp3") || url.contains(".wav") {
            "mp3"
        } else {
            "pdf"
        }
    }
}
