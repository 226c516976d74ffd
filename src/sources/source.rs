// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

use crate::fiscal::{FiscalConvention, Quarter};
use crate::models::{DocType, RawDocument, Region};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyCandidate {
    pub name: String,
    pub url: Option<String>,
    pub source: String,
    pub region: Region,
}

/// What to fetch for one company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRequest {
    /// Number of most recent quarters.
    pub count: usize,
    pub doc_types: BTreeSet<DocType>,
}

impl Default for DocumentRequest {
    fn default() -> Self {
        Self {
            count: 5,
            doc_types: DocType::ALL.into_iter().collect(),
        }
    }
}

impl DocumentRequest {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    pub fn only(count: usize, doc_types: impl IntoIterator<Item = DocType>) -> Self {
        Self {
            count,
            doc_types: doc_types.into_iter().collect(),
        }
    }

    pub fn wants(&self, doc_type: DocType) -> bool {
        self.doc_types.contains(&doc_type)
    }
}

/// A regional source of earnings documents.
///
/// Implementations report documents with their raw period signal; the
/// discovery service normalizes periods and stamps priorities.
#[async_trait]
pub trait EarningsSource: Send + Sync {
    fn id(&self) -> &str;

    fn region(&self) -> Region;

    fn convention(&self) -> FiscalConvention {
        self.region().convention()
    }

    async fn search_company(&self, name: &str) -> Result<Vec<CompanyCandidate>>;

    async fn get_earnings_calls(
        &self,
        company: &str,
        request: &DocumentRequest,
    ) -> Result<Vec<RawDocument>>;

    async fn suggest_companies(&self, _prefix: &str, _limit: usize) -> Result<Vec<CompanyCandidate>> {
        Ok(Vec::new())
    }
}

/// Keep documents from the `count` most recent distinct periods.
///
/// Documents whose period cannot be resolved are kept so that they surface
/// later as skipped items instead of vanishing silently.
pub fn limit_by_quarter(docs: Vec<RawDocument>, count: usize) -> Vec<RawDocument> {
    let mut periods: Vec<(i32, Quarter)> = docs
        .iter()
        .filter_map(|d| d.normalize().ok())
        .map(|d| d.period.calendar_quarter())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    periods.sort_unstable_by(|a, b| b.cmp(a));
    periods.truncate(count);
    let keep: HashSet<(i32, Quarter)> = periods.into_iter().collect();

    docs.into_iter()
        .filter(|d| match d.normalize() {
            Ok(doc) => keep.contains(&doc.period.calendar_quarter()),
            Err(_) => true,
        })
        .collect()
}
