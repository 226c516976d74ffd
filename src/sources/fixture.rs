// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! A source backed by a JSON listing of companies and their documents.
//!
//! ```json
//! {
//!   "id": "bse",
//!   "region": "india",
//!   "companies": [
//!     {
//!       "name": "Honasa Consumer Ltd",
//!       "documents": [
//!         { "period": "Feb", "year": 2026, "doc_type": "transcript", "url": "https://..." }
//!       ]
//!     }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::company::clean_name;
use crate::models::{DocType, RawDocument, Region};

use super::source::{CompanyCandidate, DocumentRequest, EarningsSource, limit_by_quarter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureDocument {
    pub period: String,
    #[serde(default)]
    pub year: Option<i32>,
    pub doc_type: DocType,
    pub url: String,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureCompany {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub documents: Vec<FixtureDocument>,
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    id: String,
    region: Region,
    #[serde(default)]
    companies: Vec<FixtureCompany>,
}

#[derive(Debug, Clone)]
pub struct FixtureSource {
    id: String,
    region: Region,
    companies: Vec<FixtureCompany>,
}

impl FixtureSource {
    pub fn new(id: impl Into<String>, region: Region) -> Self {
        Self {
            id: id.into(),
            region,
            companies: Vec::new(),
        }
    }

    pub fn with_company(mut self, company: FixtureCompany) -> Self {
        self.companies.push(company);
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: FixtureFile = serde_json::from_str(json).context("Invalid fixture JSON")?;
        Ok(Self {
            id: file.id,
            region: file.region,
            companies: file.companies,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Failed to load fixture {}", path.display()))
    }

    fn candidate(&self, company: &FixtureCompany) -> CompanyCandidate {
        CompanyCandidate {
            name: company.name.clone(),
            url: company.url.clone(),
            source: self.id.clone(),
            region: self.region,
        }
    }

    fn find_company(&self, name: &str) -> Option<&FixtureCompany> {
        let wanted = clean_name(name);
        if wanted.is_empty() {
            return None;
        }
        self.companies
            .iter()
            .find(|c| clean_name(&c.name) == wanted)
            .or_else(|| {
                self.companies
                    .iter()
                    .find(|c| clean_name(&c.name).contains(&wanted))
            })
    }
}

#[async_trait]
impl EarningsSource for FixtureSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn region(&self) -> Region {
        self.region
    }

    async fn search_company(&self, name: &str) -> Result<Vec<CompanyCandidate>> {
        let wanted = clean_name(name);
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .companies
            .iter()
            .filter(|c| {
                let key = clean_name(&c.name);
                key.contains(&wanted) || wanted.contains(&key)
            })
            .map(|c| self.candidate(c))
            .collect())
    }

    async fn get_earnings_calls(
        &self,
        company: &str,
        request: &DocumentRequest,
    ) -> Result<Vec<RawDocument>> {
        let Some(found) = self.find_company(company) else {
            log::debug!("{}: no listing for '{}'", self.id, company);
            return Ok(Vec::new());
        };

        let convention = self.convention();
        let docs = found
            .documents
            .iter()
            .filter(|d| request.wants(d.doc_type))
            .map(|d| {
                let raw = RawDocument::new(
                    found.name.clone(),
                    d.period.clone(),
                    d.year,
                    d.doc_type,
                    d.url.clone(),
                    convention,
                )
                .with_source(self.id.clone(), 0);
                match d.release_date {
                    Some(date) => raw.with_release_date(date),
                    None => raw,
                }
            })
            .collect();

        Ok(limit_by_quarter(docs, request.count))
    }

    async fn suggest_companies(&self, prefix: &str, limit: usize) -> Result<Vec<CompanyCandidate>> {
        let prefix = clean_name(prefix);
        if prefix.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .companies
            .iter()
            .filter(|c| clean_name(&c.name).starts_with(&prefix))
            .take(limit)
            .map(|c| self.candidate(c))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const JSON: &str = r#"{
        "id": "bse",
        "region": "india",
        "companies": [
            {
                "name": "Honasa Consumer Ltd",
                "url": "https://www.bseindia.com/honasa",
                "documents": [
                    { "period": "Feb", "year": 2026, "doc_type": "transcript", "url": "https://bse/t1.pdf" },
                    { "period": "Q3FY26", "doc_type": "presentation", "url": "https://bse/p1.pdf" },
                    { "period": "Nov", "year": 2024, "doc_type": "transcript", "url": "https://bse/t0.pdf" },
                    { "period": "board outcome", "doc_type": "pnl", "url": "https://bse/r1.pdf", "release_date": "2025-08-12" }
                ]
            },
            { "name": "Hindustan Unilever Limited" }
        ]
    }"#;

    #[tokio::test]
    async fn test_from_json_and_fetch() {
        let source = FixtureSource::from_json(JSON).unwrap();
        assert_eq!(source.id(), "bse");
        assert_eq!(source.region(), Region::India);

        let docs = source
            .get_earnings_calls("Honasa Consumer", &DocumentRequest::default())
            .await
            .unwrap();
        assert_eq!(docs.len(), 4);
        assert!(docs.iter().all(|d| d.source == "bse"));
        assert_eq!(docs[3].release_date, NaiveDate::from_ymd_opt(2025, 8, 12));
    }

    #[tokio::test]
    async fn test_fetch_filters_doc_types_and_quarters() {
        let source = FixtureSource::from_json(JSON).unwrap();
        let request = DocumentRequest::only(1, [DocType::Transcript]);
        let docs = source.get_earnings_calls("honasa", &request).await.unwrap();
        // Feb 2026 release is Q4FY25, the most recent transcript quarter
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].url, "https://bse/t1.pdf");
    }

    #[tokio::test]
    async fn test_unknown_company_yields_nothing() {
        let source = FixtureSource::from_json(JSON).unwrap();
        let docs = source
            .get_earnings_calls("Infosys", &DocumentRequest::default())
            .await
            .unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_search_and_suggest() {
        let source = FixtureSource::from_json(JSON).unwrap();
        let found = source.search_company("hindustan unilever ltd").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Hindustan Unilever Limited");
        assert_eq!(found[0].source, "bse");

        let suggested = source.suggest_companies("HON", 5).await.unwrap();
        assert_eq!(suggested.len(), 1);
        assert_eq!(suggested[0].url.as_deref(), Some("https://www.bseindia.com/honasa"));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(JSON.as_bytes()).unwrap();
        let source = FixtureSource::from_file(file.path()).unwrap();
        assert_eq!(source.id(), "bse");

        assert!(FixtureSource::from_file("/nonexistent/fixture.json").is_err());
        assert!(FixtureSource::from_json("{ not json").is_err());
    }
}
