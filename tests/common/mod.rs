// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Shared helpers for the integration tests: a throwaway analysis database,
//! sources that misbehave, and document builders.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use std::time::Duration;
use tempfile::TempDir;

use earnings_rs::company::{AliasTable, CompanyIdentity};
use earnings_rs::fiscal::{FiscalConvention, FiscalPeriod, Quarter};
use earnings_rs::models::{DocType, EarningsDocument, Region};
use earnings_rs::sources::{
    CompanyCandidate, DocumentRequest, EarningsSource, FixtureCompany, FixtureDocument,
};
use earnings_rs::RawDocument;

/// Creates a temporary SQLite database with the migrations applied.
pub async fn create_test_db() -> Result<(SqlitePool, TempDir)> {
    let temp_dir = tempfile::tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let pool = SqlitePool::connect(&db_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok((pool, temp_dir))
}

/// Identity with a few Indian companies and the usual brand aliases.
pub fn test_identity() -> CompanyIdentity {
    let mut aliases = AliasTable::new();
    aliases.insert("Mamaearth", "Honasa Consumer Ltd");
    aliases.insert("Zudio", "Trent Ltd");
    CompanyIdentity::new(aliases, 85.0).with_companies([
        "Honasa Consumer Ltd",
        "Infosys Ltd",
        "Trent Ltd",
    ])
}

pub fn period(quarter: Quarter, year: i32) -> FiscalPeriod {
    FiscalPeriod::new(quarter, year, FiscalConvention::AprilMarch)
}

pub fn document(
    company: &str,
    period: FiscalPeriod,
    doc_type: DocType,
    url: &str,
    source: &str,
    priority: u8,
) -> EarningsDocument {
    EarningsDocument {
        company: company.to_string(),
        period,
        doc_type,
        url: url.to_string(),
        source: source.to_string(),
        priority,
        release_date: None,
    }
}

pub fn listing(name: &str, docs: &[(&str, DocType, &str)]) -> FixtureCompany {
    FixtureCompany {
        name: name.to_string(),
        url: None,
        documents: docs
            .iter()
            .map(|(period, doc_type, url)| FixtureDocument {
                period: period.to_string(),
                year: None,
                doc_type: *doc_type,
                url: url.to_string(),
                release_date: None,
            })
            .collect(),
    }
}

/// Errors on every call.
pub struct FailingSource {
    pub id: &'static str,
    pub region: Region,
}

#[async_trait]
impl EarningsSource for FailingSource {
    fn id(&self) -> &str {
        self.id
    }

    fn region(&self) -> Region {
        self.region
    }

    async fn search_company(&self, _name: &str) -> Result<Vec<CompanyCandidate>> {
        anyhow::bail!("connection reset by peer")
    }

    async fn get_earnings_calls(
        &self,
        _company: &str,
        _request: &DocumentRequest,
    ) -> Result<Vec<RawDocument>> {
        anyhow::bail!("connection reset by peer")
    }
}

/// Answers only after `delay`, with one transcript for whatever was asked.
pub struct SlowSource {
    pub id: &'static str,
    pub region: Region,
    pub delay: Duration,
}

#[async_trait]
impl EarningsSource for SlowSource {
    fn id(&self) -> &str {
        self.id
    }

    fn region(&self) -> Region {
        self.region
    }

    async fn search_company(&self, name: &str) -> Result<Vec<CompanyCandidate>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![CompanyCandidate {
            name: name.to_string(),
            url: None,
            source: self.id.to_string(),
            region: self.region,
        }])
    }

    async fn get_earnings_calls(
        &self,
        company: &str,
        _request: &DocumentRequest,
    ) -> Result<Vec<RawDocument>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![RawDocument::new(
            company,
            "Q1FY27",
            None,
            DocType::Transcript,
            format!("https://{}.example/late.pdf", self.id),
            self.convention(),
        )])
    }
}
