// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! SQLite store for per-quarter analyses and the comparisons derived from them.

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::comparator::{
    CompanyAnalysis, ComparisonKind, MaterialChange, QuarterComparator, QuarterComparison,
};
use crate::fiscal::{FiscalPeriod, Quarter};

type CacheKey = (String, Quarter, i32);

fn cache_key(company: &str, period: &FiscalPeriod) -> CacheKey {
    (company.to_string(), period.quarter, period.year)
}

/// Upserts are serialized per `(company, quarter, year)`; different keys
/// write concurrently.
pub struct AnalysisCache {
    pool: SqlitePool,
    locks: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl AnalysisCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn key_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(key.clone()).or_default().clone()
    }

    /// Forget the key's lock once no other writer holds or awaits it.
    async fn release_key(&self, key: &CacheKey, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // one handle in the map, one here
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(key);
        }
    }

    /// Number of keys with a live write lock.
    pub async fn tracked_keys(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn save_analysis(&self, analysis: &CompanyAnalysis) -> Result<()> {
        let key = cache_key(&analysis.company, &analysis.period);
        let lock = self.key_lock(&key).await;
        let result = {
            let _guard = lock.lock().await;
            self.write_analysis(analysis).await
        };
        self.release_key(&key, lock).await;
        result
    }

    async fn write_analysis(&self, analysis: &CompanyAnalysis) -> Result<()> {

        let json = serde_json::to_string(analysis)?;
        let analyzed_at = analysis.analyzed_at.map(|t| t.to_rfc3339());

        sqlx::query(
            r#"
            INSERT INTO company_analyses
                (company, quarter, year, convention, analysis_json, llm_provider, llm_model, analyzed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(company, quarter, year) DO UPDATE SET
                convention = excluded.convention,
                analysis_json = excluded.analysis_json,
                llm_provider = excluded.llm_provider,
                llm_model = excluded.llm_model,
                analyzed_at = excluded.analyzed_at,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&analysis.company)
        .bind(analysis.period.quarter.to_string())
        .bind(analysis.period.year)
        .bind(analysis.period.convention.name())
        .bind(json)
        .bind(&analysis.llm_provider)
        .bind(&analysis.llm_model)
        .bind(analyzed_at)
        .execute(&self.pool)
        .await
        .with_context(|| {
            format!(
                "Failed to store analysis for {} {}",
                analysis.company, analysis.period
            )
        })?;

        log::debug!("Stored analysis for {} {}", analysis.company, analysis.period);
        Ok(())
    }

    pub async fn load_analysis(
        &self,
        company: &str,
        period: &FiscalPeriod,
    ) -> Result<Option<CompanyAnalysis>> {
        let row: Option<String> = sqlx::query_scalar(
            "SELECT analysis_json FROM company_analyses WHERE company = ? AND quarter = ? AND year = ?",
        )
        .bind(company)
        .bind(period.quarter.to_string())
        .bind(period.year)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|json| serde_json::from_str(&json).context("Corrupt analysis row"))
            .transpose()
    }

    /// Stored analyses for a company, most recent period first.
    pub async fn company_history(&self, company: &str, limit: i64) -> Result<Vec<CompanyAnalysis>> {
        let rows: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT analysis_json FROM company_analyses
            WHERE company = ?
            ORDER BY year DESC, quarter DESC
            LIMIT ?
            "#,
        )
        .bind(company)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|json| serde_json::from_str(json).context("Corrupt analysis row"))
            .collect()
    }

    pub async fn companies(&self) -> Result<Vec<String>> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT company FROM company_analyses ORDER BY company")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    pub async fn save_comparison(&self, comparison: &QuarterComparison) -> Result<()> {
        let key = cache_key(&comparison.company, &comparison.current);
        let lock = self.key_lock(&key).await;
        let result = {
            let _guard = lock.lock().await;
            self.write_comparison(comparison).await
        };
        self.release_key(&key, lock).await;
        result
    }

    async fn write_comparison(&self, comparison: &QuarterComparison) -> Result<()> {

        sqlx::query(
            r#"
            INSERT INTO quarter_comparisons
                (company, current_quarter, current_year, previous_quarter, previous_year,
                 comparison_type, changes_json, new_themes_json, dropped_themes_json, summary)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(company, current_quarter, current_year, comparison_type) DO UPDATE SET
                previous_quarter = excluded.previous_quarter,
                previous_year = excluded.previous_year,
                changes_json = excluded.changes_json,
                new_themes_json = excluded.new_themes_json,
                dropped_themes_json = excluded.dropped_themes_json,
                summary = excluded.summary,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&comparison.company)
        .bind(comparison.current.quarter.to_string())
        .bind(comparison.current.year)
        .bind(comparison.previous.quarter.to_string())
        .bind(comparison.previous.year)
        .bind(comparison.kind.as_str())
        .bind(serde_json::to_string(&comparison.material_changes)?)
        .bind(serde_json::to_string(&comparison.new_themes)?)
        .bind(serde_json::to_string(&comparison.dropped_themes)?)
        .bind(&comparison.summary)
        .execute(&self.pool)
        .await
        .context("Failed to store comparison")?;

        Ok(())
    }

    pub async fn load_comparison(
        &self,
        company: &str,
        period: &FiscalPeriod,
        kind: ComparisonKind,
    ) -> Result<Option<QuarterComparison>> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT changes_json, new_themes_json, dropped_themes_json, summary
            FROM quarter_comparisons
            WHERE company = ? AND current_quarter = ? AND current_year = ? AND comparison_type = ?
            "#,
        )
        .bind(company)
        .bind(period.quarter.to_string())
        .bind(period.year)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some((changes, new_themes, dropped_themes, summary)) = row else {
            return Ok(None);
        };
        let material_changes: Vec<MaterialChange> = serde_json::from_str(&changes)?;

        Ok(Some(QuarterComparison {
            company: company.to_string(),
            current: *period,
            previous: kind.baseline(period),
            kind,
            material_changes,
            new_themes: serde_json::from_str(&new_themes)?,
            dropped_themes: serde_json::from_str(&dropped_themes)?,
            summary,
        }))
    }

    /// Compare a stored quarter with its QoQ or YoY baseline and store the
    /// result. `None` when either quarter has no stored analysis.
    pub async fn compare(
        &self,
        comparator: &QuarterComparator,
        company: &str,
        period: &FiscalPeriod,
        kind: ComparisonKind,
    ) -> Result<Option<QuarterComparison>> {
        let baseline = kind.baseline(period);
        let (Some(current), Some(previous)) = (
            self.load_analysis(company, period).await?,
            self.load_analysis(company, &baseline).await?,
        ) else {
            log::info!(
                "No {} baseline for {} {} (needs {} and {})",
                kind.label(),
                company,
                period,
                period,
                baseline
            );
            return Ok(None);
        };

        let comparison = comparator.compare(&current, &previous, kind);
        self.save_comparison(&comparison).await?;
        Ok(Some(comparison))
    }
}
