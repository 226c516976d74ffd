// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::company::CompanyIdentity;
use crate::dedup::{DedupEngine, SkippedDocument};
use crate::models::{EarningsDocument, RawDocument, Region};
use crate::sources::{CompanyCandidate, DocumentRequest, RegionInfo, SourceRegistry};

pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub reason: String,
}

/// Everything one company's discovery produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryReport {
    /// The name as it was asked for.
    pub query: String,
    /// The name sources were asked about, after alias and fuzzy resolution.
    pub company: String,
    /// Set when the query matched no known company and was passed through.
    pub unmatched: bool,
    pub documents: Vec<EarningsDocument>,
    pub skipped: Vec<SkippedDocument>,
    /// Source ids in the order they were consulted.
    pub consulted: Vec<String>,
    pub failed_sources: Vec<SourceFailure>,
}

impl DiscoveryReport {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

pub struct EarningsService {
    registry: Arc<SourceRegistry>,
    identity: Arc<CompanyIdentity>,
    source_timeout: Duration,
}

impl EarningsService {
    pub fn new(registry: Arc<SourceRegistry>, identity: Arc<CompanyIdentity>) -> Self {
        Self {
            registry,
            identity,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, source_timeout: Duration) -> Self {
        self.source_timeout = source_timeout;
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn identity(&self) -> &CompanyIdentity {
        &self.identity
    }

    pub fn regions(&self) -> Vec<RegionInfo> {
        self.registry.regions()
    }

    /// Alias or fuzzy match, falling back to the query itself.
    fn resolve(&self, query: &str) -> (String, bool) {
        match self.identity.match_company(query) {
            Ok(found) => (found.name, false),
            Err(err) => {
                log::debug!("{}; asking sources directly", err);
                (self.identity.resolve_alias(query), true)
            }
        }
    }

    pub async fn search_company(&self, query: &str, region: Option<Region>) -> Vec<CompanyCandidate> {
        let name = self.identity.resolve_alias(query);
        let sources = self.registry.select(region);

        let tasks = sources.iter().map(|source| {
            let name = name.as_str();
            async move {
                let id = source.id().to_string();
                match timeout(self.source_timeout, source.search_company(name)).await {
                    Ok(Ok(found)) => found,
                    Ok(Err(e)) => {
                        log::warn!("Search error from {}: {}", id, e);
                        Vec::new()
                    }
                    Err(_) => {
                        log::warn!("Search on {} timed out", id);
                        Vec::new()
                    }
                }
            }
        });

        join_all(tasks).await.into_iter().flatten().collect()
    }

    /// Suggestions from every source, first spelling of each name wins.
    pub async fn suggest_companies(
        &self,
        prefix: &str,
        region: Option<Region>,
        limit: usize,
    ) -> Vec<CompanyCandidate> {
        let sources = self.registry.select(region);
        let tasks = sources.iter().map(|source| async move {
            let id = source.id().to_string();
            match timeout(self.source_timeout, source.suggest_companies(prefix, limit)).await {
                Ok(Ok(found)) => found,
                Ok(Err(e)) => {
                    log::warn!("Suggest error from {}: {}", id, e);
                    Vec::new()
                }
                Err(_) => {
                    log::warn!("Suggest on {} timed out", id);
                    Vec::new()
                }
            }
        });

        let mut seen = HashSet::new();
        join_all(tasks)
            .await
            .into_iter()
            .flatten()
            .filter(|c| seen.insert(c.name.to_lowercase()))
            .take(limit)
            .collect()
    }

    /// Ask every source concurrently, then dedup once all have answered.
    ///
    /// Failing or slow sources are recorded in the report and contribute no
    /// documents.
    pub async fn get_earnings_documents(
        &self,
        query: &str,
        region: Option<Region>,
        request: &DocumentRequest,
    ) -> DiscoveryReport {
        let (company, unmatched) = self.resolve(query);
        let sources = self.registry.select(region);
        let consulted: Vec<String> = sources.iter().map(|s| s.id().to_string()).collect();

        let tasks = sources.iter().map(|source| {
            let company = company.as_str();
            async move {
                let result = timeout(self.source_timeout, source.get_earnings_calls(company, request)).await;
                (source.id().to_string(), result)
            }
        });

        let mut raw: Vec<RawDocument> = Vec::new();
        let mut failed_sources = Vec::new();
        for (id, result) in join_all(tasks).await {
            match result {
                Ok(Ok(docs)) => {
                    log::debug!("{} returned {} documents for {}", id, docs.len(), company);
                    let priority = self.registry.priority(&id).unwrap_or(u8::MAX);
                    raw.extend(docs.into_iter().map(|mut doc| {
                        doc.source = id.clone();
                        doc.priority = priority;
                        doc
                    }));
                }
                Ok(Err(e)) => {
                    log::warn!("Error from {}: {}", id, e);
                    failed_sources.push(SourceFailure {
                        source: id,
                        reason: e.to_string(),
                    });
                }
                Err(_) => {
                    log::warn!("{} timed out after {:?}", id, self.source_timeout);
                    failed_sources.push(SourceFailure {
                        source: id,
                        reason: format!("timed out after {:?}", self.source_timeout),
                    });
                }
            }
        }

        let outcome = DedupEngine::new(&self.identity).run(&raw, &consulted);
        log::info!(
            "{}: {} raw, {} canonical, {} skipped",
            company,
            raw.len(),
            outcome.documents.len(),
            outcome.skipped.len()
        );

        DiscoveryReport {
            query: query.to_string(),
            company,
            unmatched,
            documents: outcome.documents,
            skipped: outcome.skipped,
            consulted,
            failed_sources,
        }
    }

    /// One independent discovery per company, all running concurrently.
    pub async fn get_earnings_documents_many(
        &self,
        queries: &[String],
        region: Option<Region>,
        request: &DocumentRequest,
    ) -> Vec<DiscoveryReport> {
        join_all(
            queries
                .iter()
                .map(|q| self.get_earnings_documents(q, region, request)),
        )
        .await
    }
}
