// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Context;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::fiscal::FiscalConvention;
use crate::models::{Region, SourcePriorityTable};

use super::fixture::FixtureSource;
use super::source::EarningsSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionInfo {
    pub id: String,
    pub name: String,
    pub fiscal_year: FiscalConvention,
    pub sources: Vec<String>,
}

/// Sources by region, in registration order, plus the priority table used
/// to rank them. Built once at start-up and shared read-only.
pub struct SourceRegistry {
    priorities: SourcePriorityTable,
    sources: Vec<Arc<dyn EarningsSource>>,
}

impl SourceRegistry {
    pub fn new(priorities: SourcePriorityTable) -> Self {
        Self {
            priorities,
            sources: Vec::new(),
        }
    }

    /// A registry holding one [`FixtureSource`] per listing file, in order.
    pub fn from_fixtures(priorities: SourcePriorityTable, paths: &[PathBuf]) -> anyhow::Result<Self> {
        let mut registry = Self::new(priorities);
        for path in paths {
            let source = FixtureSource::from_file(path)?;
            registry
                .register(Arc::new(source))
                .with_context(|| format!("Cannot register {}", path.display()))?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, source: Arc<dyn EarningsSource>) -> Result<(), RegistryError> {
        let id = source.id().to_string();
        if self.priorities.get(&id).is_none() {
            return Err(RegistryError::UnprioritizedSource(id));
        }
        if self.sources.iter().any(|s| s.id() == id) {
            return Err(RegistryError::DuplicateSource(id));
        }
        log::debug!("Registered source '{}' for {}", id, source.region().name());
        self.sources.push(source);
        Ok(())
    }

    pub fn priorities(&self) -> &SourcePriorityTable {
        &self.priorities
    }

    pub fn priority(&self, source: &str) -> Option<u8> {
        self.priorities.get(source)
    }

    pub fn sources(&self, region: Region) -> Vec<Arc<dyn EarningsSource>> {
        self.sources
            .iter()
            .filter(|s| s.region() == region)
            .cloned()
            .collect()
    }

    pub fn all_sources(&self) -> Vec<Arc<dyn EarningsSource>> {
        self.sources.clone()
    }

    /// Sources for `region`, or every source when `None`.
    pub fn select(&self, region: Option<Region>) -> Vec<Arc<dyn EarningsSource>> {
        match region {
            Some(region) => self.sources(region),
            None => self.all_sources(),
        }
    }

    /// Regions that have at least one source.
    pub fn regions(&self) -> Vec<RegionInfo> {
        Region::ALL
            .into_iter()
            .filter_map(|region| {
                let sources: Vec<String> = self
                    .sources(region)
                    .iter()
                    .map(|s| s.id().to_string())
                    .collect();
                if sources.is_empty() {
                    return None;
                }
                Some(RegionInfo {
                    id: region.id().to_string(),
                    name: region.name().to_string(),
                    fiscal_year: region.convention(),
                    sources,
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }
}
