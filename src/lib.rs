// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

pub mod cache;
pub mod company;
pub mod comparator;
pub mod config;
pub mod db;
pub mod dedup;
pub mod downloader;
pub mod error;
pub mod export;
pub mod fiscal;
pub mod models;
pub mod service;
pub mod sources;
pub mod utils;

pub use company::{CanonicalKey, CompanyIdentity};
pub use dedup::{DedupEngine, DedupOutcome};
pub use error::{AmbiguousPeriodError, RegistryError, UnknownCompanyError};
pub use fiscal::{FiscalConvention, FiscalPeriod, Quarter};
pub use models::{DocType, EarningsDocument, RawDocument, Region, SourcePriorityTable};
pub use service::{DiscoveryReport, EarningsService};
pub use sources::{EarningsSource, SourceRegistry};
