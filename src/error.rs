// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use thiserror::Error;

/// A raw period signal that cannot be resolved to exactly one fiscal quarter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmbiguousPeriodError {
    #[error("period signal '{0}' carries no year")]
    MissingYear(String),

    #[error("unrecognized period signal '{0}'")]
    UnrecognizedSignal(String),

    #[error("release month {0} is out of range")]
    InvalidMonth(u32),
}

/// No canonical or fuzzy match for a company query.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("unknown company '{query}'")]
pub struct UnknownCompanyError {
    pub query: String,
    /// Closest known company and its similarity, when any company is known.
    pub closest: Option<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("source '{0}' has no entry in the source priority table")]
    UnprioritizedSource(String),

    #[error("source '{0}' is already registered")]
    DuplicateSource(String),
}
