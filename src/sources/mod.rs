// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

pub mod fixture;
pub mod registry;
pub mod source;

pub use fixture::{FixtureCompany, FixtureDocument, FixtureSource};
pub use registry::{RegionInfo, SourceRegistry};
pub use source::{CompanyCandidate, DocumentRequest, EarningsSource, limit_by_quarter};
