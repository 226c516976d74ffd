// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Collapses the documents every source returned for one company into the
//! authoritative set.
//!
//! Two passes run in a fixed order. The first drops exact URL duplicates, the
//! second drops different URLs describing the same logical document, i.e. the
//! same canonical company, fiscal period and document type. In both passes the
//! lowest priority wins and ties go to the source consulted first.

use chrono::NaiveDate;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, HashSet};

use crate::company::{CanonicalKey, CompanyIdentity};
use crate::error::AmbiguousPeriodError;
use crate::fiscal::{FiscalConvention, Quarter};
use crate::models::{DocType, EarningsDocument, RawDocument};

/// A raw document that never reached the engine because its period could not
/// be resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedDocument {
    pub document: RawDocument,
    pub reason: AmbiguousPeriodError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutcome {
    pub documents: Vec<EarningsDocument>,
    pub skipped: Vec<SkippedDocument>,
}

type PeriodKey = (FiscalConvention, i32, Quarter);

fn period_key(doc: &EarningsDocument) -> PeriodKey {
    (doc.period.convention, doc.period.year, doc.period.quarter)
}

pub struct DedupEngine<'a> {
    identity: &'a CompanyIdentity,
}

impl<'a> DedupEngine<'a> {
    pub fn new(identity: &'a CompanyIdentity) -> Self {
        Self { identity }
    }

    /// Normalize periods, set aside the unresolvable ones, then dedup.
    pub fn run(&self, raw: &[RawDocument], consulted: &[String]) -> DedupOutcome {
        let mut documents = Vec::with_capacity(raw.len());
        let mut skipped = Vec::new();

        for item in raw {
            match item.normalize() {
                Ok(doc) => documents.push(doc),
                Err(reason) => {
                    log::debug!(
                        "Skipping {} from {}: {}",
                        item.url,
                        item.source,
                        reason
                    );
                    skipped.push(SkippedDocument {
                        document: item.clone(),
                        reason,
                    });
                }
            }
        }

        DedupOutcome {
            documents: self.dedup(&documents, consulted),
            skipped,
        }
    }

    /// Both passes over already normalized documents.
    ///
    /// `consulted` is the order sources were asked; sources missing from it
    /// rank after every listed one.
    pub fn dedup(&self, docs: &[EarningsDocument], consulted: &[String]) -> Vec<EarningsDocument> {
        let rank = |source: &str| {
            consulted
                .iter()
                .position(|s| s == source)
                .unwrap_or(consulted.len())
        };

        // Pass 1: exact URL
        let mut by_url: BTreeMap<&str, &EarningsDocument> = BTreeMap::new();
        for doc in docs {
            by_url
                .entry(doc.url.as_str())
                .and_modify(|current| {
                    if url_preference(doc, current, &rank) == Ordering::Less {
                        *current = doc;
                    }
                })
                .or_insert(doc);
        }

        // Pass 2: (canonical company, period, doc type)
        let mut by_key: BTreeMap<(CanonicalKey, PeriodKey, DocType), &EarningsDocument> =
            BTreeMap::new();
        for doc in by_url.into_values() {
            let key = (self.identity.canonicalize(&doc.company), period_key(doc), doc.doc_type);
            by_key
                .entry(key)
                .and_modify(|current| {
                    if semantic_preference(doc, current, &rank) == Ordering::Less {
                        *current = doc;
                    }
                })
                .or_insert(doc);
        }

        let mut survivors: Vec<(CanonicalKey, EarningsDocument)> = by_key
            .into_iter()
            .map(|((company, _, _), doc)| (company, doc.clone()))
            .collect();

        survivors.sort_by(|(company_a, a), (company_b, b)| {
            Reverse(a.period.calendar_quarter())
                .cmp(&Reverse(b.period.calendar_quarter()))
                .then(a.period.convention.cmp(&b.period.convention))
                .then(a.doc_type.cmp(&b.doc_type))
                .then(company_a.cmp(company_b))
                .then(a.url.cmp(&b.url))
        });

        assert!(
            {
                let mut seen = HashSet::new();
                survivors
                    .iter()
                    .all(|(company, doc)| seen.insert((company.clone(), period_key(doc), doc.doc_type)))
            },
            "dedup emitted two documents for one (company, period, doc_type)"
        );

        survivors.into_iter().map(|(_, doc)| doc).collect()
    }
}

fn url_preference(
    a: &EarningsDocument,
    b: &EarningsDocument,
    rank: &impl Fn(&str) -> usize,
) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then(rank(&a.source).cmp(&rank(&b.source)))
        .then(a.source.cmp(&b.source))
        .then(remaining_fields(a).cmp(&remaining_fields(b)))
}

fn semantic_preference(
    a: &EarningsDocument,
    b: &EarningsDocument,
    rank: &impl Fn(&str) -> usize,
) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then(rank(&a.source).cmp(&rank(&b.source)))
        .then(a.url.cmp(&b.url))
}

fn remaining_fields(doc: &EarningsDocument) -> (&str, PeriodKey, DocType, Option<NaiveDate>) {
    (doc.company.as_str(), period_key(doc), doc.doc_type, doc.release_date)
}
