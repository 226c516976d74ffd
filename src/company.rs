// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Company name normalization and fuzzy lookup.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::UnknownCompanyError;

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 85.0;

const LEGAL_SUFFIXES: &[&str] = &[
    "ltd",
    "limited",
    "inc",
    "corp",
    "corporation",
    "co",
    "company",
    "plc",
    "llc",
    "pvt",
    "private",
    "nv",
    "sa",
    "ag",
    "se",
    "holdings",
    "group",
    "international",
    "intl",
];

/// Grouping key for "same company" across spellings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lower-case, drop punctuation and trailing legal suffixes.
pub fn clean_name(raw: &str) -> String {
    let spaced: String = raw
        .chars()
        .map(|c| match c {
            '-' | '/' | '_' => ' ',
            c => c,
        })
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    let mut tokens: Vec<&str> = spaced.split_whitespace().collect();
    while tokens.len() > 1 && tokens.last().is_some_and(|t| LEGAL_SUFFIXES.contains(t)) {
        tokens.pop();
    }
    tokens.join(" ")
}

/// Brand or informal name to official listed name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        let mut table = Self::new();
        for (alias, official) in map {
            table.insert(alias, official);
        }
        table
    }

    pub fn insert(&mut self, alias: &str, official: &str) {
        self.entries.insert(clean_name(alias), official.trim().to_string());
    }

    pub fn lookup(&self, raw: &str) -> Option<&str> {
        self.entries.get(&clean_name(raw)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompanyMatch {
    /// Display name of the matched company, as it was registered.
    pub name: String,
    pub key: CanonicalKey,
    pub score: f64,
    pub exact: bool,
}

#[derive(Debug, Clone)]
struct KnownCompany {
    key: CanonicalKey,
    name: String,
}

/// Alias table plus the directory of known companies used for fuzzy lookup.
#[derive(Debug, Clone)]
pub struct CompanyIdentity {
    aliases: AliasTable,
    known: Vec<KnownCompany>,
    threshold: f64,
}

impl Default for CompanyIdentity {
    fn default() -> Self {
        Self::new(AliasTable::new(), DEFAULT_FUZZY_THRESHOLD)
    }
}

impl CompanyIdentity {
    pub fn new(aliases: AliasTable, threshold: f64) -> Self {
        Self {
            aliases,
            known: Vec::new(),
            threshold,
        }
    }

    pub fn with_companies<I, S>(mut self, companies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for company in companies {
            self.register(company.as_ref());
        }
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn canonicalize(&self, raw: &str) -> CanonicalKey {
        match self.aliases.lookup(raw) {
            Some(official) => CanonicalKey(clean_name(official)),
            None => CanonicalKey(clean_name(raw)),
        }
    }

    /// The official listed name on an alias hit, otherwise `raw` unchanged.
    pub fn resolve_alias(&self, raw: &str) -> String {
        self.aliases
            .lookup(raw)
            .map(str::to_string)
            .unwrap_or_else(|| raw.to_string())
    }

    /// Adds a company to the directory. Returns false when its canonical key
    /// is already known.
    pub fn register(&mut self, name: &str) -> bool {
        let display = self.resolve_alias(name);
        let key = self.canonicalize(&display);
        if key.as_str().is_empty() || self.known.iter().any(|k| k.key == key) {
            return false;
        }
        self.known.push(KnownCompany { key, name: display });
        true
    }

    pub fn known_companies(&self) -> impl Iterator<Item = &str> {
        self.known.iter().map(|k| k.name.as_str())
    }

    /// Exact canonical match first, then the best fuzzy match at or above the
    /// threshold.
    pub fn match_company(&self, query: &str) -> Result<CompanyMatch, UnknownCompanyError> {
        let key = self.canonicalize(query);

        if let Some(known) = self.known.iter().find(|k| k.key == key) {
            return Ok(CompanyMatch {
                name: known.name.clone(),
                key: known.key.clone(),
                score: 100.0,
                exact: true,
            });
        }

        // (index, score, distance); earliest registration wins remaining ties
        let mut best: Option<(usize, f64, usize)> = None;
        for (index, known) in self.known.iter().enumerate() {
            let distance = levenshtein(key.as_str(), known.key.as_str());
            let score = similarity_from_distance(key.as_str(), known.key.as_str(), distance);
            let better = match best {
                None => true,
                Some((_, best_score, best_distance)) => {
                    score > best_score || (score == best_score && distance < best_distance)
                }
            };
            if better {
                best = Some((index, score, distance));
            }
        }

        match best {
            Some((index, score, _)) if score >= self.threshold => {
                let known = &self.known[index];
                log::debug!(
                    "Fuzzy matched '{}' to '{}' ({:.1})",
                    query,
                    known.name,
                    score
                );
                Ok(CompanyMatch {
                    name: known.name.clone(),
                    key: known.key.clone(),
                    score,
                    exact: false,
                })
            }
            closest => Err(UnknownCompanyError {
                query: query.to_string(),
                closest: closest.map(|(index, score, _)| (self.known[index].name.clone(), score)),
            }),
        }
    }

    /// Known companies whose canonical key starts with the canonical prefix,
    /// in registration order.
    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<String> {
        let prefix = clean_name(prefix);
        if prefix.is_empty() {
            return Vec::new();
        }
        self.known
            .iter()
            .filter(|k| k.key.as_str().starts_with(&prefix))
            .take(limit)
            .map(|k| k.name.clone())
            .collect()
    }
}

/// Edit distance in chars between two cleaned names.
pub fn levenshtein(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// `100 * (max_len - distance) / max_len`, 100.0 for two empty strings.
pub fn similarity(a: &str, b: &str) -> f64 {
    similarity_from_distance(a, b, levenshtein(a, b))
}

fn similarity_from_distance(a: &str, b: &str, distance: usize) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 100.0;
    }
    (max_len.saturating_sub(distance) as f64 * 100.0) / max_len as f64
}
