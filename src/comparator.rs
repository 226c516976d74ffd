// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Quarter-over-quarter and year-over-year comparison of stored analyses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::fiscal::FiscalPeriod;
use crate::models::DocType;
use crate::utils::format_amount;

const COST_KEYWORDS: [&str; 5] = ["cost", "expense", "attrition", "debt", "npa"];

fn default_unit() -> String {
    "INR Cr".to_string()
}

fn default_sentiment() -> String {
    "neutral".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetric {
    pub name: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub yoy_growth: Option<f64>,
    #[serde(default)]
    pub qoq_growth: Option<f64>,
    #[serde(default)]
    pub margin: Option<f64>,
    #[serde(default)]
    pub raw_text: String,
}

impl FinancialMetric {
    pub fn new(name: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: default_unit(),
            period: String::new(),
            yoy_growth: None,
            qoq_growth: None,
            margin: None,
            raw_text: String::new(),
        }
    }

    fn is_cost_like(&self) -> bool {
        let name = self.name.to_lowercase();
        COST_KEYWORDS.iter().any(|k| name.contains(k))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagementCommentary {
    pub topic: String,
    pub summary: String,
    #[serde(default = "default_sentiment")]
    pub sentiment: String,
    #[serde(default)]
    pub verbatim_quote: Option<String>,
}

/// Analysis of one company for one quarter, however it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyAnalysis {
    pub company: String,
    pub period: FiscalPeriod,
    #[serde(default)]
    pub doc_types_analyzed: Vec<DocType>,
    #[serde(default)]
    pub metrics: Vec<FinancialMetric>,
    #[serde(default)]
    pub commentary: Vec<ManagementCommentary>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub key_highlights: Vec<String>,
    #[serde(default)]
    pub risks_flagged: Vec<String>,
    #[serde(default)]
    pub guidance: Option<String>,
    #[serde(default)]
    pub analyzed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub llm_provider: String,
    #[serde(default)]
    pub llm_model: String,
    #[serde(default)]
    pub source_files: Vec<String>,
}

impl CompanyAnalysis {
    pub fn new(company: impl Into<String>, period: FiscalPeriod) -> Self {
        Self {
            company: company.into(),
            period,
            doc_types_analyzed: Vec::new(),
            metrics: Vec::new(),
            commentary: Vec::new(),
            themes: Vec::new(),
            key_highlights: Vec::new(),
            risks_flagged: Vec::new(),
            guidance: None,
            analyzed_at: None,
            llm_provider: String::new(),
            llm_model: String::new(),
            source_files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonKind {
    Qoq,
    Yoy,
}

impl ComparisonKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonKind::Qoq => "qoq",
            ComparisonKind::Yoy => "yoy",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ComparisonKind::Qoq => "QoQ",
            ComparisonKind::Yoy => "YoY",
        }
    }

    /// The period `current` is compared against.
    pub fn baseline(self, current: &FiscalPeriod) -> FiscalPeriod {
        match self {
            ComparisonKind::Qoq => current.previous_quarter(),
            ComparisonKind::Yoy => current.same_quarter_prior_year(),
        }
    }
}

impl fmt::Display for ComparisonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "qoq" => Ok(ComparisonKind::Qoq),
            "yoy" => Ok(ComparisonKind::Yoy),
            _ => Err(anyhow::anyhow!("Invalid comparison '{}'. Use: qoq or yoy", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Improved,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    Material,
    Notable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialChange {
    pub metric_name: String,
    pub current_value: f64,
    pub previous_value: f64,
    /// Rounded to one decimal.
    pub change_pct: f64,
    pub direction: Direction,
    pub significance: Significance,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterComparison {
    pub company: String,
    pub current: FiscalPeriod,
    pub previous: FiscalPeriod,
    pub kind: ComparisonKind,
    pub material_changes: Vec<MaterialChange>,
    pub new_themes: Vec<String>,
    pub dropped_themes: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuarterComparator {
    pub material_threshold: f64,
    pub notable_threshold: f64,
}

impl Default for QuarterComparator {
    fn default() -> Self {
        Self {
            material_threshold: 10.0,
            notable_threshold: 5.0,
        }
    }
}

impl QuarterComparator {
    pub fn new(material_threshold: f64, notable_threshold: f64) -> Self {
        Self {
            material_threshold,
            notable_threshold,
        }
    }

    pub fn compare(
        &self,
        current: &CompanyAnalysis,
        previous: &CompanyAnalysis,
        kind: ComparisonKind,
    ) -> QuarterComparison {
        let material_changes = self.compare_metrics(&current.metrics, &previous.metrics);
        let new_themes: Vec<String> = current
            .themes
            .iter()
            .filter(|t| !theme_matches(t, &previous.themes))
            .cloned()
            .collect();
        let dropped_themes: Vec<String> = previous
            .themes
            .iter()
            .filter(|t| !theme_matches(t, &current.themes))
            .cloned()
            .collect();
        let summary = summarize(&material_changes, &new_themes, &dropped_themes, kind);

        QuarterComparison {
            company: current.company.clone(),
            current: current.period,
            previous: previous.period,
            kind,
            material_changes,
            new_themes,
            dropped_themes,
            summary,
        }
    }

    fn compare_metrics(
        &self,
        current: &[FinancialMetric],
        previous: &[FinancialMetric],
    ) -> Vec<MaterialChange> {
        let previous_by_name: HashMap<String, &FinancialMetric> = previous
            .iter()
            .map(|m| (m.name.trim().to_lowercase(), m))
            .collect();

        let mut changes: Vec<MaterialChange> = current
            .iter()
            .filter_map(|cur| {
                let prev = previous_by_name.get(&cur.name.trim().to_lowercase())?;
                let (cur_value, prev_value) = (cur.value?, prev.value?);
                if prev_value == 0.0 {
                    return None;
                }

                let change_pct = (cur_value - prev_value) / prev_value.abs() * 100.0;
                if change_pct.abs() < self.notable_threshold {
                    return None;
                }

                let significance = if change_pct.abs() >= self.material_threshold {
                    Significance::Material
                } else {
                    Significance::Notable
                };
                let improved = if cur.is_cost_like() {
                    change_pct < 0.0
                } else {
                    change_pct > 0.0
                };

                Some(MaterialChange {
                    metric_name: cur.name.clone(),
                    current_value: cur_value,
                    previous_value: prev_value,
                    change_pct: (change_pct * 10.0).round() / 10.0,
                    direction: if improved {
                        Direction::Improved
                    } else {
                        Direction::Declined
                    },
                    significance,
                    context: format!(
                        "{}: {} -> {} ({:+.1}%)",
                        cur.name,
                        format_amount(prev_value),
                        format_amount(cur_value),
                        change_pct
                    ),
                })
            })
            .collect();

        changes.sort_by(|a, b| b.change_pct.abs().total_cmp(&a.change_pct.abs()));
        changes
    }
}

/// Equal ignoring case, or sharing at least two words (one for single-word themes).
fn theme_matches(theme: &str, others: &[String]) -> bool {
    let theme = theme.to_lowercase();
    let words: HashSet<&str> = theme.split_whitespace().collect();
    let needed = words.len().min(2);

    others.iter().any(|other| {
        let other = other.to_lowercase();
        if other == theme {
            return true;
        }
        let other_words: HashSet<&str> = other.split_whitespace().collect();
        words.intersection(&other_words).count() >= needed
    })
}

fn summarize(
    changes: &[MaterialChange],
    new_themes: &[String],
    dropped_themes: &[String],
    kind: ComparisonKind,
) -> String {
    let mut parts = Vec::new();

    if let Some(top) = changes
        .iter()
        .find(|c| c.significance == Significance::Material)
    {
        parts.push(format!(
            "{} changed {:+.1}% {} ({} -> {}).",
            top.metric_name,
            top.change_pct,
            kind.label(),
            format_amount(top.previous_value),
            format_amount(top.current_value)
        ));
    }
    if !new_themes.is_empty() {
        parts.push(format!("New themes: {}.", first_three(new_themes)));
    }
    if !dropped_themes.is_empty() {
        parts.push(format!("No longer mentioned: {}.", first_three(dropped_themes)));
    }
    if parts.is_empty() {
        parts.push(format!("No material changes detected {}.", kind.label()));
    }

    parts.join(" ")
}

fn first_three(items: &[String]) -> String {
    items.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
}
