// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::company::{AliasTable, CompanyIdentity, DEFAULT_FUZZY_THRESHOLD};
use crate::comparator::QuarterComparator;
use crate::models::SourcePriorityTable;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: PathBuf,
    pub quarters_per_company: usize,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub download_concurrency: usize,
    pub user_agent: String,
    pub fuzzy_threshold: f64,
    pub material_change_pct: f64,
    pub notable_change_pct: f64,
    /// Known companies for fuzzy lookup.
    pub companies: Vec<String>,
    /// JSON listings loaded as sources at start-up.
    pub fixtures: Vec<PathBuf>,
    /// Brand or informal name to official listed name.
    pub aliases: BTreeMap<String, String>,
    /// Overrides and additions to the built-in source priorities.
    pub source_priorities: BTreeMap<String, u8>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./downloads"),
            quarters_per_company: 5,
            request_timeout_secs: 30,
            max_retries: 3,
            retry_delay_ms: 1000,
            download_concurrency: 4,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            material_change_pct: 10.0,
            notable_change_pct: 5.0,
            companies: Vec::new(),
            fixtures: Vec::new(),
            aliases: BTreeMap::new(),
            source_priorities: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn priority_table(&self) -> SourcePriorityTable {
        SourcePriorityTable::with_overrides(&self.source_priorities)
    }

    pub fn identity(&self) -> CompanyIdentity {
        CompanyIdentity::new(AliasTable::from_map(&self.aliases), self.fuzzy_threshold)
            .with_companies(&self.companies)
    }

    pub fn comparator(&self) -> QuarterComparator {
        QuarterComparator::new(self.material_change_pct, self.notable_change_pct)
    }
}

pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let config_path = path.as_ref();
    let config_str = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config from path {:?}", config_path))?;
    let config = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;
    Ok(config)
}

/// The config at `path`, or the defaults when the file does not exist.
pub fn load_config_or_default(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        log::info!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    load_config(path)
}

pub fn save_config(config: &Config, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let config_str = toml::to_string_pretty(config)?;
    fs::write(path, config_str)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml_content = r#"
output_dir = "/tmp/earnings"
companies = ["Honasa Consumer", "Infosys"]

[aliases]
Mamaearth = "Honasa Consumer"
"#;

        let config: Config = toml::from_str(toml_content).expect("Failed to parse TOML");

        assert_eq!(config.output_dir, PathBuf::from("/tmp/earnings"));
        assert_eq!(config.quarters_per_company, 5);
        assert_eq!(config.fuzzy_threshold, 85.0);
        assert_eq!(config.companies.len(), 2);
        assert_eq!(config.aliases["Mamaearth"], "Honasa Consumer");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = Config::default();
        config.companies = vec!["Honasa Consumer".to_string()];
        config.aliases.insert("Mamaearth".to_string(), "Honasa Consumer".to_string());
        config.source_priorities.insert("trendlyne".to_string(), 2);
        config.fixtures.push(PathBuf::from("fixtures/bse.json"));

        let toml_str = toml::to_string_pretty(&config).expect("Failed to serialize config");
        let parsed: Config = toml::from_str(&toml_str).expect("Failed to deserialize config");

        assert_eq!(config, parsed);
    }

    #[test]
    fn test_invalid_toml_syntax() {
        let invalid_toml = r#"
companies = ["Infosys"
output_dir = "x"
"#;

        let result: Result<Config, _> = toml::from_str(invalid_toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_derived_collaborators() {
        let mut config = Config::default();
        config.aliases.insert("Mamaearth".to_string(), "Honasa Consumer".to_string());
        config.companies = vec!["Honasa Consumer Ltd".to_string()];
        config.source_priorities.insert("screener".to_string(), 2);
        config.material_change_pct = 20.0;

        let identity = config.identity();
        assert_eq!(identity.resolve_alias("mamaearth"), "Honasa Consumer");
        assert_eq!(identity.match_company("Mamaearth").unwrap().name, "Honasa Consumer Ltd");
        assert_eq!(config.priority_table().get("screener"), Some(2));
        assert_eq!(config.comparator().material_threshold, 20.0);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.retry_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_save_and_load_config_to_temp_file() {
        let mut config = Config::default();
        config.quarters_per_company = 8;

        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        save_config(&config, temp_file.path()).expect("Failed to save");
        let loaded = load_config(temp_file.path()).expect("Failed to load");
        assert_eq!(loaded.quarters_per_company, 8);
    }

    #[test]
    fn test_load_errors_and_default_fallback() {
        let mut bad = NamedTempFile::new().expect("Failed to create temp file");
        bad.write_all(b"quarters_per_company = \"five\"").expect("Failed to write");
        assert!(load_config(bad.path()).is_err());
        assert!(load_config("/nonexistent/config.toml").is_err());

        let config = load_config_or_default("/nonexistent/config.toml").expect("defaults");
        assert_eq!(config, Config::default());
    }
}
