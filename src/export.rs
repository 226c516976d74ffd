// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::EarningsDocument;

const HEADERS: [&str; 9] = [
    "Company",
    "Period",
    "Quarter",
    "Fiscal Year",
    "Document Type",
    "Source",
    "Priority",
    "Release Date",
    "URL",
];

pub fn write_documents<W: Write>(docs: &[EarningsDocument], out: W) -> Result<()> {
    let mut writer = Writer::from_writer(out);
    writer.write_record(HEADERS)?;

    for doc in docs {
        writer.write_record([
            doc.company.clone(),
            doc.period.label(),
            doc.quarter().to_string(),
            doc.year().to_string(),
            doc.doc_type.to_string(),
            doc.source.clone(),
            doc.priority.to_string(),
            doc.release_date.map(|d| d.to_string()).unwrap_or_default(),
            doc.url.clone(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes `documents_<timestamp>.csv` into `output_dir` and returns its path.
pub fn export_documents_csv(docs: &[EarningsDocument], output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let path = output_dir.join(format!("documents_{}.csv", timestamp));
    let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_documents(docs, file)?;

    Ok(path)
}
