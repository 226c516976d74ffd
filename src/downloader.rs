// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::time::sleep;

use crate::config::Config;
use crate::models::EarningsDocument;
use crate::utils::safe_file_component;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Downloaded { bytes: usize },
    /// The target file already existed.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub document: EarningsDocument,
    pub path: PathBuf,
    pub status: DownloadStatus,
}

pub struct Downloader {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
    concurrency: usize,
    show_progress: bool,
}

impl Downloader {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            max_retries: config.max_retries.max(1),
            retry_delay: config.retry_delay(),
            concurrency: config.download_concurrency.max(1),
            show_progress: false,
        })
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// `output_dir/<company>/<file name>`.
    pub fn target_path(output_dir: &Path, doc: &EarningsDocument) -> PathBuf {
        output_dir
            .join(safe_file_component(&doc.company, 100))
            .join(doc.file_name())
    }

    pub async fn download_one(&self, doc: &EarningsDocument, output_dir: &Path) -> DownloadOutcome {
        let path = Self::target_path(output_dir, doc);
        let status = match self.fetch_to(&doc.url, &path).await {
            Ok(status) => status,
            Err(e) => {
                log::warn!("Failed to download {}: {:#}", doc.url, e);
                DownloadStatus::Failed(format!("{:#}", e))
            }
        };

        DownloadOutcome {
            document: doc.clone(),
            path,
            status,
        }
    }

    /// Downloads with bounded concurrency; outcomes come back in input order.
    pub async fn download_all(&self, docs: &[EarningsDocument], output_dir: &Path) -> Vec<DownloadOutcome> {
        let progress = if self.show_progress {
            let pb = ProgressBar::new(docs.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut outcomes: Vec<(usize, DownloadOutcome)> = stream::iter(docs.iter().enumerate())
            .map(|(index, doc)| {
                let progress = progress.clone();
                async move {
                    let outcome = self.download_one(doc, output_dir).await;
                    progress.set_message(doc.file_name());
                    progress.inc(1);
                    (index, outcome)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        progress.finish_with_message("done");
        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn fetch_to(&self, url: &str, path: &Path) -> Result<DownloadStatus> {
        if fs::try_exists(path).await.unwrap_or(false) {
            log::debug!("Skipping existing {}", path.display());
            return Ok(DownloadStatus::Skipped);
        }

        let body = self.fetch_with_retries(url).await?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, &body)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(DownloadStatus::Downloaded { bytes: body.len() })
    }

    async fn fetch_with_retries(&self, url: &str) -> Result<Vec<u8>> {
        let mut last_error = None;
        for attempt in 1..=self.max_retries {
            match self.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    log::debug!("Attempt {}/{} for {} failed: {}", attempt, self.max_retries, url, e);
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        sleep(self.retry_delay).await;
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("No attempts made for {}", url)))
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?
            .error_for_status()?;

        let body = response.bytes().await.context("Failed to read response")?;
        Ok(body.to_vec())
    }
}
