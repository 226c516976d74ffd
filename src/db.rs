// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::{Context, Result};
use sqlx::{Sqlite, migrate::MigrateDatabase, sqlite::SqlitePool};
use std::env;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:earnings.db";

/// `DATABASE_URL` from the environment, or the local default.
pub fn database_url() -> String {
    env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

pub async fn create_db_pool(db_url: &str) -> Result<SqlitePool> {
    // Create database if it doesn't exist
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        Sqlite::create_database(db_url)
            .await
            .with_context(|| format!("Failed to create database {}", db_url))?;
    }

    let pool = SqlitePool::connect(db_url)
        .await
        .with_context(|| format!("Failed to connect to {}", db_url))?;

    sqlx::migrate!().run(&pool).await?;

    Ok(pool)
}
