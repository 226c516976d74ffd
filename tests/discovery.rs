// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! End-to-end discovery: fan-out across sources, failure isolation, dedup.

mod common;

use common::*;
use earnings_rs::models::{DocType, Region, SourcePriorityTable};
use earnings_rs::service::EarningsService;
use earnings_rs::sources::{DocumentRequest, FixtureSource, SourceRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn registry() -> SourceRegistry {
    let bse = FixtureSource::new("bse", Region::India).with_company(listing(
        "Honasa Consumer Ltd",
        &[
            ("Q4FY26", DocType::Transcript, "https://bse.example/honasa-q4.pdf"),
            ("Q3FY26", DocType::Transcript, "https://bse.example/honasa-q3.pdf"),
        ],
    ));
    let screener = FixtureSource::new("screener", Region::India)
        .with_company(listing(
            "Honasa Consumer Limited",
            &[
                ("Q4FY26", DocType::Transcript, "https://screener.example/honasa-q4.pdf"),
                ("Q2FY26", DocType::Transcript, "https://screener.example/honasa-q2.pdf"),
                ("Q2", DocType::Presentation, "https://screener.example/honasa-ip.pdf"),
            ],
        ))
        .with_company(listing("Trent Ltd", &[]));
    let edgar = FixtureSource::new("edgar", Region::Us).with_company(listing(
        "Apple Inc",
        &[("Q2 2026", DocType::PressRelease, "https://sec.example/aapl.htm")],
    ));

    let mut registry = SourceRegistry::new(SourcePriorityTable::default());
    registry.register(Arc::new(bse)).unwrap();
    registry
        .register(Arc::new(FailingSource {
            id: "nse",
            region: Region::India,
        }))
        .unwrap();
    registry.register(Arc::new(screener)).unwrap();
    registry
        .register(Arc::new(SlowSource {
            id: "tijori",
            region: Region::India,
            delay: Duration::from_secs(10),
        }))
        .unwrap();
    registry.register(Arc::new(edgar)).unwrap();
    registry
}

fn service() -> EarningsService {
    EarningsService::new(Arc::new(registry()), Arc::new(test_identity()))
        .with_timeout(Duration::from_millis(200))
}

#[tokio::test]
async fn test_failing_and_slow_sources_do_not_block_discovery() {
    let started = Instant::now();
    let report = service()
        .get_earnings_documents("Mamaearth", Some(Region::India), &DocumentRequest::default())
        .await;
    assert!(started.elapsed() < Duration::from_secs(5));

    assert_eq!(report.company, "Honasa Consumer Ltd");
    assert!(!report.unmatched);
    assert_eq!(report.consulted, vec!["bse", "nse", "screener", "tijori"]);

    let failed: Vec<&str> = report.failed_sources.iter().map(|f| f.source.as_str()).collect();
    assert_eq!(failed, vec!["nse", "tijori"]);
    assert!(report.failed_sources[1].reason.contains("timed out"));

    let found: Vec<(String, &str)> = report
        .documents
        .iter()
        .map(|d| (d.period.label(), d.url.as_str()))
        .collect();
    assert_eq!(
        found,
        vec![
            ("Q4FY26".to_string(), "https://bse.example/honasa-q4.pdf"),
            ("Q3FY26".to_string(), "https://bse.example/honasa-q3.pdf"),
            ("Q2FY26".to_string(), "https://screener.example/honasa-q2.pdf"),
        ]
    );

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].document.url, "https://screener.example/honasa-ip.pdf");
    assert_eq!(report.skipped[0].document.source, "screener");
}

#[tokio::test]
async fn test_priorities_are_stamped_from_the_table() {
    let report = service()
        .get_earnings_documents("Honasa Consumer", Some(Region::India), &DocumentRequest::default())
        .await;
    for doc in &report.documents {
        let expected = if doc.source == "bse" { 0 } else { 1 };
        assert_eq!(doc.priority, expected, "{}", doc.url);
    }
}

#[tokio::test]
async fn test_region_filter_and_doc_type_filter() {
    let service = service();

    let us = service
        .get_earnings_documents("Apple Inc", Some(Region::Us), &DocumentRequest::default())
        .await;
    assert_eq!(us.consulted, vec!["edgar"]);
    assert_eq!(us.documents.len(), 1);
    assert_eq!(us.documents[0].period.label(), "Q2 2026");

    let only_decks = service
        .get_earnings_documents(
            "Mamaearth",
            Some(Region::India),
            &DocumentRequest::only(5, [DocType::Presentation]),
        )
        .await;
    assert!(only_decks.documents.is_empty());
    assert_eq!(only_decks.skipped.len(), 1);
}

#[tokio::test]
async fn test_many_companies_are_discovered_independently() {
    let queries = vec![
        "Mamaearth".to_string(),
        "Zudio".to_string(),
        "Totally Unknown Widgets".to_string(),
    ];
    let reports = service()
        .get_earnings_documents_many(&queries, Some(Region::India), &DocumentRequest::default())
        .await;

    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0].documents.len(), 3);

    assert_eq!(reports[1].company, "Trent Ltd");
    assert!(reports[1].is_empty());

    assert!(reports[2].unmatched);
    assert_eq!(reports[2].company, "Totally Unknown Widgets");
    assert!(reports[2].is_empty());

    for report in &reports {
        assert_eq!(report.failed_sources.len(), 2);
    }
}

#[tokio::test]
async fn test_search_and_suggest_skip_broken_sources() {
    let service = service();

    let found = service.search_company("Honasa", Some(Region::India)).await;
    let sources: Vec<&str> = found.iter().map(|c| c.source.as_str()).collect();
    assert_eq!(sources, vec!["bse", "screener"]);

    let suggestions = service.suggest_companies("hon", None, 8).await;
    let names: Vec<&str> = suggestions.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Honasa Consumer Ltd", "Honasa Consumer Limited"]);
}

#[test]
fn test_regions_report_conventions() {
    let regions = service().regions();
    let ids: Vec<&str> = regions.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["india", "us"]);
    assert_eq!(regions[0].sources, vec!["bse", "nse", "screener", "tijori"]);
}
