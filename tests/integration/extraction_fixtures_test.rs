// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{BLOCKED, CATEGORY_BEST_PAYLOAD, KEYWORD_RANKING_TEXT, LISTING_HASHED};
use shopcrawl::domain::models::record::{NormalizedRecord, Trend};
use shopcrawl::domain::models::target::SourceFamily;
use shopcrawl::engines::block_detection::detect_block;
use shopcrawl::engines::signals::collect_signals;
use shopcrawl::extractors::ExtractionEngine;

const SEARCH_URL: &str = "https://search.shopping.example.com/search/all?query=%ED%85%90%ED%8A%B8";

fn products(records: &[NormalizedRecord]) -> Vec<&shopcrawl::domain::models::record::Product> {
    records
        .iter()
        .filter_map(|r| match r {
            NormalizedRecord::Product(p) => Some(p),
            _ => None,
        })
        .collect()
}

#[test]
fn test_listing_fixture_parses_ads_and_organic_cards() {
    let engine = ExtractionEngine::default();
    let report = engine.extract(SourceFamily::Listing, LISTING_HASHED, SEARCH_URL, "캠핑");

    assert_eq!(report.strategy.as_deref(), Some("hashed-class"));
    assert_eq!(report.attempts.len(), 1);

    let items = products(&report.records);
    assert_eq!(items.len(), 3);

    let ad = items[0];
    assert!(ad.is_ad);
    assert_eq!(ad.product_id, "8801");
    assert_eq!(ad.price, 89000);
    assert_eq!(ad.mall_url, None);

    let tent = items[1];
    assert!(!tent.is_ad);
    assert_eq!(tent.product_id, "8802");
    assert_eq!(tent.name, "돔 텐트 4인용");
    assert_eq!(tent.price, 129000);
    assert_eq!(tent.original_price, Some(159000));
    assert_eq!(tent.discount_rate, Some(18));
    assert_eq!(tent.delivery_fee, Some(3000));
    assert_eq!(tent.review_count, Some(1204));
    assert_eq!(tent.rating, Some(4.7));
    assert_eq!(tent.image_url, "https://search.shopping.example.com/img/8802.jpg");
    assert_eq!(tent.mall_name, "캠핑마트");
    assert_eq!(tent.category, "캠핑");

    let tarp = items[2];
    assert_eq!(tarp.price, 0);
    assert_eq!(tarp.delivery_fee, Some(0));
    assert!(tarp.product_id.starts_with('h'));
}

#[test]
fn test_category_payload_fixture_groups_products() {
    let engine = ExtractionEngine::default();
    let report = engine.extract(
        SourceFamily::CategoryBest,
        CATEGORY_BEST_PAYLOAD,
        "https://shopping.example.com/best/category",
        "",
    );

    assert_eq!(report.strategy.as_deref(), Some("script-payload"));
    let groups: Vec<_> = report
        .records
        .iter()
        .filter_map(|r| match r {
            NormalizedRecord::CategoryGroup(g) => Some(g),
            _ => None,
        })
        .collect();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].category_name, "패션의류");
    assert_eq!(groups[0].product_count, 2);
    assert_eq!(groups[0].products[1].price, 35900);
    assert_eq!(groups[1].products[0].product_id, "7101");
}

#[test]
fn test_text_only_ranking_falls_through_to_regex() {
    let engine = ExtractionEngine::default();
    let report = engine.extract(
        SourceFamily::KeywordRanking,
        KEYWORD_RANKING_TEXT,
        "https://datalab.example.com/shoppingInsight",
        "생활",
    );

    assert_eq!(report.strategy.as_deref(), Some("regex-fallback"));
    let names: Vec<&str> = report
        .attempts
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["hashed-class", "exact-class", "script-payload", "generic-container", "regex-fallback"]
    );

    // 提取结果保持文档顺序，排序由编排器完成
    let trends: Vec<Trend> = report
        .records
        .iter()
        .filter_map(|r| match r {
            NormalizedRecord::RankedKeyword(k) => Some(k.trend),
            _ => None,
        })
        .collect();
    assert_eq!(trends, vec![Trend::Stable, Trend::Down, Trend::Up]);
}

#[test]
fn test_garbage_input_yields_empty_reports() {
    let engine = ExtractionEngine::default();
    for family in [SourceFamily::Listing, SourceFamily::KeywordRanking, SourceFamily::CategoryBest] {
        let report = engine.extract(family, "<<<>>> \u{0} <div <span", "not a url", "");
        assert!(report.records.is_empty());
        assert_eq!(report.strategy, None);
    }
}

#[test]
fn test_blocked_fixture_is_detected_and_signals_collected() {
    assert!(detect_block("보안 확인을 완료해 주세요", "보안 확인").is_some());
    assert!(detect_block("돔 텐트 4인용 129,000원", "텐트 : 쇼핑 검색").is_none());
    assert!(!BLOCKED.is_empty());

    let signals = collect_signals(LISTING_HASHED);
    assert!(signals.data_test_ids.contains(&"SEARCH_PRODUCT".to_string()));
    assert!(signals.class_candidates.contains(&"product_item".to_string()));
    assert!(signals
        .shopping_links
        .iter()
        .any(|l| l.contains("/products/8802")));
}
