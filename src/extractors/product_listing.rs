// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 商品列表提取
//!
//! 广告卡片与自然搜索卡片的模板不同，分别解析后合并。

use crate::domain::models::record::Product;
use crate::extractors::cascade::{Cascade, ExtractionStrategy};
use crate::extractors::product_card::{is_plausible_name, looks_like_product, product_from_payload, CardTemplate};
use crate::extractors::script_payload::{find_object_array, find_payloads};
use crate::extractors::{dom, ExtractionError, PageDocument};
use crate::utils::text_processing::parse_price;
use regex::Regex;
use std::collections::HashSet;

/// 通用卡片启发式至少需要的卡片数
const MIN_GENERIC_CARDS: usize = 2;

const PRICE_PATTERN: &str = r"(\d{1,3}(,\d{3})+|\d+)\s*원|₩\s*\d";

/// 商品列表级联
pub fn cascade() -> Cascade<Product> {
    Cascade::new("listing")
        .with(ListingCards::hashed())
        .with(ListingCards::exact())
        .with(PayloadListing)
        .with(GenericCardListing)
}

/// 按商品ID去重，保留第一次出现
pub fn dedupe_products(products: Vec<Product>) -> Vec<Product> {
    let mut seen = HashSet::new();
    products
        .into_iter()
        .filter(|p| seen.insert(p.product_id.clone()))
        .collect()
}

/// 广告与自然搜索两套卡片模板
pub struct ListingCards {
    name: &'static str,
    ad: CardTemplate,
    organic: CardTemplate,
}

impl ListingCards {
    pub fn hashed() -> Self {
        Self {
            name: "hashed-class",
            ad: CardTemplate::ad_hashed(),
            organic: CardTemplate::organic_hashed(),
        }
    }

    pub fn exact() -> Self {
        Self {
            name: "exact-class",
            ad: CardTemplate::ad_exact(),
            organic: CardTemplate::organic_exact(),
        }
    }
}

impl ExtractionStrategy<Product> for ListingCards {
    fn name(&self) -> &'static str {
        self.name
    }

    fn try_extract(&self, document: &PageDocument) -> Result<Vec<Product>, ExtractionError> {
        let ad = self.ad.compile()?;
        let organic = self.organic.compile()?;
        let root = document.html().root_element();
        let category = document.category();

        let mut products = ad.parse_all(root, document, category);
        let ad_count = products.len();

        products.extend(
            root.select(&organic.card)
                .filter(|card| {
                    let class = card.value().attr("class").unwrap_or_default();
                    !class.contains("adProduct") && !class.contains("ad_item")
                })
                .filter_map(|card| organic.parse(card, document, category)),
        );

        tracing::debug!(
            "{} listing cards: {} ads, {} organic",
            self.name,
            ad_count,
            products.len() - ad_count
        );
        Ok(dedupe_products(products))
    }
}

/// 内嵌脚本数据中的商品数组
pub struct PayloadListing;

impl ExtractionStrategy<Product> for PayloadListing {
    fn name(&self) -> &'static str {
        "script-payload"
    }

    fn try_extract(&self, document: &PageDocument) -> Result<Vec<Product>, ExtractionError> {
        for payload in find_payloads(document)? {
            let Some(items) = find_object_array(&payload, looks_like_product) else {
                continue;
            };
            let products: Vec<Product> = items
                .into_iter()
                .filter_map(|obj| product_from_payload(obj, document, document.category()))
                .collect();
            if !products.is_empty() {
                return Ok(dedupe_products(products));
            }
        }
        Ok(Vec::new())
    }
}

/// 通用卡片启发式：同时包含链接、图片和价格文本的最内层元素
pub struct GenericCardListing;

impl ExtractionStrategy<Product> for GenericCardListing {
    fn name(&self) -> &'static str {
        "generic-card"
    }

    fn try_extract(&self, document: &PageDocument) -> Result<Vec<Product>, ExtractionError> {
        let products = generic_cards(document, document.category())?;
        if products.len() < MIN_GENERIC_CARDS {
            return Ok(Vec::new());
        }
        Ok(products)
    }
}

/// 按结构特征识别商品卡片，列表页与分类页的最后回退共用
pub fn generic_cards(document: &PageDocument, category: &str) -> Result<Vec<Product>, ExtractionError> {
    let blocks = dom::selector("li, article, div")?;
    let anchor = dom::selector("a[href]")?;
    let img = dom::selector("img")?;
    let price = Regex::new(PRICE_PATTERN)?;

    let qualifying: Vec<_> = document
        .html()
        .select(&blocks)
        .filter(|el| dom::first(*el, &anchor).is_some() && dom::first(*el, &img).is_some())
        .filter(|el| price.is_match(&dom::full_text(*el)))
        .collect();
    let ids: HashSet<_> = qualifying.iter().map(|el| el.id()).collect();

    let mut products = Vec::new();
    for card in &qualifying {
        // 只保留最内层的卡片
        let has_inner = card
            .descendants()
            .skip(1)
            .any(|node| ids.contains(&node.id()));
        if has_inner {
            continue;
        }

        let lines = dom::element_lines(*card);
        let image = dom::first(*card, &img);
        let link = dom::first(*card, &anchor);

        let name = image
            .and_then(|i| dom::attr(i, "alt"))
            .map(str::to_string)
            .filter(|n| is_plausible_name(n) && !price.is_match(n))
            .or_else(|| link.and_then(|a| dom::attr(a, "title")).map(str::to_string).filter(|n| is_plausible_name(n)))
            .or_else(|| {
                lines
                    .iter()
                    .find(|l| is_plausible_name(l) && !price.is_match(l))
                    .cloned()
            });
        let Some(name) = name else {
            continue;
        };

        let url = link
            .and_then(|a| dom::attr(a, "href"))
            .map(|href| document.absolutize(href))
            .unwrap_or_default();
        let mut product = Product::new(name, url, category);
        product.price = lines
            .iter()
            .find(|l| price.is_match(l))
            .map(|l| parse_price(l))
            .unwrap_or(0);
        product.image_url = image
            .and_then(|i| dom::attr(i, "src").or_else(|| dom::attr(i, "data-src")))
            .map(|src| document.absolutize(src))
            .unwrap_or_default();
        products.push(product);
    }

    Ok(dedupe_products(products))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> PageDocument {
        PageDocument::parse(html, "https://search.shopping.example.com/search/all?query=tent", "캠핑")
    }

    #[test]
    fn test_ad_and_organic_templates_parse_independently() {
        let html = r#"<div class="list">
          <div class="adProduct_item__1zC9h">
            <div class="adProduct_title__amInq"><a class="adProduct_link__NYTV9" href="https://adcr.example.com/adcr?x=1&nvMid=555">[광고] 원터치 텐트</a></div>
            <div class="adProduct_price__aJZSK"><span class="price_num__S2p_v">89,000원</span></div>
            <div class="adProduct_mall__zeZrd"><a href="https://smartstore.example.com/ad">광고몰</a></div>
          </div>
          <div class="product_item__MDtDF">
            <div class="product_title__Mmw2K"><a class="product_link__TrAac" href="https://smartstore.example.com/camp/products/777">돔 텐트 4인용</a></div>
            <span class="price_num__S2p_v">129,000원</span>
            <div class="product_mall_title__Xer1m"><a class="product_mall__hPiEM" href="https://smartstore.example.com/camp">캠핑마트</a></div>
          </div>
        </div>"#;
        let products = ListingCards::hashed().try_extract(&doc(html)).unwrap();

        assert_eq!(products.len(), 2);
        let ad = &products[0];
        assert!(ad.is_ad);
        assert_eq!(ad.product_id, "555");
        assert_eq!(ad.price, 89000);
        assert_eq!(ad.mall_name, "광고몰");
        assert_eq!(ad.mall_url, None);

        let organic = &products[1];
        assert!(!organic.is_ad);
        assert_eq!(organic.product_id, "777");
        assert_eq!(organic.category, "캠핑");
        assert_eq!(organic.mall_url.as_deref(), Some("https://smartstore.example.com/camp"));
    }

    #[test]
    fn test_payload_listing() {
        let html = r#"<script id="__NEXT_DATA__" type="application/json">{"props":{"pageProps":{"initialState":{"products":{"list":[
            {"item":{"productTitle":"접이식 캠핑 테이블","price":"45000","mallName":"아웃도어몰","crUrl":"https://shop.example.com/products/31","reviewCount":12}},
            {"item":{"productTitle":"캠핑 랜턴","price":19900,"adId":"ad-9","mallName":"라이트몰"}}
        ]}}}}}</script>"#;
        let products = PayloadListing.try_extract(&doc(html)).unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].product_id, "31");
        assert_eq!(products[0].price, 45000);
        assert_eq!(products[0].review_count, Some(12));
        assert!(products[1].is_ad);
    }

    #[test]
    fn test_generic_cards_pick_innermost_blocks() {
        let html = r#"<section><div class="grid">
            <div class="c"><a href="/p/1"><img src="/i/1.jpg" alt="스테인리스 냄비 세트"></a><p>39,800원</p></div>
            <div class="c"><a href="/p/2"><img src="/i/2.jpg" alt=""></a><p>무쇠 프라이팬</p><p>₩ 25,000</p></div>
            <div class="c"><a href="/p/3">링크만 있음</a><p>10,000원</p></div>
        </div></section>"#;
        let products = GenericCardListing.try_extract(&doc(html)).unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "스테인리스 냄비 세트");
        assert_eq!(products[0].price, 39800);
        assert_eq!(products[0].product_url, "https://search.shopping.example.com/p/1");
        assert_eq!(products[1].name, "무쇠 프라이팬");
        assert_eq!(products[1].price, 25000);
    }

    #[test]
    fn test_listing_cascade_unknown_page_is_empty() {
        let outcome = cascade().run(&doc("<html><body><h1>검색 결과가 없습니다</h1></body></html>"));
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.attempts.len(), 4);
    }
}
