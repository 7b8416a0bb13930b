// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 分类最佳商品提取
//!
//! 页面按分类分组展示热销商品，每个分组产出一个 [`CategoryGroup`]。

use crate::domain::models::record::{CategoryGroup, Product};
use crate::extractors::cascade::{Cascade, ExtractionStrategy};
use crate::extractors::product_card::{looks_like_product, product_from_payload, CardTemplate};
use crate::extractors::product_listing::{dedupe_products, generic_cards};
use crate::extractors::script_payload::{array_field, find_object_array, find_payloads, str_field};
use crate::extractors::{dom, ExtractionError, PageDocument};
use crate::utils::url_utils::stable_hash;
use serde_json::{Map, Value};

const CATEGORY_ID_ATTRIBUTES: &[&str] = &["data-category-id", "data-cat-id", "data-id"];
const CATEGORY_NAME_KEYS: &[&str] = &["categoryName", "category", "name", "title"];
const CATEGORY_ID_KEYS: &[&str] = &["categoryId", "catId", "id"];
const GROUP_PRODUCT_KEYS: &[&str] = &["products", "productList", "items", "list"];

/// 通用卡片回退至少需要的商品数
const MIN_GENERIC_PRODUCTS: usize = 2;

/// 分类最佳级联
pub fn cascade() -> Cascade<CategoryGroup> {
    Cascade::new("category-best")
        .with(SectionGroups::hashed())
        .with(SectionGroups::exact())
        .with(PayloadGroups)
        .with(GenericGroup)
}

/// 分类ID：优先使用页面提供的ID，否则对分类名哈希
pub fn category_id_for(native: Option<&str>, name: &str) -> String {
    match native.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => format!("c{}", stable_hash(name)),
    }
}

/// 分组区块模板
pub struct SectionGroups {
    name: &'static str,
    section: String,
    title: String,
    item: CardTemplate,
    /// 区块内没有专用条目时改用的商品卡片
    fallback_card: Option<CardTemplate>,
}

impl SectionGroups {
    pub fn hashed() -> Self {
        Self {
            name: "hashed-class",
            section: dom::contains_class("categoryBest_section"),
            title: dom::contains_class("categoryBest_title"),
            item: CardTemplate {
                card: dom::contains_class("categoryBest_item"),
                name: format!("{}, {}", dom::contains_class("categoryBest_name"), dom::contains_class("product_title")),
                link: None,
                price: Some(format!("{}, {}", dom::contains_class("categoryBest_price"), dom::contains_class("price_num"))),
                original_price: None,
                discount: None,
                image: Some(format!("{} img", dom::contains_class("categoryBest_thumb"))),
                mall: Some(dom::contains_class("categoryBest_mall")),
                delivery: None,
                review_count: Some(dom::contains_class("categoryBest_review")),
                rating: None,
                is_ad: false,
            },
            fallback_card: Some(CardTemplate::organic_hashed()),
        }
    }

    pub fn exact() -> Self {
        Self {
            name: "exact-class",
            section: "div.best_category".to_string(),
            title: ".best_category_title".to_string(),
            item: CardTemplate {
                card: "li.best_item".to_string(),
                name: ".best_item_name".to_string(),
                link: None,
                price: Some(".best_item_price".to_string()),
                original_price: None,
                discount: None,
                image: None,
                mall: Some(".best_item_mall".to_string()),
                delivery: None,
                review_count: None,
                rating: None,
                is_ad: false,
            },
            fallback_card: None,
        }
    }
}

impl ExtractionStrategy<CategoryGroup> for SectionGroups {
    fn name(&self) -> &'static str {
        self.name
    }

    fn try_extract(&self, document: &PageDocument) -> Result<Vec<CategoryGroup>, ExtractionError> {
        let section = dom::selector(&self.section)?;
        let title = dom::selector(&self.title)?;
        let item = self.item.compile()?;
        let fallback = self.fallback_card.as_ref().map(CardTemplate::compile).transpose()?;

        let mut groups = Vec::new();
        for block in document.html().select(&section) {
            let name = dom::text_in(block, &title).unwrap_or_else(|| document.category().to_string());
            if name.is_empty() {
                continue;
            }

            let mut products = item.parse_all(block, document, &name);
            if products.is_empty() {
                if let Some(cards) = &fallback {
                    products = cards.parse_all(block, document, &name);
                }
            }
            if products.is_empty() {
                tracing::debug!("Category section '{}' has no parsable products", name);
                continue;
            }

            let native = CATEGORY_ID_ATTRIBUTES.iter().find_map(|a| dom::attr(block, a));
            groups.push(CategoryGroup::new(
                category_id_for(native, &name),
                name,
                dedupe_products(products),
            ));
        }
        Ok(groups)
    }
}

fn looks_like_group(obj: &Map<String, Value>) -> bool {
    str_field(obj, CATEGORY_NAME_KEYS).is_some()
        && array_field(obj, GROUP_PRODUCT_KEYS)
            .iter()
            .any(|p| looks_like_product(p))
}

/// 内嵌脚本数据：优先分组数组，否则把商品数组当作目标分类的单个分组
pub struct PayloadGroups;

impl ExtractionStrategy<CategoryGroup> for PayloadGroups {
    fn name(&self) -> &'static str {
        "script-payload"
    }

    fn try_extract(&self, document: &PageDocument) -> Result<Vec<CategoryGroup>, ExtractionError> {
        let payloads = find_payloads(document)?;

        for payload in &payloads {
            let Some(entries) = find_object_array(payload, looks_like_group) else {
                continue;
            };
            let groups: Vec<CategoryGroup> = entries
                .into_iter()
                .filter_map(|entry| group_from_payload(entry, document))
                .collect();
            if !groups.is_empty() {
                return Ok(groups);
            }
        }

        for payload in &payloads {
            let Some(items) = find_object_array(payload, looks_like_product) else {
                continue;
            };
            let category = document.category();
            let products: Vec<Product> = items
                .into_iter()
                .filter_map(|obj| product_from_payload(obj, document, category))
                .collect();
            if !products.is_empty() {
                return Ok(vec![CategoryGroup::new(
                    category_id_for(None, category),
                    category,
                    dedupe_products(products),
                )]);
            }
        }
        Ok(Vec::new())
    }
}

fn group_from_payload(entry: &Map<String, Value>, document: &PageDocument) -> Option<CategoryGroup> {
    let name = str_field(entry, CATEGORY_NAME_KEYS)?;
    let products: Vec<Product> = array_field(entry, GROUP_PRODUCT_KEYS)
        .into_iter()
        .filter(|p| looks_like_product(p))
        .filter_map(|p| product_from_payload(p, document, &name))
        .collect();
    if products.is_empty() {
        return None;
    }
    let native = str_field(entry, CATEGORY_ID_KEYS);
    Some(CategoryGroup::new(
        category_id_for(native.as_deref(), &name),
        name,
        dedupe_products(products),
    ))
}

/// 通用卡片启发式，全部商品归入目标分类
pub struct GenericGroup;

impl ExtractionStrategy<CategoryGroup> for GenericGroup {
    fn name(&self) -> &'static str {
        "generic-card"
    }

    fn try_extract(&self, document: &PageDocument) -> Result<Vec<CategoryGroup>, ExtractionError> {
        let category = document.category();
        let products = generic_cards(document, category)?;
        if products.len() < MIN_GENERIC_PRODUCTS {
            return Ok(Vec::new());
        }
        Ok(vec![CategoryGroup::new(category_id_for(None, category), category, products)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str, category: &str) -> PageDocument {
        PageDocument::parse(html, "https://shopping.example.com/best/category", category)
    }

    #[test]
    fn test_hashed_sections() {
        let html = r#"<main>
          <section class="categoryBest_section__x1Y2z" data-category-id="50000008">
            <h3 class="categoryBest_title__aa11">생활/건강</h3>
            <ul>
              <li class="categoryBest_item__Qw12"><a href="/products/101"><span class="categoryBest_name__9k">규조토 발매트</span></a><span class="categoryBest_price__p0">12,900원</span></li>
              <li class="categoryBest_item__Qw12"><a href="/products/102"><span class="categoryBest_name__9k">욕실 수납장</span></a><span class="categoryBest_price__p0">35,000원</span></li>
            </ul>
          </section>
          <section class="categoryBest_section__x1Y2z">
            <h3 class="categoryBest_title__aa11">디지털/가전</h3>
            <div class="product_item__MDtDF"><div class="product_title__Mmw2K"><a href="/products/201">무선 청소기</a></div><span class="price_num__S2p_v">199,000원</span></div>
          </section>
          <section class="categoryBest_section__x1Y2z"><h3 class="categoryBest_title__aa11">빈 분류</h3></section>
        </main>"#;
        let groups = SectionGroups::hashed().try_extract(&doc(html, "")).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category_id, "50000008");
        assert_eq!(groups[0].category_name, "생활/건강");
        assert_eq!(groups[0].product_count, 2);
        assert_eq!(groups[0].products[1].price, 35000);
        assert_eq!(groups[0].products[0].category, "생활/건강");
        assert_eq!(groups[0].products[0].product_id, "101");

        assert_eq!(groups[1].category_id, category_id_for(None, "디지털/가전"));
        assert_eq!(groups[1].products[0].name, "무선 청소기");
    }

    #[test]
    fn test_exact_sections() {
        let html = r#"<div class="best_category" data-cat-id="7">
            <strong class="best_category_title">식품</strong>
            <ul><li class="best_item"><a href="https://mall.example.com/products/9"><span class="best_item_name">제주 감귤 5kg</span></a>
                <span class="best_item_price">21,500원</span><span class="best_item_mall">제주농원</span></li></ul>
        </div>"#;
        let groups = SectionGroups::exact().try_extract(&doc(html, "")).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].category_id, "7");
        assert_eq!(groups[0].products[0].mall_name, "제주농원");
        assert_eq!(groups[0].products[0].price, 21500);
    }

    #[test]
    fn test_payload_groups() {
        let html = r#"<script>window.__PRELOADED_STATE__ = {"best":{"categories":[
            {"categoryId":"50000000","categoryName":"패션의류","products":[{"productName":"린넨 셔츠","price":29000,"productId":"77"}]},
            {"categoryName":"출산/육아","products":[{"productName":"아기 물티슈","price":"9,900"}]}
        ]}};</script>"#;
        let groups = PayloadGroups.try_extract(&doc(html, "전체")).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category_id, "50000000");
        assert_eq!(groups[0].products[0].product_id, "77");
        assert_eq!(groups[1].category_name, "출산/육아");
        assert!(groups[1].category_id.starts_with('c'));
        assert_eq!(groups[1].products[0].price, 9900);
        assert_eq!(groups[1].products[0].category, "출산/육아");
    }

    #[test]
    fn test_payload_product_array_becomes_single_group() {
        let html = r#"<script id="__NEXT_DATA__" type="application/json">{"props":{"items":[
            {"productName":"캠핑 의자","price":30000},{"productName":"캠핑 테이블","price":45000}
        ]}}</script>"#;
        let groups = PayloadGroups.try_extract(&doc(html, "스포츠/레저")).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].category_name, "스포츠/레저");
        assert_eq!(groups[0].product_count, 2);
    }

    #[test]
    fn test_cascade_falls_back_to_generic_cards() {
        let html = r#"<ul>
            <li><a href="/x/1"><img src="/a.jpg" alt="원목 도마"></a><span>15,000원</span></li>
            <li><a href="/x/2"><img src="/b.jpg" alt="주방 저울"></a><span>22,000원</span></li>
        </ul>"#;
        let outcome = cascade().run(&doc(html, "주방용품"));

        assert_eq!(outcome.strategy, Some("generic-card"));
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].category_name, "주방용품");
        assert_eq!(outcome.records[0].product_count, 2);
    }
}
