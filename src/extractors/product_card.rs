// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 商品卡片解析
//!
//! 列表页与分类最佳页共享的卡片模板与字段解析，以及内嵌数据中商品对象的转换。

use crate::domain::models::record::Product;
use crate::extractors::script_payload::{bool_field, f32_field, has_any, str_field, u64_field};
use crate::extractors::{dom, ExtractionError, PageDocument};
use crate::utils::text_processing::{
    collapse_whitespace, first_number, parse_discount_rate, parse_price, parse_rating,
};
use scraper::{ElementRef, Selector};
use serde_json::{Map, Value};

/// 商品名称的最小字符数
const MIN_NAME_CHARS: usize = 2;

/// 卡片上可能携带原生商品ID的属性
const ID_ATTRIBUTES: &[&str] = &["data-nv-mid", "data-product-id", "data-nvmid", "data-id"];

/// 商品卡片模板（CSS选择器文本）
///
/// 未提供的字段选择器为 `None`
#[derive(Debug, Clone)]
pub struct CardTemplate {
    pub card: String,
    pub name: String,
    pub link: Option<String>,
    pub price: Option<String>,
    pub original_price: Option<String>,
    pub discount: Option<String>,
    pub image: Option<String>,
    pub mall: Option<String>,
    pub delivery: Option<String>,
    pub review_count: Option<String>,
    pub rating: Option<String>,
    /// 广告卡片：没有店铺链接
    pub is_ad: bool,
}

/// 编译后的卡片模板
pub struct CompiledCard {
    pub card: Selector,
    name: Selector,
    link: Option<Selector>,
    price: Option<Selector>,
    original_price: Option<Selector>,
    discount: Option<Selector>,
    image: Option<Selector>,
    mall: Option<Selector>,
    delivery: Option<Selector>,
    review_count: Option<Selector>,
    rating: Option<Selector>,
    anchor: Selector,
    img: Selector,
    is_ad: bool,
}

fn compile_opt(css: &Option<String>) -> Result<Option<Selector>, ExtractionError> {
    css.as_deref().map(dom::selector).transpose()
}

impl CardTemplate {
    pub fn compile(&self) -> Result<CompiledCard, ExtractionError> {
        Ok(CompiledCard {
            card: dom::selector(&self.card)?,
            name: dom::selector(&self.name)?,
            link: compile_opt(&self.link)?,
            price: compile_opt(&self.price)?,
            original_price: compile_opt(&self.original_price)?,
            discount: compile_opt(&self.discount)?,
            image: compile_opt(&self.image)?,
            mall: compile_opt(&self.mall)?,
            delivery: compile_opt(&self.delivery)?,
            review_count: compile_opt(&self.review_count)?,
            rating: compile_opt(&self.rating)?,
            anchor: dom::selector("a[href]")?,
            img: dom::selector("img")?,
            is_ad: self.is_ad,
        })
    }

    /// 当前构建的自然搜索商品卡片（类名带哈希后缀）
    pub fn organic_hashed() -> Self {
        Self {
            card: dom::contains_class("product_item"),
            name: format!("{}, {}", dom::contains_class("product_title"), dom::contains_class("product_name")),
            link: Some(format!("{}, {} a", dom::contains_class("product_link"), dom::contains_class("product_title"))),
            price: Some(format!("{}, {}", dom::contains_class("price_num"), dom::contains_class("product_price"))),
            original_price: Some(dom::contains_class("price_del")),
            discount: Some(dom::contains_class("price_discount")),
            image: Some(format!("{} img", dom::contains_class("thumbnail_thumb"))),
            mall: Some(format!("{}, {}", dom::contains_class("product_mall"), dom::contains_class("mall_title"))),
            delivery: Some(dom::contains_class("price_delivery")),
            review_count: Some(dom::contains_class("product_num")),
            rating: Some(dom::contains_class("product_grade")),
            is_ad: false,
        }
    }

    /// 当前构建的广告商品卡片，字段较少且没有店铺链接
    pub fn ad_hashed() -> Self {
        Self {
            card: dom::contains_class("adProduct_item"),
            name: dom::contains_class("adProduct_title"),
            link: Some(format!("{}, {} a", dom::contains_class("adProduct_link"), dom::contains_class("adProduct_title"))),
            price: Some(format!("{} {}, {}", dom::contains_class("adProduct_price"), dom::contains_class("price_num"), dom::contains_class("adProduct_price"))),
            original_price: None,
            discount: None,
            image: Some(format!("{} img", dom::contains_class("adProduct_thumb"))),
            mall: Some(dom::contains_class("adProduct_mall")),
            delivery: None,
            review_count: None,
            rating: None,
            is_ad: true,
        }
    }

    /// 历史版本的自然搜索卡片（固定类名）
    pub fn organic_exact() -> Self {
        Self {
            card: "li.basicList_item, div.basicList_item".to_string(),
            name: ".basicList_title a, .basicList_title".to_string(),
            link: Some(".basicList_title a, a.basicList_link".to_string()),
            price: Some(".price_num".to_string()),
            original_price: Some(".price_del".to_string()),
            discount: Some(".price_discount".to_string()),
            image: Some(".thumbnail_thumb img".to_string()),
            mall: Some(".basicList_mall".to_string()),
            delivery: Some(".price_delivery".to_string()),
            review_count: Some(".basicList_num".to_string()),
            rating: Some(".basicList_star".to_string()),
            is_ad: false,
        }
    }

    /// 历史版本的广告卡片（固定类名）
    pub fn ad_exact() -> Self {
        Self {
            card: "li.ad_item, div.ad_item".to_string(),
            name: ".ad_title".to_string(),
            link: Some(".ad_title a, a.ad_link".to_string()),
            price: Some(".ad_price".to_string()),
            original_price: None,
            discount: None,
            image: Some(".ad_thumb img".to_string()),
            mall: Some(".ad_mall".to_string()),
            delivery: None,
            review_count: None,
            rating: None,
            is_ad: true,
        }
    }
}

/// 商品名称是否可用
pub fn is_plausible_name(name: &str) -> bool {
    let name = name.trim();
    name.chars().count() >= MIN_NAME_CHARS && name.chars().any(char::is_alphabetic)
}

impl CompiledCard {
    /// 解析文档或元素中所有匹配的卡片，名称不合格的卡片被丢弃
    pub fn parse_all(&self, scope: ElementRef<'_>, document: &PageDocument, category: &str) -> Vec<Product> {
        scope
            .select(&self.card)
            .filter_map(|card| self.parse(card, document, category))
            .collect()
    }

    /// 解析单个卡片
    pub fn parse(&self, card: ElementRef<'_>, document: &PageDocument, category: &str) -> Option<Product> {
        let name_el = dom::first(card, &self.name);
        let name = name_el
            .map(dom::own_text)
            .filter(|n| is_plausible_name(n))
            .or_else(|| {
                name_el
                    .and_then(|el| dom::attr(el, "title"))
                    .map(collapse_whitespace)
                    .filter(|n| is_plausible_name(n))
            })?;

        let link_el = self
            .link
            .as_ref()
            .and_then(|sel| dom::first(card, sel))
            .or_else(|| name_el.filter(|el| el.value().name() == "a"))
            .or_else(|| dom::first(card, &self.anchor));
        let product_url = link_el
            .and_then(|a| dom::attr(a, "href"))
            .map(|href| document.absolutize(href))
            .unwrap_or_default();

        let mut product = Product::new(name, product_url, category);
        if let Some(id) = ID_ATTRIBUTES
            .iter()
            .find_map(|a| dom::attr(card, a))
            .filter(|id| id.chars().all(|c| c.is_ascii_digit()))
        {
            product = product.with_native_id(id);
        }

        product.is_ad = self.is_ad;
        product.price = self
            .price
            .as_ref()
            .and_then(|sel| dom::full_text_in(card, sel))
            .map(|t| parse_price(&t))
            .unwrap_or(0);
        product.original_price = self
            .original_price
            .as_ref()
            .and_then(|sel| dom::full_text_in(card, sel))
            .and_then(|t| first_number(&t));
        product.discount_rate = self
            .discount
            .as_ref()
            .and_then(|sel| dom::full_text_in(card, sel))
            .and_then(|t| parse_discount_rate(&t));

        let image_el = self
            .image
            .as_ref()
            .and_then(|sel| dom::first(card, sel))
            .or_else(|| dom::first(card, &self.img));
        product.image_url = image_el
            .and_then(|img| {
                dom::attr(img, "src")
                    .filter(|src| !src.starts_with("data:"))
                    .or_else(|| dom::attr(img, "data-src"))
            })
            .map(|src| document.absolutize(src))
            .unwrap_or_default();

        if let Some(mall_el) = self.mall.as_ref().and_then(|sel| dom::first(card, sel)) {
            product.mall_name = dom::own_text(mall_el);
            if product.mall_name.is_empty() {
                product.mall_name = dom::first(mall_el, &self.img)
                    .and_then(|img| dom::attr(img, "alt"))
                    .unwrap_or_default()
                    .to_string();
            }
            if !self.is_ad {
                let mall_link = if mall_el.value().name() == "a" {
                    Some(mall_el)
                } else {
                    dom::first(mall_el, &self.anchor)
                };
                product.mall_url = mall_link
                    .and_then(|a| dom::attr(a, "href"))
                    .map(|href| document.absolutize(href));
            }
        }

        product.delivery_fee = self
            .delivery
            .as_ref()
            .and_then(|sel| dom::full_text_in(card, sel))
            .map(|t| if t.contains("무료") { 0 } else { parse_price(&t) });
        product.review_count = self
            .review_count
            .as_ref()
            .and_then(|sel| dom::full_text_in(card, sel))
            .and_then(|t| first_number(&t));
        product.rating = self
            .rating
            .as_ref()
            .and_then(|sel| dom::full_text_in(card, sel))
            .and_then(|t| parse_rating(&t));

        Some(product)
    }
}

/// 商品对象的名称键
pub const PRODUCT_NAME_KEYS: &[&str] = &["productName", "productTitle", "name", "title"];
/// 商品对象的价格键
pub const PRODUCT_PRICE_KEYS: &[&str] = &["price", "lowPrice", "salePrice", "mobileLowPrice"];

/// 内嵌数据中的对象是否像一个商品
pub fn looks_like_product(obj: &Map<String, Value>) -> bool {
    has_any(obj, PRODUCT_NAME_KEYS) && has_any(obj, PRODUCT_PRICE_KEYS)
}

/// 将内嵌数据中的商品对象转换为商品记录
///
/// 缺失字段使用显式默认值，名称不合格时返回 `None`
pub fn product_from_payload(obj: &Map<String, Value>, document: &PageDocument, category: &str) -> Option<Product> {
    let name = str_field(obj, PRODUCT_NAME_KEYS).filter(|n| is_plausible_name(n))?;
    let product_url = str_field(obj, &["productUrl", "mallProductUrl", "crUrl", "linkUrl", "url"])
        .map(|u| document.absolutize(&u))
        .unwrap_or_default();

    let item_category = str_field(obj, &["categoryName", "category1Name"]);
    let mut product = Product::new(
        collapse_whitespace(&name),
        product_url,
        item_category.as_deref().unwrap_or(category),
    );
    if let Some(id) = str_field(obj, &["productId", "nvMid", "id", "catalogId"]) {
        product = product.with_native_id(&id);
    }

    product.price = u64_field(obj, PRODUCT_PRICE_KEYS).unwrap_or(0);
    product.original_price = u64_field(obj, &["originalPrice", "originPrice", "listPrice"]);
    product.discount_rate = u64_field(obj, &["discountRate", "discountRatio"]).map(|r| r.min(100) as u8);
    product.image_url = str_field(obj, &["imageUrl", "imgUrl", "image", "thumbnail"])
        .map(|u| document.absolutize(&u))
        .unwrap_or_default();
    product.mall_name = str_field(obj, &["mallName", "storeName", "sellerName"]).unwrap_or_default();
    product.is_ad = bool_field(obj, &["isAd", "ad"]).unwrap_or(false) || has_any(obj, &["adId", "adcrUrl"]);
    if !product.is_ad {
        product.mall_url = str_field(obj, &["mallUrl", "mallPcUrl", "storeUrl"]).map(|u| document.absolutize(&u));
    }
    product.delivery_fee = u64_field(obj, &["deliveryFee", "dlvryPrice", "shippingFee"]);
    product.review_count = u64_field(obj, &["reviewCount", "reviewCnt"]);
    product.rating = f32_field(obj, &["rating", "scoreInfo", "reviewScore"]);

    Some(product)
}
