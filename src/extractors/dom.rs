// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 提取器共享的DOM辅助函数

use crate::extractors::ExtractionError;
use crate::utils::text_processing::collapse_whitespace;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// 不参与文本提取的元素
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// 编译CSS选择器
pub fn selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::InvalidSelector {
        selector: css.to_string(),
        message: e.to_string(),
    })
}

/// 类名包含指定词干的选择器，容忍构建工具附加的哈希后缀
pub fn contains_class(stem: &str) -> String {
    format!("[class*='{}']", stem)
}

/// 元素自身的直接文本节点，不包含子元素的文本
pub fn direct_text(element: ElementRef<'_>) -> String {
    let raw: String = element
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(&**text),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ");
    collapse_whitespace(&raw)
}

/// 元素自身的文本；没有直接文本时取第一个带直接文本的后代
///
/// 只取一个文本来源，避免把相邻子标签拼接进同一字段
pub fn own_text(element: ElementRef<'_>) -> String {
    let direct = direct_text(element);
    if !direct.is_empty() {
        return direct;
    }
    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| !NON_CONTENT_TAGS.contains(&e.value().name()))
        .map(direct_text)
        .find(|t| !t.is_empty())
        .unwrap_or_default()
}

/// 元素全部文本（合并空白），用于价格等允许拼接的字段
pub fn full_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// 在元素内查找第一个匹配
pub fn first<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    element.select(selector).next()
}

/// 在元素内查找第一个匹配并取其文本
pub fn text_in(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    first(element, selector)
        .map(own_text)
        .filter(|t| !t.is_empty())
}

/// 在元素内查找第一个匹配并取其完整文本
pub fn full_text_in(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    first(element, selector)
        .map(full_text)
        .filter(|t| !t.is_empty())
}

/// 读取非空属性值
pub fn attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// 文档中所有可见文本节点，按文档顺序，每个节点一行
pub fn text_lines(document: &Html) -> Vec<String> {
    element_lines(document.root_element())
}

/// 元素内的可见文本节点，每个节点一行
pub fn element_lines(element: ElementRef<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    collect_lines(element, &mut lines);
    lines
}

fn collect_lines(element: ElementRef<'_>, lines: &mut Vec<String>) {
    if NON_CONTENT_TAGS.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let line = collapse_whitespace(text);
                if !line.is_empty() {
                    lines.push(line);
                }
            }
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_lines(child, lines);
                }
            }
            _ => {}
        }
    }
}
