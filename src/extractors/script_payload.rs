// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 内嵌脚本数据解析
//!
//! 页面常把首屏数据以JSON形式注入 `<script>`，这里负责定位、解码，
//! 并提供把松散类型字段强制转换为确定类型的辅助函数。

use crate::extractors::{dom, ExtractionError, PageDocument};
use crate::utils::text_processing::first_number;
use serde_json::{Map, Value};

/// 以赋值形式注入数据的全局变量
const ASSIGNMENT_MARKERS: &[&str] = &[
    "window.__PRELOADED_STATE__",
    "window.__APOLLO_STATE__",
    "__APOLLO_STATE__",
    "window.__INITIAL_STATE__",
];

/// 递归搜索的最大深度
const MAX_DEPTH: usize = 24;

/// 解码页面中所有已知格式的内嵌数据
///
/// 没有内嵌数据时返回空列表；找到标记但JSON无法解码时返回错误
pub fn find_payloads(document: &PageDocument) -> Result<Vec<Value>, ExtractionError> {
    let scripts = dom::selector("script")?;
    let mut payloads = Vec::new();
    let mut last_error = None;

    for script in document.html().select(&scripts) {
        let body: String = script.text().collect();
        if dom::attr(script, "id") == Some("__NEXT_DATA__") {
            match serde_json::from_str::<Value>(body.trim()) {
                Ok(value) => payloads.push(value),
                Err(e) => last_error = Some(format!("__NEXT_DATA__: {}", e)),
            }
            continue;
        }

        for marker in ASSIGNMENT_MARKERS {
            let Some(pos) = body.find(marker) else {
                continue;
            };
            let rest = &body[pos + marker.len()..];
            match assigned_json(rest) {
                Some(json) => match serde_json::from_str::<Value>(json) {
                    Ok(value) => payloads.push(value),
                    Err(e) => last_error = Some(format!("{}: {}", marker, e)),
                },
                None => last_error = Some(format!("{}: no JSON object after assignment", marker)),
            }
            break;
        }
    }

    match (payloads.is_empty(), last_error) {
        (true, Some(error)) => Err(ExtractionError::Payload(error)),
        _ => Ok(payloads),
    }
}

/// 取出 `= {...}` 赋值右侧的完整JSON对象
fn assigned_json(rest: &str) -> Option<&str> {
    let after_eq = rest.trim_start().strip_prefix('=')?;
    let start = after_eq.find(|c: char| !c.is_whitespace())?;
    let candidate = &after_eq[start..];
    let end = balanced_end(candidate)?;
    Some(&candidate[..end])
}

/// 从 `{` 或 `[` 开始匹配到对应的闭合括号，跳过字符串内容
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    if !text.starts_with(['{', '[']) {
        return None;
    }

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// 在数据树中查找元素满足条件的对象数组，返回匹配元素最多的数组
///
/// 数组元素可以是对象本身，也可以是 `{ "item": {...} }` 包装
pub fn find_object_array<'a, F>(root: &'a Value, accept: F) -> Option<Vec<&'a Map<String, Value>>>
where
    F: Fn(&Map<String, Value>) -> bool,
{
    let mut best: Option<Vec<&'a Map<String, Value>>> = None;
    visit(root, &accept, 0, &mut best);
    best
}

fn visit<'a, F>(value: &'a Value, accept: &F, depth: usize, best: &mut Option<Vec<&'a Map<String, Value>>>)
where
    F: Fn(&Map<String, Value>) -> bool,
{
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::Array(items) => {
            let matched: Vec<&Map<String, Value>> = items
                .iter()
                .filter_map(unwrap_item)
                .filter(|obj| accept(obj))
                .collect();
            if !matched.is_empty() && best.as_ref().is_none_or(|b| matched.len() > b.len()) {
                *best = Some(matched);
            }
            for item in items {
                visit(item, accept, depth + 1, best);
            }
        }
        Value::Object(map) => {
            for child in map.values() {
                visit(child, accept, depth + 1, best);
            }
        }
        _ => {}
    }
}

fn unwrap_item(value: &Value) -> Option<&Map<String, Value>> {
    let obj = value.as_object()?;
    match obj.get("item").and_then(Value::as_object) {
        Some(inner) => Some(inner),
        None => Some(obj),
    }
}

/// 对象是否包含任一键
pub fn has_any(obj: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter().any(|k| obj.get(*k).is_some_and(|v| !v.is_null()))
}

/// 按键顺序读取字符串字段，数字也转为字符串
pub fn str_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// 按键顺序读取非负整数字段，字符串中的数字（含千位分隔符）也接受
pub fn u64_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => first_number(s),
        _ => None,
    })
}

pub fn f32_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<f32> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

pub fn bool_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "y" | "yes" | "1" => Some(true),
            "false" | "n" | "no" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        _ => None,
    })
}

/// 按键顺序读取对象数组字段
pub fn array_field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Vec<&'a Map<String, Value>> {
    keys.iter()
        .find_map(|k| obj.get(*k)?.as_array())
        .map(|items| items.iter().filter_map(unwrap_item).collect())
        .unwrap_or_default()
}
