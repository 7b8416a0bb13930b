// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 页面捕获模块
///
/// 浏览器后端抽象、捕获控制器、Chromium 实现以及反检测与拦截识别
pub mod block_detection;
pub mod capture_controller;
#[cfg(test)]
mod capture_controller_test;
pub mod chromium_backend;
pub mod signals;
pub mod stealth;
pub mod traits;
