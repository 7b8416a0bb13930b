// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod capture_pipeline_test;
pub mod extraction_fixtures_test;
pub mod helpers;
