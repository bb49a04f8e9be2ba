// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod aggregator_test;
pub mod dispatcher_test;
pub mod http_lookup_test;
pub mod pipeline_test;
