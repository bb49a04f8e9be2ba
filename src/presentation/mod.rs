// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 表示层模块
///
/// 批次API的HTTP路由、处理器与错误映射
pub mod errors;
pub mod handlers;
pub mod routes;
