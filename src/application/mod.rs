// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 批次分发入口：校验请求、创建批次记录并把单元放入工作队列
pub mod dto;
pub mod use_cases;
