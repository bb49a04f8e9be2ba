// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 工作队列（待查询的单元）与结果缓冲（待批量写入的结果），
/// 以及回收过期租约的维护调度器
pub mod result_buffer;
pub mod scheduler;
pub mod work_queue;
