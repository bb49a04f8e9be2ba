// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::crawl_unit_repository::RepositoryError;
use crate::queue::result_buffer::BufferError;
use crate::queue::work_queue::QueueError;
use thiserror::Error;

/// Worker错误类型
///
/// 只在工作器自身的存储调用失败时出现，单元查询失败不会产生该错误。
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("队列错误: {0}")]
    QueueError(#[from] QueueError),

    #[error("仓库错误: {0}")]
    RepositoryError(#[from] RepositoryError),

    #[error("缓冲错误: {0}")]
    BufferError(#[from] BufferError),
}
