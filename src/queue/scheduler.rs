// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::queue::work_queue::WorkQueue;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

/// 队列维护调度器
///
/// 定期把租约已过期的单元放回队列，使崩溃或卡住的工作器持有的单元能被重新投递。
pub struct QueueScheduler<Q: WorkQueue + 'static> {
    /// 工作队列
    queue: Arc<Q>,
    /// 维护间隔
    period: Duration,
}

impl<Q: WorkQueue + 'static> QueueScheduler<Q> {
    /// 创建新的调度器实例
    ///
    /// # 参数
    ///
    /// * `queue` - 工作队列
    /// * `period` - 维护间隔
    pub fn new(queue: Arc<Q>, period: Duration) -> Self {
        Self { queue, period }
    }

    /// 执行一次维护，返回被放回队列的单元数
    pub async fn tick(&self) -> u64 {
        match self.queue.release_expired_leases().await {
            Ok(count) => {
                if count > 0 {
                    info!("Released {} expired leases", count);
                }
                count
            }
            Err(e) => {
                error!("Failed to release expired leases: {}", e);
                0
            }
        }
    }

    /// 启动调度器后台任务
    ///
    /// # 返回值
    ///
    /// 返回后台任务的句柄
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.tick().await;
            }
        })
    }
}
