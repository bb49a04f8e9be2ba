// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::use_cases::batch_use_case::BatchUseCase;
use crate::presentation::handlers::batch_handler;
use axum::{extract::Extension, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 创建应用路由
///
/// # 参数
///
/// * `use_case` - 批次分发用例
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes(use_case: Arc<BatchUseCase>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let batch_routes = Router::new()
        .route(
            "/v1/batches",
            get(batch_handler::list_batches).post(batch_handler::create_batch),
        )
        .route("/v1/batches/{id}", get(batch_handler::get_batch))
        .route("/v1/batches/{id}/units", get(batch_handler::list_batch_units))
        .route("/v1/batches/{id}/logs", get(batch_handler::list_batch_logs))
        .route("/v1/units/{id}", get(batch_handler::get_unit))
        .layer(Extension(use_case));

    Router::new()
        .merge(public_routes)
        .merge(batch_routes)
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
