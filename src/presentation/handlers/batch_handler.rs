// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    application::{
        dto::batch_request::{CreateBatchRequest, ListBatchesQuery},
        use_cases::batch_use_case::{BatchUseCase, BatchUseCaseError},
    },
    presentation::errors::AppError,
};

/// 创建新的批次
pub async fn create_batch(
    Extension(use_case): Extension<Arc<BatchUseCase>>,
    Json(payload): Json<CreateBatchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let batch = use_case.create_batch(payload).await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

/// 获取批次状态
pub async fn get_batch(
    Extension(use_case): Extension<Arc<BatchUseCase>>,
    Path(batch_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let batch = use_case.get_batch_status(batch_id).await?;
    Ok(Json(batch))
}

/// 列出最近的批次
pub async fn list_batches(
    Extension(use_case): Extension<Arc<BatchUseCase>>,
    Query(query): Query<ListBatchesQuery>,
) -> Result<impl IntoResponse, AppError> {
    query
        .validate()
        .map_err(|e| BatchUseCaseError::Validation(e.to_string()))?;
    let batches = use_case.list_batches(query.limit()).await?;
    Ok(Json(batches))
}

/// 列出批次下的单元状态
pub async fn list_batch_units(
    Extension(use_case): Extension<Arc<BatchUseCase>>,
    Path(batch_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let units = use_case.list_batch_units(batch_id).await?;
    Ok(Json(units))
}

/// 列出批次下的结果日志
pub async fn list_batch_logs(
    Extension(use_case): Extension<Arc<BatchUseCase>>,
    Path(batch_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let logs = use_case.list_batch_logs(batch_id).await?;
    Ok(Json(logs))
}

/// 获取单个单元状态
pub async fn get_unit(
    Extension(use_case): Extension<Arc<BatchUseCase>>,
    Path(unit_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let unit = use_case.get_unit_status(unit_id).await?;
    Ok(Json(unit))
}
