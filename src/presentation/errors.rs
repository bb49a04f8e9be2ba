// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::application::use_cases::batch_use_case::BatchUseCaseError;

/// 应用错误类型
///
/// 把用例错误映射为HTTP状态码和JSON错误体
#[derive(Debug)]
pub struct AppError(BatchUseCaseError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_message = self.0.to_string();

        let status = match &self.0 {
            BatchUseCaseError::Validation(_) => StatusCode::BAD_REQUEST,
            BatchUseCaseError::NotFound | BatchUseCaseError::UnitNotFound => StatusCode::NOT_FOUND,
            BatchUseCaseError::PartialEnqueue { .. }
            | BatchUseCaseError::EnqueueFailed { .. }
            | BatchUseCaseError::AbortFailed { .. }
            | BatchUseCaseError::Repository(_)
            | BatchUseCaseError::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match self.0.batch_id() {
            Some(batch_id) => Json(json!({ "error": error_message, "batch_id": batch_id })),
            None => Json(json!({ "error": error_message })),
        };
        (status, body).into_response()
    }
}

impl From<BatchUseCaseError> for AppError {
    fn from(err: BatchUseCaseError) -> Self {
        Self(err)
    }
}
