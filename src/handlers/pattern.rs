// src/handlers/pattern.rs

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::engine::CurriculumPattern;

/// Returns the curriculum table used to render section tabs and limits.
pub async fn get_pattern(State(pattern): State<Arc<CurriculumPattern>>) -> impl IntoResponse {
    Json(pattern.as_ref().clone())
}
