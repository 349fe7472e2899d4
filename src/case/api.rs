use crate::api::{ApiResponse, AppError};
use crate::case::model::{CreateTestCasePayload, TestCase, TestCaseFilter, UpdateTestCasePayload};
use crate::persistence::repo::Repository;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

const TEST_CASE: &str = "Test case";

pub async fn create_test_case(
    State(repository): State<Repository>,
    payload: Result<Json<CreateTestCasePayload>, JsonRejection>,
) -> Result<ApiResponse<TestCase>, AppError> {
    let Json(payload) = payload?;
    let new_case = payload.validate().map_err(AppError::Validation)?;
    let test_case = repository.test_cases().create(new_case).await?;
    Ok(ApiResponse::created(test_case))
}

pub async fn list_test_cases(
    State(repository): State<Repository>,
    filter: Result<Query<TestCaseFilter>, QueryRejection>,
) -> Result<ApiResponse<Vec<TestCase>>, AppError> {
    let Query(filter) = filter?;
    let test_cases = repository.test_cases().list(filter).await?;
    Ok(ApiResponse::ok(test_cases))
}

pub async fn get_test_case(
    Path(id): Path<i64>,
    State(repository): State<Repository>,
) -> Result<ApiResponse<TestCase>, AppError> {
    let result = repository.test_cases().get(id).await.map_err(AppError::from);
    ApiResponse::from_option(result, TEST_CASE)
}

pub async fn update_test_case(
    Path(id): Path<i64>,
    State(repository): State<Repository>,
    payload: Result<Json<UpdateTestCasePayload>, JsonRejection>,
) -> Result<ApiResponse<TestCase>, AppError> {
    let Json(payload) = payload?;
    let changes = payload.validate().map_err(AppError::Validation)?;
    let result = repository.test_cases().update(id, changes).await.map_err(AppError::from);
    ApiResponse::from_option(result, TEST_CASE)
}

pub async fn delete_test_case(
    Path(id): Path<i64>,
    State(repository): State<Repository>,
) -> Result<StatusCode, AppError> {
    if repository.test_cases().delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("{} not found", TEST_CASE)))
    }
}
