use crate::case::api::{create_test_case, delete_test_case, get_test_case, list_test_cases, update_test_case};
use crate::config::AppConfig;
use crate::persistence::repo::Repository;
use crate::validation::FieldError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::{info, Level};

pub fn build_api(repository: Repository, config: &AppConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/health", get(health))
        .route("/testcases", get(list_test_cases).post(create_test_case))
        .route(
            "/testcases/:id",
            get(get_test_case).put(update_test_case).delete(delete_test_case),
        )
        .fallback(api_not_found)
        .with_state(repository);

    let mut router = Router::new().nest("/api", api);
    if let Some(dir) = config.frontend_dir.as_ref().filter(|dir| dir.is_dir()) {
        info!(frontend_dir = %dir.display(), "serving front-end bundle");
        router = router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    router
        .layer(cors)
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http()
            .make_span_with(
                DefaultMakeSpan::new().include_headers(true))
            .on_request(
                DefaultOnRequest::new()
                    .level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Micros)
            ))
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct HealthBody {
    pub status: String,
    pub message: String,
}

async fn health() -> ApiResponse<HealthBody> {
    ApiResponse::ok(HealthBody {
        status: "healthy".to_string(),
        message: "Test Case Management API is running".to_string(),
    })
}

async fn api_not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

pub struct ApiResponse<T> {
    pub status: StatusCode,
    pub body: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(body: T) -> Self {
        Self { status: StatusCode::OK, body }
    }

    pub fn created(body: T) -> Self {
        Self { status: StatusCode::CREATED, body }
    }

    pub fn from_option(result: Result<Option<T>, AppError>, what: &str) -> Result<ApiResponse<T>, AppError> {
        match result? {
            Some(body) => Ok(ApiResponse::ok(body)),
            None => Err(AppError::NotFound(format!("{} not found", what))),
        }
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(vec![FieldError::new("body", rejection.body_text())])
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(vec![FieldError::new("query", rejection.body_text())])
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, ErrorBody { message, errors: vec![] }),
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    message: "Validation failed".to_string(),
                    errors,
                },
            ),
            AppError::Store(err) => {
                tracing::error!("{}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        message: "Internal server error".to_string(),
                        errors: vec![],
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::model::{Priority, Status, TestCase};
    use crate::config::StoreConfig;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use http_body_util::BodyExt;
    use serde::de::DeserializeOwned;
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use tower::ServiceExt;

    fn test_config() -> AppConfig {
        AppConfig {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            store: StoreConfig {
                database_url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            frontend_dir: None,
        }
    }

    async fn test_router() -> Router {
        build_api(Repository::in_memory().await, &test_config())
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        router.clone().oneshot(request).await.unwrap()
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> T {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn login_payload() -> Value {
        json!({
            "feature_name": "Login",
            "title": "Valid credentials accepted",
            "steps": "1. Enter user/pass 2. Submit",
            "expected_result": "User redirected to dashboard",
            "priority": "High",
            "status": "Draft"
        })
    }

    #[tokio::test]
    async fn create_update_delete_scenario() {
        let router = test_router().await;

        let response = send(&router, Method::POST, "/api/testcases", Some(login_payload())).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: TestCase = read_json(response).await;
        assert_eq!(created.priority, Priority::High);
        assert_eq!(created.status, Status::Draft);
        assert_eq!(created.created_at, created.updated_at);

        let uri = format!("/api/testcases/{}", created.id);
        let response = send(&router, Method::GET, &uri, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let fetched: TestCase = read_json(response).await;
        assert_eq!(fetched, created);

        let response = send(&router, Method::PUT, &uri, Some(json!({ "status": "Ready" }))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated: TestCase = read_json(response).await;
        assert_eq!(updated.status, Status::Ready);
        assert_eq!(updated.title, created.title);
        assert!(updated.updated_at > created.updated_at);

        let response = send(&router, Method::DELETE, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&router, Method::GET, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&router, Method::DELETE, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_create_persists_nothing() {
        let router = test_router().await;
        let mut payload = login_payload();
        payload["title"] = json!("t".repeat(501));
        payload["feature_name"] = json!("");

        let response = send(&router, Method::POST, "/api/testcases", Some(payload)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: ErrorBody = read_json(response).await;
        let fields: Vec<&str> = body.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["feature_name", "title"]);

        let response = send(&router, Method::GET, "/api/testcases", None).await;
        let listed: Vec<TestCase> = read_json(response).await;
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn multi_megabyte_steps_are_accepted() {
        let router = test_router().await;
        let steps = "1. Click next\n".repeat(256 * 1024);
        let mut payload = login_payload();
        payload["steps"] = json!(steps);

        let response = send(&router, Method::POST, "/api/testcases", Some(payload)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: TestCase = read_json(response).await;
        assert_eq!(created.steps.len(), steps.len());

        let uri = format!("/api/testcases/{}", created.id);
        let longer = format!("{}{}", steps, steps);
        let response = send(&router, Method::PUT, &uri, Some(json!({ "expected_result": longer }))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated: TestCase = read_json(response).await;
        assert_eq!(updated.expected_result.len(), longer.len());
    }

    #[tokio::test]
    async fn unknown_enum_value_is_a_validation_error() {
        let router = test_router().await;
        let mut payload = login_payload();
        payload["priority"] = json!("Urgent");

        let response = send(&router, Method::POST, "/api/testcases", Some(payload)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = send(&router, Method::GET, "/api/testcases?priority=Urgent", None).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn failed_update_leaves_record_unchanged() {
        let router = test_router().await;
        let response = send(&router, Method::POST, "/api/testcases", Some(login_payload())).await;
        let created: TestCase = read_json(response).await;
        let uri = format!("/api/testcases/{}", created.id);

        let response = send(&router, Method::PUT, &uri, Some(json!({ "status": "Ready", "title": "" }))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = send(&router, Method::GET, &uri, None).await;
        let fetched: TestCase = read_json(response).await;
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn update_of_missing_id_is_not_found() {
        let router = test_router().await;
        let response = send(&router, Method::PUT, "/api/testcases/999", Some(json!({ "status": "Ready" }))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: ErrorBody = read_json(response).await;
        assert_eq!(body.message, "Test case not found");
    }

    #[tokio::test]
    async fn list_filters_by_query_parameters() {
        let router = test_router().await;
        send(&router, Method::POST, "/api/testcases", Some(login_payload())).await;
        let mut other = login_payload();
        other["feature_name"] = json!("Billing");
        other["title"] = json!("Invoice totals");
        other["status"] = json!("Ready");
        send(&router, Method::POST, "/api/testcases", Some(other)).await;

        let response = send(&router, Method::GET, "/api/testcases?priority=High&status=Ready", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let listed: Vec<TestCase> = read_json(response).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].feature_name, "Billing");

        let response = send(&router, Method::GET, "/api/testcases?search=LOGIN", None).await;
        let listed: Vec<TestCase> = read_json(response).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].feature_name, "Login");
    }

    #[tokio::test]
    async fn health_reports_running() {
        let router = test_router().await;
        let response = send(&router, Method::GET, "/api/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: HealthBody = read_json(response).await;
        assert_eq!(body.status, "healthy");
    }

    #[tokio::test]
    async fn unknown_api_path_is_json_not_found() {
        let router = test_router().await;
        let response = send(&router, Method::GET, "/api/unknown", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: ErrorBody = read_json(response).await;
        assert_eq!(body.message, "Not found");
    }
}
