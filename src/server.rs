use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Multipart, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{info, warn};
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::case::*;
use crate::error::FlowError;
use crate::impedance::{ImpedanceForm, convert_impedance};
use crate::parse::parse_case_str;
use crate::report::render_table;

/// Listener and presentation settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Pause before a computed result is returned. Zero disables it.
    pub result_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            result_delay: Duration::ZERO,
        }
    }
}

#[derive(Clone)]
struct AppState {
    last: Arc<Mutex<Option<Solution>>>,
    result_delay: Duration,
}

type JsonBody<T> = Result<axum::extract::Json<T>, JsonRejection>;

// Helper: respond with JSON
fn json_ok(val: serde_json::Value) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        val.to_string(),
    )
        .into_response()
}

fn json_err(status: StatusCode, msg: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        json!({"error": msg}).to_string(),
    )
        .into_response()
}

fn flow_err(err: FlowError) -> Response {
    warn!("Rejected calculation: {}", err);
    json_err(StatusCode::UNPROCESSABLE_ENTITY, &err.to_string())
}

fn to_json<T: serde::Serialize>(val: &T) -> serde_json::Value {
    serde_json::to_value(val).unwrap_or(json!(null))
}

// Solve, remember and answer with the solution
async fn solve_and_store(state: &AppState, case: Case) -> Response {
    let solution = match case.solve() {
        Ok(s) => s,
        Err(e) => return flow_err(e),
    };
    if !state.result_delay.is_zero() {
        tokio::time::sleep(state.result_delay).await;
    }
    *state.last.lock().await = Some(solution);
    json_ok(to_json(&solution))
}

// GET /api/defaults/two-bus
async fn default_two_bus() -> Response {
    json_ok(to_json(&TwoBusCase::default()))
}

// GET /api/defaults/three-bus
async fn default_three_bus() -> Response {
    json_ok(to_json(&ThreeBusCase::default()))
}

// POST /api/two-bus
async fn solve_two_bus(State(state): State<AppState>, body: JsonBody<TwoBusCase>) -> Response {
    match body {
        Ok(case) => solve_and_store(&state, Case::TwoBus(case.0)).await,
        Err(e) => json_err(StatusCode::BAD_REQUEST, &e.body_text()),
    }
}

// POST /api/three-bus
async fn solve_three_bus(State(state): State<AppState>, body: JsonBody<ThreeBusCase>) -> Response {
    match body {
        Ok(case) => solve_and_store(&state, Case::ThreeBus(case.0)).await,
        Err(e) => json_err(StatusCode::BAD_REQUEST, &e.body_text()),
    }
}

// POST /api/impedance  — rectangular <-> polar
async fn convert(body: JsonBody<ImpedanceForm>) -> Response {
    let form = match body {
        Ok(f) => f.0,
        Err(e) => return json_err(StatusCode::BAD_REQUEST, &e.body_text()),
    };
    match convert_impedance(form) {
        Ok(other) => json_ok(to_json(&other)),
        Err(e) => flow_err(e),
    }
}

// POST /api/upload  multipart/form-data with field "file"
async fn upload_case(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            let bytes = match field.bytes().await {
                Ok(b) => b,
                Err(_) => return json_err(StatusCode::BAD_REQUEST, "Failed to read file bytes"),
            };
            let content = String::from_utf8_lossy(&bytes);
            return match parse_case_str(&content) {
                Ok(case) => solve_and_store(&state, case).await,
                Err(e) => json_err(StatusCode::BAD_REQUEST, &e.to_string()),
            };
        }
    }
    json_err(StatusCode::BAD_REQUEST, "No 'file' field in multipart form")
}

// GET /api/solution
async fn get_solution(State(state): State<AppState>) -> Response {
    let guard = state.last.lock().await;
    match guard.as_ref() {
        Some(solution) => json_ok(to_json(solution)),
        None => json_err(StatusCode::NOT_FOUND, "No solution computed"),
    }
}

// GET /api/report  — last solution as a text table
async fn get_report(State(state): State<AppState>) -> Response {
    let guard = state.last.lock().await;
    match guard.as_ref() {
        Some(solution) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            render_table(solution),
        )
            .into_response(),
        None => json_err(StatusCode::NOT_FOUND, "No solution computed"),
    }
}

pub fn router(config: &ServerConfig) -> Router {
    let state = AppState {
        last: Arc::new(Mutex::new(None)),
        result_delay: config.result_delay,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/defaults/two-bus", get(default_two_bus))
        .route("/api/defaults/three-bus", get(default_three_bus))
        .route("/api/two-bus", post(solve_two_bus))
        .route("/api/three-bus", post(solve_three_bus))
        .route("/api/impedance", post(convert))
        .route("/api/upload", post(upload_case))
        .route("/api/solution", get(get_solution))
        .route("/api/report", get(get_report))
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let app = router(&config);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn call(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, String) {
        let mut req = Request::builder().method(method).uri(uri);
        if body.is_some() {
            req = req.header(header::CONTENT_TYPE, "application/json");
        }
        let req = req
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn app() -> Router {
        router(&ServerConfig::default())
    }

    const BOUNDARY: &str = "branchflow-boundary";

    async fn upload(app: &Router, field: &str, content: &str) -> (StatusCode, String) {
        let body = format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"case.case\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             {content}\r\n\
             --{b}--\r\n",
            b = BOUNDARY,
        );
        let req = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn defaults_are_served() {
        let app = app();
        let (status, body) = call(&app, "GET", "/api/defaults/three-bus", None).await;
        assert_eq!(status, StatusCode::OK);
        let case: ThreeBusCase = serde_json::from_str(&body).unwrap();
        assert_eq!(case, ThreeBusCase::default());
    }

    #[tokio::test]
    async fn two_bus_roundtrip_through_api() {
        let app = app();
        let body = serde_json::to_string(&TwoBusCase::default()).unwrap();
        let (status, text) = call(&app, "POST", "/api/two-bus", Some(&body)).await;
        assert_eq!(status, StatusCode::OK);

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["model"], "two_bus");
        let pij = value["flow"]["pij"].as_f64().unwrap();
        assert!((pij - (-25875.0 / 1625.0)).abs() < 1e-9);

        let (status, stored) = call(&app, "GET", "/api/solution", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stored, text);

        let (status, report) = call(&app, "GET", "/api/report", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(report.contains("-15.9230769231"));
    }

    #[tokio::test]
    async fn three_bus_is_solved() {
        let app = app();
        let body = serde_json::to_string(&ThreeBusCase::default()).unwrap();
        let (status, text) = call(&app, "POST", "/api/three-bus", Some(&body)).await;
        assert_eq!(status, StatusCode::OK);
        let solution: Solution = serde_json::from_str(&text).unwrap();
        assert!(matches!(solution, Solution::ThreeBus { .. }));
    }

    #[tokio::test]
    async fn zero_impedance_is_unprocessable() {
        let app = app();
        let mut case = TwoBusCase::default();
        case.z = crate::impedance::Impedance::from_rectangular(0.0, 0.0);
        let body = serde_json::to_string(&case).unwrap();
        let (status, text) = call(&app, "POST", "/api/two-bus", Some(&body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(text.contains("zero impedance"));

        let (status, _) = call(&app, "GET", "/api/solution", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let app = app();
        let (status, _) = call(&app, "POST", "/api/two-bus", Some(r#"{"vi": 1}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn impedance_conversion_endpoint() {
        let app = app();
        let (status, text) = call(
            &app,
            "POST",
            "/api/impedance",
            Some(r#"{"form":"rectangular","r":3.0,"x":4.0}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let form: ImpedanceForm = serde_json::from_str(&text).unwrap();
        match form {
            ImpedanceForm::Polar { magnitude, .. } => assert!((magnitude - 5.0).abs() < 1e-12),
            other => panic!("expected polar, got {:?}", other),
        }

        let (status, _) = call(
            &app,
            "POST",
            "/api/impedance",
            Some(r#"{"form":"polar","magnitude":-1.0,"angle_deg":0.0}"#),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn report_without_solution_is_not_found() {
        let app = app();
        let (status, _) = call(&app, "GET", "/api/report", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn uploaded_case_file_is_solved_and_stored() {
        let app = app();
        let (status, text) = upload(&app, "file", include_str!("../cases/two_bus.case")).await;
        assert_eq!(status, StatusCode::OK);
        let solution: Solution = serde_json::from_str(&text).unwrap();
        match solution {
            Solution::TwoBus { case, flow } => {
                assert_eq!(case, TwoBusCase::default());
                assert!((flow.pij - (-25875.0 / 1625.0)).abs() < 1e-9);
            }
            other => panic!("expected two-bus, got {:?}", other),
        }

        let (status, stored) = call(&app, "GET", "/api/solution", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stored, text);
    }

    #[tokio::test]
    async fn upload_without_file_field_is_bad_request() {
        let app = app();
        let (status, text) = upload(&app, "other", include_str!("../cases/two_bus.case")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(text.contains("No 'file' field"));

        let (status, _) = call(&app, "GET", "/api/solution", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unparsable_upload_is_bad_request() {
        let app = app();
        let (status, text) = upload(&app, "file", "Vi = abc\nVj = 1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(text.contains("line 1"));
    }

    #[tokio::test]
    async fn result_delay_holds_the_response() {
        let delay = Duration::from_millis(20);
        let app = router(&ServerConfig {
            result_delay: delay,
            ..ServerConfig::default()
        });
        let body = serde_json::to_string(&TwoBusCase::default()).unwrap();

        let started = std::time::Instant::now();
        let (status, _) = call(&app, "POST", "/api/two-bus", Some(&body)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(started.elapsed() >= delay);

        let (status, _) = call(&app, "GET", "/api/solution", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
