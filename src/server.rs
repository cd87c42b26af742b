use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::info;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::catalog::RawTimetable;
use crate::data::{Assignment, CourseId, Plan, Solution, WeekPattern, WeekSet};
use crate::error::PlanError;
use crate::solver::{self, SolverConfig};

/// Shared read-only state: the timetable is loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppState {
    timetable: Arc<RawTimetable>,
    config: SolverConfig,
}

impl AppState {
    pub fn new(timetable: RawTimetable, config: SolverConfig) -> Self {
        Self {
            timetable: Arc::new(timetable),
            config,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub courses: Vec<CourseId>,
    #[serde(default)]
    pub week_pattern: WeekPattern,
    pub max_solutions: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionView {
    #[serde(flatten)]
    pub solution: Solution,
    pub campus_days_odd_weeks: usize,
    pub campus_days_even_weeks: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResponse {
    pub assignment: Assignment,
    pub solutions: Vec<SolutionView>,
    pub rejected_rows: Vec<String>,
}

impl SolveResponse {
    fn new(plan: Plan, rejected_rows: Vec<String>) -> Self {
        let solutions = plan
            .solutions()
            .iter()
            .map(|solution| SolutionView {
                campus_days_odd_weeks: solution.campus_days_in(WeekSet::ODD),
                campus_days_even_weeks: solution.campus_days_in(WeekSet::EVEN),
                solution: solution.clone(),
            })
            .collect();
        Self {
            assignment: plan.assignment().clone(),
            solutions,
            rejected_rows,
        }
    }
}

fn status_for(error: &PlanError) -> StatusCode {
    match error {
        PlanError::NoCoursesSelected | PlanError::UnsatisfiableCourse { .. } => {
            StatusCode::BAD_REQUEST
        }
        PlanError::Infeasible { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PlanError::Solver(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn courses_handler(State(state): State<AppState>) -> Json<Vec<CourseId>> {
    Json(state.timetable.list_available_courses())
}

async fn solve_handler(
    State(state): State<AppState>,
    Json(request): Json<SolveRequest>,
) -> Result<Json<SolveResponse>, (StatusCode, String)> {
    // each request builds and solves its own model off the async workers
    tokio::task::spawn_blocking(move || solve_request(&state, &request))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map(Json)
}

fn solve_request(
    state: &AppState,
    request: &SolveRequest,
) -> Result<SolveResponse, (StatusCode, String)> {
    let load = state
        .timetable
        .load_catalog(&request.courses, request.week_pattern);

    let mut config = state.config.clone();
    if let Some(max_solutions) = request.max_solutions {
        config.max_solutions = max_solutions;
    }

    let plan = solver::plan(&load.catalog, &request.courses, &config)
        .map_err(|e| (status_for(&e), e.to_string()))?;
    let rejected_rows = load.rejected.iter().map(ToString::to_string).collect();
    Ok(SolveResponse::new(plan, rejected_rows))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/courses", get(courses_handler))
        .route("/v1/timetable/solve", post(solve_handler))
        .with_state(state)
}

pub async fn run_server(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn state() -> AppState {
        let timetable = json!({
            "lectures": [
                {"courseCode": "SC2079", "day": "Mon", "startTime": "09:00", "endTime": "10:00"}
            ],
            "indexes": [
                {"courseCode": "SC2079", "index": 1, "type": "TUT", "day": "Mon", "startTime": "09:00", "endTime": "10:00"},
                {"courseCode": "SC2104", "index": 2, "type": "LAB", "day": "Tue", "startTime": "14:00", "endTime": "16:00", "remark": "Teaching Wk1,3,5,7,9,11,13"},
                {"courseCode": "SC3103", "index": 3, "type": "TUT", "day": "Thu", "startTime": "10:00", "endTime": "11:00"}
            ]
        });
        let timetable: RawTimetable = serde_json::from_value(timetable).unwrap();
        AppState::new(timetable, SolverConfig::default())
    }

    async fn send(request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router(state()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn solve(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/timetable/solve")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn lists_courses() {
        let request = Request::builder().uri("/v1/courses").body(Body::empty()).unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        let courses: Vec<String> = serde_json::from_slice(&body).unwrap();
        assert_eq!(courses, vec!["SC2079", "SC2104", "SC3103"]);
    }

    #[tokio::test]
    async fn empty_selection_is_a_bad_request() {
        let (status, body) = send(solve(json!({"courses": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(String::from_utf8(body).unwrap(), "no courses selected");
    }

    #[tokio::test]
    async fn unknown_course_is_a_bad_request() {
        let (status, body) = send(solve(json!({"courses": ["XX0000"]}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(String::from_utf8(body).unwrap(), "course XX0000 has no index options");
    }

    #[tokio::test]
    async fn padded_course_codes_are_solved() {
        let (status, body) = send(solve(json!({"courses": [" SC3103 "]}))).await;
        assert_eq!(status, StatusCode::OK);
        let response: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(response["assignment"], json!({"SC3103": "3"}));
    }

    #[tokio::test]
    async fn infeasible_selection_carries_the_diagnosis() {
        let (status, body) = send(solve(json!({"courses": ["SC2079"]}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "Conflict: SC2079 lecture clashes with SC2079 TUT (Index 1)"
        );
    }

    #[tokio::test]
    async fn solves_and_reports_parity_campus_days() {
        let (status, body) = send(solve(json!({
            "courses": ["SC2104", "SC3103"],
            "weekPattern": "all",
            "maxSolutions": 3
        })))
        .await;
        assert_eq!(status, StatusCode::OK);

        let response: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(response["assignment"], json!({"SC2104": "2", "SC3103": "3"}));
        let solutions = response["solutions"].as_array().unwrap();
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0]["campusDayCount"], 2);
        assert_eq!(solutions[0]["campusDays"], json!(["Tue", "Thu"]));
        assert_eq!(solutions[0]["campusDaysOddWeeks"], 2);
        assert_eq!(solutions[0]["campusDaysEvenWeeks"], 1);
        assert_eq!(solutions[0]["status"], "optimal");
        assert_eq!(solutions[0]["sessions"][0]["type"], "LAB");
        assert_eq!(solutions[0]["sessions"][0]["weeks"], json!([1, 3, 5, 7, 9, 11, 13]));
    }
}
