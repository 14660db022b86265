use crate::error::AppError;
use crate::infra::{AppState, Services};
use application_tool::applicant::{
    AnswerData, ApplicantId, ReadOnlyApplicantProgram, StageOutcome,
};
use application_tool::definitions::{ProgramId, DEFAULT_LOCALE};
use application_tool::versions::{Version, VersionId};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Serialize)]
pub(crate) struct BlockSummary {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) is_optional: bool,
    pub(crate) is_complete: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionErrors {
    pub(crate) question_id: u64,
    pub(crate) errors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ApplicantProgramResponse {
    pub(crate) program_id: ProgramId,
    pub(crate) title: String,
    pub(crate) completion_percentage: u8,
    pub(crate) first_incomplete_block: Option<String>,
    pub(crate) active_blocks: Vec<BlockSummary>,
    pub(crate) summary: Vec<AnswerData>,
}

impl From<&ReadOnlyApplicantProgram> for ApplicantProgramResponse {
    fn from(view: &ReadOnlyApplicantProgram) -> Self {
        Self {
            program_id: view.program().id,
            title: view.program_title(DEFAULT_LOCALE).to_string(),
            completion_percentage: view.completion_percentage(),
            first_incomplete_block: view
                .get_first_incomplete_block()
                .map(|block| block.id().to_string()),
            active_blocks: view
                .get_all_active_blocks()
                .into_iter()
                .map(|block| BlockSummary {
                    id: block.id().to_string(),
                    name: block.name().to_string(),
                    is_optional: view.is_block_optional(block.id()),
                    is_complete: block.is_complete(),
                })
                .collect(),
            summary: view.get_summary_data(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StageResponse {
    pub(crate) committed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) errors: Vec<QuestionErrors>,
    #[serde(flatten)]
    pub(crate) program: ApplicantProgramResponse,
}

pub(crate) fn with_application_routes(services: Services) -> Router {
    Router::new()
        .route("/api/v1/admin/versions", get(list_versions))
        .route("/api/v1/admin/versions/publish", post(publish_draft))
        .route("/api/v1/admin/versions/:version_id/live", post(set_live))
        .route("/api/v1/applicants", post(create_applicant))
        .route(
            "/api/v1/applicants/:applicant_id/programs/:program_id",
            get(applicant_program),
        )
        .route(
            "/api/v1/applicants/:applicant_id/programs/:program_id/blocks/:block_id",
            post(stage_block),
        )
        .with_state(services)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Runs a service call on the blocking pool. Lifecycle calls hold a lock and may sleep
/// between retries, which must not stall the async workers.
async fn blocking<T, F>(call: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call).await?
}

pub(crate) async fn list_versions(
    State(services): State<Services>,
) -> Result<Json<Vec<Version>>, AppError> {
    let versions = blocking(move || Ok(services.versions.list_all_versions()?)).await?;
    Ok(Json(versions))
}

pub(crate) async fn publish_draft(
    State(services): State<Services>,
) -> Result<Json<Version>, AppError> {
    let active = blocking(move || {
        services.versions.publish()?;
        Ok(services.versions.get_active()?)
    })
    .await?;
    Ok(Json(active))
}

pub(crate) async fn set_live(
    State(services): State<Services>,
    Path(version_id): Path<u64>,
) -> Result<Json<Version>, AppError> {
    let active = blocking(move || {
        services.versions.set_live(VersionId(version_id))?;
        Ok(services.versions.get_active()?)
    })
    .await?;
    Ok(Json(active))
}

pub(crate) async fn create_applicant(
    State(services): State<Services>,
) -> Result<impl IntoResponse, AppError> {
    let applicant = blocking(move || Ok(services.applicants.create_applicant()?)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "applicant_id": applicant.id })),
    ))
}

pub(crate) async fn applicant_program(
    State(services): State<Services>,
    Path((applicant_id, program_id)): Path<(u64, u64)>,
) -> Result<Json<ApplicantProgramResponse>, AppError> {
    let view = blocking(move || {
        Ok(services
            .applicants
            .read_only_applicant_program(ApplicantId(applicant_id), ProgramId(program_id))?)
    })
    .await?;
    Ok(Json(ApplicantProgramResponse::from(&view)))
}

/// Accepts the raw form map for one block. Answers that fail validation come back with 422
/// and are not saved.
pub(crate) async fn stage_block(
    State(services): State<Services>,
    Path((applicant_id, program_id, block_id)): Path<(u64, u64, String)>,
    Json(updates): Json<BTreeMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let staged_block = block_id.clone();
    let outcome = blocking(move || {
        Ok(services.applicants.stage_and_update_if_valid(
            ApplicantId(applicant_id),
            ProgramId(program_id),
            &staged_block,
            &updates,
        )?)
    })
    .await?;

    let errors = outcome
        .view()
        .get_block(&block_id)
        .map(|block| {
            block
                .questions()
                .iter()
                .filter(|question| question.has_errors())
                .map(|question| QuestionErrors {
                    question_id: question.definition().id.0,
                    errors: question.errors().iter().map(ToString::to_string).collect(),
                })
                .collect()
        })
        .unwrap_or_default();
    let status = match &outcome {
        StageOutcome::Committed(_) => StatusCode::OK,
        StageOutcome::Preview(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    debug!(applicant_id, program_id, %block_id, %status, "staged block");

    let response = StageResponse {
        committed: outcome.is_committed(),
        errors,
        program: ApplicantProgramResponse::from(outcome.view()),
    };
    Ok((status, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::seed_sample_program;
    use application_tool::config::VersioningConfig;
    use axum::body::Body;
    use axum::http::Request;
    use axum::response::Response;
    use serde_json::Value;
    use tower::ServiceExt;

    fn services_with_program() -> (Services, ProgramId) {
        let services = Services::in_memory(VersioningConfig::default());
        let program = seed_sample_program(&services.versions).expect("sample program seeds");
        (services, program.id)
    }

    async fn read_json_body(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    async fn create_applicant_id(router: &Router) -> u64 {
        let response = router
            .clone()
            .oneshot(post_json("/api/v1/applicants", json!({})))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::CREATED);
        read_json_body(response).await["applicant_id"]
            .as_u64()
            .expect("numeric applicant id")
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let (services, _) = services_with_program();
        let response = with_application_routes(services)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn staging_a_valid_answer_reveals_conditional_blocks() {
        let (services, program_id) = services_with_program();
        let router = with_application_routes(services);
        let applicant_id = create_applicant_id(&router).await;

        let response = router
            .clone()
            .oneshot(post_json(
                &format!("/api/v1/applicants/{applicant_id}/programs/{program_id}/blocks/1"),
                json!({ "applicant.favorite_color.text": "blue" }),
            ))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json_body(response).await;
        assert_eq!(body["committed"], json!(true));
        let blocks: Vec<&str> = body["active_blocks"]
            .as_array()
            .expect("blocks listed")
            .iter()
            .filter_map(|block| block["id"].as_str())
            .collect();
        assert_eq!(blocks, vec!["1", "2", "4"]);

        let response = router
            .oneshot(
                Request::builder()
                    .uri(format!(
                        "/api/v1/applicants/{applicant_id}/programs/{program_id}"
                    ))
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json_body(response).await;
        assert_eq!(body["title"], json!("Household Support"));
        assert_eq!(body["first_incomplete_block"], json!("2"));
    }

    #[tokio::test]
    async fn invalid_answers_are_returned_unsaved() {
        let (services, program_id) = services_with_program();
        let router = with_application_routes(services);
        let applicant_id = create_applicant_id(&router).await;

        let response = router
            .oneshot(post_json(
                &format!("/api/v1/applicants/{applicant_id}/programs/{program_id}/blocks/2"),
                json!({
                    "applicant.household_members[0]": "Ann",
                    "applicant.household_members[1]": "Ann"
                }),
            ))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = read_json_body(response).await;
        assert_eq!(body["committed"], json!(false));
        assert_eq!(
            body["errors"][0]["errors"][0],
            json!("Please enter a unique value for each line.")
        );
    }

    #[tokio::test]
    async fn reserved_keys_are_bad_requests() {
        let (services, program_id) = services_with_program();
        let router = with_application_routes(services);
        let applicant_id = create_applicant_id(&router).await;

        let response = router
            .oneshot(post_json(
                &format!("/api/v1/applicants/{applicant_id}/programs/{program_id}/blocks/1"),
                json!({ "applicant.updated_at[]": "1" }),
            ))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_applicants_are_not_found() {
        let (services, program_id) = services_with_program();
        let response = with_application_routes(services)
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/applicants/404/programs/{program_id}"))
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_routes_manage_the_lifecycle() {
        let (services, _) = services_with_program();
        let router = with_application_routes(services);

        let response = router
            .clone()
            .oneshot(post_json("/api/v1/admin/versions/publish", json!({})))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = router
            .clone()
            .oneshot(post_json("/api/v1/admin/versions/1/live", json!({})))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json_body(response).await["id"], json!(1));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/admin/versions")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        let versions = read_json_body(response).await;
        let stages: Vec<&str> = versions
            .as_array()
            .expect("versions listed")
            .iter()
            .filter_map(|version| version["stage"].as_str())
            .collect();
        assert_eq!(stages, vec!["ACTIVE", "OBSOLETE"]);
    }
}
