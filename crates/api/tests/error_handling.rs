//! Tests for `AppError` -> HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server or
//! database is needed.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use cms_api::error::AppError;
use cms_core::conflict::ConflictVerdict;
use cms_core::error::CoreError;
use cms_core::generation::{
    Compensation, CompensationOutcome, GenerationError, GenerationRun, GenerationStage,
};
use http_body_util::BodyExt;

/// Convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "Module",
        id: 42,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Module with id 42 not found");
}

#[tokio::test]
async fn unknown_module_returns_404() {
    let err = AppError::Core(CoreError::ModuleNotFound("promo".into()));
    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Module not found: promo");
}

#[tokio::test]
async fn generation_validation_names_the_field() {
    let err = AppError::Generation(GenerationError::validation("slug", "is required"));
    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["field"], "slug");
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn generation_conflict_returns_409_with_verdict() {
    let err = AppError::Generation(GenerationError::Conflict(ConflictVerdict::in_progress(
        "news",
    )));
    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "MODULE_CONFLICT");
    assert_eq!(json["verdict"]["accepted"], false);
    assert_eq!(json["verdict"]["kind"], "generation_in_progress");
    assert!(json["field"].is_null());
}

#[tokio::test]
async fn generation_fatal_returns_500_with_report() {
    let mut run = GenerationRun::new("news");
    run.complete(GenerationStage::ConflictChecked).unwrap();
    run.complete(GenerationStage::RecordCreated).unwrap();
    let rollback = vec![CompensationOutcome {
        compensation: Compensation::DropTable {
            table: "news".into(),
        },
        succeeded: false,
        error: Some("permission denied".into()),
    }];
    let err = AppError::Generation(GenerationError::Fatal(
        run.into_fatal("disk full", rollback),
    ));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "GENERATION_FAILED");
    assert_eq!(json["report"]["failed_stage"], "directory_created");
    assert_eq!(json["report"]["completed_stages"].as_array().unwrap().len(), 3);
    assert_eq!(json["leftovers"][0], "drop table 'news'");
}

#[tokio::test]
async fn field_validation_returns_422_with_errors() {
    let errors = BTreeMap::from([(
        "title".to_string(),
        vec!["is required".to_string()],
    )]);
    let (status, json) = error_to_response(AppError::FieldValidation(errors)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["errors"]["title"][0], "is required");
}

#[tokio::test]
async fn row_not_found_maps_to_404() {
    let (status, json) = error_to_response(AppError::Database(sqlx::Error::RowNotFound)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn bad_request_error_returns_400() {
    let err = AppError::BadRequest("invalid field value".into());
    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "invalid field value");
}

#[tokio::test]
async fn internal_error_returns_500_and_sanitizes_message() {
    let err = AppError::InternalError("secret database credentials leaked".into());
    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}
