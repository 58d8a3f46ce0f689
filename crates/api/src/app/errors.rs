use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{Value, json};
use tracing::error;

use stockroom_core::{DomainError, ErrorKind};
use stockroom_infra::StoreError;

pub type ApiResult<T> = Result<T, axum::response::Response>;

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::DuplicateName | ErrorKind::DuplicateSku => StatusCode::CONFLICT,
        ErrorKind::InsufficientStock => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    let kind = err.kind();
    let mut body = json!({
        "error": kind.as_str(),
        "message": err.to_string(),
    });

    match &err {
        StoreError::Domain(DomainError::NotFound { entity, id }) => {
            body["entity"] = Value::from(*entity);
            body["id"] = Value::from(id.as_str());
        }
        StoreError::Domain(DomainError::InvalidInput { field, .. }) => {
            body["field"] = Value::from(*field);
        }
        StoreError::Domain(DomainError::InsufficientStock {
            product_id,
            available,
            delta,
        }) => {
            body["id"] = Value::from(product_id.as_str());
            body["available"] = Value::from(*available);
            body["requested"] = Value::from(*delta);
        }
        StoreError::Backend(msg) => {
            error!(error = %msg, "storage failure");
            // Backend details stay in the logs.
            body["message"] = Value::from("storage backend failure");
        }
        _ => {}
    }

    (status_for(kind), axum::Json(body)).into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Unwrap a JSON body, answering malformed ones with the uniform error shape.
pub fn body<T>(payload: Result<axum::Json<T>, JsonRejection>) -> ApiResult<T> {
    payload.map(|axum::Json(v)| v).map_err(|e| {
        json_error(
            StatusCode::BAD_REQUEST,
            ErrorKind::InvalidInput.as_str(),
            e.body_text(),
        )
    })
}

pub fn query<T>(params: Result<axum::extract::Query<T>, QueryRejection>) -> ApiResult<T> {
    params.map(|axum::extract::Query(v)| v).map_err(|e| {
        json_error(
            StatusCode::BAD_REQUEST,
            ErrorKind::InvalidInput.as_str(),
            e.body_text(),
        )
    })
}

/// Parse a path id, answering malformed ones with `invalid_input` on `id`.
pub fn parse_id<T>(raw: &str) -> ApiResult<T>
where
    T: std::str::FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(|e| store_error_to_response(e.into()))
}
