//! # Request Extraction Helpers
//!
//! JSON bodies and path identifiers are parsed here so handlers only see
//! typed values. Parse failures become [`AppError::BadRequest`].

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::AppError;

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result.map(|Json(v)| v).map_err(|err| {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::Validation("request body exceeds the document size limit".into())
        } else {
            AppError::BadRequest(err.body_text())
        }
    })
}

/// Parse a path segment with `FromStr`, naming `what` in the error.
pub fn parse_path<T>(raw: &str, what: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| AppError::BadRequest(format!("invalid {what} {raw:?}: {e}")))
}

/// Decode a base64 (standard alphabet, padded) document field.
pub fn decode_document(encoded: &str) -> Result<Vec<u8>, AppError> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::BadRequest(format!("document is not valid base64: {e}")))
}
