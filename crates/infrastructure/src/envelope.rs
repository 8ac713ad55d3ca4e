//! Response envelope decoding shared by every endpoint.
//!
//! The backend wraps payloads as `{ "<resource>": [...] }` or
//! `{ "<resource>": {...} }`. A missing or `null` key means "nothing there";
//! only a present value of the wrong shape is an error.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tallyboard_core::{AppError, AppResult};
use tracing::warn;

const MAX_ERROR_BODY_CHARS: usize = 200;

fn list_items(body: Value, key: &str) -> AppResult<Vec<Value>> {
    match take_key(body, key) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(AppError::Decode(format!(
            "expected '{key}' to be an array, found {}",
            json_kind(&other)
        ))),
    }
}

/// Decodes a list payload item by item, treating an absent key as empty and
/// dropping items that fail to decode or convert.
pub fn decode_items<D, T, F>(body: Value, key: &str, convert: F) -> AppResult<Vec<T>>
where
    D: DeserializeOwned,
    F: Fn(D) -> AppResult<T>,
{
    let items = list_items(body, key)?;
    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .filter_map(|item| {
            let result = serde_json::from_value::<D>(item)
                .map_err(|error| AppError::Decode(error.to_string()))
                .and_then(&convert);
            match result {
                Ok(value) => Some(value),
                Err(error) => {
                    warn!(resource = key, error = %error, "dropping malformed item");
                    None
                }
            }
        })
        .collect();

    if decoded.len() < total {
        warn!(
            resource = key,
            dropped = total - decoded.len(),
            kept = decoded.len(),
            "some items could not be decoded"
        );
    }

    Ok(decoded)
}

/// Extracts an object payload, treating an absent key as the default value.
pub fn decode_object<T: DeserializeOwned + Default>(body: Value, key: &str) -> AppResult<T> {
    match take_key(body, key) {
        None => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(|error| {
            AppError::Decode(format!("invalid '{key}' payload: {error}"))
        }),
    }
}

/// Extracts a created or updated resource, accepting both enveloped and bare bodies.
pub fn decode_resource<T: DeserializeOwned>(body: Value, key: &str) -> AppResult<T> {
    let value = match body {
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Null) | None => Value::Object(map),
            Some(value) => value,
        },
        other => other,
    };

    serde_json::from_value(value)
        .map_err(|error| AppError::Decode(format!("invalid '{key}' payload: {error}")))
}

/// Maps a non-success HTTP status and response body to an application error.
#[must_use]
pub fn status_error(status: u16, body: &str) -> AppError {
    let message = error_message(body);
    match status {
        400 | 422 => AppError::Validation(message),
        401 => AppError::Unauthorized(message),
        403 => AppError::Forbidden(message),
        404 => AppError::NotFound(message),
        409 => AppError::Conflict(message),
        _ => AppError::UpstreamStatus { status, message },
    }
}

/// Parses a response body as JSON; an empty body is `null`.
pub fn parse_body(text: &str) -> AppResult<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(text)
        .map_err(|error| AppError::Decode(format!("response is not valid JSON: {error}")))
}

fn take_key(body: Value, key: &str) -> Option<Value> {
    match body {
        Value::Object(mut map) => map.remove(key).filter(|value| !value.is_null()),
        _ => None,
    }
}

fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["detail", "error", "message"]
            .iter()
            .find_map(|field| value.get(*field).and_then(Value::as_str).map(str::to_owned))
    });

    from_json.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "<empty response body>".to_owned()
        } else {
            trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
        }
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
