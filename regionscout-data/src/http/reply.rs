//! Response bodies of the backend services.

use regionscout_core::PlaceResult;
use regionscout_core::backend::Estimate;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

/// FastAPI error body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Detail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Detail {
    Text(String),
    Items(Vec<DetailItem>),
    Other(Value),
}

/// One entry of a request validation failure.
#[derive(Debug, Deserialize)]
struct DetailItem {
    msg: String,
}

/// Estimator reply. The service answers `{"error": ...}` with a success
/// status when the estimate itself fails.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum EstimateReply {
    Failure { error: String },
    Estimate(Estimate),
}

/// Search reply; failures use the same `{"error": ...}` shape as the
/// estimator.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SearchReply {
    Failure { error: String },
    Places(Vec<PlaceResult>),
}

/// Human-readable message for a non-success response.
///
/// Prefers the `detail` field, joins validation messages, and falls back to
/// the raw body and then the status reason.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: Detail::Text(text),
        }) => text,
        Ok(ErrorBody {
            detail: Detail::Items(items),
        }) if !items.is_empty() => items
            .iter()
            .map(|item| item.msg.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        Ok(ErrorBody {
            detail: Detail::Other(value),
        }) => value.to_string(),
        _ => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_owned()
            } else {
                trimmed.to_owned()
            }
        }
    }
}
