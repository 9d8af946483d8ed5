use super::{ExtractError, ExtractResult};
use serde_json::Value;

/// Anti-JSON-hijacking prefix the analytics backend puts in front of every payload
const GUARD_PREFIX: &str = ")]}',";

/// Position of the version-by-active-users report among the batched responses
const RELEASE_RESPONSE_INDEX: usize = 2;

fn strip_guard(body: &str) -> &str {
    body.strip_prefix(GUARD_PREFIX).unwrap_or(body).trim_start()
}

/// Extract the dominant app version from an analytics data response.
///
/// Returns `Ok(None)` for well-formed responses that carry no release row,
/// the page issues several of those before the one we want.
pub fn parse(body: &[u8]) -> ExtractResult<Option<String>> {
    let text = String::from_utf8_lossy(body);
    let root: Value = serde_json::from_str(strip_guard(&text))?;

    let Some(first_row) = root
        .get("default")
        .and_then(|d| d.get("responses"))
        .and_then(Value::as_array)
        .and_then(|responses| responses.get(RELEASE_RESPONSE_INDEX))
        .and_then(|response| response.get("responseRows"))
        .and_then(Value::as_array)
        .and_then(|rows| rows.first())
    else {
        return Ok(None);
    };

    let Some(version) = first_row
        .get("dimensionCompoundValues")
        .and_then(Value::as_array)
        .and_then(|values| values.first())
    else {
        return Ok(None);
    };

    match version {
        Value::String(s) => Ok(Some(s.clone())),
        Value::Object(wrapper) => match wrapper.get("value") {
            Some(Value::String(s)) => Ok(Some(s.clone())),
            _ => Err(ExtractError::MissingField("dimensionCompoundValues[0].value")),
        },
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(ExtractError::InvalidValue {
            field: "dimensionCompoundValues[0]",
            value: other.to_string(),
        }),
    }
}
