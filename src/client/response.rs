//! Response body parsing and failure normalization

use crate::types::PaymentIntent;
use crate::PaymentError;
use reqwest::Response;
use serde_json::Value;

/// Object holding the payload: the nested `data` object when present, else the body
fn payload(body: &Value) -> &Value {
    match body.get("data") {
        Some(data) if data.is_object() => data,
        _ => body,
    }
}

/// First string field found under any of `names`, looking in `data` before the top level
fn string_field<'a>(body: &'a Value, names: &[&str]) -> Option<&'a str> {
    let nested = body.get("data").filter(|d| d.is_object());
    nested
        .into_iter()
        .chain(std::iter::once(body))
        .find_map(|obj| names.iter().find_map(|name| obj.get(*name)?.as_str()))
}

/// Raw status string; `data.status` wins over a top-level `status`
pub(crate) fn extract_status(body: &Value) -> Option<&str> {
    body.get("data")
        .and_then(|data| data.get("status"))
        .and_then(Value::as_str)
        .or_else(|| body.get("status").and_then(Value::as_str))
}

/// Payment intent record in the body, if one parses
pub(crate) fn extract_payment(body: &Value) -> Option<PaymentIntent> {
    let candidate = payload(body);
    let candidate = candidate
        .get("payment")
        .filter(|p| p.is_object())
        .unwrap_or(candidate);
    serde_json::from_value(candidate.clone()).ok()
}

/// Redirect URL for hosted checkout pages
pub(crate) fn extract_redirect_url(body: &Value) -> Option<String> {
    string_field(body, &["redirectUrl", "redirect_url", "checkoutUrl"]).map(str::to_string)
}

/// QR code URL
pub(crate) fn extract_qr_url(body: &Value) -> Option<String> {
    string_field(body, &["qrCodeUrl", "qr_code_url", "qrUrl", "url"])
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

/// Whether a 2xx cancel answer says the payment was already terminal
pub(crate) fn is_already_cancelled(body: &Value) -> bool {
    let flagged = |obj: &Value| {
        ["alreadyCancelled", "already_cancelled"]
            .iter()
            .any(|name| obj.get(*name).and_then(Value::as_bool).unwrap_or(false))
    };
    if flagged(body) || flagged(payload(body)) {
        return true;
    }
    matches!(
        string_field(body, &["code"]),
        Some("already_cancelled" | "ALREADY_CANCELLED" | "already_terminal")
    )
}

/// Server-provided error message: `message` first, then a string `error`
pub(crate) fn server_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .or_else(|| body.get("error").and_then(Value::as_str))
        .or_else(|| {
            body.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
        })
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

/// Parse a body that may be empty
pub(crate) fn parse_body(text: &str) -> Result<Value, PaymentError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(text)?)
}

/// Parse a 2xx body that may not be JSON at all; plain text acks are kept as strings
pub(crate) fn parse_body_lenient(text: String) -> Value {
    match parse_body(&text) {
        Ok(value) => value,
        Err(_) => Value::String(text),
    }
}

/// Normalize a failure that never produced an HTTP response
pub(crate) fn transport_failure(error: reqwest::Error, fallback: &str) -> PaymentError {
    let message = error.to_string();
    let message = if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    };
    PaymentError::transport(message, error.status().map(|s| s.as_u16()))
}

/// Normalize a non-2xx response
pub(crate) async fn response_failure(response: Response, fallback: &str) -> PaymentError {
    let status = response.status();
    let message = match response.text().await {
        Ok(text) => serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|body| server_message(&body)),
        Err(_) => None,
    };
    PaymentError::transport(
        message.unwrap_or_else(|| format!("{} (status {})", fallback, status.as_u16())),
        Some(status.as_u16()),
    )
}
