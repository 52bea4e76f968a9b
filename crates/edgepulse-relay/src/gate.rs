//! Decides whether a payload warrants an actuation.
//!
//! A payload is worth actuating on iff it decodes to a non-empty detection
//! list. Everything else (blank text, `null`, an empty array, malformed JSON)
//! is not. The functions here do no I/O and keep no state.

use edgepulse_core::MessageBody;

use crate::error::GateError;

/// Decode a payload into detections.
///
/// Blank payloads and `null` decode to an empty body.
///
/// # Errors
///
/// Returns [`GateError::Json`] if the text is not a detection list.
pub fn decode_body(text: &str) -> Result<MessageBody, GateError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(MessageBody::default());
    }

    let body: Option<MessageBody> = serde_json::from_str(trimmed)?;
    Ok(body.unwrap_or_default())
}

/// Like [`is_actuation_worthy`], but keeps the decode error for the caller
/// to report.
pub fn evaluate(text: &str) -> Result<bool, GateError> {
    decode_body(text).map(|body| !body.is_empty())
}

/// Whether `text` carries at least one detection.
///
/// # Examples
///
/// ```
/// use edgepulse_relay::gate::is_actuation_worthy;
///
/// let text = r#"[{"bbox":[0,0,10,10],"label":"person","confidence":"0.87","timestamp":"t1"}]"#;
/// assert!(is_actuation_worthy(text));
/// assert!(!is_actuation_worthy("[]"));
/// assert!(!is_actuation_worthy("not json"));
/// ```
pub fn is_actuation_worthy(text: &str) -> bool {
    evaluate(text).unwrap_or(false)
}
