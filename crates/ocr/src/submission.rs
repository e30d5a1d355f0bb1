use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

re!(re_data_url_prefix, r"^data:image/.+;base64,");

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("No image payload in request")]
    Missing,
    #[error("Image payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Decode an `image` field as sent by the camera page: a base64 string,
/// optionally prefixed with `data:image/<type>;base64,`.
///
/// ASCII whitespace inside the payload is ignored.
pub fn decode_data_url(payload: &str) -> Result<Vec<u8>, SubmissionError> {
    let body = re_data_url_prefix().replace(payload.trim(), "");
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(SubmissionError::Missing);
    }
    Ok(STANDARD.decode(compact.as_bytes())?)
}
