use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::GenAiError;

/// Largest decoded image accepted inline.
pub const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

/// A base64 image carried in a `data:<mime>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    mime_type: String,
    data: String,
}

impl InlineImage {
    pub fn parse_data_uri(uri: &str) -> Result<Self, GenAiError> {
        let rest = uri
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| GenAiError::InvalidInput("photo must be a data URI".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| GenAiError::InvalidInput("data URI has no payload".into()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| GenAiError::InvalidInput("data URI must be base64 encoded".into()))?;
        if !mime_type.starts_with("image/") {
            return Err(GenAiError::InvalidInput(format!(
                "unsupported media type {mime_type}"
            )));
        }
        let decoded = STANDARD
            .decode(payload)
            .map_err(|_| GenAiError::InvalidInput("data URI payload is not base64".into()))?;
        if decoded.is_empty() {
            return Err(GenAiError::InvalidInput("image is empty".into()));
        }
        if decoded.len() > MAX_IMAGE_BYTES {
            return Err(GenAiError::InvalidInput("image is too large".into()));
        }
        Ok(Self {
            mime_type: mime_type.to_string(),
            data: payload.to_string(),
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 payload, as sent to the model.
    pub fn data(&self) -> &str {
        &self.data
    }
}
