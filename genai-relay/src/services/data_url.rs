//! `data:` URL attachments sent by browser clients.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("expected a data: URL")]
    MissingScheme,

    #[error("data URL has no ',' separating header and payload")]
    MissingPayload,

    #[error("data URL has no MIME type")]
    MissingMimeType,

    #[error("only base64 data URLs are supported")]
    NotBase64,

    #[error("data URL payload is not valid base64: {0}")]
    InvalidBase64(String),
}

/// Binary attachment split out of a data URL. `data` stays base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAttachment {
    pub mime_type: String,
    pub data: String,
}

/// Parse `data:<mime>;base64,<payload>`.
pub fn parse_data_url(url: &str) -> Result<InlineAttachment, DataUrlError> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or(DataUrlError::MissingScheme)?;
    let (meta, payload) = rest.split_once(',').ok_or(DataUrlError::MissingPayload)?;

    let mut params = meta.split(';');
    let mime_type = params
        .next()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or(DataUrlError::MissingMimeType)?;
    if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err(DataUrlError::NotBase64);
    }

    let payload = payload.trim();
    if payload.is_empty() {
        return Err(DataUrlError::InvalidBase64("empty payload".to_string()));
    }
    BASE64
        .decode(payload.as_bytes())
        .map_err(|e| DataUrlError::InvalidBase64(e.to_string()))?;

    Ok(InlineAttachment {
        mime_type: mime_type.to_string(),
        data: payload.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_png() {
        let attachment = parse_data_url("data:image/png;base64,AAAA").unwrap();
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(attachment.data, "AAAA");
    }

    #[test]
    fn test_parse_keeps_extra_parameters_out_of_mime() {
        let attachment = parse_data_url("data:image/jpeg;name=cat.jpg;base64,/9j/").unwrap();
        assert_eq!(attachment.mime_type, "image/jpeg");
        assert_eq!(attachment.data, "/9j/");
    }

    #[test]
    fn test_rejects_malformed_urls() {
        assert_eq!(
            parse_data_url("https://example.com/cat.png"),
            Err(DataUrlError::MissingScheme)
        );
        assert_eq!(
            parse_data_url("data:image/png;base64"),
            Err(DataUrlError::MissingPayload)
        );
        assert_eq!(
            parse_data_url("data:;base64,AAAA"),
            Err(DataUrlError::MissingMimeType)
        );
        assert_eq!(
            parse_data_url("data:text/plain,hello"),
            Err(DataUrlError::NotBase64)
        );
        assert!(matches!(
            parse_data_url("data:image/png;base64,@@@"),
            Err(DataUrlError::InvalidBase64(_))
        ));
        assert!(matches!(
            parse_data_url("data:image/png;base64,"),
            Err(DataUrlError::InvalidBase64(_))
        ));
    }
}
