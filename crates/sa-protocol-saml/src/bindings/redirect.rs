//! HTTP-Redirect Binding.
//!
//! Messages are compressed with raw DEFLATE (no zlib header) before base64.

use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::{SamlError, SamlResult};
use crate::types::params;

use super::{compact_base64, select_message, DecodedMessage, SamlMessageType};

/// Largest inflated message accepted from a redirect query.
pub const MAX_INFLATED_BYTES: u64 = 1024 * 1024;

/// HTTP-Redirect binding encoder/decoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Encodes a SAML request into a redirect URL for `destination`.
    pub fn encode_request(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
    ) -> SamlResult<String> {
        let compressed = deflate_compress(xml.as_bytes())?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(compressed);

        let separator = if destination.contains('?') { '&' } else { '?' };
        let mut url = format!(
            "{}{}{}={}",
            destination,
            separator,
            SamlMessageType::Request.form_param(),
            urlencoding::encode(&encoded)
        );

        if let Some(rs) = relay_state {
            url.push_str(&format!(
                "&{}={}",
                params::RELAY_STATE,
                urlencoding::encode(rs)
            ));
        }

        Ok(url)
    }

    /// Decodes a SAML message from redirect query values.
    ///
    /// Query values are expected to be URL-decoded already.
    pub fn decode(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
    ) -> SamlResult<DecodedMessage> {
        let (encoded, message_type) = select_message(saml_request, saml_response)?;

        let compressed =
            base64::engine::general_purpose::STANDARD.decode(compact_base64(encoded))?;
        let xml_bytes = deflate_decompress(&compressed)?;

        let xml = String::from_utf8(xml_bytes)
            .map_err(|e| SamlError::InvalidRequest(format!("invalid UTF-8 in message: {e}")))?;

        Ok(DecodedMessage {
            xml,
            message_type,
            relay_state: relay_state.map(String::from),
        })
    }

    /// Decodes a message from a full redirect URL.
    pub fn decode_url(url: &str) -> SamlResult<DecodedMessage> {
        let parsed = url::Url::parse(url)
            .map_err(|e| SamlError::InvalidRequest(format!("invalid URL: {e}")))?;

        let mut saml_request = None;
        let mut saml_response = None;
        let mut relay_state = None;

        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                params::SAML_REQUEST => saml_request = Some(value.into_owned()),
                params::SAML_RESPONSE => saml_response = Some(value.into_owned()),
                params::RELAY_STATE => relay_state = Some(value.into_owned()),
                _ => {}
            }
        }

        Self::decode(
            saml_request.as_deref(),
            saml_response.as_deref(),
            relay_state.as_deref(),
        )
    }
}

/// Compresses data using raw DEFLATE.
fn deflate_compress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SamlError::Deflate(format!("compression error: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SamlError::Deflate(format!("compression finish error: {e}")))
}

/// Decompresses raw DEFLATE data, refusing output beyond [`MAX_INFLATED_BYTES`].
fn deflate_decompress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data).take(MAX_INFLATED_BYTES + 1);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| SamlError::Deflate(format!("decompression error: {e}")))?;
    if decompressed.len() as u64 > MAX_INFLATED_BYTES {
        return Err(SamlError::Deflate(format!(
            "inflated message exceeds {MAX_INFLATED_BYTES} bytes"
        )));
    }
    Ok(decompressed)
}
