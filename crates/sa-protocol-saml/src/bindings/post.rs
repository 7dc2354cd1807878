//! HTTP-POST Binding.

use base64::Engine;

use crate::error::{SamlError, SamlResult};
use crate::types::params;

use super::{compact_base64, select_message, DecodedMessage, SamlMessageType};

/// HTTP-POST binding encoder/decoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Encodes a SAML request as an HTML page that auto-submits to `destination`.
    #[must_use]
    pub fn encode_request(xml: &str, destination: &str, relay_state: Option<&str>) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(xml);

        let relay_state_input = relay_state
            .map(|rs| {
                format!(
                    r#"<input type="hidden" name="{}" value="{}"/>"#,
                    params::RELAY_STATE,
                    html_escape(rs)
                )
            })
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Redirecting to identity provider</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
        <input type="hidden" name="{}" value="{}"/>
        {}
        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            html_escape(destination),
            SamlMessageType::Request.form_param(),
            encoded,
            relay_state_input
        )
    }

    /// Decodes a SAML message from HTTP-POST form values.
    ///
    /// Form values are expected to be URL-decoded already.
    pub fn decode(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
    ) -> SamlResult<DecodedMessage> {
        let (encoded, message_type) = select_message(saml_request, saml_response)?;

        let decoded =
            base64::engine::general_purpose::STANDARD.decode(compact_base64(encoded))?;

        let xml = String::from_utf8(decoded)
            .map_err(|e| SamlError::InvalidRequest(format!("invalid UTF-8 in message: {e}")))?;

        Ok(DecodedMessage {
            xml,
            message_type,
            relay_state: relay_state.map(String::from),
        })
    }
}

/// Escapes HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
