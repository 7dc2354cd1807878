//! OpenID 2.0 authentication messages.

use sa_core::RequestContext;
use url::Url;

use crate::error::{OpenIdError, OpenIdResult};

/// OpenID 2.0 namespace.
pub const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";

/// Identifier used when the user chooses their identity at the provider.
pub const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";

/// Prefix of every OpenID protocol parameter.
pub const PARAM_PREFIX: &str = "openid.";

/// Parameter carrying the message mode.
pub const MODE: &str = "openid.mode";

const AX_VALUE_PREFIX: &str = "openid.ax.value.";

/// A `checkid_setup` authentication request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckIdRequest {
    /// Identifier the user claims to own.
    pub claimed_id: String,
    /// URL the provider returns the user agent to.
    pub return_to: String,
    /// Trust root shown to the user; empty omits it.
    pub realm: String,
}

impl CheckIdRequest {
    /// Creates a request for `claimed_id`, falling back to identifier select.
    #[must_use]
    pub fn new(claimed_id: Option<&str>, return_to: impl Into<String>) -> Self {
        Self {
            claimed_id: claimed_id
                .filter(|id| !id.trim().is_empty())
                .map_or_else(|| IDENTIFIER_SELECT.to_string(), |id| id.trim().to_string()),
            return_to: return_to.into(),
            realm: String::new(),
        }
    }

    /// Sets the realm.
    #[must_use]
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    /// Builds the provider redirect URL.
    pub fn to_url(&self, provider_url: &str) -> OpenIdResult<String> {
        let mut url = Url::parse(provider_url)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("openid.ns", OPENID_NS)
                .append_pair(MODE, "checkid_setup")
                .append_pair("openid.claimed_id", &self.claimed_id)
                .append_pair("openid.identity", &self.claimed_id)
                .append_pair("openid.return_to", &self.return_to);
            if !self.realm.is_empty() {
                query.append_pair("openid.realm", &self.realm);
            }
        }
        Ok(url.into())
    }
}

/// An `id_res` positive assertion received on the return URL.
#[derive(Debug, Clone)]
pub struct PositiveAssertion {
    /// Verified identifier.
    pub claimed_id: String,
    /// Return URL the provider used.
    pub return_to: String,
    /// Provider endpoint that issued the assertion, if stated.
    pub op_endpoint: Option<String>,
    /// Every `openid.*` parameter, sent back for direct verification.
    pub fields: Vec<(String, String)>,
}

impl PositiveAssertion {
    /// Reads the assertion from the request parameters.
    pub fn from_context(ctx: &RequestContext) -> OpenIdResult<Self> {
        let required = |name: &str| {
            ctx.param(name)
                .map(String::from)
                .ok_or_else(|| OpenIdError::MissingParameter(name.to_string()))
        };

        let claimed_id = ctx
            .param("openid.claimed_id")
            .or_else(|| ctx.param("openid.identity"))
            .map(String::from)
            .ok_or_else(|| OpenIdError::MissingParameter("openid.claimed_id".to_string()))?;
        let return_to = required("openid.return_to")?;
        required("openid.sig")?;
        required("openid.signed")?;

        let mut fields: Vec<(String, String)> = ctx
            .params_with_prefix(PARAM_PREFIX)
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        fields.sort_unstable();

        Ok(Self {
            claimed_id,
            return_to,
            op_endpoint: ctx.param("openid.op_endpoint").map(String::from),
            fields,
        })
    }

    /// Returns the attribute exchange values as (alias, value) pairs.
    #[must_use]
    pub fn ax_attributes(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(AX_VALUE_PREFIX)
                    .map(|alias| (alias.to_string(), v.clone()))
            })
            .collect()
    }

    /// Checks that the assertion was addressed to `expected`.
    ///
    /// Query parameters the provider appended are ignored.
    pub fn check_return_to(&self, expected: &str) -> OpenIdResult<()> {
        let base = self
            .return_to
            .split_once('?')
            .map_or(self.return_to.as_str(), |(base, _)| base);
        let expected_base = expected.split_once('?').map_or(expected, |(base, _)| base);
        if base == expected_base {
            Ok(())
        } else {
            Err(OpenIdError::ReturnToMismatch {
                expected: expected.to_string(),
                actual: self.return_to.clone(),
            })
        }
    }
}
