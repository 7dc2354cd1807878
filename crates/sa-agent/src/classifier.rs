//! Request classification.
//!
//! A request falls into exactly one [`FlowCategory`]. Rules are evaluated in
//! table order and the first match wins; a request matching no rule is
//! [`FlowCategory::PassThrough`].

use sa_core::RequestContext;

/// SAML request parameter (IdP-initiated logout).
pub const SAML_REQUEST_PARAM: &str = "SAMLRequest";

/// SAML response parameter.
pub const SAML_RESPONSE_PARAM: &str = "SAMLResponse";

/// OpenID response mode parameter.
pub const OPENID_MODE_PARAM: &str = "openid.mode";

/// The protocol flow a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowCategory {
    /// Path matches a skip pattern.
    Skip,
    /// IdP-initiated single logout.
    SloCallback,
    /// SAML response posted back by the IdP.
    SsoResponse,
    /// OpenID provider response.
    OpenIdResponse,
    /// User asked to log out.
    SloInitiate,
    /// User asked to log in with SAML.
    SsoInitiate,
    /// User asked to log in with OpenID.
    OpenIdInitiate,
    /// Silent re-authentication.
    PassiveAuthInitiate,
    /// Exchange the SAML assertion for an OAuth2 token.
    OAuth2GrantExchange,
    /// Not an authentication request.
    PassThrough,
}

impl FlowCategory {
    /// Returns the category name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::SloCallback => "slo_callback",
            Self::SsoResponse => "sso_response",
            Self::OpenIdResponse => "openid_response",
            Self::SloInitiate => "slo_initiate",
            Self::SsoInitiate => "sso_initiate",
            Self::OpenIdInitiate => "openid_initiate",
            Self::PassiveAuthInitiate => "passive_auth_initiate",
            Self::OAuth2GrantExchange => "oauth2_grant_exchange",
            Self::PassThrough => "pass_through",
        }
    }

    /// Returns whether a protocol failure in this category clears the
    /// logged-in session before it is returned.
    #[must_use]
    pub const fn clears_session_on_failure(&self) -> bool {
        matches!(self, Self::SsoResponse | Self::OpenIdResponse)
    }
}

impl std::fmt::Display for FlowCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classification rule predicate.
pub type Predicate = fn(&RequestContext) -> bool;

/// Classification rules in precedence order.
pub const RULES: &[(FlowCategory, Predicate)] = &[
    (FlowCategory::Skip, is_skipped),
    (FlowCategory::SloCallback, is_slo_callback),
    (FlowCategory::SsoResponse, is_sso_response),
    (FlowCategory::OpenIdResponse, is_openid_response),
    (FlowCategory::SloInitiate, is_slo_initiate),
    (FlowCategory::SsoInitiate, is_sso_initiate),
    (FlowCategory::OpenIdInitiate, is_openid_initiate),
    (FlowCategory::PassiveAuthInitiate, is_passive_auth_initiate),
    (FlowCategory::OAuth2GrantExchange, is_oauth2_grant_exchange),
];

/// Classifies a request.
#[must_use]
pub fn classify(ctx: &RequestContext) -> FlowCategory {
    RULES
        .iter()
        .find(|(_, matches)| matches(ctx))
        .map_or(FlowCategory::PassThrough, |(category, _)| *category)
}

fn is_skipped(ctx: &RequestContext) -> bool {
    ctx.config().skip_urls.matches(ctx.path())
}

fn is_slo_callback(ctx: &RequestContext) -> bool {
    ctx.config().saml2_enabled && ctx.has_param(SAML_REQUEST_PARAM)
}

fn is_sso_response(ctx: &RequestContext) -> bool {
    ctx.config().saml2_enabled && ctx.has_param(SAML_RESPONSE_PARAM)
}

fn is_openid_response(ctx: &RequestContext) -> bool {
    ctx.config().openid_enabled && ctx.has_param(OPENID_MODE_PARAM)
}

fn is_slo_initiate(ctx: &RequestContext) -> bool {
    let cfg = ctx.config();
    cfg.saml2_enabled && cfg.saml2.slo_enabled && ctx.path_ends_with(&cfg.saml2.slo_url)
}

fn is_sso_initiate(ctx: &RequestContext) -> bool {
    let cfg = ctx.config();
    cfg.saml2_enabled && ctx.path_ends_with(&cfg.saml2.sso_url)
}

fn is_openid_initiate(ctx: &RequestContext) -> bool {
    let cfg = ctx.config();
    cfg.openid_enabled && ctx.path_ends_with(&cfg.openid.login_url)
}

fn is_passive_auth_initiate(ctx: &RequestContext) -> bool {
    let cfg = ctx.config();
    cfg.saml2_enabled && ctx.path_ends_with(&cfg.saml2.passive_authn_url)
}

fn is_oauth2_grant_exchange(ctx: &RequestContext) -> bool {
    let cfg = ctx.config();
    cfg.saml2_enabled && cfg.oauth2_grant_enabled && ctx.path_ends_with(&cfg.oauth2.grant_url)
}
