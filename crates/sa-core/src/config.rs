//! Agent configuration.
//!
//! Configuration is created once at startup and shared read-only by every
//! request. It can be deserialized with serde or loaded from `SSO_AGENT_*`
//! environment variables.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, AgentResult};
use crate::protocol::HttpBinding;

/// Main configuration structure for the SSO agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Paths that bypass the agent entirely.
    pub skip_urls: SkipPatterns,
    /// Names used for session-bound authentication state.
    pub session_keys: SessionKeys,
    /// Enables SAML 2.0 SSO and SLO flows.
    pub saml2_enabled: bool,
    /// Enables OpenID 2.0 flows.
    pub openid_enabled: bool,
    /// Enables SAML2 bearer to OAuth2 token exchange.
    pub oauth2_grant_enabled: bool,
    /// SAML 2.0 settings.
    pub saml2: Saml2Config,
    /// OpenID 2.0 settings.
    pub openid: OpenIdConfig,
    /// OAuth2 grant settings.
    pub oauth2: OAuth2Config,
    /// Timeout for outbound HTTP calls made by collaborators, in seconds.
    pub http_timeout_secs: u64,
}

/// Session attribute names and the landing view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionKeys {
    /// Session attribute holding the logged-in session bean.
    pub logged_in: String,
    /// Landing view used after logout or session expiry.
    pub landing_url: String,
}

/// SAML 2.0 service provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Saml2Config {
    /// Entity ID of this service provider.
    pub sp_entity_id: String,
    /// Assertion consumer service URL.
    pub acs_url: String,
    /// Identity provider SSO/SLO endpoint.
    pub idp_url: String,
    /// Expected issuer of responses. Empty disables the issuer check.
    pub idp_entity_id: String,
    /// Path suffix that starts SSO.
    pub sso_url: String,
    /// Path suffix that starts single logout.
    pub slo_url: String,
    /// Enables single logout.
    pub slo_enabled: bool,
    /// Path suffix that starts passive re-authentication.
    pub passive_authn_url: String,
    /// Passive value used for ordinary SSO initiation.
    pub passive_authn: bool,
    /// Asks the IdP to re-authenticate the user.
    pub force_authn: bool,
    /// Binding used when the request does not choose one.
    pub http_binding: HttpBinding,
    /// Requested NameID format.
    pub name_id_format: Option<String>,
    /// Static RelayState sent with every request.
    pub relay_state: Option<String>,
}

/// OpenID 2.0 relying party settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenIdConfig {
    /// Path suffix that starts an OpenID login.
    pub login_url: String,
    /// Request parameter carrying the user-supplied claimed identifier.
    pub claimed_id_param: String,
    /// OP endpoint URL.
    pub provider_url: String,
    /// URL the OP returns the user agent to.
    pub return_to: String,
    /// Realm presented to the OP. Defaults to `return_to` when empty.
    pub realm: String,
}

/// SAML2 bearer grant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuth2Config {
    /// Path suffix that triggers the token exchange.
    pub grant_url: String,
    /// Authorization server token endpoint.
    pub token_endpoint: String,
    /// OAuth2 client ID.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Requested scope.
    pub scope: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            skip_urls: SkipPatterns::default(),
            session_keys: SessionKeys::default(),
            saml2_enabled: true,
            openid_enabled: false,
            oauth2_grant_enabled: false,
            saml2: Saml2Config::default(),
            openid: OpenIdConfig::default(),
            oauth2: OAuth2Config::default(),
            http_timeout_secs: 30,
        }
    }
}

impl Default for SessionKeys {
    fn default() -> Self {
        Self {
            logged_in: "sso_agent.logged_in_session".to_string(),
            landing_url: "/".to_string(),
        }
    }
}

impl Default for Saml2Config {
    fn default() -> Self {
        Self {
            sp_entity_id: String::new(),
            acs_url: String::new(),
            idp_url: String::new(),
            idp_entity_id: String::new(),
            sso_url: "/samlsso".to_string(),
            slo_url: "/logout".to_string(),
            slo_enabled: true,
            passive_authn_url: "/passiveauth".to_string(),
            passive_authn: false,
            force_authn: false,
            http_binding: HttpBinding::Redirect,
            name_id_format: None,
            relay_state: None,
        }
    }
}

impl Default for OpenIdConfig {
    fn default() -> Self {
        Self {
            login_url: "/openid".to_string(),
            claimed_id_param: "claimed_id".to_string(),
            provider_url: String::new(),
            return_to: String::new(),
            realm: String::new(),
        }
    }
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            grant_url: "/token".to_string(),
            token_endpoint: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            scope: None,
        }
    }
}

impl AgentConfig {
    /// Loads configuration from environment variables.
    ///
    /// A `.env` file is read first if present.
    pub fn from_env() -> AgentResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Keys are the `SSO_AGENT_*` environment variable names. Missing keys
    /// keep their default values.
    pub fn from_lookup<F>(lookup: F) -> AgentResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(default)
        };
        let text = |key: &str, default: String| lookup(key).unwrap_or(default);
        let optional = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let defaults = Self::default();

        let skip_urls = match lookup("SSO_AGENT_SKIP_URLS") {
            Some(list) => SkipPatterns::new(
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from),
            )?,
            None => defaults.skip_urls,
        };

        let http_binding = match lookup("SSO_AGENT_SAML2_HTTP_BINDING") {
            Some(value) => HttpBinding::parse(&value).ok_or_else(|| {
                AgentError::InvalidConfiguration(format!("unknown HTTP binding: {value}"))
            })?,
            None => defaults.saml2.http_binding,
        };

        let http_timeout_secs = match lookup("SSO_AGENT_HTTP_TIMEOUT_SECS") {
            Some(value) => value.trim().parse().map_err(|_| {
                AgentError::InvalidConfiguration(format!("invalid HTTP timeout: {value}"))
            })?,
            None => defaults.http_timeout_secs,
        };

        let config = Self {
            skip_urls,
            session_keys: SessionKeys {
                logged_in: text("SSO_AGENT_SESSION_KEY", defaults.session_keys.logged_in),
                landing_url: text("SSO_AGENT_LANDING_URL", defaults.session_keys.landing_url),
            },
            saml2_enabled: flag("SSO_AGENT_SAML2_ENABLED", defaults.saml2_enabled),
            openid_enabled: flag("SSO_AGENT_OPENID_ENABLED", defaults.openid_enabled),
            oauth2_grant_enabled: flag(
                "SSO_AGENT_OAUTH2_GRANT_ENABLED",
                defaults.oauth2_grant_enabled,
            ),
            saml2: Saml2Config {
                sp_entity_id: text("SSO_AGENT_SAML2_SP_ENTITY_ID", defaults.saml2.sp_entity_id),
                acs_url: text("SSO_AGENT_SAML2_ACS_URL", defaults.saml2.acs_url),
                idp_url: text("SSO_AGENT_SAML2_IDP_URL", defaults.saml2.idp_url),
                idp_entity_id: text(
                    "SSO_AGENT_SAML2_IDP_ENTITY_ID",
                    defaults.saml2.idp_entity_id,
                ),
                sso_url: text("SSO_AGENT_SAML2_SSO_URL", defaults.saml2.sso_url),
                slo_url: text("SSO_AGENT_SAML2_SLO_URL", defaults.saml2.slo_url),
                slo_enabled: flag("SSO_AGENT_SAML2_SLO_ENABLED", defaults.saml2.slo_enabled),
                passive_authn_url: text(
                    "SSO_AGENT_SAML2_PASSIVE_AUTHN_URL",
                    defaults.saml2.passive_authn_url,
                ),
                passive_authn: flag(
                    "SSO_AGENT_SAML2_PASSIVE_AUTHN",
                    defaults.saml2.passive_authn,
                ),
                force_authn: flag("SSO_AGENT_SAML2_FORCE_AUTHN", defaults.saml2.force_authn),
                http_binding,
                name_id_format: optional("SSO_AGENT_SAML2_NAME_ID_FORMAT"),
                relay_state: optional("SSO_AGENT_SAML2_RELAY_STATE"),
            },
            openid: OpenIdConfig {
                login_url: text("SSO_AGENT_OPENID_LOGIN_URL", defaults.openid.login_url),
                claimed_id_param: text(
                    "SSO_AGENT_OPENID_CLAIMED_ID_PARAM",
                    defaults.openid.claimed_id_param,
                ),
                provider_url: text("SSO_AGENT_OPENID_PROVIDER_URL", defaults.openid.provider_url),
                return_to: text("SSO_AGENT_OPENID_RETURN_TO", defaults.openid.return_to),
                realm: text("SSO_AGENT_OPENID_REALM", defaults.openid.realm),
            },
            oauth2: OAuth2Config {
                grant_url: text("SSO_AGENT_OAUTH2_GRANT_URL", defaults.oauth2.grant_url),
                token_endpoint: text(
                    "SSO_AGENT_OAUTH2_TOKEN_ENDPOINT",
                    defaults.oauth2.token_endpoint,
                ),
                client_id: text("SSO_AGENT_OAUTH2_CLIENT_ID", defaults.oauth2.client_id),
                client_secret: text(
                    "SSO_AGENT_OAUTH2_CLIENT_SECRET",
                    defaults.oauth2.client_secret,
                ),
                scope: optional("SSO_AGENT_OAUTH2_SCOPE"),
            },
            http_timeout_secs,
        };

        config.validate()?;
        tracing::debug!(
            saml2 = config.saml2_enabled,
            openid = config.openid_enabled,
            oauth2_grant = config.oauth2_grant_enabled,
            skip_patterns = config.skip_urls.patterns().len(),
            "Loaded agent configuration"
        );
        Ok(config)
    }

    /// Checks that every enabled protocol has the settings it needs.
    pub fn validate(&self) -> AgentResult<()> {
        let require = |value: &str, name: &str| {
            if value.trim().is_empty() {
                Err(AgentError::InvalidConfiguration(format!("{name} is required")))
            } else {
                Ok(())
            }
        };

        if self.saml2_enabled {
            require(&self.saml2.sp_entity_id, "saml2.sp_entity_id")?;
            require(&self.saml2.acs_url, "saml2.acs_url")?;
            require(&self.saml2.idp_url, "saml2.idp_url")?;
        }
        if self.openid_enabled {
            require(&self.openid.provider_url, "openid.provider_url")?;
            require(&self.openid.return_to, "openid.return_to")?;
        }
        if self.oauth2_grant_enabled {
            if !self.saml2_enabled {
                return Err(AgentError::InvalidConfiguration(
                    "oauth2 grant requires saml2 to be enabled".to_string(),
                ));
            }
            require(&self.oauth2.token_endpoint, "oauth2.token_endpoint")?;
            require(&self.oauth2.client_id, "oauth2.client_id")?;
        }
        require(&self.session_keys.logged_in, "session_keys.logged_in")?;
        Ok(())
    }
}

/// Compiled set of skip-URL matchers.
///
/// Each pattern is matched against the whole request path:
///
/// - `*` matches any characters except `/`
/// - `**` matches any characters including `/`
/// - `?` matches a single character other than `/`
///
/// A pattern without wildcards is an exact path match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct SkipPatterns {
    patterns: Vec<String>,
    compiled: Vec<Regex>,
}

impl SkipPatterns {
    /// Compiles a set of patterns.
    pub fn new<I, S>(patterns: I) -> AgentResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let compiled = patterns
            .iter()
            .map(|p| {
                Regex::new(&format!("^{}$", glob_to_regex(p))).map_err(|e| {
                    AgentError::InvalidConfiguration(format!("invalid skip pattern {p}: {e}"))
                })
            })
            .collect::<AgentResult<Vec<_>>>()?;
        Ok(Self { patterns, compiled })
    }

    /// Returns whether the path matches any pattern.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.compiled.iter().any(|re| re.is_match(path))
    }

    /// Returns the source patterns.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Returns whether no pattern is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl TryFrom<Vec<String>> for SkipPatterns {
    type Error = AgentError;

    fn try_from(patterns: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(patterns)
    }
}

impl From<SkipPatterns> for Vec<String> {
    fn from(patterns: SkipPatterns) -> Self {
        patterns.patterns
    }
}

fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out
}
