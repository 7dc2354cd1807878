//! SAML 2.0 web SSO against the running demo server.

use reqwest::StatusCode;

use crate::common::{idp_logout_request, new_client, saml_response, TestEnv, IDP_SSO_URL};

fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Anonymous access to the application starts SSO with the IdP.
#[tokio::test]
async fn test_anonymous_access_starts_sso() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env.client.get(env.url("/app")).send().await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/samlsso");

    let response = env.client.get(env.url("/samlsso")).send().await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    let target = location(&response);
    assert!(target.starts_with(IDP_SSO_URL), "unexpected target {target}");
    assert!(target.contains("SAMLRequest="));

    Ok(())
}

/// The POST binding answers with an auto-submitting form.
#[tokio::test]
async fn test_post_binding_form() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .client
        .get(env.url("/samlsso?binding=HTTP-POST"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.text().await?;
    assert!(body.contains(&format!("action=\"{IDP_SSO_URL}\"")));
    assert!(body.contains("name=\"SAMLRequest\""));
    assert!(body.contains("document.forms[0].submit()"));

    Ok(())
}

/// A response posted to the ACS signs the browser in.
#[tokio::test]
async fn test_acs_login() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env.login("alice@example.com", "idx-1").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await?.contains("Signed in as alice@example.com"));

    let response = env.client.get(env.url("/app")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await?;
    assert!(body.contains("Welcome, alice@example.com"));
    assert!(body.contains("role: admin"));

    Ok(())
}

/// A response addressed elsewhere is rejected and drops the existing login.
#[tokio::test]
async fn test_rejected_response_clears_login() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.login("alice@example.com", "idx-2").await?;

    let forged = saml_response("https://other-sp.example.com/acs", "mallory", "idx-3");
    let response = env
        .post_saml(&env.client, "/acs", "SAMLResponse", &forged)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = env.client.get(env.url("/app")).send().await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/samlsso");

    Ok(())
}

/// Undecodable messages are client errors.
#[tokio::test]
async fn test_malformed_response() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .client
        .post(env.acs_url())
        .form(&[("SAMLResponse", "%%% not base64 %%%")])
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

/// Skipped paths are never treated as protocol traffic.
#[tokio::test]
async fn test_skip_urls() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .client
        .get(env.url("/static/app.js?SAMLResponse=garbage"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

/// SP-initiated logout goes to the IdP; its response ends the session.
#[tokio::test]
async fn test_sp_initiated_logout() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.login("alice@example.com", "idx-4").await?;

    let response = env.client.get(env.url("/logout")).send().await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    let target = location(&response);
    assert!(target.starts_with(IDP_SSO_URL));
    assert!(target.contains("SAMLRequest="));

    let logout_response = r#"<samlp:LogoutResponse xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_lr1" Version="2.0"><samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status></samlp:LogoutResponse>"#;
    let response = env
        .post_saml(&env.client, "/acs", "SAMLResponse", logout_response)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.contains("Max-Age=0"));

    let response = env.client.get(env.url("/app")).send().await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    Ok(())
}

/// Logging out without a login lands on the home page.
#[tokio::test]
async fn test_logout_without_login() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env.client.get(env.url("/logout")).send().await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    Ok(())
}

/// A logout request from the IdP terminates the matching browser session.
#[tokio::test]
async fn test_idp_initiated_logout() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.login("alice@example.com", "idx-5").await?;

    let response = env.client.get(env.url("/app")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);

    // The IdP's front channel does not carry the user's cookie.
    let idp_channel = new_client()?;
    let request = idp_logout_request("alice@example.com", "idx-5");
    let response = env
        .post_saml(&idp_channel, "/acs", "SAMLRequest", &request)
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = env.client.get(env.url("/app")).send().await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/samlsso");

    Ok(())
}
