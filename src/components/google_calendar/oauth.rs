//! Installed-app authorization: browser consent with a loopback redirect.

use crate::config::CalendarAccount;
use crate::error::{auth_error, CalResult};
use super::token::{request_token, ClientSecrets, StoredToken, TokenManager};
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// How long the consent flow waits for the browser redirect
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Consent page URL for `scopes`
pub fn authorization_url(
    secrets: &ClientSecrets,
    scopes: &[String],
    redirect_uri: &str,
    state: &str,
) -> CalResult<Url> {
    let scope = scopes.join(" ");
    Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("scope", scope.as_str()),
            ("state", state),
        ],
    )
    .map_err(|e| auth_error(&format!("Invalid auth URI {}: {}", secrets.auth_uri, e)))
}

/// Pull the authorization code out of the redirect request path
pub fn parse_callback(request_path: &str, expected_state: &str) -> CalResult<String> {
    let url = Url::parse(&format!("http://localhost{}", request_path))
        .map_err(|e| auth_error(&format!("Malformed callback URL: {}", e)))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Err(auth_error(&format!("Authorization denied: {}", value))),
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Err(auth_error("Authorization callback state does not match"));
    }
    code.ok_or_else(|| auth_error("No authorization code found in callback"))
}

/// Wait for the first request on `server` off the async workers
async fn wait_for_callback(server: tiny_http::Server, timeout: Duration) -> CalResult<tiny_http::Request> {
    let received = tokio::task::spawn_blocking(move || server.recv_timeout(timeout))
        .await
        .map_err(|e| auth_error(&format!("Callback listener failed: {}", e)))??;
    received.ok_or_else(|| {
        auth_error(&format!(
            "No authorization callback received within {} seconds",
            timeout.as_secs()
        ))
    })
}

/// Run the consent flow for `account` and return the granted token
pub async fn authorize_interactively(account: &CalendarAccount) -> CalResult<StoredToken> {
    let secrets = ClientSecrets::load(&account.credential_file)?;

    // Local server on an ephemeral port receives the redirect
    let server = tiny_http::Server::http("127.0.0.1:0")
        .map_err(|e| auth_error(&format!("Failed to start callback server: {}", e)))?;
    let port = server
        .server_addr()
        .to_ip()
        .map(|addr| addr.port())
        .ok_or_else(|| auth_error("Callback server has no TCP address"))?;
    let redirect_uri = format!("http://127.0.0.1:{}", port);

    // Generate random state for security
    let state = uuid::Uuid::new_v4().to_string();
    let auth_url = authorization_url(&secrets, &account.scopes, &redirect_uri, &state)?;

    println!("Opening browser for Google Calendar authorization...");
    if let Err(e) = webbrowser::open(auth_url.as_str()) {
        warn!("Could not open browser: {}", e);
        println!("Open this URL to continue:\n{}", auth_url);
    }

    println!("Waiting for authorization callback...");
    let request = wait_for_callback(server, CALLBACK_TIMEOUT).await?;
    let code = match parse_callback(request.url(), &state) {
        Ok(code) => code,
        Err(e) => {
            let _ = request.respond(tiny_http::Response::from_string(format!("Authorization failed: {}", e)));
            return Err(e);
        }
    };

    let response = request_token(
        &Client::new(),
        &secrets.token_uri,
        &[
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("code", code.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ],
    )
    .await?;

    request.respond(tiny_http::Response::from_string(
        "Authorization successful! You can close this window.",
    ))?;

    info!("Authorization granted for {}", account.token_file.display());
    Ok(StoredToken::from_response(response, None, &account.scopes))
}

/// Access token for `account`: cached, refreshed, or freshly authorized
pub async fn authenticate(account: &CalendarAccount) -> CalResult<String> {
    let manager = TokenManager::for_account(account);
    if let Some(token) = manager.get_token().await? {
        return Ok(token.access_token);
    }

    info!(
        "No usable token in {}, starting authorization",
        account.token_file.display()
    );
    let token = authorize_interactively(account).await?;
    manager.set_token(&token).await?;
    Ok(token.access_token)
}
