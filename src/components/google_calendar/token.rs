use crate::config::CalendarAccount;
use crate::error::{auth_error, CalResult};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens closer than this to expiry are refreshed up front
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Access/refresh token pair as cached on disk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix timestamp in seconds
    pub expires_at: i64,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl StoredToken {
    /// Build a cache record from a token endpoint response
    pub fn from_response(response: TokenResponse, previous_refresh: Option<String>, scopes: &[String]) -> Self {
        let expires_at = Utc::now().timestamp() + response.expires_in.unwrap_or(3600);
        let scopes = match response.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => scopes.to_vec(),
        };

        Self {
            access_token: response.access_token,
            // Google usually omits the refresh token on refresh
            refresh_token: response.refresh_token.or(previous_refresh),
            expires_at,
            scopes,
        }
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now + EXPIRY_MARGIN_SECS
    }

    /// Whether every requested scope was granted
    pub fn covers(&self, scopes: &[String]) -> bool {
        scopes.iter().all(|scope| self.scopes.contains(scope))
    }
}

/// Successful response of the OAuth token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// OAuth client registration from a Google client-secret JSON file
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn load(path: &Path) -> CalResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            auth_error(&format!("Failed to read client credentials {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Accepts both "installed" and "web" application files
    pub fn from_json(content: &str) -> CalResult<Self> {
        let file: ClientSecretsFile = serde_json::from_str(content)?;
        file.installed
            .or(file.web)
            .ok_or_else(|| auth_error("Client credentials file has neither an 'installed' nor a 'web' section"))
    }
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// POST a form to the token endpoint
pub async fn request_token(client: &Client, token_uri: &str, params: &[(&str, &str)]) -> CalResult<TokenResponse> {
    let response = client
        .post(token_uri)
        .form(params)
        .send()
        .await
        .map_err(|e| auth_error(&format!("Failed to reach token endpoint: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error response".to_string());
        return Err(auth_error(&format!(
            "Token request failed: HTTP {} - {}",
            status, error_body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| auth_error(&format!("Failed to parse token response: {}", e)))
}

/// Storage for one account's credentials
#[async_trait]
pub trait CredentialCache: Send + Sync {
    /// Cached token, if one was stored before
    async fn load(&self) -> CalResult<Option<StoredToken>>;

    fn is_valid(&self, token: &StoredToken) -> bool;

    /// Exchange the refresh token for a new access token
    async fn refresh(&self, token: &StoredToken) -> CalResult<StoredToken>;

    async fn persist(&self, token: &StoredToken) -> CalResult<()>;
}

/// JSON token file next to an OAuth client-secret file
#[derive(Clone)]
pub struct FileCredentialCache {
    token_file: PathBuf,
    credential_file: PathBuf,
    scopes: Vec<String>,
    client: Client,
}

impl FileCredentialCache {
    pub fn new(account: &CalendarAccount) -> Self {
        Self {
            token_file: account.token_file.clone(),
            credential_file: account.credential_file.clone(),
            scopes: account.scopes.clone(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl CredentialCache for FileCredentialCache {
    async fn load(&self) -> CalResult<Option<StoredToken>> {
        if !self.token_file.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.token_file)?;
        let token: StoredToken = serde_json::from_str(&content)?;
        Ok(Some(token))
    }

    fn is_valid(&self, token: &StoredToken) -> bool {
        !token.access_token.is_empty()
            && !token.is_expired_at(Utc::now().timestamp())
            && token.covers(&self.scopes)
    }

    async fn refresh(&self, token: &StoredToken) -> CalResult<StoredToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| auth_error("No refresh token in token data"))?;
        let secrets = ClientSecrets::load(&self.credential_file)?;

        let response = request_token(
            &self.client,
            &secrets.token_uri,
            &[
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ],
        )
        .await?;

        Ok(StoredToken::from_response(
            response,
            token.refresh_token.clone(),
            &token.scopes,
        ))
    }

    async fn persist(&self, token: &StoredToken) -> CalResult<()> {
        if let Some(parent) = self.token_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.token_file, serde_json::to_string_pretty(token)?)?;

        // Owner-only, the file holds OAuth tokens
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.token_file, fs::Permissions::from_mode(0o600))?;
        }

        debug!("Token saved to {}", self.token_file.display());
        Ok(())
    }
}

/// Hands out usable tokens from a credential cache
pub struct TokenManager<C: CredentialCache> {
    cache: C,
}

impl TokenManager<FileCredentialCache> {
    pub fn for_account(account: &CalendarAccount) -> Self {
        Self::new(FileCredentialCache::new(account))
    }
}

impl<C: CredentialCache> TokenManager<C> {
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    /// Cached token, refreshed if needed. `None` means the account must be
    /// authorized interactively.
    pub async fn get_token(&self) -> CalResult<Option<StoredToken>> {
        let Some(token) = self.cache.load().await? else {
            return Ok(None);
        };

        if self.cache.is_valid(&token) {
            return Ok(Some(token));
        }

        if token.refresh_token.is_none() {
            info!("Cached token is unusable and has no refresh token");
            return Ok(None);
        }

        info!("Access token expired, refreshing");
        let refreshed = self.cache.refresh(&token).await?;
        if !self.cache.is_valid(&refreshed) {
            // Refresh keeps the granted scopes; new scopes need consent
            return Ok(None);
        }
        self.cache.persist(&refreshed).await?;
        Ok(Some(refreshed))
    }

    /// Store a freshly authorized token
    pub async fn set_token(&self, token: &StoredToken) -> CalResult<()> {
        self.cache.persist(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_at: i64, scopes: &[&str]) -> StoredToken {
        StoredToken {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn expiry_has_margin() {
        let t = token(1_000, &[]);
        assert!(t.is_expired_at(1_000));
        assert!(t.is_expired_at(950));
        assert!(!t.is_expired_at(900));
    }

    #[test]
    fn covers_requires_every_scope() {
        let t = token(0, &["a", "b"]);
        assert!(t.covers(&["a".to_string()]));
        assert!(!t.covers(&["a".to_string(), "c".to_string()]));
    }

    #[test]
    fn refresh_keeps_previous_refresh_token() {
        let response = TokenResponse {
            access_token: "new".to_string(),
            refresh_token: None,
            expires_in: Some(3600),
            scope: None,
        };
        let stored = StoredToken::from_response(response, Some("old".to_string()), &["s".to_string()]);
        assert_eq!(stored.refresh_token.as_deref(), Some("old"));
        assert_eq!(stored.scopes, vec!["s".to_string()]);
        assert!(stored.expires_at > Utc::now().timestamp());
    }

    #[test]
    fn client_secrets_installed_and_web() {
        let installed = ClientSecrets::from_json(
            r#"{"installed":{"client_id":"id","client_secret":"secret","redirect_uris":["http://localhost"]}}"#,
        )
        .unwrap();
        assert_eq!(installed.client_id, "id");
        assert_eq!(installed.token_uri, DEFAULT_TOKEN_URI);

        let web = ClientSecrets::from_json(
            r#"{"web":{"client_id":"w","client_secret":"s","token_uri":"https://token.test"}}"#,
        )
        .unwrap();
        assert_eq!(web.token_uri, "https://token.test");

        assert!(ClientSecrets::from_json(r#"{"other":{}}"#).is_err());
    }
}
