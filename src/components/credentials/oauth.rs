use crate::error::{oauth_error, BotResult};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use url::Url;

/// Google authorization endpoint
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// Google token endpoint
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Out-of-band redirect: the user copies the code from the browser
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
/// Read/write access to calendars
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// OAuth client id and secret
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
}

/// Layout of a downloaded `credentials.json`
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Read `installed.client_id` / `installed.client_secret` (or the `web` variant)
    pub fn from_json(content: &str) -> BotResult<Self> {
        let file: CredentialsFile = serde_json::from_str(content)
            .map_err(|e| oauth_error(&format!("Invalid credentials file: {}", e)))?;

        file.installed
            .or(file.web)
            .ok_or_else(|| oauth_error("Credentials file has no 'installed' or 'web' section"))
    }

    pub fn load(path: &Path) -> BotResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            oauth_error(&format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }
}

/// Response of the token endpoint for both code exchange and refresh
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// OAuth2 installed-app client for the out-of-band code flow
#[derive(Clone)]
pub struct OAuthClient {
    client: Client,
    secrets: ClientSecrets,
    auth_url: String,
    token_url: String,
}

impl OAuthClient {
    pub fn new(client: Client, secrets: ClientSecrets) -> Self {
        Self {
            client,
            secrets,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// Use another token endpoint, used by tests
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// URL the user opens to grant calendar access
    pub fn authorization_url(&self) -> BotResult<String> {
        let mut url = Url::parse(&self.auth_url)
            .map_err(|e| oauth_error(&format!("Failed to parse URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.secrets.client_id)
            .append_pair("redirect_uri", OOB_REDIRECT_URI)
            .append_pair("response_type", "code")
            .append_pair("access_type", "offline")
            .append_pair("scope", CALENDAR_SCOPE);

        Ok(url.to_string())
    }

    /// Exchange a pasted authorization code for a token
    pub async fn exchange_code(&self, code: &str) -> BotResult<TokenResponse> {
        self.request_token(&[
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", OOB_REDIRECT_URI),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    /// Get a new access token with a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> BotResult<TokenResponse> {
        self.request_token(&[
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> BotResult<TokenResponse> {
        let response = self
            .client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| oauth_error(&format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(oauth_error(&format!(
                "Token request failed: HTTP {} - {}",
                status, error_body
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| oauth_error(&format!("Failed to parse token response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installed_credentials() {
        let json = r#"{"installed":{"client_id":"id.apps.googleusercontent.com","client_secret":"s3cret","redirect_uris":["http://localhost"]}}"#;
        let secrets = ClientSecrets::from_json(json).unwrap();
        assert_eq!(secrets.client_id, "id.apps.googleusercontent.com");
        assert_eq!(secrets.client_secret, "s3cret");
    }

    #[test]
    fn test_credentials_without_section() {
        assert!(ClientSecrets::from_json(r#"{"other":{}}"#).is_err());
        assert!(ClientSecrets::from_json("not json").is_err());
    }

    #[test]
    fn test_authorization_url() {
        let client = OAuthClient::new(
            Client::new(),
            ClientSecrets {
                client_id: "my-client".to_string(),
                client_secret: "secret".to_string(),
            },
        );
        let url = Url::parse(&client.authorization_url().unwrap()).unwrap();
        let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(query["client_id"], "my-client");
        assert_eq!(query["redirect_uri"], OOB_REDIRECT_URI);
        assert_eq!(query["access_type"], "offline");
        assert_eq!(query["scope"], CALENDAR_SCOPE);
        // The secret never goes into the browser URL
        assert!(!url.as_str().contains("secret"));
    }
}
