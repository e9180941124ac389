use super::oauth::TokenResponse;
use crate::error::{oauth_error, BotResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

/// Treat tokens this close to expiry as already expired
const EXPIRY_MARGIN_MS: i64 = 60_000;

/// OAuth token as persisted in `token.json`
///
/// Field names follow the Google client libraries so token files written by
/// them keep working. Unknown fields are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Expiry in milliseconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoredToken {
    /// Build a token from a fresh token endpoint response
    pub fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            scope: response.scope,
            token_type: response.token_type,
            expiry_date: response
                .expires_in
                .map(|secs| now.timestamp_millis() + secs * 1000),
            extra: Map::new(),
        }
    }

    /// Apply a refresh response, keeping the old refresh token if none was returned
    pub fn refreshed(&self, response: TokenResponse, now: DateTime<Utc>) -> Self {
        let mut token = Self::from_response(response, now);
        if token.refresh_token.is_none() {
            token.refresh_token = self.refresh_token.clone();
        }
        if token.scope.is_none() {
            token.scope = self.scope.clone();
        }
        token.extra = self.extra.clone();
        token
    }

    /// A token without an expiry is only trusted when it cannot be refreshed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry_date {
            Some(expiry) => expiry <= now.timestamp_millis() + EXPIRY_MARGIN_MS,
            None => self.refresh_token.is_some(),
        }
    }

    /// Mark the token as unusable so the next request refreshes it
    pub fn expire(&mut self) {
        self.expiry_date = Some(0);
    }
}

/// Read the token file; a missing or unreadable file means there is no token
pub async fn load_token(path: &Path) -> Option<StoredToken> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            debug!("No token at {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str::<StoredToken>(&content) {
        Ok(token) => Some(token),
        Err(e) => {
            warn!("Ignoring unreadable token file {}: {}", path.display(), e);
            None
        }
    }
}

/// Write the token file, replacing whatever was there
pub async fn save_token(path: &Path, token: &StoredToken) -> BotResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string(token)
        .map_err(|e| oauth_error(&format!("Failed to serialize token: {}", e)))?;
    fs::write(path, json).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn response(refresh_token: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: "ya29.new".to_string(),
            expires_in: Some(3599),
            refresh_token: refresh_token.map(str::to_string),
            scope: None,
            token_type: Some("Bearer".to_string()),
        }
    }

    #[test]
    fn test_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 6, 20, 10, 0, 0).unwrap();
        let token = StoredToken::from_response(response(Some("1//refresh")), now);

        assert_eq!(token.expiry_date, Some(now.timestamp_millis() + 3_599_000));
        assert!(!token.is_expired(now));
        assert!(token.is_expired(now + chrono::Duration::minutes(59)));
    }

    #[test]
    fn test_refresh_keeps_refresh_token() {
        let now = Utc.with_ymd_and_hms(2026, 6, 20, 10, 0, 0).unwrap();
        let old = StoredToken::from_response(response(Some("1//refresh")), now);

        let new = old.refreshed(response(None), now);
        assert_eq!(new.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(new.access_token, "ya29.new");
    }

    #[test]
    fn test_google_client_token_format() {
        let json = r#"{
            "access_token": "ya29.abc",
            "refresh_token": "1//xyz",
            "scope": "https://www.googleapis.com/auth/calendar",
            "token_type": "Bearer",
            "expiry_date": 1750000000000,
            "refresh_token_expires_in": 604799
        }"#;
        let token: StoredToken = serde_json::from_str(json).unwrap();

        assert_eq!(token.expiry_date, Some(1_750_000_000_000));
        assert!(token.extra.contains_key("refresh_token_expires_in"));

        // Unknown fields survive a round trip through the file
        let written = serde_json::to_value(&token).unwrap();
        assert_eq!(written["refresh_token_expires_in"], 604799);
    }

    #[test]
    fn test_token_without_expiry() {
        let token: StoredToken = serde_json::from_str(r#"{"access_token":"ya29.abc"}"#).unwrap();
        assert!(!token.is_expired(Utc::now()));

        // With a refresh token there is no reason to trust it blindly
        let refreshable: StoredToken =
            serde_json::from_str(r#"{"access_token":"ya29.abc","refresh_token":"1//r"}"#).unwrap();
        assert!(refreshable.is_expired(Utc::now()));
    }

    #[test]
    fn test_expire() {
        let now = Utc.with_ymd_and_hms(2026, 6, 20, 10, 0, 0).unwrap();
        let mut token = StoredToken::from_response(response(Some("1//refresh")), now);

        token.expire();
        assert!(token.is_expired(now));
        assert_eq!(token.refresh_token.as_deref(), Some("1//refresh"));
    }
}
