use super::oauth::OAuthClient;
use super::prompt::CodePrompt;
use super::token::{load_token, save_token, StoredToken};
use crate::error::{oauth_error, BotResult};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

/// The credential actor; the only place that reads or writes the token file
pub struct CredentialActor {
    oauth: OAuthClient,
    token_path: PathBuf,
    prompt: Arc<dyn CodePrompt>,
    token: Option<StoredToken>,
    command_rx: mpsc::Receiver<CredentialCommand>,
}

/// Commands that can be sent to the credential actor
pub enum CredentialCommand {
    GetToken(oneshot::Sender<BotResult<StoredToken>>),
    /// The API turned this access token down
    Invalidate(String),
    Shutdown,
}

/// Handle for communicating with the credential actor
#[derive(Clone)]
pub struct CredentialActorHandle {
    command_tx: mpsc::Sender<CredentialCommand>,
}

impl CredentialActorHandle {
    /// Get a usable token, loading, refreshing or asking for one as needed
    pub async fn get_token(&self) -> BotResult<StoredToken> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(CredentialCommand::GetToken(response_tx))
            .await
            .map_err(|e| oauth_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .await
            .map_err(|_| oauth_error("Response channel closed"))?
    }

    /// Drop the cached token if it is still the rejected one
    pub async fn invalidate(&self, rejected: &str) -> BotResult<()> {
        self.command_tx
            .send(CredentialCommand::Invalidate(rejected.to_string()))
            .await
            .map_err(|e| oauth_error(&format!("Actor mailbox error: {}", e)))
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> BotResult<()> {
        let _ = self.command_tx.send(CredentialCommand::Shutdown).await;
        Ok(())
    }
}

impl CredentialActor {
    /// Create a new actor and return its handle
    pub fn new(
        oauth: OAuthClient,
        token_path: PathBuf,
        prompt: Arc<dyn CodePrompt>,
    ) -> (Self, CredentialActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = Self {
            oauth,
            token_path,
            prompt,
            token: None,
            command_rx,
        };

        (actor, CredentialActorHandle { command_tx })
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Credential actor started");

        // One command at a time, so token file access never overlaps
        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                CredentialCommand::GetToken(response_tx) => {
                    let result = self.current_token().await;
                    let _ = response_tx.send(result);
                }
                CredentialCommand::Invalidate(rejected) => self.invalidate(&rejected),
                CredentialCommand::Shutdown => {
                    info!("Credential actor shutting down");
                    break;
                }
            }
        }

        info!("Credential actor shut down");
    }

    async fn current_token(&mut self) -> BotResult<StoredToken> {
        if self.token.is_none() {
            self.token = load_token(&self.token_path).await;
        }

        let now = Utc::now();
        let token = match self.token.take() {
            Some(token) if !token.is_expired(now) => token,
            Some(token) => match token.refresh_token.clone() {
                Some(refresh_token) => {
                    info!("Access token expired, refreshing");
                    let response = match self.oauth.refresh(&refresh_token).await {
                        Ok(response) => response,
                        Err(e) => {
                            // Keep the old token around for the next attempt
                            self.token = Some(token);
                            return Err(e);
                        }
                    };
                    let refreshed = token.refreshed(response, Utc::now());
                    self.persist(&refreshed).await;
                    refreshed
                }
                None => {
                    warn!("Token expired and has no refresh token, authorizing again");
                    self.authorize_interactively().await?
                }
            },
            None => self.authorize_interactively().await?,
        };

        self.token = Some(token.clone());
        Ok(token)
    }

    /// Another request may already have replaced the rejected token
    fn invalidate(&mut self, rejected: &str) {
        if let Some(token) = self.token.as_mut().filter(|t| t.access_token == rejected) {
            warn!("Access token was rejected, it will be refreshed");
            token.expire();
        }
    }

    async fn authorize_interactively(&self) -> BotResult<StoredToken> {
        let auth_url = self.oauth.authorization_url()?;
        let code = self.prompt.ask_for_code(&auth_url).await?;

        let response = self.oauth.exchange_code(&code).await.inspect_err(|e| {
            error!("❌ Error retrieving access token: {}", e);
        })?;

        let token = StoredToken::from_response(response, Utc::now());
        self.persist(&token).await;
        Ok(token)
    }

    /// A failed write is logged; the token is still usable for this run
    async fn persist(&self, token: &StoredToken) {
        match save_token(&self.token_path, token).await {
            Ok(()) => info!("✅ Token saved to {}", self.token_path.display()),
            Err(e) => error!("❌ Error saving token: {}", e),
        }
    }
}
