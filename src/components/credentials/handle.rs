use super::actor::{CredentialActor, CredentialActorHandle};
use super::oauth::{ClientSecrets, OAuthClient};
use super::prompt::CodePrompt;
use super::token::StoredToken;
use super::CredentialProvider;
use crate::config::Config;
use crate::error::BotResult;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Handle for interacting with the credential actor
#[derive(Clone)]
pub struct CredentialHandle {
    actor_handle: CredentialActorHandle,
    _actor_task: Arc<JoinHandle<()>>,
}

impl CredentialHandle {
    /// Create a new CredentialHandle and spawn the actor
    pub fn new(oauth: OAuthClient, token_path: PathBuf, prompt: Arc<dyn CodePrompt>) -> Self {
        let (mut actor, handle) = CredentialActor::new(oauth, token_path, prompt);

        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Self {
            actor_handle: handle,
            _actor_task: Arc::new(actor_task),
        }
    }

    /// Build the OAuth client from config, falling back to the credentials file
    pub fn from_config(config: &Config, prompt: Arc<dyn CodePrompt>) -> BotResult<Self> {
        let secrets = client_secrets(config)?;
        let oauth = OAuthClient::new(reqwest::Client::new(), secrets);
        Ok(Self::new(oauth, config.token_path.clone(), prompt))
    }

    /// Make sure a token exists, running the interactive flow if needed
    pub async fn authorize(&self) -> BotResult<StoredToken> {
        self.actor_handle.get_token().await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> BotResult<()> {
        self.actor_handle.shutdown().await
    }
}

#[async_trait]
impl CredentialProvider for CredentialHandle {
    async fn access_token(&self) -> BotResult<String> {
        Ok(self.actor_handle.get_token().await?.access_token)
    }

    async fn invalidate(&self, rejected: &str) -> BotResult<()> {
        self.actor_handle.invalidate(rejected).await
    }
}

/// `CLIENT_ID`/`CLIENT_SECRET` win; otherwise read `credentials.json`
pub fn client_secrets(config: &Config) -> BotResult<ClientSecrets> {
    if !config.client_id.is_empty() && !config.client_secret.is_empty() {
        return Ok(ClientSecrets {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        });
    }

    debug!(
        "CLIENT_ID/CLIENT_SECRET not set, reading {}",
        config.credentials_path.display()
    );
    ClientSecrets::load(&config.credentials_path)
}
