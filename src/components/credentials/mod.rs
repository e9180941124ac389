mod actor;
mod handle;
pub mod oauth;
mod prompt;
pub mod token;

pub use handle::{client_secrets, CredentialHandle};
pub use oauth::{ClientSecrets, OAuthClient};
pub use prompt::{CodePrompt, ConsolePrompt};
pub use token::StoredToken;

use crate::error::BotResult;
use async_trait::async_trait;

/// Source of bearer tokens for the calendar API
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> BotResult<String>;

    /// Forget an access token the API rejected
    async fn invalidate(&self, rejected: &str) -> BotResult<()>;
}
