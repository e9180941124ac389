use kalenteribotti::components::credentials::{CodePrompt, ConsolePrompt, CredentialHandle};
use kalenteribotti::config::Config;
use kalenteribotti::startup::init_logging;
use std::sync::Arc;

/// Make sure a usable token file exists, authorizing interactively when it does not
#[tokio::main]
async fn main() -> miette::Result<()> {
    init_logging()?;

    // Only the Google side is needed here, no Discord token
    let config = Config::load_oauth_only()?;

    let prompt: Arc<dyn CodePrompt> = Arc::new(ConsolePrompt);
    let credentials = CredentialHandle::from_config(&config, prompt)?;

    let token = credentials.authorize().await?;
    credentials.shutdown().await?;

    println!(
        "✅ Authorized{}. Token is in {}",
        if token.refresh_token.is_some() {
            " with offline access"
        } else {
            ""
        },
        config.token_path.display()
    );

    Ok(())
}
