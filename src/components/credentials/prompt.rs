use crate::error::{oauth_error, BotResult};
use async_trait::async_trait;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

/// Asks a human to authorize the app and paste back the code
#[async_trait]
pub trait CodePrompt: Send + Sync {
    async fn ask_for_code(&self, auth_url: &str) -> BotResult<String>;
}

/// Prints the authorization URL and reads the code from stdin
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompt;

#[async_trait]
impl CodePrompt for ConsolePrompt {
    async fn ask_for_code(&self, auth_url: &str) -> BotResult<String> {
        println!("\n🔐 Authorize this app by visiting this URL:\n{}", auth_url);

        if let Err(e) = webbrowser::open(auth_url) {
            debug!("Could not open browser: {}", e);
        }

        let mut stdout = io::stdout();
        stdout.write_all(b"\nPaste the code here: ").await?;
        stdout.flush().await?;

        let mut lines = BufReader::new(io::stdin()).lines();
        let line = lines
            .next_line()
            .await?
            .ok_or_else(|| oauth_error("Standard input closed before a code was entered"))?;

        let code = line.trim();
        if code.is_empty() {
            return Err(oauth_error("No authorization code entered"));
        }
        Ok(code.to_string())
    }
}
