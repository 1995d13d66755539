use calclock::components::google_calendar::oauth::authorize_interactively;
use calclock::components::google_calendar::token::TokenManager;
use calclock::config::Config;
use calclock::error::{other_error, CalResult};
use std::env;

const USAGE: &str = "usage: get_calendar_token <source|destination>";

#[tokio::main]
async fn main() -> CalResult<()> {
    // Load configuration
    let config = Config::load()?;

    let account = match env::args().nth(1).as_deref() {
        Some("source") => config.source.clone(),
        Some("destination") => config.destination.clone(),
        _ => return Err(other_error(USAGE)),
    };

    println!("Authorizing scopes: {}", account.scopes.join(", "));
    let token = authorize_interactively(&account).await?;

    // Save token using TokenManager
    TokenManager::for_account(&account).set_token(&token).await?;

    println!("Token successfully saved to {}!", account.token_file.display());

    Ok(())
}
