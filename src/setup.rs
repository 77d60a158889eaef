use anyhow::{bail, Context};
use desktop_agenda::storage::config::Config;
use desktop_agenda::sync::google_auth::{AuthError, GoogleAuthenticator};

/// Makes sure a usable token exists, running the consent flow when it
/// doesn't.
pub async fn check_or_setup_auth(config: &Config) -> anyhow::Result<GoogleAuthenticator> {
    if !config.google.has_client_credentials() {
        println!("Configuration incomplete. Please edit the config file at:");
        println!("{}", Config::config_path().display());
        println!("\nYou need to set:");
        println!("  - google.client_id: Your Google OAuth2 client ID");
        println!("  - google.client_secret: Your Google OAuth2 client secret");
        println!("\nGet these from: https://console.cloud.google.com/apis/credentials");
        bail!("Missing Google OAuth credentials in config");
    }

    let auth = GoogleAuthenticator::new(config.google.clone());

    match auth.get_valid_token().await {
        Ok(_) => Ok(auth),
        Err(e @ (AuthError::NotAuthenticated | AuthError::NoRefreshToken | AuthError::OAuthError(_))) => {
            tracing::info!("Starting consent flow: {}", e);
            println!("No valid authentication found. Setting up Google Calendar access...\n");
            auth.print_auth_instructions();

            println!("Enter the authorization code: ");
            let mut code = String::new();
            std::io::stdin().read_line(&mut code)?;
            let code = code.trim();

            auth.exchange_code_for_token(code)
                .await
                .context("Failed to exchange authorization code")?;
            println!("\nAuthentication successful!\n");

            Ok(auth)
        }
        Err(e) => Err(e).context("Failed to load stored token"),
    }
}
