use folio_core::{AdminClient, ClientConfig};

use crate::auth::SessionStore;
use crate::error::CliError;

pub async fn run_login(config: &ClientConfig, email: &str, password: &str) -> Result<(), CliError> {
    let client = AdminClient::from_config(config)?;
    let session = client.login(email, password).await?;
    SessionStore::new(&config.api_base_url).save(&session)?;

    match session.expires_at.as_deref() {
        Some(expires_at) => println!("Signed in (session expires at {expires_at})"),
        None => println!("Signed in"),
    }
    Ok(())
}

pub fn run_logout(config: &ClientConfig) -> Result<(), CliError> {
    SessionStore::new(&config.api_base_url).clear()?;
    println!("Signed out");
    Ok(())
}
