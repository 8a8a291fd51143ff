use dialoguer::{Password, theme::ColorfulTheme};

use crate::core::capture;
use relay_core::secret::redact;
use crate::core::Services;

pub async fn auth_token(services: &Services, value: &str) -> anyhow::Result<()> {
    capture::capture_token(value, &services.credentials, &services.auth_token).await?;
    println!("Stored Nirvana auth token");

    match services.cache.get_data(true).await {
        Ok(snapshot) => println!("Token verified: {} tasks visible", snapshot.tasks.len()),
        Err(e) => println!("Warning: token stored but could not be verified: {e}"),
    }

    Ok(())
}

pub async fn auth_key(services: &Services, key: Option<String>) -> anyhow::Result<()> {
    let key = match key {
        Some(key) => key,
        None => prompt_api_key()?,
    };

    store_api_key(services, &key).await?;
    println!("API key saved!");
    Ok(())
}

async fn store_api_key(services: &Services, key: &str) -> anyhow::Result<()> {
    services.credentials.set_api_key(key).await?;
    services.api_key.set(key.trim());
    Ok(())
}

fn prompt_api_key() -> anyhow::Result<String> {
    let api_key = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Enter OpenAI API key")
        .interact()?;

    if api_key.is_empty() {
        anyhow::bail!("API key cannot be empty");
    }

    Ok(api_key)
}

pub fn auth_status(services: &Services) {
    println!("{}", status_report(services));
}

fn status_report(services: &Services) -> String {
    let token = services
        .auth_token
        .get()
        .map_or_else(|| "not set".to_string(), |t| redact(&t));
    let key = services
        .api_key
        .get()
        .map_or_else(|| "not set".to_string(), |k| redact(&k));

    format!(
        "Nirvana token: {token}\nOpenAI key:    {key}\nModel:         {}\nCredentials:   {}",
        services.config.model.model,
        services.credentials.path().display()
    )
}

pub async fn auth_logout(services: &Services) -> anyhow::Result<()> {
    services.credentials.clear_auth_token().await?;
    services.auth_token.clear();
    services.cache.clear();
    println!("Removed Nirvana auth token");
    Ok(())
}
