//! Login, signup, logout and session status

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};

use super::{TokenStore, PASSWORD_ENV};
use crate::api::auth::{check_username_data, login_data, signup_data};
use crate::api::client::MinicordClient;
use crate::api::ApiError;
use crate::config::Config;

const MIN_PASSWORD_LEN: usize = 8;

/// Password from the flag, then `MINICORD_PASSWORD`, then a stdin prompt.
fn read_password(given: Option<String>, prompt: &str) -> Result<String> {
    if let Some(p) = given {
        return Ok(p);
    }
    if let Ok(p) = std::env::var(PASSWORD_ENV) {
        if !p.is_empty() {
            return Ok(p);
        }
    }
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(password)
}

/// User-facing explanation for a failed login.
fn login_failure(err: &ApiError) -> &'static str {
    match err {
        ApiError::Validation { .. } | ApiError::NotFound { .. } => {
            "User does not exist. Did you mean to sign up?"
        }
        ApiError::Unauthorized { .. } => "Incorrect password",
        ApiError::Transport { .. } => "Could not reach the server",
        _ => "Unknown error: failed to login",
    }
}

/// User-facing explanation for a failed signup.
fn signup_failure(err: &ApiError) -> &'static str {
    match err {
        ApiError::Conflict { .. } => "Username is already taken.",
        ApiError::Validation { .. } => "Password must be at least 8 characters long.",
        ApiError::Transport { .. } => "Could not reach the server",
        _ => "Signup failed. Please try again.",
    }
}

/// Log in and persist the token.
pub async fn login(username: &str, password: Option<String>, force: bool) -> Result<()> {
    let mut config = Config::load()?;

    if !force {
        if let (Some(token), Some(user)) = (config.get_token(), config.get_user()) {
            if !token.is_expired() && user.username == username {
                println!("Already logged in as {}. Use --force to log in again.", user.username);
                return Ok(());
            }
        }
    }

    let password = read_password(password, "Password: ")?;
    let client = MinicordClient::anonymous(&config)?;

    tracing::info!("Logging in as {}...", username);
    let session = match login_data(&client, username, &password).await {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!("Login failed: {}", e);
            bail!("{}", login_failure(&e));
        }
    };

    config.set_token(session.token);
    config.set_user(session.user.clone());
    config.save()?;

    println!("Logged in as {}.", session.user.username);
    Ok(())
}

/// Create an account, then log in with it.
pub async fn signup(username: &str, password: Option<String>) -> Result<()> {
    let config = Config::load()?;
    let client = MinicordClient::anonymous(&config)?;

    match check_username_data(&client, username).await {
        Ok(false) => bail!("Username '{}' is not available", username),
        Ok(true) => {}
        // The check is advisory; signup itself reports conflicts.
        Err(e) => tracing::debug!("Username check failed: {}", e),
    }

    let prompted = password.is_none() && !std::env::var(PASSWORD_ENV).is_ok_and(|p| !p.is_empty());
    let password = read_password(password, "Password: ")?;
    if password.len() < MIN_PASSWORD_LEN {
        bail!("Password must be at least {} characters long.", MIN_PASSWORD_LEN);
    }
    if prompted {
        let confirm = read_password(None, "Confirm password: ")?;
        if confirm != password {
            bail!("Passwords do not match.");
        }
    }

    if let Err(e) = signup_data(&client, username, &password).await {
        tracing::debug!("Signup failed: {}", e);
        bail!("{}", signup_failure(&e));
    }
    println!("Account created successfully! Logging you in...");

    login(username, Some(password), true).await
}

/// Log out and clear cached credentials.
pub async fn logout() -> Result<()> {
    let mut config = Config::load()?;
    config.clear_tokens();
    config.save()?;
    println!("Logged out.");
    Ok(())
}

/// Display current auth status.
pub async fn status() -> Result<()> {
    let config = Config::load()?;

    println!("API URL:     {}", config.api_url());
    match config.get_token() {
        Some(token) if !token.is_expired() => {
            println!("Token:       valid");
            if let Some(exp) = token.expires_at {
                println!("  expires_at: {}", exp);
            }
        }
        Some(_) => println!("Token:       expired"),
        None => println!("Token:       none"),
    }
    match config.get_user() {
        Some(user) => println!("User:        {} ({})", user.username, user.id),
        None => println!("User:        none"),
    }
    println!("Config:      {}", Config::config_path()?.display());

    Ok(())
}

/// Report whether a username is still free.
pub async fn check_username(username: &str) -> Result<()> {
    let config = Config::load()?;
    let client = MinicordClient::anonymous(&config)?;
    let available = check_username_data(&client, username)
        .await
        .context("Username check failed")?;
    if available {
        println!("'{}' is available", username);
    } else {
        println!("'{}' is taken", username);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_failure_messages() {
        let e = ApiError::Validation {
            status: 400,
            message: "no such user".into(),
        };
        assert_eq!(login_failure(&e), "User does not exist. Did you mean to sign up?");
        let e = ApiError::Unauthorized {
            url: "/auth/login".into(),
        };
        assert_eq!(login_failure(&e), "Incorrect password");
    }

    #[test]
    fn test_signup_failure_messages() {
        let e = ApiError::Conflict {
            message: "taken".into(),
        };
        assert_eq!(signup_failure(&e), "Username is already taken.");
        let e = ApiError::Validation {
            status: 400,
            message: "short".into(),
        };
        assert_eq!(signup_failure(&e), "Password must be at least 8 characters long.");
    }

    #[test]
    fn test_given_password_skips_prompt() {
        assert_eq!(read_password(Some("hunter22".into()), "").unwrap(), "hunter22");
    }
}
