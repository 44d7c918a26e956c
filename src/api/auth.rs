//! Auth endpoints: login, signup, username availability

use reqwest::Method;
use serde::Serialize;

use super::client::{segment, MinicordClient};
use super::error::ApiResult;
use crate::models::{Session, UsernameAvailability};

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

/// `POST /auth/login`
pub async fn login_data(client: &MinicordClient, username: &str, password: &str) -> ApiResult<Session> {
    client
        .send_json(Method::POST, "/auth/login", &Credentials { username, password })
        .await
}

/// `POST /auth/signup`
pub async fn signup_data(client: &MinicordClient, username: &str, password: &str) -> ApiResult<()> {
    client
        .send_json_ignore(Method::POST, "/auth/signup", &Credentials { username, password })
        .await
}

/// `GET /checkuser/{username}`
pub async fn check_username_data(client: &MinicordClient, username: &str) -> ApiResult<bool> {
    let resp: UsernameAvailability = client
        .get_json(&format!("/checkuser/{}", segment(username)), &[])
        .await?;
    Ok(resp.available)
}
