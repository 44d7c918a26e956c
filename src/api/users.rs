//! User endpoints and profile pictures

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use super::client::{segment, MinicordClient};
use super::error::{ApiError, ApiResult};
use crate::models::User;

/// `GET /users/self`
pub async fn get_self_data(client: &MinicordClient) -> ApiResult<User> {
    client.get_json("/users/self", &[]).await
}

/// `GET /users/{id}`
pub async fn get_user_data(client: &MinicordClient, user_id: &str) -> ApiResult<User> {
    client.get_json(&format!("/users/{}", segment(user_id)), &[]).await
}

/// `GET /users/by-username/{username}`
pub async fn get_user_by_username_data(client: &MinicordClient, username: &str) -> ApiResult<User> {
    client
        .get_json(&format!("/users/by-username/{}", segment(username)), &[])
        .await
}

/// `POST /users/{id}/profile` with the image in the `avatar` form field.
pub async fn upload_profile_picture_data(
    client: &MinicordClient,
    user_id: &str,
    file_name: &str,
    bytes: Vec<u8>,
) -> ApiResult<()> {
    let path = format!("/users/{}/profile", segment(user_id));
    let mut part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
    if let Some(mime) = mime_for(file_name) {
        part = part.mime_str(mime).map_err(|source| ApiError::Transport {
            url: path.clone(),
            source,
        })?;
    }
    let form = reqwest::multipart::Form::new().part("avatar", part);
    client.post_multipart(&path, form).await
}

/// `GET /users/{id}/profile` as raw image bytes.
pub async fn get_profile_picture_data(client: &MinicordClient, user_id: &str) -> ApiResult<Vec<u8>> {
    client
        .get_bytes(&format!("/users/{}/profile", segment(user_id)))
        .await
}

fn mime_for(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Resolve a user by id, or by username when `by_name` is set.
async fn resolve(client: &MinicordClient, key: &str, by_name: bool) -> Result<User> {
    let user = if by_name {
        get_user_by_username_data(client, key).await
    } else {
        get_user_data(client, key).await
    };
    user.map_err(|e| {
        if e.is_not_found() {
            anyhow!("User '{}' not found", key)
        } else {
            anyhow::Error::from(e).context(format!("Failed to look up '{}'", key))
        }
    })
}

fn print_user(user: &User) {
    println!();
    println!("Username: {}", user.username);
    println!("ID:       {}", user.id);
    if let Some(ref pic) = user.profile_picture {
        println!("Picture:  {}", pic);
    }
}

/// Show the logged-in user.
pub async fn whoami() -> Result<()> {
    let client = MinicordClient::new()?;
    let me = get_self_data(&client).await.context("Failed to fetch /users/self")?;
    print_user(&me);
    println!("Server:   {}", client.base_url());
    Ok(())
}

/// Show any user by id or username.
pub async fn show_user(key: &str, by_name: bool) -> Result<()> {
    let client = MinicordClient::new()?;
    let user = resolve(&client, key, by_name).await?;
    print_user(&user);
    Ok(())
}

/// Upload a new profile picture for the logged-in user.
pub async fn upload_avatar(path: &Path) -> Result<()> {
    let client = MinicordClient::new()?;
    let me = get_self_data(&client).await.context("Failed to fetch /users/self")?;
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("avatar");

    tracing::info!("Uploading {} ({} bytes)...", file_name, bytes.len());
    upload_profile_picture_data(&client, &me.id, file_name, bytes)
        .await
        .context("Profile picture upload failed")?;
    println!("Profile picture updated.");
    Ok(())
}

/// Download a user's profile picture to `out`.
pub async fn download_avatar(key: &str, by_name: bool, out: &Path) -> Result<()> {
    let client = MinicordClient::new()?;
    let user = resolve(&client, key, by_name).await?;
    let bytes = get_profile_picture_data(&client, &user.id)
        .await
        .with_context(|| format!("No profile picture for {}", user.username))?;
    std::fs::write(out, &bytes).with_context(|| format!("Failed to write {}", out.display()))?;
    println!("Saved {} bytes to {}", bytes.len(), out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for("me.PNG"), Some("image/png"));
        assert_eq!(mime_for("me.jpeg"), Some("image/jpeg"));
        assert_eq!(mime_for("me.bmp"), None);
        assert_eq!(mime_for("noext"), None);
    }
}
