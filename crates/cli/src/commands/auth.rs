use eyre::Result;
use gitpad_client::{AuthorizableClient, GitHubClient, UserIdentity};

pub async fn handle_login_command(client: &GitHubClient) -> Result<()> {
    client.authorize().await?;
    let user = client.ensure_user().await?;
    println!("✅ Signed in as {}", describe_user(&user));
    Ok(())
}

pub async fn handle_logout_command(client: &GitHubClient) -> Result<()> {
    client.logout().await?;
    println!("✅ Signed out");
    Ok(())
}

pub async fn handle_whoami_command(client: &GitHubClient) -> Result<()> {
    let user = client.ensure_user().await?;
    println!("👤 {}", describe_user(&user));
    println!("   id: {}", user.id);
    if let Some(email) = &user.email {
        println!("   email: {}", email);
    }
    Ok(())
}

fn describe_user(user: &UserIdentity) -> String {
    user.display_name
        .clone()
        .unwrap_or_else(|| format!("user {}", user.id))
}
