use std::io::Write;
use std::path::PathBuf;

use eyre::{Result, eyre};
use gitpad_client::{
    ClientError, ContentType, FileFlavor, FileMeta, GitHubClient, Locator, RemoteFile,
};
use tokio::fs;

#[derive(Debug, PartialEq)]
enum ListTarget {
    Repositories,
    Branches { org: String, repo: String },
    Folder(Locator),
}

fn parse_list_target(value: Option<&str>) -> Result<ListTarget> {
    let Some(value) = value else {
        return Ok(ListTarget::Repositories);
    };

    let tokens: Vec<&str> = value.trim_end_matches('/').split('/').collect();
    match tokens.as_slice() {
        [org, repo] if !org.is_empty() && !repo.is_empty() => Ok(ListTarget::Branches {
            org: org.to_string(),
            repo: repo.to_string(),
        }),
        _ => Ok(ListTarget::Folder(Locator::parse(value)?)),
    }
}

pub async fn handle_ls_command(client: &GitHubClient, locator: Option<String>) -> Result<()> {
    match parse_list_target(locator.as_deref())? {
        ListTarget::Repositories => {
            let repos = client.list_repositories().await?;
            if repos.is_empty() {
                println!("No repositories found.");
            }
            for repo in repos {
                let visibility = if repo.private { " (private)" } else { "" };
                println!("📁 {}{}  [{}]", repo.full_name, visibility, repo.default_branch);
            }
        }
        ListTarget::Branches { org, repo } => {
            for branch in client.list_branches(&org, &repo).await? {
                println!("🌿 {}", branch.name);
            }
        }
        ListTarget::Folder(folder) => {
            let items = client.list_directory(&folder).await?;
            if items.is_empty() {
                println!("{} is empty.", folder);
            }
            for item in items {
                match item.item_type {
                    ContentType::Directory => println!("📁 {}/", item.name),
                    _ => println!(
                        "📄 {}  {}",
                        item.name,
                        item.size
                            .map(|s| gitpad_client::format_file_size(s as usize))
                            .unwrap_or_default()
                    ),
                }
            }
        }
    }

    Ok(())
}

pub async fn handle_cat_command(client: &GitHubClient, locator: String, library: bool) -> Result<()> {
    let locator = Locator::parse(&locator)?;
    let file = if library {
        client.open_library(&locator).await?
    } else {
        client.open_file(&locator).await?
    };

    let mut stdout = std::io::stdout();
    stdout.write_all(&file.content)?;
    stdout.flush()?;
    Ok(())
}

pub async fn handle_push_command(
    client: &GitHubClient,
    file: PathBuf,
    locator: String,
    library: bool,
) -> Result<()> {
    let content = fs::read(&file)
        .await
        .map_err(|e| eyre!("Cannot read {}: {}", file.display(), e))?;
    let target = Locator::parse(&locator)?;
    let folder = target
        .parent()
        .ok_or_else(|| eyre!("{} does not name a file", target))?;
    let name = target.file_name().to_string();

    if library {
        let written = client
            .insert_library(&name, &content, &folder, false)
            .await?;
        println!(
            "✅ Wrote library {} ({})",
            written.meta.locator(),
            written.meta.sha.as_deref().unwrap_or("-")
        );
        return Ok(());
    }

    let mut remote = prepare_push(client, &target, &folder, &name, content).await?;
    let outcome = client.save_file(&mut remote).await?;
    if outcome.overwrote_remote {
        println!("⚠️  Remote changes to {} were overwritten", target);
    }
    println!("✅ Saved {} ({})", target, outcome.sha);
    if let Some(url) = &remote.meta.html_url {
        println!("   {}", url);
    }
    Ok(())
}

/// Wraps `content` as a document bound for `target`. An existing file is only
/// looked up for its SHA, so formats that would need a converter to open can
/// still be replaced.
async fn prepare_push(
    client: &GitHubClient,
    target: &Locator,
    folder: &Locator,
    name: &str,
    content: Vec<u8>,
) -> Result<RemoteFile> {
    match client.gateway().stat(target).await {
        Ok(existing) => {
            let meta = FileMeta {
                org: target.org.clone(),
                repo: target.repo.clone(),
                git_ref: target.git_ref.clone(),
                name: existing.name,
                path: existing.path,
                sha: Some(existing.sha),
                html_url: None,
                download_url: None,
                is_new: false,
            };
            Ok(RemoteFile::new(FileFlavor::Document, meta, content))
        }
        Err(ClientError::NotFound(_)) => {
            let mut remote = client.insert_file(name, &[], folder).await?;
            remote.set_content(content);
            Ok(remote)
        }
        Err(e) => Err(e.into()),
    }
}
