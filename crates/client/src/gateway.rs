//! Editor file operations over the contents API
//!
//! [`RepoFileGateway`] turns open/create/save/list into contents, branch and
//! repository calls. Content travels base64-encoded in both directions, and
//! writes carry the SHA of the version they replace so that the provider can
//! reject stale saves.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::codec;
use crate::config::ClientConfig;
use crate::conflict::{ConflictResolver, ExistsResolution};
use crate::converter::{ConversionSource, FileConverter, needs_conversion};
use crate::error::{ClientError, Result};
use crate::executor::RequestExecutor;
use crate::http::{HttpRequest, HttpResponse};
use crate::interaction::{Interaction, messages};
use crate::locator::Locator;
use crate::models::{
    Branch, ContentItem, ContentType, ContentsItem, FileFlavor, FileMeta, RemoteFile, Repository,
    RepositoryResponse, SaveOutcome, WriteResponse,
};

#[derive(Serialize)]
struct WriteRequest<'a> {
    path: &'a str,
    message: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

pub struct RepoFileGateway {
    config: Arc<ClientConfig>,
    executor: Arc<RequestExecutor>,
    interaction: Arc<dyn Interaction>,
    converter: Option<Arc<dyn FileConverter>>,
}

impl RepoFileGateway {
    pub fn new(
        config: Arc<ClientConfig>,
        executor: Arc<RequestExecutor>,
        interaction: Arc<dyn Interaction>,
        converter: Option<Arc<dyn FileConverter>>,
    ) -> Self {
        Self {
            config,
            executor,
            interaction,
            converter,
        }
    }

    pub fn conflicts(&self) -> ConflictResolver<'_> {
        ConflictResolver::new(self, self.interaction.as_ref())
    }

    /// `<api>/repos/{org}/{repo}/contents/{path}?ref={ref}`
    pub fn contents_url(&self, locator: &Locator) -> Result<Url> {
        let mut segments = vec!["repos", locator.org.as_str(), locator.repo.as_str(), "contents"];
        segments.extend(locator.path_segments());

        let mut url = self.config.api_url(segments)?;
        url.query_pairs_mut().append_pair("ref", &locator.git_ref);
        Ok(url)
    }

    /// Reads a file and decodes its content.
    ///
    /// Formats that need conversion are handed to the configured
    /// [`FileConverter`] instead of being fetched here.
    pub async fn read_file(&self, locator: &Locator, flavor: FileFlavor) -> Result<RemoteFile> {
        if needs_conversion(&locator.path) {
            return self.convert(locator, flavor).await;
        }

        let url = self.contents_url(locator)?;
        debug!("Reading {}", locator);
        let response = self.executor.execute(HttpRequest::get(url)).await?;
        let item = parse_file_item(locator, &response)?;

        let content = match (item.content.as_deref(), item.encoding.as_deref()) {
            (Some(content), Some("base64")) => codec::decode(content)?,
            (Some(content), _) => content.as_bytes().to_vec(),
            (None, _) => Vec::new(),
        };

        Ok(RemoteFile::new(
            flavor,
            FileMeta::from_item(locator, &item),
            content,
        ))
    }

    /// Fetches a file's metadata without decoding its content.
    pub async fn stat(&self, locator: &Locator) -> Result<ContentItem> {
        let url = self.contents_url(locator)?;
        let response = self.executor.execute(HttpRequest::get(url)).await?;
        Ok(parse_file_item(locator, &response)?.into())
    }

    async fn convert(&self, locator: &Locator, flavor: FileFlavor) -> Result<RemoteFile> {
        let name = locator.file_name().to_string();
        let converter = self
            .converter
            .as_ref()
            .ok_or_else(|| ClientError::ConversionUnavailable(name.clone()))?;
        let token = self
            .executor
            .session()
            .token()
            .await
            .ok_or(ClientError::NotAuthorized)?;

        debug!("Handing {} to the converter", locator);
        converter
            .convert(ConversionSource {
                url: self.contents_url(locator)?,
                token,
                name,
                extension: self.config.default_extension.clone(),
                flavor,
            })
            .await
    }

    /// Creates or updates a file with already base64-encoded content.
    ///
    /// `sha` must be the version being replaced; `None` creates the file and
    /// fails with a conflict if it already exists.
    pub async fn write_file(
        &self,
        target: &Locator,
        message: &str,
        content: &str,
        sha: Option<&str>,
    ) -> Result<HttpResponse> {
        if content.len() >= self.config.max_file_size {
            return Err(ClientError::SizeExceeded {
                size: content.len(),
                limit: self.config.max_file_size,
            });
        }

        let body = WriteRequest {
            path: &target.path,
            message,
            content,
            sha,
        };
        let request = HttpRequest::put_json(self.contents_url(target)?, &body)?;

        debug!(
            "Writing {} ({} bytes, {})",
            target,
            content.len(),
            if sha.is_some() { "update" } else { "create" }
        );
        self.executor.execute(request).await
    }

    /// Prepares `filename` inside `folder`, asking before replacing an
    /// existing file.
    ///
    /// Documents are returned unsaved (`is_new`), to be written by the first
    /// [`Self::save_file`]. Libraries have no later save step and are written
    /// immediately.
    pub async fn create_or_replace(
        &self,
        filename: &str,
        content: &[u8],
        folder: &Locator,
        flavor: FileFlavor,
        is_base64: bool,
    ) -> Result<RemoteFile> {
        let target = folder.join(filename);

        let sha = match self.conflicts().check_exists(&target, true).await? {
            ExistsResolution::Create => None,
            ExistsResolution::Replace { sha } => Some(sha),
            ExistsResolution::Declined => return Err(ClientError::Cancelled),
        };

        let encoded = if is_base64 {
            std::str::from_utf8(content)
                .map_err(|e| ClientError::Parse(format!("Content is not base64 text: {}", e)))?
                .to_string()
        } else {
            codec::encode(content)
        };
        let raw = if is_base64 {
            codec::decode(&encoded)?
        } else {
            content.to_vec()
        };

        match flavor {
            FileFlavor::Document => {
                let meta = FileMeta {
                    org: target.org.clone(),
                    repo: target.repo.clone(),
                    git_ref: target.git_ref.clone(),
                    name: filename.to_string(),
                    path: target.path.clone(),
                    sha,
                    html_url: None,
                    download_url: None,
                    is_new: true,
                };
                Ok(RemoteFile::new(FileFlavor::Document, meta, raw))
            }
            FileFlavor::Library => {
                let message = self.commit_message(filename, true).await?;
                let response = self
                    .write_file(&target, &message, &encoded, sha.as_deref())
                    .await?;
                let written: WriteResponse = response.json()?;

                info!("Created library {}", target);
                Ok(RemoteFile::new(
                    FileFlavor::Library,
                    FileMeta::from_item(&target, &written.content),
                    raw,
                ))
            }
        }
    }

    /// Commits the file's current content, resolving a stale-SHA conflict by
    /// asking whether to overwrite.
    ///
    /// On success the file's SHA is updated to the version just written.
    pub async fn save_file(&self, file: &mut RemoteFile) -> Result<SaveOutcome> {
        let target = file.meta.locator();
        let is_new = file.meta.sha.is_none() || file.meta.is_new;
        let message = self.commit_message(&file.meta.name, is_new).await?;
        let content = codec::encode(&file.content);

        let first_attempt = self
            .write_file(&target, &message, &content, file.meta.sha.as_deref())
            .await;

        let (response, overwrote_remote) = match first_attempt {
            Ok(response) => (response, false),
            Err(err) if err.is_conflict() => {
                let sha = self.conflicts().overwrite_sha(&target, err).await?;
                let response = self
                    .write_file(&target, &message, &content, Some(&sha))
                    .await?;
                (response, true)
            }
            Err(err) => return Err(err),
        };

        self.complete_save(file, response, overwrote_remote)
    }

    /// Records a successful contents PUT on `file`: the new SHA becomes the
    /// version the next save writes against.
    pub fn complete_save(
        &self,
        file: &mut RemoteFile,
        response: HttpResponse,
        overwrote_remote: bool,
    ) -> Result<SaveOutcome> {
        let written: WriteResponse = response.json()?;
        file.meta.sha = Some(written.content.sha.clone());
        file.meta.is_new = false;
        if file.meta.html_url.is_none() {
            file.meta.html_url = written.content.html_url.clone();
        }

        info!("Saved {}", file.meta.locator());
        Ok(SaveOutcome {
            sha: written.content.sha,
            commit: written.commit,
            overwrote_remote,
        })
    }

    async fn commit_message(&self, filename: &str, is_new: bool) -> Result<String> {
        let default = messages::commit_default(filename, is_new);
        let message = self
            .interaction
            .prompt(messages::COMMIT_MESSAGE, &default)
            .await
            .ok_or(ClientError::Cancelled)?;

        if message.trim().is_empty() {
            Ok(default)
        } else {
            Ok(message)
        }
    }

    /// Repositories the authenticated user can access.
    pub async fn list_repositories(&self) -> Result<Vec<Repository>> {
        let url = self.config.api_url(["user", "repos"])?;
        let repos: Vec<RepositoryResponse> =
            self.executor.execute_json(HttpRequest::get(url)).await?;
        Ok(repos.into_iter().map(Repository::from).collect())
    }

    pub async fn list_branches(&self, org: &str, repo: &str) -> Result<Vec<Branch>> {
        let url = self.config.api_url(["repos", org, repo, "branches"])?;
        self.executor.execute_json(HttpRequest::get(url)).await
    }

    /// Entries of a folder, folders first, each group sorted by name.
    pub async fn list_directory(&self, folder: &Locator) -> Result<Vec<ContentItem>> {
        let url = self.contents_url(folder)?;
        let response = self.executor.execute(HttpRequest::get(url)).await?;

        let items: Vec<ContentsItem> = response
            .json()
            .map_err(|_| ClientError::Parse(format!("{} is not a folder", folder)))?;

        let mut items: Vec<ContentItem> = items.into_iter().map(ContentItem::from).collect();
        items.sort_by(|a, b| {
            let a_dir = a.item_type == ContentType::Directory;
            let b_dir = b.item_type == ContentType::Directory;
            b_dir.cmp(&a_dir).then_with(|| a.name.cmp(&b.name))
        });
        Ok(items)
    }
}

fn parse_file_item(locator: &Locator, response: &HttpResponse) -> Result<ContentsItem> {
    if response.body.first() == Some(&b'[') {
        return Err(ClientError::Parse(format!("{} is a folder", locator)));
    }
    response.json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthSession, MemoryTokenStore};
    use crate::http::Method;
    use crate::mock::{MockTransport, ScriptedInteraction, StaticConsent};
    use crate::watchdog::Watchdog;
    use serde_json::json;
    use std::time::Duration;

    async fn gateway(
        transport: Arc<MockTransport>,
        interaction: ScriptedInteraction,
    ) -> RepoFileGateway {
        let config = Arc::new(ClientConfig::new("cid", "https://relay.example.com/github"));
        let watchdog = Arc::new(Watchdog::new(Duration::from_secs(5)));
        let session = Arc::new(AuthSession::new(
            Arc::clone(&config),
            transport.clone(),
            Arc::new(StaticConsent::new("code")),
            Arc::new(MemoryTokenStore::with_token("t")),
            Arc::clone(&watchdog),
        ));
        session.restore().await.unwrap();
        transport.on_json(Method::Get, "/user", 200, json!({"id": 1}));

        let executor = Arc::new(RequestExecutor::new(session, transport, watchdog));
        RepoFileGateway::new(config, executor, Arc::new(interaction), None)
    }

    #[tokio::test]
    async fn test_contents_url_encodes_ref() {
        let gateway = gateway(Arc::new(MockTransport::new()), ScriptedInteraction::new()).await;
        let locator = Locator::parse("a/b/feature/x y/docs/f.xml").unwrap();

        assert_eq!(
            gateway.contents_url(&locator).unwrap().as_str(),
            "https://api.github.com/repos/a/b/contents/x%20y/docs/f.xml?ref=feature"
        );
    }

    #[tokio::test]
    async fn test_read_file_decodes_base64() {
        let transport = Arc::new(MockTransport::new());
        let gateway = gateway(transport.clone(), ScriptedInteraction::new()).await;
        transport.on_json(
            Method::Get,
            "/contents/f.xml",
            200,
            json!({
                "name": "f.xml",
                "path": "f.xml",
                "sha": "abc",
                "type": "file",
                "encoding": "base64",
                "content": "PG14\nZmlsZS8+\n",
                "html_url": "https://github.com/a/b/blob/main/f.xml"
            }),
        );

        let file = gateway
            .read_file(&Locator::parse("a/b/main/f.xml").unwrap(), FileFlavor::Library)
            .await
            .unwrap();

        assert_eq!(file.text(), Some("<mxfile/>"));
        assert!(file.is_library());
        assert_eq!(file.meta.sha.as_deref(), Some("abc"));
        assert_eq!(file.meta.git_ref, "main");
        assert!(!file.meta.is_new);
    }

    #[tokio::test]
    async fn test_read_folder_as_file_fails() {
        let transport = Arc::new(MockTransport::new());
        let gateway = gateway(transport.clone(), ScriptedInteraction::new()).await;
        transport.on_json(Method::Get, "/contents/docs", 200, json!([]));

        let err = gateway
            .read_file(&Locator::parse("a/b/main/docs").unwrap(), FileFlavor::Document)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Parse(_)));
    }

    #[tokio::test]
    async fn test_convertible_file_without_converter() {
        let transport = Arc::new(MockTransport::new());
        let gateway = gateway(transport.clone(), ScriptedInteraction::new()).await;

        let err = gateway
            .read_file(&Locator::parse("a/b/main/d.vsdx").unwrap(), FileFlavor::Document)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::ConversionUnavailable(name) if name == "d.vsdx"));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_write_file_body_shape() {
        let transport = Arc::new(MockTransport::new());
        let gateway = gateway(transport.clone(), ScriptedInteraction::new()).await;
        transport.on_json(Method::Put, "/contents/", 201, json!({"content": {"name": "f", "path": "f", "sha": "1"}}));
        transport.on_json(Method::Put, "/contents/", 200, json!({"content": {"name": "f", "path": "f", "sha": "2"}}));

        let target = Locator::parse("a/b/main/f.txt").unwrap();
        gateway.write_file(&target, "create", "aGk=", None).await.unwrap();
        gateway.write_file(&target, "update", "aGk=", Some("1")).await.unwrap();

        let puts = transport.requests_to(Method::Put, "/contents/");
        let create = puts[0].json_body().unwrap();
        let update = puts[1].json_body().unwrap();

        assert!(create.get("sha").is_none());
        assert_eq!(create["path"], "f.txt");
        assert_eq!(create["message"], "create");
        assert_eq!(create["content"], "aGk=");
        assert_eq!(update["sha"], "1");
        assert_eq!(puts[0].url.query(), Some("ref=main"));
    }

    #[tokio::test]
    async fn test_write_file_size_limit() {
        let transport = Arc::new(MockTransport::new());
        let gateway = gateway(transport.clone(), ScriptedInteraction::new()).await;
        let target = Locator::parse("a/b/main/big.xml").unwrap();

        let at_limit = "A".repeat(1_000_000);
        let err = gateway
            .write_file(&target, "m", &at_limit, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::SizeExceeded {
                size: 1_000_000,
                limit: 1_000_000
            }
        ));
        assert_eq!(err.to_string(), "The file is too large (1 MB / 1 MB)");
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_list_directory_orders_folders_first() {
        let transport = Arc::new(MockTransport::new());
        let gateway = gateway(transport.clone(), ScriptedInteraction::new()).await;
        transport.on_json(
            Method::Get,
            "/contents",
            200,
            json!([
                {"name": "z.xml", "path": "z.xml", "sha": "1", "type": "file", "size": 10},
                {"name": "b", "path": "b", "sha": "2", "type": "dir"},
                {"name": "a.xml", "path": "a.xml", "sha": "3", "type": "file", "size": 5},
                {"name": "a", "path": "a", "sha": "4", "type": "dir"}
            ]),
        );

        let items = gateway
            .list_directory(&Locator::parse("a/b/main").unwrap())
            .await
            .unwrap();
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();

        assert_eq!(names, vec!["a", "b", "a.xml", "z.xml"]);
        assert_eq!(items[2].size, Some(5));
    }

    #[tokio::test]
    async fn test_list_repositories_and_branches() {
        let transport = Arc::new(MockTransport::new());
        let gateway = gateway(transport.clone(), ScriptedInteraction::new()).await;
        transport.on_json(
            Method::Get,
            "/user/repos",
            200,
            json!([{"name": "b", "full_name": "a/b", "owner": {"login": "a"}, "default_branch": "main", "private": true}]),
        );
        transport.on_json(
            Method::Get,
            "/branches",
            200,
            json!([{"name": "main", "commit": {"sha": "x"}}, {"name": "dev"}]),
        );

        let repos = gateway.list_repositories().await.unwrap();
        assert_eq!(repos.len(), 1);
        assert!(repos[0].private);
        assert_eq!(repos[0].owner, "a");

        let branches = gateway.list_branches("a", "b").await.unwrap();
        assert_eq!(
            branches,
            vec![
                Branch {
                    name: "main".to_string()
                },
                Branch {
                    name: "dev".to_string()
                }
            ]
        );
    }
}
