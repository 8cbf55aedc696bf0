//! Data types exchanged with the contents API and handed to the editor.

use serde::{Deserialize, Serialize};

use crate::locator::Locator;

/// The authenticated account, resolved once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: u64,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserResponse {
    pub id: u64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub login: Option<String>,
}

impl From<UserResponse> for UserIdentity {
    fn from(value: UserResponse) -> Self {
        Self {
            id: value.id,
            email: value.email,
            display_name: value.name.or(value.login),
        }
    }
}

/// Whether a file is opened as an editable document or as a shape library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFlavor {
    Document,
    Library,
}

/// Location and last-known version of a remote file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub org: String,
    pub repo: String,
    pub git_ref: String,
    pub name: String,
    pub path: String,
    /// Content hash of the version this copy was read from. `None` means the
    /// file has never been written.
    pub sha: Option<String>,
    pub html_url: Option<String>,
    pub download_url: Option<String>,
    /// Set for files created locally and not yet saved.
    #[serde(default)]
    pub is_new: bool,
}

impl FileMeta {
    pub fn locator(&self) -> Locator {
        Locator::new(&self.org, &self.repo, &self.git_ref, &self.path)
    }

    pub(crate) fn from_item(locator: &Locator, item: &ContentsItem) -> Self {
        Self {
            org: locator.org.clone(),
            repo: locator.repo.clone(),
            git_ref: locator.git_ref.clone(),
            name: item.name.clone(),
            path: item.path.clone(),
            sha: Some(item.sha.clone()),
            html_url: item.html_url.clone(),
            download_url: item.download_url.clone(),
            is_new: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub flavor: FileFlavor,
    pub meta: FileMeta,
    pub content: Vec<u8>,
}

impl RemoteFile {
    pub fn new(flavor: FileFlavor, meta: FileMeta, content: impl Into<Vec<u8>>) -> Self {
        Self {
            flavor,
            meta,
            content: content.into(),
        }
    }

    pub fn is_library(&self) -> bool {
        self.flavor == FileFlavor::Library
    }

    /// Content as UTF-8 text, if it is valid.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    pub fn set_content(&mut self, content: impl Into<Vec<u8>>) {
        self.content = content.into();
    }
}

/// Entry of the contents endpoint, either a single file (with content) or an
/// element of a directory listing (without).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ContentsItem {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(rename = "type", default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Body returned by a successful contents PUT.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WriteResponse {
    pub content: ContentsItem,
    #[serde(default)]
    pub commit: Option<CommitInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    /// SHA of the file version just written.
    pub sha: String,
    pub commit: Option<CommitInfo>,
    /// True when the save only went through after overwriting a remote change.
    pub overwrote_remote: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub owner: String,
    pub default_branch: String,
    pub private: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryResponse {
    pub name: String,
    pub full_name: String,
    pub owner: OwnerResponse,
    #[serde(default = "default_branch_name")]
    pub default_branch: String,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwnerResponse {
    pub login: String,
}

fn default_branch_name() -> String {
    "main".to_string()
}

impl From<RepositoryResponse> for Repository {
    fn from(value: RepositoryResponse) -> Self {
        Self {
            name: value.name,
            full_name: value.full_name,
            owner: value.owner.login,
            default_branch: value.default_branch,
            private: value.private,
        }
    }
}

impl Repository {
    /// Root folder of the repository at its default branch.
    pub fn root(&self) -> Locator {
        Locator::new(&self.owner, &self.name, &self.default_branch, "")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub name: String,
    pub path: String,
    pub item_type: ContentType,
    pub size: Option<u64>,
    pub sha: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    File,
    Directory,
    Symlink,
    Submodule,
}

impl ContentType {
    pub(crate) fn from_api(s: Option<&str>) -> Self {
        match s {
            Some("dir") => ContentType::Directory,
            Some("symlink") => ContentType::Symlink,
            Some("submodule") => ContentType::Submodule,
            _ => ContentType::File,
        }
    }
}

impl From<ContentsItem> for ContentItem {
    fn from(value: ContentsItem) -> Self {
        Self {
            item_type: ContentType::from_api(value.item_type.as_deref()),
            name: value.name,
            path: value.path,
            size: value.size,
            sha: value.sha,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_from_api() {
        assert_eq!(ContentType::from_api(Some("file")), ContentType::File);
        assert_eq!(ContentType::from_api(Some("dir")), ContentType::Directory);
        assert_eq!(ContentType::from_api(Some("symlink")), ContentType::Symlink);
        assert_eq!(
            ContentType::from_api(Some("submodule")),
            ContentType::Submodule
        );
        assert_eq!(ContentType::from_api(None), ContentType::File);
    }

    #[test]
    fn test_user_identity_falls_back_to_login() {
        let response: UserResponse =
            serde_json::from_str(r#"{"id": 7, "login": "octocat", "email": null}"#).unwrap();
        let user = UserIdentity::from(response);
        assert_eq!(user.id, 7);
        assert_eq!(user.email, None);
        assert_eq!(user.display_name.as_deref(), Some("octocat"));
    }

    #[test]
    fn test_repository_root() {
        let response: RepositoryResponse = serde_json::from_str(
            r#"{"name": "b", "full_name": "a/b", "owner": {"login": "a"}, "default_branch": "dev"}"#,
        )
        .unwrap();
        let repo = Repository::from(response);
        assert!(!repo.private);
        assert_eq!(repo.root().to_string(), "a/b/dev/");
    }
}
