use std::fmt;
use std::str::FromStr;

use crate::error::{ClientError, Result};

/// Identifies a remote file or folder as `org/repo/ref/path...`.
///
/// The path may be empty, in which case the locator names the repository root
/// at the given ref.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub org: String,
    pub repo: String,
    pub git_ref: String,
    pub path: String,
}

impl Locator {
    pub fn new(
        org: impl Into<String>,
        repo: impl Into<String>,
        git_ref: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            git_ref: git_ref.into(),
            path: path.into(),
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        let tokens: Vec<&str> = value.split('/').collect();
        if tokens.len() < 3 || tokens[..3].iter().any(|t| t.is_empty()) {
            return Err(ClientError::InvalidLocator(value.to_string()));
        }

        Ok(Self::new(
            tokens[0],
            tokens[1],
            tokens[2],
            tokens[3..].join("/"),
        ))
    }

    /// Locator of `filename` inside this folder.
    pub fn join(&self, filename: &str) -> Self {
        let path = if self.path.is_empty() {
            filename.to_string()
        } else {
            format!("{}/{}", self.path.trim_end_matches('/'), filename)
        };

        Self {
            path,
            ..self.clone()
        }
    }

    /// Last path segment, or the full path if it has none.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.path.is_empty() {
            return None;
        }

        let parent = match self.path.rfind('/') {
            Some(index) => self.path[..index].to_string(),
            None => String::new(),
        };

        Some(Self {
            path: parent,
            ..self.clone()
        })
    }

    pub fn path_segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.org, self.repo, self.git_ref, self.path)
    }
}

impl FromStr for Locator {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_locator() {
        let locator = Locator::parse("jgraph/drawio/main/docs/diagram.xml").unwrap();
        assert_eq!(locator.org, "jgraph");
        assert_eq!(locator.repo, "drawio");
        assert_eq!(locator.git_ref, "main");
        assert_eq!(locator.path, "docs/diagram.xml");
        assert_eq!(locator.file_name(), "diagram.xml");
        assert_eq!(locator.to_string(), "jgraph/drawio/main/docs/diagram.xml");
    }

    #[test]
    fn test_parse_root_folder() {
        let locator = Locator::parse("a/b/dev").unwrap();
        assert_eq!(locator.path, "");
        assert_eq!(locator.to_string(), "a/b/dev/");
        assert!(locator.parent().is_none());
    }

    #[test]
    fn test_parse_rejects_short_locators() {
        assert!(Locator::parse("a/b").is_err());
        assert!(Locator::parse("a//main/f.txt").is_err());
        assert!(Locator::parse("").is_err());
    }

    #[test]
    fn test_join() {
        let root = Locator::parse("a/b/main/").unwrap();
        assert_eq!(root.join("f.txt").path, "f.txt");

        let folder = Locator::parse("a/b/main/docs/").unwrap();
        assert_eq!(folder.join("f.txt").path, "docs/f.txt");
    }

    #[test]
    fn test_parent() {
        let locator = Locator::parse("a/b/main/docs/f.txt").unwrap();
        let parent = locator.parent().unwrap();
        assert_eq!(parent.path, "docs");
        assert_eq!(parent.parent().unwrap().path, "");
    }
}
