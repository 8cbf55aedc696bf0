//! Handling of files that already exist or changed remotely.

use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::gateway::RepoFileGateway;
use crate::interaction::{Interaction, messages};
use crate::locator::Locator;

/// What to do about a target that may already exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExistsResolution {
    /// Nothing is there yet.
    Create,
    /// The user agreed to replace the file at this version.
    Replace { sha: String },
    Declined,
}

impl ExistsResolution {
    pub fn proceeds(&self) -> bool {
        !matches!(self, ExistsResolution::Declined)
    }

    pub fn sha(&self) -> Option<&str> {
        match self {
            ExistsResolution::Replace { sha } => Some(sha.as_str()),
            _ => None,
        }
    }
}

pub struct ConflictResolver<'a> {
    gateway: &'a RepoFileGateway,
    interaction: &'a dyn Interaction,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(gateway: &'a RepoFileGateway, interaction: &'a dyn Interaction) -> Self {
        Self {
            gateway,
            interaction,
        }
    }

    /// Looks for an existing file at `target`.
    ///
    /// A missing file resolves to [`ExistsResolution::Create`]. An existing one
    /// is either offered for replacement (`ask_replace`) or reported as an
    /// error notice and declined.
    ///
    /// Failures other than "not found" are returned as-is rather than read as
    /// a missing file, so a server error or a timeout never leads to a create
    /// that would clobber an existing file.
    pub async fn check_exists(
        &self,
        target: &Locator,
        ask_replace: bool,
    ) -> Result<ExistsResolution> {
        let existing = match self.gateway.stat(target).await {
            Ok(item) => item,
            Err(ClientError::NotFound(_)) => return Ok(ExistsResolution::Create),
            Err(err) => return Err(err),
        };

        if !ask_replace {
            self.interaction
                .notify(messages::ERROR, messages::FILE_EXISTS)
                .await;
            return Ok(ExistsResolution::Declined);
        }

        if self
            .interaction
            .confirm(&messages::replace_it(&target.path))
            .await
        {
            debug!("Replacing {} at {}", target, existing.sha);
            Ok(ExistsResolution::Replace { sha: existing.sha })
        } else {
            Ok(ExistsResolution::Declined)
        }
    }

    /// Asks whether a rejected save may overwrite the remote version and, if
    /// so, returns the remote's current SHA to write against.
    ///
    /// Declining hands back `rejected` unchanged.
    pub async fn overwrite_sha(&self, target: &Locator, rejected: ClientError) -> Result<String> {
        warn!("{} changed remotely", target);

        if !self
            .interaction
            .confirm(messages::FILE_CHANGED_OVERWRITE)
            .await
        {
            return Err(rejected);
        }

        let current = self.gateway.stat(target).await?;
        debug!("Overwriting {} at {}", target, current.sha);
        Ok(current.sha)
    }
}
