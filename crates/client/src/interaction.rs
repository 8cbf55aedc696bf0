//! User-facing prompts the client needs while saving or creating files.
//!
//! The host renders these however it likes; the client only needs answers.

use async_trait::async_trait;

#[async_trait]
pub trait Interaction: Send + Sync {
    /// Asks for a line of text. `None` means the user cancelled.
    async fn prompt(&self, message: &str, default: &str) -> Option<String>;

    /// Asks a yes/no question.
    async fn confirm(&self, message: &str) -> bool;

    /// Shows a blocking notice and returns once it has been acknowledged.
    async fn notify(&self, title: &str, message: &str);
}

pub mod messages {
    pub const COMMIT_MESSAGE: &str = "Commit message";
    pub const ERROR: &str = "Error";
    pub const FILE_EXISTS: &str = "File already exists";
    pub const ERROR_SAVING_FILE: &str = "Error saving file";
    pub const FILE_CHANGED_OVERWRITE: &str =
        "The file has been modified. Do you want to overwrite the changes?";

    /// Default commit message for a save.
    pub fn commit_default(filename: &str, is_new: bool) -> String {
        if is_new {
            format!("Added {}", filename)
        } else {
            format!("Updated {}", filename)
        }
    }

    pub fn replace_it(path: &str) -> String {
        format!("{} already exists. Do you want to replace it?", path)
    }

}
