use std::path::PathBuf;

#[derive(clap::Parser, Debug)]
#[clap(name = "gitpad", version, about = "Open and save diagrams stored in GitHub repositories")]
pub struct Cli {
    /// Answer yes to every confirmation
    #[clap(long, short = 'y', global = true)]
    pub yes: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Sign in to GitHub
    Login {
        /// Keep the access token for later sessions
        #[clap(long)]
        remember: bool,
    },
    /// Forget the access token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List repositories, branches or folder contents
    Ls {
        /// `org/repo` for branches, `org/repo/ref[/path]` for a folder
        locator: Option<String>,
    },
    /// Print a file
    Cat {
        /// `org/repo/ref/path`
        locator: String,
        /// Open the file as a shape library
        #[clap(long)]
        library: bool,
    },
    /// Upload a local file, creating or updating the remote copy
    Push {
        /// Local file to upload
        file: PathBuf,
        /// `org/repo/ref/path` of the remote file
        locator: String,
        /// Commit message (prompted for when omitted)
        #[clap(long, short = 'm')]
        message: Option<String>,
        /// Write as a shape library instead of a document
        #[clap(long)]
        library: bool,
    },
    /// Manage configuration
    Config {
        #[clap(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum ConfigCommands {
    /// Set a configuration value
    Set { key: String, value: String },
    /// Get a configuration value
    Get { key: String },
    /// Show all configuration
    Show,
    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation prompt
        #[clap(long)]
        force: bool,
    },
}
