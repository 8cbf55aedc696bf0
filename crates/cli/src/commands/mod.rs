pub mod auth;
pub mod config;
pub mod files;

pub use auth::{handle_login_command, handle_logout_command, handle_whoami_command};
pub use config::handle_config_command;
pub use files::{handle_cat_command, handle_ls_command, handle_push_command};
