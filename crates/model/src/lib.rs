pub mod config;
pub mod creds;
pub mod env_file;
pub mod messages;
pub mod settings;
pub mod stream;
