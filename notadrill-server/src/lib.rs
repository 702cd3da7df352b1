pub mod config;
pub mod envelope;
pub mod errors;
pub mod file_server;
pub mod http;
pub mod selector;
pub mod server;
