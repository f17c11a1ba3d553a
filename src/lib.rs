pub mod config;
pub mod error;
pub mod flatten;
pub mod infer;
pub mod namespace;
pub mod navigator;
pub mod profile;
pub mod provider;
pub mod render;
pub mod scanner;
pub mod server;
pub mod session;
pub mod symbol;
pub mod syntax;
