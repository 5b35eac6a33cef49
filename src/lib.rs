pub mod blocker;
pub mod bridge;
pub mod config;
pub mod directory;
pub mod init;
pub mod intel;
pub mod number;
pub mod stats;
pub mod store;
