pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod helpers;
pub mod middleware;

pub use app::{router, AppState};
