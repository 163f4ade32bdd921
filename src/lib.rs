pub mod app;
pub mod cancel;
pub mod config;
pub mod models;
pub mod omdb;
pub mod pagination;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod watched;
