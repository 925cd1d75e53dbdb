pub mod api;
pub mod app;
pub mod auth;
pub mod core;
pub mod data;
pub mod utils;
