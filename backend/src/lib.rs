pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod notify;
pub mod services;
pub mod state;
pub mod store;
