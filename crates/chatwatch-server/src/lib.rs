//! Chatwatch server library: configuration, shared state, the background
//! coordinator and its HTTP routes. Kept apart from main.rs for integration
//! testing.

pub mod config;
pub mod coordinator;
pub mod logging;
pub mod notifications;
pub mod routes;
pub mod settings_store;
pub mod state;
