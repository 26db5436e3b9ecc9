pub mod accept;
pub mod auth;
pub mod health;
pub mod messages;
pub mod models;
