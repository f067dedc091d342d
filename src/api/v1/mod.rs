//! API Version 1 endpoints

pub mod analytics;
pub mod categories;
pub mod contact;
pub mod login;
pub mod player;
pub mod routes;
pub mod settings;
pub mod videos;
