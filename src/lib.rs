//! People, task and time-entry accounting over PostgreSQL, served as a JSON
//! HTTP API.

pub mod config;
pub mod context;
pub mod db;
pub mod error_handler;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod schema;
pub mod services;
