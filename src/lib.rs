//! Skill Swap Backend Library
//!
//! This library exports the core modules for the Skill Swap backend server.

pub mod admin;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod feedback;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notifications;
pub mod routes;
pub mod state;
pub mod swaps;
pub mod users;
pub mod websocket;
