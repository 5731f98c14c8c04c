//! Command handlers for the Terra CLI

pub mod auth;
pub mod config;
