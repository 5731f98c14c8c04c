//! # Terra CLI
//!
//! Signs in with Google credentials taken from the environment, keeps the
//! session in the platform data directory and prints ID tokens for use with
//! other Terra tooling.

pub mod cli;
pub mod error;
pub mod output;

pub use cli::*;
pub use error::*;
