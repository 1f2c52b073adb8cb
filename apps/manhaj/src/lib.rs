//! # manhaj
//!
//! The Manhaj application: HTTP API, CLI and configuration layered over
//! `manhaj-core`. The binary in `main.rs` only sets up logging and hands the
//! parsed command line to [`cli::execute`].

pub mod api;
pub mod cli;
pub mod config;
