// ABOUTME: Library root for diskpush - exposes the upload subsystem and its ports.
// ABOUTME: The command-line front end is in main.rs.

pub mod api;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod image;
pub mod output;
pub mod types;
pub mod upload;
