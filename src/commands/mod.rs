// ABOUTME: Command module aggregator for the diskpush CLI.
// ABOUTME: Re-exports detect and upload command handlers.

mod detect;
mod upload;

pub use detect::detect;
pub use upload::upload;
