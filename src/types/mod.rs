// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to keep disk, transfer and storage domain IDs apart.

mod alias;
mod correlation;
mod id;

pub use alias::{DiskAlias, DiskAliasError};
pub use correlation::CorrelationId;
pub use id::{DiskId, Id, StorageDomainId, TransferId};
