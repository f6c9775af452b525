// ABOUTME: Capability traits for the management API.
// ABOUTME: DiskOps provisions disks, TransferOps negotiates and drives image transfers.

mod disk;
mod shared_types;
mod transfer;

pub use disk::{DiskError, DiskOps};
pub use shared_types::*;
pub use transfer::{TransferError, TransferOps};
