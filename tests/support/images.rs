// ABOUTME: In-memory image builders for detection and upload tests.
// ABOUTME: Produces RAW payloads and COW headers with a chosen virtual size.

use diskpush::image::{COW_MAGIC, VIRTUAL_SIZE_OFFSET};

/// A RAW image of `len` bytes that does not start with the COW magic.
pub fn raw_image(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8 + 1).collect()
}

/// A COW image declaring `virtual_size`, padded to `len` bytes.
pub fn cow_image(virtual_size: u64, len: usize) -> Vec<u8> {
    let mut image = vec![0u8; len.max(VIRTUAL_SIZE_OFFSET + 8)];
    image[..4].copy_from_slice(&COW_MAGIC);
    image[7] = 3;
    image[VIRTUAL_SIZE_OFFSET..VIRTUAL_SIZE_OFFSET + 8].copy_from_slice(&virtual_size.to_be_bytes());
    image
}
