//! Service layer for public-ID allocation on top of the counter store.
//! - Hands out unique, increasing integers per entity kind to concurrent writers.
//! - Reuses the counter entity and key definitions in the `models` crate.
//! - Provides clear error types and a best-effort compensation primitive.

pub mod sequence;
#[cfg(test)]
pub mod test_support;

pub use sequence::SequenceAllocator;
