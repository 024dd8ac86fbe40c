pub mod db;
pub mod sequence_counter;
pub mod sequence_key;

pub use sequence_key::SequenceKey;
