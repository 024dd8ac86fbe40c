//! Sequence allocation module: three-layer architecture (errors, store, service).
//!
//! Every "add" path of the content backend draws its public `<entity>_id`
//! from here. The store is the single source of truth; no counter state is
//! ever held in process memory on production paths.

pub mod errors;
pub mod seaorm;
pub mod service;
pub mod store;

pub use errors::SequenceError;
pub use seaorm::SeaOrmCounterStore;
pub use service::SequenceAllocator;
pub use store::CounterStore;
