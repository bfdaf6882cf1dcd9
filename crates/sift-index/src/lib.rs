//! Vector search for sift.
//!
//! Builds, persists, and queries exact (flat) similarity indices over unit
//! length embeddings of dataset row names.
//!
//! ```text
//! build:  rows ──▶ Embedder ──▶ normalize ──▶ Index ──▶ IndexStore
//! query:  text ──▶ Embedder ──▶ normalize ──▶ QueryEngine ──▶ [SearchHit]
//! ```

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod backend;
pub mod builder;
pub mod context;
pub mod embed;
pub mod engine;
pub mod error;
pub mod format;
pub mod index;
pub mod normalize;
pub mod store;

pub use backend::{FlatBackend, ScoredRow, SimilarityBackend};
pub use builder::{BuildOutput, IndexBuilder};
pub use context::SearchContext;
pub use embed::{Embedder, HashingEmbedder};
pub use engine::{QueryEngine, SearchHit};
pub use error::{EmbedError, IndexError, IndexResult};
pub use index::{Index, Matrix};
pub use normalize::{normalize, DegenerateVector, UnitVector};
pub use store::IndexStore;
