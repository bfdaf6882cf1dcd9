//! Build workflow for sift.
//!
//! Implements the import and index stages as treadle `Stage`
//! implementations, plus configuration loading and embedder construction.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod embedder;
pub mod error;
pub mod import;
pub mod index_stage;
pub mod pipeline;
pub mod work_item;

pub use config::{Config, EmbedderConfig, EmbedderKind};
pub use embedder::{embedder_from_config, HttpEmbedder};
pub use error::{PipelineError, PipelineResult};
pub use import::ImportStage;
pub use index_stage::{IndexReport, IndexStage};
pub use pipeline::build_pipeline;
pub use work_item::BuildJob;
