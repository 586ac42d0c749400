//! facesync-core — Incremental face-embedding extraction.
//!
//! Reconciles a persisted embedding store against a dataset of per-person
//! image folders, decodes the images of identities not yet embedded,
//! normalizes them as one batch and runs them through an embedding model.

pub mod dataset;
pub mod embedder;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod store;
pub mod types;

pub use dataset::{collect_pixels, list_identities, parse_dir_name, DatasetError, DirNameError, Identities};
pub use embedder::{EmbedError, EmbeddingModel, OnnxEmbedder};
pub use normalize::{normalize, NormalizeError};
pub use pipeline::{extract, plan, rebuild, ExtractReport, PipelineError, Plan};
pub use reconcile::compute_remaining;
pub use store::{init_store, load_store, save_store, EmbeddingStore, StoreError};
pub use types::{
    DecodePolicy, DuplicatePolicy, Embedding, FacePixelRecord, Identity, NamePolicy,
    ReconcileOptions,
};
