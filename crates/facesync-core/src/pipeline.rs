//! Incremental embedding extraction.
//!
//! [`plan`] reads the store and the dataset and works out which identities are
//! new; [`extract`] decodes their images, normalizes them as one batch, runs
//! the embedding model and appends the results to the in-memory store.
//! [`rebuild`] does the same for every identity on disk into a fresh store.
//! Saving the store is left to the caller.

use crate::dataset::{self, DatasetError, Identities};
use crate::embedder::{EmbedError, EmbeddingModel};
use crate::normalize::{self, NormalizeError};
use crate::reconcile::compute_remaining;
use crate::store::{self, EmbeddingStore, StoreError};
use crate::types::ReconcileOptions;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),
    #[error("normalize error: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("embedding error: {0}")]
    Embed(#[from] EmbedError),
    #[error("model returned {embeddings} embeddings for {images} images")]
    EmbeddingCountMismatch { images: usize, embeddings: usize },
}

/// Store, dataset listing and the delta between them.
#[derive(Debug, Clone)]
pub struct Plan {
    pub store: EmbeddingStore,
    pub known_names: BTreeSet<String>,
    pub identities: Identities,
    pub remaining: BTreeSet<String>,
}

/// Outcome of an [`extract`] or [`rebuild`] run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractReport {
    /// True when the store was rebuilt from every identity.
    pub rebuild: bool,
    /// Identities embedded in this run, sorted.
    pub identities: Vec<String>,
    pub images: usize,
    /// Store entries after the run.
    pub store_entries: usize,
}

/// Load the store and the dataset, and compute the remaining identities.
pub fn plan(
    store_path: &Path,
    dataset_root: &Path,
    opts: &ReconcileOptions,
) -> Result<Plan, PipelineError> {
    let (store, known_names) = store::load_store(store_path)?;
    let identities = dataset::list_identities(dataset_root, opts)?;
    let remaining = compute_remaining(&identities, &known_names);

    tracing::info!(
        known = known_names.len(),
        dataset = identities.len(),
        remaining = remaining.len(),
        "reconciled store against dataset"
    );

    Ok(Plan {
        store,
        known_names,
        identities,
        remaining,
    })
}

/// Embed every remaining identity and append the results to `plan.store`.
///
/// No remaining identities is not an error: the report comes back empty and
/// the store is untouched.
pub fn extract<M: EmbeddingModel + ?Sized>(
    plan: &mut Plan,
    model: &mut M,
    opts: &ReconcileOptions,
) -> Result<ExtractReport, PipelineError> {
    let (embedded, images) =
        embed_into(&mut plan.store, &plan.identities, &plan.remaining, model, opts)?;

    plan.known_names.extend(embedded.iter().cloned());
    plan.remaining.retain(|name| !embedded.contains(name));

    Ok(ExtractReport {
        rebuild: false,
        identities: embedded.into_iter().collect(),
        images,
        store_entries: plan.store.len(),
    })
}

/// Re-embed every identity in the dataset into a fresh store, replacing `plan.store`.
///
/// Old entries are dropped, including names no longer on disk. If the dataset
/// yields no images at all the existing store is kept as is.
pub fn rebuild<M: EmbeddingModel + ?Sized>(
    plan: &mut Plan,
    model: &mut M,
    opts: &ReconcileOptions,
) -> Result<ExtractReport, PipelineError> {
    let mut fresh = EmbeddingStore::empty();
    let (embedded, images) =
        embed_into(&mut fresh, &plan.identities, plan.identities.names(), model, opts)?;

    if images == 0 {
        return Ok(ExtractReport {
            rebuild: true,
            store_entries: plan.store.len(),
            ..Default::default()
        });
    }

    tracing::info!(
        replaced = plan.store.len(),
        entries = fresh.len(),
        "rebuilt embedding store"
    );
    plan.store = fresh;
    plan.known_names = embedded.clone();
    plan.remaining = compute_remaining(&plan.identities, &plan.known_names);

    Ok(ExtractReport {
        rebuild: true,
        identities: embedded.into_iter().collect(),
        images,
        store_entries: plan.store.len(),
    })
}

/// Collect, normalize and embed the images of `names`, appending to `store`.
///
/// Nothing is appended unless the model returns one embedding per image.
/// Returns the identities that got at least one embedding and the image count.
fn embed_into<M, I, S>(
    store: &mut EmbeddingStore,
    identities: &Identities,
    names: I,
    model: &mut M,
    opts: &ReconcileOptions,
) -> Result<(BTreeSet<String>, usize), PipelineError>
where
    M: EmbeddingModel + ?Sized,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let records = dataset::collect_pixels(identities, names, opts)?;
    if records.is_empty() {
        tracing::info!("no new images to embed");
        return Ok((BTreeSet::new(), 0));
    }

    let pixels: Vec<_> = records.iter().map(|r| r.pixels.view()).collect();
    let batch = normalize::normalize(&pixels)?;
    let embeddings = model.embed(&batch)?;

    if embeddings.len() != records.len() {
        return Err(PipelineError::EmbeddingCountMismatch {
            images: records.len(),
            embeddings: embeddings.len(),
        });
    }

    let mut embedded = BTreeSet::new();
    for (record, embedding) in records.iter().zip(embeddings) {
        tracing::debug!(
            name = %record.name,
            face_id = %record.face_id,
            image = %record.image_id,
            "embedded image"
        );
        store.append(&record.name, embedding);
        embedded.insert(record.name.clone());
    }

    tracing::info!(
        identities = embedded.len(),
        images = records.len(),
        model = model.model_version().unwrap_or("unknown"),
        "appended embeddings to store"
    );

    Ok((embedded, records.len()))
}
