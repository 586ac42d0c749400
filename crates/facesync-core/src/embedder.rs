//! Face embedding model via ONNX Runtime.
//!
//! The model itself is opaque: it takes one normalized (1, H, W, C) image and
//! returns a flat feature vector. Anything implementing [`EmbeddingModel`] can
//! stand in for it.

use crate::types::Embedding;
use ndarray::{Array4, Axis};
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("model file not found: {0} — provide the correct path to the embedding model")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Maps a normalized image batch to one embedding per image.
pub trait EmbeddingModel {
    /// Version tag recorded alongside stored embeddings.
    fn model_version(&self) -> Option<&str>;

    /// Embed every image of an (N, H, W, C) batch, in row order.
    fn embed(&mut self, batch: &Array4<f32>) -> Result<Vec<Embedding>, EmbedError>;
}

/// ONNX-backed embedding model.
pub struct OnnxEmbedder {
    session: Session,
    version: String,
}

impl OnnxEmbedder {
    /// Load an ONNX model from the given path. The file stem becomes the version tag.
    pub fn load(model_path: &Path) -> Result<Self, EmbedError> {
        if !model_path.exists() {
            return Err(EmbedError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = %model_path.display(),
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded embedding model"
        );

        let version = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(Self { session, version })
    }
}

impl EmbeddingModel for OnnxEmbedder {
    fn model_version(&self) -> Option<&str> {
        Some(&self.version)
    }

    fn embed(&mut self, batch: &Array4<f32>) -> Result<Vec<Embedding>, EmbedError> {
        let mut embeddings = Vec::with_capacity(batch.len_of(Axis(0)));

        // One image per run: exported models don't always have a dynamic batch axis.
        for (i, image) in batch.axis_iter(Axis(0)).enumerate() {
            let input = image.insert_axis(Axis(0));
            let input = input.as_standard_layout();
            let outputs = self
                .session
                .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

            let (_, raw) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| EmbedError::InferenceFailed(format!("image {i}: {e}")))?;

            if raw.is_empty() {
                return Err(EmbedError::InferenceFailed(format!(
                    "image {i}: model returned an empty embedding"
                )));
            }

            let mut embedding = Embedding {
                values: raw.to_vec(),
                model_version: Some(self.version.clone()),
            };
            embedding.l2_normalize();
            embeddings.push(embedding);
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_model() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embedding.onnx");
        match OnnxEmbedder::load(&path) {
            Err(EmbedError::ModelNotFound(p)) => assert!(p.ends_with("embedding.onnx")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("loaded a model that does not exist"),
        }
    }
}
