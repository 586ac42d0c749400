use ndarray::Array3;
use std::path::PathBuf;

/// A person in the dataset, parsed from a `{name}_{face_id}` directory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub face_id: String,
}

impl Identity {
    /// Directory name this identity is stored under.
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.name, self.face_id)
    }
}

/// Face embedding vector produced by an [`EmbeddingModel`](crate::EmbeddingModel).
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "mobilenetv2").
    pub model_version: Option<String>,
}

impl Embedding {
    /// L2-normalize in place. Zero vectors are left untouched.
    pub fn l2_normalize(&mut self) {
        let norm: f32 = self.values.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }
    }
}

/// One decoded image belonging to an identity.
#[derive(Debug, Clone)]
pub struct FacePixelRecord {
    /// Image file name within the identity folder (e.g., "a.jpg").
    pub image_id: String,
    pub image_path: PathBuf,
    /// Decoded RGB pixels, shape (height, width, 3).
    pub pixels: Array3<u8>,
    pub name: String,
    pub face_id: String,
}

/// What to do with a dataset directory that doesn't follow `{name}_{face_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamePolicy {
    /// Fail the listing with [`DatasetError::DirectoryName`](crate::DatasetError::DirectoryName).
    #[default]
    Strict,
    /// Log a warning and leave the directory out.
    Skip,
}

/// What to do when two directories parse to the same identity name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// The directory visited last (lexicographic order) wins.
    #[default]
    LastWins,
    /// Fail the listing with [`DatasetError::DuplicateIdentity`](crate::DatasetError::DuplicateIdentity).
    Reject,
}

/// What to do with a file that can't be decoded as an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Abort the whole batch on the first failure.
    #[default]
    Abort,
    /// Log a warning and continue without the file.
    Skip,
}

/// Knobs for listing and collecting a dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    pub names: NamePolicy,
    pub duplicates: DuplicatePolicy,
    pub decode: DecodePolicy,
}
