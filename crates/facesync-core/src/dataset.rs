//! Dataset directory listing and image collection.
//!
//! Layout: `dataset_root/{name}_{face_id}/*.{jpg,png,...}`, one folder per
//! identity. Directories and files are visited in lexicographic order so
//! results are reproducible regardless of what `read_dir` returns.

use crate::types::{
    DecodePolicy, DuplicatePolicy, FacePixelRecord, Identity, NamePolicy, ReconcileOptions,
};
use ndarray::Array3;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const NAME_SEPARATOR: char = '_';

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("failed to list {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("directory {dir:?} is not named `{{name}}_{{face_id}}`: {reason}")]
    DirectoryName { dir: String, reason: DirNameError },
    #[error("identity {name:?} appears twice: {first} and {second}")]
    DuplicateIdentity {
        name: String,
        first: String,
        second: String,
    },
    #[error("identity {0:?} is not in the dataset listing")]
    UnknownIdentity(String),
    #[error("failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("unexpected pixel layout in {path}: {source}")]
    PixelLayout {
        path: PathBuf,
        source: ndarray::ShapeError,
    },
}

/// Why a directory name failed to parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirNameError {
    #[error("no `_` separator")]
    NoSeparator,
    #[error("empty name")]
    EmptyName,
    #[error("empty face id")]
    EmptyFaceId,
    #[error("not valid UTF-8")]
    NotUtf8,
}

/// Parse `{name}_{face_id}`, splitting on the first separator.
pub fn parse_dir_name(dir: &str) -> Result<Identity, DirNameError> {
    let (name, face_id) = dir
        .split_once(NAME_SEPARATOR)
        .ok_or(DirNameError::NoSeparator)?;
    if name.is_empty() {
        return Err(DirNameError::EmptyName);
    }
    if face_id.is_empty() {
        return Err(DirNameError::EmptyFaceId);
    }
    Ok(Identity {
        name: name.to_string(),
        face_id: face_id.to_string(),
    })
}

/// Identities found under a dataset root, keyed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identities {
    root: PathBuf,
    by_name: BTreeMap<String, String>,
}

impl Identities {
    /// Build a mapping by hand; mostly useful for callers that already know the layout.
    pub fn new(root: impl Into<PathBuf>, by_name: BTreeMap<String, String>) -> Self {
        Self {
            root: root.into(),
            by_name,
        }
    }

    /// Name to face id mapping.
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.by_name
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<Identity> {
        self.by_name.get(name).map(|face_id| Identity {
            name: name.to_string(),
            face_id: face_id.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Folder holding the images of `identity`.
    pub fn folder(&self, identity: &Identity) -> PathBuf {
        self.root.join(identity.dir_name())
    }
}

/// List the immediate subdirectories of `root` as identities.
pub fn list_identities(
    root: &Path,
    opts: &ReconcileOptions,
) -> Result<Identities, DatasetError> {
    let root = std::fs::canonicalize(root).map_err(|e| DatasetError::Io {
        path: root.to_path_buf(),
        source: e,
    })?;

    let mut by_name: BTreeMap<String, String> = BTreeMap::new();

    for (file_name, path) in sorted_entries(&root)? {
        if !path.is_dir() {
            tracing::debug!(path = %path.display(), "ignoring non-directory in dataset root");
            continue;
        }

        let parsed = file_name
            .to_str()
            .ok_or(DirNameError::NotUtf8)
            .and_then(parse_dir_name);
        let identity = match (parsed, opts.names) {
            (Ok(identity), _) => identity,
            (Err(reason), NamePolicy::Skip) => {
                tracing::warn!(dir = ?file_name, %reason, "skipping malformed dataset directory");
                continue;
            }
            (Err(reason), NamePolicy::Strict) => {
                return Err(DatasetError::DirectoryName {
                    dir: file_name.to_string_lossy().into_owned(),
                    reason,
                });
            }
        };

        if let Some(previous) = by_name.get(&identity.name) {
            let first = format!("{}_{}", identity.name, previous);
            match opts.duplicates {
                DuplicatePolicy::Reject => {
                    return Err(DatasetError::DuplicateIdentity {
                        name: identity.name.clone(),
                        first,
                        second: identity.dir_name(),
                    });
                }
                DuplicatePolicy::LastWins => {
                    tracing::warn!(
                        name = %identity.name,
                        replaced = %first,
                        kept = %identity.dir_name(),
                        "duplicate identity name; keeping the later directory"
                    );
                }
            }
        }
        by_name.insert(identity.name, identity.face_id);
    }

    tracing::info!(root = %root.display(), identities = by_name.len(), "listed dataset");
    Ok(Identities { root, by_name })
}

/// Decode every image belonging to `names`, in the order given.
///
/// An empty `names` returns an empty batch without touching the filesystem.
pub fn collect_pixels<I, S>(
    identities: &Identities,
    names: I,
    opts: &ReconcileOptions,
) -> Result<Vec<FacePixelRecord>, DatasetError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut records = Vec::new();

    for name in names {
        let name = name.as_ref();
        let identity = identities
            .get(name)
            .ok_or_else(|| DatasetError::UnknownIdentity(name.to_string()))?;
        let folder = identities.folder(&identity);
        let before = records.len();

        for (file_name, path) in sorted_entries(&folder)? {
            if !path.is_file() {
                continue;
            }
            let pixels = match decode_image(&path) {
                Ok(pixels) => pixels,
                Err(e) if opts.decode == DecodePolicy::Skip => {
                    tracing::warn!(error = %e, "skipping undecodable image");
                    continue;
                }
                Err(e) => return Err(e),
            };
            records.push(FacePixelRecord {
                image_id: file_name.to_string_lossy().into_owned(),
                image_path: path,
                pixels,
                name: identity.name.clone(),
                face_id: identity.face_id.clone(),
            });
        }

        let collected = records.len() - before;
        if collected == 0 {
            tracing::warn!(
                name = %identity.name,
                folder = %folder.display(),
                "identity has no decodable images; it stays unembedded"
            );
        } else {
            tracing::debug!(
                name = %identity.name,
                face_id = %identity.face_id,
                images = collected,
                "collected identity images"
            );
        }
    }

    Ok(records)
}

/// Decode an image file into an RGB (height, width, 3) array.
pub fn decode_image(path: &Path) -> Result<Array3<u8>, DatasetError> {
    let rgb = image::open(path)
        .map_err(|e| DatasetError::ImageDecode {
            path: path.to_path_buf(),
            source: e,
        })?
        .to_rgb8();

    let (width, height) = rgb.dimensions();
    Array3::from_shape_vec((height as usize, width as usize, 3), rgb.into_raw()).map_err(|e| {
        DatasetError::PixelLayout {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

fn sorted_entries(dir: &Path) -> Result<Vec<(std::ffi::OsString, PathBuf)>, DatasetError> {
    let io_err = |e| DatasetError::Io {
        path: dir.to_path_buf(),
        source: e,
    };
    let mut entries = std::fs::read_dir(dir)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| (e.file_name(), e.path())))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}
