use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "facesync", about = "Keep a face-embedding store in sync with its dataset")]
pub struct Cli {
    /// Dataset root [env: FACESYNC_DATASET_DIR]
    #[arg(long, global = true)]
    pub dataset: Option<PathBuf>,
    /// Embedding store file [env: FACESYNC_STORE_PATH]
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
    /// ONNX embedding model [env: FACESYNC_MODEL_PATH]
    #[arg(long, global = true)]
    pub model: Option<PathBuf>,
    /// Warn about and skip folders not named `{name}_{face_id}`
    #[arg(long, global = true)]
    pub skip_bad_names: bool,
    /// Warn about and skip images that fail to decode
    #[arg(long, global = true)]
    pub skip_unreadable: bool,
    /// Fail when two folders share an identity name
    #[arg(long, global = true)]
    pub reject_duplicates: bool,
    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Create an empty embedding store
    Init {
        /// Overwrite an existing store
        #[arg(long)]
        force: bool,
    },
    /// Show which dataset identities are missing from the store
    Status,
    /// Embed the missing identities and save the store
    Extract {
        /// Report what would be embedded without loading the model
        #[arg(long)]
        dry_run: bool,
        /// Rebuild the store from every identity instead of only the missing ones
        #[arg(long)]
        all: bool,
    },
}
