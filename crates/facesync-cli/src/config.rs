use crate::cli::Cli;
use facesync_core::{DecodePolicy, DuplicatePolicy, NamePolicy, ReconcileOptions};
use std::path::PathBuf;

/// CLI configuration, loaded from environment variables.
pub struct Config {
    /// Dataset root holding one `{name}_{face_id}` folder per identity (default: ./dataset).
    pub dataset_dir: PathBuf,
    /// Path to the JSON embedding store.
    pub store_path: PathBuf,
    /// Path to the ONNX embedding model.
    pub model_path: PathBuf,
    /// Fail on dataset folders that don't parse as `{name}_{face_id}`.
    pub strict_names: bool,
    /// Skip images that fail to decode instead of aborting the run.
    pub skip_unreadable: bool,
    /// Fail when two folders share an identity name.
    pub reject_duplicates: bool,
}

impl Config {
    /// Load configuration from `FACESYNC_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str, default: &str| {
            var(key)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };

        Self {
            dataset_dir: path("FACESYNC_DATASET_DIR", "dataset"),
            store_path: path("FACESYNC_STORE_PATH", "embeddings.json"),
            model_path: path("FACESYNC_MODEL_PATH", "models/embedding.onnx"),
            strict_names: flag(var("FACESYNC_STRICT_NAMES"), true),
            skip_unreadable: flag(var("FACESYNC_SKIP_UNREADABLE"), false),
            reject_duplicates: flag(var("FACESYNC_REJECT_DUPLICATES"), false),
        }
    }

    /// Apply command-line overrides on top of the environment.
    pub fn apply(&mut self, cli: &Cli) {
        if let Some(p) = &cli.dataset {
            self.dataset_dir = p.clone();
        }
        if let Some(p) = &cli.store {
            self.store_path = p.clone();
        }
        if let Some(p) = &cli.model {
            self.model_path = p.clone();
        }
        if cli.skip_bad_names {
            self.strict_names = false;
        }
        if cli.skip_unreadable {
            self.skip_unreadable = true;
        }
        if cli.reject_duplicates {
            self.reject_duplicates = true;
        }
    }

    /// Reconciler policies derived from the flags.
    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            names: if self.strict_names {
                NamePolicy::Strict
            } else {
                NamePolicy::Skip
            },
            duplicates: if self.reject_duplicates {
                DuplicatePolicy::Reject
            } else {
                DuplicatePolicy::LastWins
            },
            decode: if self.skip_unreadable {
                DecodePolicy::Skip
            } else {
                DecodePolicy::Abort
            },
        }
    }
}

/// Any value other than "0" enables the flag.
fn flag(value: Option<String>, default: bool) -> bool {
    value.map(|v| v != "0").unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Commands;
    use clap::Parser;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.dataset_dir, PathBuf::from("dataset"));
        assert_eq!(cfg.store_path, PathBuf::from("embeddings.json"));
        assert_eq!(cfg.model_path, PathBuf::from("models/embedding.onnx"));

        let opts = cfg.reconcile_options();
        assert_eq!(opts.names, NamePolicy::Strict);
        assert_eq!(opts.duplicates, DuplicatePolicy::LastWins);
        assert_eq!(opts.decode, DecodePolicy::Abort);
    }

    #[test]
    fn test_env_overrides() {
        let cfg = config(&[
            ("FACESYNC_DATASET_DIR", "/data/faces"),
            ("FACESYNC_STRICT_NAMES", "0"),
            ("FACESYNC_SKIP_UNREADABLE", "1"),
            ("FACESYNC_REJECT_DUPLICATES", "yes"),
        ]);
        assert_eq!(cfg.dataset_dir, PathBuf::from("/data/faces"));

        let opts = cfg.reconcile_options();
        assert_eq!(opts.names, NamePolicy::Skip);
        assert_eq!(opts.duplicates, DuplicatePolicy::Reject);
        assert_eq!(opts.decode, DecodePolicy::Skip);
    }

    fn with_args(vars: &[(&str, &str)], args: &[&str]) -> Config {
        let cli = Cli::try_parse_from(std::iter::once("facesync").chain(args.iter().copied()))
            .unwrap();
        let mut cfg = config(vars);
        cfg.apply(&cli);
        cfg
    }

    #[test]
    fn test_flags_override_env_paths() {
        let cfg = with_args(
            &[
                ("FACESYNC_DATASET_DIR", "/env/dataset"),
                ("FACESYNC_STORE_PATH", "/env/store.json"),
                ("FACESYNC_MODEL_PATH", "/env/model.onnx"),
            ],
            &["--dataset", "/cli/dataset", "--store", "/cli/store.json", "status"],
        );
        assert_eq!(cfg.dataset_dir, PathBuf::from("/cli/dataset"));
        assert_eq!(cfg.store_path, PathBuf::from("/cli/store.json"));
        // No --model flag: the environment value stands.
        assert_eq!(cfg.model_path, PathBuf::from("/env/model.onnx"));
    }

    #[test]
    fn test_skip_bad_names_overrides_strict_env() {
        let cfg = with_args(&[("FACESYNC_STRICT_NAMES", "1")], &["--skip-bad-names", "status"]);
        assert_eq!(cfg.reconcile_options().names, NamePolicy::Skip);
    }

    #[test]
    fn test_absent_flags_keep_env_policies() {
        let cfg = with_args(
            &[
                ("FACESYNC_STRICT_NAMES", "0"),
                ("FACESYNC_SKIP_UNREADABLE", "1"),
                ("FACESYNC_REJECT_DUPLICATES", "1"),
            ],
            &["status"],
        );
        let opts = cfg.reconcile_options();
        assert_eq!(opts.names, NamePolicy::Skip);
        assert_eq!(opts.decode, DecodePolicy::Skip);
        assert_eq!(opts.duplicates, DuplicatePolicy::Reject);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cfg = with_args(
            &[],
            &["extract", "--skip-unreadable", "--reject-duplicates", "--store", "s.json"],
        );
        let opts = cfg.reconcile_options();
        assert_eq!(opts.decode, DecodePolicy::Skip);
        assert_eq!(opts.duplicates, DuplicatePolicy::Reject);
        assert_eq!(cfg.store_path, PathBuf::from("s.json"));
    }

    #[test]
    fn test_extract_flags_parse() {
        let cli = Cli::try_parse_from(["facesync", "--json", "extract", "--all", "--dry-run"])
            .unwrap();
        assert!(cli.json);
        assert_eq!(cli.command, Commands::Extract { dry_run: true, all: true });
    }
}
