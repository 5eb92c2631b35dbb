//! Model registry, alias folding and path resolution.
//!
//! The daemon addresses exactly two GGML models: the default large-v3 model
//! every session runs on, and the turbo variant kept as the finalization
//! rescue model.  Clients may request models under a handful of historical
//! names; [`canonical_model_id`] folds every requested id — aliases, the
//! turbo id, unknown strings — onto the default, so the turbo model is only
//! ever reached through the rescue path.
//!
//! [`ModelPaths`] resolves the on-disk location of a model given an
//! [`crate::config::AppPaths`] instance.

use std::path::PathBuf;

use crate::config::AppPaths;

/// Id of the model sessions decode with.
pub const DEFAULT_MODEL_ID: &str = "whisper-large-v3";

/// Id of the model the finalization rescue stage retries on.
pub const RESCUE_MODEL_ID: &str = "whisper-large-v3-turbo";

// ---------------------------------------------------------------------------
// ModelInfo
// ---------------------------------------------------------------------------

/// Static metadata for a single GGML model file.
#[derive(Debug)]
pub struct ModelInfo {
    /// Unique identifier (e.g. `"whisper-large-v3"`).
    pub id: &'static str,
    /// Human-readable display name.
    pub display_name: &'static str,
    /// File name under the models directory.
    pub file_name: &'static str,
    /// Approximate file size in megabytes.
    pub file_size_mb: u64,
    /// Source URL for downloading the GGML file.
    pub source_url: &'static str,
}

/// The fixed set of models the daemon can load.
pub const STREAM_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "whisper-large-v3",
        display_name: "Whisper Large-v3 (Multilingual, 99 langs)",
        file_name: "ggml-large-v3.bin",
        file_size_mb: 2_950,
        source_url: "https://huggingface.co/ggerganov/whisper.cpp",
    },
    ModelInfo {
        id: "whisper-large-v3-turbo",
        display_name: "Whisper Large-v3 Turbo (rescue)",
        file_name: "ggml-large-v3-turbo.bin",
        file_size_mb: 1_620,
        source_url: "https://huggingface.co/ggerganov/whisper.cpp",
    },
];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fold a requested model id onto the default model.
///
/// Every request lands on [`DEFAULT_MODEL_ID`] — the match arms exist to
/// document which names clients are known to send.  Sessions therefore
/// always run the default model, and [`RESCUE_MODEL_ID`] stays reserved for
/// the finalization rescue retry.
pub fn canonical_model_id(requested: &str) -> &'static str {
    match requested {
        // Historical aliases clients still send.
        "" | "large-v3" | "whisper-large-v3" | "distil-whisper-large-v3" => DEFAULT_MODEL_ID,
        // The turbo model is rescue-only; session requests for it fold back.
        "large-v3-turbo" | "whisper-large-v3-turbo" => DEFAULT_MODEL_ID,
        // Unknown ids fall back rather than erroring mid-handshake.
        _ => DEFAULT_MODEL_ID,
    }
}

/// Find a [`ModelInfo`] by its `id` string.
pub fn find_model_by_id(id: &str) -> Option<&'static ModelInfo> {
    STREAM_MODELS.iter().find(|m| m.id == id)
}

/// The model ids the service advertises on `/models`.
///
/// Only the default model is listed — the rescue model is an internal
/// reliability detail, not a client-selectable option.
pub fn available_models() -> Vec<&'static str> {
    vec![DEFAULT_MODEL_ID]
}

// ---------------------------------------------------------------------------
// ModelPaths
// ---------------------------------------------------------------------------

/// Resolves the on-disk location of model files.
///
/// ```rust,no_run
/// use streamscribe::config::AppPaths;
/// use streamscribe::stt::{ModelPaths, STREAM_MODELS};
///
/// let paths = ModelPaths::from_app_paths(&AppPaths::new());
/// let available: Vec<_> = STREAM_MODELS.iter()
///     .filter(|m| paths.is_available(m))
///     .collect();
/// ```
#[derive(Debug, Clone)]
pub struct ModelPaths {
    /// Directory that contains (or will contain) GGML `.bin` files.
    pub models_dir: PathBuf,
}

impl ModelPaths {
    /// Build a [`ModelPaths`] from the daemon's [`AppPaths`].
    pub fn from_app_paths(app_paths: &AppPaths) -> Self {
        Self {
            models_dir: app_paths.models_dir.clone(),
        }
    }

    /// Construct directly from a models directory path (useful in tests).
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Full path to the GGML file for the given model.
    pub fn model_path(&self, model: &ModelInfo) -> PathBuf {
        self.models_dir.join(model.file_name)
    }

    /// Returns `true` if the model file exists on disk.
    pub fn is_available(&self, model: &ModelInfo) -> bool {
        self.model_path(model).exists()
    }

    /// Returns all registry models that are present on disk.
    pub fn list_local_models(&self) -> Vec<&'static ModelInfo> {
        STREAM_MODELS.iter().filter(|m| self.is_available(m)).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_yields_default() {
        assert_eq!(canonical_model_id(""), DEFAULT_MODEL_ID);
    }

    #[test]
    fn aliases_fold_to_default() {
        for alias in [
            "large-v3",
            "whisper-large-v3",
            "distil-whisper-large-v3",
            "large-v3-turbo",
            "whisper-large-v3-turbo",
        ] {
            assert_eq!(canonical_model_id(alias), DEFAULT_MODEL_ID, "alias {alias}");
        }
    }

    #[test]
    fn unknown_ids_fold_to_default() {
        assert_eq!(canonical_model_id("some-exotic-model"), DEFAULT_MODEL_ID);
    }

    #[test]
    fn rescue_model_is_registered_but_not_advertised() {
        assert!(find_model_by_id(RESCUE_MODEL_ID).is_some());
        assert!(!available_models().contains(&RESCUE_MODEL_ID));
        assert_eq!(available_models(), vec![DEFAULT_MODEL_ID]);
    }

    #[test]
    fn find_model_by_id_unknown() {
        assert!(find_model_by_id("does-not-exist").is_none());
    }

    #[test]
    fn model_paths_non_existent_returns_false() {
        let mp = ModelPaths::new("/nonexistent/path");
        assert!(!mp.is_available(&STREAM_MODELS[0]));
        assert!(mp.list_local_models().is_empty());
    }

    #[test]
    fn model_paths_correct_file_name() {
        let mp = ModelPaths::new("/models");
        let model = find_model_by_id(DEFAULT_MODEL_ID).expect("registered");
        let p = mp.model_path(model);
        assert!(p.to_str().unwrap().ends_with("ggml-large-v3.bin"));
    }
}
