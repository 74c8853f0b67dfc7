//! Errors surfaced by asset loading.
//!
//! Everything else in the crate reports through `anyhow`. Load errors get a
//! concrete type because a single load result is shared by every caller that
//! asked for the same path, which requires `Clone`.

/// A reportable failure to produce a [`crate::data_structures::scene_graph::SceneAsset`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("failed to fetch asset {path}: {reason}")]
    Fetch { path: String, reason: String },

    #[error("failed to parse asset {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("asset {path} references buffer {index} which has no data")]
    MissingBuffer { path: String, index: usize },
}

impl LoadError {
    pub fn path(&self) -> &str {
        match self {
            LoadError::Fetch { path, .. }
            | LoadError::Parse { path, .. }
            | LoadError::MissingBuffer { path, .. } => path,
        }
    }

    pub(crate) fn fetch(path: &str, err: impl std::fmt::Display) -> Self {
        LoadError::Fetch {
            path: path.to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn parse(path: &str, err: impl std::fmt::Display) -> Self {
        LoadError::Parse {
            path: path.to_string(),
            reason: err.to_string(),
        }
    }
}
