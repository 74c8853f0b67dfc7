use std::path::{Path, PathBuf};

use anyhow::Context;
use futures::{FutureExt, future::BoxFuture};

/// Resolves an asset name to its raw bytes.
///
/// The returned future must not borrow `self`: loads are shared between
/// callers and may outlive the call that started them.
pub trait AssetSource: Send + Sync {
    fn fetch(&self, file_name: &str) -> BoxFuture<'static, anyhow::Result<Vec<u8>>>;
}

/// Reads assets from a directory on disk, `./assets` by default.
#[derive(Clone, Debug)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for FsSource {
    fn default() -> Self {
        Self::new(Path::new("./").join("assets"))
    }
}

impl AssetSource for FsSource {
    fn fetch(&self, file_name: &str) -> BoxFuture<'static, anyhow::Result<Vec<u8>>> {
        let path = self.root.join(file_name.trim_start_matches('/'));
        async move {
            let data = std::fs::read(&path)
                .with_context(|| format!("could not read {}", path.display()))?;
            Ok(data)
        }
        .boxed()
    }
}

/// Resolves `uri` relative to the directory containing `file_name`.
pub(crate) fn sibling(file_name: &str, uri: &str) -> String {
    match file_name.rfind('/') {
        Some(idx) => format!("{}/{}", &file_name[..idx], uri),
        None => uri.to_string(),
    }
}
