//! Credential lookup seam.
//!
//! Embedding clients only ever ask a [`CredentialSource`] for named values.
//! Where those values come from (managed secrets, `.env`, process env,
//! hard-coded defaults) is decided by whoever builds the source; the
//! [`LayeredCredentials`] type encodes the usual "first layer that knows the
//! key wins" override order.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::EmbedError;

/// Read-only key/value lookup for provider configuration and secrets.
pub trait CredentialSource: Send + Sync {
    /// Return the raw value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Like [`get`](Self::get) but treats blank values as missing.
    fn get_non_blank(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// First non-blank value among `keys`, in order.
    fn first_of(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.get_non_blank(key))
    }
}

/// In-memory credentials, used for secrets files, defaults and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    values: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<HashMap<String, String>> for StaticCredentials {
    fn from(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

impl CredentialSource for StaticCredentials {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Process environment lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

/// Ordered stack of sources; the first layer holding a non-blank value wins.
#[derive(Clone, Default)]
pub struct LayeredCredentials {
    layers: Vec<Arc<dyn CredentialSource>>,
}

impl LayeredCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer with lower priority than every layer already present.
    pub fn push_layer(mut self, layer: Arc<dyn CredentialSource>) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

impl CredentialSource for LayeredCredentials {
    fn get(&self, key: &str) -> Option<String> {
        self.layers
            .iter()
            .find_map(|layer| layer.get_non_blank(key))
    }
}

/// Ordered list of places a relative service-account file may live.
///
/// 1. the path exactly as configured
/// 2. relative to the current working directory
/// 3. relative to the running executable's directory
/// 4. `<executable dir>/../batch_pipeline/<file>`
pub fn service_account_candidates(file: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![file.to_path_buf()];
    if file.is_absolute() {
        return candidates;
    }
    if let Ok(cwd) = env::current_dir() {
        candidates.push(cwd.join(file));
    }
    if let Some(exe_dir) = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(exe_dir.join(file));
        candidates.push(exe_dir.join("..").join("batch_pipeline").join(file));
    }
    candidates
}

/// Return the first existing candidate for `file`, or a configuration error
/// listing every path that was searched.
pub fn locate_service_account(file: &Path) -> Result<PathBuf, EmbedError> {
    let candidates = service_account_candidates(file);
    if let Some(found) = candidates.iter().find(|path| path.is_file()) {
        return Ok(found.clone());
    }
    let searched = candidates
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(EmbedError::Configuration(format!(
        "service account file not found: {} (searched in: {searched})",
        file.display()
    )))
}
