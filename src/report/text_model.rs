//! Local text-generation model handle
//!
//! The generator talks to a locally served instruction-tuned model. The
//! handle is lazily initialized once per process: the first caller runs the
//! loader, everyone else either waits on the initialization lock or sees the
//! finished state. A failed load permanently downgrades the handle; it is
//! never retried.

use crate::error::{DatasageError, Result};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use std::sync::Arc;

/// Environment variable naming the local model to load
pub const MODEL_ENV_VAR: &str = "LOCAL_LLM_MODEL";

/// Default local model when the environment does not specify one
pub const DEFAULT_MODEL_ID: &str = "qwen2.5:0.5b-instruct";

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// A text-generation model the report generator can delegate to
pub trait TextModel: Send + Sync {
    /// Identifier of the underlying model
    fn model_id(&self) -> &str;

    /// Generate a completion for `prompt`
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Text model served over the local Ollama HTTP API
pub struct OllamaModel {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
}

impl OllamaModel {
    /// Load the model named by `LOCAL_LLM_MODEL` (or the default) from the
    /// local server, verifying it is actually available.
    pub fn load() -> Result<Self> {
        let model =
            std::env::var(MODEL_ENV_VAR).unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());
        Self::load_from(DEFAULT_BASE_URL, &model)
    }

    /// Load a specific model from a specific server
    pub fn load_from(base_url: &str, model: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| DatasageError::ReportError(format!("http client init failed: {e}")))?;

        let response = client
            .post(format!("{base_url}/api/show"))
            .json(&serde_json::json!({ "model": model }))
            .send()
            .map_err(|e| {
                DatasageError::ReportError(format!("local model server unreachable: {e}"))
            })?;
        if !response.status().is_success() {
            return Err(DatasageError::ReportError(format!(
                "model '{model}' not available locally: HTTP {}",
                response.status()
            )));
        }

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            model: model.to_string(),
        })
    }
}

impl TextModel for OllamaModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct GenerateResponse {
            response: String,
        }

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&serde_json::json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
            }))
            .send()
            .map_err(|e| DatasageError::ReportError(format!("generation request failed: {e}")))?
            .error_for_status()
            .map_err(|e| DatasageError::ReportError(format!("generation request failed: {e}")))?;

        let body: GenerateResponse = response
            .json()
            .map_err(|e| DatasageError::ReportError(format!("malformed generation response: {e}")))?;
        Ok(body.response)
    }
}

type Loader = Box<dyn Fn() -> Result<Arc<dyn TextModel>> + Send + Sync>;

enum ModelState {
    Uninitialized,
    Initializing,
    Ready(Arc<dyn TextModel>),
    Unavailable,
}

/// Process-wide handle for the generator's model.
///
/// States: Uninitialized -> Initializing -> {Ready, Unavailable}; both end
/// states are terminal for the process lifetime. Locking is confined to the
/// initialization step: once terminal, `acquire` is a plain read.
pub struct ModelHandle {
    state: RwLock<ModelState>,
    init_lock: Mutex<()>,
    loader: Loader,
}

impl ModelHandle {
    /// Handle that lazily loads the environment-configured local model
    pub fn from_env() -> Self {
        Self::with_loader(|| OllamaModel::load().map(|m| Arc::new(m) as Arc<dyn TextModel>))
    }

    /// Handle with a custom loader (tests inject stubs through this)
    pub fn with_loader(
        loader: impl Fn() -> Result<Arc<dyn TextModel>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: RwLock::new(ModelState::Uninitialized),
            init_lock: Mutex::new(()),
            loader: Box::new(loader),
        }
    }

    /// Handle that is already `Ready` with the given model
    pub fn preloaded(model: Arc<dyn TextModel>) -> Self {
        Self {
            state: RwLock::new(ModelState::Ready(model)),
            init_lock: Mutex::new(()),
            loader: Box::new(|| {
                Err(DatasageError::ReportError(
                    "preloaded handle has no loader".to_string(),
                ))
            }),
        }
    }

    /// Handle that is already permanently `Unavailable`
    pub fn unavailable() -> Self {
        Self {
            state: RwLock::new(ModelState::Unavailable),
            init_lock: Mutex::new(()),
            loader: Box::new(|| {
                Err(DatasageError::ReportError(
                    "handle is permanently unavailable".to_string(),
                ))
            }),
        }
    }

    /// Get the model, loading it on first use.
    ///
    /// Returns `None` once the handle has degraded to `Unavailable`; the
    /// loader is invoked at most once per process.
    pub fn acquire(&self) -> Option<Arc<dyn TextModel>> {
        if let Some(resolved) = self.read_terminal() {
            return resolved;
        }

        let _guard = self.init_lock.lock();
        // Double-checked: the winner of the race already resolved the state
        if let Some(resolved) = self.read_terminal() {
            return resolved;
        }

        *self.state.write() = ModelState::Initializing;
        let loaded = (self.loader)();
        let mut state = self.state.write();
        match loaded {
            Ok(model) => {
                tracing::info!(model = model.model_id(), "local text model ready");
                *state = ModelState::Ready(model.clone());
                Some(model)
            }
            Err(e) => {
                tracing::warn!(error = %e, "local text model unavailable, degrading permanently");
                *state = ModelState::Unavailable;
                None
            }
        }
    }

    /// Whether the handle has reached `Ready`
    pub fn is_ready(&self) -> bool {
        matches!(&*self.state.read(), ModelState::Ready(_))
    }

    /// Whether the handle has degraded to `Unavailable`
    pub fn is_unavailable(&self) -> bool {
        matches!(&*self.state.read(), ModelState::Unavailable)
    }

    fn read_terminal(&self) -> Option<Option<Arc<dyn TextModel>>> {
        match &*self.state.read() {
            ModelState::Ready(model) => Some(Some(model.clone())),
            ModelState::Unavailable => Some(None),
            ModelState::Uninitialized | ModelState::Initializing => None,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::StubModel;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_preloaded_handle_is_ready() {
        let handle = ModelHandle::preloaded(Arc::new(StubModel {
            output: Ok("hello".to_string()),
        }));
        assert!(handle.is_ready());
        let model = handle.acquire().unwrap();
        assert_eq!(model.generate("x").unwrap(), "hello");
    }

    #[test]
    fn test_failed_load_degrades_permanently() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = ModelHandle::with_loader(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(DatasageError::ReportError("weights missing".to_string()))
        });

        assert!(handle.acquire().is_none());
        assert!(handle.is_unavailable());

        // Not retried on later calls
        assert!(handle.acquire().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_successful_load_happens_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = ModelHandle::with_loader(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(StubModel {
                output: Ok("ok".to_string()),
            }) as Arc<dyn TextModel>)
        });

        assert!(handle.acquire().is_some());
        assert!(handle.acquire().is_some());
        assert!(handle.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unavailable_constructor() {
        let handle = ModelHandle::unavailable();
        assert!(handle.acquire().is_none());
        assert!(handle.is_unavailable());
    }
}
