//! Owned, lazily loaded model handle.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use rcpt_inference::InferenceBackend;
use tracing::{debug, info};

use super::model::{ModelSignature, ReceiptModel};
use crate::error::{ReceiptError, Result};

/// Produces a backend for the scoring model.
///
/// Loading is expensive, so [`ModelHandle`] calls it at most once per
/// acquire/release cycle.
pub trait ModelLoader: Send + Sync {
    /// Backend type produced by this loader.
    type Backend: InferenceBackend;

    /// Load the model.
    fn load(&self) -> rcpt_inference::Result<Self::Backend>;

    /// Sequence length to use if the model declares a dynamic one.
    fn fallback_sequence_length(&self) -> Option<usize> {
        None
    }

    /// Human-readable source, for logs.
    fn describe(&self) -> String;
}

/// Holds at most one loaded [`ReceiptModel`].
///
/// A single mutex guards both the lazy check-and-load step and every
/// inference call, so concurrent first users wait for the in-flight load
/// instead of loading again, and scoring calls are serialized.
pub struct ModelHandle<L: ModelLoader> {
    loader: L,
    slot: Mutex<Option<ReceiptModel<L::Backend>>>,
}

impl<L: ModelLoader> ModelHandle<L> {
    /// Create a handle. Nothing is loaded until first use.
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            slot: Mutex::new(None),
        }
    }

    /// Load the model if it is not resident yet.
    pub fn acquire(&self) -> Result<()> {
        let mut slot = self.lock();
        self.ensure_loaded(&mut slot)?;
        Ok(())
    }

    /// Run `f` against the resident model, loading it first if needed.
    pub fn with_model<R>(&self, f: impl FnOnce(&ReceiptModel<L::Backend>) -> Result<R>) -> Result<R> {
        let mut slot = self.lock();
        let model = self.ensure_loaded(&mut slot)?;
        f(model)
    }

    /// Signature of the model, loading it first if needed.
    pub fn signature(&self) -> Result<ModelSignature> {
        self.with_model(|model| Ok(model.signature().clone()))
    }

    /// Drop the resident model. The next use reloads it.
    ///
    /// Returns whether a model was actually released.
    pub fn release(&self) -> bool {
        let released = self.lock().take().is_some();
        if released {
            info!("Released scoring model from {}", self.loader.describe());
        }
        released
    }

    /// Whether a model is currently resident.
    pub fn is_loaded(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<ReceiptModel<L::Backend>>> {
        // The slot is either empty or holds a complete model, so a panic in
        // another holder cannot leave it half-initialized.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_loaded<'a>(
        &self,
        slot: &'a mut Option<ReceiptModel<L::Backend>>,
    ) -> Result<&'a ReceiptModel<L::Backend>> {
        let model = match slot.take() {
            Some(model) => model,
            None => self.load()?,
        };
        Ok(slot.insert(model))
    }

    fn load(&self) -> Result<ReceiptModel<L::Backend>> {
        let start = Instant::now();
        let source = self.loader.describe();
        debug!("Loading scoring model from {}", source);

        let backend = self
            .loader
            .load()
            .map_err(|e| ReceiptError::ModelLoad(format!("{}: {}", source, e)))?;
        let model = ReceiptModel::new(backend, self.loader.fallback_sequence_length())?;

        info!("Loaded scoring model from {} in {:?}", source, start.elapsed());
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::testing::FakeLoader;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_lazy_load_once() {
        let loader = FakeLoader::new(16);
        let loads = loader.load_counter();
        let handle = ModelHandle::new(loader);

        assert!(!handle.is_loaded());
        assert_eq!(loads.load(std::sync::atomic::Ordering::SeqCst), 0);

        handle.acquire().unwrap();
        handle.acquire().unwrap();
        let len = handle.with_model(|m| Ok(m.sequence_length())).unwrap();

        assert_eq!(len, 16);
        assert!(handle.is_loaded());
        assert_eq!(loads.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_use_loads_once() {
        let loader = FakeLoader::new(16).with_delay(Duration::from_millis(50));
        let loads = loader.load_counter();
        let handle = ModelHandle::new(loader);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| handle.acquire().unwrap());
            }
        });

        assert_eq!(loads.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_scoring_from_tasks() {
        let loader = FakeLoader::new(8).with_delay(Duration::from_millis(20));
        let loads = loader.load_counter();
        let handle = Arc::new(ModelHandle::new(loader));

        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let handle = Arc::clone(&handle);
                tokio::task::spawn_blocking(move || {
                    handle.with_model(|m| m.analyze(&format!("item {i} 1.50")))
                })
            })
            .collect();

        for task in tasks {
            let pair = task.await.unwrap().unwrap();
            assert_eq!(pair.tokenized_input.len(), 8);
        }
        assert_eq!(loads.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_then_reacquire_reloads() {
        let loader = FakeLoader::new(16);
        let loads = loader.load_counter();
        let handle = ModelHandle::new(loader);

        assert!(!handle.release());
        handle.acquire().unwrap();
        assert!(handle.release());
        assert!(!handle.is_loaded());

        handle.acquire().unwrap();
        assert!(handle.is_loaded());
        assert_eq!(loads.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn test_load_failure_is_model_load_error() {
        let handle = ModelHandle::new(FakeLoader::new(16).failing());

        let err = handle.acquire().unwrap_err();
        assert!(matches!(err, ReceiptError::ModelLoad(_)));
        assert!(!handle.is_loaded());
    }
}
