use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    foundation::error::DepthFlowResult,
    models::{depth::DepthModel, inpaint::InpaintModel},
};

/// Builds model sessions from raw weight bytes (e.g. an ONNX runtime binding).
pub trait ModelRuntime: Send + Sync {
    /// Create a depth-estimation session.
    fn load_depth(&self, weights: &[u8]) -> DepthFlowResult<Box<dyn DepthModel>>;
    /// Create an inpainting session.
    fn load_inpaint(&self, weights: &[u8]) -> DepthFlowResult<Box<dyn InpaintModel>>;
}

/// Shared handle to a loaded session. Calls are serialized through the inner mutex.
pub type SharedSession<M> = Arc<Mutex<Box<M>>>;

/// Memoized session slot.
///
/// The first successful [`LazySession::get_or_load`] stores the session for the lifetime of the
/// slot; a failed load stores nothing, so the next call tries again.
pub struct LazySession<M: ?Sized> {
    slot: Mutex<Option<SharedSession<M>>>,
}

impl<M: ?Sized> Default for LazySession<M> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<M: ?Sized> LazySession<M> {
    /// Empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached session, or run `load` and cache its result on success.
    ///
    /// The slot lock is held while loading so concurrent callers share one load.
    pub fn get_or_load<F>(&self, load: F) -> DepthFlowResult<SharedSession<M>>
    where
        F: FnOnce() -> DepthFlowResult<Box<M>>,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = slot.as_ref() {
            return Ok(Arc::clone(session));
        }
        let session = Arc::new(Mutex::new(load()?));
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Whether a session is cached.
    pub fn is_loaded(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Drop the cached session (it stays alive while other handles exist).
    pub fn reset(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Run `f` with exclusive access to a shared session.
pub fn with_session<M: ?Sized, T>(
    session: &SharedSession<M>,
    f: impl FnOnce(&mut M) -> DepthFlowResult<T>,
) -> DepthFlowResult<T> {
    let mut guard = session.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut **guard)
}

#[cfg(test)]
#[path = "../../tests/unit/models/session.rs"]
mod tests;
