/// Convenience result type used across depthflow.
pub type DepthFlowResult<T> = Result<T, DepthFlowError>;

/// Top-level error taxonomy used by the construction pipeline and the archive codec.
#[derive(thiserror::Error, Debug)]
pub enum DepthFlowError {
    /// Invalid parameters or mismatched inputs (division points, buffer dimensions, options).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A required resource (cached model weight, archive entry) does not exist.
    #[error("resource missing: {0}")]
    ResourceMissing(String),

    /// A guarded operation was requested while another one is in flight.
    #[error("concurrency error: {0}")]
    Concurrency(String),

    /// Opaque failure reported by an external model runtime.
    #[error("model inference error: {0}")]
    ModelInference(String),

    /// Errors when serializing or deserializing the flow manifest.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DepthFlowError {
    /// Build a [`DepthFlowError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`DepthFlowError::ResourceMissing`] value.
    pub fn resource_missing(msg: impl Into<String>) -> Self {
        Self::ResourceMissing(msg.into())
    }

    /// Build a [`DepthFlowError::Concurrency`] value.
    pub fn concurrency(msg: impl Into<String>) -> Self {
        Self::Concurrency(msg.into())
    }

    /// Build a [`DepthFlowError::ModelInference`] value.
    pub fn model_inference(msg: impl Into<String>) -> Self {
        Self::ModelInference(msg.into())
    }

    /// Build a [`DepthFlowError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
