//! Envelope serialization
//!
//! Renders envelopes (and dead-letter records) to JSON bytes. When
//! sanitization is enabled, the rendered text always passes through the
//! configured [`Sanitizer`] before it becomes bytes.

use crate::error::SerializationError;
use crate::sanitize::Sanitizer;
use bytes::Bytes;
use herald_core::EventEnvelope;
use serde::Serialize;
use std::sync::Arc;

/// JSON serializer with optional secret redaction
#[derive(Clone)]
pub struct Serializer {
    sanitizer: Option<Arc<dyn Sanitizer>>,
}

impl Serializer {
    /// Serializer that runs `sanitizer` when `enabled` is true
    pub fn new(sanitizer: Arc<dyn Sanitizer>, enabled: bool) -> Self {
        Self {
            sanitizer: enabled.then_some(sanitizer),
        }
    }

    /// Serializer without sanitization
    pub fn plain() -> Self {
        Self { sanitizer: None }
    }

    /// Whether rendered text is sanitized
    pub fn sanitizes(&self) -> bool {
        self.sanitizer.is_some()
    }

    /// Render an envelope to wire bytes
    ///
    /// Fails when the payload cannot be represented as JSON (for example a
    /// map with non-string keys, or a `Serialize` impl that errors).
    pub fn serialize<P: Serialize>(
        &self,
        envelope: &EventEnvelope<P>,
    ) -> Result<Bytes, SerializationError> {
        self.serialize_value(envelope)
    }

    /// Render any serializable record through the same sanitize path
    pub fn serialize_value<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<Bytes, SerializationError> {
        let text = serde_json::to_string(value)?;
        let text = match &self.sanitizer {
            Some(sanitizer) => sanitizer.sanitize(&text),
            None => text,
        };
        Ok(Bytes::from(text))
    }
}

impl std::fmt::Debug for Serializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Serializer")
            .field("sanitizes", &self.sanitizes())
            .finish()
    }
}
