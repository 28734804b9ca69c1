//! Page templates.
//!
//! A `Template` is immutable once built. Cloning shares the underlying
//! buffer, so one instance serves every concurrent request without locking.

use bytes::Bytes;
use std::path::Path;
use tracing::debug;

use portico_core::TemplateError;

use crate::locator::{self, END_MARKER, Offsets, START_MARKER};

#[derive(Debug, Clone)]
pub struct Template {
    bytes: Bytes,
    start_marker: &'static str,
    end_marker: &'static str,
}

impl Template {
    /// Wrap template bytes using the default markers. Not validated.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            start_marker: START_MARKER,
            end_marker: END_MARKER,
        }
    }

    /// Use a different marker pair.
    pub fn with_markers(mut self, start_marker: &'static str, end_marker: &'static str) -> Self {
        self.start_marker = start_marker;
        self.end_marker = end_marker;
        self
    }

    /// Read a template from disk and require exactly one marker pair.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let bytes = std::fs::read(path).map_err(|e| TemplateError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let template = Self::new(bytes);
        let offsets = template.validate()?;
        debug!(
            path = %path.display(),
            len = template.len(),
            prefix_end = offsets.prefix_end,
            suffix_start = offsets.suffix_start,
            "Template loaded"
        );
        Ok(template)
    }

    /// Strict check: each marker occurs exactly once, start before end.
    pub fn validate(&self) -> Result<Offsets, TemplateError> {
        locator::validate_single_pair(&self.bytes, self.start_marker, self.end_marker)
    }

    /// Locate the injection region (first occurrence of each marker).
    pub fn locate(&self) -> Result<Offsets, TemplateError> {
        locator::locate(&self.bytes, self.start_marker, self.end_marker)
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
