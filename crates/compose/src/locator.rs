//! Marker location: finds the injection region inside a page template.
//!
//! A template carries exactly one start/end marker pair. Everything from the
//! first byte of the start marker through the last byte of the end marker is
//! replaced at composition time; the placeholder text between the markers is
//! never forwarded.
//!
//! ```text
//! [0, prefix_end)              kept
//! [prefix_end, suffix_start)   replaced (markers + placeholder)
//! [suffix_start, len)          kept
//! ```

use portico_core::TemplateError;

/// Marker opening the user injection region.
pub const START_MARKER: &str = "<!-- {INJECTED-USER-START} -->";

/// Marker closing the user injection region.
pub const END_MARKER: &str = "<!-- {INJECTED-USER-END} -->";

/// Byte offsets delimiting the injection region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offsets {
    /// First byte of the start marker.
    pub prefix_end: usize,
    /// First byte after the end marker.
    pub suffix_start: usize,
}

impl Offsets {
    /// Split `template` into `(prefix, replaced, suffix)`.
    pub fn regions<'a>(
        &self,
        template: &'a [u8],
    ) -> Result<(&'a [u8], &'a [u8], &'a [u8]), TemplateError> {
        self.check(template.len())?;
        Ok((
            &template[..self.prefix_end],
            &template[self.prefix_end..self.suffix_start],
            &template[self.suffix_start..],
        ))
    }

    /// Reject offsets that do not describe a region of a `len`-byte template.
    pub fn check(&self, len: usize) -> Result<(), TemplateError> {
        if self.prefix_end >= self.suffix_start || self.suffix_start > len {
            return Err(TemplateError::OffsetsOutOfRange {
                prefix_end: self.prefix_end,
                suffix_start: self.suffix_start,
                len,
            });
        }
        Ok(())
    }
}

/// Locate the injection region using the first occurrence of each marker.
///
/// The end marker is searched for only after the start marker, so a stray
/// end marker earlier in the document is ignored here. Use
/// [`validate_single_pair`] to reject such templates outright.
pub fn locate(
    template: &[u8],
    start_marker: &str,
    end_marker: &str,
) -> Result<Offsets, TemplateError> {
    if template.is_empty() {
        return Err(TemplateError::EmptyTemplate);
    }
    if start_marker.is_empty() || end_marker.is_empty() {
        return Err(TemplateError::InvalidMarkers(
            "markers must not be empty".into(),
        ));
    }
    if start_marker == end_marker {
        return Err(TemplateError::InvalidMarkers(
            "start and end markers must differ".into(),
        ));
    }

    let prefix_end = find(template, start_marker.as_bytes(), 0).ok_or_else(|| {
        TemplateError::MissingStartMarker {
            marker: start_marker.to_string(),
        }
    })?;

    let search_from = prefix_end + start_marker.len();
    let end_at = find(template, end_marker.as_bytes(), search_from).ok_or_else(|| {
        TemplateError::MissingEndMarker {
            marker: end_marker.to_string(),
        }
    })?;

    Ok(Offsets {
        prefix_end,
        suffix_start: end_at + end_marker.len(),
    })
}

/// Locate the injection region and require each marker to occur exactly once.
pub fn validate_single_pair(
    template: &[u8],
    start_marker: &str,
    end_marker: &str,
) -> Result<Offsets, TemplateError> {
    let offsets = locate(template, start_marker, end_marker)?;

    if let Some(offset) = find(template, start_marker.as_bytes(), offsets.prefix_end + 1) {
        return Err(TemplateError::DuplicateMarker {
            marker: start_marker.to_string(),
            offset,
        });
    }

    let end_at = offsets.suffix_start - end_marker.len();
    let stray_end = find(template, end_marker.as_bytes(), 0)
        .filter(|&at| at != end_at)
        .or_else(|| find(template, end_marker.as_bytes(), end_at + 1));
    if let Some(offset) = stray_end {
        return Err(TemplateError::DuplicateMarker {
            marker: end_marker.to_string(),
            offset,
        });
    }

    Ok(offsets)
}

/// Exact substring search starting at `from`.
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.len() > haystack.len() - from {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}
