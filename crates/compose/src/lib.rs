//! Page composition for Portico.
//!
//! Splits a page template at its injection markers and streams it back with
//! per-user script fragments spliced in:
//!
//! - [`locator`]: finds the marker offsets
//! - [`stream`]: ordered composite byte stream
//! - [`fragment`]: the injected script statements
//! - [`composer`]: assembles template slices and fragments into one body
//! - [`template`]: immutable, shareable template buffers

pub mod composer;
pub mod fragment;
pub mod locator;
pub mod stream;
pub mod template;

pub use composer::{ComposedPage, Composer, DEFAULT_CHUNK_SIZE, SCRIPT_CLOSE, SCRIPT_OPEN};
pub use fragment::{
    AuthFragment, ConsoleLogFragment, FragmentProducer, PreferencesFragment, StaticFragment,
    js_string,
};
pub use locator::{END_MARKER, Offsets, START_MARKER, locate, validate_single_pair};
pub use stream::{ByteStream, CompositeStream};
pub use template::Template;
