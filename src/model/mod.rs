//! Data model shared by discovery, aggregation and rendering.
//!
//! Source files flow in through [`SourceFileList`]; parsed content lives in
//! the marker tree ([`Document`], [`Marker`], [`Node`]).

mod document;
mod marker;
mod source;

pub use document::*;
pub use marker::*;
pub use source::*;
