//! Render-time half of the atomic CSS compiler.
//!
//! Compiled components call [`ax`] to join their class name lists and hand the rules
//! they need to a [`StyleSheetManager`], which inserts each rule into the document once.

mod ax;
pub mod bucket;
pub mod class_name;
pub mod compression;
mod error;
pub mod sheet;

pub use ax::{ax, ix};
pub use bucket::{Bucket, InsertionPoint, STYLE_ORDER};
pub use compression::{CompressionMap, CompressionMapError, InvalidCompressionEntry};
pub use error::SheetError;
pub use sheet::{
  DocumentContext, MemoryDocument, SharedStyleSheet, SheetOptions, StyleSheetManager,
  StyleTarget, StylesheetInsertionState,
};
