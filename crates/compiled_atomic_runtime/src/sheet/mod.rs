//! Live stylesheet management.
//!
//! The manager owns the one piece of shared mutable state in the system: which atomic
//! rules are already present in a document. It is explicitly constructed by its host
//! (page load, or a request-scoped server render) from a [`DocumentContext`], which
//! hands out a single ownership token per document.

mod manager;
mod rules;
mod state;
mod target;

pub use manager::{DocumentContext, OwnershipToken, SharedStyleSheet, SheetOptions, StyleSheetManager};
pub use rules::{check_rule, rule_key, rule_keys, server_style_contents, split_rules};
pub use state::StylesheetInsertionState;
pub use target::{MemoryDocument, StyleElement, StyleTarget};
