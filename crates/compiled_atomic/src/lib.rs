//! Build-time atomic CSS compiler.
//!
//! Style declarations found in component source are statically evaluated, parsed into a
//! declaration tree and split into single-declaration rules addressed by content hashed
//! class names. Identical declarations produce identical class names and rule text in
//! every unit, so rules from many units can be merged into one ordered stylesheet.

pub mod ast;
mod atomize;
mod cache;
mod compile;
mod compress;
mod config;
mod errors;
pub mod evaluate;
pub mod hash;
pub mod input;
pub mod module;
pub mod parse;
pub mod selector;
pub mod sheet;
pub mod shorthand;

pub use atomize::{AtomicRule, Atomizer, CssVariable, RuleGroup, INCREASE_SPECIFICITY_SELECTOR};
pub use cache::{CacheKey, RuleGroupCache};
pub use compile::{compile, CompileOutput, Compiler, Extraction, SiteOutput, RUNTIME_MODULE};
pub use compress::{compress_class_list, compress_class_names, unused_entries};
pub use config::CompileOptions;
pub use errors::{CompileError, CompileWarning};
pub use evaluate::{
  DynamicReason, DynamicRef, Evaluated, Evaluator, HelperRegistry, SourceRef, StyleExpression,
  Value, MAX_EVALUATION_DEPTH,
};
pub use input::{InputResolver, StyleInput};
pub use module::{
  Export, Import, ImportKind, MemoryModuleGraph, ModuleResolver, NoopResolver, SourceUnit,
  StyleSite,
};
pub use selector::{AtRuleWrapper, SelectorContext};
pub use sheet::{
  sort_atomic_style_sheet, RenderOptions, SheetItem, SheetReport, SortOptions, StyleSheet,
};

pub use compiled_atomic_runtime::{CompressionMap, InvalidCompressionEntry};
