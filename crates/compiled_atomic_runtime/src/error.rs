use crate::bucket::InsertionPoint;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SheetError {
  #[error(
    "Another stylesheet manager already owns this document. Is the styling runtime loaded more than once?"
  )]
  DuplicateStylesheetOwner,
  #[error("Malformed CSS rule `{rule}`: {reason}")]
  MalformedRule { rule: String, reason: &'static str },
  #[error("No insertion point exists for {0:?}")]
  MissingInsertionPoint(InsertionPoint),
}
