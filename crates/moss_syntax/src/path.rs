use moss_ty::span::Span;
use moss_ty::symbol::SymbolId;
use moss_ty::Id;

use crate::annot::AnnotId;

pub type PathId = Id<Path>;

/// A possibly-qualified name occurrence: `x`, `option::some`,
/// `std::option::Option<u64>`. Resolution is keyed per path id, so every
/// occurrence gets its own entry in the result tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
  pub segments: Vec<SymbolId>,
  pub type_args: Vec<AnnotId>,
  pub span: Span,
}
