use moss_ty::span::Span;
use moss_ty::symbol::SymbolId;
use moss_ty::Id;

use crate::path::PathId;
use crate::Lit;

pub type PatId = Id<Pat>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pat {
  pub kind: PatKind,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatKind {
  Wildcard,
  /// A bare name. May introduce a binding, or resolve to a unit enum
  /// variant or constant when one of that name is in scope.
  Binding {
    name: SymbolId,
    mutable: bool,
  },
  Tuple(Vec<PatId>),
  Struct {
    path: PathId,
    fields: Vec<FieldPat>,
    /// Whether the pattern ends with `..`.
    rest: bool,
  },
  TupleStruct {
    path: PathId,
    pats: Vec<PatId>,
  },
  /// Qualified path pattern: a constant or a fieldless enum variant.
  Path(PathId),
  Lit(Lit),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPat {
  pub name: SymbolId,
  /// `None` is the shorthand form, binding the field under its own name.
  pub pat: Option<PatId>,
  pub span: Span,
}
