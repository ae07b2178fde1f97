use moss_ty::span::Span;
use moss_ty::Id;

use crate::path::PathId;

pub type AnnotId = Id<TypeAnnot>;

/// A written type annotation, unresolved. Primitive names (`u8`, `bool`,
/// `vector`, ...) stay ordinary paths here; lowering tells them apart from
/// user types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAnnot {
  pub kind: AnnotKind,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotKind {
  Path(PathId),
  Ref {
    inner: AnnotId,
    mutable: bool,
  },
  Tuple(Vec<AnnotId>),
  Lambda {
    params: Vec<AnnotId>,
    /// `None` means unit.
    ret: Option<AnnotId>,
  },
}
