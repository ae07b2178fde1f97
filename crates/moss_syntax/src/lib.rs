pub mod annot;
pub mod builder;
pub mod item;
pub mod operation;
pub mod path;
pub mod pattern;
pub mod statement;

pub use annot::{AnnotId, AnnotKind, TypeAnnot};
pub use builder::UnitBuilder;
pub use item::ModuleItem;
pub use operation::BinaryOp;
pub use path::{Path, PathId};
pub use pattern::{FieldPat, Pat, PatId, PatKind};
pub use statement::{IncludeStmt, LetKind};

use moss_ty::span::Span;
use moss_ty::symbol::SymbolId;
use moss_ty::ty::IntegerKind;
use moss_ty::{Id, Store};

pub type NodeId = Id<Node>;

/// One expression or statement. Statements are node kinds too, so a single
/// arena covers everything a block can hold and every node can carry a type
/// in the result tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
  pub kind: NodeKind,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
  // Expressions
  Literal(Lit),
  Path(PathId),
  Borrow {
    expr: NodeId,
    mutable: bool,
  },
  Deref(NodeId),
  Not(NodeId),
  Binary {
    op: BinaryOp,
    lhs: NodeId,
    rhs: NodeId,
  },
  Cast {
    expr: NodeId,
    annot: AnnotId,
  },
  Call {
    path: PathId,
    args: Vec<NodeId>,
  },
  MethodCall {
    receiver: NodeId,
    method: SymbolId,
    type_args: Vec<AnnotId>,
    args: Vec<NodeId>,
  },
  MacroCall {
    name: SymbolId,
    args: Vec<NodeId>,
  },
  FieldAccess {
    base: NodeId,
    field: SymbolId,
  },
  Index {
    base: NodeId,
    index: NodeId,
  },
  /// Also covers schema literals; the path decides which it is.
  StructLit {
    path: PathId,
    fields: Vec<StructLitField>,
  },
  VectorLit {
    type_arg: Option<AnnotId>,
    elements: Vec<NodeId>,
  },
  Tuple(Vec<NodeId>),
  Lambda {
    params: Vec<LambdaParam>,
    body: NodeId,
  },
  Range {
    lo: NodeId,
    hi: NodeId,
  },
  If {
    condition: NodeId,
    then_branch: NodeId,
    else_branch: Option<NodeId>,
  },
  While {
    condition: NodeId,
    body: NodeId,
  },
  Loop {
    body: NodeId,
  },
  For {
    pat: PatId,
    iterable: NodeId,
    body: NodeId,
  },
  Match {
    scrutinee: NodeId,
    arms: Vec<MatchArm>,
  },
  Block(Block),
  /// Block in specification mode: `num` arithmetic, spec-only statements,
  /// `let pre`/`let post` reordering.
  SpecBlock(Block),
  /// `e is A | B`: enum variant test.
  Is {
    expr: NodeId,
    variants: Vec<PathId>,
  },
  Return(Option<NodeId>),
  Abort(NodeId),
  Break(Option<NodeId>),
  Continue,

  // Statements
  Let {
    pat: PatId,
    annot: Option<AnnotId>,
    init: Option<NodeId>,
    kind: LetKind,
  },
  Assign {
    target: NodeId,
    value: NodeId,
  },
  Include(IncludeStmt),
  /// Spec-only `update target = value`.
  Update {
    target: NodeId,
    value: NodeId,
  },

  // Error recovery
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
  pub statements: Vec<NodeId>,
  pub expression: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchArm {
  pub pattern: PatId,
  pub guard: Option<NodeId>,
  pub body: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaParam {
  pub pat: PatId,
  pub annot: Option<AnnotId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLitField {
  pub name: SymbolId,
  /// `None` is the shorthand form `S { x }`, reading a binding named `x`.
  pub value: Option<NodeId>,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lit {
  Bool(bool),
  Int {
    value: u128,
    /// Suffix as written; `None` for an unsuffixed literal awaiting
    /// refinement.
    kind: Option<IntegerKind>,
  },
  Address(SymbolId),
  ByteString(String),
  HexString(String),
}

/// A pre-lowered compilation unit: every arena the trees index into, plus
/// the modules built over them. Ids are only meaningful relative to their
/// unit.
#[derive(Debug, Clone, Default)]
pub struct Unit {
  pub nodes: Store<Node>,
  pub pats: Store<Pat>,
  pub paths: Store<Path>,
  pub annots: Store<TypeAnnot>,
  pub modules: Vec<ModuleItem>,
}

impl Unit {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn node(
    &self,
    id: &NodeId,
  ) -> &Node {
    self.nodes.get(id)
  }

  pub fn pat(
    &self,
    id: &PatId,
  ) -> &Pat {
    self.pats.get(id)
  }

  pub fn path(
    &self,
    id: &PathId,
  ) -> &Path {
    self.paths.get(id)
  }

  pub fn annot(
    &self,
    id: &AnnotId,
  ) -> &TypeAnnot {
    self.annots.get(id)
  }

  /// The module under analysis.
  pub fn main_module(&self) -> Option<&ModuleItem> {
    self.modules.first()
  }
}
