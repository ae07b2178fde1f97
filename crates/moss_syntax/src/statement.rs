use crate::NodeId;

/// Placement class of a `let` inside a specification block. Spec blocks
/// type `Pre` bindings first, then `Post`, then everything else, keeping
/// source order within each class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LetKind {
  Ordinary,
  Pre,
  Post,
}

/// `include` statement forms. The schema operands are expressions (schema
/// literals or bare paths); conditions must type as `bool`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeStmt {
  Plain {
    schema: NodeId,
  },
  If {
    condition: NodeId,
    schema: NodeId,
  },
  IfElse {
    condition: NodeId,
    then_schema: NodeId,
    else_schema: NodeId,
  },
  Imply {
    condition: NodeId,
    schema: NodeId,
  },
}
