#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
  // Arithmetic
  Add,
  Sub,
  Mul,
  Div,
  Mod,

  // Bitwise
  BitAnd,
  BitOr,
  BitXor,
  Shl,
  Shr,

  // Logical
  And,
  Or,

  // Comparison
  Eq,
  NotEq,
  Lt,
  LtEq,
  Gt,
  GtEq,

  // Specification
  Implies,
}

impl BinaryOp {
  pub fn symbol(&self) -> &'static str {
    match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Mod => "%",
      BinaryOp::BitAnd => "&",
      BinaryOp::BitOr => "|",
      BinaryOp::BitXor => "^",
      BinaryOp::Shl => "<<",
      BinaryOp::Shr => ">>",
      BinaryOp::And => "&&",
      BinaryOp::Or => "||",
      BinaryOp::Eq => "==",
      BinaryOp::NotEq => "!=",
      BinaryOp::Lt => "<",
      BinaryOp::LtEq => "<=",
      BinaryOp::Gt => ">",
      BinaryOp::GtEq => ">=",
      BinaryOp::Implies => "==>",
    }
  }

  pub fn is_arithmetic(&self) -> bool {
    matches!(
      self,
      BinaryOp::Add
        | BinaryOp::Sub
        | BinaryOp::Mul
        | BinaryOp::Div
        | BinaryOp::Mod
        | BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor
    )
  }

  pub fn is_shift(&self) -> bool {
    matches!(self, BinaryOp::Shl | BinaryOp::Shr)
  }

  pub fn is_ordering(&self) -> bool {
    matches!(self, BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq)
  }

  pub fn is_equality(&self) -> bool {
    matches!(self, BinaryOp::Eq | BinaryOp::NotEq)
  }

  pub fn is_logical(&self) -> bool {
    matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Implies)
  }
}

impl std::fmt::Display for BinaryOp {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    write!(f, "{}", self.symbol())
  }
}
