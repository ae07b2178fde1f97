use moss_ty::decl::DeclStore;
use moss_ty::display::render_ty;
use moss_ty::span::Span;
use moss_ty::symbol::{SymbolId, SymbolTable};
use moss_ty::ty::{TyId, TypeStore};

use super::diagnostic_report::{Diagnostic, Severity};

/// Where a `TypeMismatch` was reported. Hosts can refine presentation with
/// this; the engine uses it when recording the error to decide whether an
/// undetermined integer should read as plain `integer` rather than as the
/// kind it would later default to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchContext {
  General,
  Abort,
  Assignment,
  Tuple,
  Vector,
  Range,
}

impl MismatchContext {
  pub fn collapses_default_integers(&self) -> bool {
    !matches!(self, MismatchContext::General)
  }
}

/// The pattern shape an unpacking failed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnpackShape {
  /// A struct pattern was applied to a non-struct value.
  StructPattern,
  /// A tuple pattern was applied to a value with no tuple shape.
  TuplePattern,
  /// The assigned tuple has this many elements and the pattern does not.
  TupleOfLength(usize),
  /// A multi-value tuple was bound to one variable.
  SingleVariable,
}

/// Everything the type walker can report. Variants carry type ids, not
/// rendered strings: integer refinement may tighten a variable after the
/// error is recorded, and the message should show the settled type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeError {
  TypeMismatch {
    span: Span,
    actual: TyId,
    expected: TyId,
    context: MismatchContext,
  },
  InvalidReturnType {
    span: Span,
    actual: TyId,
    expected: TyId,
    /// Span of the declared return annotation, when the function has one.
    declared: Option<Span>,
  },
  UnsupportedBinaryOp {
    span: Span,
    op: &'static str,
    ty: TyId,
  },
  IncompatibleBinaryArgs {
    span: Span,
    op: &'static str,
    lhs: TyId,
    rhs: TyId,
  },
  InvalidUnpacking {
    span: Span,
    assigned: TyId,
    shape: UnpackShape,
  },
  CircularType {
    span: Span,
    name: SymbolId,
  },
  ExpectedNonReference {
    span: Span,
    ty: TyId,
  },
  InvalidDereference {
    span: Span,
    ty: TyId,
  },
  IndexingNotAllowed {
    span: Span,
    ty: TyId,
  },
}

impl TypeError {
  pub fn primary_span(&self) -> Span {
    match self {
      TypeError::TypeMismatch { span, .. }
      | TypeError::InvalidReturnType { span, .. }
      | TypeError::UnsupportedBinaryOp { span, .. }
      | TypeError::IncompatibleBinaryArgs { span, .. }
      | TypeError::InvalidUnpacking { span, .. }
      | TypeError::CircularType { span, .. }
      | TypeError::ExpectedNonReference { span, .. }
      | TypeError::InvalidDereference { span, .. }
      | TypeError::IndexingNotAllowed { span, .. } => *span,
    }
  }

  pub fn code(&self) -> String {
    match self {
      TypeError::TypeMismatch { .. } => "T0001",
      TypeError::InvalidReturnType { .. } => "T0002",
      TypeError::UnsupportedBinaryOp { .. } => "T0003",
      TypeError::IncompatibleBinaryArgs { .. } => "T0004",
      TypeError::InvalidUnpacking { .. } => "T0005",
      TypeError::CircularType { .. } => "T0006",
      TypeError::ExpectedNonReference { .. } => "T0007",
      TypeError::InvalidDereference { .. } => "T0008",
      TypeError::IndexingNotAllowed { .. } => "T0009",
    }
    .to_string()
  }

  fn level(&self) -> Severity {
    Severity::Error
  }

  fn secondary_labels(&self) -> Vec<(Span, String)> {
    match self {
      TypeError::InvalidReturnType {
        declared: Some(declared), ..
      } => {
        vec![(*declared, "Return type declared here".to_string())]
      },
      _ => vec![],
    }
  }

  /// Rewrites every carried type through `f`. The analyzer runs this once
  /// inference settles, so messages show final variable bindings.
  pub fn map_tys(
    &mut self,
    mut f: impl FnMut(TyId) -> TyId,
  ) {
    match self {
      TypeError::TypeMismatch { actual, expected, .. } | TypeError::InvalidReturnType { actual, expected, .. } => {
        *actual = f(*actual);
        *expected = f(*expected);
      },
      TypeError::IncompatibleBinaryArgs { lhs, rhs, .. } => {
        *lhs = f(*lhs);
        *rhs = f(*rhs);
      },
      TypeError::UnsupportedBinaryOp { ty, .. }
      | TypeError::ExpectedNonReference { ty, .. }
      | TypeError::InvalidDereference { ty, .. }
      | TypeError::IndexingNotAllowed { ty, .. } => {
        *ty = f(*ty);
      },
      TypeError::InvalidUnpacking { assigned, .. } => {
        *assigned = f(*assigned);
      },
      TypeError::CircularType { .. } => {},
    }
  }

  pub fn message(
    &self,
    types: &TypeStore,
    decls: &DeclStore,
    symbols: &SymbolTable,
  ) -> String {
    let render = |id: &TyId| render_ty(types, decls, symbols, id);
    match self {
      TypeError::TypeMismatch { actual, expected, .. } => {
        format!("Incompatible type '{}', expected '{}'", render(actual), render(expected))
      },
      TypeError::InvalidReturnType { actual, expected, .. } => {
        format!("Invalid return type '{}', expected '{}'", render(actual), render(expected))
      },
      TypeError::UnsupportedBinaryOp { op, ty, .. } => {
        format!("Invalid argument to '{}': expected integer type, but found '{}'", op, render(ty))
      },
      TypeError::IncompatibleBinaryArgs { op, lhs, rhs, .. } => {
        format!("Incompatible arguments to '{}': '{}' and '{}'", op, render(lhs), render(rhs))
      },
      TypeError::InvalidUnpacking { assigned, shape, .. } => match shape {
        UnpackShape::StructPattern => {
          format!("Assigned expr of type '{}' cannot be unpacked with struct pattern", render(assigned))
        },
        UnpackShape::TuplePattern => {
          format!("Assigned expr of type '{}' cannot be unpacked with tuple pattern", render(assigned))
        },
        UnpackShape::TupleOfLength(arity) => {
          let holes = vec!["_"; *arity].join(", ");
          format!("Invalid unpacking. Expected tuple binding of length {}: ({})", arity, holes)
        },
        UnpackShape::SingleVariable => "Invalid unpacking. Expected a single variable".to_string(),
      },
      TypeError::CircularType { name, .. } => {
        format!("Circular reference of type '{}'", symbols.get(name))
      },
      TypeError::ExpectedNonReference { ty, .. } => {
        format!("Expected a single non-reference type, but found: '{}'", render(ty))
      },
      TypeError::InvalidDereference { ty, .. } => {
        format!("Invalid dereference. Expected '&_' but found '{}'", render(ty))
      },
      TypeError::IndexingNotAllowed { ty, .. } => {
        format!("Indexing receiver type should be vector or support index syntax, got '{}'", render(ty))
      },
    }
  }

  pub fn report(
    &self,
    types: &TypeStore,
    decls: &DeclStore,
    symbols: &SymbolTable,
  ) -> Diagnostic {
    self.report_with_severity(self.level(), types, decls, symbols)
  }

  /// `report` with the severity overridden, for hosts that demote findings
  /// in generated or test-only code.
  pub fn report_with_severity(
    &self,
    severity: Severity,
    types: &TypeStore,
    decls: &DeclStore,
    symbols: &SymbolTable,
  ) -> Diagnostic {
    let mut diagnostic = Diagnostic::new(severity, self.message(types, decls, symbols), self.code(), self.primary_span());
    for (span, message) in self.secondary_labels() {
      diagnostic = diagnostic.with_label(span, message);
    }
    diagnostic
  }
}
