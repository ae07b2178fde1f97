use moss_diagnostics::{MismatchContext, TypeError};
use moss_syntax::annot::AnnotId;
use moss_syntax::{NodeId, NodeKind};
use moss_ty::decl::{DeclId, DeclKind};
use moss_ty::infer::CombineError;
use moss_ty::span::Span;
use moss_ty::subst::Substitution;
use moss_ty::ty::{Mutability, Ty, TyId};

use crate::{Analyzer, Expectation};

impl<'a> Analyzer<'a> {
  /// Combine two types inside a snapshot: bindings survive only when the
  /// whole combination succeeds, so a failure deep inside a tuple cannot
  /// leave half the elements bound.
  pub(crate) fn try_combine(
    &mut self,
    actual: TyId,
    expected: TyId,
  ) -> Result<(), CombineError> {
    let snapshot = self.ctx.vars.snapshot();
    match self.ctx.vars.combine(&mut self.types, actual, expected) {
      Ok(()) => {
        self.ctx.vars.commit(snapshot);
        Ok(())
      },
      Err(error) => {
        self.ctx.vars.rollback_to(snapshot);
        Err(error)
      },
    }
  }

  /// `try_combine` plus the one implicit adjustment expressions get for
  /// free: a reference where a plain value is expected is read through.
  /// The returned error describes the original operands, not the stripped
  /// ones.
  fn coerce_inner(
    &mut self,
    actual: TyId,
    expected: TyId,
  ) -> Result<(), CombineError> {
    match self.try_combine(actual, expected) {
      Ok(()) => Ok(()),
      Err(first) => {
        let actual_res = self.ctx.vars.shallow_resolve(&mut self.types, actual);
        let expected_res = self.ctx.vars.shallow_resolve(&mut self.types, expected);
        if self.types.is_reference(&actual_res) && !self.types.is_reference(&expected_res) {
          let stripped = self.types.strip_references(actual_res);
          return self.try_combine(stripped, expected).map_err(|_| first);
        }
        Err(first)
      },
    }
  }

  /// Require `actual` to fit `expected`, reporting a mismatch in `context`
  /// when it does not. Returns whether the coercion held.
  pub(crate) fn coerce(
    &mut self,
    span: Span,
    actual: TyId,
    expected: TyId,
    context: MismatchContext,
  ) -> bool {
    if self.coerce_inner(actual, expected).is_ok() {
      return true;
    }
    self.report_mismatch(span, actual, expected, context);
    false
  }

  /// Exploratory coercion: on failure every binding is rolled back and
  /// nothing is reported.
  pub(crate) fn try_coerce(
    &mut self,
    actual: TyId,
    expected: TyId,
  ) -> bool {
    let snapshot = self.ctx.vars.snapshot();
    if self.coerce_inner(actual, expected).is_ok() {
      self.ctx.vars.commit(snapshot);
      true
    } else {
      self.ctx.vars.rollback_to(snapshot);
      false
    }
  }

  /// Feed an expectation into a declared result type without insisting on
  /// it. Call results use this so `vector::empty()` against an expected
  /// `vector<u8>` settles the element, while a genuinely different result
  /// type stays reportable at the use site instead of the call.
  pub(crate) fn probe_expectation(
    &mut self,
    ty: TyId,
    expectation: Expectation,
  ) {
    if let Expectation::HasTy(expected) = expectation {
      let _ = self.try_combine(ty, expected);
    }
  }

  /// Coercion into the declared return type; failures are return-type
  /// errors carrying the annotation span as a secondary label.
  pub(crate) fn coerce_return(
    &mut self,
    span: Span,
    actual: TyId,
    expected: TyId,
  ) -> bool {
    if self.coerce_inner(actual, expected).is_ok() {
      return true;
    }
    let declared = self.ctx.return_annot_span;
    let actual = self.collapse_default_ints(actual);
    let expected = self.collapse_default_ints(expected);
    self.ctx.errors.push(TypeError::InvalidReturnType {
      span,
      actual,
      expected,
      declared,
    });
    false
  }

  pub(crate) fn report_mismatch(
    &mut self,
    span: Span,
    actual: TyId,
    expected: TyId,
    context: MismatchContext,
  ) {
    let (actual, expected) = if context.collapses_default_integers() {
      (self.collapse_default_ints(actual), self.collapse_default_ints(expected))
    } else {
      (actual, expected)
    };
    self.ctx.errors.push(TypeError::TypeMismatch {
      span,
      actual,
      expected,
      context,
    });
  }

  /// An unbound integer variable reads as the default integer type in
  /// places with their own framing (aborts, assignments, element lists),
  /// keeping those messages stable under later refinement.
  fn collapse_default_ints(
    &mut self,
    ty: TyId,
  ) -> TyId {
    let resolved = self.ctx.vars.shallow_resolve(&mut self.types, ty);
    match self.types.get(&resolved) {
      Ty::IntVar(_) => self.types.default_int(),
      _ => resolved,
    }
  }

  /// The type both branches of a conditional can agree on. `Never` is
  /// transparent; otherwise either side may coerce into the other, the
  /// first side winning ties.
  pub(crate) fn meet_types(
    &mut self,
    first: TyId,
    second: TyId,
  ) -> Option<TyId> {
    let first_res = self.ctx.vars.shallow_resolve(&mut self.types, first);
    let second_res = self.ctx.vars.shallow_resolve(&mut self.types, second);
    if self.types.is_never(&first_res) {
      return Some(second_res);
    }
    if self.types.is_never(&second_res) {
      return Some(first_res);
    }
    if self.try_coerce(second_res, first_res) {
      return Some(first_res);
    }
    if self.try_coerce(first_res, second_res) {
      return Some(second_res);
    }
    None
  }

  /// Whether a receiver fits a method's first parameter with the smallest
  /// borrow adjustment: exact match, else one borrow (`T` to `&T`, or to
  /// `&mut T` from a mutable place), else reading references off.
  pub(crate) fn autoborrow(
    &mut self,
    receiver: TyId,
    param: TyId,
    mutable_place: bool,
  ) -> bool {
    let receiver = self.ctx.vars.shallow_resolve(&mut self.types, receiver);
    let param = self.ctx.vars.shallow_resolve(&mut self.types, param);
    if self.try_combine(receiver, param).is_ok() {
      return true;
    }
    match self.types.get(&param).clone() {
      Ty::Reference { inner, mutability, .. } => {
        if self.types.is_reference(&receiver) {
          // Reference against reference already failed above; borrowing
          // a reference again is never the minimal chain.
          return false;
        }
        if mutability.is_mut() && !mutable_place {
          return false;
        }
        self.try_combine(receiver, inner).is_ok()
      },
      _ => {
        if self.types.is_reference(&receiver) {
          let stripped = self.types.strip_references(receiver);
          return self.try_combine(stripped, param).is_ok();
        }
        false
      },
    }
  }

  /// A place expression whose content may be mutably borrowed: a `mut`
  /// local, a projection from one, or a projection through a `&mut`.
  pub(crate) fn is_mutable_place(
    &mut self,
    node_id: &NodeId,
  ) -> bool {
    let node = self.unit.node(node_id);
    match &node.kind {
      NodeKind::Path(path) => {
        let Some(resolved) = self.ctx.resolutions.get(path) else {
          return false;
        };
        let Some(decl) = resolved.single_visible() else {
          return false;
        };
        matches!(&self.decls.get(&decl).kind, DeclKind::Local(local) if local.mutable)
      },
      NodeKind::FieldAccess { base, .. } | NodeKind::Index { base, .. } => {
        if self.is_mut_reference(base) {
          return true;
        }
        self.is_mutable_place(base)
      },
      NodeKind::Deref(inner) => self.is_mut_reference(inner),
      _ => false,
    }
  }

  fn is_mut_reference(
    &mut self,
    node_id: &NodeId,
  ) -> bool {
    let Some(ty) = self.ctx.expr_tys.get(node_id).copied() else {
      return false;
    };
    let resolved = self.ctx.vars.shallow_resolve(&mut self.types, ty);
    matches!(
      self.types.get(&resolved),
      Ty::Reference {
        mutability: Mutability::Mutable,
        ..
      }
    )
  }

  /// Build the substitution for one use of a generic item: written type
  /// arguments positionally, fresh variables for the rest.
  pub(crate) fn instantiate(
    &mut self,
    span: Span,
    type_params: &[DeclId],
    explicit: &[AnnotId],
  ) -> Substitution {
    let mut subst = Substitution::new();
    for (index, param) in type_params.iter().enumerate() {
      let ty = match explicit.get(index) {
        Some(annot) => self.lower_annot(annot),
        None => self.ctx.vars.fresh_ty_var(&mut self.types, span),
      };
      subst.insert(*param, ty);
    }
    subst
  }

  /// Whether `ty` can sit under an arithmetic, shift or ordering operator.
  /// An unconstrained type variable can: it is bound to a fresh integer
  /// variable on the spot, which is how `let x; x + 1` settles.
  pub(crate) fn integer_operand(
    &mut self,
    ty: TyId,
    span: Span,
  ) -> bool {
    let resolved = self.ctx.vars.shallow_resolve(&mut self.types, ty);
    if self.types.supports_arithmetic(&resolved) {
      return true;
    }
    if matches!(self.types.get(&resolved), Ty::Var(_)) {
      let int_var = self.ctx.vars.fresh_int_var(&mut self.types, span);
      return self.ctx.vars.combine(&mut self.types, resolved, int_var).is_ok();
    }
    false
  }

  pub(crate) fn resolved_is_never(
    &mut self,
    ty: TyId,
  ) -> bool {
    let resolved = self.ctx.vars.shallow_resolve(&mut self.types, ty);
    self.types.is_never(&resolved)
  }
}
