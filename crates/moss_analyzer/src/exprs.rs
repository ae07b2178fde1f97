use moss_config::DebugTrace;
use moss_diagnostics::{MismatchContext, TypeError};
use moss_log::trace_dbg;
use moss_syntax::operation::BinaryOp;
use moss_syntax::{AnnotId, IncludeStmt, LambdaParam, Lit, NodeId, NodeKind, PatId, PathId, StructLitField};
use moss_ty::decl::{Decl, DeclId, DeclKind, FieldDef, ModuleDef, StructDef, TypeParamDef, Visibility};
use moss_ty::span::Span;
use moss_ty::subst::{fold_ty, fold_ty_or_unknown, Substitution};
use moss_ty::symbol::SymbolId;
use moss_ty::ty::{Mutability, Ty, TyId};

use crate::macros::MacroReturnRule;
use crate::resolve::Ns;
use crate::scope::ScopeKind;
use crate::{Analyzer, Expectation, FieldTarget};

impl<'a> Analyzer<'a> {
  /// Infer one expression or statement. Every visited node lands in
  /// `expr_tys`; revisits return the memo, so reordered or defensive walks
  /// cannot disagree with the first one. The expectation is a hint flowing
  /// inward; enforcing it is the consumer's job, except that blocks coerce
  /// their own tail.
  pub(crate) fn infer_expr(
    &mut self,
    node_id: &NodeId,
    expectation: Expectation,
  ) -> TyId {
    if let Some(existing) = self.ctx.expr_tys.get(node_id) {
      return *existing;
    }
    if self.cancel.is_cancelled() {
      self.ctx.cancelled = true;
      return self.types.unknown();
    }

    let unit = self.unit;
    let node = unit.node(node_id);
    let span = node.span;
    let ty = match &node.kind {
      NodeKind::Literal(lit) => self.literal_ty(lit, span),
      NodeKind::Path(path) => self.infer_value_path(path),
      NodeKind::Borrow { expr, mutable } => self.infer_borrow(expr, *mutable, expectation),
      NodeKind::Deref(expr) => self.infer_deref(expr, span),
      NodeKind::Not(expr) => {
        let operand = self.infer_expr(expr, Expectation::None);
        let operand_span = unit.node(expr).span;
        let boolean = self.types.boolean();
        self.coerce(operand_span, operand, boolean, MismatchContext::General);
        boolean
      },
      NodeKind::Binary { op, lhs, rhs } => self.infer_binary(span, *op, lhs, rhs),
      NodeKind::Cast { expr, annot } => {
        self.infer_expr(expr, Expectation::None);
        self.lower_annot(annot)
      },
      NodeKind::Call { path, args } => self.infer_call(span, path, args, expectation),
      NodeKind::MethodCall {
        receiver,
        method,
        type_args,
        args,
      } => self.infer_method_call(node_id, receiver, *method, type_args, args, expectation),
      NodeKind::MacroCall { name, args } => self.infer_macro_call(span, *name, args, expectation),
      NodeKind::FieldAccess { base, field } => self.infer_field_access(node_id, base, *field),
      NodeKind::Index { base, index } => self.infer_index(span, base, index),
      NodeKind::StructLit { path, fields } => self.infer_struct_lit(path, fields, expectation),
      NodeKind::VectorLit { type_arg, elements } => self.infer_vector_lit(span, type_arg, elements),
      NodeKind::Tuple(elements) => self.infer_tuple(elements, expectation),
      NodeKind::Lambda { params, body } => self.infer_lambda(params, body, expectation),
      NodeKind::Range { lo, hi } => self.infer_range(lo, hi),
      NodeKind::If {
        condition,
        then_branch,
        else_branch,
      } => self.infer_if(condition, then_branch, else_branch.as_ref(), expectation),
      NodeKind::While { condition, body } => {
        let cond_ty = self.infer_expr(condition, Expectation::None);
        let cond_span = unit.node(condition).span;
        let boolean = self.types.boolean();
        self.coerce(cond_span, cond_ty, boolean, MismatchContext::General);
        let unit_ty = self.types.unit();
        self.infer_expr(body, Expectation::HasTy(unit_ty));
        self.types.never()
      },
      NodeKind::Loop { body } => {
        let unit_ty = self.types.unit();
        self.infer_expr(body, Expectation::HasTy(unit_ty));
        self.types.never()
      },
      NodeKind::For { pat, iterable, body } => self.infer_for(pat, iterable, body),
      NodeKind::Match { scrutinee, arms } => {
        let scrutinee_ty = self.infer_expr(scrutinee, Expectation::None);
        let mut result: Option<TyId> = None;
        for arm in arms {
          self.scopes.push(ScopeKind::Block);
          self.bind_pattern(&arm.pattern, scrutinee_ty);
          if let Some(guard) = arm.guard {
            let guard_ty = self.infer_expr(&guard, Expectation::None);
            let guard_span = unit.node(&guard).span;
            let boolean = self.types.boolean();
            self.coerce(guard_span, guard_ty, boolean, MismatchContext::General);
          }
          let body_ty = self.infer_expr(&arm.body, expectation);
          self.scopes.pop();
          result = Some(match result {
            None => body_ty,
            Some(acc) => self.join_arm(acc, body_ty, &arm.body, expectation),
          });
        }
        result.unwrap_or_else(|| self.types.never())
      },
      NodeKind::Block(block) => self.infer_block(node_id, block, expectation),
      NodeKind::SpecBlock(block) => {
        let saved = self.ctx.spec_mode;
        self.ctx.spec_mode = true;
        self.infer_block(node_id, block, Expectation::None);
        self.ctx.spec_mode = saved;
        self.types.unit()
      },
      NodeKind::Is { expr, variants } => {
        self.infer_expr(expr, Expectation::None);
        for variant in variants {
          self.resolve_path_ns(variant, Ns::Type);
        }
        self.types.boolean()
      },
      NodeKind::Return(value) => {
        let expected = self.ctx.expected_return.unwrap_or_else(|| self.types.unknown());
        match value {
          Some(value) => {
            let ty = self.infer_expr(value, Expectation::HasTy(expected));
            let value_span = unit.node(value).span;
            self.coerce_return(value_span, ty, expected);
          },
          None => {
            let unit_ty = self.types.unit();
            self.coerce_return(span, unit_ty, expected);
          },
        }
        self.types.never()
      },
      NodeKind::Abort(code) => {
        let ty = self.infer_expr(code, Expectation::None);
        let code_span = unit.node(code).span;
        let default_int = self.types.default_int();
        self.coerce(code_span, ty, default_int, MismatchContext::Abort);
        self.types.never()
      },
      NodeKind::Break(value) => {
        if let Some(value) = value {
          self.infer_expr(value, Expectation::None);
        }
        self.types.never()
      },
      NodeKind::Continue => self.types.never(),
      NodeKind::Let { pat, annot, init, .. } => self.infer_let(pat, annot.as_ref(), init.as_ref()),
      NodeKind::Assign { target, value } => self.infer_assign(target, value),
      NodeKind::Include(include) => self.infer_include(include),
      NodeKind::Update { target, value } => {
        self.infer_expr(target, Expectation::None);
        self.infer_expr(value, Expectation::None);
        self.types.unit()
      },
      NodeKind::Error => self.types.unknown(),
    };

    self.ctx.expr_tys.insert(*node_id, ty);
    ty
  }

  pub(crate) fn literal_ty(
    &mut self,
    lit: &Lit,
    span: Span,
  ) -> TyId {
    match lit {
      Lit::Bool(_) => self.types.boolean(),
      Lit::Int { kind: Some(kind), .. } => self.types.integer(*kind),
      Lit::Int { kind: None, .. } => {
        if self.ctx.spec_mode {
          self.types.num()
        } else {
          self.ctx.vars.fresh_int_var(&mut self.types, span)
        }
      },
      Lit::Address(_) => self.types.address(),
      Lit::ByteString(_) | Lit::HexString(_) => {
        let u8_ty = self.types.u8();
        self.types.vector(u8_ty)
      },
    }
  }

  /// An expression-position path: a local, constant, enum variant value or
  /// a function referenced as a value. Ambiguity and unresolved names stay
  /// silent; go-to-definition still sees whatever candidates were recorded.
  fn infer_value_path(
    &mut self,
    path_id: &PathId,
  ) -> TyId {
    let resolved = self.resolve_path_multi(path_id, &[Ns::Name, Ns::Function]);
    let Some(decl) = resolved.single_visible() else {
      return self.types.unknown();
    };
    self.type_of_value_decl(decl, path_id)
  }

  fn type_of_value_decl(
    &mut self,
    decl: DeclId,
    path_id: &PathId,
  ) -> TyId {
    let path = self.unit.path(path_id);
    match &self.decls.get(&decl).kind {
      DeclKind::Local(_) => match self.ctx.binding_tys.get(&decl).copied() {
        Some(ty) => ty,
        None => self.internal_error("local mentioned before its binding cell was filled"),
      },
      DeclKind::Const(def) => def.ty,
      DeclKind::Function(def) => {
        let def = def.clone();
        let subst = self.instantiate(path.span, &def.type_params, &path.type_args);
        let mut param_tys = Vec::with_capacity(def.params.len());
        for param in &def.params {
          let declared = self.decls.as_local(param).and_then(|local| local.ty);
          let declared = declared.unwrap_or_else(|| self.types.unknown());
          param_tys.push(fold_ty(&mut self.types, declared, &subst));
        }
        let ret = fold_ty(&mut self.types, def.ret, &subst);
        self.types.lambda(param_tys, ret)
      },
      DeclKind::Variant(def) => {
        let owner = def.owner_enum;
        let type_params = self.decls.type_params_of(&owner).to_vec();
        let subst = self.instantiate(path.span, &type_params, &path.type_args);
        let unknown = self.types.unknown();
        let args: Vec<TyId> = type_params
          .iter()
          .map(|param| subst.get(*param).unwrap_or(unknown))
          .collect();
        self.types.adt(owner, subst, args)
      },
      _ => self.types.unknown(),
    }
  }

  fn infer_borrow(
    &mut self,
    expr: &NodeId,
    mutable: bool,
    expectation: Expectation,
  ) -> TyId {
    let inner_expect = match expectation.ty() {
      Some(expected) => {
        let resolved = self.ctx.vars.shallow_resolve(&mut self.types, expected);
        match self.types.get(&resolved) {
          Ty::Reference { inner, .. } => Expectation::HasTy(*inner),
          _ => Expectation::None,
        }
      },
      None => Expectation::None,
    };
    let inner_ty = self.infer_expr(expr, inner_expect);
    let resolved = self.ctx.vars.shallow_resolve(&mut self.types, inner_ty);
    if matches!(self.types.get(&resolved), Ty::Reference { .. } | Ty::Tuple(_)) {
      let expr_span = self.unit.node(expr).span;
      self.ctx.errors.push(TypeError::ExpectedNonReference {
        span: expr_span,
        ty: inner_ty,
      });
      return self.types.unknown();
    }
    let mutability = if mutable { Mutability::Mutable } else { Mutability::Immutable };
    let spec = self.ctx.spec_mode;
    self.types.reference(inner_ty, mutability, spec)
  }

  fn infer_deref(
    &mut self,
    expr: &NodeId,
    span: Span,
  ) -> TyId {
    let ty = self.infer_expr(expr, Expectation::None);
    let resolved = self.ctx.vars.shallow_resolve(&mut self.types, ty);
    match self.types.get(&resolved) {
      Ty::Reference { inner, .. } => *inner,
      Ty::Unknown => resolved,
      _ => {
        self.ctx.errors.push(TypeError::InvalidDereference { span, ty });
        self.types.unknown()
      },
    }
  }

  fn infer_binary(
    &mut self,
    span: Span,
    op: BinaryOp,
    lhs: &NodeId,
    rhs: &NodeId,
  ) -> TyId {
    let lhs_ty = self.infer_expr(lhs, Expectation::None);
    let rhs_ty = self.infer_expr(rhs, Expectation::None);
    let lhs_span = self.unit.node(lhs).span;
    let rhs_span = self.unit.node(rhs).span;

    if op.is_arithmetic() {
      let lhs_ok = self.integer_operand(lhs_ty, lhs_span);
      if !lhs_ok {
        self.ctx.errors.push(TypeError::UnsupportedBinaryOp {
          span: lhs_span,
          op: op.symbol(),
          ty: lhs_ty,
        });
      }
      let rhs_ok = self.integer_operand(rhs_ty, rhs_span);
      if !rhs_ok {
        self.ctx.errors.push(TypeError::UnsupportedBinaryOp {
          span: rhs_span,
          op: op.symbol(),
          ty: rhs_ty,
        });
      }
      if !lhs_ok || !rhs_ok {
        return self.types.unknown();
      }
      if self.ctx.spec_mode {
        // Unbounded arithmetic: operand kinds are not forced together.
        return self.types.num();
      }
      if self.try_combine(lhs_ty, rhs_ty).is_err() {
        self.ctx.errors.push(TypeError::IncompatibleBinaryArgs {
          span,
          op: op.symbol(),
          lhs: lhs_ty,
          rhs: rhs_ty,
        });
        return self.types.unknown();
      }
      return self.ctx.vars.shallow_resolve(&mut self.types, lhs_ty);
    }

    if op.is_shift() {
      let lhs_ok = self.integer_operand(lhs_ty, lhs_span);
      if !lhs_ok {
        self.ctx.errors.push(TypeError::UnsupportedBinaryOp {
          span: lhs_span,
          op: op.symbol(),
          ty: lhs_ty,
        });
      }
      if self.ctx.spec_mode {
        if !self.integer_operand(rhs_ty, rhs_span) {
          self.ctx.errors.push(TypeError::UnsupportedBinaryOp {
            span: rhs_span,
            op: op.symbol(),
            ty: rhs_ty,
          });
        }
      } else {
        let u8_ty = self.types.u8();
        self.coerce(rhs_span, rhs_ty, u8_ty, MismatchContext::General);
      }
      if !lhs_ok {
        return self.types.unknown();
      }
      return self.ctx.vars.shallow_resolve(&mut self.types, lhs_ty);
    }

    if op.is_ordering() {
      let lhs_ok = self.integer_operand(lhs_ty, lhs_span);
      if !lhs_ok {
        self.ctx.errors.push(TypeError::UnsupportedBinaryOp {
          span: lhs_span,
          op: op.symbol(),
          ty: lhs_ty,
        });
      }
      let rhs_ok = self.integer_operand(rhs_ty, rhs_span);
      if !rhs_ok {
        self.ctx.errors.push(TypeError::UnsupportedBinaryOp {
          span: rhs_span,
          op: op.symbol(),
          ty: rhs_ty,
        });
      }
      if lhs_ok && rhs_ok && !self.ctx.spec_mode && self.try_combine(lhs_ty, rhs_ty).is_err() {
        self.ctx.errors.push(TypeError::IncompatibleBinaryArgs {
          span,
          op: op.symbol(),
          lhs: lhs_ty,
          rhs: rhs_ty,
        });
      }
      return self.types.boolean();
    }

    if op.is_equality() {
      if self.try_combine(lhs_ty, rhs_ty).is_err() {
        self.ctx.errors.push(TypeError::IncompatibleBinaryArgs {
          span,
          op: op.symbol(),
          lhs: lhs_ty,
          rhs: rhs_ty,
        });
      }
      return self.types.boolean();
    }

    // Logical, including spec implication.
    let boolean = self.types.boolean();
    self.coerce(lhs_span, lhs_ty, boolean, MismatchContext::General);
    self.coerce(rhs_span, rhs_ty, boolean, MismatchContext::General);
    boolean
  }

  fn infer_if(
    &mut self,
    condition: &NodeId,
    then_branch: &NodeId,
    else_branch: Option<&NodeId>,
    expectation: Expectation,
  ) -> TyId {
    let cond_ty = self.infer_expr(condition, Expectation::None);
    let cond_span = self.unit.node(condition).span;
    let boolean = self.types.boolean();
    self.coerce(cond_span, cond_ty, boolean, MismatchContext::General);

    // Without an else the value is unit; pushing the expectation into the
    // lone branch would double-report what the consumer already catches.
    let branch_expect = if else_branch.is_some() { expectation } else { Expectation::None };
    let then_ty = self.infer_expr(then_branch, branch_expect);
    let Some(else_branch) = else_branch else {
      return self.types.unit();
    };
    let else_ty = self.infer_expr(else_branch, branch_expect);
    if let Some(met) = self.meet_types(then_ty, else_ty) {
      return met;
    }
    match expectation.ty() {
      // Both branches were coerced against the expectation; any mismatch
      // is already on record there.
      Some(expected) => expected,
      None => {
        let else_span = self.unit.node(else_branch).span;
        self.ctx.errors.push(TypeError::TypeMismatch {
          span: else_span,
          actual: else_ty,
          expected: then_ty,
          context: MismatchContext::General,
        });
        self.types.unknown()
      },
    }
  }

  fn join_arm(
    &mut self,
    acc: TyId,
    arm_ty: TyId,
    arm_body: &NodeId,
    expectation: Expectation,
  ) -> TyId {
    if let Some(met) = self.meet_types(acc, arm_ty) {
      return met;
    }
    if let Some(expected) = expectation.ty() {
      return expected;
    }
    let body_span = self.unit.node(arm_body).span;
    self.ctx.errors.push(TypeError::TypeMismatch {
      span: body_span,
      actual: arm_ty,
      expected: acc,
      context: MismatchContext::General,
    });
    acc
  }

  fn infer_for(
    &mut self,
    pat: &PatId,
    iterable: &NodeId,
    body: &NodeId,
  ) -> TyId {
    let iter_ty = self.infer_expr(iterable, Expectation::None);
    let resolved = self.ctx.vars.shallow_resolve(&mut self.types, iter_ty);
    let element = match self.types.get(&resolved) {
      Ty::Range(element) => *element,
      _ => self.types.unknown(),
    };
    self.scopes.push(ScopeKind::Block);
    self.bind_pattern(pat, element);
    let unit_ty = self.types.unit();
    self.infer_expr(body, Expectation::HasTy(unit_ty));
    self.scopes.pop();
    self.types.never()
  }

  fn infer_call(
    &mut self,
    span: Span,
    path_id: &PathId,
    args: &[NodeId],
    expectation: Expectation,
  ) -> TyId {
    let resolved = self.resolve_path_multi(path_id, &[Ns::Function, Ns::Name]);
    let Some(decl) = resolved.single_visible() else {
      self.infer_args_loose(args);
      return self.types.unknown();
    };
    match &self.decls.get(&decl).kind {
      DeclKind::Function(_) => {
        let type_args = &self.unit.path(path_id).type_args;
        self.type_call(span, decl, type_args, args, expectation)
      },
      DeclKind::Local(_) => {
        let callee_ty = self.type_of_value_decl(decl, path_id);
        self.call_through_lambda(callee_ty, args, expectation)
      },
      _ => {
        self.infer_args_loose(args);
        self.types.unknown()
      },
    }
  }

  /// Type one call against a function declaration: instantiate, feed the
  /// expectation through the declared return, then coerce each argument.
  /// Missing or extra arguments keep their own inference; arity is not a
  /// typing error here.
  pub(crate) fn type_call(
    &mut self,
    span: Span,
    decl: DeclId,
    type_args: &[AnnotId],
    args: &[NodeId],
    expectation: Expectation,
  ) -> TyId {
    let Some(def) = self.decls.as_function(&decl).cloned() else {
      self.infer_args_loose(args);
      return self.types.unknown();
    };
    let subst = self.instantiate(span, &def.type_params, type_args);
    let declared_ret = fold_ty(&mut self.types, def.ret, &subst);
    self.probe_expectation(declared_ret, expectation);
    for (index, arg) in args.iter().enumerate() {
      match def.params.get(index) {
        Some(param) => {
          let declared = self.decls.as_local(param).and_then(|local| local.ty);
          let declared = declared.unwrap_or_else(|| self.types.unknown());
          let param_ty = fold_ty(&mut self.types, declared, &subst);
          let arg_ty = self.infer_expr(arg, Expectation::HasTy(param_ty));
          let arg_span = self.unit.node(arg).span;
          self.coerce(arg_span, arg_ty, param_ty, MismatchContext::General);
        },
        None => {
          self.infer_expr(arg, Expectation::None);
        },
      }
    }
    declared_ret
  }

  fn call_through_lambda(
    &mut self,
    callee_ty: TyId,
    args: &[NodeId],
    expectation: Expectation,
  ) -> TyId {
    let resolved = self.ctx.vars.shallow_resolve(&mut self.types, callee_ty);
    let Ty::Lambda { params, ret } = self.types.get(&resolved).clone() else {
      self.infer_args_loose(args);
      return self.types.unknown();
    };
    self.probe_expectation(ret, expectation);
    for (index, arg) in args.iter().enumerate() {
      match params.get(index).copied() {
        Some(param_ty) => {
          let arg_ty = self.infer_expr(arg, Expectation::HasTy(param_ty));
          let arg_span = self.unit.node(arg).span;
          self.coerce(arg_span, arg_ty, param_ty, MismatchContext::General);
        },
        None => {
          self.infer_expr(arg, Expectation::None);
        },
      }
    }
    ret
  }

  fn infer_args_loose(
    &mut self,
    args: &[NodeId],
  ) {
    for arg in args {
      self.infer_expr(arg, Expectation::None);
    }
  }

  fn infer_method_call(
    &mut self,
    node_id: &NodeId,
    receiver: &NodeId,
    method: SymbolId,
    type_args: &[AnnotId],
    args: &[NodeId],
    expectation: Expectation,
  ) -> TyId {
    let span = self.unit.node(node_id).span;
    let receiver_ty = self.infer_expr(receiver, Expectation::None);
    if !self.config.features.receiver_style_methods {
      self.infer_args_loose(args);
      return self.types.unknown();
    }
    let mutable_place = self.is_mutable_place(receiver);
    let candidates = self.method_candidates(receiver_ty, method);
    let chosen = candidates
      .into_iter()
      .find(|decl| self.method_compatible(span, *decl, receiver_ty, mutable_place));
    let Some(decl) = chosen else {
      self.infer_args_loose(args);
      return self.types.unknown();
    };
    self.ctx.method_targets.insert(*node_id, decl);

    let Some(def) = self.decls.as_function(&decl).cloned() else {
      self.infer_args_loose(args);
      return self.types.unknown();
    };
    let subst = self.instantiate(span, &def.type_params, type_args);
    if let Some(first) = def.params.first() {
      if let Some(declared) = self.decls.as_local(first).and_then(|local| local.ty) {
        let param_ty = fold_ty(&mut self.types, declared, &subst);
        self.autoborrow(receiver_ty, param_ty, mutable_place);
      }
    }
    let declared_ret = fold_ty(&mut self.types, def.ret, &subst);
    self.probe_expectation(declared_ret, expectation);
    for (index, arg) in args.iter().enumerate() {
      match def.params.get(index + 1) {
        Some(param) => {
          let declared = self.decls.as_local(param).and_then(|local| local.ty);
          let declared = declared.unwrap_or_else(|| self.types.unknown());
          let param_ty = fold_ty(&mut self.types, declared, &subst);
          let arg_ty = self.infer_expr(arg, Expectation::HasTy(param_ty));
          let arg_span = self.unit.node(arg).span;
          self.coerce(arg_span, arg_ty, param_ty, MismatchContext::General);
        },
        None => {
          self.infer_expr(arg, Expectation::None);
        },
      }
    }
    declared_ret
  }

  /// Probe whether the receiver reaches a candidate's first parameter,
  /// discarding every binding the probe makes. The winning candidate is
  /// re-instantiated for real afterwards.
  fn method_compatible(
    &mut self,
    span: Span,
    decl: DeclId,
    receiver_ty: TyId,
    mutable_place: bool,
  ) -> bool {
    let Some(def) = self.decls.as_function(&decl).cloned() else {
      return false;
    };
    let Some(first) = def.params.first() else {
      return false;
    };
    let Some(declared) = self.decls.as_local(first).and_then(|local| local.ty) else {
      return false;
    };
    let snapshot = self.ctx.vars.snapshot();
    let subst = self.instantiate(span, &def.type_params, &[]);
    let param_ty = fold_ty(&mut self.types, declared, &subst);
    let ok = self.autoborrow(receiver_ty, param_ty, mutable_place);
    self.ctx.vars.rollback_to(snapshot);
    ok
  }

  fn infer_macro_call(
    &mut self,
    span: Span,
    name: SymbolId,
    args: &[NodeId],
    expectation: Expectation,
  ) -> TyId {
    if self.config.features.generic_macros {
      let targets = self.scopes.lookup(&name, |decl| {
        matches!(&self.decls.get(decl).kind, DeclKind::Function(def) if def.is_macro)
      });
      if let [only] = targets.as_slice() {
        return self.type_call(span, *only, &[], args, expectation);
      }
    }
    let macro_name = {
      let symbols = self.symbols.borrow();
      symbols.get(&name).to_string()
    };
    let rule = self.macros.lookup(&macro_name).map(|spec| spec.rule);
    trace_dbg!(
      self.config,
      DebugTrace::Macros,
      "{}! -> {:?}",
      macro_name,
      rule
    );
    match rule {
      Some(MacroReturnRule::Unit) => {
        self.infer_args_loose(args);
        self.types.unit()
      },
      Some(MacroReturnRule::Opaque) | None => {
        self.infer_args_loose(args);
        self.types.unknown()
      },
      Some(MacroReturnRule::ByteString) => {
        self.infer_args_loose(args);
        let u8_ty = self.types.u8();
        self.types.vector(u8_ty)
      },
      Some(MacroReturnRule::OptionOf) => self.option_macro(args),
      Some(MacroReturnRule::ResultOf) => self.result_macro(args),
    }
  }

  fn option_macro(
    &mut self,
    args: &[NodeId],
  ) -> TyId {
    for arg in args.iter().skip(1) {
      self.infer_expr(arg, Expectation::None);
    }
    let Some(first) = args.first() else {
      return self.types.unknown();
    };
    let element = self.infer_expr(first, Expectation::None);
    let resolved = self.ctx.vars.shallow_resolve(&mut self.types, element);
    if self.types.is_unknown(&resolved) {
      return self.types.unknown();
    }
    let Some(option) = self.option_decl() else {
      return self.types.unknown();
    };
    let params = self.decls.type_params_of(&option).to_vec();
    let [param] = params.as_slice() else {
      return self.types.unknown();
    };
    let subst = Substitution::from_pairs([(*param, element)]);
    self.types.adt(option, subst, vec![element])
  }

  fn result_macro(
    &mut self,
    args: &[NodeId],
  ) -> TyId {
    for arg in args.iter().skip(2) {
      self.infer_expr(arg, Expectation::None);
    }
    let (Some(first), Some(second)) = (args.first(), args.get(1)) else {
      self.infer_args_loose(args);
      return self.types.unknown();
    };
    let ok_ty = self.infer_expr(first, Expectation::None);
    let err_ty = self.infer_expr(second, Expectation::None);
    let ok_res = self.ctx.vars.shallow_resolve(&mut self.types, ok_ty);
    let err_res = self.ctx.vars.shallow_resolve(&mut self.types, err_ty);
    if self.types.is_unknown(&ok_res) || self.types.is_unknown(&err_res) {
      return self.types.unknown();
    }
    let Some(result) = self.result_decl() else {
      return self.types.unknown();
    };
    let params = self.decls.type_params_of(&result).to_vec();
    let [ok_param, err_param] = params.as_slice() else {
      return self.types.unknown();
    };
    let subst = Substitution::from_pairs([(*ok_param, ok_ty), (*err_param, err_ty)]);
    self.types.adt(result, subst, vec![ok_ty, err_ty])
  }

  /// The standard library `Option` declaration if the unit carries one,
  /// else a synthesized skeleton so `option!` still types under test units
  /// without a stdlib surface.
  fn option_decl(&mut self) -> Option<DeclId> {
    if let Some(decl) = self.option_fallback {
      return Some(decl);
    }
    let (std_sym, module_sym, name_sym) = {
      let mut symbols = self.symbols.borrow_mut();
      (symbols.intern("std"), symbols.intern("option"), symbols.intern("Option"))
    };
    if let Some(found) = self.lookup_module_struct(std_sym, module_sym, name_sym) {
      self.option_fallback = Some(found);
      return self.option_fallback;
    }
    let decl = self.synthesize_struct(std_sym, module_sym, name_sym, &["Element"]);
    self.option_fallback = Some(decl);
    self.option_fallback
  }

  fn result_decl(&mut self) -> Option<DeclId> {
    if let Some(decl) = self.result_fallback {
      return Some(decl);
    }
    let (std_sym, module_sym, name_sym) = {
      let mut symbols = self.symbols.borrow_mut();
      (symbols.intern("std"), symbols.intern("result"), symbols.intern("Result"))
    };
    if let Some(found) = self.lookup_module_struct(std_sym, module_sym, name_sym) {
      self.result_fallback = Some(found);
      return self.result_fallback;
    }
    let decl = self.synthesize_struct(std_sym, module_sym, name_sym, &["Ok", "Err"]);
    self.result_fallback = Some(decl);
    self.result_fallback
  }

  fn lookup_module_struct(
    &self,
    address: SymbolId,
    module: SymbolId,
    name: SymbolId,
  ) -> Option<DeclId> {
    let module_decl = self.module_by_name.get(&(address, module))?;
    let items = self.module_items.get(module_decl)?;
    let ids = items.get(&name)?;
    ids
      .iter()
      .find(|id| matches!(&self.decls.get(id).kind, DeclKind::Struct(_)))
      .copied()
  }

  fn synthesize_struct(
    &mut self,
    address: SymbolId,
    module: SymbolId,
    name: SymbolId,
    param_names: &[&str],
  ) -> DeclId {
    let span = Span::default();
    let module_decl = self.decls.alloc(Decl {
      kind: DeclKind::Module(ModuleDef { address }),
      name: module,
      span,
      visibility: Visibility::Public,
      owner: None,
    });
    let struct_decl = self.decls.alloc_placeholder(name, span, Visibility::Public, Some(module_decl));
    let mut type_params = Vec::with_capacity(param_names.len());
    for (index, param_name) in param_names.iter().enumerate() {
      let param_sym = self.symbols.borrow_mut().intern(param_name);
      type_params.push(self.decls.alloc(Decl {
        kind: DeclKind::TypeParam(TypeParamDef {
          index: index as u32,
          owner: struct_decl,
        }),
        name: param_sym,
        span,
        visibility: Visibility::Private,
        owner: Some(struct_decl),
      }));
    }
    let fields = match type_params.as_slice() {
      [element] => {
        let elem_ty = self.types.type_param(*element);
        let vec_ty = self.types.vector(elem_ty);
        let vec_sym = self.symbols.borrow_mut().intern("vec");
        vec![FieldDef {
          name: vec_sym,
          ty: vec_ty,
          index: 0,
        }]
      },
      _ => Vec::new(),
    };
    self.decls.update(
      &struct_decl,
      DeclKind::Struct(StructDef {
        type_params,
        fields,
        positional: false,
      }),
    );
    struct_decl
  }

  /// Field access reads through references and substitutes the receiver's
  /// instantiation. An unknown receiver or missing field stays silent; the
  /// parser and resolver already said what they could.
  fn infer_field_access(
    &mut self,
    node_id: &NodeId,
    base: &NodeId,
    field: SymbolId,
  ) -> TyId {
    let base_ty = self.infer_expr(base, Expectation::None);
    let resolved = self.ctx.vars.shallow_resolve(&mut self.types, base_ty);
    let stripped = self.types.strip_references(resolved);
    let Ty::Adt { decl, subst, .. } = self.types.get(&stripped).clone() else {
      return self.types.unknown();
    };
    let owner = self.decls.field_owner(&decl);
    let found = self
      .decls
      .fields_of(&owner)
      .and_then(|fields| fields.iter().find(|f| f.name == field))
      .map(|f| (f.index, f.ty));
    let Some((index, field_ty)) = found else {
      return self.types.unknown();
    };
    self.ctx.field_targets.insert(*node_id, FieldTarget { owner, index });
    fold_ty_or_unknown(&mut self.types, field_ty, &subst)
  }

  fn infer_index(
    &mut self,
    span: Span,
    base: &NodeId,
    index: &NodeId,
  ) -> TyId {
    let base_ty = self.infer_expr(base, Expectation::None);
    let index_ty = self.infer_expr(index, Expectation::None);
    if !self.config.features.index_syntax {
      return self.types.unknown();
    }
    let resolved = self.ctx.vars.shallow_resolve(&mut self.types, base_ty);
    let stripped = self.types.strip_references(resolved);
    match self.types.get(&stripped) {
      Ty::Vector(element) => {
        let element = *element;
        let index_span = self.unit.node(index).span;
        let u64_ty = self.types.u64();
        self.coerce(index_span, index_ty, u64_ty, MismatchContext::General);
        element
      },
      Ty::Unknown => self.types.unknown(),
      _ => {
        self.ctx.errors.push(TypeError::IndexingNotAllowed { span, ty: base_ty });
        self.types.unknown()
      },
    }
  }

  fn infer_struct_lit(
    &mut self,
    path_id: &PathId,
    fields: &[StructLitField],
    expectation: Expectation,
  ) -> TyId {
    let namespaces: &[Ns] = if self.ctx.spec_mode {
      &[Ns::Type, Ns::Schema]
    } else {
      &[Ns::Type]
    };
    let resolved = self.resolve_path_multi(path_id, namespaces);
    let target = resolved.single_visible().filter(|decl| {
      matches!(
        &self.decls.get(decl).kind,
        DeclKind::Struct(_) | DeclKind::Variant(_) | DeclKind::Schema(_)
      )
    });
    let Some(decl) = target else {
      for field in fields {
        if let Some(value) = field.value {
          self.infer_expr(&value, Expectation::None);
        }
      }
      return self.types.unknown();
    };

    let path = self.unit.path(path_id);
    let owner = self.decls.field_owner(&decl);
    let type_params = self.decls.type_params_of(&owner).to_vec();
    let subst = self.instantiate(path.span, &type_params, &path.type_args);
    let unknown = self.types.unknown();
    let args: Vec<TyId> = type_params
      .iter()
      .map(|param| subst.get(*param).unwrap_or(unknown))
      .collect();
    let result = self.types.adt(owner, subst.clone(), args);
    self.probe_expectation(result, expectation);

    for field in fields {
      let declared = self
        .decls
        .fields_of(&decl)
        .and_then(|defs| defs.iter().find(|f| f.name == field.name))
        .map(|f| f.ty);
      let declared = declared.map(|ty| fold_ty(&mut self.types, ty, &subst));
      match (field.value, declared) {
        (Some(value), Some(field_ty)) => {
          let value_ty = self.infer_expr(&value, Expectation::HasTy(field_ty));
          let value_span = self.unit.node(&value).span;
          self.coerce(value_span, value_ty, field_ty, MismatchContext::General);
        },
        (Some(value), None) => {
          // Unknown field name: the value still gets a type.
          self.infer_expr(&value, Expectation::None);
        },
        (None, Some(field_ty)) => self.check_shorthand_field(field, field_ty),
        (None, None) => {},
      }
    }
    result
  }

  /// `S { x }` reads a binding named `x`; its type must fit the field.
  fn check_shorthand_field(
    &mut self,
    field: &StructLitField,
    field_ty: TyId,
  ) {
    let found = self.scopes.lookup(&field.name, |decl| {
      matches!(&self.decls.get(decl).kind, DeclKind::Local(_) | DeclKind::Const(_))
    });
    let [decl] = found.as_slice() else {
      return;
    };
    let actual = match &self.decls.get(decl).kind {
      DeclKind::Local(_) => self.ctx.binding_tys.get(decl).copied(),
      DeclKind::Const(def) => Some(def.ty),
      _ => None,
    };
    if let Some(actual) = actual {
      self.coerce(field.span, actual, field_ty, MismatchContext::General);
    }
  }

  fn infer_vector_lit(
    &mut self,
    span: Span,
    type_arg: &Option<AnnotId>,
    elements: &[NodeId],
  ) -> TyId {
    let element = match type_arg {
      Some(annot) => self.lower_annot(annot),
      None => self.ctx.vars.fresh_ty_var(&mut self.types, span),
    };
    for item in elements {
      let item_ty = self.infer_expr(item, Expectation::HasTy(element));
      let item_span = self.unit.node(item).span;
      self.coerce(item_span, item_ty, element, MismatchContext::Vector);
    }
    self.types.vector(element)
  }

  fn infer_tuple(
    &mut self,
    elements: &[NodeId],
    expectation: Expectation,
  ) -> TyId {
    let expected_elems: Option<Vec<TyId>> = expectation.ty().and_then(|expected| {
      let resolved = self.ctx.vars.shallow_resolve(&mut self.types, expected);
      match self.types.get(&resolved) {
        Ty::Tuple(tys) if tys.len() == elements.len() => Some(tys.clone()),
        _ => None,
      }
    });
    let mut tys = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
      let expected = expected_elems.as_ref().and_then(|tys| tys.get(index).copied());
      match expected {
        Some(expected) => {
          let ty = self.infer_expr(element, Expectation::HasTy(expected));
          let element_span = self.unit.node(element).span;
          self.coerce(element_span, ty, expected, MismatchContext::Tuple);
          tys.push(ty);
        },
        None => tys.push(self.infer_expr(element, Expectation::None)),
      }
    }
    self.types.tuple(tys)
  }

  fn infer_lambda(
    &mut self,
    params: &[LambdaParam],
    body: &NodeId,
    expectation: Expectation,
  ) -> TyId {
    let expected_sig: Option<(Vec<TyId>, TyId)> = expectation.ty().and_then(|expected| {
      let resolved = self.ctx.vars.shallow_resolve(&mut self.types, expected);
      match self.types.get(&resolved) {
        Ty::Lambda { params, ret } => Some((params.clone(), *ret)),
        _ => None,
      }
    });
    self.scopes.push(ScopeKind::Lambda);
    let mut param_tys = Vec::with_capacity(params.len());
    for (index, param) in params.iter().enumerate() {
      let ty = match &param.annot {
        Some(annot) => self.lower_annot(annot),
        None => match expected_sig.as_ref().and_then(|(tys, _)| tys.get(index).copied()) {
          Some(expected) => expected,
          None => {
            let pat_span = self.unit.pat(&param.pat).span;
            self.ctx.vars.fresh_ty_var(&mut self.types, pat_span)
          },
        },
      };
      self.bind_pattern(&param.pat, ty);
      param_tys.push(ty);
    }
    let body_expect = match expected_sig {
      Some((_, ret)) => Expectation::HasTy(ret),
      None => Expectation::None,
    };
    let body_ty = self.infer_expr(body, body_expect);
    self.scopes.pop();
    self.types.lambda(param_tys, body_ty)
  }

  fn infer_range(
    &mut self,
    lo: &NodeId,
    hi: &NodeId,
  ) -> TyId {
    let lo_ty = self.infer_expr(lo, Expectation::None);
    let hi_ty = self.infer_expr(hi, Expectation::HasTy(lo_ty));
    if self.try_combine(hi_ty, lo_ty).is_err() {
      let hi_span = self.unit.node(hi).span;
      self.ctx.errors.push(TypeError::TypeMismatch {
        span: hi_span,
        actual: hi_ty,
        expected: lo_ty,
        context: MismatchContext::Range,
      });
    }
    let element = self.ctx.vars.shallow_resolve(&mut self.types, lo_ty);
    self.types.range(element)
  }

  fn infer_let(
    &mut self,
    pat: &PatId,
    annot: Option<&AnnotId>,
    init: Option<&NodeId>,
  ) -> TyId {
    // Taken before the initializer runs: a nested block's lets must not
    // inherit the shared-scope placement of the statement containing them.
    let to_shared = std::mem::take(&mut self.ctx.spec_toplevel_let);
    let annot_ty = annot.map(|annot| self.lower_annot(annot));
    let init_ty = init.map(|init| {
      let expect = match annot_ty {
        Some(ty) => Expectation::HasTy(ty),
        None => Expectation::None,
      };
      (init, self.infer_expr(init, expect))
    });
    if let (Some((init, init_ty)), Some(annot_ty)) = (init_ty, annot_ty) {
      let init_span = self.unit.node(init).span;
      self.coerce(init_span, init_ty, annot_ty, MismatchContext::General);
    }
    let bound = match annot_ty.or(init_ty.map(|(_, ty)| ty)) {
      Some(ty) => ty,
      None => {
        let pat_span = self.unit.pat(pat).span;
        self.ctx.vars.fresh_ty_var(&mut self.types, pat_span)
      },
    };
    let shared = if to_shared { self.ctx.spec_let_scope } else { None };
    self.bind_pattern_in(pat, bound, shared);
    let diverges = init_ty.map(|(_, ty)| self.resolved_is_never(ty)).unwrap_or(false);
    if diverges {
      self.types.never()
    } else {
      self.types.unit()
    }
  }

  fn infer_assign(
    &mut self,
    target: &NodeId,
    value: &NodeId,
  ) -> TyId {
    let target_ty = self.infer_expr(target, Expectation::None);
    let value_ty = self.infer_expr(value, Expectation::HasTy(target_ty));
    let value_span = self.unit.node(value).span;
    self.coerce(value_span, value_ty, target_ty, MismatchContext::Assignment);
    if self.resolved_is_never(value_ty) || self.resolved_is_never(target_ty) {
      self.types.never()
    } else {
      self.types.unit()
    }
  }

  fn infer_include(
    &mut self,
    include: &IncludeStmt,
  ) -> TyId {
    match include {
      IncludeStmt::Plain { schema } => {
        self.infer_schema_operand(schema);
      },
      IncludeStmt::If { condition, schema } | IncludeStmt::Imply { condition, schema } => {
        self.coerce_condition(condition);
        self.infer_schema_operand(schema);
      },
      IncludeStmt::IfElse {
        condition,
        then_schema,
        else_schema,
      } => {
        self.coerce_condition(condition);
        self.infer_schema_operand(then_schema);
        self.infer_schema_operand(else_schema);
      },
    }
    self.types.unit()
  }

  fn coerce_condition(
    &mut self,
    condition: &NodeId,
  ) {
    let ty = self.infer_expr(condition, Expectation::None);
    let span = self.unit.node(condition).span;
    let boolean = self.types.boolean();
    self.coerce(span, ty, boolean, MismatchContext::General);
  }

  /// An include operand is a schema literal or a bare schema path; the
  /// latter never resolves in the value namespaces the plain path rule
  /// tries, so it is resolved here in the schema namespace instead.
  fn infer_schema_operand(
    &mut self,
    node_id: &NodeId,
  ) -> TyId {
    if let Some(existing) = self.ctx.expr_tys.get(node_id) {
      return *existing;
    }
    let node = self.unit.node(node_id);
    let NodeKind::Path(path) = &node.kind else {
      return self.infer_expr(node_id, Expectation::None);
    };
    let resolved = self.resolve_path_ns(path, Ns::Schema);
    let ty = match resolved.single_visible() {
      Some(decl) => {
        let path_item = self.unit.path(path);
        let type_params = self.decls.type_params_of(&decl).to_vec();
        let subst = self.instantiate(path_item.span, &type_params, &path_item.type_args);
        let unknown = self.types.unknown();
        let args: Vec<TyId> = type_params
          .iter()
          .map(|param| subst.get(*param).unwrap_or(unknown))
          .collect();
        self.types.adt(decl, subst, args)
      },
      None => self.types.unknown(),
    };
    self.ctx.expr_tys.insert(*node_id, ty);
    ty
  }
}
