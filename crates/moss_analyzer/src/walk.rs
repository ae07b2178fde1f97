use moss_diagnostics::MismatchContext;
use moss_log::{log_dbg, phase_log};
use moss_syntax::item::ConstItem;
use moss_syntax::statement::{IncludeStmt, LetKind};
use moss_syntax::{Block, NodeId, NodeKind, Unit};
use moss_ty::decl::{Decl, DeclKind, LocalDef, Visibility};
use moss_ty::ty::TyId;

use crate::scope::ScopeKind;
use crate::{Analyzer, Expectation};

impl<'a> Analyzer<'a> {
  /// Walk the main module's bodies: constants first, then function
  /// bodies, then module-level spec blocks. Pre-imported modules only
  /// contribute signatures.
  pub(crate) fn typecheck_phase(&mut self) {
    phase_log!(self.config, indent = 1, "typecheck: walking the main module");
    let unit = self.unit;
    let Some(main) = unit.main_module() else {
      return;
    };
    for (index, item) in main.consts.iter().enumerate() {
      if self.cancel.is_cancelled() {
        self.ctx.cancelled = true;
        return;
      }
      self.walk_const(0, index, item);
    }
    for index in 0..main.functions.len() {
      if self.cancel.is_cancelled() {
        self.ctx.cancelled = true;
        return;
      }
      self.walk_function(0, index);
    }
    for index in 0..main.spec_blocks.len() {
      if self.cancel.is_cancelled() {
        self.ctx.cancelled = true;
        return;
      }
      self.walk_spec_block(0, index);
    }
  }

  fn walk_const(
    &mut self,
    module_index: usize,
    index: usize,
    item: &ConstItem,
  ) {
    let decl = self.item_decls[module_index].consts[index];
    let Some(declared) = self.decls.const_ty(&decl) else {
      return;
    };
    let module_scope = self.module_scopes[module_index];
    self.scopes.set_current(&module_scope);
    if let Some(value) = item.value {
      let ty = self.infer_expr(&value, Expectation::HasTy(declared));
      let span = self.unit.node(&value).span;
      self.coerce(span, ty, declared, MismatchContext::General);
      self.defensive_pass(&value);
    }
  }

  fn walk_function(
    &mut self,
    module_index: usize,
    index: usize,
  ) {
    let unit = self.unit;
    let item = &unit.modules[module_index].functions[index];
    let Some(body) = item.body else {
      return;
    };
    let decl = self.item_decls[module_index].functions[index];
    let Some(def) = self.decls.as_function(&decl).cloned() else {
      return;
    };
    {
      let symbols = self.symbols.borrow();
      log_dbg!(self.config, "walking body of {}", symbols.get(&item.name));
    }

    let module_scope = self.module_scopes[module_index];
    self.scopes.set_current(&module_scope);
    self.scopes.push(ScopeKind::Function);
    self.enter_type_params(decl);
    for (param_decl, param_item) in def.params.iter().zip(&item.params) {
      let ty = match self.decls.as_local(param_decl).and_then(|local| local.ty) {
        Some(ty) => ty,
        None => self.types.unknown(),
      };
      self.ctx.binding_tys.insert(*param_decl, ty);
      self.scopes.shadow(param_item.name, *param_decl);
    }

    let saved_spec = self.ctx.spec_mode;
    self.ctx.spec_mode = item.is_spec;
    self.ctx.expected_return = Some(def.ret);
    self.ctx.return_annot_span = item.ret.as_ref().map(|annot| unit.annot(annot).span);
    self.ctx.body_block = Some(body);

    self.infer_expr(&body, Expectation::HasTy(def.ret));
    self.defensive_pass(&body);

    self.ctx.spec_mode = saved_spec;
    self.ctx.expected_return = None;
    self.ctx.return_annot_span = None;
    self.ctx.body_block = None;
    self.scopes.pop();
  }

  /// Walk a module-level spec block. When it targets a function, the
  /// target's parameters and a `result` binding of its return type come
  /// into scope. Top-level `let`s bind into the module's shared spec
  /// scope, where sibling blocks can see them.
  fn walk_spec_block(
    &mut self,
    module_index: usize,
    index: usize,
  ) {
    let unit = self.unit;
    let item = &unit.modules[module_index].spec_blocks[index];
    let spec_scope = self.module_spec_scopes[module_index];
    self.scopes.set_current(&spec_scope);
    self.scopes.push(ScopeKind::Spec);

    if let Some(target) = item.target {
      let module = &unit.modules[module_index];
      let pair = module
        .functions
        .iter()
        .zip(self.item_decls[module_index].functions.clone())
        .find(|(function, _)| function.name == target);
      let def = pair
        .as_ref()
        .and_then(|(_, fn_decl)| self.decls.as_function(fn_decl).cloned());
      if let (Some((fn_item, fn_decl)), Some(def)) = (pair, def) {
        for (param_decl, param_item) in def.params.iter().zip(&fn_item.params) {
          if let Some(ty) = self.decls.as_local(param_decl).and_then(|local| local.ty) {
            self.ctx.binding_tys.insert(*param_decl, ty);
          }
          self.scopes.shadow(param_item.name, *param_decl);
        }
        let result_name = self.symbols.borrow_mut().intern("result");
        let result_decl = self.decls.alloc(Decl {
          kind: DeclKind::Local(LocalDef {
            ty: Some(def.ret),
            mutable: false,
          }),
          name: result_name,
          span: item.span,
          visibility: Visibility::Private,
          owner: Some(fn_decl),
        });
        self.ctx.binding_tys.insert(result_decl, def.ret);
        self.scopes.shadow(result_name, result_decl);
      }
    }

    let saved_spec = self.ctx.spec_mode;
    self.ctx.spec_mode = true;
    self.ctx.spec_body_block = Some(item.body);
    self.ctx.spec_let_scope = Some(spec_scope);
    self.infer_expr(&item.body, Expectation::None);
    self.defensive_pass(&item.body);
    self.ctx.spec_mode = saved_spec;
    self.ctx.spec_body_block = None;
    self.ctx.spec_let_scope = None;
    self.scopes.pop();
  }

  /// Type a block's contents. Statements go in source order, except in
  /// spec regions where `let pre` bindings come first, then `let post`,
  /// then the rest, each class keeping source order. Any diverging
  /// statement makes the whole block `Never`. The trailing expression
  /// takes the block's expectation; a missing one reads as unit.
  pub(crate) fn infer_block(
    &mut self,
    node_id: &NodeId,
    block: &Block,
    expectation: Expectation,
  ) -> TyId {
    let ret_position = self.ctx.body_block == Some(*node_id);
    let spec_toplevel = self.ctx.spec_body_block == Some(*node_id);
    self.scopes.push(ScopeKind::Block);

    let mut diverges = false;
    for statement in self.block_order(block) {
      self.ctx.spec_toplevel_let = spec_toplevel;
      let ty = self.infer_expr(&statement, Expectation::None);
      self.ctx.spec_toplevel_let = false;
      if self.resolved_is_never(ty) {
        diverges = true;
      }
    }

    let tail_ty = match &block.expression {
      Some(tail) => {
        let ty = self.infer_expr(tail, expectation);
        match expectation {
          Expectation::HasTy(expected) => {
            let span = self.unit.node(tail).span;
            if ret_position {
              self.coerce_return(span, ty, expected);
            } else {
              self.coerce(span, ty, expected, MismatchContext::General);
            }
            expected
          },
          Expectation::None => ty,
        }
      },
      None => {
        let unit_ty = self.types.unit();
        match expectation {
          Expectation::HasTy(expected) => {
            let span = self.unit.node(node_id).span;
            if ret_position {
              self.coerce_return(span, unit_ty, expected);
            } else {
              self.coerce(span, unit_ty, expected, MismatchContext::General);
            }
            expected
          },
          Expectation::None => unit_ty,
        }
      },
    };

    self.scopes.pop();
    if diverges {
      self.types.never()
    } else {
      tail_ty
    }
  }

  fn block_order(
    &self,
    block: &Block,
  ) -> Vec<NodeId> {
    if !self.ctx.spec_mode {
      return block.statements.clone();
    }
    let mut ordered = Vec::with_capacity(block.statements.len());
    let mut post = Vec::new();
    let mut rest = Vec::new();
    for statement in &block.statements {
      match &self.unit.node(statement).kind {
        NodeKind::Let { kind: LetKind::Pre, .. } => ordered.push(*statement),
        NodeKind::Let { kind: LetKind::Post, .. } => post.push(*statement),
        _ => rest.push(*statement),
      }
    }
    ordered.extend(post);
    ordered.extend(rest);
    ordered
  }

  /// After a body is walked, type anything inside it the walk never
  /// reached (dead arms behind parse recovery, operands of error nodes).
  /// Every node ends up with a type; hover never comes back empty.
  pub(crate) fn defensive_pass(
    &mut self,
    root: &NodeId,
  ) {
    let mut stack = vec![*root];
    let mut missing: Vec<NodeId> = Vec::new();
    while let Some(id) = stack.pop() {
      if !self.ctx.expr_tys.contains_key(&id) {
        missing.push(id);
      }
      each_child(self.unit, &id, &mut |child| stack.push(child));
    }
    for id in missing {
      if self.cancel.is_cancelled() {
        self.ctx.cancelled = true;
        return;
      }
      self.infer_expr(&id, Expectation::None);
    }
  }
}

/// Visit the expression children of one node.
fn each_child(
  unit: &Unit,
  id: &NodeId,
  visit: &mut impl FnMut(NodeId),
) {
  match &unit.node(id).kind {
    NodeKind::Literal(_) | NodeKind::Path(_) | NodeKind::Continue | NodeKind::Error => {},
    NodeKind::Borrow { expr, .. } | NodeKind::Deref(expr) | NodeKind::Not(expr) | NodeKind::Cast { expr, .. } => {
      visit(*expr)
    },
    NodeKind::Abort(expr) | NodeKind::Is { expr, .. } => visit(*expr),
    NodeKind::Binary { lhs, rhs, .. } => {
      visit(*lhs);
      visit(*rhs);
    },
    NodeKind::Call { args, .. } | NodeKind::MacroCall { args, .. } => {
      for arg in args {
        visit(*arg);
      }
    },
    NodeKind::MethodCall { receiver, args, .. } => {
      visit(*receiver);
      for arg in args {
        visit(*arg);
      }
    },
    NodeKind::FieldAccess { base, .. } => visit(*base),
    NodeKind::Index { base, index } => {
      visit(*base);
      visit(*index);
    },
    NodeKind::StructLit { fields, .. } => {
      for field in fields {
        if let Some(value) = field.value {
          visit(value);
        }
      }
    },
    NodeKind::VectorLit { elements, .. } => {
      for element in elements {
        visit(*element);
      }
    },
    NodeKind::Tuple(elements) => {
      for element in elements {
        visit(*element);
      }
    },
    NodeKind::Lambda { body, .. } => visit(*body),
    NodeKind::Range { lo, hi } => {
      visit(*lo);
      visit(*hi);
    },
    NodeKind::If {
      condition,
      then_branch,
      else_branch,
    } => {
      visit(*condition);
      visit(*then_branch);
      if let Some(else_branch) = else_branch {
        visit(*else_branch);
      }
    },
    NodeKind::While { condition, body } => {
      visit(*condition);
      visit(*body);
    },
    NodeKind::Loop { body } => visit(*body),
    NodeKind::For { iterable, body, .. } => {
      visit(*iterable);
      visit(*body);
    },
    NodeKind::Match { scrutinee, arms } => {
      visit(*scrutinee);
      for arm in arms {
        if let Some(guard) = arm.guard {
          visit(guard);
        }
        visit(arm.body);
      }
    },
    NodeKind::Block(block) | NodeKind::SpecBlock(block) => {
      for statement in &block.statements {
        visit(*statement);
      }
      if let Some(expression) = block.expression {
        visit(expression);
      }
    },
    NodeKind::Return(value) | NodeKind::Break(value) => {
      if let Some(value) = value {
        visit(*value);
      }
    },
    NodeKind::Let { init, .. } => {
      if let Some(init) = init {
        visit(*init);
      }
    },
    NodeKind::Assign { target, value } | NodeKind::Update { target, value } => {
      visit(*target);
      visit(*value);
    },
    NodeKind::Include(include) => match include {
      IncludeStmt::Plain { schema } => visit(*schema),
      IncludeStmt::If { condition, schema } | IncludeStmt::Imply { condition, schema } => {
        visit(*condition);
        visit(*schema);
      },
      IncludeStmt::IfElse {
        condition,
        then_schema,
        else_schema,
      } => {
        visit(*condition);
        visit(*then_schema);
        visit(*else_schema);
      },
    },
  }
}
