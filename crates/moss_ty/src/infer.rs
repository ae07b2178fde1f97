use std::collections::HashMap;

use crate::span::Span;
use crate::ty::{IntegerKind, Ty, TyId, TypeStore};

/// General inference variable, standing in for any type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TyVarId(pub u32);

/// Integer-specific inference variable. Carried by every unsuffixed integer
/// literal outside specification mode; binding one of these is how a whole
/// group of default-kind expressions refines to a concrete width at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntVarId(pub u32);

/// Failed combination of two types. The walker decides how to present it;
/// this layer only records the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombineError {
  pub actual: TyId,
  pub expected: TyId,
}

/// Checkpoint for speculative unification. Obtained from
/// [`VarTable::snapshot`] and consumed by exactly one of
/// [`VarTable::rollback_to`] or [`VarTable::commit`].
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct Snapshot {
  journal_len: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Undo {
  NewTyVar(TyVarId),
  NewIntVar(IntVarId),
  TyParent { child: TyVarId, prev: Option<TyVarId> },
  IntParent { child: IntVarId, prev: Option<IntVarId> },
  TyBinding { var: TyVarId, prev: Option<TyId> },
  IntBinding { var: IntVarId, prev: Option<TyId> },
}

/// Union-find store for inference variables, with journaled mutation so a
/// speculative probe can be rolled back to exactly the state it started
/// from. Mutations are only journaled while at least one snapshot is open.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VarTable {
  next_ty_var: u32,
  next_int_var: u32,
  ty_parent: HashMap<TyVarId, TyVarId>,
  ty_binding: HashMap<TyVarId, TyId>,
  ty_origin: HashMap<TyVarId, Span>,
  int_parent: HashMap<IntVarId, IntVarId>,
  int_binding: HashMap<IntVarId, TyId>,
  int_origin: HashMap<IntVarId, Span>,
  journal: Vec<Undo>,
  open_snapshots: u32,
}

impl VarTable {
  pub fn new() -> Self {
    Self::default()
  }

  fn record(
    &mut self,
    undo: Undo,
  ) {
    if self.open_snapshots > 0 {
      self.journal.push(undo);
    }
  }

  pub fn fresh_ty_var(
    &mut self,
    types: &mut TypeStore,
    origin: Span,
  ) -> TyId {
    let id = TyVarId(self.next_ty_var);
    self.next_ty_var += 1;
    self.ty_parent.insert(id, id);
    self.ty_origin.insert(id, origin);
    self.record(Undo::NewTyVar(id));
    types.ty_var(id)
  }

  pub fn fresh_int_var(
    &mut self,
    types: &mut TypeStore,
    origin: Span,
  ) -> TyId {
    let id = IntVarId(self.next_int_var);
    self.next_int_var += 1;
    self.int_parent.insert(id, id);
    self.int_origin.insert(id, origin);
    self.record(Undo::NewIntVar(id));
    types.int_var(id)
  }

  pub fn ty_var_origin(
    &self,
    var: TyVarId,
  ) -> Option<&Span> {
    self.ty_origin.get(&self.find_ty_root(var))
  }

  pub fn find_ty_root(
    &self,
    var: TyVarId,
  ) -> TyVarId {
    let mut current = var;
    loop {
      let parent = self.ty_parent.get(&current).copied().unwrap_or(current);
      if parent == current {
        return current;
      }
      current = parent;
    }
  }

  pub fn find_int_root(
    &self,
    var: IntVarId,
  ) -> IntVarId {
    let mut current = var;
    loop {
      let parent = self.int_parent.get(&current).copied().unwrap_or(current);
      if parent == current {
        return current;
      }
      current = parent;
    }
  }

  fn union_ty(
    &mut self,
    a: TyVarId,
    b: TyVarId,
  ) {
    let root_a = self.find_ty_root(a);
    let root_b = self.find_ty_root(b);
    if root_a != root_b {
      let prev = self.ty_parent.insert(root_a, root_b);
      self.record(Undo::TyParent { child: root_a, prev });
    }
  }

  fn union_int(
    &mut self,
    a: IntVarId,
    b: IntVarId,
  ) {
    let root_a = self.find_int_root(a);
    let root_b = self.find_int_root(b);
    if root_a != root_b {
      let prev = self.int_parent.insert(root_a, root_b);
      self.record(Undo::IntParent { child: root_a, prev });
    }
  }

  fn bind_ty(
    &mut self,
    types: &mut TypeStore,
    var: TyVarId,
    ty: TyId,
  ) -> Result<(), CombineError> {
    let root = self.find_ty_root(var);

    if let Some(existing) = self.ty_binding.get(&root).copied() {
      return self.combine(types, existing, ty);
    }

    if self.occurs_check(types, root, ty) {
      let var_ty = types.ty_var(root);
      return Err(CombineError {
        actual: var_ty,
        expected: ty,
      });
    }

    let prev = self.ty_binding.insert(root, ty);
    self.record(Undo::TyBinding { var: root, prev });
    Ok(())
  }

  fn bind_int(
    &mut self,
    types: &mut TypeStore,
    var: IntVarId,
    ty: TyId,
  ) -> Result<(), CombineError> {
    let root = self.find_int_root(var);

    if let Some(existing) = self.int_binding.get(&root).copied() {
      return self.combine(types, existing, ty);
    }

    let prev = self.int_binding.insert(root, ty);
    self.record(Undo::IntBinding { var: root, prev });
    Ok(())
  }

  fn occurs_check(
    &self,
    types: &TypeStore,
    var: TyVarId,
    ty: TyId,
  ) -> bool {
    match types.get(&ty) {
      Ty::Var(id) => self.find_ty_root(*id) == var,
      Ty::Vector(element) | Ty::Range(element) => self.occurs_check(types, var, *element),
      Ty::Reference { inner, .. } => self.occurs_check(types, var, *inner),
      Ty::Tuple(elements) => elements.iter().any(|e| self.occurs_check(types, var, *e)),
      Ty::Lambda { params, ret } => {
        params.iter().any(|p| self.occurs_check(types, var, *p)) || self.occurs_check(types, var, *ret)
      },
      Ty::Adt { type_args, .. } => type_args.iter().any(|a| self.occurs_check(types, var, *a)),
      _ => false,
    }
  }

  /// Make `actual` compatible with `expected`, binding free variables as
  /// needed. Reports nothing; the caller owns diagnostics. The pair is
  /// directional only where Move itself is: a mutable reference is accepted
  /// where an immutable one is expected, not the reverse.
  pub fn combine(
    &mut self,
    types: &mut TypeStore,
    actual: TyId,
    expected: TyId,
  ) -> Result<(), CombineError> {
    let actual = self.shallow_resolve(types, actual);
    let expected = self.shallow_resolve(types, expected);

    if actual == expected {
      return Ok(());
    }

    let err = CombineError { actual, expected };

    match (types.get(&actual).clone(), types.get(&expected).clone()) {
      (Ty::Never, _) | (_, Ty::Never) => Ok(()),
      (Ty::Unknown, _) | (_, Ty::Unknown) => Ok(()),

      (Ty::Var(a), Ty::Var(b)) => {
        self.union_ty(a, b);
        Ok(())
      },
      (Ty::Var(v), _) => self.bind_ty(types, v, expected),
      (_, Ty::Var(v)) => self.bind_ty(types, v, actual),

      (Ty::IntVar(a), Ty::IntVar(b)) => {
        self.union_int(a, b);
        Ok(())
      },
      (Ty::IntVar(v), Ty::Integer(kind)) | (Ty::Integer(kind), Ty::IntVar(v)) => {
        if kind.is_default() {
          // Any integer satisfies a default expectation; committing the
          // variable here would block a later, tighter refinement.
          Ok(())
        } else {
          let target = types.integer(kind);
          self.bind_int(types, v, target)
        }
      },
      (Ty::IntVar(v), Ty::Num) | (Ty::Num, Ty::IntVar(v)) => {
        let num = types.num();
        self.bind_int(types, v, num)
      },
      (Ty::IntVar(_), _) | (_, Ty::IntVar(_)) => Err(err),

      (Ty::Integer(a), Ty::Integer(b)) => {
        if a == b || a.is_default() || b.is_default() {
          Ok(())
        } else {
          Err(err)
        }
      },
      // Specification mode treats every integer as unbounded.
      (Ty::Num, Ty::Integer(_)) | (Ty::Integer(_), Ty::Num) => Ok(()),

      (
        Ty::Reference {
          inner: actual_inner,
          mutability: actual_mut,
          ..
        },
        Ty::Reference {
          inner: expected_inner,
          mutability: expected_mut,
          ..
        },
      ) => {
        if expected_mut.is_mut() && !actual_mut.is_mut() {
          return Err(err);
        }
        self.combine(types, actual_inner, expected_inner)
      },

      (Ty::Vector(a), Ty::Vector(b)) => self.combine(types, a, b),
      (Ty::Range(a), Ty::Range(b)) => self.combine(types, a, b),

      (Ty::Tuple(actual_elems), Ty::Tuple(expected_elems)) => {
        if actual_elems.len() != expected_elems.len() {
          return Err(err);
        }
        for (a, e) in actual_elems.iter().zip(expected_elems.iter()) {
          self.combine(types, *a, *e)?;
        }
        Ok(())
      },

      (
        Ty::Lambda {
          params: actual_params,
          ret: actual_ret,
        },
        Ty::Lambda {
          params: expected_params,
          ret: expected_ret,
        },
      ) => {
        if actual_params.len() != expected_params.len() {
          return Err(err);
        }
        for (a, e) in actual_params.iter().zip(expected_params.iter()) {
          self.combine(types, *a, *e)?;
        }
        self.combine(types, actual_ret, expected_ret)
      },

      (
        Ty::Adt {
          decl: actual_decl,
          type_args: actual_args,
          ..
        },
        Ty::Adt {
          decl: expected_decl,
          type_args: expected_args,
          ..
        },
      ) => {
        if actual_decl != expected_decl || actual_args.len() != expected_args.len() {
          return Err(err);
        }
        for (a, e) in actual_args.iter().zip(expected_args.iter()) {
          self.combine(types, *a, *e)?;
        }
        Ok(())
      },

      _ => Err(err),
    }
  }

  /// Follow variable bindings at the top level only. Bound variables step to
  /// their binding; unbound ones normalize to their union-find root.
  pub fn shallow_resolve(
    &self,
    types: &mut TypeStore,
    ty: TyId,
  ) -> TyId {
    match types.get(&ty).clone() {
      Ty::Var(v) => {
        let root = self.find_ty_root(v);
        match self.ty_binding.get(&root).copied() {
          Some(binding) => self.shallow_resolve(types, binding),
          None => types.ty_var(root),
        }
      },
      Ty::IntVar(v) => {
        let root = self.find_int_root(v);
        match self.int_binding.get(&root).copied() {
          Some(binding) => self.shallow_resolve(types, binding),
          None => types.int_var(root),
        }
      },
      _ => ty,
    }
  }

  /// Structurally replace bound variables with their bindings. Unbound
  /// variables are kept so the caller can see what is still open.
  pub fn resolve(
    &self,
    types: &mut TypeStore,
    ty: TyId,
  ) -> TyId {
    self.resolve_impl(types, ty, None)
  }

  /// Fully resolve for the final result tables: unbound integer variables
  /// default (`integer` outside specification mode, `num` inside) and
  /// unbound general variables become `Unknown`.
  pub fn finalize(
    &self,
    types: &mut TypeStore,
    ty: TyId,
    spec_mode: bool,
  ) -> TyId {
    self.resolve_impl(types, ty, Some(spec_mode))
  }

  fn resolve_impl(
    &self,
    types: &mut TypeStore,
    ty: TyId,
    default_mode: Option<bool>,
  ) -> TyId {
    match types.get(&ty).clone() {
      Ty::Var(v) => {
        let root = self.find_ty_root(v);
        match self.ty_binding.get(&root).copied() {
          Some(binding) => self.resolve_impl(types, binding, default_mode),
          None => match default_mode {
            Some(_) => types.unknown(),
            None => types.ty_var(root),
          },
        }
      },
      Ty::IntVar(v) => {
        let root = self.find_int_root(v);
        match self.int_binding.get(&root).copied() {
          Some(binding) => self.resolve_impl(types, binding, default_mode),
          None => match default_mode {
            Some(true) => types.num(),
            Some(false) => types.integer(IntegerKind::Default),
            None => types.int_var(root),
          },
        }
      },
      Ty::Vector(element) => {
        let resolved = self.resolve_impl(types, element, default_mode);
        if resolved == element {
          ty
        } else {
          types.vector(resolved)
        }
      },
      Ty::Range(element) => {
        let resolved = self.resolve_impl(types, element, default_mode);
        if resolved == element {
          ty
        } else {
          types.range(resolved)
        }
      },
      Ty::Reference {
        inner,
        mutability,
        spec_mode,
      } => {
        let resolved = self.resolve_impl(types, inner, default_mode);
        if resolved == inner {
          ty
        } else {
          types.reference(resolved, mutability, spec_mode)
        }
      },
      Ty::Tuple(elements) => {
        let resolved: Vec<TyId> = elements
          .iter()
          .map(|e| self.resolve_impl(types, *e, default_mode))
          .collect();
        if resolved == elements {
          ty
        } else {
          types.tuple(resolved)
        }
      },
      Ty::Lambda { params, ret } => {
        let resolved_params: Vec<TyId> = params
          .iter()
          .map(|p| self.resolve_impl(types, *p, default_mode))
          .collect();
        let resolved_ret = self.resolve_impl(types, ret, default_mode);
        if resolved_params == params && resolved_ret == ret {
          ty
        } else {
          types.lambda(resolved_params, resolved_ret)
        }
      },
      Ty::Adt {
        decl,
        subst,
        type_args,
      } => {
        let resolved_args: Vec<TyId> = type_args
          .iter()
          .map(|a| self.resolve_impl(types, *a, default_mode))
          .collect();
        if resolved_args == type_args {
          ty
        } else {
          let resolved_subst = crate::subst::Substitution::from_pairs(
            subst
              .iter()
              .map(|(param, value)| (param, self.resolve_impl(types, value, default_mode))),
          );
          types.adt(decl, resolved_subst, resolved_args)
        }
      },
      _ => ty,
    }
  }

  /// Open a speculative bracket. Every mutation until the matching
  /// `rollback_to`/`commit` is journaled.
  pub fn snapshot(&mut self) -> Snapshot {
    self.open_snapshots += 1;
    Snapshot {
      journal_len: self.journal.len(),
    }
  }

  /// Undo every mutation made since `snapshot` was taken.
  pub fn rollback_to(
    &mut self,
    snapshot: Snapshot,
  ) {
    debug_assert!(self.open_snapshots > 0, "rollback without an open snapshot");
    while self.journal.len() > snapshot.journal_len {
      match self.journal.pop() {
        Some(Undo::NewTyVar(id)) => {
          self.ty_parent.remove(&id);
          self.ty_origin.remove(&id);
          self.next_ty_var -= 1;
        },
        Some(Undo::NewIntVar(id)) => {
          self.int_parent.remove(&id);
          self.int_origin.remove(&id);
          self.next_int_var -= 1;
        },
        Some(Undo::TyParent { child, prev }) => {
          match prev {
            Some(p) => self.ty_parent.insert(child, p),
            None => self.ty_parent.remove(&child),
          };
        },
        Some(Undo::IntParent { child, prev }) => {
          match prev {
            Some(p) => self.int_parent.insert(child, p),
            None => self.int_parent.remove(&child),
          };
        },
        Some(Undo::TyBinding { var, prev }) => {
          match prev {
            Some(p) => self.ty_binding.insert(var, p),
            None => self.ty_binding.remove(&var),
          };
        },
        Some(Undo::IntBinding { var, prev }) => {
          match prev {
            Some(p) => self.int_binding.insert(var, p),
            None => self.int_binding.remove(&var),
          };
        },
        None => break,
      }
    }
    self.open_snapshots -= 1;
  }

  /// Keep the mutations made since `snapshot`. The journal is dropped once
  /// the outermost bracket commits.
  pub fn commit(
    &mut self,
    snapshot: Snapshot,
  ) {
    debug_assert!(self.open_snapshots > 0, "commit without an open snapshot");
    let _ = snapshot;
    self.open_snapshots -= 1;
    if self.open_snapshots == 0 {
      self.journal.clear();
    }
  }
}
