use moss_diagnostics::{TypeError, UnpackShape};
use moss_syntax::{FieldPat, PatId, PatKind, PathId};
use moss_ty::decl::{Decl, DeclId, DeclKind, LocalDef, Visibility};
use moss_ty::span::Span;
use moss_ty::subst::{fold_ty_or_unknown, Substitution};
use moss_ty::symbol::SymbolId;
use moss_ty::ty::{Mutability, Ty, TyId};

use crate::resolve::Ns;
use crate::scope::ScopeId;
use crate::Analyzer;

/// Reference peeled off a scrutinee before destructuring; extracted pieces
/// are read back through it.
type RefWrap = Option<(Mutability, bool)>;

impl<'a> Analyzer<'a> {
  /// Extract a pattern's bindings against the type it matches. Every
  /// sub-pattern lands in `pat_tys`; introduced locals get scope entries
  /// and `binding_tys` cells.
  pub(crate) fn bind_pattern(
    &mut self,
    pat_id: &PatId,
    ty: TyId,
  ) {
    self.bind_pattern_in(pat_id, ty, None);
  }

  /// Like [`Self::bind_pattern`], but names go into `shared` instead of the
  /// current scope when given. Module-level spec blocks use this so their
  /// top-level `let`s reach sibling blocks.
  pub(crate) fn bind_pattern_in(
    &mut self,
    pat_id: &PatId,
    ty: TyId,
    shared: Option<ScopeId>,
  ) {
    let unit = self.unit;
    let pat = unit.pat(pat_id);
    self.ctx.pat_tys.insert(*pat_id, ty);
    match &pat.kind {
      PatKind::Wildcard => {},
      PatKind::Binding { name, mutable } => {
        self.bind_name(pat_id, *name, *mutable, pat.span, ty, shared);
      },
      PatKind::Tuple(pats) => self.bind_tuple(pat.span, pats, ty, shared),
      PatKind::Struct { path, fields, .. } => {
        self.bind_struct(pat_id, pat.span, path, fields, ty, shared);
      },
      PatKind::TupleStruct { path, pats } => {
        self.bind_tuple_struct(pat_id, pat.span, path, pats, ty, shared);
      },
      PatKind::Path(path) => self.bind_path_pattern(pat_id, pat.span, path, ty),
      PatKind::Lit(lit) => {
        let lit_ty = self.literal_ty(lit, pat.span);
        let _ = self.try_combine(lit_ty, ty);
      },
    }
  }

  /// A bare name captures a constant in scope or a fieldless variant of the
  /// module under analysis; otherwise it introduces a binding.
  fn bind_name(
    &mut self,
    pat_id: &PatId,
    name: SymbolId,
    mutable: bool,
    span: Span,
    ty: TyId,
    shared: Option<ScopeId>,
  ) {
    let mut constants = self.scopes.lookup(&name, |decl| match &self.decls.get(decl).kind {
      DeclKind::Const(_) => true,
      DeclKind::Variant(def) => def.fields.is_empty(),
      _ => false,
    });
    for variant in self.main_module_variants() {
      let fieldless = matches!(
        &self.decls.get(&variant).kind,
        DeclKind::Variant(def) if def.fields.is_empty()
      );
      if fieldless && self.decls.name_of(&variant) == name && !constants.contains(&variant) {
        constants.push(variant);
      }
    }
    if let [decl] = constants.as_slice() {
      let decl = *decl;
      self.ctx.pat_targets.insert(*pat_id, decl);
      let expected = self.constant_pattern_ty(decl, span);
      let _ = self.try_combine(ty, expected);
      return;
    }

    let resolved = self.ctx.vars.shallow_resolve(&mut self.types, ty);
    if let Ty::Tuple(elements) = self.types.get(&resolved) {
      if elements.len() >= 2 {
        self.ctx.errors.push(TypeError::InvalidUnpacking {
          span,
          assigned: ty,
          shape: UnpackShape::SingleVariable,
        });
        let unknown = self.types.unknown();
        let decl = self.define_binding(name, span, mutable, unknown, shared);
        self.ctx.pat_targets.insert(*pat_id, decl);
        return;
      }
    }
    let decl = self.define_binding(name, span, mutable, ty, shared);
    self.ctx.pat_targets.insert(*pat_id, decl);
  }

  fn main_module_variants(&self) -> Vec<DeclId> {
    self
      .item_decls
      .first()
      .map(|items| items.variants.iter().flatten().copied().collect())
      .unwrap_or_default()
  }

  fn constant_pattern_ty(
    &mut self,
    decl: DeclId,
    span: Span,
  ) -> TyId {
    match &self.decls.get(&decl).kind {
      DeclKind::Const(def) => def.ty,
      DeclKind::Variant(def) => {
        let owner = def.owner_enum;
        let type_params = self.decls.type_params_of(&owner).to_vec();
        let subst = self.instantiate(span, &type_params, &[]);
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

  fn bind_tuple(
    &mut self,
    span: Span,
    pats: &[PatId],
    ty: TyId,
    shared: Option<ScopeId>,
  ) {
    let (peeled, wrap) = self.peel_reference(ty);
    match self.types.get(&peeled).clone() {
      Ty::Tuple(elements) => {
        if elements.len() != pats.len() {
          self.ctx.errors.push(TypeError::InvalidUnpacking {
            span,
            assigned: ty,
            shape: UnpackShape::TupleOfLength(elements.len()),
          });
          self.bind_all_unknown(pats, shared);
          return;
        }
        for (pat, element) in pats.iter().zip(elements) {
          let element = self.wrap_piece(element, wrap);
          self.bind_pattern_in(pat, element, shared);
        }
      },
      Ty::Unknown | Ty::Var(_) | Ty::Never => self.bind_all_unknown(pats, shared),
      _ => {
        self.ctx.errors.push(TypeError::InvalidUnpacking {
          span,
          assigned: ty,
          shape: UnpackShape::TuplePattern,
        });
        self.bind_all_unknown(pats, shared);
      },
    }
  }

  fn bind_struct(
    &mut self,
    pat_id: &PatId,
    span: Span,
    path: &PathId,
    fields: &[FieldPat],
    ty: TyId,
    shared: Option<ScopeId>,
  ) {
    let Some((decl, subst, wrap)) = self.pattern_target(pat_id, span, path, ty) else {
      for field in fields {
        if let Some(sub) = &field.pat {
          let unknown = self.types.unknown();
          self.bind_pattern_in(sub, unknown, shared);
        } else {
          let unknown = self.types.unknown();
          self.define_binding(field.name, field.span, false, unknown, shared);
        }
      }
      return;
    };

    for field in fields {
      let declared = self
        .decls
        .fields_of(&decl)
        .and_then(|defs| defs.iter().find(|f| f.name == field.name))
        .map(|f| f.ty);
      let field_ty = match declared {
        Some(declared) => {
          let folded = fold_ty_or_unknown(&mut self.types, declared, &subst);
          self.wrap_piece(folded, wrap)
        },
        None => self.types.unknown(),
      };
      match &field.pat {
        Some(sub) => self.bind_pattern_in(sub, field_ty, shared),
        None => {
          // Shorthand binds the field under its own name.
          self.define_binding(field.name, field.span, false, field_ty, shared);
        },
      }
    }
  }

  fn bind_tuple_struct(
    &mut self,
    pat_id: &PatId,
    span: Span,
    path: &PathId,
    pats: &[PatId],
    ty: TyId,
    shared: Option<ScopeId>,
  ) {
    let Some((decl, subst, wrap)) = self.pattern_target(pat_id, span, path, ty) else {
      self.bind_all_unknown(pats, shared);
      return;
    };
    let declared: Vec<TyId> = self
      .decls
      .fields_of(&decl)
      .map(|defs| defs.iter().map(|f| f.ty).collect())
      .unwrap_or_default();
    for (index, pat) in pats.iter().enumerate() {
      let piece = match declared.get(index).copied() {
        Some(field_ty) => {
          let folded = fold_ty_or_unknown(&mut self.types, field_ty, &subst);
          self.wrap_piece(folded, wrap)
        },
        None => self.types.unknown(),
      };
      self.bind_pattern_in(pat, piece, shared);
    }
  }

  /// Resolve a destructuring pattern's path and work out the substitution
  /// its field types read through: the scrutinee's own instantiation when
  /// the declarations line up, a fresh one otherwise (combined into the
  /// scrutinee so an open scrutinee type settles).
  fn pattern_target(
    &mut self,
    pat_id: &PatId,
    span: Span,
    path: &PathId,
    ty: TyId,
  ) -> Option<(DeclId, Substitution, RefWrap)> {
    let unit = self.unit;
    let resolved = self.resolve_path_ns(path, Ns::Type);
    let decl = resolved.single_visible().filter(|decl| {
      matches!(&self.decls.get(decl).kind, DeclKind::Struct(_) | DeclKind::Variant(_) | DeclKind::Schema(_))
    })?;
    self.ctx.pat_targets.insert(*pat_id, decl);

    let owner = self.decls.field_owner(&decl);
    let (peeled, wrap) = self.peel_reference(ty);
    let subst = match self.types.get(&peeled).clone() {
      Ty::Adt {
        decl: scrutinee_decl,
        subst,
        ..
      } if scrutinee_decl == owner => subst,
      scrutinee => {
        let type_params = self.decls.type_params_of(&owner).to_vec();
        let subst = self.instantiate(span, &type_params, &unit.path(path).type_args);
        let unknown = self.types.unknown();
        let args: Vec<TyId> = type_params
          .iter()
          .map(|param| subst.get(*param).unwrap_or(unknown))
          .collect();
        let pattern_ty = self.types.adt(owner, subst.clone(), args);
        match scrutinee {
          Ty::Unknown | Ty::Var(_) | Ty::Never | Ty::Adt { .. } => {
            let _ = self.try_combine(peeled, pattern_ty);
          },
          _ => {
            self.ctx.errors.push(TypeError::InvalidUnpacking {
              span,
              assigned: ty,
              shape: UnpackShape::StructPattern,
            });
          },
        }
        subst
      },
    };
    Some((decl, subst, wrap))
  }

  /// A qualified path pattern: a constant or a fieldless variant. Never
  /// introduces a binding.
  fn bind_path_pattern(
    &mut self,
    pat_id: &PatId,
    span: Span,
    path: &PathId,
    ty: TyId,
  ) {
    let resolved = self.resolve_path_ns(path, Ns::Name);
    let Some(decl) = resolved.single_visible().filter(|decl| {
      matches!(&self.decls.get(decl).kind, DeclKind::Const(_) | DeclKind::Variant(_))
    }) else {
      return;
    };
    self.ctx.pat_targets.insert(*pat_id, decl);
    let expected = self.constant_pattern_ty(decl, span);
    let _ = self.try_combine(ty, expected);
  }

  fn bind_all_unknown(
    &mut self,
    pats: &[PatId],
    shared: Option<ScopeId>,
  ) {
    for pat in pats {
      let unknown = self.types.unknown();
      self.bind_pattern_in(pat, unknown, shared);
    }
  }

  fn peel_reference(
    &mut self,
    ty: TyId,
  ) -> (TyId, RefWrap) {
    let resolved = self.ctx.vars.shallow_resolve(&mut self.types, ty);
    match self.types.get(&resolved) {
      Ty::Reference {
        inner,
        mutability,
        spec_mode,
      } => {
        let inner = *inner;
        let wrap = Some((*mutability, *spec_mode));
        let peeled = self.ctx.vars.shallow_resolve(&mut self.types, inner);
        (peeled, wrap)
      },
      _ => (resolved, None),
    }
  }

  /// A piece extracted from behind a reference is read as a reference
  /// itself; pieces that already are references stay single.
  fn wrap_piece(
    &mut self,
    ty: TyId,
    wrap: RefWrap,
  ) -> TyId {
    match wrap {
      Some((mutability, spec)) if !self.types.is_reference(&ty) => self.types.reference(ty, mutability, spec),
      _ => ty,
    }
  }

  fn define_binding(
    &mut self,
    name: SymbolId,
    span: Span,
    mutable: bool,
    ty: TyId,
    shared: Option<ScopeId>,
  ) -> DeclId {
    let decl = self.decls.alloc(Decl {
      kind: DeclKind::Local(LocalDef { ty: None, mutable }),
      name,
      span,
      visibility: Visibility::Private,
      owner: None,
    });
    self.ctx.binding_tys.insert(decl, ty);
    match shared {
      Some(scope) => self.scopes.shadow_in(&scope, name, decl),
      None => self.scopes.shadow(name, decl),
    }
    decl
  }
}
