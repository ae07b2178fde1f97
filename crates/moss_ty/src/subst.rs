use std::collections::BTreeMap;

use crate::decl::DeclId;
use crate::ty::{Ty, TyId, TypeStore};

/// Mapping from generic type-parameter declarations to concrete types.
///
/// Keyed on a `BTreeMap` so iteration (and therefore anything derived from
/// it, like rendered type arguments) is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Substitution {
  mapping: BTreeMap<DeclId, TyId>,
}

impl Substitution {
  pub fn new() -> Self {
    Self { mapping: BTreeMap::new() }
  }

  pub fn from_pairs<I>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (DeclId, TyId)>,
  {
    Self {
      mapping: pairs.into_iter().collect(),
    }
  }

  pub fn get(
    &self,
    param: DeclId,
  ) -> Option<TyId> {
    self.mapping.get(&param).copied()
  }

  pub fn insert(
    &mut self,
    param: DeclId,
    ty: TyId,
  ) {
    self.mapping.insert(param, ty);
  }

  pub fn is_empty(&self) -> bool {
    self.mapping.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (DeclId, TyId)> + '_ {
    self.mapping.iter().map(|(k, v)| (*k, *v))
  }
}

/// Replace type-parameter occurrences in `ty` according to `subst`.
/// Parameters without an entry are kept as-is.
pub fn fold_ty(
  types: &mut TypeStore,
  ty: TyId,
  subst: &Substitution,
) -> TyId {
  if subst.is_empty() {
    return ty;
  }
  fold_ty_impl(types, ty, subst, false)
}

/// Like [`fold_ty`], but parameters without an entry become `Unknown`.
/// Used when reading members of a partially-known instantiation.
pub fn fold_ty_or_unknown(
  types: &mut TypeStore,
  ty: TyId,
  subst: &Substitution,
) -> TyId {
  fold_ty_impl(types, ty, subst, true)
}

fn fold_ty_impl(
  types: &mut TypeStore,
  ty: TyId,
  subst: &Substitution,
  unknown_on_missing: bool,
) -> TyId {
  match types.get(&ty).clone() {
    Ty::TypeParam(param) => match subst.get(param) {
      Some(target) => target,
      None if unknown_on_missing => types.unknown(),
      None => ty,
    },
    Ty::Vector(element) => {
      let folded = fold_ty_impl(types, element, subst, unknown_on_missing);
      if folded == element {
        ty
      } else {
        types.vector(folded)
      }
    },
    Ty::Tuple(elements) => {
      let folded: Vec<TyId> = elements
        .iter()
        .map(|e| fold_ty_impl(types, *e, subst, unknown_on_missing))
        .collect();
      if folded == elements {
        ty
      } else {
        types.tuple(folded)
      }
    },
    Ty::Reference {
      inner,
      mutability,
      spec_mode,
    } => {
      let folded = fold_ty_impl(types, inner, subst, unknown_on_missing);
      if folded == inner {
        ty
      } else {
        types.reference(folded, mutability, spec_mode)
      }
    },
    Ty::Range(element) => {
      let folded = fold_ty_impl(types, element, subst, unknown_on_missing);
      if folded == element {
        ty
      } else {
        types.range(folded)
      }
    },
    Ty::Lambda { params, ret } => {
      let folded_params: Vec<TyId> = params
        .iter()
        .map(|p| fold_ty_impl(types, *p, subst, unknown_on_missing))
        .collect();
      let folded_ret = fold_ty_impl(types, ret, subst, unknown_on_missing);
      if folded_params == params && folded_ret == ret {
        ty
      } else {
        types.lambda(folded_params, folded_ret)
      }
    },
    Ty::Adt {
      decl,
      subst: inner,
      type_args,
    } => {
      let folded_args: Vec<TyId> = type_args
        .iter()
        .map(|a| fold_ty_impl(types, *a, subst, unknown_on_missing))
        .collect();
      if folded_args == type_args {
        ty
      } else {
        let folded_subst = Substitution::from_pairs(
          inner
            .iter()
            .map(|(param, value)| (param, fold_ty_impl(types, value, subst, unknown_on_missing))),
        );
        types.adt(decl, folded_subst, folded_args)
      }
    },
    // Primitives, vars and the absorbing types contain no parameters.
    _ => ty,
  }
}
