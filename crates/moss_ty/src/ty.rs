use std::collections::HashMap;

use crate::decl::DeclId;
use crate::infer::{IntVarId, TyVarId};
use crate::subst::Substitution;
use crate::{Id, Store};

pub type TyId = Id<Ty>;

/// Width of a Move integer type.
///
/// `Default` is the provisional kind carried by an unsuffixed literal until
/// context establishes a concrete width; it renders as `integer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntegerKind {
  Default,
  U8,
  U16,
  U32,
  U64,
  U128,
  U256,
}

impl IntegerKind {
  pub fn is_default(&self) -> bool {
    matches!(self, IntegerKind::Default)
  }

  pub fn name(&self) -> &'static str {
    match self {
      IntegerKind::Default => "integer",
      IntegerKind::U8 => "u8",
      IntegerKind::U16 => "u16",
      IntegerKind::U32 => "u32",
      IntegerKind::U64 => "u64",
      IntegerKind::U128 => "u128",
      IntegerKind::U256 => "u256",
    }
  }
}

impl std::fmt::Display for IntegerKind {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    write!(f, "{}", self.name())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mutability {
  Immutable,
  Mutable,
}

impl Mutability {
  pub fn is_mut(&self) -> bool {
    matches!(self, Mutability::Mutable)
  }
}

/// One Move type. Structurally compared; interned in a `TypeStore`, so equal
/// shapes share a `TyId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
  Bool,
  Address,
  Signer,
  Integer(IntegerKind),
  /// Unbounded numeric, legal only inside specification expressions.
  Num,

  Vector(TyId),
  Tuple(Vec<TyId>),
  Reference {
    inner: TyId,
    mutability: Mutability,
    /// References created inside specification blocks unify with their
    /// executable counterparts but render differently.
    spec_mode: bool,
  },
  Range(TyId),
  Lambda {
    params: Vec<TyId>,
    ret: TyId,
  },
  /// Struct or enum instantiation. `type_args` is in declaration order and
  /// always as long as the declaration's parameter list; `subst` maps each
  /// parameter declaration to the matching argument.
  Adt {
    decl: DeclId,
    subst: Substitution,
    type_args: Vec<TyId>,
  },
  /// Occurrence of a generic type parameter.
  TypeParam(DeclId),

  /// Bottom. Produced by `return`/`break`/`continue`/`abort` and by loops;
  /// combining it with any type yields the other type.
  Never,
  /// Top. Produced wherever analysis cannot know better; combining it with
  /// any type succeeds without tightening anything.
  Unknown,

  Var(TyVarId),
  IntVar(IntVarId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ReferenceKey {
  inner: TyId,
  mutability: Mutability,
  spec_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LambdaKey {
  params: Vec<TyId>,
  ret: TyId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AdtKey {
  decl: DeclId,
  type_args: Vec<TyId>,
}

#[derive(Debug, Clone)]
pub struct TypeStore {
  types: Store<Ty>,
  primitives: HashMap<Ty, TyId>,
  unit: TyId,
  vectors: HashMap<TyId, TyId>,
  tuples: HashMap<Vec<TyId>, TyId>,
  references: HashMap<ReferenceKey, TyId>,
  ranges: HashMap<TyId, TyId>,
  lambdas: HashMap<LambdaKey, TyId>,
  adts: HashMap<AdtKey, TyId>,
  type_params: HashMap<DeclId, TyId>,
  ty_vars: HashMap<TyVarId, TyId>,
  int_vars: HashMap<IntVarId, TyId>,
}

impl Default for TypeStore {
  fn default() -> Self {
    Self::new()
  }
}

impl TypeStore {
  pub fn new() -> Self {
    let mut store = Self {
      types: Store::new(),
      primitives: HashMap::new(),
      unit: TyId::new(0),
      vectors: HashMap::new(),
      tuples: HashMap::new(),
      references: HashMap::new(),
      ranges: HashMap::new(),
      lambdas: HashMap::new(),
      adts: HashMap::new(),
      type_params: HashMap::new(),
      ty_vars: HashMap::new(),
      int_vars: HashMap::new(),
    };
    store.init_primitives();
    store.unit = store.tuple(Vec::new());
    store
  }

  fn init_primitives(&mut self) {
    let primitives = [
      Ty::Bool,
      Ty::Address,
      Ty::Signer,
      Ty::Integer(IntegerKind::Default),
      Ty::Integer(IntegerKind::U8),
      Ty::Integer(IntegerKind::U16),
      Ty::Integer(IntegerKind::U32),
      Ty::Integer(IntegerKind::U64),
      Ty::Integer(IntegerKind::U128),
      Ty::Integer(IntegerKind::U256),
      Ty::Num,
      Ty::Never,
      Ty::Unknown,
    ];

    for ty in primitives {
      let id = self.types.alloc(ty.clone());
      self.primitives.insert(ty, id);
    }
  }

  pub fn vector(
    &mut self,
    element: TyId,
  ) -> TyId {
    if let Some(&id) = self.vectors.get(&element) {
      return id;
    }
    let id = self.types.alloc(Ty::Vector(element));
    self.vectors.insert(element, id);
    id
  }

  pub fn tuple(
    &mut self,
    elements: Vec<TyId>,
  ) -> TyId {
    if let Some(&id) = self.tuples.get(&elements) {
      return id;
    }
    let id = self.types.alloc(Ty::Tuple(elements.clone()));
    self.tuples.insert(elements, id);
    id
  }

  pub fn reference(
    &mut self,
    inner: TyId,
    mutability: Mutability,
    spec_mode: bool,
  ) -> TyId {
    let key = ReferenceKey {
      inner,
      mutability,
      spec_mode,
    };
    if let Some(&id) = self.references.get(&key) {
      return id;
    }
    let id = self.types.alloc(Ty::Reference {
      inner,
      mutability,
      spec_mode,
    });
    self.references.insert(key, id);
    id
  }

  pub fn range(
    &mut self,
    element: TyId,
  ) -> TyId {
    if let Some(&id) = self.ranges.get(&element) {
      return id;
    }
    let id = self.types.alloc(Ty::Range(element));
    self.ranges.insert(element, id);
    id
  }

  pub fn lambda(
    &mut self,
    params: Vec<TyId>,
    ret: TyId,
  ) -> TyId {
    let key = LambdaKey {
      params: params.clone(),
      ret,
    };
    if let Some(&id) = self.lambdas.get(&key) {
      return id;
    }
    let id = self.types.alloc(Ty::Lambda { params, ret });
    self.lambdas.insert(key, id);
    id
  }

  /// Intern an ADT instantiation. Callers must pass `subst` built from the
  /// declaration's parameters zipped with `type_args`; the cache is keyed on
  /// `(decl, type_args)` alone under that invariant.
  pub fn adt(
    &mut self,
    decl: DeclId,
    subst: Substitution,
    type_args: Vec<TyId>,
  ) -> TyId {
    let key = AdtKey {
      decl,
      type_args: type_args.clone(),
    };
    if let Some(&id) = self.adts.get(&key) {
      return id;
    }
    let id = self.types.alloc(Ty::Adt {
      decl,
      subst,
      type_args,
    });
    self.adts.insert(key, id);
    id
  }

  pub fn type_param(
    &mut self,
    decl: DeclId,
  ) -> TyId {
    if let Some(&id) = self.type_params.get(&decl) {
      return id;
    }
    let id = self.types.alloc(Ty::TypeParam(decl));
    self.type_params.insert(decl, id);
    id
  }

  pub fn ty_var(
    &mut self,
    var: TyVarId,
  ) -> TyId {
    if let Some(&id) = self.ty_vars.get(&var) {
      return id;
    }
    let id = self.types.alloc(Ty::Var(var));
    self.ty_vars.insert(var, id);
    id
  }

  pub fn int_var(
    &mut self,
    var: IntVarId,
  ) -> TyId {
    if let Some(&id) = self.int_vars.get(&var) {
      return id;
    }
    let id = self.types.alloc(Ty::IntVar(var));
    self.int_vars.insert(var, id);
    id
  }

  #[inline]
  pub fn get(
    &self,
    id: &TyId,
  ) -> &Ty {
    self.types.get(id)
  }

  #[inline]
  pub fn boolean(&self) -> TyId {
    self.primitives[&Ty::Bool]
  }
  #[inline]
  pub fn address(&self) -> TyId {
    self.primitives[&Ty::Address]
  }
  #[inline]
  pub fn signer(&self) -> TyId {
    self.primitives[&Ty::Signer]
  }

  #[inline]
  pub fn integer(
    &self,
    kind: IntegerKind,
  ) -> TyId {
    self.primitives[&Ty::Integer(kind)]
  }

  #[inline]
  pub fn default_int(&self) -> TyId {
    self.primitives[&Ty::Integer(IntegerKind::Default)]
  }
  #[inline]
  pub fn u8(&self) -> TyId {
    self.primitives[&Ty::Integer(IntegerKind::U8)]
  }
  #[inline]
  pub fn u16(&self) -> TyId {
    self.primitives[&Ty::Integer(IntegerKind::U16)]
  }
  #[inline]
  pub fn u32(&self) -> TyId {
    self.primitives[&Ty::Integer(IntegerKind::U32)]
  }
  #[inline]
  pub fn u64(&self) -> TyId {
    self.primitives[&Ty::Integer(IntegerKind::U64)]
  }
  #[inline]
  pub fn u128(&self) -> TyId {
    self.primitives[&Ty::Integer(IntegerKind::U128)]
  }
  #[inline]
  pub fn u256(&self) -> TyId {
    self.primitives[&Ty::Integer(IntegerKind::U256)]
  }

  #[inline]
  pub fn num(&self) -> TyId {
    self.primitives[&Ty::Num]
  }
  #[inline]
  pub fn never(&self) -> TyId {
    self.primitives[&Ty::Never]
  }
  #[inline]
  pub fn unknown(&self) -> TyId {
    self.primitives[&Ty::Unknown]
  }
  #[inline]
  pub fn unit(&self) -> TyId {
    self.unit
  }

  #[inline]
  pub fn is_never(
    &self,
    ty: &TyId,
  ) -> bool {
    matches!(self.get(ty), Ty::Never)
  }

  #[inline]
  pub fn is_unknown(
    &self,
    ty: &TyId,
  ) -> bool {
    matches!(self.get(ty), Ty::Unknown)
  }

  #[inline]
  pub fn is_unit(
    &self,
    ty: &TyId,
  ) -> bool {
    *ty == self.unit
  }

  pub fn is_reference(
    &self,
    ty: &TyId,
  ) -> bool {
    matches!(self.get(ty), Ty::Reference { .. })
  }

  /// Types an arithmetic or bitwise operand may have. Absorbing types pass
  /// so that one upstream error does not also flag every operator around it.
  pub fn supports_arithmetic(
    &self,
    ty: &TyId,
  ) -> bool {
    matches!(
      self.get(ty),
      Ty::Integer(_) | Ty::Num | Ty::IntVar(_) | Ty::Unknown | Ty::Never
    )
  }

  /// Strip any number of reference layers, returning the innermost type.
  pub fn strip_references(
    &self,
    ty: TyId,
  ) -> TyId {
    let mut current = ty;
    while let Ty::Reference { inner, .. } = self.get(&current) {
      current = *inner;
    }
    current
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn primitives_are_interned_once() {
    let types = TypeStore::new();
    assert_eq!(types.u8(), types.u8());
    assert_ne!(types.u8(), types.u64());
    assert_ne!(types.u16(), types.u32());
    assert_ne!(types.u128(), types.u256());
    assert_ne!(types.default_int(), types.u64());
  }

  #[test]
  fn structural_shapes_share_ids() {
    let mut types = TypeStore::new();
    let a = types.vector(types.u8());
    let b = types.vector(types.u8());
    assert_eq!(a, b);

    let t1 = types.tuple(vec![types.boolean(), types.u64()]);
    let t2 = types.tuple(vec![types.boolean(), types.u64()]);
    assert_eq!(t1, t2);

    let r1 = types.reference(types.u8(), Mutability::Mutable, false);
    let r2 = types.reference(types.u8(), Mutability::Mutable, false);
    let r3 = types.reference(types.u8(), Mutability::Immutable, false);
    assert_eq!(r1, r2);
    assert_ne!(r1, r3);
  }

  #[test]
  fn unit_is_the_empty_tuple() {
    let mut types = TypeStore::new();
    let empty = types.tuple(Vec::new());
    assert_eq!(empty, types.unit());
    assert!(types.is_unit(&empty));
  }

  #[test]
  fn strip_references_unwraps_all_layers() {
    let mut types = TypeStore::new();
    let inner = types.u64();
    let r = types.reference(inner, Mutability::Immutable, false);
    let rr = types.reference(r, Mutability::Mutable, false);
    assert_eq!(types.strip_references(rr), inner);
    assert_eq!(types.strip_references(inner), inner);
  }
}
