use crate::span::Span;
use crate::symbol::SymbolId;
use crate::ty::TyId;
use crate::{Id, Store};

pub type DeclId = Id<Decl>;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Visibility {
  Private,
  Public,
  /// `public(package)`: visible to modules published under the same address.
  Package,
  /// `public(friend)`: declared friends only. Friend lists are not tracked
  /// per unit, so this resolves like `Package`.
  Friend,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
  pub kind: DeclKind,
  pub name: SymbolId,
  pub span: Span,
  pub visibility: Visibility,
  /// Enclosing declaration: the module for items, the function for
  /// parameters and type parameters, the enum for variants. `None` for
  /// modules themselves and for pattern-introduced locals.
  pub owner: Option<DeclId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclKind {
  Module(ModuleDef),
  Function(FunctionDef),
  Struct(StructDef),
  Enum(EnumDef),
  Variant(VariantDef),
  Const(ConstDef),
  Schema(SchemaDef),
  TypeParam(TypeParamDef),
  Local(LocalDef),
  /// Reserved id whose content arrives in a later binding phase.
  Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleDef {
  pub address: SymbolId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionDef {
  pub type_params: Vec<DeclId>,
  pub params: Vec<DeclId>,
  pub ret: TyId,
  pub is_macro: bool,
  pub is_spec: bool,
  pub is_test: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructDef {
  pub type_params: Vec<DeclId>,
  pub fields: Vec<FieldDef>,
  /// Positional (tuple-style) structs unpack with `S(a, b)` patterns and
  /// carry index-named fields.
  pub positional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDef {
  pub name: SymbolId,
  pub ty: TyId,
  pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumDef {
  pub type_params: Vec<DeclId>,
  pub variants: Vec<DeclId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantDef {
  pub owner_enum: DeclId,
  pub fields: Vec<FieldDef>,
  pub positional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstDef {
  pub ty: TyId,
}

/// Specification schema. Members behave like typed bindings that `include`
/// splices into the surrounding spec block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaDef {
  pub type_params: Vec<DeclId>,
  pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParamDef {
  /// Index in the owner's type parameter list.
  pub index: u32,
  pub owner: DeclId,
}

/// Function parameter or pattern-introduced binding. `ty` is the declared
/// annotation when one exists; inferred binding types live in the result
/// tables, not here, so literal refinement can rewrite them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalDef {
  pub ty: Option<TyId>,
  pub mutable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeclStore {
  decls: Store<Decl>,
}

impl DeclStore {
  pub fn new() -> Self {
    Self { decls: Store::new() }
  }

  pub fn alloc(
    &mut self,
    decl: Decl,
  ) -> DeclId {
    self.decls.alloc(decl)
  }

  pub fn get(
    &self,
    id: &DeclId,
  ) -> &Decl {
    self.decls.get(id)
  }

  pub fn get_mut(
    &mut self,
    id: DeclId,
  ) -> &mut Decl {
    self.decls.get_mut(id)
  }

  pub fn iter(&self) -> impl Iterator<Item = (DeclId, &Decl)> {
    self.decls.iter()
  }

  pub fn name_of(
    &self,
    id: &DeclId,
  ) -> SymbolId {
    self.get(id).name
  }

  pub fn as_module(
    &self,
    id: &DeclId,
  ) -> Option<&ModuleDef> {
    match &self.get(id).kind {
      DeclKind::Module(def) => Some(def),
      _ => None,
    }
  }

  pub fn as_function(
    &self,
    id: &DeclId,
  ) -> Option<&FunctionDef> {
    match &self.get(id).kind {
      DeclKind::Function(def) => Some(def),
      _ => None,
    }
  }

  pub fn as_local(
    &self,
    id: &DeclId,
  ) -> Option<&LocalDef> {
    match &self.get(id).kind {
      DeclKind::Local(def) => Some(def),
      _ => None,
    }
  }

  pub fn const_ty(
    &self,
    id: &DeclId,
  ) -> Option<TyId> {
    match &self.get(id).kind {
      DeclKind::Const(def) => Some(def.ty),
      _ => None,
    }
  }

  /// Type parameters declared by `id`, empty for kinds that have none.
  pub fn type_params_of(
    &self,
    id: &DeclId,
  ) -> &[DeclId] {
    match &self.get(id).kind {
      DeclKind::Function(def) => &def.type_params,
      DeclKind::Struct(def) => &def.type_params,
      DeclKind::Enum(def) => &def.type_params,
      DeclKind::Schema(def) => &def.type_params,
      _ => &[],
    }
  }

  /// Fields of a struct, variant or schema, `None` for other kinds.
  pub fn fields_of(
    &self,
    id: &DeclId,
  ) -> Option<&[FieldDef]> {
    match &self.get(id).kind {
      DeclKind::Struct(def) => Some(&def.fields),
      DeclKind::Variant(def) => Some(&def.fields),
      DeclKind::Schema(def) => Some(&def.fields),
      _ => None,
    }
  }

  /// For a variant or a struct, the declaration whose type parameters scope
  /// the fields: the enum for variants, the item itself otherwise.
  pub fn field_owner(
    &self,
    id: &DeclId,
  ) -> DeclId {
    match &self.get(id).kind {
      DeclKind::Variant(def) => def.owner_enum,
      _ => *id,
    }
  }

  /// Reserve an id for an item whose kind is lowered in a later phase.
  pub fn alloc_placeholder(
    &mut self,
    name: SymbolId,
    span: Span,
    visibility: Visibility,
    owner: Option<DeclId>,
  ) -> DeclId {
    self.decls.alloc(Decl {
      kind: DeclKind::Placeholder,
      name,
      span,
      visibility,
      owner,
    })
  }

  /// Fill a reserved id with its real content.
  /// Panics if the declaration is not a placeholder.
  pub fn update(
    &mut self,
    id: &DeclId,
    kind: DeclKind,
  ) {
    let decl = self.decls.get_mut(*id);
    assert!(
      matches!(decl.kind, DeclKind::Placeholder),
      "can only update placeholder declarations"
    );
    decl.kind = kind;
  }
}
