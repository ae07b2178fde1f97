use moss_ty::decl::Visibility;
use moss_ty::span::Span;
use moss_ty::symbol::SymbolId;

use crate::annot::AnnotId;
use crate::path::PathId;
use crate::NodeId;

/// One module of a compilation unit. The first module in a `Unit` is the
/// one under analysis; the rest are pre-imported dependency surfaces
/// (signatures and bodies the host chose to include).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleItem {
  /// Address text as written: `std`, `0x1`, `sui`.
  pub address: SymbolId,
  pub name: SymbolId,
  pub span: Span,
  pub functions: Vec<FunctionItem>,
  pub structs: Vec<StructItem>,
  pub enums: Vec<EnumItem>,
  pub consts: Vec<ConstItem>,
  pub schemas: Vec<SchemaItem>,
  pub spec_blocks: Vec<SpecBlockItem>,
  pub uses: Vec<UseDecl>,
}

impl ModuleItem {
  pub fn new(
    address: SymbolId,
    name: SymbolId,
    span: Span,
  ) -> Self {
    Self {
      address,
      name,
      span,
      functions: Vec::new(),
      structs: Vec::new(),
      enums: Vec::new(),
      consts: Vec::new(),
      schemas: Vec::new(),
      spec_blocks: Vec::new(),
      uses: Vec::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionItem {
  pub name: SymbolId,
  pub span: Span,
  pub visibility: Visibility,
  pub type_params: Vec<TypeParamItem>,
  pub params: Vec<ParamItem>,
  /// `None` means unit.
  pub ret: Option<AnnotId>,
  /// Signature-only imports have no body.
  pub body: Option<NodeId>,
  /// `macro fun`: callable through `name!(..)` when the feature gate allows.
  pub is_macro: bool,
  pub is_spec: bool,
  pub is_test: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamItem {
  pub name: SymbolId,
  pub span: Span,
  pub annot: AnnotId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParamItem {
  pub name: SymbolId,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructItem {
  pub name: SymbolId,
  pub span: Span,
  pub visibility: Visibility,
  pub type_params: Vec<TypeParamItem>,
  pub fields: Vec<FieldItem>,
  /// Tuple-style struct: fields are positional and index-named.
  pub positional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldItem {
  pub name: SymbolId,
  pub span: Span,
  pub annot: AnnotId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumItem {
  pub name: SymbolId,
  pub span: Span,
  pub visibility: Visibility,
  pub type_params: Vec<TypeParamItem>,
  pub variants: Vec<VariantItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantItem {
  pub name: SymbolId,
  pub span: Span,
  pub fields: Vec<FieldItem>,
  pub positional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstItem {
  pub name: SymbolId,
  pub span: Span,
  pub annot: AnnotId,
  pub value: Option<NodeId>,
}

/// Specification schema: named, typed members that `include` splices into
/// a spec block's scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaItem {
  pub name: SymbolId,
  pub span: Span,
  pub type_params: Vec<TypeParamItem>,
  pub fields: Vec<FieldItem>,
}

/// Module-level `spec` block. When `target` names a function, the block's
/// scope includes that function's parameters and a `result` binding of its
/// return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecBlockItem {
  pub target: Option<SymbolId>,
  pub span: Span,
  /// A `SpecBlock` node.
  pub body: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UseDecl {
  /// `use addr::module;` or `use addr::module as alias;`
  Module {
    address: SymbolId,
    module: SymbolId,
    alias: Option<SymbolId>,
  },
  /// `use addr::module::member;` or `... as alias;`
  Member {
    address: SymbolId,
    module: SymbolId,
    member: SymbolId,
    alias: Option<SymbolId>,
  },
  /// `use fun path as ReceiverType.method;` Public aliases are visible to
  /// callers outside the declaring module.
  Fun {
    function: PathId,
    receiver: PathId,
    method: SymbolId,
    is_public: bool,
  },
}
