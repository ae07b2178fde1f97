use moss_config::DebugTrace;
use moss_diagnostics::TypeError;
use moss_log::{phase_log, trace_dbg};
use moss_syntax::annot::{AnnotId, AnnotKind};
use moss_syntax::item::{FieldItem, TypeParamItem, UseDecl};
use moss_syntax::path::PathId;
use moss_ty::decl::{
  ConstDef, Decl, DeclId, DeclKind, EnumDef, FieldDef, FunctionDef, LocalDef, ModuleDef, SchemaDef, StructDef,
  TypeParamDef, VariantDef, Visibility,
};
use moss_ty::span::Span;
use moss_ty::symbol::SymbolId;
use moss_ty::ty::{IntegerKind, Mutability, Ty, TyId};

use crate::resolve::Ns;
use crate::scope::{ScopeId, ScopeKind};
use crate::{Analyzer, ItemDecls};

/// Primitive type names. These shadow nothing and nothing shadows them;
/// lowering recognizes them before consulting the scope chain.
enum BuiltinType {
  Bool,
  Address,
  Signer,
  Integer(IntegerKind),
  Num,
  Vector,
}

fn builtin_type(name: &str) -> Option<BuiltinType> {
  match name {
    "bool" => Some(BuiltinType::Bool),
    "address" => Some(BuiltinType::Address),
    "signer" => Some(BuiltinType::Signer),
    "u8" => Some(BuiltinType::Integer(IntegerKind::U8)),
    "u16" => Some(BuiltinType::Integer(IntegerKind::U16)),
    "u32" => Some(BuiltinType::Integer(IntegerKind::U32)),
    "u64" => Some(BuiltinType::Integer(IntegerKind::U64)),
    "u128" => Some(BuiltinType::Integer(IntegerKind::U128)),
    "u256" => Some(BuiltinType::Integer(IntegerKind::U256)),
    "num" => Some(BuiltinType::Num),
    "vector" => Some(BuiltinType::Vector),
    _ => None,
  }
}

impl<'a> Analyzer<'a> {
  /// Declare every module's items, wire up scopes and `use` aliases, then
  /// lower signatures. Two passes over each item: shapes first so generic
  /// instantiation works in any order, member types second.
  pub(crate) fn bind_phase(&mut self) {
    phase_log!(self.config, indent = 1, "bind: declaring items");
    let unit = self.unit;
    for (index, _) in unit.modules.iter().enumerate() {
      self.declare_module(index);
    }
    for index in 0..unit.modules.len() {
      self.bind_uses(index);
    }
    for index in 0..unit.modules.len() {
      self.shape_module(index);
    }
    for index in 0..unit.modules.len() {
      if self.cancel.is_cancelled() {
        self.ctx.cancelled = true;
        return;
      }
      self.lower_module(index);
    }
    self.check_struct_cycles();
  }

  /// Allocate the module declaration, its scopes, and a placeholder per
  /// item. Placeholders let signatures reference items in any order and
  /// across modules.
  fn declare_module(
    &mut self,
    index: usize,
  ) {
    let module = &self.unit.modules[index];
    let decl = self.decls.alloc(Decl {
      kind: DeclKind::Module(ModuleDef { address: module.address }),
      name: module.name,
      span: module.span,
      visibility: Visibility::Public,
      owner: None,
    });
    self.module_decls.push(decl);
    self.module_by_name.entry((module.address, module.name)).or_insert(decl);

    let root = self.scopes.root();
    self.scopes.set_current(&root);
    let module_scope = self.scopes.push(ScopeKind::Module);
    let spec_scope = self.scopes.push(ScopeKind::Spec);
    self.scopes.pop();
    self.scopes.pop();
    self.module_scopes.push(module_scope);
    self.module_spec_scopes.push(spec_scope);

    let mut items = ItemDecls::default();
    for item in &module.functions {
      let id = self.declare_item(decl, module_scope, index, item.name, item.span, item.visibility);
      items.functions.push(id);
    }
    for item in &module.structs {
      let id = self.declare_item(decl, module_scope, index, item.name, item.span, item.visibility);
      items.structs.push(id);
    }
    for item in &module.enums {
      let id = self.declare_item(decl, module_scope, index, item.name, item.span, item.visibility);
      items.enums.push(id);
      let mut variants = Vec::with_capacity(item.variants.len());
      for variant in &item.variants {
        let variant_id = self
          .decls
          .alloc_placeholder(variant.name, variant.span, Visibility::Public, Some(id));
        variants.push(variant_id);
      }
      items.variants.push(variants);
    }
    for item in &module.consts {
      let id = self.declare_item(decl, module_scope, index, item.name, item.span, Visibility::Private);
      items.consts.push(id);
    }
    for item in &module.schemas {
      let id = self.declare_item(decl, module_scope, index, item.name, item.span, Visibility::Public);
      items.schemas.push(id);
    }

    let mut by_name = std::collections::HashMap::new();
    for id in items
      .functions
      .iter()
      .chain(&items.structs)
      .chain(&items.enums)
      .chain(&items.consts)
      .chain(&items.schemas)
    {
      let name = self.decls.name_of(id);
      by_name.entry(name).or_insert_with(Vec::new).push(*id);
    }
    self.module_items.insert(decl, by_name);
    self.item_decls.push(items);
  }

  fn declare_item(
    &mut self,
    module_decl: DeclId,
    module_scope: ScopeId,
    module_index: usize,
    name: SymbolId,
    span: Span,
    visibility: Visibility,
  ) -> DeclId {
    let id = self.decls.alloc_placeholder(name, span, visibility, Some(module_decl));
    self.scopes.define_in(&module_scope, name, id);
    self.defining_module.insert(id, module_index);
    id
  }

  /// Turn `use` declarations into module-scope aliases. Aliases map
  /// straight to the target declarations, so resolution follows them
  /// without an indirection step. Receiver-style `use fun` declarations
  /// are consulted at call sites instead.
  fn bind_uses(
    &mut self,
    index: usize,
  ) {
    let module_scope = self.module_scopes[index];
    for use_decl in &self.unit.modules[index].uses {
      match use_decl {
        UseDecl::Module { address, module, alias } => {
          let Some(target) = self.module_by_name.get(&(*address, *module)).copied() else {
            continue;
          };
          let name = alias.unwrap_or(*module);
          self.scopes.define_in(&module_scope, name, target);
        },
        UseDecl::Member {
          address,
          module,
          member,
          alias,
        } => {
          let Some(target) = self.module_by_name.get(&(*address, *module)).copied() else {
            continue;
          };
          let name = alias.unwrap_or(*member);
          let candidates = self
            .module_items
            .get(&target)
            .and_then(|items| items.get(member))
            .cloned()
            .unwrap_or_default();
          for candidate in candidates {
            self.scopes.define_in(&module_scope, name, candidate);
          }
        },
        UseDecl::Fun { .. } => {},
      }
    }
  }

  /// First item pass: type parameters and item kinds, with member types
  /// left empty. After this, `type_params_of` answers correctly for every
  /// item, which the second pass needs to instantiate generics.
  fn shape_module(
    &mut self,
    index: usize,
  ) {
    let unit = self.unit;
    let module = &unit.modules[index];
    let items = self.item_decls[index].clone();

    for (item, id) in module.structs.iter().zip(&items.structs) {
      let type_params = self.alloc_type_params(*id, &item.type_params);
      self.decls.update(
        id,
        DeclKind::Struct(StructDef {
          type_params,
          fields: Vec::new(),
          positional: item.positional,
        }),
      );
    }
    for ((item, id), variant_ids) in module.enums.iter().zip(&items.enums).zip(&items.variants) {
      let type_params = self.alloc_type_params(*id, &item.type_params);
      self.decls.update(
        id,
        DeclKind::Enum(EnumDef {
          type_params,
          variants: variant_ids.clone(),
        }),
      );
      for (variant, variant_id) in item.variants.iter().zip(variant_ids) {
        self.decls.update(
          variant_id,
          DeclKind::Variant(VariantDef {
            owner_enum: *id,
            fields: Vec::new(),
            positional: variant.positional,
          }),
        );
      }
    }
    for (item, id) in module.schemas.iter().zip(&items.schemas) {
      let type_params = self.alloc_type_params(*id, &item.type_params);
      self.decls.update(
        id,
        DeclKind::Schema(SchemaDef {
          type_params,
          fields: Vec::new(),
        }),
      );
    }
    for (item, id) in module.functions.iter().zip(&items.functions) {
      let type_params = self.alloc_type_params(*id, &item.type_params);
      let ret = self.types.unknown();
      self.decls.update(
        id,
        DeclKind::Function(FunctionDef {
          type_params,
          params: Vec::new(),
          ret,
          is_macro: item.is_macro,
          is_spec: item.is_spec,
          is_test: item.is_test,
        }),
      );
    }
    for id in &items.consts {
      let ty = self.types.unknown();
      self.decls.update(id, DeclKind::Const(ConstDef { ty }));
    }
  }

  /// Second item pass: lower field, parameter, return and constant
  /// annotations inside each item's type-parameter scope.
  fn lower_module(
    &mut self,
    index: usize,
  ) {
    let unit = self.unit;
    let module = &unit.modules[index];
    let items = self.item_decls[index].clone();
    let module_scope = self.module_scopes[index];

    for (item, id) in module.structs.iter().zip(&items.structs) {
      self.scopes.set_current(&module_scope);
      self.scopes.push(ScopeKind::Generic);
      self.enter_type_params(*id);
      let fields = self.lower_fields(&item.fields);
      self.scopes.pop();
      if let DeclKind::Struct(def) = &mut self.decls.get_mut(*id).kind {
        def.fields = fields;
      }
    }
    for ((item, id), variant_ids) in module.enums.iter().zip(&items.enums).zip(&items.variants) {
      self.scopes.set_current(&module_scope);
      self.scopes.push(ScopeKind::Generic);
      self.enter_type_params(*id);
      for (variant, variant_id) in item.variants.iter().zip(variant_ids) {
        let fields = self.lower_fields(&variant.fields);
        if let DeclKind::Variant(def) = &mut self.decls.get_mut(*variant_id).kind {
          def.fields = fields;
        }
      }
      self.scopes.pop();
    }
    for (item, id) in module.schemas.iter().zip(&items.schemas) {
      self.scopes.set_current(&module_scope);
      self.scopes.push(ScopeKind::Generic);
      self.enter_type_params(*id);
      let fields = self.lower_fields(&item.fields);
      self.scopes.pop();
      if let DeclKind::Schema(def) = &mut self.decls.get_mut(*id).kind {
        def.fields = fields;
      }
    }
    for (item, id) in module.functions.iter().zip(&items.functions) {
      self.scopes.set_current(&module_scope);
      self.scopes.push(ScopeKind::Generic);
      self.enter_type_params(*id);
      let mut params = Vec::with_capacity(item.params.len());
      for param in &item.params {
        let ty = self.lower_annot(&param.annot);
        let local = self.decls.alloc(Decl {
          kind: DeclKind::Local(LocalDef {
            ty: Some(ty),
            mutable: false,
          }),
          name: param.name,
          span: param.span,
          visibility: Visibility::Private,
          owner: Some(*id),
        });
        params.push(local);
      }
      let ret = match &item.ret {
        Some(annot) => self.lower_annot(annot),
        None => self.types.unit(),
      };
      self.scopes.pop();
      if let DeclKind::Function(def) = &mut self.decls.get_mut(*id).kind {
        def.params = params;
        def.ret = ret;
      }
    }
    for (item, id) in module.consts.iter().zip(&items.consts) {
      self.scopes.set_current(&module_scope);
      let ty = self.lower_annot(&item.annot);
      if let DeclKind::Const(def) = &mut self.decls.get_mut(*id).kind {
        def.ty = ty;
      }
    }
  }

  fn alloc_type_params(
    &mut self,
    owner: DeclId,
    items: &[TypeParamItem],
  ) -> Vec<DeclId> {
    let mut ids = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
      let id = self.decls.alloc(Decl {
        kind: DeclKind::TypeParam(TypeParamDef {
          index: index as u32,
          owner,
        }),
        name: item.name,
        span: item.span,
        visibility: Visibility::Private,
        owner: Some(owner),
      });
      ids.push(id);
    }
    ids
  }

  /// Define an item's type parameters in the current (generic) scope.
  pub(crate) fn enter_type_params(
    &mut self,
    item: DeclId,
  ) {
    for param in self.decls.type_params_of(&item).to_vec() {
      let name = self.decls.name_of(&param);
      self.scopes.define(name, param);
    }
  }

  fn lower_fields(
    &mut self,
    items: &[FieldItem],
  ) -> Vec<FieldDef> {
    let mut fields = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
      let ty = self.lower_annot(&item.annot);
      fields.push(FieldDef {
        name: item.name,
        ty,
        index: index as u32,
      });
    }
    fields
  }

  /// Lower a written annotation to a type. Primitive names are recognized
  /// structurally; everything else resolves through the scope chain in the
  /// type namespace.
  pub(crate) fn lower_annot(
    &mut self,
    annot_id: &AnnotId,
  ) -> TyId {
    let annot = self.unit.annot(annot_id);
    match &annot.kind {
      AnnotKind::Ref { inner, mutable } => {
        let inner_ty = self.lower_annot(inner);
        let mutability = if *mutable { Mutability::Mutable } else { Mutability::Immutable };
        let spec = self.ctx.spec_mode;
        self.types.reference(inner_ty, mutability, spec)
      },
      AnnotKind::Tuple(elements) => {
        let mut tys = Vec::with_capacity(elements.len());
        for element in elements {
          tys.push(self.lower_annot(element));
        }
        self.types.tuple(tys)
      },
      AnnotKind::Lambda { params, ret } => {
        let mut param_tys = Vec::with_capacity(params.len());
        for param in params {
          param_tys.push(self.lower_annot(param));
        }
        let ret_ty = match ret {
          Some(annot) => self.lower_annot(annot),
          None => self.types.unit(),
        };
        self.types.lambda(param_tys, ret_ty)
      },
      AnnotKind::Path(path) => self.lower_path_annot(path),
    }
  }

  fn lower_path_annot(
    &mut self,
    path_id: &PathId,
  ) -> TyId {
    let path = self.unit.path(path_id);
    if let [single] = path.segments.as_slice() {
      let builtin = {
        let symbols = self.symbols.borrow();
        builtin_type(symbols.get(single))
      };
      match builtin {
        Some(BuiltinType::Bool) => return self.types.boolean(),
        Some(BuiltinType::Address) => return self.types.address(),
        Some(BuiltinType::Signer) => return self.types.signer(),
        Some(BuiltinType::Integer(kind)) => return self.types.integer(kind),
        Some(BuiltinType::Num) => return self.types.num(),
        Some(BuiltinType::Vector) => {
          let element = match path.type_args.first() {
            Some(annot) => self.lower_annot(annot),
            None => self.ctx.vars.fresh_ty_var(&mut self.types, path.span),
          };
          return self.types.vector(element);
        },
        None => {},
      }
    }
    let resolved = self.resolve_path_ns(path_id, Ns::Type);
    let Some(decl) = resolved.single_visible() else {
      return self.types.unknown();
    };
    match &self.decls.get(&decl).kind {
      DeclKind::TypeParam(_) => self.types.type_param(decl),
      DeclKind::Struct(_) | DeclKind::Enum(_) | DeclKind::Schema(_) => {
        let type_params = self.decls.type_params_of(&decl).to_vec();
        let subst = self.instantiate(path.span, &type_params, &path.type_args);
        let unknown = self.types.unknown();
        let args: Vec<TyId> = type_params
          .iter()
          .map(|param| subst.get(*param).unwrap_or(unknown))
          .collect();
        self.types.adt(decl, subst, args)
      },
      _ => self.types.unknown(),
    }
  }

  /// Report structs and enums of the main module that embed themselves by
  /// value. Vectors, references and lambdas are indirections and break the
  /// cycle.
  fn check_struct_cycles(&mut self) {
    let Some(main) = self.item_decls.first() else {
      return;
    };
    let roots: Vec<DeclId> = main.structs.iter().chain(&main.enums).copied().collect();
    for root in roots {
      if self.embeds_itself(root) {
        let decl = self.decls.get(&root);
        trace_dbg!(self.config, DebugTrace::Resolve, "cycle through declaration {:?}", root);
        self.ctx.errors.push(TypeError::CircularType {
          span: decl.span,
          name: decl.name,
        });
      }
    }
  }

  fn embeds_itself(
    &self,
    root: DeclId,
  ) -> bool {
    let mut stack: Vec<DeclId> = self.value_field_edges(root);
    let mut seen: Vec<DeclId> = Vec::new();
    while let Some(next) = stack.pop() {
      if next == root {
        return true;
      }
      if seen.contains(&next) {
        continue;
      }
      seen.push(next);
      stack.extend(self.value_field_edges(next));
    }
    false
  }

  /// Declarations embedded by value in `decl`'s fields (or any variant's
  /// fields for enums).
  fn value_field_edges(
    &self,
    decl: DeclId,
  ) -> Vec<DeclId> {
    let mut edges = Vec::new();
    match &self.decls.get(&decl).kind {
      DeclKind::Struct(def) => {
        for field in &def.fields {
          self.collect_value_edges(field.ty, &mut edges);
        }
      },
      DeclKind::Enum(def) => {
        for variant in &def.variants {
          if let DeclKind::Variant(variant_def) = &self.decls.get(variant).kind {
            for field in &variant_def.fields {
              self.collect_value_edges(field.ty, &mut edges);
            }
          }
        }
      },
      _ => {},
    }
    edges
  }

  fn collect_value_edges(
    &self,
    ty: TyId,
    edges: &mut Vec<DeclId>,
  ) {
    match self.types.get(&ty) {
      Ty::Adt { decl, type_args, .. } => {
        edges.push(*decl);
        for arg in type_args {
          self.collect_value_edges(*arg, edges);
        }
      },
      Ty::Tuple(elements) => {
        for element in elements {
          self.collect_value_edges(*element, edges);
        }
      },
      Ty::Range(inner) => self.collect_value_edges(*inner, edges),
      _ => {},
    }
  }
}
