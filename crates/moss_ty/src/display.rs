use crate::decl::{DeclKind, DeclStore};
use crate::symbol::SymbolTable;
use crate::ty::{Ty, TyId, TypeStore};

/// Render a type the way diagnostics and hover text show it. Unrefined
/// integers print as `integer`; inference variables only appear in debug
/// dumps, never in finalized result tables.
pub fn render_ty(
  types: &TypeStore,
  decls: &DeclStore,
  symbols: &SymbolTable,
  ty: &TyId,
) -> String {
  match types.get(ty) {
    Ty::Bool => "bool".to_string(),
    Ty::Address => "address".to_string(),
    Ty::Signer => "signer".to_string(),
    Ty::Integer(kind) => kind.name().to_string(),
    Ty::Num => "num".to_string(),
    Ty::Never => "<never>".to_string(),
    Ty::Unknown => "<unknown>".to_string(),
    Ty::Vector(element) => {
      format!("vector<{}>", render_ty(types, decls, symbols, element))
    },
    Ty::Range(element) => {
      format!("range<{}>", render_ty(types, decls, symbols, element))
    },
    Ty::Tuple(elements) => {
      let elem_strs: Vec<_> = elements.iter().map(|e| render_ty(types, decls, symbols, e)).collect();
      format!("({})", elem_strs.join(", "))
    },
    Ty::Reference { inner, mutability, .. } => {
      if mutability.is_mut() {
        format!("&mut {}", render_ty(types, decls, symbols, inner))
      } else {
        format!("&{}", render_ty(types, decls, symbols, inner))
      }
    },
    Ty::Lambda { params, ret } => {
      let param_strs: Vec<_> = params.iter().map(|p| render_ty(types, decls, symbols, p)).collect();
      if types.is_unit(ret) {
        format!("|{}|", param_strs.join(", "))
      } else {
        format!("|{}| -> {}", param_strs.join(", "), render_ty(types, decls, symbols, ret))
      }
    },
    Ty::Adt { decl, type_args, .. } => {
      let item = decls.get(decl);
      let mut out = String::new();
      if let Some(owner) = &item.owner {
        let module = decls.get(owner);
        if let DeclKind::Module(def) = &module.kind {
          out.push_str(symbols.get(&def.address));
          out.push_str("::");
          out.push_str(symbols.get(&module.name));
          out.push_str("::");
        }
      }
      out.push_str(symbols.get(&item.name));
      if !type_args.is_empty() {
        let arg_strs: Vec<_> = type_args.iter().map(|a| render_ty(types, decls, symbols, a)).collect();
        out.push('<');
        out.push_str(&arg_strs.join(", "));
        out.push('>');
      }
      out
    },
    Ty::TypeParam(decl) => symbols.get(&decls.get(decl).name).to_string(),
    Ty::Var(id) => format!("?{}", id.0),
    Ty::IntVar(id) => format!("?int{}", id.0),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::decl::{Decl, ModuleDef, StructDef, TypeParamDef, Visibility};
  use crate::span::Span;
  use crate::subst::Substitution;
  use crate::ty::Mutability;
  use crate::BytePosition;

  fn dummy_span() -> Span {
    Span::new(BytePosition(0), BytePosition(0))
  }

  #[test]
  fn primitives_and_shapes() {
    let mut types = TypeStore::new();
    let decls = DeclStore::new();
    let symbols = SymbolTable::new();

    let u8_ty = types.u8();
    assert_eq!(render_ty(&types, &decls, &symbols, &u8_ty), "u8");
    let default = types.default_int();
    assert_eq!(render_ty(&types, &decls, &symbols, &default), "integer");

    let unit = types.unit();
    assert_eq!(render_ty(&types, &decls, &symbols, &unit), "()");

    let vec_u8 = types.vector(u8_ty);
    let imm_ref = types.reference(vec_u8, Mutability::Immutable, false);
    assert_eq!(render_ty(&types, &decls, &symbols, &imm_ref), "&vector<u8>");

    let bool_ty = types.boolean();
    let pair = types.tuple(vec![u8_ty, bool_ty]);
    let mut_ref = types.reference(pair, Mutability::Mutable, false);
    assert_eq!(render_ty(&types, &decls, &symbols, &mut_ref), "&mut (u8, bool)");
  }

  #[test]
  fn lambda_omits_unit_return() {
    let mut types = TypeStore::new();
    let decls = DeclStore::new();
    let symbols = SymbolTable::new();

    let u64_ty = types.u64();
    let unit = types.unit();
    let consumer = types.lambda(vec![u64_ty], unit);
    assert_eq!(render_ty(&types, &decls, &symbols, &consumer), "|u64|");

    let bool_ty = types.boolean();
    let predicate = types.lambda(vec![u64_ty], bool_ty);
    assert_eq!(render_ty(&types, &decls, &symbols, &predicate), "|u64| -> bool");
  }

  #[test]
  fn adt_renders_fully_qualified() {
    let mut types = TypeStore::new();
    let mut decls = DeclStore::new();
    let mut symbols = SymbolTable::new();

    let std_sym = symbols.intern("std");
    let option_mod = symbols.intern("option");
    let option_name = symbols.intern("Option");
    let element_name = symbols.intern("Element");

    let module = decls.alloc(Decl {
      kind: DeclKind::Module(ModuleDef { address: std_sym }),
      name: option_mod,
      span: dummy_span(),
      visibility: Visibility::Public,
      owner: None,
    });
    let strukt = decls.alloc_placeholder(option_name, dummy_span(), Visibility::Public, Some(module));
    let element = decls.alloc(Decl {
      kind: DeclKind::TypeParam(TypeParamDef { index: 0, owner: strukt }),
      name: element_name,
      span: dummy_span(),
      visibility: Visibility::Private,
      owner: Some(strukt),
    });
    decls.update(
      &strukt,
      DeclKind::Struct(StructDef {
        type_params: vec![element],
        fields: Vec::new(),
        positional: false,
      }),
    );

    let u64_ty = types.u64();
    let subst = Substitution::from_pairs([(element, u64_ty)]);
    let option_u64 = types.adt(strukt, subst, vec![u64_ty]);
    assert_eq!(
      render_ty(&types, &decls, &symbols, &option_u64),
      "std::option::Option<u64>"
    );

    let param_ty = types.type_param(element);
    assert_eq!(render_ty(&types, &decls, &symbols, &param_ty), "Element");
  }
}
