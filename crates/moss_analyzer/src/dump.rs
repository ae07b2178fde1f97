//! Debug dumps of the result tables, printed when the host asks for them.
//! These are developer-facing; hover and diagnostics render through
//! `moss_ty::display` instead.

use std::fmt::Write;

use ascii_table::AsciiTable;
use moss_syntax::{NodeKind, PatKind, Unit};
use moss_ty::decl::{DeclId, DeclKind, DeclStore};
use moss_ty::display::render_ty;
use moss_ty::symbol::SymbolTable;
use moss_ty::ty::TypeStore;

use crate::InferenceCtx;

/// One line per declaration, in allocation order.
pub fn dump_decls(
  decls: &DeclStore,
  types: &TypeStore,
  symbols: &SymbolTable,
) -> String {
  let mut out = String::new();
  writeln!(out, "declarations:").unwrap();
  for (id, decl) in decls.iter() {
    let name = symbols.get(&decl.name);
    let detail = match &decl.kind {
      DeclKind::Module(def) => format!("module {}::{}", symbols.get(&def.address), name),
      DeclKind::Function(def) => {
        let params: Vec<String> = def
          .params
          .iter()
          .map(|param| {
            let param_name = symbols.get(&decls.name_of(param));
            match decls.as_local(param).and_then(|local| local.ty) {
              Some(ty) => format!("{}: {}", param_name, render_ty(types, decls, symbols, &ty)),
              None => format!("{}: ?", param_name),
            }
          })
          .collect();
        let mut sig = format!("fun {}", name);
        if !def.type_params.is_empty() {
          let tps: Vec<&str> = def.type_params.iter().map(|tp| symbols.get(&decls.name_of(tp))).collect();
          write!(sig, "<{}>", tps.join(", ")).unwrap();
        }
        write!(sig, "({})", params.join(", ")).unwrap();
        if !types.is_unit(&def.ret) {
          write!(sig, ": {}", render_ty(types, decls, symbols, &def.ret)).unwrap();
        }
        sig
      },
      DeclKind::Struct(def) => format!("struct {} [{} fields]", name, def.fields.len()),
      DeclKind::Enum(def) => format!("enum {} [{} variants]", name, def.variants.len()),
      DeclKind::Variant(_) => format!("variant {}", name),
      DeclKind::Const(def) => {
        format!("const {}: {}", name, render_ty(types, decls, symbols, &def.ty))
      },
      DeclKind::Schema(def) => format!("schema {} [{} fields]", name, def.fields.len()),
      DeclKind::TypeParam(def) => format!("type param {} #{}", name, def.index),
      DeclKind::Local(def) => match def.ty {
        Some(ty) => format!("local {}: {}", name, render_ty(types, decls, symbols, &ty)),
        None => format!("local {}", name),
      },
      DeclKind::Placeholder => format!("placeholder {}", name),
    };
    writeln!(out, "  d{:<4} {}", id.index(), detail).unwrap();
  }
  out
}

/// Expression and pattern types as tables, ordered by source position.
pub fn dump_inference(
  unit: &Unit,
  ctx: &InferenceCtx,
  types: &TypeStore,
  decls: &DeclStore,
  symbols: &SymbolTable,
) -> String {
  let mut expr_rows: Vec<(u32, u32, Vec<String>)> = ctx
    .expr_tys
    .iter()
    .map(|(node_id, ty)| {
      let node = unit.node(node_id);
      let row = vec![
        format!("{}..{}", node.span.start, node.span.end),
        node_label(&node.kind).to_string(),
        render_ty(types, decls, symbols, ty),
      ];
      (node.span.start.0, node.span.end.0, row)
    })
    .collect();
  expr_rows.sort();

  let mut pat_rows: Vec<(u32, u32, Vec<String>)> = ctx
    .pat_tys
    .iter()
    .map(|(pat_id, ty)| {
      let pat = unit.pat(pat_id);
      let row = vec![
        format!("{}..{}", pat.span.start, pat.span.end),
        pat_label(&pat.kind).to_string(),
        render_ty(types, decls, symbols, ty),
      ];
      (pat.span.start.0, pat.span.end.0, row)
    })
    .collect();
  pat_rows.sort();

  let mut expr_table = AsciiTable::default();
  expr_table.column(0).set_header("Span");
  expr_table.column(1).set_header("Node");
  expr_table.column(2).set_header("Type");

  let mut pat_table = AsciiTable::default();
  pat_table.column(0).set_header("Span");
  pat_table.column(1).set_header("Pattern");
  pat_table.column(2).set_header("Type");

  let mut out = String::new();
  writeln!(out, "expression types:").unwrap();
  out.push_str(&expr_table.format(expr_rows.into_iter().map(|(_, _, row)| row)));
  writeln!(out, "pattern types:").unwrap();
  out.push_str(&pat_table.format(pat_rows.into_iter().map(|(_, _, row)| row)));
  out
}

/// Every resolved path occurrence with its target, ordered by source
/// position.
pub fn dump_resolutions(
  unit: &Unit,
  ctx: &InferenceCtx,
  decls: &DeclStore,
  symbols: &SymbolTable,
) -> String {
  let mut rows: Vec<(u32, u32, Vec<String>)> = ctx
    .resolutions
    .iter()
    .map(|(path_id, resolved)| {
      let path = unit.path(path_id);
      let text: Vec<&str> = path.segments.iter().map(|segment| symbols.get(segment)).collect();
      let target = match resolved.single_visible() {
        Some(decl) => decl_path(decls, symbols, decl),
        None if resolved.is_empty() => "<unresolved>".to_string(),
        None => format!("<ambiguous: {}>", resolved.candidates.len()),
      };
      let row = vec![
        format!("{}..{}", path.span.start, path.span.end),
        text.join("::"),
        target,
      ];
      (path.span.start.0, path.span.end.0, row)
    })
    .collect();
  rows.sort();

  let mut table = AsciiTable::default();
  table.column(0).set_header("Span");
  table.column(1).set_header("Path");
  table.column(2).set_header("Target");

  let mut out = String::new();
  writeln!(out, "resolutions:").unwrap();
  out.push_str(&table.format(rows.into_iter().map(|(_, _, row)| row)));
  out
}

/// Owner-qualified name: `std::option::Option` for a struct, a bare name
/// for locals and other ownerless declarations.
fn decl_path(
  decls: &DeclStore,
  symbols: &SymbolTable,
  decl: DeclId,
) -> String {
  let mut segments = Vec::new();
  let mut cursor = Some(decl);
  while let Some(current) = cursor {
    let item = decls.get(&current);
    segments.push(symbols.get(&item.name).to_string());
    if let DeclKind::Module(def) = &item.kind {
      segments.push(symbols.get(&def.address).to_string());
    }
    cursor = item.owner;
  }
  segments.reverse();
  segments.join("::")
}

fn node_label(kind: &NodeKind) -> &'static str {
  match kind {
    NodeKind::Literal(_) => "literal",
    NodeKind::Path(_) => "path",
    NodeKind::Borrow { .. } => "borrow",
    NodeKind::Deref(_) => "deref",
    NodeKind::Not(_) => "not",
    NodeKind::Binary { .. } => "binary",
    NodeKind::Cast { .. } => "cast",
    NodeKind::Call { .. } => "call",
    NodeKind::MethodCall { .. } => "method call",
    NodeKind::MacroCall { .. } => "macro call",
    NodeKind::FieldAccess { .. } => "field access",
    NodeKind::Index { .. } => "index",
    NodeKind::StructLit { .. } => "struct literal",
    NodeKind::VectorLit { .. } => "vector literal",
    NodeKind::Tuple(_) => "tuple",
    NodeKind::Lambda { .. } => "lambda",
    NodeKind::Range { .. } => "range",
    NodeKind::If { .. } => "if",
    NodeKind::While { .. } => "while",
    NodeKind::Loop { .. } => "loop",
    NodeKind::For { .. } => "for",
    NodeKind::Match { .. } => "match",
    NodeKind::Block(_) => "block",
    NodeKind::SpecBlock(_) => "spec block",
    NodeKind::Is { .. } => "is",
    NodeKind::Return(_) => "return",
    NodeKind::Abort(_) => "abort",
    NodeKind::Break(_) => "break",
    NodeKind::Continue => "continue",
    NodeKind::Let { .. } => "let",
    NodeKind::Assign { .. } => "assign",
    NodeKind::Include(_) => "include",
    NodeKind::Update { .. } => "update",
    NodeKind::Error => "error",
  }
}

fn pat_label(kind: &PatKind) -> &'static str {
  match kind {
    PatKind::Wildcard => "wildcard",
    PatKind::Binding { .. } => "binding",
    PatKind::Tuple(_) => "tuple",
    PatKind::Struct { .. } => "struct",
    PatKind::TupleStruct { .. } => "tuple struct",
    PatKind::Path(_) => "path",
    PatKind::Lit(_) => "literal",
  }
}
