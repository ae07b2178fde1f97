mod common;

use moss_config::{MossConfig, PackageManifest};
use moss_syntax::{BinaryOp, UnitBuilder};
use moss_ty::ty::IntegerKind;

#[test]
fn breaks_and_continues_diverge() {
  let mut b = UnitBuilder::new();
  let five = b.int_lit(5);
  let brk = b.brk(Some(five));
  let cont = b.cont();
  let body = b.block(vec![brk, cont], None);
  let lp = b.loop_expr(body);
  common::main_fn(&mut b, vec![lp], None);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &brk), "<never>");
  assert_eq!(common::expr_ty(&result, &cont), "<never>");
  assert_eq!(common::expr_ty(&result, &five), "integer");
}

#[test]
fn diverging_then_branch_takes_the_else_type() {
  let mut b = UnitBuilder::new();
  let cond = b.bool_lit(true);
  let one = b.int_lit(1);
  let ret = b.ret(Some(one));
  let then_block = b.block(vec![], Some(ret));
  let two = b.typed_int(2, IntegerKind::U8);
  let else_block = b.block(vec![], Some(two));
  let if_expr = b.if_expr(cond, then_block, Some(else_block));
  let x = b.bind("x");
  let x_let = b.let_stmt(x, None, Some(if_expr));
  let x_use = b.name("x");
  let annot = b.annot_name("u8");
  common::main_fn_ret(&mut b, vec![x_let], Some(x_use), annot);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &ret), "<never>");
  assert_eq!(common::expr_ty(&result, &if_expr), "u8");
  // The early return's operand settles against the declared return type.
  assert_eq!(common::expr_ty(&result, &one), "u8");
}

#[test]
fn is_expressions_test_variants() {
  let mut b = UnitBuilder::new();
  let circle = b.variant_item("Circle", vec![]);
  let square = b.variant_item("Square", vec![]);
  let shape = b.enum_item("Shape", vec![circle, square]);

  let shape_annot = b.annot_name("Shape");
  let ps = b.param("s", shape_annot);
  let s_use = b.name("s");
  let variant_path = b.path(&["Shape", "Circle"]);
  let is_node = b.is_expr(s_use, vec![variant_path]);
  let ret_annot = b.annot_name("bool");
  let body = b.block(vec![], Some(is_node));
  let f = b.function("f", vec![ps], Some(ret_annot), Some(body));
  let mut m = b.module("0x1", "m");
  m.enums.push(shape);
  m.functions.push(f);
  b.push_module(m);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &is_node), "bool");
  assert_eq!(common::expr_ty(&result, &s_use), "0x1::m::Shape");
  let target = result
    .resolutions
    .get(&variant_path)
    .and_then(|resolved| resolved.single_visible());
  assert!(target.is_some(), "tested variant should resolve for go-to-definition");
}

#[test]
fn address_literals_and_hex_strings_type() {
  let mut b = UnitBuilder::new();
  let addr = b.address_lit("0x2");
  let a = b.bind("a");
  let a_let = b.let_stmt(a, None, Some(addr));
  let hex = b.hex_string("CAFE");
  let h = b.bind("h");
  let h_let = b.let_stmt(h, None, Some(hex));
  common::main_fn(&mut b, vec![a_let, h_let], None);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &addr), "address");
  assert_eq!(common::expr_ty(&result, &hex), "vector<u8>");
}

#[test]
fn declared_unit_returns_accept_empty_bodies() {
  let mut b = UnitBuilder::new();
  let unit_annot = b.annot_unit();
  common::main_fn_ret(&mut b, vec![], None, unit_annot);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
}

#[test]
fn unit_return_mismatch_reports_at_the_tail() {
  let mut b = UnitBuilder::new();
  let unit_annot = b.annot_unit();
  let tail = b.bool_lit(true);
  common::main_fn_ret(&mut b, vec![], Some(tail), unit_annot);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_err(&result, &["T0002"]);
  assert_eq!(result.diagnostics[0].primary_span, unit.node(&tail).span);
  assert_eq!(result.diagnostics[0].labels.len(), 1);
  assert_eq!(result.diagnostics[0].labels[0].message, "Return type declared here");
}

#[test]
fn every_expression_lands_in_the_type_table() {
  let mut b = UnitBuilder::new();
  let cond = b.bool_lit(true);
  let one = b.typed_int(1, IntegerKind::U64);
  let two = b.typed_int(2, IntegerKind::U64);
  let then_b = b.block(vec![], Some(one));
  let else_b = b.block(vec![], Some(two));
  let iff = b.if_expr(cond, then_b, Some(else_b));
  let x = b.bind("x");
  let x_let = b.let_stmt(x, None, Some(iff));

  let e1 = b.typed_int(3, IntegerKind::U8);
  let e2 = b.typed_int(4, IntegerKind::U8);
  let vec_lit = b.vector_lit(None, vec![e1, e2]);
  let v = b.bind("v");
  let v_let = b.let_stmt(v, None, Some(vec_lit));

  let flag = b.bool_lit(false);
  let x_read = b.name("x");
  let pair = b.tuple(vec![flag, x_read]);
  let t = b.bind("t");
  let t_let = b.let_stmt(t, None, Some(pair));

  let lo = b.typed_int(0, IntegerKind::U64);
  let hi = b.typed_int(9, IntegerKind::U64);
  let range = b.range(lo, hi);
  let i = b.bind("i");
  let i_read = b.name("i");
  let for_body = b.block(vec![i_read], None);
  let for_loop = b.for_expr(i, range, for_body);

  let x_scrut = b.name("x");
  let y = b.bind("y");
  let y_read = b.name("y");
  let keep = b.arm(y, None, y_read);
  let w = b.wild();
  let guard = b.bool_lit(true);
  let zero = b.typed_int(0, IntegerKind::U64);
  let fallback = b.arm(w, Some(guard), zero);
  let matched = b.match_expr(x_scrut, vec![keep, fallback]);
  let m_bind = b.bind("m");
  let m_let = b.let_stmt(m_bind, None, Some(matched));

  let x_cast = b.name("x");
  let u8_annot = b.annot_name("u8");
  let cast = b.cast(x_cast, u8_annot);
  let c = b.bind("c");
  let c_let = b.let_stmt(c, None, Some(cast));

  common::main_fn(&mut b, vec![x_let, v_let, t_let, for_loop, m_let, c_let], None);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  // Hover can answer on any node: the walk plus the closing sweep leave
  // nothing untyped.
  assert_eq!(result.expr_tys.len(), unit.nodes.len());
  assert_eq!(common::expr_ty(&result, &matched), "u64");
  assert_eq!(common::expr_ty(&result, &vec_lit), "vector<u8>");
  assert_eq!(common::expr_ty(&result, &range), "range<u64>");
  assert_eq!(common::expr_ty(&result, &for_loop), "<never>");
}

#[test]
fn parse_errors_degrade_to_unknown_quietly() {
  let mut b = UnitBuilder::new();
  let bad = b.error();
  let one = b.int_lit(1);
  let sum = b.binary(BinaryOp::Add, bad, one);
  common::main_fn(&mut b, vec![sum], None);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &bad), "<unknown>");
  assert_eq!(common::expr_ty(&result, &sum), "<unknown>");
  assert_eq!(common::expr_ty(&result, &one), "integer");
}

#[test]
fn legacy_manifests_switch_off_index_sugar() {
  let mut b = UnitBuilder::new();
  let e1 = b.typed_int(1, IntegerKind::U8);
  let v_lit = b.vector_lit(None, vec![e1]);
  let v = b.bind("v");
  let v_let = b.let_stmt(v, None, Some(v_lit));
  let v_read = b.name("v");
  let zero = b.typed_int(0, IntegerKind::U64);
  let idx = b.index(v_read, zero);
  let o = b.bind("o");
  let o_let = b.let_stmt(o, None, Some(idx));
  common::main_fn(&mut b, vec![v_let, o_let], None);

  let (unit, symbols) = b.finish();
  let manifest = PackageManifest::from_toml(
    r#"
    [package]
    name = "demo"
    edition = "legacy"
    "#,
  )
  .expect("manifest parses");
  let mut config = MossConfig::with_manifest(manifest);
  config.quiet = true;
  let result = common::run_configured(&unit, symbols, &config);

  assert!(result.diagnostics.is_empty());
  assert_eq!(common::expr_ty(&result, &idx), "<unknown>");
}
