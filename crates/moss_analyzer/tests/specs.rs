mod common;

use moss_syntax::{BinaryOp, LetKind, UnitBuilder};

#[test]
fn spec_block_sees_target_params_and_result() {
  let mut b = UnitBuilder::new();
  let a_annot = b.annot_name("u64");
  let b_annot = b.annot_name("u64");
  let ret_annot = b.annot_name("u64");
  let pa = b.param("a", a_annot);
  let pb = b.param("b", b_annot);
  let a_tail = b.name("a");
  let body = b.block(vec![], Some(a_tail));
  let f = b.function("add", vec![pa, pb], Some(ret_annot), Some(body));

  let result_use = b.name("result");
  let a_in_spec = b.name("a");
  let cmp = b.binary(BinaryOp::GtEq, result_use, a_in_spec);
  let spec_body = b.block(vec![], Some(cmp));
  let sb = b.spec_block_item(Some("add"), spec_body);

  let mut m = b.module("0x1", "m");
  m.functions.push(f);
  m.spec_blocks.push(sb);
  b.push_module(m);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &result_use), "u64");
  assert_eq!(common::expr_ty(&result, &a_in_spec), "u64");
  assert_eq!(common::expr_ty(&result, &cmp), "bool");

  // The implicit binding is materialized as a local named `result`.
  let symbols = result.symbols.borrow();
  let result_sym = symbols.try_lookup("result").expect("result name interned");
  let (decl_id, _) = result
    .decls
    .iter()
    .find(|(_, decl)| decl.name == result_sym)
    .expect("result declaration allocated");
  assert!(result.decls.as_local(&decl_id).is_some());
  let bound = result.binding_tys.get(&decl_id).expect("result binding typed");
  assert_eq!(common::render(&result, bound), "u64");
}

#[test]
fn spec_literals_read_as_num() {
  let mut b = UnitBuilder::new();
  let n_annot = b.annot_name("u64");
  let ret_annot = b.annot_name("u64");
  let pn = b.param("n", n_annot);
  let n_tail = b.name("n");
  let body = b.block(vec![], Some(n_tail));
  let f = b.function("f", vec![pn], Some(ret_annot), Some(body));

  let n_in_spec = b.name("n");
  let one = b.int_lit(1);
  let sum = b.binary(BinaryOp::Add, n_in_spec, one);
  let spec_body = b.block(vec![], Some(sum));
  let sb = b.spec_block_item(Some("f"), spec_body);

  let mut m = b.module("0x1", "m");
  m.functions.push(f);
  m.spec_blocks.push(sb);
  b.push_module(m);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &one), "num");
  assert_eq!(common::expr_ty(&result, &sum), "num");
}

#[test]
fn spec_arithmetic_crosses_integer_widths() {
  let mut b = UnitBuilder::new();
  let n_annot = b.annot_name("u64");
  let m_annot = b.annot_name("u128");
  let ret_annot = b.annot_name("u64");
  let pn = b.param("n", n_annot);
  let pm = b.param("m", m_annot);
  let n_tail = b.name("n");
  let body = b.block(vec![], Some(n_tail));
  let f = b.function("f", vec![pn, pm], Some(ret_annot), Some(body));

  // `u64 + u128` would report outside a spec region.
  let n_in_spec = b.name("n");
  let m_in_spec = b.name("m");
  let sum = b.binary(BinaryOp::Add, n_in_spec, m_in_spec);
  let spec_body = b.block(vec![], Some(sum));
  let sb = b.spec_block_item(Some("f"), spec_body);

  let mut m = b.module("0x1", "m");
  m.functions.push(f);
  m.spec_blocks.push(sb);
  b.push_module(m);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &sum), "num");
  assert_eq!(common::expr_ty(&result, &n_in_spec), "u64");
  assert_eq!(common::expr_ty(&result, &m_in_spec), "u128");
}

#[test]
fn pre_and_post_lets_hoist_ahead_of_statements() {
  let mut b = UnitBuilder::new();
  // Written before the `let`s that define its operands.
  let limit_in_total = b.name("limit");
  let settled_in_total = b.name("settled");
  let sum = b.binary(BinaryOp::Add, limit_in_total, settled_in_total);
  let total_pat = b.bind("total");
  let total_let = b.let_stmt(total_pat, None, Some(sum));

  let ten = b.int_lit(10);
  let limit_pat = b.bind("limit");
  let pre_let = b.spec_let(LetKind::Pre, limit_pat, None, Some(ten));

  let limit_in_post = b.name("limit");
  let five = b.int_lit(5);
  let post_sum = b.binary(BinaryOp::Add, limit_in_post, five);
  let settled_pat = b.bind("settled");
  let post_let = b.spec_let(LetKind::Post, settled_pat, None, Some(post_sum));

  let spec_body = b.block(vec![total_let, pre_let, post_let], None);
  let sb = b.spec_block_item(None, spec_body);
  let mut m = b.module("0x1", "m");
  m.spec_blocks.push(sb);
  b.push_module(m);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &limit_in_total), "num");
  assert_eq!(common::expr_ty(&result, &settled_in_total), "num");
  assert_eq!(common::expr_ty(&result, &limit_in_post), "num");
}

#[test]
fn toplevel_spec_lets_are_shared_across_sibling_blocks() {
  let mut b = UnitBuilder::new();
  let seven = b.int_lit(7);
  let ghost_pat = b.bind("ghost");
  let ghost_let = b.let_stmt(ghost_pat, None, Some(seven));
  let body_a = b.block(vec![ghost_let], None);
  let sb_a = b.spec_block_item(None, body_a);

  let ghost_use = b.name("ghost");
  let body_b = b.block(vec![], Some(ghost_use));
  let sb_b = b.spec_block_item(None, body_b);

  let mut m = b.module("0x1", "m");
  m.spec_blocks.push(sb_a);
  m.spec_blocks.push(sb_b);
  b.push_module(m);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &ghost_use), "num");
}

#[test]
fn nested_spec_lets_stay_local_to_their_block() {
  let mut b = UnitBuilder::new();
  let one = b.int_lit(1);
  let hidden_pat = b.bind("hidden");
  let hidden_let = b.let_stmt(hidden_pat, None, Some(one));
  let inner = b.block(vec![hidden_let], None);
  let body_a = b.block(vec![inner], None);
  let sb_a = b.spec_block_item(None, body_a);

  let hidden_use = b.name("hidden");
  let body_b = b.block(vec![], Some(hidden_use));
  let sb_b = b.spec_block_item(None, body_b);

  let mut m = b.module("0x1", "m");
  m.spec_blocks.push(sb_a);
  m.spec_blocks.push(sb_b);
  b.push_module(m);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &hidden_use), "<unknown>");
}

#[test]
fn includes_resolve_schemas_and_check_conditions() {
  let mut b = UnitBuilder::new();
  let u64_annot = b.annot_name("u64");
  let fx = b.field_item("x", u64_annot);
  let inv = b.schema_item("Inv", vec![fx]);

  let plain_path = b.path(&["Inv"]);
  let plain_ref = b.path_expr(plain_path);
  let inc_plain = b.include_plain(plain_ref);

  let yes = b.bool_lit(true);
  let if_path = b.path(&["Inv"]);
  let if_ref = b.path_expr(if_path);
  let inc_if = b.include_if(yes, if_ref);

  let no = b.bool_lit(false);
  let imply_path = b.path(&["Inv"]);
  let imply_ref = b.path_expr(imply_path);
  let inc_imply = b.include_imply(no, imply_ref);

  let pick = b.bool_lit(true);
  let then_path = b.path(&["Inv"]);
  let then_ref = b.path_expr(then_path);
  let else_path = b.path(&["Inv"]);
  let else_ref = b.path_expr(else_path);
  let inc_if_else = b.include_if_else(pick, then_ref, else_ref);

  let spec_body = b.block(vec![inc_plain, inc_if, inc_imply, inc_if_else], None);
  let sb = b.spec_block_item(None, spec_body);
  let mut m = b.module("0x1", "m");
  m.schemas.push(inv);
  m.spec_blocks.push(sb);
  b.push_module(m);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  for schema_ref in [&plain_ref, &if_ref, &imply_ref, &then_ref, &else_ref] {
    assert_eq!(common::expr_ty(&result, schema_ref), "0x1::m::Inv");
  }
  for include in [&inc_plain, &inc_if, &inc_imply, &inc_if_else] {
    assert_eq!(common::expr_ty(&result, include), "()");
  }
  let target = result
    .resolutions
    .get(&plain_path)
    .and_then(|resolved| resolved.single_visible());
  assert!(target.is_some(), "schema path should land on the declaration");
}

#[test]
fn include_conditions_must_be_bool() {
  let mut b = UnitBuilder::new();
  let u64_annot = b.annot_name("u64");
  let fx = b.field_item("x", u64_annot);
  let inv = b.schema_item("Inv", vec![fx]);

  let one = b.int_lit(1);
  let inv_path = b.path(&["Inv"]);
  let inv_ref = b.path_expr(inv_path);
  let inc = b.include_if(one, inv_ref);

  let spec_body = b.block(vec![inc], None);
  let sb = b.spec_block_item(None, spec_body);
  let mut m = b.module("0x1", "m");
  m.schemas.push(inv);
  m.spec_blocks.push(sb);
  b.push_module(m);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_err(&result, &["T0001"]);
  assert_eq!(result.diagnostics[0].message, "Incompatible type 'num', expected 'bool'");
  assert_eq!(result.diagnostics[0].primary_span, unit.node(&one).span);
}

#[test]
fn implication_operands_coerce_to_bool() {
  let mut b = UnitBuilder::new();
  let premise = b.bool_lit(true);
  let one = b.int_lit(1);
  let zero = b.int_lit(0);
  let conclusion = b.binary(BinaryOp::Gt, one, zero);
  let imp = b.binary(BinaryOp::Implies, premise, conclusion);
  let spec_body = b.block(vec![], Some(imp));
  let sb = b.spec_block_item(None, spec_body);
  let mut m = b.module("0x1", "m");
  m.spec_blocks.push(sb);
  b.push_module(m);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &conclusion), "bool");
  assert_eq!(common::expr_ty(&result, &imp), "bool");
}

#[test]
fn implication_rejects_integer_operands() {
  let mut b = UnitBuilder::new();
  let one = b.int_lit(1);
  let yes = b.bool_lit(true);
  let imp = b.binary(BinaryOp::Implies, one, yes);
  let spec_body = b.block(vec![], Some(imp));
  let sb = b.spec_block_item(None, spec_body);
  let mut m = b.module("0x1", "m");
  m.spec_blocks.push(sb);
  b.push_module(m);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_err(&result, &["T0001"]);
  assert_eq!(result.diagnostics[0].primary_span, unit.node(&one).span);
}

#[test]
fn update_statements_type_as_unit() {
  let mut b = UnitBuilder::new();
  let one = b.int_lit(1);
  let x = b.bind("x");
  let x_let = b.let_stmt(x, None, Some(one));
  let x_use = b.name("x");
  let two = b.int_lit(2);
  let upd = b.update(x_use, two);
  let spec_body = b.block(vec![x_let, upd], None);
  let sb = b.spec_block_item(None, spec_body);
  let mut m = b.module("0x1", "m");
  m.spec_blocks.push(sb);
  b.push_module(m);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &upd), "()");
  assert_eq!(common::expr_ty(&result, &x_use), "num");
}

#[test]
fn spec_block_expressions_inside_bodies_stay_unit() {
  let mut b = UnitBuilder::new();
  let five = b.int_lit(5);
  let spec_expr = b.spec_block(vec![], Some(five));

  let seven = b.int_lit(7);
  let y = b.bind("y");
  let y_let = b.let_stmt(y, None, Some(seven));
  let y_use = b.name("y");
  common::main_fn(&mut b, vec![spec_expr, y_let, y_use], None);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &spec_expr), "()");
  // Inside the region the literal is unbounded; outside it defaults.
  assert_eq!(common::expr_ty(&result, &five), "num");
  assert_eq!(common::expr_ty(&result, &y_use), "integer");
}

#[test]
fn spec_functions_analyze_their_whole_body_unbounded() {
  let mut b = UnitBuilder::new();
  let n_annot = b.annot_name("u64");
  let ret_annot = b.annot_name("u64");
  let pn = b.param("n", n_annot);
  let n_use = b.name("n");
  let one = b.int_lit(1);
  let sum = b.binary(BinaryOp::Add, n_use, one);
  let body = b.block(vec![], Some(sum));
  let mut f = b.function("inv", vec![pn], Some(ret_annot), Some(body));
  f.is_spec = true;
  let mut m = b.module("0x1", "m");
  m.functions.push(f);
  b.push_module(m);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &one), "num");
  assert_eq!(common::expr_ty(&result, &sum), "num");
}

#[test]
fn schema_literals_build_in_spec_regions() {
  let mut b = UnitBuilder::new();
  let u64_annot = b.annot_name("u64");
  let fx = b.field_item("x", u64_annot);
  let inv = b.schema_item("Inv", vec![fx]);

  let one = b.int_lit(1);
  let lit_path = b.path(&["Inv"]);
  let lit = b.struct_lit(lit_path, vec![("x", Some(one))]);
  let s = b.bind("s");
  let s_let = b.let_stmt(s, None, Some(lit));
  let spec_body = b.block(vec![s_let], None);
  let sb = b.spec_block_item(None, spec_body);
  let mut m = b.module("0x1", "m");
  m.schemas.push(inv);
  m.spec_blocks.push(sb);
  b.push_module(m);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &lit), "0x1::m::Inv");
}

#[test]
fn schema_literals_stay_opaque_outside_specs() {
  let mut b = UnitBuilder::new();
  let u64_annot = b.annot_name("u64");
  let fx = b.field_item("x", u64_annot);
  let inv = b.schema_item("Inv", vec![fx]);

  let one = b.int_lit(1);
  let lit_path = b.path(&["Inv"]);
  let lit = b.struct_lit(lit_path, vec![("x", Some(one))]);
  let s = b.bind("s");
  let s_let = b.let_stmt(s, None, Some(lit));
  let body = b.block(vec![s_let], None);
  let f = b.function("f", vec![], None, Some(body));
  let mut m = b.module("0x1", "m");
  m.schemas.push(inv);
  m.functions.push(f);
  b.push_module(m);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &lit), "<unknown>");
}
