mod common;

use moss_analyzer::{CancellationToken, MacroRegistry, MacroReturnRule, MacroSpec};
use moss_config::MossConfig;
use moss_syntax::{NodeId, UnitBuilder};

#[test]
fn option_macro_wraps_the_argument() {
  let mut b = UnitBuilder::new();
  let one = b.int_lit(1);
  let call = b.macro_call("option", vec![one]);
  common::main_fn(&mut b, vec![call], None);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &call), "std::option::Option<integer>");
}

#[test]
fn result_macro_wraps_both_arguments() {
  let mut b = UnitBuilder::new();
  let one = b.int_lit(1);
  let bytes = b.byte_string("x");
  let call = b.macro_call("result", vec![one, bytes]);
  common::main_fn(&mut b, vec![call], None);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(
    common::expr_ty(&result, &call),
    "std::result::Result<integer, vector<u8>>"
  );
}

#[test]
fn option_of_unresolved_argument_collapses() {
  let mut b = UnitBuilder::new();
  let missing = b.name("missing");
  let call = b.macro_call("option", vec![missing]);
  common::main_fn(&mut b, vec![call], None);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &call), "<unknown>");
}

#[test]
fn bcs_macro_returns_bytes() {
  let mut b = UnitBuilder::new();
  let one = b.int_lit(1);
  let call = b.macro_call("bcs", vec![one]);
  common::main_fn(&mut b, vec![call], None);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &call), "vector<u8>");
}

#[test]
fn assert_macro_types_as_unit() {
  let mut b = UnitBuilder::new();
  let cond = b.bool_lit(true);
  let code = b.int_lit(1);
  let call = b.macro_call("assert", vec![cond, code]);
  common::main_fn(&mut b, vec![call], None);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &call), "()");
  // Arguments are still typed for hover even though the call discards them.
  assert_eq!(common::expr_ty(&result, &cond), "bool");
}

#[test]
fn opaque_macro_is_unknown() {
  let mut b = UnitBuilder::new();
  let one = b.int_lit(1);
  let call = b.macro_call("object", vec![one]);
  common::main_fn(&mut b, vec![call], None);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &call), "<unknown>");
}

#[test]
fn unknown_macro_stays_quiet() {
  let mut b = UnitBuilder::new();
  let one = b.int_lit(1);
  let call = b.macro_call("no_such_macro", vec![one]);
  common::main_fn(&mut b, vec![call], None);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  assert!(result.diagnostics.is_empty());
  assert_eq!(common::expr_ty(&result, &call), "<unknown>");
}

#[test]
fn registered_macro_shadows_the_builtin() {
  let mut b = UnitBuilder::new();
  let cond = b.bool_lit(true);
  let code = b.int_lit(1);
  let call = b.macro_call("assert", vec![cond, code]);
  common::main_fn(&mut b, vec![call], None);

  let mut registry = MacroRegistry::new();
  registry.register(MacroSpec::new("assert", vec!["anything"], None, MacroReturnRule::Opaque));

  let (unit, symbols) = b.finish();
  let result = common::run_with(&unit, symbols, registry, CancellationToken::new());

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &call), "<unknown>");
}

#[test]
fn registered_macro_introduces_a_new_name() {
  let mut b = UnitBuilder::new();
  let one = b.int_lit(1);
  let call = b.macro_call("emit", vec![one]);
  common::main_fn(&mut b, vec![call], None);

  let mut registry = MacroRegistry::new();
  registry.register(MacroSpec::new("emit", vec!["payload"], Some(1), MacroReturnRule::Unit));

  let (unit, symbols) = b.finish();
  let result = common::run_with(&unit, symbols, registry, CancellationToken::new());

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &call), "()");
}

fn unit_with_macro_fn(b: &mut UnitBuilder) -> NodeId {
  let u64_annot = b.annot_name("u64");
  let x = b.param("x", u64_annot);
  let mut twice = b.function("twice", vec![x], Some(u64_annot), None);
  twice.is_macro = true;

  let five = b.int_lit(5);
  let call = b.macro_call("twice", vec![five]);
  let body = b.block(vec![call], None);
  let f = b.function("f", vec![], None, Some(body));
  let mut m = b.module("0x1", "m");
  m.functions.push(twice);
  m.functions.push(f);
  b.push_module(m);
  call
}

#[test]
fn generic_macro_types_through_the_declaration() {
  let mut b = UnitBuilder::new();
  let call = unit_with_macro_fn(&mut b);

  let mut config = MossConfig::new_basic(false, Vec::new(), true, 0);
  config.features.generic_macros = true;

  let (unit, symbols) = b.finish();
  let result = common::run_configured(&unit, symbols, &config);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &call), "u64");
}

#[test]
fn generic_macros_off_falls_back_to_the_registry() {
  let mut b = UnitBuilder::new();
  let call = unit_with_macro_fn(&mut b);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &call), "<unknown>");
}
