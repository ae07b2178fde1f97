mod common;

use moss_syntax::{BinaryOp, NodeId, Unit, UnitBuilder};
use moss_ty::symbol::SymbolTable;
use moss_ty::ty::IntegerKind;
use proptest::prelude::*;

/// Suffixes a literal can carry, `None` meaning unsuffixed.
fn literal_kind() -> impl Strategy<Value = Option<IntegerKind>> {
  prop_oneof![
    Just(None),
    Just(Some(IntegerKind::U8)),
    Just(Some(IntegerKind::U16)),
    Just(Some(IntegerKind::U32)),
    Just(Some(IntegerKind::U64)),
    Just(Some(IntegerKind::U128)),
    Just(Some(IntegerKind::U256)),
  ]
}

fn concrete_kind() -> impl Strategy<Value = IntegerKind> {
  prop_oneof![
    Just(IntegerKind::U8),
    Just(IntegerKind::U16),
    Just(IntegerKind::U32),
    Just(IntegerKind::U64),
    Just(IntegerKind::U128),
    Just(IntegerKind::U256),
  ]
}

fn any_binary_op() -> impl Strategy<Value = BinaryOp> {
  prop_oneof![
    Just(BinaryOp::Add),
    Just(BinaryOp::Sub),
    Just(BinaryOp::Mul),
    Just(BinaryOp::Div),
    Just(BinaryOp::Mod),
    Just(BinaryOp::BitAnd),
    Just(BinaryOp::BitOr),
    Just(BinaryOp::BitXor),
    Just(BinaryOp::Shl),
    Just(BinaryOp::Shr),
    Just(BinaryOp::And),
    Just(BinaryOp::Or),
    Just(BinaryOp::Eq),
    Just(BinaryOp::Lt),
    Just(BinaryOp::GtEq),
  ]
}

/// One function whose body folds the planned literals left to right with
/// the planned operators. Returns every node the fold created.
fn chain_unit(
  plan: &[(u128, Option<IntegerKind>)],
  ops: &[BinaryOp],
) -> (Unit, SymbolTable, Vec<NodeId>) {
  let mut b = UnitBuilder::new();
  let mut nodes = Vec::new();
  let mut acc: Option<NodeId> = None;
  for (index, (value, kind)) in plan.iter().enumerate() {
    let lit = match kind {
      Some(kind) => b.typed_int(*value, *kind),
      None => b.int_lit(*value),
    };
    nodes.push(lit);
    acc = Some(match acc {
      Some(prev) => {
        let folded = b.binary(ops[index % ops.len()], prev, lit);
        nodes.push(folded);
        folded
      },
      None => lit,
    });
  }
  let root = acc.unwrap();
  common::main_fn(&mut b, vec![root], None);
  let (unit, symbols) = b.finish();
  (unit, symbols, nodes)
}

proptest! {
    /// Whatever operator soup the fold produces, analysis must finish and
    /// leave a type on every expression it visited.
    #[test]
    fn folded_operators_type_every_node(
        plan in prop::collection::vec((any::<u128>(), literal_kind()), 2..8),
        ops in prop::collection::vec(any_binary_op(), 1..7),
    ) {
        let (unit, symbols, nodes) = chain_unit(&plan, &ops);
        let result = common::run(&unit, symbols);
        for node in &nodes {
            prop_assert!(result.expr_tys.contains_key(node));
        }
    }

    /// Two analyses of the same unit agree on findings and on table sizes.
    #[test]
    fn analysis_is_deterministic(
        plan in prop::collection::vec((any::<u128>(), literal_kind()), 2..8),
        ops in prop::collection::vec(any_binary_op(), 1..7),
    ) {
        let (unit_a, symbols_a, _) = chain_unit(&plan, &ops);
        let first = common::run(&unit_a, symbols_a);
        let (unit_b, symbols_b, _) = chain_unit(&plan, &ops);
        let second = common::run(&unit_b, symbols_b);

        prop_assert_eq!(
            common::format_diagnostics(&first.diagnostics),
            common::format_diagnostics(&second.diagnostics)
        );
        prop_assert_eq!(first.expr_tys.len(), second.expr_tys.len());
        prop_assert_eq!(first.binding_tys.len(), second.binding_tys.len());
    }

    /// A suffix pins the literal; without one it stays the provisional
    /// integer.
    #[test]
    fn literal_suffixes_are_preserved(value in any::<u128>(), kind in literal_kind()) {
        let mut b = UnitBuilder::new();
        let lit = match kind {
            Some(kind) => b.typed_int(value, kind),
            None => b.int_lit(value),
        };
        common::main_fn(&mut b, vec![lit], None);

        let (unit, symbols) = b.finish();
        let result = common::run(&unit, symbols);

        let expected = match kind {
            Some(kind) => kind.name(),
            None => "integer",
        };
        prop_assert_eq!(common::expr_ty(&result, &lit), expected);
    }

    /// An annotated binding refines an unsuffixed initializer all the way
    /// to later reads.
    #[test]
    fn annotated_lets_settle_to_their_annotation(value in any::<u128>(), kind in concrete_kind()) {
        let mut b = UnitBuilder::new();
        let lit = b.int_lit(value);
        let annot = b.annot_name(kind.name());
        let x = b.bind("x");
        let stmt = b.let_stmt(x, Some(annot), Some(lit));
        let x_read = b.name("x");
        common::main_fn(&mut b, vec![stmt, x_read], None);

        let (unit, symbols) = b.finish();
        let result = common::run(&unit, symbols);

        common::assert_ok(&result);
        prop_assert_eq!(common::expr_ty(&result, &lit), kind.name());
        prop_assert_eq!(common::expr_ty(&result, &x_read), kind.name());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Unpacking reports exactly when the arities differ, and the message
    /// quotes the assigned tuple's length.
    #[test]
    fn tuple_arity_mismatch_reports_iff_lengths_differ(
        pat_arity in 2..6usize,
        val_arity in 2..6usize,
    ) {
        let mut b = UnitBuilder::new();
        let mut elements = Vec::new();
        for index in 0..val_arity {
            elements.push(b.int_lit(index as u128));
        }
        let value = b.tuple(elements);
        let mut pats = Vec::new();
        for index in 0..pat_arity {
            pats.push(b.bind(&format!("x{}", index)));
        }
        let pat = b.tuple_pat(pats);
        let stmt = b.let_stmt(pat, None, Some(value));
        common::main_fn(&mut b, vec![stmt], None);

        let (unit, symbols) = b.finish();
        let result = common::run(&unit, symbols);

        if pat_arity == val_arity {
            prop_assert!(result.diagnostics.is_empty());
        } else {
            prop_assert_eq!(common::codes(&result), vec!["T0005".to_string()]);
            let holes = vec!["_"; val_arity].join(", ");
            let expected = format!(
                "Invalid unpacking. Expected tuple binding of length {}: ({})",
                val_arity, holes
            );
            prop_assert_eq!(&result.diagnostics[0].message, &expected);
        }
    }
}

#[test]
fn empty_units_analyze_quietly() {
  let b = UnitBuilder::new();
  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);
  assert!(result.diagnostics.is_empty());
  assert!(result.expr_tys.is_empty());

  let mut b = UnitBuilder::new();
  let m = b.module("0x1", "m");
  b.push_module(m);
  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);
  assert!(result.diagnostics.is_empty());
}

#[test]
fn deeply_nested_blocks_settle() {
  let mut b = UnitBuilder::new();
  let lit = b.int_lit(7);
  let mut inner = lit;
  for _ in 0..6 {
    inner = b.block(vec![], Some(inner));
  }
  common::main_fn(&mut b, vec![inner], None);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &lit), "integer");
  assert_eq!(common::expr_ty(&result, &inner), "integer");
}

#[test]
fn many_parameters_type_check() {
  let mut b = UnitBuilder::new();
  let u64_annot = b.annot_name("u64");
  let names = ["p0", "p1", "p2", "p3", "p4", "p5", "p6", "p7"];
  let mut params = Vec::new();
  for name in names {
    params.push(b.param(name, u64_annot));
  }
  let mut acc = b.name(names[0]);
  for name in &names[1..] {
    let read = b.name(name);
    acc = b.binary(BinaryOp::Add, acc, read);
  }
  let body = b.block(vec![], Some(acc));
  let f = b.function("wide", params, Some(u64_annot), Some(body));
  let mut m = b.module("0x1", "m");
  m.functions.push(f);
  b.push_module(m);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  common::assert_ok(&result);
  assert_eq!(common::expr_ty(&result, &acc), "u64");
}

#[test]
fn multiple_findings_in_one_body() {
  let mut b = UnitBuilder::new();
  let bool_annot = b.annot_name("bool");
  let mut stmts = Vec::new();
  for (index, name) in ["x", "y", "z"].iter().enumerate() {
    let init = b.int_lit(index as u128);
    let pat = b.bind(name);
    stmts.push(b.let_stmt(pat, Some(bool_annot), Some(init)));
  }
  common::main_fn(&mut b, stmts, None);

  let (unit, symbols) = b.finish();
  let result = common::run(&unit, symbols);

  assert_eq!(result.diagnostics.len(), 3);
  assert_eq!(common::codes(&result), vec!["T0001", "T0001", "T0001"]);
}

#[test]
fn repeated_analysis_is_consistent() {
  fn sample() -> (Unit, SymbolTable, NodeId) {
    let mut b = UnitBuilder::new();
    let u64_annot = b.annot_name("u64");
    let v = b.param("v", u64_annot);
    let lhs = b.name("v");
    let rhs = b.name("v");
    let sum = b.binary(BinaryOp::Add, lhs, rhs);
    let double_body = b.block(vec![], Some(sum));
    let double = b.function("double", vec![v], Some(u64_annot), Some(double_body));

    let arg = b.int_lit(21);
    let path = b.path(&["double"]);
    let call = b.call(path, vec![arg]);
    let body = b.block(vec![], Some(call));
    let f = b.function("f", vec![], Some(u64_annot), Some(body));

    let mut m = b.module("0x1", "m");
    m.functions.push(double);
    m.functions.push(f);
    b.push_module(m);
    let (unit, symbols) = b.finish();
    (unit, symbols, call)
  }

  let mut rendered = Vec::new();
  for _ in 0..5 {
    let (unit, symbols, call) = sample();
    let result = common::run(&unit, symbols);
    common::assert_ok(&result);
    rendered.push((
      common::format_diagnostics(&result.diagnostics),
      common::expr_ty(&result, &call),
      result.expr_tys.len(),
    ));
  }
  for entry in &rendered[1..] {
    assert_eq!(entry, &rendered[0]);
  }
}
