use std::cell::RefCell;
use std::rc::Rc;

use moss_analyzer::{Analyzer, CancellationToken, InferenceResult, MacroRegistry};
use moss_config::MossConfig;
use moss_diagnostics::{Diagnostic, Severity};
use moss_syntax::{AnnotId, NodeId, Unit, UnitBuilder};
use moss_ty::display::render_ty;
use moss_ty::symbol::SymbolTable;
use moss_ty::ty::TyId;

/// Run the analyzer over a built unit with a quiet default configuration.
pub fn run(
  unit: &Unit,
  symbols: SymbolTable,
) -> InferenceResult {
  let config = MossConfig::new_basic(false, Vec::new(), true, 0);
  Analyzer::analyze(unit, Rc::new(RefCell::new(symbols)), &config)
}

/// Run with a host-extended macro registry and a cancellation token.
#[allow(dead_code)]
pub fn run_with(
  unit: &Unit,
  symbols: SymbolTable,
  macros: MacroRegistry,
  cancel: CancellationToken,
) -> InferenceResult {
  let config = MossConfig::new_basic(false, Vec::new(), true, 0);
  Analyzer::analyze_with(unit, Rc::new(RefCell::new(symbols)), &config, macros, cancel)
}

/// Run with an explicit configuration, for feature-flag tests.
#[allow(dead_code)]
pub fn run_configured(
  unit: &Unit,
  symbols: SymbolTable,
  config: &MossConfig,
) -> InferenceResult {
  Analyzer::analyze(unit, Rc::new(RefCell::new(symbols)), config)
}

/// Assemble `module 0x1::m { fun f() { stmts; tail } }` around the given
/// body pieces and push it as the main module.
#[allow(dead_code)]
pub fn main_fn(
  b: &mut UnitBuilder,
  stmts: Vec<NodeId>,
  tail: Option<NodeId>,
) {
  let body = b.block(stmts, tail);
  let f = b.function("f", vec![], None, Some(body));
  let mut m = b.module("0x1", "m");
  m.functions.push(f);
  b.push_module(m);
}

/// Same as `main_fn` with a declared return annotation on `f`.
#[allow(dead_code)]
pub fn main_fn_ret(
  b: &mut UnitBuilder,
  stmts: Vec<NodeId>,
  tail: Option<NodeId>,
  ret: AnnotId,
) {
  let body = b.block(stmts, tail);
  let f = b.function("f", vec![], Some(ret), Some(body));
  let mut m = b.module("0x1", "m");
  m.functions.push(f);
  b.push_module(m);
}

/// Render a settled type against the result's stores.
#[allow(dead_code)]
pub fn render(
  result: &InferenceResult,
  ty: &TyId,
) -> String {
  let symbols = result.symbols.borrow();
  render_ty(&result.types, &result.decls, &symbols, ty)
}

/// Rendered type recorded for an expression node.
#[allow(dead_code)]
pub fn expr_ty(
  result: &InferenceResult,
  node: &NodeId,
) -> String {
  let ty = result
    .expr_tys
    .get(node)
    .unwrap_or_else(|| panic!("no type recorded for node {:?}", node));
  render(result, ty)
}

/// Assert the unit analyzes without errors.
#[allow(dead_code)]
pub fn assert_ok(result: &InferenceResult) {
  let errors: Vec<_> = result
    .diagnostics
    .iter()
    .filter(|d| matches!(d.severity, Severity::Error))
    .collect();
  assert!(errors.is_empty(), "Expected no errors, got: {:?}", errors);
}

/// Error codes in report order.
#[allow(dead_code)]
pub fn codes(result: &InferenceResult) -> Vec<String> {
  result.diagnostics.iter().map(|d| d.error_code.clone()).collect()
}

/// Assert each expected code appears somewhere in the report.
#[allow(dead_code)]
pub fn assert_err(
  result: &InferenceResult,
  expected_codes: &[&str],
) {
  let actual = codes(result);
  for code in expected_codes {
    assert!(
      actual.contains(&code.to_string()),
      "Expected error code {} not found. Got: {:?}",
      code,
      actual
    );
  }
}

/// Snapshot rendering of the report: one `[SEVERITY] code: message` line per
/// diagnostic, labels indented under it. Spans are the builder's synthetic
/// offsets and stay out of the rendering.
#[allow(dead_code)]
pub fn format_diagnostics(diags: &[Diagnostic]) -> String {
  if diags.is_empty() {
    return "(no diagnostics)".to_string();
  }

  let mut out = String::new();
  for diag in diags {
    let severity = match diag.severity {
      Severity::Error => "ERROR",
      Severity::Warning => "WARN",
      Severity::Info => "INFO",
      Severity::Hint => "HINT",
    };
    out.push_str(&format!("[{}] {}: {}\n", severity, diag.error_code, diag.message));
    for label in &diag.labels {
      out.push_str(&format!("  label: {}\n", label.message));
    }
  }
  out
}
