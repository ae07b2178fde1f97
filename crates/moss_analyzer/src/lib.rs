use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use moss_config::{DebugTrace, DumpKind, MossConfig};
use moss_diagnostics::{Diagnostic, TypeError};
use moss_log::{phase_log, phase_ok};
use moss_syntax::path::PathId;
use moss_syntax::pattern::PatId;
use moss_syntax::{NodeId, Unit};
use moss_ty::decl::{DeclId, DeclStore};
use moss_ty::infer::VarTable;
use moss_ty::span::Span;
use moss_ty::symbol::{SymbolId, SymbolTable};
use moss_ty::ty::{TyId, TypeStore};

mod binder;
mod dump;
mod exprs;
mod macros;
mod patterns;
mod resolve;
mod scope;
mod unify;
mod walk;

pub use dump::{dump_decls, dump_inference, dump_resolutions};
pub use macros::{MacroRegistry, MacroReturnRule, MacroSpec};
pub use resolve::{Candidate, Ns, ResolvedPath};
pub use scope::{Scope, ScopeId, ScopeKind, ScopeTree};

/// Cooperative cancellation handle. The host keeps a clone and flips it
/// when the edit that produced this unit is superseded; the walker checks
/// it at every expression entry and unwinds with partial tables.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::Relaxed);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::Relaxed)
  }
}

/// What the context wants an expression to be. Passed down explicitly so
/// every rule states whether it consumes the expectation or ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
  None,
  HasTy(TyId),
}

impl Expectation {
  pub fn ty(&self) -> Option<TyId> {
    match self {
      Expectation::HasTy(ty) => Some(*ty),
      Expectation::None => None,
    }
  }
}

/// A resolved field access: the struct, variant or schema declaration that
/// owns the field, and the field's index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldTarget {
  pub owner: DeclId,
  pub index: u32,
}

/// Mutable inference state, kept apart from the borrowed syntax so the
/// walker can split borrows: variable table and result tables on one side,
/// the type store on the other.
#[derive(Debug, Default)]
pub struct InferenceCtx {
  pub vars: VarTable,
  pub expr_tys: HashMap<NodeId, TyId>,
  pub pat_tys: HashMap<PatId, TyId>,
  /// One cell per binding declaration. Patterns and later mentions of the
  /// same local read through this table, so refining the cell retypes
  /// every mention at once.
  pub binding_tys: HashMap<DeclId, TyId>,
  pub resolutions: HashMap<PathId, ResolvedPath>,
  pub method_targets: HashMap<NodeId, DeclId>,
  pub field_targets: HashMap<NodeId, FieldTarget>,
  pub pat_targets: HashMap<PatId, DeclId>,
  pub errors: Vec<TypeError>,
  /// Inside a specification region: unsuffixed literals become `num`,
  /// arithmetic is unbounded, schemas resolve.
  pub spec_mode: bool,
  pub expected_return: Option<TyId>,
  /// Span of the return annotation of the function being walked, used as a
  /// secondary label on return-type errors.
  pub return_annot_span: Option<Span>,
  /// Body block of the function being walked; its trailing expression
  /// coerces as a return position.
  pub body_block: Option<NodeId>,
  /// Body of the module-level spec block being walked; its own statements
  /// may bind into the shared spec scope.
  pub spec_body_block: Option<NodeId>,
  /// Shared per-module scope that module-level spec blocks bind their
  /// `let`s into, making them visible to sibling blocks.
  pub spec_let_scope: Option<ScopeId>,
  /// One-shot flag set just before each top-level spec-block statement.
  pub spec_toplevel_let: bool,
  pub cancelled: bool,
}

impl InferenceCtx {
  pub fn new() -> Self {
    Self::default()
  }
}

/// Declaration ids for one module's items, in source order. Lets the
/// walker pair each syntax item back up with its declaration.
#[derive(Debug, Default, Clone)]
pub(crate) struct ItemDecls {
  pub functions: Vec<DeclId>,
  pub structs: Vec<DeclId>,
  pub enums: Vec<DeclId>,
  /// Variant declarations per enum, parallel to `enums`.
  pub variants: Vec<Vec<DeclId>>,
  pub consts: Vec<DeclId>,
  pub schemas: Vec<DeclId>,
}

/// Name resolution and type inference over one compilation unit.
///
/// The unit's first module is the one under analysis; the rest are
/// pre-imported dependency surfaces. Binding declares every module's
/// items, then the main module's bodies are walked. All findings
/// accumulate; nothing is thrown.
pub struct Analyzer<'a> {
  unit: &'a Unit,
  config: &'a MossConfig,
  symbols: Rc<RefCell<SymbolTable>>,
  cancel: CancellationToken,

  types: TypeStore,
  decls: DeclStore,
  scopes: ScopeTree,
  macros: MacroRegistry,
  ctx: InferenceCtx,

  /// Module declaration per `unit.modules` index.
  module_decls: Vec<DeclId>,
  /// Module scope per `unit.modules` index.
  module_scopes: Vec<ScopeId>,
  /// Shared spec scope per `unit.modules` index.
  module_spec_scopes: Vec<ScopeId>,
  item_decls: Vec<ItemDecls>,
  /// `(address, name)` to module declaration, for qualified paths.
  module_by_name: HashMap<(SymbolId, SymbolId), DeclId>,
  /// Items of each module by name. Several declarations may share a name;
  /// resolution keeps them all and lets consumers see the ambiguity.
  module_items: HashMap<DeclId, HashMap<SymbolId, Vec<DeclId>>>,
  /// Module index an item declaration belongs to, for method candidate
  /// collection.
  defining_module: HashMap<DeclId, usize>,

  /// Synthesized `std::option::Option` / `std::result::Result`, allocated
  /// lazily when the unit does not carry the real ones.
  option_fallback: Option<DeclId>,
  result_fallback: Option<DeclId>,
}

impl<'a> Analyzer<'a> {
  fn new(
    unit: &'a Unit,
    symbols: Rc<RefCell<SymbolTable>>,
    config: &'a MossConfig,
    macros: MacroRegistry,
    cancel: CancellationToken,
  ) -> Self {
    Analyzer {
      unit,
      config,
      symbols,
      cancel,
      types: TypeStore::new(),
      decls: DeclStore::new(),
      scopes: ScopeTree::new(),
      macros,
      ctx: InferenceCtx::new(),
      module_decls: Vec::new(),
      module_scopes: Vec::new(),
      module_spec_scopes: Vec::new(),
      item_decls: Vec::new(),
      module_by_name: HashMap::new(),
      module_items: HashMap::new(),
      defining_module: HashMap::new(),
      option_fallback: None,
      result_fallback: None,
    }
  }

  /// Analyze `unit` with the default macro registry and no cancellation.
  pub fn analyze(
    unit: &'a Unit,
    symbols: Rc<RefCell<SymbolTable>>,
    config: &'a MossConfig,
  ) -> InferenceResult {
    Self::analyze_with(unit, symbols, config, MacroRegistry::new(), CancellationToken::new())
  }

  /// Full entry point: host-extended macro registry and a cancellation
  /// token the host may flip from another thread.
  pub fn analyze_with(
    unit: &'a Unit,
    symbols: Rc<RefCell<SymbolTable>>,
    config: &'a MossConfig,
    macros: MacroRegistry,
    cancel: CancellationToken,
  ) -> InferenceResult {
    let mut analyzer = Analyzer::new(unit, symbols, config, macros, cancel);
    analyzer.run();
    analyzer.into_result()
  }

  fn run(&mut self) {
    phase_log!(self.config, "analyzing unit: {} modules", self.unit.modules.len());
    self.bind_phase();
    if self.cancel.is_cancelled() {
      self.ctx.cancelled = true;
    } else {
      self.typecheck_phase();
    }
    self.finalize_phase();
    self.dump_phase();
    phase_ok!(self.config, "inference complete: {} expressions typed", self.ctx.expr_tys.len());
  }

  /// Settle every recorded type: resolve variables, default unbound
  /// integer variables, turn unbound type variables into `Unknown`. After
  /// this the tables carry no variables.
  fn finalize_phase(&mut self) {
    phase_log!(self.config, indent = 1, "finalize: settling inference variables");
    for ty in self.ctx.expr_tys.values_mut() {
      *ty = self.ctx.vars.finalize(&mut self.types, *ty, false);
    }
    for ty in self.ctx.pat_tys.values_mut() {
      *ty = self.ctx.vars.finalize(&mut self.types, *ty, false);
    }
    for ty in self.ctx.binding_tys.values_mut() {
      *ty = self.ctx.vars.finalize(&mut self.types, *ty, false);
    }
    let mut errors = std::mem::take(&mut self.ctx.errors);
    for error in &mut errors {
      error.map_tys(|ty| self.ctx.vars.finalize(&mut self.types, ty, false));
    }
    self.ctx.errors = errors;
  }

  fn dump_phase(&self) {
    let symbols = self.symbols.borrow();
    if self.dump_requested(DumpKind::Decls) {
      eprintln!("{}", dump::dump_decls(&self.decls, &self.types, &symbols));
    }
    if self.dump_requested(DumpKind::Types) {
      eprintln!(
        "{}",
        dump::dump_inference(self.unit, &self.ctx, &self.types, &self.decls, &symbols)
      );
    }
    if self.dump_requested(DumpKind::Resolutions) {
      eprintln!("{}", dump::dump_resolutions(self.unit, &self.ctx, &self.decls, &symbols));
    }
  }

  fn dump_requested(
    &self,
    kind: DumpKind,
  ) -> bool {
    if self.config.quiet {
      return false;
    }
    self.config.dump.contains(&kind) || moss_log::debug_trace_enabled(self.config, DebugTrace::Typeck)
  }

  fn into_result(mut self) -> InferenceResult {
    let cancelled = self.ctx.cancelled || self.cancel.is_cancelled();
    let mut diagnostics: Vec<Diagnostic> = {
      let symbols = self.symbols.borrow();
      self
        .ctx
        .errors
        .iter()
        .map(|error| error.report(&self.types, &self.decls, &symbols))
        .collect()
    };
    diagnostics.sort_by(|a, b| {
      a.primary_span
        .start
        .cmp(&b.primary_span.start)
        .then_with(|| a.error_code.cmp(&b.error_code))
    });
    InferenceResult {
      types: self.types,
      decls: self.decls,
      symbols: self.symbols,
      diagnostics,
      errors: self.ctx.errors,
      expr_tys: self.ctx.expr_tys,
      pat_tys: self.ctx.pat_tys,
      binding_tys: self.ctx.binding_tys,
      resolutions: self.ctx.resolutions,
      method_targets: self.ctx.method_targets,
      field_targets: self.ctx.field_targets,
      pat_targets: self.ctx.pat_targets,
      cancelled,
    }
  }

  /// An internal invariant did not hold. With `debug` set this is loud;
  /// otherwise the analysis degrades to `Unknown` and keeps going, which
  /// is what an editor session wants.
  pub(crate) fn internal_error(
    &mut self,
    what: &str,
  ) -> TyId {
    if self.config.debug {
      panic!("analyzer invariant violated: {what}");
    }
    moss_log::phase_warn!(self.config, "analyzer invariant violated: {}", what);
    self.types.unknown()
  }
}

/// Everything the analysis produced. Spans are the unit's; the host owns
/// the source text and renders positions itself.
#[derive(Debug)]
pub struct InferenceResult {
  pub types: TypeStore,
  pub decls: DeclStore,
  pub symbols: Rc<RefCell<SymbolTable>>,
  /// Rendered findings, ordered by primary span then code.
  pub diagnostics: Vec<Diagnostic>,
  /// The raw findings behind `diagnostics`, for hosts that re-render.
  pub errors: Vec<TypeError>,
  /// Type of every expression node. Useful for hover in an editor.
  pub expr_tys: HashMap<NodeId, TyId>,
  /// Type of every pattern node.
  pub pat_tys: HashMap<PatId, TyId>,
  /// Settled type of every binding declaration.
  pub binding_tys: HashMap<DeclId, TyId>,
  /// Candidate declarations per path occurrence. Useful for
  /// go-to-definition.
  pub resolutions: HashMap<PathId, ResolvedPath>,
  /// Function chosen for each method call node.
  pub method_targets: HashMap<NodeId, DeclId>,
  /// Field chosen for each field access node.
  pub field_targets: HashMap<NodeId, FieldTarget>,
  /// Declaration introduced or matched by each binding pattern.
  pub pat_targets: HashMap<PatId, DeclId>,
  /// True when a cancellation token fired mid-walk; the tables hold
  /// whatever was settled before the stop.
  pub cancelled: bool,
}
