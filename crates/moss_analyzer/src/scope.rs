use std::collections::HashMap;

use moss_ty::decl::DeclId;
use moss_ty::symbol::SymbolId;
use moss_ty::{Id, Store};

pub type ScopeId = Id<Scope>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
  /// Root of the tree, owns nothing itself.
  Global,
  /// One per module: items and `use` aliases.
  Module,
  /// Function body: type parameters and value parameters.
  Function,
  Block,
  /// Lambda body: its parameters shadow the enclosing function's.
  Lambda,
  /// Specification region. Module-level spec blocks share one of these per
  /// module so sibling blocks see each other's `let` bindings.
  Spec,
  /// Type parameter scope pushed while lowering an item's signature.
  Generic,
}

/// A single lexical scope. A name can carry several declarations at once
/// (same-named items in one module); resolution surfaces all of them and
/// lets the caller decide what an ambiguous list means.
#[derive(Debug, Clone)]
pub struct Scope {
  pub parent: Option<ScopeId>,
  pub kind: ScopeKind,
  names: HashMap<SymbolId, Vec<DeclId>>,
}

impl Scope {
  fn new(
    parent: Option<ScopeId>,
    kind: ScopeKind,
  ) -> Self {
    Self {
      parent,
      kind,
      names: HashMap::new(),
    }
  }

  pub fn entries(
    &self,
    name: &SymbolId,
  ) -> &[DeclId] {
    self.names.get(name).map(Vec::as_slice).unwrap_or(&[])
  }
}

#[derive(Debug, Clone)]
pub struct ScopeTree {
  scopes: Store<Scope>,
  root: ScopeId,
  current: ScopeId,
}

impl Default for ScopeTree {
  fn default() -> Self {
    Self::new()
  }
}

impl ScopeTree {
  pub fn new() -> Self {
    let mut scopes = Store::new();
    let root = scopes.alloc(Scope::new(None, ScopeKind::Global));
    ScopeTree {
      scopes,
      root,
      current: root,
    }
  }

  pub fn root(&self) -> ScopeId {
    self.root
  }

  pub fn current(&self) -> ScopeId {
    self.current
  }

  pub fn set_current(
    &mut self,
    scope: &ScopeId,
  ) {
    self.current = *scope;
  }

  /// Enter a fresh child of the current scope.
  pub fn push(
    &mut self,
    kind: ScopeKind,
  ) -> ScopeId {
    let scope = self.scopes.alloc(Scope::new(Some(self.current), kind));
    self.current = scope;
    scope
  }

  /// Leave the current scope. Panics at the root; push and pop must pair.
  pub fn pop(&mut self) {
    let parent = self.scopes.get(&self.current).parent;
    match parent {
      Some(parent) => self.current = parent,
      None => panic!("cannot pop the global scope"),
    }
  }

  /// Add `decl` to `name` in the current scope, keeping any declarations
  /// already there. Items accumulate; an ambiguous name stays ambiguous.
  pub fn define(
    &mut self,
    name: SymbolId,
    decl: DeclId,
  ) {
    let current = self.current;
    self.define_in(&current, name, decl);
  }

  pub fn define_in(
    &mut self,
    scope: &ScopeId,
    name: SymbolId,
    decl: DeclId,
  ) {
    let entries = self.scopes.get_mut(*scope).names.entry(name).or_default();
    if !entries.contains(&decl) {
      entries.push(decl);
    }
  }

  /// Bind `name` to exactly `decl` in the current scope, replacing prior
  /// entries. `let` rebindings shadow instead of accumulating.
  pub fn shadow(
    &mut self,
    name: SymbolId,
    decl: DeclId,
  ) {
    let current = self.current;
    self.shadow_in(&current, name, decl);
  }

  pub fn shadow_in(
    &mut self,
    scope: &ScopeId,
    name: SymbolId,
    decl: DeclId,
  ) {
    self.scopes.get_mut(*scope).names.insert(name, vec![decl]);
  }

  /// Walk the parent chain from the current scope and return the entries
  /// of the innermost scope where `keep` accepts at least one declaration.
  /// Shadowing is per scope: a match stops the walk even if outer scopes
  /// also know the name.
  pub fn lookup(
    &self,
    name: &SymbolId,
    mut keep: impl FnMut(&DeclId) -> bool,
  ) -> Vec<DeclId> {
    let mut cursor = Some(self.current);
    while let Some(scope_id) = cursor {
      let scope = self.scopes.get(&scope_id);
      let found: Vec<DeclId> = scope.entries(name).iter().copied().filter(&mut keep).collect();
      if !found.is_empty() {
        return found;
      }
      cursor = scope.parent;
    }
    Vec::new()
  }

  pub fn get(
    &self,
    scope: &ScopeId,
  ) -> &Scope {
    self.scopes.get(scope)
  }
}
