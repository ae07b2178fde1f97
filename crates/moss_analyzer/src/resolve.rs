use moss_config::DebugTrace;
use moss_log::trace_dbg;
use moss_syntax::item::UseDecl;
use moss_syntax::path::PathId;
use moss_ty::decl::{DeclId, DeclKind, Visibility};
use moss_ty::symbol::SymbolId;
use moss_ty::ty::{Ty, TyId};

use crate::Analyzer;

/// Namespaces a name can resolve in. The request names the namespace; a
/// declaration answers for every namespace its shape belongs to, so a
/// local never hides a same-named function from a call position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ns {
  Function,
  /// Structs, enums, type parameters and variants in type position.
  Type,
  /// Enums only, for the `Enum::Variant` qualification step.
  Enum,
  Schema,
  /// Value names: constants and locals, plus variants in value position.
  Name,
  Module,
}

fn matches_ns(
  kind: &DeclKind,
  ns: Ns,
) -> bool {
  match ns {
    Ns::Function => matches!(kind, DeclKind::Function(_)),
    Ns::Type => matches!(
      kind,
      DeclKind::Struct(_) | DeclKind::Enum(_) | DeclKind::TypeParam(_) | DeclKind::Variant(_)
    ),
    Ns::Enum => matches!(kind, DeclKind::Enum(_)),
    Ns::Schema => matches!(kind, DeclKind::Schema(_)),
    Ns::Name => matches!(kind, DeclKind::Const(_) | DeclKind::Local(_) | DeclKind::Variant(_)),
    Ns::Module => matches!(kind, DeclKind::Module(_)),
  }
}

/// One possible target of a path. `visible` is judged from the main
/// module's point of view; unreachable candidates are still recorded so
/// go-to-definition can land somewhere useful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
  pub decl: DeclId,
  pub visible: bool,
}

/// Ordered candidate list for one path occurrence. Empty means unresolved;
/// more than one visible candidate means ambiguous. Consumers read an
/// ambiguous or empty resolution as `Unknown` without reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPath {
  pub candidates: Vec<Candidate>,
}

impl ResolvedPath {
  pub fn single(decl: DeclId) -> Self {
    ResolvedPath {
      candidates: vec![Candidate { decl, visible: true }],
    }
  }

  /// The target, when exactly one visible candidate exists.
  pub fn single_visible(&self) -> Option<DeclId> {
    let mut visible = self.candidates.iter().filter(|candidate| candidate.visible);
    match (visible.next(), visible.next()) {
      (Some(candidate), None) => Some(candidate.decl),
      _ => None,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.candidates.is_empty()
  }
}

impl<'a> Analyzer<'a> {
  pub(crate) fn resolve_path_ns(
    &mut self,
    path_id: &PathId,
    ns: Ns,
  ) -> ResolvedPath {
    self.resolve_path_multi(path_id, &[ns])
  }

  /// Resolve a path, trying each namespace in order and keeping the first
  /// one that produces candidates. Results are memoized per occurrence, so
  /// repeated walks of the same node cannot disagree with themselves.
  pub(crate) fn resolve_path_multi(
    &mut self,
    path_id: &PathId,
    namespaces: &[Ns],
  ) -> ResolvedPath {
    if let Some(existing) = self.ctx.resolutions.get(path_id) {
      return existing.clone();
    }
    let mut resolved = ResolvedPath::default();
    for ns in namespaces {
      resolved = self.resolve_uncached(path_id, *ns);
      if !resolved.is_empty() {
        break;
      }
    }
    trace_dbg!(
      self.config,
      DebugTrace::Resolve,
      "{} -> {} candidate(s)",
      self.path_text(path_id),
      resolved.candidates.len()
    );
    self.ctx.resolutions.insert(*path_id, resolved.clone());
    resolved
  }

  fn resolve_uncached(
    &mut self,
    path_id: &PathId,
    ns: Ns,
  ) -> ResolvedPath {
    let path = self.unit.path(path_id);
    match path.segments.as_slice() {
      [] => ResolvedPath::default(),
      [single] => self.resolve_single(*single, ns),
      [first, second] => self.resolve_two(*first, *second, ns),
      [address, module, item] => self.resolve_module_item(*address, *module, *item, ns),
      [address, module, enum_name, variant] => self.resolve_far_variant(*address, *module, *enum_name, *variant, ns),
      _ => ResolvedPath::default(),
    }
  }

  /// Unqualified name: the scope chain first, innermost match wins; then
  /// the pre-imported modules in unit order as a last resort.
  fn resolve_single(
    &mut self,
    name: SymbolId,
    ns: Ns,
  ) -> ResolvedPath {
    let found = self.scopes.lookup(&name, |decl| matches_ns(&self.decls.get(decl).kind, ns));
    if !found.is_empty() {
      return ResolvedPath {
        candidates: found.into_iter().map(|decl| Candidate { decl, visible: true }).collect(),
      };
    }
    let mut candidates = Vec::new();
    for module_decl in self.module_decls.iter().skip(1) {
      let Some(items) = self.module_items.get(module_decl) else {
        continue;
      };
      let Some(ids) = items.get(&name) else {
        continue;
      };
      for id in ids {
        if matches_ns(&self.decls.get(id).kind, ns) {
          candidates.push(Candidate {
            decl: *id,
            visible: self.decl_visible(*id),
          });
        }
      }
    }
    ResolvedPath { candidates }
  }

  /// `first::second`: either a module (alias) member or an enum variant.
  fn resolve_two(
    &mut self,
    first: SymbolId,
    second: SymbolId,
    ns: Ns,
  ) -> ResolvedPath {
    let mut candidates = Vec::new();
    let modules = self
      .scopes
      .lookup(&first, |decl| matches_ns(&self.decls.get(decl).kind, Ns::Module));
    for module_decl in modules {
      self.member_candidates(module_decl, second, ns, &mut candidates);
    }
    let enums = self
      .scopes
      .lookup(&first, |decl| matches_ns(&self.decls.get(decl).kind, Ns::Enum));
    for enum_decl in enums {
      if let Some(variant) = self.variant_named(enum_decl, second) {
        if matches_ns(&self.decls.get(&variant).kind, ns) {
          push_unique(&mut candidates, Candidate { decl: variant, visible: true });
        }
      }
    }
    ResolvedPath { candidates }
  }

  fn resolve_module_item(
    &mut self,
    address: SymbolId,
    module: SymbolId,
    item: SymbolId,
    ns: Ns,
  ) -> ResolvedPath {
    let mut candidates = Vec::new();
    if let Some(module_decl) = self.module_by_name.get(&(address, module)).copied() {
      self.member_candidates(module_decl, item, ns, &mut candidates);
    }
    ResolvedPath { candidates }
  }

  fn resolve_far_variant(
    &mut self,
    address: SymbolId,
    module: SymbolId,
    enum_name: SymbolId,
    variant_name: SymbolId,
    ns: Ns,
  ) -> ResolvedPath {
    let mut candidates = Vec::new();
    let Some(module_decl) = self.module_by_name.get(&(address, module)).copied() else {
      return ResolvedPath::default();
    };
    let enums: Vec<DeclId> = self
      .module_items
      .get(&module_decl)
      .and_then(|items| items.get(&enum_name))
      .map(|ids| {
        ids
          .iter()
          .copied()
          .filter(|id| matches_ns(&self.decls.get(id).kind, Ns::Enum))
          .collect()
      })
      .unwrap_or_default();
    for enum_decl in enums {
      if let Some(variant) = self.variant_named(enum_decl, variant_name) {
        if matches_ns(&self.decls.get(&variant).kind, ns) {
          push_unique(
            &mut candidates,
            Candidate {
              decl: variant,
              visible: self.decl_visible(enum_decl),
            },
          );
        }
      }
    }
    ResolvedPath { candidates }
  }

  fn member_candidates(
    &mut self,
    module_decl: DeclId,
    name: SymbolId,
    ns: Ns,
    candidates: &mut Vec<Candidate>,
  ) {
    let Some(ids) = self.module_items.get(&module_decl).and_then(|items| items.get(&name)) else {
      return;
    };
    for id in ids.clone() {
      if matches_ns(&self.decls.get(&id).kind, ns) {
        let visible = self.decl_visible(id);
        push_unique(candidates, Candidate { decl: id, visible });
      }
    }
  }

  fn variant_named(
    &self,
    enum_decl: DeclId,
    name: SymbolId,
  ) -> Option<DeclId> {
    match &self.decls.get(&enum_decl).kind {
      DeclKind::Enum(def) => def.variants.iter().copied().find(|variant| self.decls.name_of(variant) == name),
      _ => None,
    }
  }

  /// Whether `decl` is reachable from the main module. `Package` and
  /// `Friend` open up to same-address modules when the corresponding
  /// feature gate is on, and stay module-private otherwise.
  pub(crate) fn decl_visible(
    &self,
    decl: DeclId,
  ) -> bool {
    let Some(main_module) = self.module_decls.first().copied() else {
      return true;
    };
    let owner_module = self.owner_module(decl);
    match self.decls.get(&decl).visibility {
      Visibility::Public => true,
      Visibility::Private => owner_module == Some(main_module),
      Visibility::Package | Visibility::Friend => {
        if owner_module == Some(main_module) {
          return true;
        }
        if !self.config.features.public_package_visibility {
          return false;
        }
        let Some(main_address) = self.decls.as_module(&main_module).map(|def| def.address) else {
          return false;
        };
        match owner_module {
          Some(owner) => self.decls.as_module(&owner).map(|def| def.address) == Some(main_address),
          None => false,
        }
      },
    }
  }

  fn owner_module(
    &self,
    decl: DeclId,
  ) -> Option<DeclId> {
    let mut cursor = Some(decl);
    while let Some(id) = cursor {
      if matches!(self.decls.get(&id).kind, DeclKind::Module(_)) {
        return Some(id);
      }
      cursor = self.decls.get(&id).owner;
    }
    None
  }

  /// Functions a receiver-style call `receiver.method(..)` may target, in
  /// lookup order: `use fun` aliases in the caller's scope, then public
  /// `use fun`s of the receiver type's defining module, then that module's
  /// own non-test functions. Compatibility with the receiver is the
  /// caller's job; this only collects by name.
  pub(crate) fn method_candidates(
    &mut self,
    receiver_ty: TyId,
    method: SymbolId,
  ) -> Vec<DeclId> {
    let mut candidates: Vec<DeclId> = Vec::new();

    if let Some(main) = self.unit.main_module() {
      for use_decl in &main.uses {
        if let UseDecl::Fun { function, method: alias, .. } = use_decl {
          if *alias == method {
            if let Some(decl) = self.resolve_path_ns(function, Ns::Function).single_visible() {
              if !candidates.contains(&decl) {
                candidates.push(decl);
              }
            }
          }
        }
      }
    }

    let stripped = {
      let resolved = self.ctx.vars.shallow_resolve(&mut self.types, receiver_ty);
      self.types.strip_references(resolved)
    };
    let Ty::Adt { decl: adt_decl, .. } = self.types.get(&stripped) else {
      return candidates;
    };
    let Some(module_index) = self.defining_module.get(adt_decl).copied() else {
      return candidates;
    };

    if module_index != 0 {
      let module_scope = self.module_scopes[module_index];
      for use_decl in &self.unit.modules[module_index].uses {
        let UseDecl::Fun {
          function,
          method: alias,
          is_public: true,
          ..
        } = use_decl
        else {
          continue;
        };
        if *alias != method {
          continue;
        }
        // The alias's function path is written in its own module.
        let saved = self.scopes.current();
        self.scopes.set_current(&module_scope);
        let target = self.resolve_path_ns(function, Ns::Function).single_visible();
        self.scopes.set_current(&saved);
        if let Some(decl) = target {
          if !candidates.contains(&decl) {
            candidates.push(decl);
          }
        }
      }
    }

    let module_decl = self.module_decls[module_index];
    let inherent: Vec<DeclId> = self
      .module_items
      .get(&module_decl)
      .and_then(|items| items.get(&method))
      .cloned()
      .unwrap_or_default();
    for id in inherent {
      let DeclKind::Function(def) = &self.decls.get(&id).kind else {
        continue;
      };
      if def.is_test || !self.decl_visible(id) {
        continue;
      }
      if !candidates.contains(&id) {
        candidates.push(id);
      }
    }
    candidates
  }

  pub(crate) fn path_text(
    &self,
    path_id: &PathId,
  ) -> String {
    let path = self.unit.path(path_id);
    let symbols = self.symbols.borrow();
    path
      .segments
      .iter()
      .map(|segment| symbols.get(segment).to_string())
      .collect::<Vec<_>>()
      .join("::")
  }
}

fn push_unique(
  candidates: &mut Vec<Candidate>,
  candidate: Candidate,
) {
  if !candidates.iter().any(|existing| existing.decl == candidate.decl) {
    candidates.push(candidate);
  }
}
