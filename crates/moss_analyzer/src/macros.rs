use std::collections::HashMap;

/// How a macro invocation types. The expander is out of scope here; the
/// walker only needs enough shape to give the call site a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroReturnRule {
  /// Arguments are inferred and discarded; the call is `()`.
  Unit,
  /// The call produces a host-defined value the walker cannot see into.
  Opaque,
  /// The call produces `vector<u8>`.
  ByteString,
  /// `Option<T>` of the single argument's type.
  OptionOf,
  /// `Result<T, E>` of the two arguments' types.
  ResultOf,
}

#[derive(Debug, Clone)]
pub struct MacroSpec {
  pub name: String,
  /// Short parameter descriptions, surfaced through signature help.
  pub params: Vec<&'static str>,
  /// Fixed arity when `Some`. Violations are not reported here; the rule
  /// still applies to whatever arguments exist.
  pub arity: Option<usize>,
  pub rule: MacroReturnRule,
}

impl MacroSpec {
  pub fn new(
    name: &str,
    params: Vec<&'static str>,
    arity: Option<usize>,
    rule: MacroReturnRule,
  ) -> Self {
    MacroSpec {
      name: name.to_string(),
      params,
      arity,
      rule,
    }
  }
}

/// Macro names visible even when standard-library completions are
/// suppressed.
const ALWAYS_VISIBLE: &[&str] = &["assert_eq", "assert_ref_eq"];

/// Three tiers of macro knowledge: host-registered external macros win
/// over the built-in platform set, which wins over the standard-library
/// helper list.
#[derive(Debug, Clone, Default)]
pub struct MacroRegistry {
  external: HashMap<String, MacroSpec>,
  builtin: HashMap<String, MacroSpec>,
  stdlib: HashMap<String, MacroSpec>,
}

impl MacroRegistry {
  pub fn new() -> Self {
    let mut registry = MacroRegistry {
      external: HashMap::new(),
      builtin: HashMap::new(),
      stdlib: HashMap::new(),
    };
    for spec in builtin_macros() {
      registry.builtin.insert(spec.name.clone(), spec);
    }
    for spec in stdlib_macros() {
      registry.stdlib.insert(spec.name.clone(), spec);
    }
    registry
  }

  /// Register a host macro. Same-named registrations replace each other
  /// and shadow the built-in and standard tiers.
  pub fn register(
    &mut self,
    spec: MacroSpec,
  ) {
    self.external.insert(spec.name.clone(), spec);
  }

  pub fn lookup(
    &self,
    name: &str,
  ) -> Option<&MacroSpec> {
    self
      .external
      .get(name)
      .or_else(|| self.builtin.get(name))
      .or_else(|| self.stdlib.get(name))
  }

  /// Names for completion, built-ins first, then external extras, then the
  /// standard helpers when asked for. External specs that shadow a
  /// built-in are not listed twice.
  pub fn completion_names(
    &self,
    include_stdlib: bool,
  ) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    let mut builtin: Vec<&str> = self.builtin.keys().map(String::as_str).collect();
    builtin.sort_unstable();
    for name in builtin {
      names.push(name);
      seen.push(name);
    }
    let mut external: Vec<&str> = self.external.keys().map(String::as_str).collect();
    external.sort_unstable();
    for name in external {
      if !seen.contains(&name) {
        names.push(name);
        seen.push(name);
      }
    }
    let mut stdlib: Vec<&str> = self.stdlib.keys().map(String::as_str).collect();
    stdlib.sort_unstable();
    for name in stdlib {
      let always = ALWAYS_VISIBLE.contains(&name);
      if (include_stdlib || always) && !seen.contains(&name) {
        names.push(name);
        seen.push(name);
      }
    }
    names
  }
}

fn builtin_macros() -> Vec<MacroSpec> {
  use MacroReturnRule::*;
  vec![
    MacroSpec::new("assert", vec!["condition", "abort_code"], Some(2), Unit),
    MacroSpec::new("debug", vec!["values"], None, Unit),
    MacroSpec::new("option", vec!["value"], Some(1), OptionOf),
    MacroSpec::new("result", vec!["ok_value", "err_value"], Some(2), ResultOf),
    MacroSpec::new("bcs", vec!["value"], Some(1), ByteString),
    MacroSpec::new("object", vec!["fields"], None, Opaque),
    MacroSpec::new("transfer", vec!["object", "recipient"], Some(2), Unit),
    MacroSpec::new("event", vec!["payload"], None, Unit),
    MacroSpec::new("table", vec!["entries"], None, Opaque),
    MacroSpec::new("system", vec!["request"], None, Unit),
    MacroSpec::new("vote", vec!["ballot"], None, Unit),
  ]
}

fn stdlib_macros() -> Vec<MacroSpec> {
  use MacroReturnRule::*;
  let unit = [
    "do",
    "do_ref",
    "do_mut",
    "destroy",
    "zip_do",
    "range_do",
    "range_do_eq",
    "assert_eq",
    "assert_ref_eq",
  ];
  let opaque = [
    "map",
    "map_ref",
    "filter",
    "fold",
    "any",
    "all",
    "count",
    "tabulate",
    "zip_map",
    "sum",
    "min",
    "max",
    "max_value",
    "min_value",
    "bits",
    "pow",
    "sqrt",
    "diff",
    "divide_and_round_up",
    "try_as_u8",
    "try_as_u16",
    "try_as_u32",
    "try_as_u64",
    "try_as_u128",
    "to_string",
  ];
  let mut specs = Vec::new();
  for name in unit {
    specs.push(MacroSpec::new(name, vec!["args"], None, Unit));
  }
  for name in opaque {
    specs.push(MacroSpec::new(name, vec!["args"], None, Opaque));
  }
  specs
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn external_shadows_builtin() {
    let mut registry = MacroRegistry::new();
    assert_eq!(registry.lookup("assert").map(|s| s.rule), Some(MacroReturnRule::Unit));
    registry.register(MacroSpec::new("assert", vec!["anything"], None, MacroReturnRule::Opaque));
    assert_eq!(registry.lookup("assert").map(|s| s.rule), Some(MacroReturnRule::Opaque));
  }

  #[test]
  fn tiers_fall_through() {
    let registry = MacroRegistry::new();
    assert!(registry.lookup("bcs").is_some());
    assert!(registry.lookup("fold").is_some());
    assert!(registry.lookup("no_such_macro").is_none());
  }

  #[test]
  fn completion_respects_stdlib_toggle() {
    let registry = MacroRegistry::new();
    let without = registry.completion_names(false);
    assert!(without.contains(&"assert"));
    assert!(without.contains(&"assert_eq"));
    assert!(!without.contains(&"fold"));
    let with = registry.completion_names(true);
    assert!(with.contains(&"fold"));
  }

  #[test]
  fn completion_lists_builtins_before_external() {
    let mut registry = MacroRegistry::new();
    registry.register(MacroSpec::new("custom", vec![], None, MacroReturnRule::Opaque));
    let names = registry.completion_names(false);
    let builtin_pos = names.iter().position(|n| *n == "assert").unwrap();
    let external_pos = names.iter().position(|n| *n == "custom").unwrap();
    assert!(builtin_pos < external_pos);
  }
}
