use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DumpKind {
  Decls,
  Types,
  Resolutions,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugTrace {
  Resolve,
  Typeck,
  Macros,
}

/// Controls the verbosity level of log output.
///
/// - `Quiet`: No output except errors
/// - `Detailed`: Structured progress output (default)
/// - `Verbose`: Detailed output with internal phases
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum OutputLevel {
  Quiet,
  #[default]
  Detailed,
  Verbose,
}

fn default_true() -> bool {
  true
}

/// Language-surface toggles. Defaults follow the 2024 edition; legacy
/// sources turn most of these off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureFlags {
  /// `v[i]` sugar on vectors and index-capable types.
  #[serde(default = "default_true")]
  pub index_syntax: bool,
  /// `value.method(...)` receiver-style calls.
  #[serde(default = "default_true")]
  pub receiver_style_methods: bool,
  /// `public(package)` visibility resolves across same-address modules.
  #[serde(default = "default_true")]
  pub public_package_visibility: bool,
  /// Explicit type arguments on macro invocations.
  #[serde(default)]
  pub generic_macros: bool,
}

impl Default for FeatureFlags {
  fn default() -> Self {
    Self {
      index_syntax: true,
      receiver_style_methods: true,
      public_package_visibility: true,
      generic_macros: false,
    }
  }
}

impl FeatureFlags {
  pub fn for_edition(edition: &str) -> Self {
    match edition {
      "legacy" => Self {
        index_syntax: false,
        receiver_style_methods: false,
        public_package_visibility: false,
        generic_macros: false,
      },
      _ => Self::default(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PackageInfo {
  pub name: Option<String>,
  pub edition: Option<String>,
}

/// The slice of a package manifest the analyzer cares about.
///
/// Expected format in Move.toml:
/// ```toml
/// [package]
/// name = "example"
/// edition = "2024"
///
/// [addresses]
/// std = "0x1"
///
/// [features]
/// index_syntax = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PackageManifest {
  #[serde(default)]
  pub package: PackageInfo,
  /// Named address -> numeric address text.
  #[serde(default)]
  pub addresses: HashMap<String, String>,
  #[serde(default)]
  pub features: Option<FeatureFlags>,
}

impl PackageManifest {
  pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(text)
  }

  pub fn named_address(
    &self,
    name: &str,
  ) -> Option<&str> {
    self.addresses.get(name).map(|s| s.as_str())
  }

  /// Explicit `[features]` win; otherwise the edition decides.
  pub fn effective_features(&self) -> FeatureFlags {
    if let Some(features) = &self.features {
      return features.clone();
    }
    match &self.package.edition {
      Some(edition) => FeatureFlags::for_edition(edition),
      None => FeatureFlags::default(),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct MossConfig {
  pub debug: bool,
  pub debug_trace: Vec<DebugTrace>,
  pub quiet: bool,
  pub verbose: u8,
  pub output_level: OutputLevel,
  pub dump: Vec<DumpKind>,
  pub features: FeatureFlags,
  pub manifest: PackageManifest,
}

impl MossConfig {
  pub fn new_basic(
    debug: bool,
    debug_trace: Vec<DebugTrace>,
    quiet: bool,
    verbose: u8,
  ) -> Self {
    let output_level = if quiet {
      OutputLevel::Quiet
    } else if verbose > 0 {
      OutputLevel::Verbose
    } else {
      OutputLevel::Detailed
    };

    Self {
      debug,
      debug_trace,
      quiet,
      verbose,
      output_level,
      ..Self::default()
    }
  }

  pub fn with_manifest(manifest: PackageManifest) -> Self {
    let features = manifest.effective_features();
    Self {
      features,
      manifest,
      ..Self::default()
    }
  }
}
