//! Compilation options consumed by the core.

use serde::{Deserialize, Serialize};

/// Target surface for trait declarations and minor emission differences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Javascript,
    Typescript,
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "javascript" | "js" => Ok(Dialect::Javascript),
            "typescript" | "ts" => Ok(Dialect::Typescript),
            other => Err(format!("unknown dialect '{}'", other)),
        }
    }
}

/// Shape of emitted imports and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleSystem {
    #[default]
    Esm,
    CommonJs,
}

impl std::str::FromStr for ModuleSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "esm" => Ok(ModuleSystem::Esm),
            "commonjs" | "cjs" => Ok(ModuleSystem::CommonJs),
            other => Err(format!("unknown module system '{}'", other)),
        }
    }
}

/// Verification level. Currently informative except that `trusted`
/// suppresses runtime guard emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyLevel {
    Full,
    #[default]
    Runtime,
    Trusted,
}

impl std::str::FromStr for VerifyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(VerifyLevel::Full),
            "runtime" => Ok(VerifyLevel::Runtime),
            "trusted" => Ok(VerifyLevel::Trusted),
            other => Err(format!("unknown verify level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileOptions {
    pub dialect: Dialect,
    pub modules: ModuleSystem,
    /// Whether runtime contract guards are emitted.
    pub runtime_contracts: bool,
    pub verify: VerifyLevel,
    /// Reserved.
    pub source_map: bool,
    /// Reserved.
    pub minify: bool,
    /// Early exit after any pass reports errors.
    pub stop_on_first_error: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            dialect: Dialect::default(),
            modules: ModuleSystem::default(),
            runtime_contracts: true,
            verify: VerifyLevel::default(),
            source_map: false,
            minify: false,
            stop_on_first_error: false,
        }
    }
}

impl CompileOptions {
    /// Whether the lowerer injects contract guards into the output.
    pub fn instrument(&self) -> bool {
        self.runtime_contracts && self.verify != VerifyLevel::Trusted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_interface_table() {
        let options = CompileOptions::default();
        assert_eq!(options.dialect, Dialect::Javascript);
        assert_eq!(options.modules, ModuleSystem::Esm);
        assert!(options.runtime_contracts);
        assert_eq!(options.verify, VerifyLevel::Runtime);
        assert!(!options.source_map);
        assert!(!options.minify);
        assert!(!options.stop_on_first_error);
    }

    #[test]
    fn trusted_level_suppresses_instrumentation() {
        let mut options = CompileOptions::default();
        assert!(options.instrument());
        options.verify = VerifyLevel::Trusted;
        assert!(!options.instrument());
        options.verify = VerifyLevel::Runtime;
        options.runtime_contracts = false;
        assert!(!options.instrument());
    }

    #[test]
    fn option_values_parse_from_cli_strings() {
        assert_eq!("ts".parse::<Dialect>().unwrap(), Dialect::Typescript);
        assert_eq!("cjs".parse::<ModuleSystem>().unwrap(), ModuleSystem::CommonJs);
        assert_eq!("trusted".parse::<VerifyLevel>().unwrap(), VerifyLevel::Trusted);
        assert!("fortran".parse::<Dialect>().is_err());
    }
}
