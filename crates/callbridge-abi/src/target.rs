//! Target calling conventions the classifier knows about

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Native ABI a shape is classified for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetAbi {
    /// ARM64 procedure call standard (Linux, Android, iOS, macOS)
    #[serde(rename = "aarch64", alias = "arm64", alias = "aapcs64")]
    Aapcs64,
    /// System V AMD64 psABI
    #[serde(rename = "x86_64-sysv", alias = "x86_64", alias = "sysv64")]
    SysV64,
    /// Microsoft x64 calling convention
    #[serde(rename = "x86_64-win64", alias = "win64")]
    Win64,
}

impl TargetAbi {
    /// ABI of the platform this crate was compiled for.
    pub fn host() -> Self {
        if cfg!(target_arch = "aarch64") {
            TargetAbi::Aapcs64
        } else if cfg!(windows) {
            TargetAbi::Win64
        } else {
            TargetAbi::SysV64
        }
    }

    /// Canonical name, as accepted by `FromStr` and manifests.
    pub fn name(self) -> &'static str {
        match self {
            TargetAbi::Aapcs64 => "aarch64",
            TargetAbi::SysV64 => "x86_64-sysv",
            TargetAbi::Win64 => "x86_64-win64",
        }
    }

    /// Pointer and stack-slot width in bytes.
    pub fn word_size(self) -> usize {
        8
    }

    /// Largest aggregate passed directly in registers.
    pub fn register_pass_threshold(self) -> usize {
        match self {
            TargetAbi::Aapcs64 | TargetAbi::SysV64 => 16,
            TargetAbi::Win64 => 8,
        }
    }

    /// Maximum members of a homogeneous float aggregate passed in FP
    /// registers, or zero when the ABI has no such rule.
    pub fn max_hfa_members(self) -> usize {
        match self {
            TargetAbi::Aapcs64 => 4,
            TargetAbi::SysV64 | TargetAbi::Win64 => 0,
        }
    }

    pub fn all() -> [TargetAbi; 3] {
        [TargetAbi::Aapcs64, TargetAbi::SysV64, TargetAbi::Win64]
    }
}

impl Default for TargetAbi {
    fn default() -> Self {
        TargetAbi::host()
    }
}

impl fmt::Display for TargetAbi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetAbi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aarch64" | "arm64" | "aapcs64" => Ok(TargetAbi::Aapcs64),
            "x86_64-sysv" | "x86_64" | "sysv64" => Ok(TargetAbi::SysV64),
            "x86_64-win64" | "win64" => Ok(TargetAbi::Win64),
            other => Err(format!(
                "unknown target `{}` (expected aarch64, x86_64-sysv or x86_64-win64)",
                other
            )),
        }
    }
}
