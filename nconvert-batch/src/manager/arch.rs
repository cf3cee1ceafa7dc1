//! Target architecture detection and selection.
//!
//! NConvert ships separate 64-bit and 32-bit Windows archives. The host is
//! inspected to suggest one, and an [`ArchitectureSelector`] makes the final
//! choice. The CLI plugs in an interactive prompt; tests and unattended runs
//! use [`FixedArchitecture`] or [`DetectedArchitecture`].

use std::fmt;
use std::str::FromStr;

/// Download URL of the 64-bit NConvert archive.
pub const DEFAULT_URL_X64: &str = "https://download.xnview.com/NConvert-win64.zip";

/// Download URL of the 32-bit NConvert archive.
pub const DEFAULT_URL_X32: &str = "https://download.xnview.com/NConvert-win.zip";

/// NConvert build architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    X64,
    X32,
}

impl Architecture {
    /// Identifier used in configuration and prompts.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::X32 => "x32",
        }
    }

    /// File name of the archive published for this architecture.
    pub fn archive_name(self) -> &'static str {
        match self {
            Self::X64 => "NConvert-win64.zip",
            Self::X32 => "NConvert-win.zip",
        }
    }

    /// Default download URL for this architecture.
    pub fn default_url(self) -> &'static str {
        match self {
            Self::X64 => DEFAULT_URL_X64,
            Self::X32 => DEFAULT_URL_X32,
        }
    }

    /// Detect the host architecture.
    ///
    /// On Windows the `PROCESSOR_ARCHITEW6432` variable (set for 32-bit
    /// processes on 64-bit hosts) and `PROCESSOR_ARCHITECTURE` take
    /// precedence over the architecture this binary was compiled for.
    /// Unknown identifiers fall back to x64.
    pub fn detect() -> Self {
        let from_env = ["PROCESSOR_ARCHITEW6432", "PROCESSOR_ARCHITECTURE"]
            .iter()
            .filter(|_| cfg!(windows))
            .find_map(|var| std::env::var(var).ok())
            .and_then(|id| classify_machine(&id));

        from_env
            .or_else(|| classify_machine(std::env::consts::ARCH))
            .unwrap_or(Self::X64)
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x64" | "64" => Ok(Self::X64),
            "x32" | "x86" | "32" => Ok(Self::X32),
            other => Err(format!("unknown architecture '{}', expected x64 or x32", other)),
        }
    }
}

/// Map a machine identifier reported by the OS to an architecture.
///
/// Returns `None` for identifiers that are neither known 64-bit nor known
/// 32-bit names.
pub fn classify_machine(id: &str) -> Option<Architecture> {
    match id.trim().to_ascii_lowercase().as_str() {
        "x86_64" | "amd64" | "x64" | "em64t" | "aarch64" | "arm64" => Some(Architecture::X64),
        "x86" | "i386" | "i486" | "i586" | "i686" | "arm" => Some(Architecture::X32),
        _ => None,
    }
}

/// Interpret one line of prompt input.
///
/// Empty input accepts `detected`. `1`/`x64` and `2`/`x32` pick explicitly.
/// Anything else is rejected so the prompt can ask again.
pub fn parse_choice(input: &str, detected: Architecture) -> Option<Architecture> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" => Some(detected),
        "1" | "x64" => Some(Architecture::X64),
        "2" | "x32" => Some(Architecture::X32),
        _ => None,
    }
}

/// Capability that turns a detected architecture into the one to install.
pub trait ArchitectureSelector {
    fn select(&self, detected: Architecture) -> Architecture;
}

/// Always answers with the detected architecture.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetectedArchitecture;

impl ArchitectureSelector for DetectedArchitecture {
    fn select(&self, detected: Architecture) -> Architecture {
        detected
    }
}

/// Always answers with a fixed architecture, ignoring detection.
#[derive(Debug, Clone, Copy)]
pub struct FixedArchitecture(pub Architecture);

impl ArchitectureSelector for FixedArchitecture {
    fn select(&self, _detected: Architecture) -> Architecture {
        self.0
    }
}

impl<F> ArchitectureSelector for F
where
    F: Fn(Architecture) -> Architecture,
{
    fn select(&self, detected: Architecture) -> Architecture {
        self(detected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_64_bit() {
        for id in ["x86_64", "AMD64", "x64", "aarch64", "ARM64"] {
            assert_eq!(classify_machine(id), Some(Architecture::X64), "{}", id);
        }
    }

    #[test]
    fn test_classify_known_32_bit() {
        for id in ["x86", "i386", "i686", "arm"] {
            assert_eq!(classify_machine(id), Some(Architecture::X32), "{}", id);
        }
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify_machine("riscv64"), None);
        assert_eq!(classify_machine(""), None);
    }

    #[test]
    fn test_detect_matches_compile_target() {
        let detected = Architecture::detect();
        #[cfg(all(not(windows), target_arch = "x86_64"))]
        assert_eq!(detected, Architecture::X64);
        #[cfg(all(not(windows), target_arch = "x86"))]
        assert_eq!(detected, Architecture::X32);
        let _ = detected;
    }

    #[test]
    fn test_parse_choice_default() {
        assert_eq!(parse_choice("", Architecture::X32), Some(Architecture::X32));
        assert_eq!(parse_choice("  ", Architecture::X64), Some(Architecture::X64));
    }

    #[test]
    fn test_parse_choice_explicit() {
        assert_eq!(parse_choice("1", Architecture::X32), Some(Architecture::X64));
        assert_eq!(parse_choice("X64", Architecture::X32), Some(Architecture::X64));
        assert_eq!(parse_choice("2", Architecture::X64), Some(Architecture::X32));
        assert_eq!(parse_choice("x32", Architecture::X64), Some(Architecture::X32));
    }

    #[test]
    fn test_parse_choice_rejects_other_input() {
        assert_eq!(parse_choice("3", Architecture::X64), None);
        assert_eq!(parse_choice("arm", Architecture::X64), None);
        assert_eq!(parse_choice("yes", Architecture::X64), None);
    }

    #[test]
    fn test_urls_and_archive_names() {
        assert!(Architecture::X64.default_url().ends_with("NConvert-win64.zip"));
        assert!(Architecture::X32.default_url().ends_with("NConvert-win.zip"));
        assert_eq!(Architecture::X64.archive_name(), "NConvert-win64.zip");
        assert_eq!(Architecture::X32.archive_name(), "NConvert-win.zip");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("x64".parse::<Architecture>(), Ok(Architecture::X64));
        assert_eq!(" X32 ".parse::<Architecture>(), Ok(Architecture::X32));
        assert!("sparc".parse::<Architecture>().is_err());
    }

    #[test]
    fn test_selectors() {
        assert_eq!(
            DetectedArchitecture.select(Architecture::X32),
            Architecture::X32
        );
        assert_eq!(
            FixedArchitecture(Architecture::X64).select(Architecture::X32),
            Architecture::X64
        );
        let closure = |_: Architecture| Architecture::X32;
        assert_eq!(closure.select(Architecture::X64), Architecture::X32);
    }
}
