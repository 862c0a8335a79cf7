//! Host platform detection for release asset selection

use std::fmt;

/// Operating system family as used in release asset names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    /// Linux and any unrecognised OS
    Linux,
    /// macOS
    Macos,
    /// Windows
    Windows,
}

impl OsFamily {
    /// Map a `std::env::consts::OS` value
    pub fn from_consts(os: &str) -> Self {
        match os {
            "windows" => Self::Windows,
            "macos" => Self::Macos,
            _ => Self::Linux,
        }
    }

    /// Name used in asset suffixes
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Windows => "windows",
        }
    }
}

/// CPU architecture as used in release asset names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    /// x86-64 and any unrecognised architecture
    X64,
    /// 64-bit ARM
    Arm64,
    /// 32-bit ARM
    Arm,
}

impl Arch {
    /// Map a `std::env::consts::ARCH` value
    pub fn from_consts(arch: &str) -> Self {
        match arch {
            "aarch64" => Self::Arm64,
            "arm" => Self::Arm,
            _ => Self::X64,
        }
    }

    /// Name used in asset suffixes
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
            Self::Arm => "arm",
        }
    }
}

/// OS and architecture pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Operating system family
    pub os: OsFamily,
    /// CPU architecture
    pub arch: Arch,
}

impl Platform {
    /// Platform of the running binary
    pub fn detect() -> Self {
        Self {
            os: OsFamily::from_consts(std::env::consts::OS),
            arch: Arch::from_consts(std::env::consts::ARCH),
        }
    }

    /// Substitute this platform into a suffix template written for
    /// `linux`/`x64`, e.g. `cli-linux-x64.zip` becomes `cli-macos-arm64.zip`.
    pub fn resolve_suffix(&self, template: &str) -> String {
        template
            .replace("linux", self.os.as_str())
            .replace("x64", self.arch.as_str())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_consts() {
        assert_eq!(OsFamily::from_consts("linux"), OsFamily::Linux);
        assert_eq!(OsFamily::from_consts("macos"), OsFamily::Macos);
        assert_eq!(OsFamily::from_consts("windows"), OsFamily::Windows);
        assert_eq!(OsFamily::from_consts("freebsd"), OsFamily::Linux);

        assert_eq!(Arch::from_consts("x86_64"), Arch::X64);
        assert_eq!(Arch::from_consts("aarch64"), Arch::Arm64);
        assert_eq!(Arch::from_consts("arm"), Arch::Arm);
        assert_eq!(Arch::from_consts("riscv64"), Arch::X64);
    }

    #[test]
    fn test_resolve_suffix() {
        let platform = Platform {
            os: OsFamily::Macos,
            arch: Arch::Arm64,
        };
        assert_eq!(
            platform.resolve_suffix("DepotDownloader-linux-x64.zip"),
            "DepotDownloader-macos-arm64.zip"
        );
        assert_eq!(platform.resolve_suffix("cli-linux-x64.zip"), "cli-macos-arm64.zip");
        assert_eq!(platform.to_string(), "macos-arm64");
    }

    #[test]
    fn test_resolve_suffix_identity_on_linux_x64() {
        let platform = Platform {
            os: OsFamily::Linux,
            arch: Arch::X64,
        };
        assert_eq!(platform.resolve_suffix("cli-linux-x64.zip"), "cli-linux-x64.zip");
    }
}
