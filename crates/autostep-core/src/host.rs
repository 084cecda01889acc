//! Host platform port.
//!
//! Every operating-system side effect that is not plain file or process
//! work goes through [`HostPlatform`]: the structured registry, services,
//! kernel drivers, the Safe Mode boot flag and the restart request.
//! autostep-infra implements it for Windows and provides a host that
//! rejects every call elsewhere.

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

/// Errors reported by a host platform.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("{0} is not supported on this platform")]
    Unsupported(String),

    #[error("{program} failed: {detail}")]
    CommandFailed { program: String, detail: String },

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(String),
}

/// A typed registry value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryValue {
    String(String),
    Dword(u32),
}

impl fmt::Display for RegistryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Dword(d) => write!(f, "{d}"),
        }
    }
}

/// Safe Mode boot flag setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeBootMode {
    Minimal,
    Network,
    Off,
}

impl FromStr for SafeBootMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "network" => Ok(Self::Network),
            "off" => Ok(Self::Off),
            _ => Err("safeboot requires safe_boot_mode: minimal|network|off".to_string()),
        }
    }
}

impl fmt::Display for SafeBootMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Minimal => "minimal",
            Self::Network => "network",
            Self::Off => "off",
        })
    }
}

/// OS capabilities used by the built-in action handlers.
///
/// Registry paths are `ROOT\Sub\Key\ValueName` for value operations and
/// `ROOT\Sub\Key` for key operations, where `ROOT` is one of `HKLM`,
/// `HKCU`, `HKCR`, `HKU` or their long forms.
pub trait HostPlatform: Send + Sync {
    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    fn registry_set(
        &self,
        path: &str,
        value: &RegistryValue,
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    fn registry_get(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<RegistryValue, HostError>> + Send;

    fn registry_delete(&self, path: &str) -> impl Future<Output = Result<(), HostError>> + Send;

    fn registry_save(
        &self,
        key: &str,
        hive_file: &Path,
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    fn registry_restore(
        &self,
        key: &str,
        hive_file: &Path,
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    fn registry_load(
        &self,
        key: &str,
        hive_file: &Path,
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    fn registry_unload(&self, key: &str) -> impl Future<Output = Result<(), HostError>> + Send;

    // -----------------------------------------------------------------------
    // Services and drivers
    // -----------------------------------------------------------------------

    fn service_start(&self, name: &str) -> impl Future<Output = Result<(), HostError>> + Send;

    fn service_stop(&self, name: &str) -> impl Future<Output = Result<(), HostError>> + Send;

    fn service_running(&self, name: &str)
    -> impl Future<Output = Result<bool, HostError>> + Send;

    /// Create the kernel-driver service if needed and start it.
    /// A driver that is already running is not an error.
    fn driver_load(
        &self,
        name: &str,
        image_path: &Path,
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    /// Stop the driver and delete its service entry.
    fn driver_unload(&self, name: &str) -> impl Future<Output = Result<(), HostError>> + Send;

    fn driver_loaded(&self, name: &str) -> impl Future<Output = Result<bool, HostError>> + Send;

    // -----------------------------------------------------------------------
    // Boot
    // -----------------------------------------------------------------------

    /// Ask the OS to restart. May return before the restart happens.
    fn request_reboot(&self) -> impl Future<Output = Result<(), HostError>> + Send;

    fn set_safe_boot(&self, mode: SafeBootMode)
    -> impl Future<Output = Result<(), HostError>> + Send;

    /// Allow the named service to start in both Safe Mode variants.
    fn ensure_service_safe_boot(
        &self,
        service_name: &str,
    ) -> impl Future<Output = Result<(), HostError>> + Send;
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_boot_mode_parse() {
        assert_eq!("Minimal".parse::<SafeBootMode>(), Ok(SafeBootMode::Minimal));
        assert_eq!(" network ".parse::<SafeBootMode>(), Ok(SafeBootMode::Network));
        assert_eq!("off".parse::<SafeBootMode>(), Ok(SafeBootMode::Off));
        let err = "alternate".parse::<SafeBootMode>().unwrap_err();
        assert!(err.contains("minimal|network|off"));
    }

    #[test]
    fn test_registry_value_display() {
        assert_eq!(RegistryValue::Dword(4).to_string(), "4");
        assert_eq!(RegistryValue::String("on".into()).to_string(), "on");
    }
}
