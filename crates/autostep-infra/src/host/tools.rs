//! Argument building and output parsing for the Windows system tools.
//!
//! Pure functions, compiled on every platform so they stay under test.
#![cfg_attr(not(windows), allow(dead_code))]

use autostep_core::host::{HostError, RegistryValue, SafeBootMode};

const ROOTS: &[&str] = &[
    "HKLM",
    "HKEY_LOCAL_MACHINE",
    "HKCU",
    "HKEY_CURRENT_USER",
    "HKCR",
    "HKEY_CLASSES_ROOT",
    "HKU",
    "HKEY_USERS",
];

/// Win32 exit code for "service already running".
pub const ERROR_SERVICE_ALREADY_RUNNING: i32 = 1056;
/// Win32 exit code for "service does not exist".
pub const ERROR_SERVICE_DOES_NOT_EXIST: i32 = 1060;

/// `ROOT\sub\key\ValueName` split into the key and the value name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryPath {
    pub key: String,
    pub value_name: String,
}

pub fn split_registry_path(full: &str) -> Result<RegistryPath, HostError> {
    let parts: Vec<&str> = full.split('\\').collect();
    if parts.len() < 2 {
        return Err(HostError::InvalidInput(format!("invalid registry path: {full}")));
    }
    let root = parts[0].to_ascii_uppercase();
    if !ROOTS.contains(&root.as_str()) {
        return Err(HostError::InvalidInput(format!("unsupported root: {root}")));
    }
    if parts.len() < 3 {
        return Err(HostError::InvalidInput(format!(
            "registry path must include value name: {full}"
        )));
    }
    let (value_name, key) = parts.split_last().map_or(("", &[][..]), |(v, k)| (*v, k));
    Ok(RegistryPath {
        key: key.join("\\"),
        value_name: value_name.to_string(),
    })
}

/// Arguments for `reg.exe add` writing `value` at `path`.
pub fn reg_add_args(path: &RegistryPath, value: &RegistryValue) -> Vec<String> {
    let (kind, data) = match value {
        RegistryValue::String(s) => ("REG_SZ", s.clone()),
        RegistryValue::Dword(d) => ("REG_DWORD", d.to_string()),
    };
    let mut args = vec!["add".to_string(), path.key.clone()];
    args.extend(value_selector(&path.value_name));
    args.extend(["/t".into(), kind.into(), "/d".into(), data, "/f".into()]);
    args
}

/// `/v <name>`, or `/ve` for the key's default value.
pub fn value_selector(value_name: &str) -> Vec<String> {
    if value_name.is_empty() {
        vec!["/ve".to_string()]
    } else {
        vec!["/v".to_string(), value_name.to_string()]
    }
}

/// Extract `value_name` from `reg.exe query` output.
///
/// Value lines look like `    Mode    REG_DWORD    0x3`; the default
/// value is listed as `(Default)`.
pub fn parse_reg_query(output: &str, value_name: &str) -> Result<RegistryValue, HostError> {
    for line in output.lines() {
        let fields: Vec<&str> = line
            .trim()
            .split("    ")
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect();
        let (name, kind) = match fields.as_slice() {
            [name, kind, ..] if kind.starts_with("REG_") => (*name, *kind),
            _ => continue,
        };
        let matches = if value_name.is_empty() {
            name == "(Default)"
        } else {
            name.eq_ignore_ascii_case(value_name)
        };
        if !matches {
            continue;
        }

        let data = fields.get(2).copied().unwrap_or("");
        return match kind {
            "REG_SZ" | "REG_EXPAND_SZ" => Ok(RegistryValue::String(data.to_string())),
            "REG_DWORD" => {
                let digits = data.trim_start_matches("0x").trim_start_matches("0X");
                u32::from_str_radix(digits, 16)
                    .map(RegistryValue::Dword)
                    .map_err(|e| HostError::InvalidInput(format!("parse dword {data:?}: {e}")))
            }
            other => Err(HostError::InvalidInput(format!(
                "unsupported registry value type {other}"
            ))),
        };
    }
    Err(HostError::NotFound(format!("registry value {value_name:?}")))
}

/// Whether `sc.exe query` output reports the RUNNING state.
pub fn sc_reports_running(output: &str) -> bool {
    output
        .lines()
        .any(|l| l.contains("STATE") && l.contains("RUNNING"))
}

/// Arguments for `bcdedit.exe` setting or clearing the Safe Mode flag.
pub fn bcdedit_args(mode: SafeBootMode) -> Vec<&'static str> {
    match mode {
        SafeBootMode::Minimal => vec!["/set", "{current}", "safeboot", "minimal"],
        SafeBootMode::Network => vec!["/set", "{current}", "safeboot", "network"],
        SafeBootMode::Off => vec!["/deletevalue", "{current}", "safeboot"],
    }
}

/// SafeBoot registry keys that allow `service_name` to start in Safe Mode.
pub fn safe_boot_keys(service_name: &str) -> [String; 2] {
    [
        format!(r"HKLM\SYSTEM\CurrentControlSet\Control\SafeBoot\Minimal\{service_name}"),
        format!(r"HKLM\SYSTEM\CurrentControlSet\Control\SafeBoot\Network\{service_name}"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_registry_path() {
        let p = split_registry_path(r"HKLM\SOFTWARE\Acme\Mode").unwrap();
        assert_eq!(p.key, r"HKLM\SOFTWARE\Acme");
        assert_eq!(p.value_name, "Mode");

        let p = split_registry_path(r"hkey_local_machine\SOFTWARE\Acme\").unwrap();
        assert_eq!(p.value_name, "");

        assert_eq!(
            split_registry_path("HKLM").unwrap_err().to_string(),
            "invalid registry path: HKLM"
        );
        assert_eq!(
            split_registry_path(r"HKXX\a\b").unwrap_err().to_string(),
            "unsupported root: HKXX"
        );
        assert_eq!(
            split_registry_path(r"HKLM\SOFTWARE").unwrap_err().to_string(),
            r"registry path must include value name: HKLM\SOFTWARE"
        );
    }

    #[test]
    fn test_reg_add_args() {
        let p = split_registry_path(r"HKLM\SOFTWARE\Acme\Start").unwrap();
        assert_eq!(
            reg_add_args(&p, &RegistryValue::Dword(3)),
            vec!["add", r"HKLM\SOFTWARE\Acme", "/v", "Start", "/t", "REG_DWORD", "/d", "3", "/f"]
        );
        let p = split_registry_path(r"HKLM\SOFTWARE\Acme\").unwrap();
        assert_eq!(
            reg_add_args(&p, &RegistryValue::String("Service".into())),
            vec!["add", r"HKLM\SOFTWARE\Acme", "/ve", "/t", "REG_SZ", "/d", "Service", "/f"]
        );
    }

    #[test]
    fn test_parse_reg_query() {
        let out = "\r\nHKEY_LOCAL_MACHINE\\SOFTWARE\\Acme\r\n    Mode    REG_DWORD    0x1f\r\n    Label    REG_SZ    night shift\r\n    (Default)    REG_SZ    Service\r\n";
        assert_eq!(parse_reg_query(out, "mode").unwrap(), RegistryValue::Dword(31));
        assert_eq!(
            parse_reg_query(out, "Label").unwrap(),
            RegistryValue::String("night shift".into())
        );
        assert_eq!(
            parse_reg_query(out, "").unwrap(),
            RegistryValue::String("Service".into())
        );
        assert!(matches!(parse_reg_query(out, "Other"), Err(HostError::NotFound(_))));
    }

    #[test]
    fn test_parse_reg_query_empty_string_value() {
        let out = "HKEY_LOCAL_MACHINE\\SOFTWARE\\Acme\n    Empty    REG_SZ\n";
        assert_eq!(
            parse_reg_query(out, "Empty").unwrap(),
            RegistryValue::String(String::new())
        );
    }

    #[test]
    fn test_sc_reports_running() {
        let running = "SERVICE_NAME: acme\n        STATE              : 4  RUNNING\n";
        let stopped = "SERVICE_NAME: acme\n        STATE              : 1  STOPPED\n";
        assert!(sc_reports_running(running));
        assert!(!sc_reports_running(stopped));
    }

    #[test]
    fn test_bcdedit_and_safe_boot_keys() {
        assert_eq!(bcdedit_args(SafeBootMode::Off), vec!["/deletevalue", "{current}", "safeboot"]);
        assert_eq!(bcdedit_args(SafeBootMode::Network)[3], "network");
        let keys = safe_boot_keys("Autostep");
        assert!(keys[0].ends_with(r"SafeBoot\Minimal\Autostep"));
        assert!(keys[1].ends_with(r"SafeBoot\Network\Autostep"));
    }
}
