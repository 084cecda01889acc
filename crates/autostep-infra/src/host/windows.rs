//! Windows host driven through the stock system tools.
//!
//! `reg.exe` for registry values and hives, `sc.exe` for services and
//! kernel drivers, `bcdedit.exe` for the Safe Mode flag and
//! `shutdown.exe` for the restart.

use std::path::Path;
use std::process::Output;

use autostep_core::host::{HostError, HostPlatform, RegistryValue, SafeBootMode};
use tokio::process::Command;

use super::tools::{
    ERROR_SERVICE_ALREADY_RUNNING, ERROR_SERVICE_DOES_NOT_EXIST, bcdedit_args, parse_reg_query,
    reg_add_args, safe_boot_keys, sc_reports_running, split_registry_path, value_selector,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsHost;

async fn spawn(program: &str, args: &[String]) -> Result<Output, HostError> {
    tracing::debug!(program, ?args, "invoking system tool");
    Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| HostError::Io(format!("spawn {program}: {e}")))
}

fn failure(program: &str, output: &Output) -> HostError {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = if stderr.trim().is_empty() {
        stdout.trim()
    } else {
        stderr.trim()
    };
    HostError::CommandFailed {
        program: program.to_string(),
        detail: format!("{} output: {text}", output.status),
    }
}

/// Run a tool and return stdout, failing on a nonzero exit.
async fn run_tool(program: &str, args: &[String]) -> Result<String, HostError> {
    let output = spawn(program, args).await?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(failure(program, &output))
    }
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

fn hive_args(verb: &str, key: &str, hive_file: &Path) -> Vec<String> {
    vec![
        verb.to_string(),
        key.to_string(),
        hive_file.display().to_string(),
    ]
}

impl HostPlatform for WindowsHost {
    async fn registry_set(&self, path: &str, value: &RegistryValue) -> Result<(), HostError> {
        let path = split_registry_path(path)?;
        run_tool("reg.exe", &reg_add_args(&path, value)).await?;
        Ok(())
    }

    async fn registry_get(&self, path: &str) -> Result<RegistryValue, HostError> {
        let path = split_registry_path(path)?;
        let mut args = vec!["query".to_string(), path.key.clone()];
        args.extend(value_selector(&path.value_name));
        let out = run_tool("reg.exe", &args).await?;
        parse_reg_query(&out, &path.value_name)
    }

    async fn registry_delete(&self, path: &str) -> Result<(), HostError> {
        let path = split_registry_path(path)?;
        let mut args = vec!["delete".to_string(), path.key.clone()];
        args.extend(value_selector(&path.value_name));
        args.push("/f".to_string());
        run_tool("reg.exe", &args).await?;
        Ok(())
    }

    async fn registry_save(&self, key: &str, hive_file: &Path) -> Result<(), HostError> {
        let mut args = hive_args("save", key, hive_file);
        args.push("/y".to_string());
        run_tool("reg.exe", &args).await?;
        Ok(())
    }

    async fn registry_restore(&self, key: &str, hive_file: &Path) -> Result<(), HostError> {
        run_tool("reg.exe", &hive_args("restore", key, hive_file)).await?;
        Ok(())
    }

    async fn registry_load(&self, key: &str, hive_file: &Path) -> Result<(), HostError> {
        run_tool("reg.exe", &hive_args("load", key, hive_file)).await?;
        Ok(())
    }

    async fn registry_unload(&self, key: &str) -> Result<(), HostError> {
        run_tool("reg.exe", &owned(&["unload", key])).await?;
        Ok(())
    }

    async fn service_start(&self, name: &str) -> Result<(), HostError> {
        run_tool("sc.exe", &owned(&["start", name])).await?;
        Ok(())
    }

    async fn service_stop(&self, name: &str) -> Result<(), HostError> {
        run_tool("sc.exe", &owned(&["stop", name])).await?;
        Ok(())
    }

    async fn service_running(&self, name: &str) -> Result<bool, HostError> {
        let out = run_tool("sc.exe", &owned(&["query", name])).await?;
        Ok(sc_reports_running(&out))
    }

    async fn driver_load(&self, name: &str, image_path: &Path) -> Result<(), HostError> {
        let query = spawn("sc.exe", &owned(&["query", name])).await?;
        if query.status.code() == Some(ERROR_SERVICE_DOES_NOT_EXIST) {
            tracing::info!(driver = name, path = %image_path.display(), "creating kernel driver service");
            let bin_path = image_path.display().to_string();
            run_tool(
                "sc.exe",
                &owned(&[
                    "create", name, "type=", "kernel", "start=", "demand", "binPath=", &bin_path,
                ]),
            )
            .await?;
        }

        let start = spawn("sc.exe", &owned(&["start", name])).await?;
        if start.status.success() || start.status.code() == Some(ERROR_SERVICE_ALREADY_RUNNING) {
            Ok(())
        } else {
            Err(failure("sc.exe", &start))
        }
    }

    async fn driver_unload(&self, name: &str) -> Result<(), HostError> {
        // Stop failures are ignored; the service is deleted regardless.
        if let Err(e) = run_tool("sc.exe", &owned(&["stop", name])).await {
            tracing::debug!(driver = name, error = %e, "driver stop failed");
        }
        run_tool("sc.exe", &owned(&["delete", name])).await?;
        Ok(())
    }

    async fn driver_loaded(&self, name: &str) -> Result<bool, HostError> {
        let out = run_tool("sc.exe", &owned(&["query", name])).await?;
        Ok(sc_reports_running(&out))
    }

    async fn request_reboot(&self) -> Result<(), HostError> {
        tracing::warn!("requesting system restart");
        run_tool("shutdown.exe", &owned(&["/r", "/t", "0", "/f"])).await?;
        Ok(())
    }

    async fn set_safe_boot(&self, mode: SafeBootMode) -> Result<(), HostError> {
        run_tool("bcdedit.exe", &owned(&bcdedit_args(mode))).await?;
        Ok(())
    }

    async fn ensure_service_safe_boot(&self, service_name: &str) -> Result<(), HostError> {
        for key in safe_boot_keys(service_name) {
            let args = owned(&["add", &key, "/ve", "/t", "REG_SZ", "/d", "Service", "/f"]);
            run_tool("reg.exe", &args).await?;
        }
        Ok(())
    }
}
