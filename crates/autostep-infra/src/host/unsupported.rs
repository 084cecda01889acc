use std::path::Path;

use autostep_core::host::{HostError, HostPlatform, RegistryValue, SafeBootMode};

/// Host for platforms without a registry, service manager or boot
/// configuration. Every operation fails with [`HostError::Unsupported`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedHost;

fn unsupported<T>(op: &str) -> Result<T, HostError> {
    Err(HostError::Unsupported(op.to_string()))
}

impl HostPlatform for UnsupportedHost {
    async fn registry_set(&self, _path: &str, _value: &RegistryValue) -> Result<(), HostError> {
        unsupported("registry_set")
    }

    async fn registry_get(&self, _path: &str) -> Result<RegistryValue, HostError> {
        unsupported("registry_get")
    }

    async fn registry_delete(&self, _path: &str) -> Result<(), HostError> {
        unsupported("registry_delete")
    }

    async fn registry_save(&self, _key: &str, _hive_file: &Path) -> Result<(), HostError> {
        unsupported("registry_save")
    }

    async fn registry_restore(&self, _key: &str, _hive_file: &Path) -> Result<(), HostError> {
        unsupported("registry_restore")
    }

    async fn registry_load(&self, _key: &str, _hive_file: &Path) -> Result<(), HostError> {
        unsupported("registry_load")
    }

    async fn registry_unload(&self, _key: &str) -> Result<(), HostError> {
        unsupported("registry_unload")
    }

    async fn service_start(&self, _name: &str) -> Result<(), HostError> {
        unsupported("service_start")
    }

    async fn service_stop(&self, _name: &str) -> Result<(), HostError> {
        unsupported("service_stop")
    }

    async fn service_running(&self, _name: &str) -> Result<bool, HostError> {
        unsupported("service_running")
    }

    async fn driver_load(&self, _name: &str, _image_path: &Path) -> Result<(), HostError> {
        unsupported("driver_load")
    }

    async fn driver_unload(&self, _name: &str) -> Result<(), HostError> {
        unsupported("driver_unload")
    }

    async fn driver_loaded(&self, _name: &str) -> Result<bool, HostError> {
        unsupported("driver_loaded")
    }

    async fn request_reboot(&self) -> Result<(), HostError> {
        unsupported("reboot")
    }

    async fn set_safe_boot(&self, _mode: SafeBootMode) -> Result<(), HostError> {
        unsupported("safeboot")
    }

    async fn ensure_service_safe_boot(&self, _service_name: &str) -> Result<(), HostError> {
        unsupported("safe boot service registration")
    }
}
