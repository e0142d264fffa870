//! Host description.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use remote_agent_core::{CapabilityError, DeviceSpecs, capability::DeviceInfo};
use sysinfo::System;

/// Device info read from the running system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDeviceInfo;

#[async_trait]
impl DeviceInfo for SystemDeviceInfo {
    async fn device_specs(&self) -> Result<DeviceSpecs, CapabilityError> {
        tokio::task::spawn_blocking(collect_specs)
            .await
            .map_err(|e| CapabilityError::Failed(e.to_string()))
    }
}

fn collect_specs() -> DeviceSpecs {
    DeviceSpecs {
        client_id: String::new(),
        hostname: System::host_name().unwrap_or_default(),
        username: current_username(),
        user_id: current_user_id(),
        os_name: std::env::consts::OS.to_string(),
        os_version: System::long_os_version()
            .or_else(System::os_version)
            .unwrap_or_default(),
        os_arch: std::env::consts::ARCH.to_string(),
        kernel_version: System::kernel_version().unwrap_or_default(),
        fetched_unix: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|d| i64::try_from(d.as_secs()).ok())
            .unwrap_or_default(),
    }
}

fn current_username() -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .into_iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .unwrap_or_default()
}

#[cfg(unix)]
fn current_user_id() -> String {
    use std::os::unix::fs::MetadataExt;

    dirs::home_dir()
        .and_then(|home| std::fs::metadata(home).ok())
        .map(|m| m.uid().to_string())
        .unwrap_or_default()
}

#[cfg(not(unix))]
fn current_user_id() -> String {
    String::new()
}
