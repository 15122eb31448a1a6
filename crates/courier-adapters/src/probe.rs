//! Platform detection for native hosts and servers

use courier_core::{DeviceInfo, EnvironmentProbe, OsInfo, Platform};
use sysinfo::System;

/// Reports the local machine as `Platform::Native`
///
/// Facts are gathered once at construction; the host does not change while
/// the process runs.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    platform: Platform,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            platform: Platform::Native {
                device: DeviceInfo {
                    name: get_device_name(),
                    version: Some(get_arch_string()),
                },
                os: OsInfo {
                    name: System::name().unwrap_or_else(get_os_string),
                    version: System::os_version(),
                },
            },
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentProbe for SystemProbe {
    fn platform(&self) -> Option<Platform> {
        Some(self.platform.clone())
    }
}

/// Reports `Platform::Server` for backend services
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerProbe;

impl EnvironmentProbe for ServerProbe {
    fn platform(&self) -> Option<Platform> {
        Some(Platform::Server)
    }
}

/// Host name, or "unknown" when it cannot be read
fn get_device_name() -> String {
    hostname::get()
        .ok()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Get OS string
fn get_os_string() -> String {
    if cfg!(target_os = "linux") {
        "linux".to_string()
    } else if cfg!(target_os = "macos") {
        "macos".to_string()
    } else if cfg!(target_os = "windows") {
        "windows".to_string()
    } else {
        "unknown".to_string()
    }
}

/// Get architecture string
fn get_arch_string() -> String {
    if cfg!(target_arch = "x86_64") {
        "x64".to_string()
    } else if cfg!(target_arch = "aarch64") {
        "arm64".to_string()
    } else {
        "unknown".to_string()
    }
}
