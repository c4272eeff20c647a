use std::process::Command;

use log::{info, warn};

use crate::error::DispatchError;

// ============================================================================
// Device dispatch
// ============================================================================

/// Delivers a tap to the device. Retries and timeouts, if any, live in
/// the implementation.
pub trait ActionDispatcher {
    fn tap(&mut self, x: i32, y: i32) -> Result<(), DispatchError>;
}

/// Taps through `adb shell input tap`.
pub struct AdbDispatcher {
    pub adb_path: String,
    pub device_id: Option<String>,
}

impl AdbDispatcher {
    pub fn new(adb_path: &str, device_id: Option<&str>) -> Self {
        Self {
            adb_path: adb_path.to_string(),
            device_id: device_id.map(str::to_string),
        }
    }

    pub fn tap_args(&self, x: i32, y: i32) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(id) = &self.device_id {
            args.push("-s".to_string());
            args.push(id.clone());
        }
        args.extend(
            ["shell", "input", "tap"]
                .iter()
                .map(|s| s.to_string())
                .chain([x.to_string(), y.to_string()]),
        );
        args
    }
}

impl Default for AdbDispatcher {
    fn default() -> Self {
        Self::new("adb", None)
    }
}

impl ActionDispatcher for AdbDispatcher {
    fn tap(&mut self, x: i32, y: i32) -> Result<(), DispatchError> {
        let output = Command::new(&self.adb_path)
            .args(self.tap_args(x, y))
            .output()
            .map_err(|source| DispatchError::Spawn {
                program: self.adb_path.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(DispatchError::Failed {
                program: self.adb_path.clone(),
                status: output.status,
                stderr,
            });
        }
        if !stderr.is_empty() {
            warn!("[adb] {}", stderr);
        }
        Ok(())
    }
}

/// Records taps instead of sending them.
#[derive(Debug, Default)]
pub struct DryRunDispatcher {
    pub taps: Vec<(i32, i32)>,
}

impl ActionDispatcher for DryRunDispatcher {
    fn tap(&mut self, x: i32, y: i32) -> Result<(), DispatchError> {
        info!("[dry-run] tap ({}, {})", x, y);
        self.taps.push((x, y));
        Ok(())
    }
}
