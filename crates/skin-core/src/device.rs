//! Compute device selection for the external trainer.
//!
//! The trainer runs out of process, so this only decides which device string
//! to pass it, preferring an accelerator over the CPU.

use serde::{Deserialize, Serialize};

/// Device requested for training and inference
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Pick the best available device at run time
    #[default]
    Auto,
    /// NVIDIA GPU (CUDA device 0)
    Cuda,
    /// Apple Metal Performance Shaders
    Mps,
    /// CPU
    Cpu,
}

impl Device {
    /// Resolves [`Device::Auto`] to a concrete device; others are returned unchanged.
    pub fn resolve(self) -> Device {
        match self {
            Device::Auto => select_best_device(),
            other => other,
        }
    }

    /// Value for the trainer's `device=` argument
    pub fn as_arg(&self) -> &'static str {
        match self {
            Device::Cuda => "0",
            Device::Mps => "mps",
            Device::Cpu => "cpu",
            Device::Auto => "",
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Auto => write!(f, "auto"),
            Device::Cuda => write!(f, "cuda"),
            Device::Mps => write!(f, "mps"),
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

impl std::str::FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Device::Auto),
            "cuda" | "gpu" => Ok(Device::Cuda),
            "mps" => Ok(Device::Mps),
            "cpu" => Ok(Device::Cpu),
            other => Err(format!("unknown device '{}', expected auto, cuda, mps or cpu", other)),
        }
    }
}

/// Select the best available device: CUDA, then MPS, then CPU
pub fn select_best_device() -> Device {
    if has_nvidia_gpu() {
        tracing::info!("NVIDIA GPU detected - training on cuda");
        return Device::Cuda;
    }
    if has_apple_mps() {
        tracing::info!("Apple silicon detected - training on mps");
        return Device::Mps;
    }
    tracing::info!("No accelerator detected - training on cpu");
    Device::Cpu
}

/// Check for NVIDIA GPU (CUDA)
fn has_nvidia_gpu() -> bool {
    #[cfg(target_os = "linux")]
    {
        std::path::Path::new("/proc/driver/nvidia/version").exists()
            || std::path::Path::new("/dev/nvidia0").exists()
            || nvidia_smi_succeeds("nvidia-smi")
    }

    #[cfg(target_os = "windows")]
    {
        nvidia_smi_succeeds("nvidia-smi.exe")
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        false
    }
}

#[cfg(any(target_os = "linux", target_os = "windows"))]
fn nvidia_smi_succeeds(program: &str) -> bool {
    std::process::Command::new(program)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Apple silicon Macs expose MPS
fn has_apple_mps() -> bool {
    cfg!(all(target_os = "macos", target_arch = "aarch64"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_concrete_devices_unchanged() {
        assert_eq!(Device::Cpu.resolve(), Device::Cpu);
        assert_eq!(Device::Mps.resolve(), Device::Mps);
        assert_eq!(Device::Cuda.resolve(), Device::Cuda);
    }

    #[test]
    fn test_resolve_auto_is_concrete() {
        let device = Device::Auto.resolve();
        assert!(matches!(device, Device::Cuda | Device::Mps | Device::Cpu));
    }

    #[test]
    fn test_device_args() {
        assert_eq!(Device::Cuda.as_arg(), "0");
        assert_eq!(Device::Mps.as_arg(), "mps");
        assert_eq!(Device::Cpu.as_arg(), "cpu");
    }

    #[test]
    fn test_device_from_str() {
        assert_eq!("CUDA".parse::<Device>(), Ok(Device::Cuda));
        assert_eq!("cpu".parse::<Device>(), Ok(Device::Cpu));
        assert!("tpu".parse::<Device>().is_err());
    }
}
