// SPDX-License-Identifier: GPL-3.0-only

//! Simulated devices and device profiles

use crate::backends::camera::{DeviceInfo, FacingMode, TrackCapabilities};
use serde::{Deserialize, Serialize};

/// Description of one simulated camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualDeviceSpec {
    pub device_id: String,
    pub label: String,
    pub group_id: Option<String>,
    /// Facing reported by the stream once opened (`None` = not reported)
    pub reported_facing: Option<FacingMode>,
    pub torch: bool,
    pub single_shot: bool,
}

impl VirtualDeviceSpec {
    /// A device with a random id and no capabilities
    pub fn new(label: &str) -> Self {
        Self {
            device_id: uuid::Uuid::new_v4().to_string(),
            label: label.to_string(),
            group_id: None,
            reported_facing: None,
            torch: false,
            single_shot: false,
        }
    }

    pub fn with_id(mut self, device_id: &str) -> Self {
        self.device_id = device_id.to_string();
        self
    }

    pub fn reporting(mut self, facing: FacingMode) -> Self {
        self.reported_facing = Some(facing);
        self
    }

    pub fn with_torch(mut self) -> Self {
        self.torch = true;
        self
    }

    pub fn with_single_shot(mut self) -> Self {
        self.single_shot = true;
        self
    }

    /// What enumeration reports for this device
    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            device_id: self.device_id.clone(),
            label: self.label.clone(),
            group_id: self.group_id.clone(),
        }
    }

    /// What an opened track reports for this device
    pub fn capabilities(&self) -> TrackCapabilities {
        let mut focus_modes = vec!["continuous".to_string()];
        if self.single_shot {
            focus_modes.push("single-shot".to_string());
        }

        TrackCapabilities {
            facing_modes: self
                .reported_facing
                .iter()
                .map(|facing| facing.platform_value().to_string())
                .collect(),
            focus_modes,
            torch: self.torch,
            max_width: Some(3840),
            max_height: Some(2160),
        }
    }
}

/// Device sets mimicking real hardware, in their enumeration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceProfile {
    /// iPhone 15 (Safari)
    Iphone15,
    /// Samsung Galaxy S21 FE (Chrome)
    #[serde(rename = "samsung-s21fe")]
    SamsungS21Fe,
    /// Laptop with one integrated webcam
    Desktop,
}

impl DeviceProfile {
    pub const ALL: [DeviceProfile; 3] = [
        DeviceProfile::Iphone15,
        DeviceProfile::SamsungS21Fe,
        DeviceProfile::Desktop,
    ];

    pub fn devices(&self) -> Vec<VirtualDeviceSpec> {
        match self {
            DeviceProfile::Iphone15 => vec![
                VirtualDeviceSpec::new("Front Camera")
                    .with_id("iphone15-front")
                    .reporting(FacingMode::Front),
                VirtualDeviceSpec::new("Back Camera")
                    .with_id("iphone15-back")
                    .reporting(FacingMode::Back)
                    .with_torch()
                    .with_single_shot(),
                VirtualDeviceSpec::new("Back Ultra Wide Camera")
                    .with_id("iphone15-back-ultra-wide")
                    .reporting(FacingMode::Back)
                    .with_torch(),
                VirtualDeviceSpec::new("Back Dual Wide Camera")
                    .with_id("iphone15-back-dual-wide")
                    .reporting(FacingMode::Back)
                    .with_torch()
                    .with_single_shot(),
            ],
            DeviceProfile::SamsungS21Fe => vec![
                VirtualDeviceSpec::new("camera2 1, facing front")
                    .with_id("s21fe-1")
                    .reporting(FacingMode::Front),
                VirtualDeviceSpec::new("camera2 3, facing front")
                    .with_id("s21fe-3")
                    .reporting(FacingMode::Front),
                VirtualDeviceSpec::new("camera2 2, facing back")
                    .with_id("s21fe-2")
                    .reporting(FacingMode::Back),
                VirtualDeviceSpec::new("camera2 0, facing back")
                    .with_id("s21fe-0")
                    .reporting(FacingMode::Back)
                    .with_torch()
                    .with_single_shot(),
            ],
            DeviceProfile::Desktop => vec![
                VirtualDeviceSpec::new("Integrated Webcam (0bda:5510)").with_id("desktop-0"),
            ],
        }
    }
}

impl std::fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceProfile::Iphone15 => write!(f, "iphone15"),
            DeviceProfile::SamsungS21Fe => write!(f, "samsung-s21fe"),
            DeviceProfile::Desktop => write!(f, "desktop"),
        }
    }
}

impl std::str::FromStr for DeviceProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "iphone15" | "iphone-15" => Ok(DeviceProfile::Iphone15),
            "samsung-s21fe" | "s21fe" => Ok(DeviceProfile::SamsungS21Fe),
            "desktop" => Ok(DeviceProfile::Desktop),
            other => Err(format!("unknown device profile: {other}")),
        }
    }
}
