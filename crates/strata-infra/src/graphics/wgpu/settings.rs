// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! Configuration for [`WgpuDevice`](super::WgpuDevice) bootstrap.

use serde::{Deserialize, Serialize};

/// Which kind of adapter to prefer when several are available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerPreference {
    /// Let the backend decide.
    #[default]
    Default,
    /// Prefer an integrated or otherwise power-efficient adapter.
    LowPower,
    /// Prefer a discrete, high-performance adapter.
    HighPerformance,
}

/// Settings for creating a headless [`WgpuDevice`](super::WgpuDevice).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WgpuDeviceSettings {
    /// Debug label given to the logical device.
    pub label: String,
    /// Adapter power preference.
    pub power_preference: PowerPreference,
    /// Only accept a software (fallback) adapter.
    pub force_fallback_adapter: bool,
}

impl Default for WgpuDeviceSettings {
    fn default() -> Self {
        Self {
            label: "Strata Logical Device".to_owned(),
            power_preference: PowerPreference::Default,
            force_fallback_adapter: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default_from_empty_document() {
        let settings: WgpuDeviceSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, WgpuDeviceSettings::default());
    }

    #[test]
    fn test_power_preference_uses_snake_case() {
        let settings: WgpuDeviceSettings =
            serde_json::from_str(r#"{ "power_preference": "high_performance" }"#).unwrap();
        assert_eq!(settings.power_preference, PowerPreference::HighPerformance);
        assert!(serde_json::from_str::<WgpuDeviceSettings>(
            r#"{ "power_preference": "HighPerformance" }"#
        )
        .is_err());
    }
}
