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

//! Configuration for command buffer construction.

use serde::{Deserialize, Serialize};

/// The stream block size used when no explicit value is configured (64 KiB).
pub const DEFAULT_STREAM_BLOCK_SIZE: u64 = 64 * 1024;

/// Settings that decide how a [`CommandBuffer`](crate::renderer::CommandBuffer) records work.
///
/// A non-zero `stream_block_size` selects the interpreted mode and preallocates that
/// many bytes for the command stream. Zero disables the interpreter and records
/// straight into a native deferred context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandBufferSettings {
    /// An optional debug label carried by the command buffer.
    pub label: Option<String>,
    /// Initial stream capacity in bytes, or zero for native deferred recording.
    pub stream_block_size: u64,
}

impl Default for CommandBufferSettings {
    fn default() -> Self {
        Self {
            label: None,
            stream_block_size: DEFAULT_STREAM_BLOCK_SIZE,
        }
    }
}

impl CommandBufferSettings {
    /// Interpreted recording with an explicit stream block size.
    pub fn interpreted(stream_block_size: u64) -> Self {
        Self {
            label: None,
            stream_block_size,
        }
    }

    /// Native deferred recording; the interpreter is disabled.
    pub fn native_deferred() -> Self {
        Self {
            label: None,
            stream_block_size: 0,
        }
    }

    /// Returns a copy of these settings with a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Whether these settings select the interpreted (byte stream) mode.
    #[inline]
    pub fn is_interpreted(&self) -> bool {
        self.stream_block_size != 0
    }

    /// Parses settings from a JSON document. Missing fields take their default values.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes these settings to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_interpreted() {
        let settings = CommandBufferSettings::default();
        assert!(settings.is_interpreted());
        assert_eq!(settings.stream_block_size, DEFAULT_STREAM_BLOCK_SIZE);
        assert!(!CommandBufferSettings::native_deferred().is_interpreted());
    }

    #[test]
    fn test_parse_partial_json() {
        let settings = CommandBufferSettings::from_json_str(r#"{ "label": "shadows" }"#).unwrap();
        assert_eq!(settings.label.as_deref(), Some("shadows"));
        assert_eq!(settings.stream_block_size, DEFAULT_STREAM_BLOCK_SIZE);

        let settings = CommandBufferSettings::from_json_str(r#"{ "stream_block_size": 0 }"#).unwrap();
        assert!(!settings.is_interpreted());
        assert!(settings.label.is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let settings = CommandBufferSettings::interpreted(4096).with_label("main");
        let json = settings.to_json_string().unwrap();
        assert_eq!(CommandBufferSettings::from_json_str(&json).unwrap(), settings);
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(CommandBufferSettings::from_json_str("{ \"stream_block_size\": -1 }").is_err());
        assert!(CommandBufferSettings::from_json_str("not json").is_err());
    }
}
