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


// Strata Sandbox
// Records the same frame through the interpreted and the native deferred command
// buffers, submits both and reads the result back.
//
// Usage: sandbox [config.json]
//
// {
//   "device": { "power_preference": "high_performance" },
//   "command_buffer": { "label": "frame", "stream_block_size": 4096 }
// }

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use strata_core::math::LinearRgba;
use strata_core::renderer::{
    ColorAttachment, CommandBuffer, CommandBufferSettings, DepthStencilAttachment, NativeDevice,
    RecordingMode, RenderTarget, ScissorRect, Viewport,
};
use strata_infra::{RenderTextureDescriptor, WgpuDevice, WgpuDeviceSettings};

const WIDTH: u32 = 64;
const HEIGHT: u32 = 64;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SandboxConfig {
    device: WgpuDeviceSettings,
    command_buffer: CommandBufferSettings,
}

fn load_config() -> Result<SandboxConfig> {
    let Some(path) = std::env::args().nth(1) else {
        log::info!("No config file given, using defaults.");
        return Ok(SandboxConfig::default());
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file '{path}'"))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse config file '{path}'"))
}

fn record_frame(
    commands: &mut CommandBuffer,
    color: RenderTarget,
    depth: RenderTarget,
    clear: LinearRgba,
) -> Result<()> {
    commands.push_debug_group("frame")?;
    commands.begin_render_pass(
        &[ColorAttachment::clear(color, clear)],
        Some(&DepthStencilAttachment::new(depth)),
    )?;
    commands.set_viewport(&Viewport::from_size(WIDTH as f32, HEIGHT as f32))?;
    commands.set_scissor_rect(&ScissorRect::new(0, 0, WIDTH, HEIGHT))?;
    commands.set_blend_color(LinearRgba::WHITE)?;
    commands.insert_debug_marker("opaque")?;
    commands.end_render_pass()?;
    commands.pop_debug_group()?;
    commands.end_recording()?;
    Ok(())
}

fn run_mode(
    device: &WgpuDevice,
    settings: &CommandBufferSettings,
    clear: LinearRgba,
) -> Result<[u8; 4]> {
    let color = RenderTarget::new(device.create_render_texture(
        &RenderTextureDescriptor::color(WIDTH, HEIGHT).with_label("Sandbox Color"),
    )?);
    let depth = RenderTarget::new(device.create_render_texture(
        &RenderTextureDescriptor::depth_stencil(WIDTH, HEIGHT).with_label("Sandbox Depth"),
    )?);

    let native: Arc<dyn NativeDevice> = Arc::new(device.clone());
    let mut commands = CommandBuffer::with_settings(native, settings)?;
    record_frame(&mut commands, color, depth, clear)?;

    match commands.mode() {
        RecordingMode::Interpreted => log::info!(
            "Recorded {} commands into {} bytes.",
            commands.command_count()?,
            commands.recorded_bytes()?.len()
        ),
        RecordingMode::NativeDeferred => log::info!("Recorded into a native deferred context."),
    }

    let submission = commands.commit()?;
    commands.wait_until_completed()?;
    log::info!("{submission:?} completed.");

    let pixels = device.read_texture_rgba8(&color)?;
    device.destroy_texture(color.texture)?;
    device.destroy_texture(depth.texture)?;

    pixels
        .get(..4)
        .and_then(|texel| <[u8; 4]>::try_from(texel).ok())
        .context("Readback returned no pixels")
}

fn main() -> Result<()> {
    env_logger::init();

    let config = load_config()?;
    log::debug!("Sandbox config: {config:?}");

    let device = WgpuDevice::new_headless_blocking(&config.device)?;
    let clear = LinearRgba::rgb(0.0, 0.5, 1.0);

    let interpreted = if config.command_buffer.is_interpreted() {
        config.command_buffer.clone()
    } else {
        CommandBufferSettings::default()
    };
    let deferred = CommandBufferSettings {
        stream_block_size: 0,
        ..config.command_buffer.clone()
    };

    let interpreted_pixel = run_mode(&device, &interpreted, clear)?;
    let deferred_pixel = run_mode(&device, &deferred, clear)?;

    println!("interpreted: {interpreted_pixel:?}");
    println!("deferred:    {deferred_pixel:?}");
    anyhow::ensure!(
        interpreted_pixel == deferred_pixel,
        "the two recording modes produced different pixels"
    );
    Ok(())
}
