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


use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use strata_core::renderer::traits::{NativeContext, NativeDeferredContext, NativeDevice};
use strata_core::renderer::{
    CommandBufferError, CommandListId, NativeError, RenderTarget, SubmissionId, TextureId,
};

use super::context::WgpuContext;
use super::conversions::IntoWgpu;
use super::settings::WgpuDeviceSettings;

#[derive(Debug)]
struct WgpuTextureEntry {
    wgpu_texture: Arc<wgpu::Texture>,
    format: wgpu::TextureFormat,
}

/// Describes a 2D texture that can be bound as a render target.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTextureDescriptor {
    /// Debug label of the texture.
    pub label: Option<String>,
    /// Width of mip 0, in pixels.
    pub width: u32,
    /// Height of mip 0, in pixels.
    pub height: u32,
    /// Pixel format. Depth formats make the texture a depth-stencil target.
    pub format: wgpu::TextureFormat,
    /// Number of mip levels.
    pub mip_level_count: u32,
    /// Number of array layers.
    pub array_layer_count: u32,
}

impl RenderTextureDescriptor {
    /// A single-mip `Rgba8Unorm` color target.
    pub fn color(width: u32, height: u32) -> Self {
        Self {
            label: None,
            width,
            height,
            format: wgpu::TextureFormat::Rgba8Unorm,
            mip_level_count: 1,
            array_layer_count: 1,
        }
    }

    /// A single-mip `Depth24PlusStencil8` depth-stencil target.
    pub fn depth_stencil(width: u32, height: u32) -> Self {
        Self {
            format: wgpu::TextureFormat::Depth24PlusStencil8,
            ..Self::color(width, height)
        }
    }

    /// Sets the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the number of mip levels.
    pub fn with_mip_level_count(mut self, mip_level_count: u32) -> Self {
        self.mip_level_count = mip_level_count;
        self
    }

    /// Sets the number of array layers.
    pub fn with_array_layer_count(mut self, array_layer_count: u32) -> Self {
        self.array_layer_count = array_layer_count;
        self
    }
}

/// The internal, non-clonable state of the WgpuDevice.
#[derive(Debug)]
struct WgpuDeviceInternal {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_info: wgpu::AdapterInfo,

    textures: Mutex<HashMap<TextureId, WgpuTextureEntry>>,
    /// Command buffers finished by deferred contexts, waiting to be executed.
    command_lists: Mutex<HashMap<CommandListId, Vec<wgpu::CommandBuffer>>>,
    /// Completion signals of submissions nobody has waited on yet.
    submissions: Mutex<HashMap<SubmissionId, flume::Receiver<()>>>,

    next_texture_id: AtomicU64,
    next_command_list_id: AtomicU64,
    next_submission_id: AtomicU64,
}

/// A clonable, thread-safe handle to a headless WGPU device.
///
/// It wraps the actual device state in an Arc, so it can be shared between the
/// command buffers and every [`WgpuContext`] it hands out.
#[derive(Clone, Debug)]
pub struct WgpuDevice {
    internal: Arc<WgpuDeviceInternal>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, NativeError> {
    mutex.lock().map_err(|_| {
        log::error!("WgpuDevice {what} mutex was poisoned.");
        NativeError::BackendError(format!("{what} mutex was poisoned"))
    })
}

impl WgpuDevice {
    /// Asynchronously creates a device without any surface.
    ///
    /// ## Arguments
    /// * `settings` - Adapter preferences and the device label.
    ///
    /// ## Returns
    /// * `anyhow::Result<Self>` - The device, or an error if no adapter or device could be obtained.
    pub async fn new_headless(settings: &WgpuDeviceSettings) -> anyhow::Result<Self> {
        log::info!("Initializing headless WGPU device...");

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::new_without_display_handle());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: settings.power_preference.into_wgpu(),
                compatible_surface: None,
                force_fallback_adapter: settings.force_fallback_adapter,
            })
            .await
            .map_err(|e| anyhow!("No suitable graphics adapter found: {}", e))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Using graphics adapter: \"{}\" (Backend: {:?})",
            adapter_info.name,
            adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(settings.label.as_str()),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                ..Default::default()
            })
            .await
            .map_err(|e| anyhow!("Failed to create logical device: {}", e))?;
        log::info!("Logical device and command queue created.");

        device.on_uncaptured_error(Arc::new(|e| {
            log::error!("WGPU Uncaptured Error: {e:?}");
        }));

        Ok(Self {
            internal: Arc::new(WgpuDeviceInternal {
                device,
                queue,
                adapter_info,
                textures: Mutex::new(HashMap::new()),
                command_lists: Mutex::new(HashMap::new()),
                submissions: Mutex::new(HashMap::new()),
                next_texture_id: AtomicU64::new(1),
                next_command_list_id: AtomicU64::new(0),
                next_submission_id: AtomicU64::new(1),
            }),
        })
    }

    /// Blocking wrapper around [`WgpuDevice::new_headless`].
    pub fn new_headless_blocking(settings: &WgpuDeviceSettings) -> anyhow::Result<Self> {
        pollster::block_on(Self::new_headless(settings))
    }

    /// Information about the adapter this device was created from.
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.internal.adapter_info
    }

    /// The underlying `wgpu::Device`.
    pub fn wgpu_device(&self) -> &wgpu::Device {
        &self.internal.device
    }

    /// Creates a texture usable as a render target and returns its handle.
    pub fn create_render_texture(
        &self,
        descriptor: &RenderTextureDescriptor,
    ) -> Result<TextureId, NativeError> {
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(NativeError::BackendError(format!(
                "render texture {:?} has a zero extent",
                descriptor.label
            )));
        }

        let wgpu_texture = self.internal.device.create_texture(&wgpu::TextureDescriptor {
            label: descriptor.label.as_deref(),
            size: wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: descriptor.array_layer_count.max(1),
            },
            mip_level_count: descriptor.mip_level_count.max(1),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: descriptor.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let id = TextureId(self.internal.next_texture_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.textures, "texture")?.insert(
            id,
            WgpuTextureEntry {
                wgpu_texture: Arc::new(wgpu_texture),
                format: descriptor.format,
            },
        );

        log::debug!(
            "WgpuDevice: Created render texture {:?} with ID {id:?} ({}x{}, {:?}).",
            descriptor.label,
            descriptor.width,
            descriptor.height,
            descriptor.format
        );
        Ok(id)
    }

    /// Destroys a texture created by [`WgpuDevice::create_render_texture`].
    pub fn destroy_texture(&self, id: TextureId) -> Result<(), NativeError> {
        let entry = lock(&self.internal.textures, "texture")?
            .remove(&id)
            .ok_or(NativeError::InvalidHandle)?;
        entry.wgpu_texture.destroy();
        log::debug!("WgpuDevice: Destroyed texture with ID: {id:?}");
        Ok(())
    }

    /// The pixel format of a texture.
    pub fn texture_format(&self, id: TextureId) -> Result<wgpu::TextureFormat, NativeError> {
        lock(&self.internal.textures, "texture")?
            .get(&id)
            .map(|entry| entry.format)
            .ok_or(NativeError::InvalidHandle)
    }

    /// Creates a single-mip, single-layer view of `target`.
    pub(crate) fn target_view(
        &self,
        target: &RenderTarget,
    ) -> Result<(wgpu::TextureView, wgpu::TextureFormat), NativeError> {
        let textures = lock(&self.internal.textures, "texture")?;
        let entry = textures.get(&target.texture).ok_or_else(|| {
            log::warn!("WgpuDevice: Unknown texture {:?}.", target.texture);
            NativeError::InvalidHandle
        })?;

        let texture = &entry.wgpu_texture;
        if target.mip_level >= texture.mip_level_count()
            || target.slice >= texture.depth_or_array_layers()
        {
            log::warn!(
                "WgpuDevice: Render target {target:?} is outside of the texture ({} mips, {} layers).",
                texture.mip_level_count(),
                texture.depth_or_array_layers()
            );
            return Err(NativeError::InvalidHandle);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: None,
            format: Some(entry.format),
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_mip_level: target.mip_level,
            mip_level_count: Some(1),
            base_array_layer: target.slice,
            array_layer_count: Some(1),
            ..Default::default()
        });
        Ok((view, entry.format))
    }

    pub(crate) fn create_command_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.internal
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    pub(crate) fn register_command_list(
        &self,
        buffers: Vec<wgpu::CommandBuffer>,
    ) -> Result<CommandListId, NativeError> {
        let id = CommandListId(
            self.internal
                .next_command_list_id
                .fetch_add(1, Ordering::Relaxed),
        );
        lock(&self.internal.command_lists, "command list")?.insert(id, buffers);
        Ok(id)
    }

    /// Removes a finished command list. Each list can be executed once.
    pub(crate) fn take_command_list(
        &self,
        id: CommandListId,
    ) -> Result<Vec<wgpu::CommandBuffer>, NativeError> {
        lock(&self.internal.command_lists, "command list")?
            .remove(&id)
            .ok_or(NativeError::UnknownCommandList(id))
    }

    /// Copies one sub-resource of a 4-byte-per-texel color texture back to the CPU.
    ///
    /// Blocks until the GPU has finished all submitted work. The returned rows are
    /// tightly packed (`width * 4` bytes each).
    pub fn read_texture_rgba8(&self, target: &RenderTarget) -> Result<Vec<u8>, NativeError> {
        let texture = {
            let textures = lock(&self.internal.textures, "texture")?;
            let entry = textures
                .get(&target.texture)
                .ok_or(NativeError::InvalidHandle)?;
            if entry.format.block_copy_size(None) != Some(4) {
                return Err(NativeError::BackendError(format!(
                    "cannot read back texture format {:?}",
                    entry.format
                )));
            }
            entry.wgpu_texture.clone()
        };
        if target.mip_level >= texture.mip_level_count()
            || target.slice >= texture.depth_or_array_layers()
        {
            return Err(NativeError::InvalidHandle);
        }

        let width = (texture.width() >> target.mip_level).max(1);
        let height = (texture.height() >> target.mip_level).max(1);
        let unpadded_bytes_per_row = width * 4;
        let padded_bytes_per_row = unpadded_bytes_per_row
            .div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging = self.internal.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Strata Readback Buffer"),
            size: padded_bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.create_command_encoder("Strata Readback Encoder");
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: target.mip_level,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: target.slice,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.internal.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = flume::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.poll_wait()?;

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(NativeError::BackendError(format!(
                    "failed to map readback buffer: {e}"
                )))
            }
            Err(_) => return Err(NativeError::DeviceLost),
        }

        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks_exact(padded_bytes_per_row as usize) {
                pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
            }
        }
        staging.unmap();
        Ok(pixels)
    }

    /// Blocks until the queue is idle and all completion callbacks have run.
    fn poll_wait(&self) -> Result<(), NativeError> {
        self.internal
            .device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|e| {
                log::warn!("Failed to poll device: {:?}", e);
                NativeError::BackendError(format!("device poll failed: {e}"))
            })
    }
}

impl NativeDevice for WgpuDevice {
    fn create_deferred_context(&self) -> Result<Box<dyn NativeDeferredContext>, NativeError> {
        Ok(Box::new(WgpuContext::new(
            self.clone(),
            "Strata Deferred Context",
        )))
    }

    fn submit(
        &self,
        record: &mut dyn FnMut(&mut dyn NativeContext) -> Result<(), CommandBufferError>,
    ) -> Result<SubmissionId, CommandBufferError> {
        let mut context = WgpuContext::new(self.clone(), "Strata Immediate Context");
        record(&mut context)?;
        let buffers = context.into_command_buffers()?;
        let buffer_count = buffers.len();

        let (tx, rx) = flume::bounded(1);
        self.internal.queue.submit(buffers);
        self.internal.queue.on_submitted_work_done(move || {
            let _ = tx.send(());
        });

        let id = SubmissionId(
            self.internal
                .next_submission_id
                .fetch_add(1, Ordering::Relaxed),
        );
        lock(&self.internal.submissions, "submission")?.insert(id, rx);
        log::debug!("WgpuDevice: Submitted {buffer_count} command buffer(s) as {id:?}.");
        Ok(id)
    }

    fn wait_for_submission(&self, submission: SubmissionId) -> Result<(), NativeError> {
        let rx = lock(&self.internal.submissions, "submission")?
            .remove(&submission)
            .ok_or(NativeError::UnknownSubmission(submission))?;

        self.poll_wait()?;
        rx.recv().map_err(|_| NativeError::DeviceLost)
    }

    fn release_submission(&self, submission: SubmissionId) {
        if let Ok(mut submissions) = lock(&self.internal.submissions, "submission") {
            if submissions.remove(&submission).is_some() {
                log::trace!("WgpuDevice: Released {submission:?} without waiting.");
            }
        }
    }
}

#[cfg(test)]
impl WgpuDevice {
    fn pending_submissions(&self) -> usize {
        self.internal.submissions.lock().map_or(0, |s| s.len())
    }
}
