//! ### English
//! Render surface: the framebuffer + color buffer pair bound to the visual surface's backing
//! store. Pure resource lifecycle; lives inside the GPU execution context.
//!
//! ### 中文
//! 渲染表面：绑定到可视表面 backing store 的 framebuffer + 颜色缓冲对。
//! 只负责资源生命周期；存在于 GPU 执行上下文内部。

mod backend;

use dpi::PhysicalSize;

use crate::engine::error::{PresentError, PresentResult};

pub use backend::{
    BackgroundColor, ColorBufferId, Compositor, FrameTexture, FramebufferId, GpuDevice,
    TransactionCallback, VisualSurface,
};

/// ### English
/// Render target bound by [`RenderSurface::activate`].
///
/// ### 中文
/// 由 [`RenderSurface::activate`] 绑定的渲染目标。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveTarget {
    pub size: PhysicalSize<u32>,
    pub color_buffer: ColorBufferId,
}

/// ### English
/// The buffer pair. Both handles exist together or not at all.
///
/// ### 中文
/// 缓冲对。两个句柄要么同时存在，要么同时不存在。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SurfaceBuffers {
    /// ### English
    /// Backing framebuffer used as the render target.
    ///
    /// ### 中文
    /// 作为渲染目标的 backing framebuffer。
    framebuffer: FramebufferId,
    /// ### English
    /// Color buffer whose storage is the compositor's backing store.
    ///
    /// ### 中文
    /// 颜色缓冲，其存储即合成器的 backing store。
    color_buffer: ColorBufferId,
    /// ### English
    /// Realized backing size (always non-zero).
    ///
    /// ### 中文
    /// 实际 backing 尺寸（始终非 0）。
    size: PhysicalSize<u32>,
}

/// ### English
/// GPU-side buffer pair backing the visible output region.
///
/// Must only be touched from inside the GPU execution context.
///
/// ### 中文
/// 支撑可见输出区域的 GPU 侧缓冲对。
///
/// 只能在 GPU 执行上下文内部访问。
#[derive(Debug, Default)]
pub struct RenderSurface {
    buffers: Option<SurfaceBuffers>,
}

impl RenderSurface {
    pub fn new() -> Self {
        Self { buffers: None }
    }

    pub fn is_created(&self) -> bool {
        self.buffers.is_some()
    }

    pub fn size(&self) -> Option<PhysicalSize<u32>> {
        self.buffers.map(|buffers| buffers.size)
    }

    pub fn color_buffer(&self) -> Option<ColorBufferId> {
        self.buffers.map(|buffers| buffers.color_buffer)
    }

    pub fn framebuffer(&self) -> Option<FramebufferId> {
        self.buffers.map(|buffers| buffers.framebuffer)
    }

    /// ### English
    /// Creates the buffer pair if absent and returns the realized backing size.
    ///
    /// Nothing is allocated when `target_size` has a zero dimension. Any partial allocation is
    /// deleted before an error is returned, so a failed attempt leaks nothing.
    ///
    /// #### Parameters
    /// - `device`: GPU device of the current execution context.
    /// - `compositor`: Compositor that provides the backing store.
    /// - `target_size`: Requested size (the visual surface's current backing size).
    ///
    /// #### Errors
    /// - `ZeroSize`: surface not laid out yet; retry on a later frame.
    /// - `Allocation`: the device could not create a buffer.
    /// - `IncompleteAttachment`: unsupported configuration for this geometry.
    ///
    /// ### 中文
    /// 若缓冲对不存在则创建，并返回实际 backing 尺寸。
    ///
    /// 当 `target_size` 存在 0 维度时不会分配任何资源。返回错误前会删除所有已部分分配的资源，
    /// 因此失败的尝试不会泄漏。
    ///
    /// #### 参数
    /// - `device`：当前执行上下文的 GPU 设备。
    /// - `compositor`：提供 backing store 的合成器。
    /// - `target_size`：请求尺寸（可视表面当前的 backing 尺寸）。
    ///
    /// #### 错误
    /// - `ZeroSize`：表面尚未布局；应在后续帧重试。
    /// - `Allocation`：设备无法创建缓冲。
    /// - `IncompleteAttachment`：当前几何尺寸下配置不受支持。
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(target_width = target_size.width, target_height = target_size.height)
    )]
    pub fn ensure_created(
        &mut self,
        device: &mut dyn GpuDevice,
        compositor: &dyn Compositor,
        target_size: PhysicalSize<u32>,
    ) -> PresentResult<PhysicalSize<u32>> {
        if let Some(buffers) = self.buffers {
            return Ok(buffers.size);
        }

        if target_size.width == 0 || target_size.height == 0 {
            tracing::warn!("visual surface is not laid out yet; skipping surface creation");
            return Err(PresentError::ZeroSize {
                width: target_size.width,
                height: target_size.height,
            });
        }

        let framebuffer = device.create_framebuffer().map_err(|reason| {
            tracing::error!(%reason, "failed to create framebuffer");
            PresentError::allocation("framebuffer", reason)
        })?;

        let color_buffer = match device.create_color_buffer() {
            Ok(color_buffer) => color_buffer,
            Err(reason) => {
                device.delete_framebuffer(framebuffer);
                tracing::error!(%reason, "failed to create color buffer");
                return Err(PresentError::allocation("color buffer", reason));
            }
        };

        device.bind_color_buffer(color_buffer);
        let realized = compositor.attach_backing_store(color_buffer);
        if realized.width == 0 || realized.height == 0 {
            release_pair(device, framebuffer, color_buffer);
            tracing::warn!(
                realized_width = realized.width,
                realized_height = realized.height,
                "backing store realized with zero size"
            );
            return Err(PresentError::ZeroSize {
                width: realized.width,
                height: realized.height,
            });
        }

        device.attach_color_buffer(framebuffer, color_buffer);
        if let Err(status) = device.check_framebuffer(framebuffer) {
            release_pair(device, framebuffer, color_buffer);
            tracing::error!(status, "render surface attachment incomplete");
            return Err(PresentError::IncompleteAttachment { status });
        }

        self.buffers = Some(SurfaceBuffers {
            framebuffer,
            color_buffer,
            size: realized,
        });
        tracing::debug!(
            realized_width = realized.width,
            realized_height = realized.height,
            framebuffer = framebuffer.0,
            color_buffer = color_buffer.0,
            "render surface created"
        );
        Ok(realized)
    }

    /// ### English
    /// Releases both handles if present (idempotent). Returns whether anything was released.
    ///
    /// ### 中文
    /// 若存在则释放两个句柄（幂等）。返回是否实际释放了资源。
    pub fn destroy(&mut self, device: &mut dyn GpuDevice) -> bool {
        let Some(buffers) = self.buffers.take() else {
            return false;
        };

        release_pair(device, buffers.framebuffer, buffers.color_buffer);
        tracing::debug!(
            framebuffer = buffers.framebuffer.0,
            color_buffer = buffers.color_buffer.0,
            "render surface destroyed"
        );
        true
    }

    /// ### English
    /// Binds the pair as the current render target and sets the viewport to the backing size.
    ///
    /// # Panics
    /// Panics if the surface has not been created; callers must run `ensure_created` first.
    ///
    /// ### 中文
    /// 将缓冲对绑定为当前渲染目标，并把 viewport 设为 backing 尺寸。
    ///
    /// # Panics
    /// 若表面尚未创建则 panic；调用方必须先执行 `ensure_created`。
    pub fn activate(&self, device: &mut dyn GpuDevice) -> ActiveTarget {
        let Some(buffers) = self.buffers else {
            panic!("RenderSurface::activate called before ensure_created");
        };

        device.bind_framebuffer(buffers.framebuffer);
        device.set_viewport(buffers.size);
        ActiveTarget {
            size: buffers.size,
            color_buffer: buffers.color_buffer,
        }
    }
}

fn release_pair(
    device: &mut dyn GpuDevice,
    framebuffer: FramebufferId,
    color_buffer: ColorBufferId,
) {
    device.delete_color_buffer(color_buffer);
    device.delete_framebuffer(framebuffer);
}
