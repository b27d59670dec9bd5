//! ### English
//! State owned by the GPU execution thread: the device and the render surface.
//!
//! ### 中文
//! GPU 执行线程持有的状态：设备与渲染表面。

use dpi::PhysicalSize;

use crate::engine::error::{PresentError, PresentResult};
use crate::engine::surface::{ActiveTarget, Compositor, GpuDevice, RenderSurface};

/// ### English
/// Everything that may only be touched inside the GPU execution context.
///
/// ### 中文
/// 只能在 GPU 执行上下文内部访问的全部状态。
pub struct GpuContext {
    /// ### English
    /// Device current on the GPU thread.
    ///
    /// ### 中文
    /// 在 GPU 线程上处于 current 状态的设备。
    device: Box<dyn GpuDevice>,
    /// ### English
    /// Render surface (buffer pair) for the presenter that owns this context.
    ///
    /// ### 中文
    /// 持有该上下文的 presenter 所用的渲染表面（缓冲对）。
    surface: RenderSurface,
    /// ### English
    /// Surface generation; advanced on every geometry change.
    ///
    /// ### 中文
    /// 表面代数；每次几何变化时递增。
    generation: u64,
    /// ### English
    /// Fatal creation failure remembered for the current generation (no automatic retry).
    ///
    /// ### 中文
    /// 当前代记住的致命创建失败（不自动重试）。
    failure: Option<PresentError>,
}

impl GpuContext {
    pub(super) fn new(device: Box<dyn GpuDevice>) -> Self {
        Self {
            device,
            surface: RenderSurface::new(),
            generation: 0,
            failure: None,
        }
    }

    pub fn device(&mut self) -> &mut dyn GpuDevice {
        self.device.as_mut()
    }

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// ### English
    /// Creates the surface if needed and binds it as the render target.
    ///
    /// A fatal failure (`IncompleteAttachment` / `Allocation`) is remembered and returned again,
    /// without touching the device, until [`Self::invalidate_surface`] starts a new generation.
    ///
    /// #### Parameters
    /// - `compositor`: Compositor providing the backing store.
    /// - `target_size`: Current backing size of the visual surface.
    ///
    /// ### 中文
    /// 按需创建表面并将其绑定为渲染目标。
    ///
    /// 致命失败（`IncompleteAttachment` / `Allocation`）会被记住，并在
    /// [`Self::invalidate_surface`] 开启新一代之前直接返回，不再访问设备。
    ///
    /// #### 参数
    /// - `compositor`：提供 backing store 的合成器。
    /// - `target_size`：可视表面当前的 backing 尺寸。
    pub fn activate_surface(
        &mut self,
        compositor: &dyn Compositor,
        target_size: PhysicalSize<u32>,
    ) -> PresentResult<ActiveTarget> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }

        if let Err(err) = self
            .surface
            .ensure_created(self.device.as_mut(), compositor, target_size)
        {
            if err.is_fatal_for_surface() {
                self.failure = Some(err.clone());
            }
            return Err(err);
        }

        Ok(self.surface.activate(self.device.as_mut()))
    }

    /// ### English
    /// Destroys the surface and starts a new generation (clears any remembered failure).
    ///
    /// ### 中文
    /// 销毁表面并开启新一代（清除已记住的失败）。
    pub fn invalidate_surface(&mut self) {
        self.surface.destroy(self.device.as_mut());
        self.generation = self.generation.wrapping_add(1);
        self.failure = None;
    }

    pub(super) fn teardown(&mut self) {
        self.surface.destroy(self.device.as_mut());
    }
}
