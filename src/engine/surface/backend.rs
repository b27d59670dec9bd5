//! ### English
//! Capability seams between the render surface and the platform: GPU device, compositor and
//! visual surface.
//!
//! ### 中文
//! 渲染表面与平台之间的能力接口：GPU 设备、合成器与可视表面。

use dpi::PhysicalSize;

/// ### English
/// Device name of a framebuffer object (the backing buffer of the render surface).
///
/// ### 中文
/// framebuffer 对象的设备名（渲染表面的 backing buffer）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u32);

/// ### English
/// Device name of a color buffer (renderbuffer whose storage is the compositor's backing store).
///
/// ### 中文
/// 颜色缓冲的设备名（其存储由合成器的 backing store 提供的 renderbuffer）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorBufferId(pub u32);

/// ### English
/// Device name of the texture holding a frame's pixels.
///
/// ### 中文
/// 存放帧像素的纹理设备名。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameTexture(pub u32);

/// ### English
/// RGBA8 background color used to clear the surface before drawing a frame.
///
/// ### 中文
/// 绘制帧之前用于清屏的 RGBA8 背景色。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackgroundColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl BackgroundColor {
    pub const BLACK: Self = Self::rgba8(0, 0, 0, 255);

    pub const fn rgba8(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub const fn to_packed(self) -> u32 {
        u32::from_be_bytes([self.red, self.green, self.blue, self.alpha])
    }

    pub const fn from_packed(packed: u32) -> Self {
        let [red, green, blue, alpha] = packed.to_be_bytes();
        Self::rgba8(red, green, blue, alpha)
    }

    /// ### English
    /// Normalized `[r, g, b, a]` in `0.0..=1.0`, as expected by `glClearColor`.
    ///
    /// ### 中文
    /// 归一化到 `0.0..=1.0` 的 `[r, g, b, a]`，供 `glClearColor` 使用。
    pub fn to_f32_array(self) -> [f32; 4] {
        [self.red, self.green, self.blue, self.alpha].map(|c| c as f32 / 255.0)
    }
}

impl Default for BackgroundColor {
    fn default() -> Self {
        Self::BLACK
    }
}

/// ### English
/// GPU operations used by the render surface and the render pass.
///
/// Implementations live on the GPU execution thread only (they need not be `Send`); every call
/// happens inside the single serialized GPU context. Raw creation failures are reported as
/// strings, the way GL wrappers report them.
///
/// ### 中文
/// 渲染表面与渲染 pass 使用的 GPU 操作。
///
/// 实现只存在于 GPU 执行线程（不要求 `Send`）；所有调用都发生在唯一的串行 GPU 上下文中。
/// 原始创建失败以字符串形式上报（与 GL 封装的习惯一致）。
pub trait GpuDevice {
    fn create_framebuffer(&mut self) -> Result<FramebufferId, String>;

    fn create_color_buffer(&mut self) -> Result<ColorBufferId, String>;

    /// ### English
    /// Binds `color_buffer` so the compositor can allocate its storage from the backing store.
    ///
    /// ### 中文
    /// 绑定 `color_buffer`，以便合成器从 backing store 为其分配存储。
    fn bind_color_buffer(&mut self, color_buffer: ColorBufferId);

    fn attach_color_buffer(&mut self, framebuffer: FramebufferId, color_buffer: ColorBufferId);

    /// ### English
    /// Checks framebuffer completeness; `Err(status)` carries the device status code.
    ///
    /// ### 中文
    /// 检查 framebuffer 完整性；`Err(status)` 携带设备状态码。
    fn check_framebuffer(&mut self, framebuffer: FramebufferId) -> Result<(), u32>;

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);

    fn delete_color_buffer(&mut self, color_buffer: ColorBufferId);

    fn bind_framebuffer(&mut self, framebuffer: FramebufferId);

    fn set_viewport(&mut self, size: PhysicalSize<u32>);

    fn clear(&mut self, color: BackgroundColor);

    /// ### English
    /// Draws `texture` as a textured quad through the passthrough shader into the bound target.
    ///
    /// #### Parameters
    /// - `texture`: Frame texture to sample.
    /// - `vertices`: Clip-space positions (triangle strip, 4 × (x, y)).
    /// - `texture_coordinates`: Matching texture coordinates (4 × (u, v)).
    ///
    /// ### 中文
    /// 通过直通着色器把 `texture` 作为纹理四边形绘制到当前绑定的目标。
    ///
    /// #### 参数
    /// - `texture`：要采样的帧纹理。
    /// - `vertices`：裁剪空间坐标（triangle strip，4 × (x, y)）。
    /// - `texture_coordinates`：对应的纹理坐标（4 × (u, v)）。
    fn draw_frame(
        &mut self,
        texture: FrameTexture,
        vertices: &[f32; 8],
        texture_coordinates: &[f32; 8],
    );

    /// ### English
    /// Flushes queued commands before the backing store is handed to the compositor.
    ///
    /// ### 中文
    /// 在把 backing store 交给合成器之前刷新已排队的命令。
    fn flush(&mut self) {}
}

/// ### English
/// Completion callback registered with a compositor transaction.
///
/// ### 中文
/// 注册到合成器事务上的完成回调。
pub type TransactionCallback = Box<dyn FnOnce() + Send + 'static>;

/// ### English
/// Windowing compositor that owns the backing store of the visual surface.
///
/// `attach_backing_store` and `present_backing_store` are called on the GPU execution thread
/// with the device current. `begin_transaction` is called from the presenting thread; the
/// callback must fire exactly once, on the UI thread, after the compositor has rendered the
/// pending change.
///
/// ### 中文
/// 持有可视表面 backing store 的窗口合成器。
///
/// `attach_backing_store` 与 `present_backing_store` 在 GPU 执行线程上调用（设备处于 current 状态）。
/// `begin_transaction` 在执行呈现的线程上调用；回调必须在合成器完成渲染后、在 UI 线程上恰好触发一次。
pub trait Compositor: Send + Sync {
    /// ### English
    /// Allocates storage for the bound `color_buffer` from the backing store and returns the
    /// realized size (may differ from the requested size due to platform rounding).
    ///
    /// ### 中文
    /// 从 backing store 为已绑定的 `color_buffer` 分配存储，并返回实际尺寸
    /// （可能因平台取整而与请求尺寸不同）。
    fn attach_backing_store(&self, color_buffer: ColorBufferId) -> PhysicalSize<u32>;

    fn present_backing_store(&self, color_buffer: ColorBufferId);

    fn begin_transaction(&self, on_complete: TransactionCallback);
}

/// ### English
/// Platform visual surface (view/layer) the frames are presented into.
///
/// ### 中文
/// 帧被呈现到的平台可视表面（view/layer）。
pub trait VisualSurface: Send + Sync {
    /// ### English
    /// Current backing-store size in physical pixels.
    ///
    /// ### 中文
    /// 当前 backing store 尺寸（物理像素）。
    fn current_backing_size(&self) -> PhysicalSize<u32>;
}
