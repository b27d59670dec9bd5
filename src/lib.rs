/// ### English
/// `xian_present` crate root.
/// Presents decoded frames into a compositor-backed visual surface: render-surface lifecycle,
/// geometry fitting, and transactional presentation. Core implementation lives under `engine`.
///
/// ### 中文
/// `xian_present` 的 crate 根。
/// 将已解码帧呈现到由合成器支撑的可视表面：渲染表面生命周期、几何适配与事务化呈现。
/// 核心实现位于 `engine` 模块。
mod engine;

pub use engine::dispatch::{FrameDispatch, UiDispatcher, UiTask, UiTaskQueue};
pub use engine::error::{PresentError, PresentResult};
pub use engine::geometry::{
    FillPolicy, IDENTITY_QUAD, Orientation, compute_vertices, texture_coordinates,
};
pub use engine::gl::GlowDevice;
pub use engine::gpu::{DeviceFactory, GpuContext, GpuExecutor};
pub use engine::present::{
    Frame, FrameLease, PresentSettings, PresentStatus, PresentationOwner, PresenterInit,
    SettingsSnapshot, SurfacePresenter, TransactionState,
};
pub use engine::surface::{
    ActiveTarget, BackgroundColor, ColorBufferId, Compositor, FrameTexture, FramebufferId,
    GpuDevice, RenderSurface, TransactionCallback, VisualSurface,
};
