use std::mem::ManuallyDrop;
use std::ops::Deref;

use dpi::PhysicalSize;

use crate::engine::surface::FrameTexture;

/// ### English
/// A decoded frame handed to the presenter.
///
/// The presenter owns the frame from `present` on and calls [`Frame::release`] exactly once,
/// whether the frame is drawn, dropped or abandoned on shutdown.
///
/// ### 中文
/// 交给 presenter 的已解码帧。
///
/// 从 `present` 起 presenter 持有该帧，并且无论帧被绘制、丢弃还是在关闭时被放弃，
/// 都会恰好调用一次 [`Frame::release`]。
pub trait Frame: Send + 'static {
    fn size(&self) -> PhysicalSize<u32>;

    /// ### English
    /// Texture holding the pixels, valid in the GPU execution context until release.
    ///
    /// ### 中文
    /// 存放像素的纹理，在 release 之前于 GPU 执行上下文中有效。
    fn texture(&self) -> FrameTexture;

    fn release(self);
}

/// ### English
/// Owning wrapper that releases the frame when dropped.
///
/// ### 中文
/// 持有帧的包装，在 drop 时释放帧。
pub struct FrameLease<F: Frame> {
    frame: ManuallyDrop<F>,
}

impl<F: Frame> FrameLease<F> {
    pub fn new(frame: F) -> Self {
        Self {
            frame: ManuallyDrop::new(frame),
        }
    }
}

impl<F: Frame> Deref for FrameLease<F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.frame
    }
}

impl<F: Frame> Drop for FrameLease<F> {
    fn drop(&mut self) {
        // SAFETY: `frame` is taken exactly once, here, and never touched again.
        let frame = unsafe { ManuallyDrop::take(&mut self.frame) };
        frame.release();
    }
}
