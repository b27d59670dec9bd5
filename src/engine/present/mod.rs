//! ### English
//! Presentation synchronizer: runs one frame through the render surface, the render pass and
//! the compositor, and drives the transactional-presentation handshake.
//!
//! ### 中文
//! 呈现同步器：让一帧依次经过渲染表面、渲染 pass 与合成器，并驱动事务化呈现握手。

mod frame;
mod settings;
mod transaction;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dpi::PhysicalSize;

use crate::engine::dispatch::{FrameDispatch, UiDispatcher};
use crate::engine::error::{PresentError, PresentResult};
use crate::engine::geometry::{FillPolicy, Orientation, compute_vertices, texture_coordinates};
use crate::engine::gpu::{DeviceFactory, GpuContext, GpuExecutor};
use crate::engine::surface::{BackgroundColor, Compositor, FrameTexture, VisualSurface};

pub use frame::{Frame, FrameLease};
pub use settings::{PresentSettings, SettingsSnapshot};
pub use transaction::TransactionState;

const GPU_THREAD_NAME: &str = "xian-present-gpu";

/// ### English
/// Owner of the presented surface (usually the view that embeds it).
///
/// Hooks run on the thread that presents the frame: the UI thread when
/// [`Self::should_run_completion_on_ui_thread`] returns `true`, the producer thread otherwise.
/// While the owner is alive, `on_did_display` is called for every frame that got
/// `on_will_display`, including frames whose GPU pass failed or never ran because the GPU
/// execution context had shut down.
///
/// ### 中文
/// 被呈现表面的所有者（通常是嵌入它的 view）。
///
/// 钩子在呈现该帧的线程上执行：当 [`Self::should_run_completion_on_ui_thread`] 返回 `true`
/// 时为 UI 线程，否则为生产者线程。所有者存活期间，每个收到 `on_will_display` 的帧都会收到
/// `on_did_display`，包括 GPU pass 失败或因 GPU 执行上下文已关闭而未执行的帧。
pub trait PresentationOwner<F: Frame>: Send + Sync {
    fn on_will_display(&self, frame: &F);

    fn on_did_display(&self, frame: &F);

    /// ### English
    /// Queried once per incoming frame.
    ///
    /// The answer must stay the same for the lifetime of a surface. Frames keep arrival order
    /// only within one lane; after a switch, an inline frame can overtake frames still queued
    /// on the UI thread.
    ///
    /// ### 中文
    /// 每个到来的帧查询一次。
    ///
    /// 在一个表面的生命周期内返回值必须保持不变。帧只在同一通道内保持到达顺序；
    /// 切换通道后，内联帧可能越过仍排在 UI 线程上的帧。
    fn should_run_completion_on_ui_thread(&self) -> bool;

    /// ### English
    /// Receives errors of frames presented on the UI lane, including
    /// [`PresentError::ContextClosed`] for frames the GPU thread never ran (the inline lane
    /// returns them).
    ///
    /// ### 中文
    /// 接收 UI 通道上呈现帧的错误，包括 GPU 线程未执行的帧对应的
    /// [`PresentError::ContextClosed`]（内联通道直接返回错误）。
    fn on_present_error(&self, error: &PresentError) {
        let _ = error;
    }
}

/// ### English
/// Outcome of [`SurfacePresenter::present`].
///
/// ### 中文
/// [`SurfacePresenter::present`] 的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    /// ### English
    /// Drawn and handed to the compositor.
    ///
    /// ### 中文
    /// 已绘制并交给合成器。
    Presented,
    /// ### English
    /// Released without drawing (transaction pending or owner gone).
    ///
    /// ### 中文
    /// 未绘制即释放（事务挂起或所有者已销毁）。
    Dropped,
    /// ### English
    /// Handed to the UI thread; errors go to [`PresentationOwner::on_present_error`].
    ///
    /// ### 中文
    /// 已交给 UI 线程；错误通过 [`PresentationOwner::on_present_error`] 上报。
    Scheduled,
}

/// ### English
/// Construction inputs for [`SurfacePresenter`].
///
/// ### 中文
/// [`SurfacePresenter`] 的构造参数。
pub struct PresenterInit<F: Frame> {
    /// ### English
    /// Back-reference to the owner (never keeps it alive).
    ///
    /// ### 中文
    /// 指向所有者的弱引用（不会延长其生命周期）。
    pub owner: Weak<dyn PresentationOwner<F>>,
    pub compositor: Arc<dyn Compositor>,
    pub visual_surface: Arc<dyn VisualSurface>,
    pub ui_dispatcher: Arc<dyn UiDispatcher>,
    /// ### English
    /// Initial presentation settings.
    ///
    /// ### 中文
    /// 初始呈现设置。
    pub settings: SettingsSnapshot,
    /// ### English
    /// Builds the GPU device on the GPU thread.
    ///
    /// ### 中文
    /// 在 GPU 线程上构建 GPU 设备。
    pub device_factory: DeviceFactory,
}

/// ### English
/// What the render pass reads from a frame. Copied out so the lease can stay on the presenting
/// thread.
///
/// ### 中文
/// 渲染 pass 从帧中读取的内容。复制出来以便租约留在呈现线程上。
#[derive(Debug, Clone, Copy)]
struct FrameView {
    size: PhysicalSize<u32>,
    texture: FrameTexture,
}

impl FrameView {
    fn of<F: Frame>(frame: &F) -> Self {
        Self {
            size: frame.size(),
            texture: frame.texture(),
        }
    }
}

/// ### English
/// Per-frame values fixed before entering the GPU context.
///
/// ### 中文
/// 进入 GPU 上下文之前确定的每帧参数。
#[derive(Debug, Clone, Copy)]
struct FramePass {
    background: BackgroundColor,
    fill_policy: FillPolicy,
    orientation: Orientation,
}

struct PresenterShared<F: Frame> {
    owner: Weak<dyn PresentationOwner<F>>,
    compositor: Arc<dyn Compositor>,
    visual_surface: Arc<dyn VisualSurface>,
    ui: Arc<dyn UiDispatcher>,
    settings: PresentSettings,
    transaction: Arc<TransactionState>,
    /// ### English
    /// Last known bounds, packed as `(width << 32) | height`.
    ///
    /// ### 中文
    /// 最近一次已知的边界尺寸，打包为 `(width << 32) | height`。
    bounds: AtomicU64,
    gpu: GpuExecutor,
}

/// ### English
/// Presents frames into one visual surface.
///
/// Owns the GPU execution thread and, through it, the render surface. Dropping the presenter
/// shuts the thread down and destroys the surface on it. Frames still queued on the UI thread
/// only hold a weak reference and are released when they run or when the queue is dropped.
///
/// ### 中文
/// 将帧呈现到一个可视表面。
///
/// 持有 GPU 执行线程，并通过它持有渲染表面。drop presenter 会关闭线程并在其上销毁表面。
/// 仍排在 UI 线程上的帧只持有弱引用，在执行时或队列被 drop 时释放。
pub struct SurfacePresenter<F: Frame> {
    shared: Arc<PresenterShared<F>>,
}

impl<F: Frame> SurfacePresenter<F> {
    /// ### English
    /// Starts the GPU thread and waits for the device factory to finish.
    ///
    /// ### 中文
    /// 启动 GPU 线程并等待设备工厂完成。
    pub fn new(init: PresenterInit<F>) -> PresentResult<Self> {
        let PresenterInit {
            owner,
            compositor,
            visual_surface,
            ui_dispatcher,
            settings,
            device_factory,
        } = init;

        let gpu = GpuExecutor::spawn(GPU_THREAD_NAME, device_factory)?;
        let bounds = AtomicU64::new(pack_size(visual_surface.current_backing_size()));

        Ok(Self {
            shared: Arc::new(PresenterShared {
                owner,
                compositor,
                visual_surface,
                ui: ui_dispatcher,
                settings: PresentSettings::new(settings),
                transaction: Arc::new(TransactionState::new()),
                bounds,
                gpu,
            }),
        })
    }

    pub fn settings(&self) -> &PresentSettings {
        &self.shared.settings
    }

    pub fn is_transaction_pending(&self) -> bool {
        self.shared.transaction.is_pending()
    }

    /// ### English
    /// Presents one frame.
    ///
    /// The frame is released exactly once on every path. While a compositor transaction is
    /// pending the frame is dropped silently.
    ///
    /// Frames keep arrival order within the lane the owner picks. The owner's
    /// [`PresentationOwner::should_run_completion_on_ui_thread`] answer must stay stable for
    /// this surface: an inline frame presented after a lane switch can reach the compositor
    /// before frames still queued on the UI thread.
    ///
    /// #### Parameters
    /// - `frame`: Frame to draw; ownership passes to the presenter.
    /// - `orientation`: Orientation of the frame's content.
    ///
    /// ### 中文
    /// 呈现一帧。
    ///
    /// 在所有路径上帧都恰好被释放一次。合成器事务挂起期间帧会被静默丢弃。
    ///
    /// 帧在所有者选择的通道内保持到达顺序。所有者的
    /// [`PresentationOwner::should_run_completion_on_ui_thread`] 返回值对该表面必须保持稳定：
    /// 切换通道后呈现的内联帧可能先于仍排在 UI 线程上的帧到达合成器。
    ///
    /// #### 参数
    /// - `frame`：要绘制的帧；所有权转交给 presenter。
    /// - `orientation`：帧内容的方向。
    pub fn present(&self, frame: F, orientation: Orientation) -> PresentResult<PresentStatus> {
        let lease = FrameLease::new(frame);

        let Some(owner) = self.shared.owner.upgrade() else {
            tracing::debug!("presentation owner is gone; dropping frame");
            return Ok(PresentStatus::Dropped);
        };

        match FrameDispatch::decide(&self.shared.transaction, owner.as_ref()) {
            FrameDispatch::Drop => {
                tracing::trace!("compositor transaction pending; frame dropped");
                Ok(PresentStatus::Dropped)
            }
            FrameDispatch::Inline => {
                self.shared
                    .present_inline(owner.as_ref(), lease, orientation)
            }
            FrameDispatch::UiThread => {
                drop(owner);
                let shared = Arc::downgrade(&self.shared);
                self.shared.ui.dispatch_async(Box::new(move || {
                    let Some(shared) = shared.upgrade() else {
                        tracing::debug!("presenter is gone; releasing queued frame");
                        return;
                    };
                    shared.present_on_ui_thread(lease, orientation);
                }));
                Ok(PresentStatus::Scheduled)
            }
        }
    }

    /// ### English
    /// Reports the visual surface's new bounds. If the size changed, the render surface is
    /// destroyed on the GPU thread so the next frame recreates it. Returns whether it changed.
    ///
    /// ### 中文
    /// 上报可视表面的新边界。若尺寸发生变化，则在 GPU 线程上销毁渲染表面，
    /// 使下一帧重新创建。返回尺寸是否变化。
    pub fn notify_bounds_changed(&self, new_size: PhysicalSize<u32>) -> bool {
        let packed = pack_size(new_size);
        if self.shared.bounds.swap(packed, Ordering::AcqRel) == packed {
            return false;
        }

        tracing::debug!(
            width = new_size.width,
            height = new_size.height,
            "visual surface bounds changed; invalidating render surface"
        );
        self.shared.gpu.submit(GpuContext::invalidate_surface);
        true
    }

    /// ### English
    /// Requests destruction of the render surface (the next frame recreates it).
    ///
    /// ### 中文
    /// 请求销毁渲染表面（下一帧会重新创建）。
    pub fn teardown(&self) {
        self.shared.gpu.submit(GpuContext::invalidate_surface);
    }
}

impl<F: Frame> PresenterShared<F> {
    fn present_inline(
        &self,
        owner: &dyn PresentationOwner<F>,
        lease: FrameLease<F>,
        orientation: Orientation,
    ) -> PresentResult<PresentStatus> {
        owner.on_will_display(&lease);
        let Some(pass) = self.begin_pass(orientation) else {
            owner.on_did_display(&lease);
            return Ok(PresentStatus::Dropped);
        };

        let view = FrameView::of(&*lease);
        let compositor = Arc::clone(&self.compositor);
        let visual_surface = Arc::clone(&self.visual_surface);
        let result = self
            .gpu
            .run_sync(move |ctx| {
                render_frame(ctx, compositor.as_ref(), visual_surface.as_ref(), pass, view)
            })
            .and_then(|result| result);

        owner.on_did_display(&lease);
        drop(lease);
        result.map(|()| PresentStatus::Presented)
    }

    fn present_on_ui_thread(&self, lease: FrameLease<F>, orientation: Orientation) {
        if self.transaction.is_pending() {
            tracing::trace!("compositor transaction pending; frame dropped");
            return;
        }
        let Some(owner) = self.owner.upgrade() else {
            tracing::debug!("presentation owner is gone; dropping frame");
            return;
        };

        owner.on_will_display(&lease);
        let Some(pass) = self.begin_pass(orientation) else {
            owner.on_did_display(&lease);
            return;
        };
        drop(owner);

        let view = FrameView::of(&*lease);
        let compositor = Arc::clone(&self.compositor);
        let visual_surface = Arc::clone(&self.visual_surface);
        let completion = UiCompletion {
            owner: self.owner.clone(),
            ui: Arc::clone(&self.ui),
            lease: Some(lease),
        };
        let submitted = self.gpu.submit(move |ctx| {
            let result =
                render_frame(ctx, compositor.as_ref(), visual_surface.as_ref(), pass, view);
            completion.finish(result);
        });
        if !submitted {
            tracing::warn!("GPU execution context closed; frame finished without drawing");
        }
    }

    /// ### English
    /// Takes the settings snapshot and, in transactional mode, begins the compositor
    /// transaction. Returns `None` if the frame must be dropped.
    ///
    /// ### 中文
    /// 读取设置快照，事务模式下开启合成器事务。若帧必须丢弃则返回 `None`。
    fn begin_pass(&self, orientation: Orientation) -> Option<FramePass> {
        let settings = self.settings.snapshot();
        if settings.transactional {
            if !self.transaction.try_begin() {
                tracing::trace!("compositor transaction pending; frame dropped");
                return None;
            }
            self.compositor
                .begin_transaction(self.transaction.completion_callback());
        } else if self.transaction.is_pending() {
            tracing::trace!("compositor transaction pending; frame dropped");
            return None;
        }

        Some(FramePass {
            background: settings.background,
            fill_policy: settings.fill_policy,
            orientation: orientation.then(settings.target_orientation),
        })
    }
}

/// ### English
/// The render pass. Runs inside the GPU execution context.
///
/// ### 中文
/// 渲染 pass。在 GPU 执行上下文中运行。
fn render_frame(
    ctx: &mut GpuContext,
    compositor: &dyn Compositor,
    visual_surface: &dyn VisualSurface,
    pass: FramePass,
    frame: FrameView,
) -> PresentResult<()> {
    let target = ctx.activate_surface(compositor, visual_surface.current_backing_size())?;

    let vertices = compute_vertices(
        frame.size,
        pass.orientation,
        target.size,
        pass.fill_policy,
    );
    let texture_coordinates = texture_coordinates(pass.orientation);

    let device = ctx.device();
    device.clear(pass.background);
    device.draw_frame(frame.texture, &vertices, &texture_coordinates);
    device.flush();
    compositor.present_backing_store(target.color_buffer);
    Ok(())
}

/// ### English
/// Carries a UI-lane frame through its GPU job and back to the UI thread.
///
/// If the job is dropped without running (the GPU execution context shut down or refused it),
/// the frame is still finished on the UI thread with [`PresentError::ContextClosed`].
///
/// ### 中文
/// 携带 UI 通道的帧经过其 GPU 任务并回到 UI 线程。
///
/// 若任务未执行就被 drop（GPU 执行上下文已关闭或拒绝了它），该帧仍会在 UI 线程上以
/// [`PresentError::ContextClosed`] 完成。
struct UiCompletion<F: Frame> {
    owner: Weak<dyn PresentationOwner<F>>,
    ui: Arc<dyn UiDispatcher>,
    lease: Option<FrameLease<F>>,
}

impl<F: Frame> UiCompletion<F> {
    fn finish(mut self, result: PresentResult<()>) {
        self.post(result);
    }

    fn post(&mut self, result: PresentResult<()>) {
        let Some(lease) = self.lease.take() else {
            return;
        };
        let owner = self.owner.clone();
        self.ui
            .dispatch_async(Box::new(move || finish_on_ui_thread(&owner, lease, result)));
    }
}

impl<F: Frame> Drop for UiCompletion<F> {
    fn drop(&mut self) {
        if self.lease.is_some() {
            tracing::debug!("GPU job dropped before running; finishing frame as closed");
            self.post(Err(PresentError::ContextClosed));
        }
    }
}

fn finish_on_ui_thread<F: Frame>(
    owner: &Weak<dyn PresentationOwner<F>>,
    lease: FrameLease<F>,
    result: PresentResult<()>,
) {
    let Some(owner) = owner.upgrade() else {
        tracing::debug!("presentation owner is gone; releasing frame");
        return;
    };

    owner.on_did_display(&lease);
    if let Err(err) = &result {
        owner.on_present_error(err);
    }
    drop(lease);
}

const fn pack_size(size: PhysicalSize<u32>) -> u64 {
    ((size.width as u64) << 32) | size.height as u64
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::engine::dispatch::UiTaskQueue;

    struct CountedFrame(Arc<AtomicUsize>);

    impl Frame for CountedFrame {
        fn size(&self) -> PhysicalSize<u32> {
            PhysicalSize::new(2, 2)
        }

        fn texture(&self) -> FrameTexture {
            FrameTexture(9)
        }

        fn release(self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct EventOwner(Mutex<Vec<String>>);

    impl EventOwner {
        fn events(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl PresentationOwner<CountedFrame> for EventOwner {
        fn on_will_display(&self, _frame: &CountedFrame) {
            self.0.lock().unwrap().push("will".to_string());
        }

        fn on_did_display(&self, _frame: &CountedFrame) {
            self.0.lock().unwrap().push("did".to_string());
        }

        fn should_run_completion_on_ui_thread(&self) -> bool {
            true
        }

        fn on_present_error(&self, error: &PresentError) {
            self.0.lock().unwrap().push(format!("error: {error}"));
        }
    }

    fn completion(
        owner: &Arc<dyn PresentationOwner<CountedFrame>>,
        ui: &Arc<UiTaskQueue>,
        releases: &Arc<AtomicUsize>,
    ) -> UiCompletion<CountedFrame> {
        UiCompletion {
            owner: Arc::downgrade(owner),
            ui: ui.clone(),
            lease: Some(FrameLease::new(CountedFrame(releases.clone()))),
        }
    }

    #[test]
    fn unrun_gpu_job_finishes_frame_as_context_closed() {
        let owner = Arc::new(EventOwner::default());
        let owner_ref: Arc<dyn PresentationOwner<CountedFrame>> = owner.clone();
        let ui = Arc::new(UiTaskQueue::new());
        let releases = Arc::new(AtomicUsize::new(0));

        let completion = completion(&owner_ref, &ui, &releases);
        let job: Box<dyn FnOnce(&mut GpuContext) + Send> =
            Box::new(move |_ctx: &mut GpuContext| completion.finish(Ok(())));
        drop(job);
        assert_eq!(releases.load(Ordering::SeqCst), 0);

        assert_eq!(ui.drain(), 1);
        assert_eq!(
            owner.events(),
            vec![
                "did".to_string(),
                format!("error: {}", PresentError::ContextClosed)
            ]
        );
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn finished_completion_posts_its_result_once() {
        let owner = Arc::new(EventOwner::default());
        let owner_ref: Arc<dyn PresentationOwner<CountedFrame>> = owner.clone();
        let ui = Arc::new(UiTaskQueue::new());
        let releases = Arc::new(AtomicUsize::new(0));

        completion(&owner_ref, &ui, &releases).finish(Ok(()));
        assert_eq!(ui.drain(), 1);
        assert_eq!(ui.pending(), 0);
        assert_eq!(owner.events(), vec!["did".to_string()]);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn packed_sizes_are_distinct_per_axis() {
        assert_ne!(
            pack_size(PhysicalSize::new(1, 2)),
            pack_size(PhysicalSize::new(2, 1))
        );
        assert_eq!(pack_size(PhysicalSize::new(0, 0)), 0);
    }
}
