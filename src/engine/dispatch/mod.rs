//! ### English
//! Frame dispatch policy: decides per incoming frame whether it is dropped, presented inline on
//! the producer thread, or handed to the UI thread.
//!
//! ### 中文
//! 帧分派策略：针对每个到来的帧决定是丢弃、在生产者线程内联呈现，还是交给 UI 线程。

mod ui_queue;

use crate::engine::present::{Frame, PresentationOwner, TransactionState};

pub use ui_queue::UiTaskQueue;

/// ### English
/// Task posted to the UI thread.
///
/// ### 中文
/// 投递到 UI 线程的任务。
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// ### English
/// Asynchronous entry into the UI thread.
///
/// Tasks must run in posting order, on the UI thread, some time after `dispatch_async` returns.
///
/// ### 中文
/// 异步进入 UI 线程的入口。
///
/// 任务必须在 `dispatch_async` 返回之后、按投递顺序在 UI 线程上执行。
pub trait UiDispatcher: Send + Sync {
    fn dispatch_async(&self, task: UiTask);
}

/// ### English
/// Where an incoming frame goes.
///
/// ### 中文
/// 到来的帧的去向。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDispatch {
    /// ### English
    /// A compositor transaction is pending; release the frame without drawing it.
    ///
    /// ### 中文
    /// 合成器事务挂起中；不绘制，直接释放帧。
    Drop,
    /// ### English
    /// Post the presentation to the UI thread.
    ///
    /// ### 中文
    /// 将呈现投递到 UI 线程。
    UiThread,
    /// ### English
    /// Present on the calling thread, entering the GPU context synchronously.
    ///
    /// ### 中文
    /// 在调用线程上呈现，同步进入 GPU 上下文。
    Inline,
}

impl FrameDispatch {
    /// ### English
    /// Decides the lane for one frame. The owner is queried at most once.
    ///
    /// ### 中文
    /// 为一帧决定执行通道。最多查询一次所有者。
    pub fn decide<F: Frame>(
        transaction: &TransactionState,
        owner: &dyn PresentationOwner<F>,
    ) -> Self {
        if transaction.is_pending() {
            return Self::Drop;
        }
        if owner.should_run_completion_on_ui_thread() {
            Self::UiThread
        } else {
            Self::Inline
        }
    }
}
