use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::surface::TransactionCallback;

/// ### English
/// "Awaiting compositor transaction" flag.
///
/// Set when a frame begins a compositor transaction, cleared by the compositor's completion
/// callback. While set, no new frame may start GPU work.
///
/// ### 中文
/// “等待合成器事务完成”标记。
///
/// 帧开启合成器事务时置位，由合成器完成回调清除。置位期间不允许新帧开始 GPU 工作。
#[derive(Debug, Default)]
pub struct TransactionState {
    awaiting: AtomicBool,
}

impl TransactionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.awaiting.load(Ordering::Acquire)
    }

    /// ### English
    /// Marks a transaction as begun. Returns `false` if one is already pending.
    ///
    /// ### 中文
    /// 标记事务开始。若已有事务挂起则返回 `false`。
    pub fn try_begin(&self) -> bool {
        self.awaiting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn complete(&self) {
        self.awaiting.store(false, Ordering::Release);
    }

    /// ### English
    /// Callback for [`crate::Compositor::begin_transaction`] that clears this flag.
    ///
    /// Captures only the flag, so the compositor never keeps the presenter alive.
    ///
    /// ### 中文
    /// 供 [`crate::Compositor::begin_transaction`] 使用、用于清除该标记的回调。
    ///
    /// 只捕获标记本身，因此合成器不会延长 presenter 的生命周期。
    pub fn completion_callback(self: &Arc<Self>) -> TransactionCallback {
        let state = Arc::clone(self);
        Box::new(move || {
            state.complete();
            tracing::trace!("compositor transaction completed");
        })
    }
}
