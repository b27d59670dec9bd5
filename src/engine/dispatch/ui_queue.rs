use std::time::Duration;

use crossbeam_channel as channel;

use super::{UiDispatcher, UiTask};

/// ### English
/// Ready-made UI dispatcher backed by an unbounded channel.
///
/// The embedder calls [`UiTaskQueue::drain`] from its UI tick; tasks run on that thread in
/// posting order.
///
/// ### 中文
/// 基于无界 channel 的现成 UI 分派器。
///
/// 宿主在 UI tick 中调用 [`UiTaskQueue::drain`]；任务按投递顺序在该线程上执行。
pub struct UiTaskQueue {
    sender: channel::Sender<UiTask>,
    receiver: channel::Receiver<UiTask>,
}

impl UiTaskQueue {
    pub fn new() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self { sender, receiver }
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// ### English
    /// Runs the tasks queued at call time and returns how many ran.
    ///
    /// Tasks posted while draining wait for the next drain, so a task that re-posts itself cannot
    /// starve the caller.
    ///
    /// ### 中文
    /// 执行调用时已排队的任务，返回执行数量。
    ///
    /// 在 drain 过程中新投递的任务留到下一次 drain，因此自我重投的任务不会饿死调用方。
    pub fn drain(&self) -> usize {
        let count = self.receiver.len();
        let mut ran = 0;
        for _ in 0..count {
            let Ok(task) = self.receiver.try_recv() else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }

    /// ### English
    /// Waits up to `timeout` for a task, runs it, then drains the rest of the snapshot.
    /// Returns `0` if nothing arrived in time.
    ///
    /// ### 中文
    /// 最多等待 `timeout` 以获取一个任务并执行，然后 drain 剩余快照。超时未到达则返回 `0`。
    pub fn drain_timeout(&self, timeout: Duration) -> usize {
        let Ok(task) = self.receiver.recv_timeout(timeout) else {
            return 0;
        };
        task();
        1 + self.drain()
    }
}

impl Default for UiTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl UiDispatcher for UiTaskQueue {
    fn dispatch_async(&self, task: UiTask) {
        // The queue owns a receiver, so the channel never disconnects.
        let _ = self.sender.send(task);
    }
}
