//! ### English
//! GPU execution context: a dedicated thread that owns the GPU device and drains a serial FIFO
//! of jobs. This is the only place GPU resource calls happen.
//!
//! ### 中文
//! GPU 执行上下文：持有 GPU 设备并按 FIFO 串行执行任务的独立线程。
//! 这是唯一允许发生 GPU 资源调用的地方。

mod context;

use std::thread;
use std::time::Duration;

use crossbeam_channel as channel;

use crate::engine::error::{PresentError, PresentResult};
use crate::engine::surface::GpuDevice;

pub use context::GpuContext;

const INIT_TIMEOUT: Duration = Duration::from_secs(30);

/// ### English
/// Builds the GPU device on the GPU thread (so the device never has to be `Send`).
///
/// ### 中文
/// 在 GPU 线程上构建 GPU 设备（因此设备无需实现 `Send`）。
pub type DeviceFactory = Box<dyn FnOnce() -> Result<Box<dyn GpuDevice>, String> + Send + 'static>;

type GpuJob = Box<dyn FnOnce(&mut GpuContext) + Send + 'static>;

enum GpuCommand {
    /// ### English
    /// Runs one job inside the context.
    ///
    /// ### 中文
    /// 在上下文中执行一个任务。
    Run(GpuJob),
    /// ### English
    /// Stops the thread; queued jobs behind it are dropped.
    ///
    /// ### 中文
    /// 停止线程；排在其后的任务会被丢弃。
    Shutdown,
}

/// ### English
/// Handle to the GPU execution thread.
///
/// Jobs run one at a time in submission order. Dropping the handle shuts the thread down and
/// destroys the render surface on it.
///
/// ### 中文
/// GPU 执行线程的句柄。
///
/// 任务按提交顺序逐个执行。drop 该句柄会关闭线程，并在其上销毁渲染表面。
pub struct GpuExecutor {
    /// ### English
    /// FIFO command queue into the GPU thread.
    ///
    /// ### 中文
    /// 发往 GPU 线程的 FIFO 命令队列。
    sender: channel::Sender<GpuCommand>,
    /// ### English
    /// Join handle for the GPU thread (owned by this executor).
    ///
    /// ### 中文
    /// GPU 线程的 join handle（由本执行器持有）。
    thread: Option<thread::JoinHandle<()>>,
}

impl GpuExecutor {
    /// ### English
    /// Spawns the GPU thread and blocks until the device factory has run (or times out).
    ///
    /// #### Parameters
    /// - `name`: Thread name.
    /// - `factory`: Builds the device on the new thread (makes the GL context current, etc).
    ///
    /// ### 中文
    /// 创建 GPU 线程，并阻塞等待设备工厂执行完成（或超时）。
    ///
    /// #### 参数
    /// - `name`：线程名。
    /// - `factory`：在新线程上构建设备（例如使 GL 上下文 current）。
    pub fn spawn(name: &str, factory: DeviceFactory) -> PresentResult<Self> {
        let (sender, receiver) = channel::unbounded();
        let (init_tx, init_rx) = channel::bounded(1);

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_gpu_thread(factory, receiver, init_tx))
            .map_err(|err| PresentError::DeviceInit(format!("failed to spawn GPU thread: {err}")))?;

        match init_rx.recv_timeout(INIT_TIMEOUT) {
            Ok(Ok(())) => Ok(Self {
                sender,
                thread: Some(thread),
            }),
            Ok(Err(reason)) => {
                let _ = thread.join();
                Err(PresentError::DeviceInit(reason))
            }
            Err(_) => {
                /*
                ### English
                The factory is stuck; leave the thread detached. It exits on `Shutdown` once the
                factory returns.

                ### 中文
                设备工厂卡住；让线程保持分离状态。工厂返回后它会在收到 `Shutdown` 时退出。
                */
                let _ = sender.send(GpuCommand::Shutdown);
                Err(PresentError::DeviceInit(
                    "timed out initializing GPU thread".to_string(),
                ))
            }
        }
    }

    /// ### English
    /// Enqueues a job without waiting. Returns `false` if the thread has shut down (the job is
    /// dropped, which releases anything it owns).
    ///
    /// ### 中文
    /// 入队一个任务且不等待。若线程已关闭则返回 `false`（任务被 drop，其持有的资源随之释放）。
    pub fn submit(&self, job: impl FnOnce(&mut GpuContext) + Send + 'static) -> bool {
        self.sender.send(GpuCommand::Run(Box::new(job))).is_ok()
    }

    /// ### English
    /// Runs a job and blocks the caller until it finishes.
    ///
    /// Must not be called from a thread the GPU thread may wait on (the UI thread when jobs
    /// post back to it), and never from the GPU thread itself.
    ///
    /// ### 中文
    /// 执行一个任务并阻塞调用方直到完成。
    ///
    /// 不得在 GPU 线程可能等待的线程上调用（例如任务会回投的 UI 线程），也不得在 GPU 线程自身调用。
    pub fn run_sync<R: Send + 'static>(
        &self,
        job: impl FnOnce(&mut GpuContext) -> R + Send + 'static,
    ) -> PresentResult<R> {
        debug_assert!(
            !self.is_gpu_thread(),
            "synchronous GPU entry from the GPU thread would deadlock"
        );

        let (response_tx, response_rx) = channel::bounded(1);
        let submitted = self.submit(move |ctx| {
            let _ = response_tx.send(job(ctx));
        });
        if !submitted {
            return Err(PresentError::ContextClosed);
        }
        response_rx.recv().map_err(|_| PresentError::ContextClosed)
    }

    /// ### English
    /// Returns whether the calling thread is the GPU thread.
    ///
    /// ### 中文
    /// 返回调用线程是否为 GPU 线程。
    pub fn is_gpu_thread(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| thread.thread().id() == thread::current().id())
    }
}

impl Drop for GpuExecutor {
    fn drop(&mut self) {
        let _ = self.sender.send(GpuCommand::Shutdown);
        let Some(thread) = self.thread.take() else {
            return;
        };
        if thread.thread().id() == thread::current().id() {
            return;
        }
        let _ = thread.join();
    }
}

fn run_gpu_thread(
    factory: DeviceFactory,
    receiver: channel::Receiver<GpuCommand>,
    init_tx: channel::Sender<Result<(), String>>,
) {
    let device = match factory() {
        Ok(device) => device,
        Err(reason) => {
            tracing::error!(%reason, "GPU device initialization failed");
            let _ = init_tx.send(Err(reason));
            return;
        }
    };
    let _ = init_tx.send(Ok(()));
    tracing::info!("GPU execution context started");

    let mut ctx = GpuContext::new(device);
    while let Ok(command) = receiver.recv() {
        match command {
            GpuCommand::Run(job) => job(&mut ctx),
            GpuCommand::Shutdown => break,
        }
    }

    let mut dropped = 0usize;
    while let Ok(command) = receiver.try_recv() {
        if matches!(command, GpuCommand::Run(_)) {
            dropped += 1;
        }
    }
    ctx.teardown();
    tracing::info!(dropped_jobs = dropped, "GPU execution context stopped");
}
