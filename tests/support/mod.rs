#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use dpi::PhysicalSize;
use xian_present::{
    BackgroundColor, ColorBufferId, Compositor, DeviceFactory, Frame, FrameTexture,
    FramebufferId, GpuDevice, PresentError, PresentationOwner, PresenterInit, SettingsSnapshot,
    SurfacePresenter, TransactionCallback, UiTaskQueue, VisualSurface,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateFramebuffer(u32),
    CreateColorBuffer(u32),
    DeleteFramebuffer(u32),
    DeleteColorBuffer(u32),
    BindFramebuffer(u32),
    Viewport(PhysicalSize<u32>),
    Clear(BackgroundColor),
    Draw { texture: u32, vertices: [f32; 8] },
    Flush,
}

#[derive(Default)]
struct DeviceLog {
    calls: Vec<DeviceCall>,
    threads: HashSet<ThreadId>,
    live_framebuffers: HashSet<u32>,
    live_color_buffers: HashSet<u32>,
    incomplete_status: Option<u32>,
}

/// Shared view into the recording device living on the GPU thread.
#[derive(Clone, Default)]
pub struct DeviceProbe(Arc<Mutex<DeviceLog>>);

impl DeviceProbe {
    pub fn factory(&self) -> DeviceFactory {
        let probe = self.clone();
        Box::new(move || {
            Ok(Box::new(RecordingDevice {
                probe,
                next_id: 0,
            }) as Box<dyn GpuDevice>)
        })
    }

    pub fn set_incomplete(&self, status: Option<u32>) {
        self.0.lock().unwrap().incomplete_status = status;
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.0.lock().unwrap().calls.clone()
    }

    pub fn draws(&self) -> Vec<[f32; 8]> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DeviceCall::Draw { vertices, .. } => Some(vertices),
                _ => None,
            })
            .collect()
    }

    pub fn drawn_textures(&self) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DeviceCall::Draw { texture, .. } => Some(texture),
                _ => None,
            })
            .collect()
    }

    pub fn clears(&self) -> Vec<BackgroundColor> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DeviceCall::Clear(color) => Some(color),
                _ => None,
            })
            .collect()
    }

    pub fn color_buffers_created(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, DeviceCall::CreateColorBuffer(_)))
            .count()
    }

    pub fn framebuffers_created(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, DeviceCall::CreateFramebuffer(_)))
            .count()
    }

    pub fn bound_framebuffers(&self) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DeviceCall::BindFramebuffer(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn live_color_buffers(&self) -> usize {
        self.0.lock().unwrap().live_color_buffers.len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.0.lock().unwrap().live_framebuffers.len()
    }

    pub fn threads(&self) -> HashSet<ThreadId> {
        self.0.lock().unwrap().threads.clone()
    }
}

struct RecordingDevice {
    probe: DeviceProbe,
    next_id: u32,
}

impl RecordingDevice {
    fn record(&mut self, call: DeviceCall) {
        let mut log = self.probe.0.lock().unwrap();
        log.threads.insert(thread::current().id());
        log.calls.push(call);
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GpuDevice for RecordingDevice {
    fn create_framebuffer(&mut self) -> Result<FramebufferId, String> {
        let id = self.next();
        self.record(DeviceCall::CreateFramebuffer(id));
        self.probe.0.lock().unwrap().live_framebuffers.insert(id);
        Ok(FramebufferId(id))
    }

    fn create_color_buffer(&mut self) -> Result<ColorBufferId, String> {
        let id = self.next();
        self.record(DeviceCall::CreateColorBuffer(id));
        self.probe.0.lock().unwrap().live_color_buffers.insert(id);
        Ok(ColorBufferId(id))
    }

    fn bind_color_buffer(&mut self, _color_buffer: ColorBufferId) {}

    fn attach_color_buffer(&mut self, _framebuffer: FramebufferId, _color: ColorBufferId) {}

    fn check_framebuffer(&mut self, _framebuffer: FramebufferId) -> Result<(), u32> {
        match self.probe.0.lock().unwrap().incomplete_status {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.record(DeviceCall::DeleteFramebuffer(framebuffer.0));
        let removed = self
            .probe
            .0
            .lock()
            .unwrap()
            .live_framebuffers
            .remove(&framebuffer.0);
        assert!(removed, "framebuffer {} freed twice", framebuffer.0);
    }

    fn delete_color_buffer(&mut self, color_buffer: ColorBufferId) {
        self.record(DeviceCall::DeleteColorBuffer(color_buffer.0));
        let removed = self
            .probe
            .0
            .lock()
            .unwrap()
            .live_color_buffers
            .remove(&color_buffer.0);
        assert!(removed, "color buffer {} freed twice", color_buffer.0);
    }

    fn bind_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.record(DeviceCall::BindFramebuffer(framebuffer.0));
    }

    fn set_viewport(&mut self, size: PhysicalSize<u32>) {
        self.record(DeviceCall::Viewport(size));
    }

    fn clear(&mut self, color: BackgroundColor) {
        self.record(DeviceCall::Clear(color));
    }

    fn draw_frame(&mut self, texture: FrameTexture, vertices: &[f32; 8], _tex: &[f32; 8]) {
        self.record(DeviceCall::Draw {
            texture: texture.0,
            vertices: *vertices,
        });
    }

    fn flush(&mut self) {
        self.record(DeviceCall::Flush);
    }
}

pub struct FakeVisualSurface {
    size: Mutex<PhysicalSize<u32>>,
}

impl FakeVisualSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Mutex::new(PhysicalSize::new(width, height)),
        }
    }

    pub fn set_size(&self, width: u32, height: u32) {
        *self.size.lock().unwrap() = PhysicalSize::new(width, height);
    }
}

impl VisualSurface for FakeVisualSurface {
    fn current_backing_size(&self) -> PhysicalSize<u32> {
        *self.size.lock().unwrap()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositorEvent {
    BeginTransaction,
    Present(u32),
}

/// Realizes the backing store at the visual surface's current size.
pub struct FakeCompositor {
    surface: Arc<FakeVisualSurface>,
    events: Mutex<Vec<CompositorEvent>>,
    pending: Mutex<Vec<TransactionCallback>>,
}

impl FakeCompositor {
    pub fn new(surface: Arc<FakeVisualSurface>) -> Self {
        Self {
            surface,
            events: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<CompositorEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn presents(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, CompositorEvent::Present(_)))
            .count()
    }

    pub fn pending_transactions(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Fires every outstanding transaction callback on the calling thread.
    pub fn complete_transactions(&self) -> usize {
        let callbacks = std::mem::take(&mut *self.pending.lock().unwrap());
        let count = callbacks.len();
        for callback in callbacks {
            callback();
        }
        count
    }
}

impl Compositor for FakeCompositor {
    fn attach_backing_store(&self, _color_buffer: ColorBufferId) -> PhysicalSize<u32> {
        self.surface.current_backing_size()
    }

    fn present_backing_store(&self, color_buffer: ColorBufferId) {
        self.events
            .lock()
            .unwrap()
            .push(CompositorEvent::Present(color_buffer.0));
    }

    fn begin_transaction(&self, on_complete: TransactionCallback) {
        self.events
            .lock()
            .unwrap()
            .push(CompositorEvent::BeginTransaction);
        self.pending.lock().unwrap().push(on_complete);
    }
}

pub struct TestFrame {
    size: PhysicalSize<u32>,
    texture: u32,
    releases: Arc<AtomicUsize>,
}

impl Frame for TestFrame {
    fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    fn texture(&self) -> FrameTexture {
        FrameTexture(self.texture)
    }

    fn release(self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out frames and counts how many were made and released.
#[derive(Clone, Default)]
pub struct FrameSource {
    made: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
    next_texture: Arc<AtomicU32>,
}

impl FrameSource {
    pub fn frame(&self, width: u32, height: u32) -> TestFrame {
        self.made.fetch_add(1, Ordering::SeqCst);
        TestFrame {
            size: PhysicalSize::new(width, height),
            texture: 100 + self.next_texture.fetch_add(1, Ordering::SeqCst),
            releases: self.releases.clone(),
        }
    }

    pub fn made(&self) -> usize {
        self.made.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct RecordingOwner {
    pub ui_lane: bool,
    pub will_display: Mutex<Vec<ThreadId>>,
    pub did_display: Mutex<Vec<ThreadId>>,
    pub errors: Mutex<Vec<PresentError>>,
}

impl RecordingOwner {
    pub fn will_threads(&self) -> Vec<ThreadId> {
        self.will_display.lock().unwrap().clone()
    }

    pub fn did_threads(&self) -> Vec<ThreadId> {
        self.did_display.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<PresentError> {
        self.errors.lock().unwrap().clone()
    }
}

impl PresentationOwner<TestFrame> for RecordingOwner {
    fn on_will_display(&self, _frame: &TestFrame) {
        self.will_display.lock().unwrap().push(thread::current().id());
    }

    fn on_did_display(&self, _frame: &TestFrame) {
        self.did_display.lock().unwrap().push(thread::current().id());
    }

    fn should_run_completion_on_ui_thread(&self) -> bool {
        self.ui_lane
    }

    fn on_present_error(&self, error: &PresentError) {
        self.errors.lock().unwrap().push(error.clone());
    }
}

pub struct Harness {
    pub presenter: SurfacePresenter<TestFrame>,
    pub owner: Arc<RecordingOwner>,
    pub device: DeviceProbe,
    pub compositor: Arc<FakeCompositor>,
    pub surface: Arc<FakeVisualSurface>,
    pub ui: Arc<UiTaskQueue>,
    pub frames: FrameSource,
}

impl Harness {
    pub fn new(width: u32, height: u32, ui_lane: bool, settings: SettingsSnapshot) -> Self {
        init_tracing();

        let owner = Arc::new(RecordingOwner {
            ui_lane,
            ..Default::default()
        });
        let device = DeviceProbe::default();
        let surface = Arc::new(FakeVisualSurface::new(width, height));
        let compositor = Arc::new(FakeCompositor::new(surface.clone()));
        let ui = Arc::new(UiTaskQueue::new());

        let owner_ref: Arc<dyn PresentationOwner<TestFrame>> = owner.clone();
        let presenter = SurfacePresenter::new(PresenterInit {
            owner: Arc::downgrade(&owner_ref),
            compositor: compositor.clone(),
            visual_surface: surface.clone(),
            ui_dispatcher: ui.clone(),
            settings,
            device_factory: device.factory(),
        })
        .expect("presenter starts");

        Self {
            presenter,
            owner,
            device,
            compositor,
            surface,
            ui,
            frames: FrameSource::default(),
        }
    }

    pub fn inline(width: u32, height: u32) -> Self {
        Self::new(width, height, false, SettingsSnapshot::default())
    }

    /// Resizes the visual surface and reports the new bounds.
    pub fn resize(&self, width: u32, height: u32) -> bool {
        self.surface.set_size(width, height);
        self.presenter
            .notify_bounds_changed(PhysicalSize::new(width, height))
    }
}

pub fn extent(vertices: &[f32; 8]) -> (f32, f32) {
    let x = vertices
        .iter()
        .step_by(2)
        .fold(0.0f32, |acc, v| acc.max(v.abs()));
    let y = vertices
        .iter()
        .skip(1)
        .step_by(2)
        .fold(0.0f32, |acc, v| acc.max(v.abs()));
    (x, y)
}
