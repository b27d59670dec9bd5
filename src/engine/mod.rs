/// ### English
/// Engine internal modules (surface lifecycle, geometry, presentation, dispatch, and the GPU
/// execution thread).
///
/// ### 中文
/// 引擎内部模块（表面生命周期、几何、呈现、分派以及 GPU 执行线程）。
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod gl;
pub mod gpu;
pub mod present;
pub mod surface;
