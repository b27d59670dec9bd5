//! ### English
//! Geometry transform: fits a source frame into the destination surface.
//! Pure functions only; no GPU state.
//!
//! ### 中文
//! 几何变换：将源帧适配到目标表面。
//! 仅包含纯函数，不持有 GPU 状态。

mod orientation;

use dpi::PhysicalSize;

pub use orientation::Orientation;

/// ### English
/// Full-surface quad in clip space (bottom-left, bottom-right, top-left, top-right).
///
/// ### 中文
/// 覆盖整个表面的裁剪空间四边形（左下、右下、左上、右上）。
pub const IDENTITY_QUAD: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

const UNIT_CORNERS: [(f32, f32); 4] = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];

/// ### English
/// How a frame is fitted into a surface with a different aspect ratio.
///
/// ### 中文
/// 帧与表面宽高比不同时的适配方式。
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillPolicy {
    /// ### English
    /// Ignore aspect ratio; cover the whole surface.
    ///
    /// ### 中文
    /// 忽略宽高比，铺满整个表面。
    Stretch = 0,
    /// ### English
    /// Keep aspect ratio; letterbox inside the surface.
    ///
    /// ### 中文
    /// 保持宽高比，在表面内留黑边。
    #[default]
    PreserveAspectRatio = 1,
    /// ### English
    /// Keep aspect ratio; fill the surface and crop the overflow.
    ///
    /// ### 中文
    /// 保持宽高比，填满表面并裁掉溢出部分。
    PreserveAspectRatioAndFill = 2,
}

impl FillPolicy {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Stretch,
            2 => Self::PreserveAspectRatioAndFill,
            _ => Self::PreserveAspectRatio,
        }
    }
}

/// ### English
/// Computes the clip-space vertices that place `source_size` (seen through `source_orientation`)
/// into `dest_size` under `fill_policy`.
///
/// Degenerate (zero-sized) source or destination sizes return [`IDENTITY_QUAD`].
///
/// #### Parameters
/// - `source_size`: Frame size in pixels, before orientation is applied.
/// - `source_orientation`: Orientation the frame is displayed with.
/// - `dest_size`: Realized backing size of the render surface.
/// - `fill_policy`: Aspect-ratio handling.
///
/// ### 中文
/// 计算在 `fill_policy` 下，将 `source_size`（经 `source_orientation` 变换后）放入 `dest_size`
/// 的裁剪空间顶点。
///
/// 源或目标尺寸为 0 时返回 [`IDENTITY_QUAD`]。
///
/// #### 参数
/// - `source_size`：应用方向前的帧尺寸（像素）。
/// - `source_orientation`：帧显示时的方向。
/// - `dest_size`：渲染表面实际的 backing 尺寸。
/// - `fill_policy`：宽高比处理方式。
pub fn compute_vertices(
    source_size: PhysicalSize<u32>,
    source_orientation: Orientation,
    dest_size: PhysicalSize<u32>,
    fill_policy: FillPolicy,
) -> [f32; 8] {
    if source_size.width == 0
        || source_size.height == 0
        || dest_size.width == 0
        || dest_size.height == 0
    {
        return IDENTITY_QUAD;
    }

    let (source_width, source_height) = if source_orientation.swaps_dimensions() {
        (source_size.height as f32, source_size.width as f32)
    } else {
        (source_size.width as f32, source_size.height as f32)
    };
    let dest_width = dest_size.width as f32;
    let dest_height = dest_size.height as f32;

    let fit = (dest_width / source_width).min(dest_height / source_height);
    let inset_width = source_width * fit;
    let inset_height = source_height * fit;

    let (width_scaling, height_scaling) = match fill_policy {
        FillPolicy::Stretch => (1.0, 1.0),
        FillPolicy::PreserveAspectRatio => (inset_width / dest_width, inset_height / dest_height),
        FillPolicy::PreserveAspectRatioAndFill => {
            (dest_height / inset_height, dest_width / inset_width)
        }
    };

    [
        -width_scaling,
        -height_scaling,
        width_scaling,
        -height_scaling,
        -width_scaling,
        height_scaling,
        width_scaling,
        height_scaling,
    ]
}

/// ### English
/// Texture coordinates matching the vertex order of [`compute_vertices`] for `orientation`.
///
/// Each corner samples the texture at the inverse-oriented position (rotations are taken around
/// the texture center).
///
/// ### 中文
/// 与 [`compute_vertices`] 顶点顺序对应的纹理坐标。
///
/// 每个角在逆方向变换后的位置采样纹理（绕纹理中心旋转）。
pub fn texture_coordinates(orientation: Orientation) -> [f32; 8] {
    let mut coordinates = [0.0; 8];
    for (index, &(x, y)) in UNIT_CORNERS.iter().enumerate() {
        let (mut u, mut v) = (x, y);
        for _ in 0..orientation.quarter_turns() {
            (u, v) = (1.0 - v, u);
        }
        if orientation.is_mirrored() {
            u = 1.0 - u;
        }
        coordinates[index * 2] = u;
        coordinates[index * 2 + 1] = v;
    }
    coordinates
}
