//! ### English
//! Frame orientation: the eight rigid transforms of the unit square.
//!
//! ### 中文
//! 帧方向：单位正方形的 8 种刚性变换。

/// ### English
/// Orientation of a frame relative to the surface (clockwise quarter turns, optionally mirrored).
///
/// A mirrored orientation flips horizontally first, then rotates.
///
/// ### 中文
/// 帧相对于表面的方向（顺时针四分之一圈旋转，可选水平镜像）。
///
/// 带镜像的方向先水平翻转，再旋转。
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    #[default]
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
    UpMirrored = 4,
    RightMirrored = 5,
    DownMirrored = 6,
    LeftMirrored = 7,
}

impl Orientation {
    pub const ALL: [Orientation; 8] = [
        Orientation::Up,
        Orientation::Right,
        Orientation::Down,
        Orientation::Left,
        Orientation::UpMirrored,
        Orientation::RightMirrored,
        Orientation::DownMirrored,
        Orientation::LeftMirrored,
    ];

    /// ### English
    /// Builds an orientation from clockwise quarter turns (taken modulo 4) and a mirror flag.
    ///
    /// ### 中文
    /// 由顺时针四分之一圈数（对 4 取模）与镜像标记构造方向。
    pub const fn from_parts(quarter_turns: u8, mirrored: bool) -> Self {
        let index = (quarter_turns % 4) + if mirrored { 4 } else { 0 };
        Self::ALL[index as usize]
    }

    /// ### English
    /// Decodes the `u8` form used for atomic storage. Unknown values map to `Up`.
    ///
    /// ### 中文
    /// 解码用于原子存储的 `u8` 形式。未知值映射为 `Up`。
    pub const fn from_u8(value: u8) -> Self {
        if value < 8 {
            Self::ALL[value as usize]
        } else {
            Self::Up
        }
    }

    pub const fn quarter_turns(self) -> u8 {
        (self as u8) % 4
    }

    pub const fn is_mirrored(self) -> bool {
        (self as u8) >= 4
    }

    /// ### English
    /// Whether width and height trade places under this orientation.
    ///
    /// ### 中文
    /// 该方向下宽高是否互换。
    pub const fn swaps_dimensions(self) -> bool {
        self.quarter_turns() % 2 == 1
    }

    /// ### English
    /// Composes two orientations: apply `self` first, then `next`.
    ///
    /// ### 中文
    /// 组合两个方向：先应用 `self`，再应用 `next`。
    pub const fn then(self, next: Orientation) -> Orientation {
        /*
        ### English
        R^a M^p followed by R^b M^q equals R^(b ± a) M^(p ^ q); a mirror reverses the earlier turn.

        ### 中文
        先 R^a M^p 再 R^b M^q 等于 R^(b ± a) M^(p ^ q)；镜像会反转之前的旋转方向。
        */
        let earlier = self.quarter_turns();
        let turns = if next.is_mirrored() {
            next.quarter_turns() + 4 - earlier
        } else {
            next.quarter_turns() + earlier
        };
        Orientation::from_parts(turns, self.is_mirrored() ^ next.is_mirrored())
    }

    /// ### English
    /// The orientation that undoes `self`.
    ///
    /// ### 中文
    /// 抵消 `self` 的逆方向。
    pub const fn inverse(self) -> Orientation {
        if self.is_mirrored() {
            self
        } else {
            Orientation::from_parts(4 - self.quarter_turns(), false)
        }
    }
}
