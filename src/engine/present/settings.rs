use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

use crate::engine::geometry::{FillPolicy, Orientation};
use crate::engine::surface::BackgroundColor;

/// ### English
/// Plain copy of the presentation settings, taken once per frame.
///
/// ### 中文
/// 呈现设置的普通拷贝，每帧读取一次。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettingsSnapshot {
    /// ### English
    /// Clear color drawn behind the frame (default opaque black).
    ///
    /// ### 中文
    /// 帧后方的清屏颜色（默认不透明黑色）。
    pub background: BackgroundColor,
    /// ### English
    /// Aspect-ratio handling (default `PreserveAspectRatio`).
    ///
    /// ### 中文
    /// 宽高比处理方式（默认 `PreserveAspectRatio`）。
    pub fill_policy: FillPolicy,
    /// ### English
    /// Orientation of the target, composed after the frame's own orientation.
    ///
    /// ### 中文
    /// 目标方向，在帧自身方向之后组合。
    pub target_orientation: Orientation,
    /// ### English
    /// Present each frame inside a compositor transaction (default off).
    ///
    /// ### 中文
    /// 是否在合成器事务中呈现每一帧（默认关闭）。
    pub transactional: bool,
}

/// ### English
/// Presentation settings shared between the owner and the presenting threads.
///
/// Each field is an independent atomic; a frame reads them via [`Self::snapshot`] and a change
/// takes effect from the next frame on.
///
/// ### 中文
/// 在所有者与呈现线程之间共享的呈现设置。
///
/// 每个字段都是独立的原子变量；帧通过 [`Self::snapshot`] 读取，修改从下一帧起生效。
#[derive(Debug)]
pub struct PresentSettings {
    background: AtomicU32,
    fill_policy: AtomicU8,
    target_orientation: AtomicU8,
    transactional: AtomicBool,
}

impl PresentSettings {
    pub fn new(initial: SettingsSnapshot) -> Self {
        Self {
            background: AtomicU32::new(initial.background.to_packed()),
            fill_policy: AtomicU8::new(initial.fill_policy as u8),
            target_orientation: AtomicU8::new(initial.target_orientation as u8),
            transactional: AtomicBool::new(initial.transactional),
        }
    }

    pub fn background(&self) -> BackgroundColor {
        BackgroundColor::from_packed(self.background.load(Ordering::Relaxed))
    }

    pub fn set_background(&self, color: BackgroundColor) {
        self.background.store(color.to_packed(), Ordering::Relaxed);
    }

    pub fn fill_policy(&self) -> FillPolicy {
        FillPolicy::from_u8(self.fill_policy.load(Ordering::Relaxed))
    }

    pub fn set_fill_policy(&self, policy: FillPolicy) {
        self.fill_policy.store(policy as u8, Ordering::Relaxed);
    }

    pub fn target_orientation(&self) -> Orientation {
        Orientation::from_u8(self.target_orientation.load(Ordering::Relaxed))
    }

    pub fn set_target_orientation(&self, orientation: Orientation) {
        self.target_orientation
            .store(orientation as u8, Ordering::Relaxed);
    }

    pub fn is_transactional(&self) -> bool {
        self.transactional.load(Ordering::Acquire)
    }

    pub fn set_transactional(&self, enabled: bool) {
        self.transactional.store(enabled, Ordering::Release);
    }

    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            background: self.background(),
            fill_policy: self.fill_policy(),
            target_orientation: self.target_orientation(),
            transactional: self.is_transactional(),
        }
    }
}

impl Default for PresentSettings {
    fn default() -> Self {
        Self::new(SettingsSnapshot::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_snapshot_defaults() {
        let snapshot = PresentSettings::default().snapshot();
        assert_eq!(snapshot.background, BackgroundColor::BLACK);
        assert_eq!(snapshot.fill_policy, FillPolicy::PreserveAspectRatio);
        assert_eq!(snapshot.target_orientation, Orientation::Up);
        assert!(!snapshot.transactional);
    }

    #[test]
    fn setters_are_visible_in_next_snapshot() {
        let settings = PresentSettings::default();
        settings.set_background(BackgroundColor::rgba8(1, 2, 3, 4));
        settings.set_fill_policy(FillPolicy::Stretch);
        settings.set_target_orientation(Orientation::LeftMirrored);
        settings.set_transactional(true);

        assert_eq!(
            settings.snapshot(),
            SettingsSnapshot {
                background: BackgroundColor::rgba8(1, 2, 3, 4),
                fill_policy: FillPolicy::Stretch,
                target_orientation: Orientation::LeftMirrored,
                transactional: true,
            }
        );
    }
}
