//! ### English
//! Error taxonomy for surface creation and frame presentation.
//!
//! ### 中文
//! 渲染表面创建与帧呈现的错误分类。

/// ### English
/// Convenience result type used by the presentation pipeline.
///
/// ### 中文
/// 呈现管线使用的 `Result` 别名。
pub type PresentResult<T> = Result<T, PresentError>;

/// ### English
/// Errors reported by the presentation pipeline.
///
/// None of these cross the producer/UI boundary as panics: the inline lane returns them, the
/// UI-thread lane forwards them to `PresentationOwner::on_present_error`.
///
/// ### 中文
/// 呈现管线上报的错误。
///
/// 这些错误不会以 panic 的形式跨越生产者/UI 边界：inline 路径直接返回，
/// UI 线程路径通过 `PresentationOwner::on_present_error` 回报。
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PresentError {
    /// ### English
    /// The backing store is not laid out yet (a zero dimension). Retry on a later frame.
    ///
    /// ### 中文
    /// backing store 尚未布局完成（存在 0 尺寸）。应在后续帧重试。
    #[error("render surface has zero size ({width}x{height})")]
    ZeroSize { width: u32, height: u32 },

    /// ### English
    /// The device reports the color attachment incomplete. Fatal for the current geometry.
    ///
    /// ### 中文
    /// 设备报告颜色附件不完整。对当前几何尺寸是致命错误。
    #[error("render surface attachment incomplete (status {status:#06x})")]
    IncompleteAttachment { status: u32 },

    /// ### English
    /// A GPU resource could not be created. Fatal for the current geometry.
    ///
    /// ### 中文
    /// GPU 资源创建失败。对当前几何尺寸是致命错误。
    #[error("failed to allocate {resource}: {reason}")]
    Allocation {
        resource: &'static str,
        reason: String,
    },

    /// ### English
    /// The GPU execution context has shut down.
    ///
    /// ### 中文
    /// GPU 执行上下文已关闭。
    #[error("GPU execution context is closed")]
    ContextClosed,

    /// ### English
    /// The GPU device factory failed on the GPU thread.
    ///
    /// ### 中文
    /// GPU 线程上的设备工厂初始化失败。
    #[error("GPU device initialization failed: {0}")]
    DeviceInit(String),
}

impl PresentError {
    pub fn allocation(resource: &'static str, reason: impl Into<String>) -> Self {
        Self::Allocation {
            resource,
            reason: reason.into(),
        }
    }

    /// ### English
    /// Returns whether the failure is transient (the next frame may succeed without intervention).
    ///
    /// ### 中文
    /// 返回该错误是否为暂时性错误（下一帧无需干预即可能成功）。
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ZeroSize { .. })
    }

    /// ### English
    /// Returns whether the failure poisons the current surface generation.
    ///
    /// ### 中文
    /// 返回该错误是否会使当前表面代（generation）失效。
    pub fn is_fatal_for_surface(&self) -> bool {
        matches!(
            self,
            Self::IncompleteAttachment { .. } | Self::Allocation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_zero_size_is_transient() {
        assert!(PresentError::ZeroSize { width: 0, height: 10 }.is_transient());
        assert!(!PresentError::IncompleteAttachment { status: 0x8cd6 }.is_transient());
        assert!(!PresentError::allocation("framebuffer", "out of memory").is_transient());
        assert!(!PresentError::ContextClosed.is_transient());
    }

    #[test]
    fn attachment_and_allocation_failures_share_the_fatal_path() {
        assert!(PresentError::IncompleteAttachment { status: 0x8cd6 }.is_fatal_for_surface());
        assert!(PresentError::allocation("color buffer", "no memory").is_fatal_for_surface());
        assert!(!PresentError::ZeroSize { width: 0, height: 0 }.is_fatal_for_surface());
        assert!(!PresentError::ContextClosed.is_fatal_for_surface());
    }

    #[test]
    fn messages_name_the_failed_resource() {
        let err = PresentError::allocation("framebuffer", "GL_OUT_OF_MEMORY");
        assert_eq!(
            err.to_string(),
            "failed to allocate framebuffer: GL_OUT_OF_MEMORY"
        );
        let err = PresentError::IncompleteAttachment { status: 0x8cd6 };
        assert_eq!(
            err.to_string(),
            "render surface attachment incomplete (status 0x8cd6)"
        );
    }
}
