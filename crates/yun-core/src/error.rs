//! 统一错误类型定义.
//!
//! 所有 Yun crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// Yun 统一错误类型
#[derive(Debug, Error)]
pub enum YunError {
    /// 无效参数 (调用方传入的参数不满足前置条件)
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 无效数据 (码流语法或参数集前后矛盾, 当前图像应丢弃)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 不支持的操作 (例如 AMVP 预测单元进入合并引擎)
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 资源耗尽 (运动场存储无法再保留仍被引用的图像)
    #[error("资源耗尽: {0}")]
    ResourceExhausted(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

/// Yun 统一 Result 类型
pub type YunResult<T> = Result<T, YunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_keeps_detail() {
        let err = YunError::InvalidData("merge_idx=5 超出范围".into());
        assert_eq!(err.to_string(), "无效数据: merge_idx=5 超出范围");
    }

    #[test]
    fn test_io_error_converts() {
        fn open() -> YunResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))?;
            Ok(())
        }
        assert!(matches!(open(), Err(YunError::Io(_))), "io::Error 应自动转换");
    }
}
