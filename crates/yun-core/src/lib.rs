//! # yun-core
//!
//! Yun (运) 运动推导库的核心类型, 提供错误处理与运动信息基础类型.
//!
//! 本 crate 不依赖具体的编码标准, 供 `yun-codec` 中的 HEVC 合并引擎使用.

pub mod error;
pub mod motion;

// 重导出常用类型
pub use error::{YunError, YunResult};
pub use motion::{ListMotion, MAX_REF_IDX, MotionVector, PbMotion, RefList};
