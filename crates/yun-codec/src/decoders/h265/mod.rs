//! H.265/HEVC 合并模式运动推导.
//!
//! 对跳过/合并模式的每个预测单元, 从已解码的邻块运动、共位图像运动和
//! slice 参数重建编码端选择的运动矢量与参考索引.
//!
//! 推导顺序:
//! - 空域候选 A1, B1, B0, A0, B2 (可用性, 并行合并区域, 去重)
//! - 时域候选 Col (右下角/中心, POC 距离缩放)
//! - 组合双向候选 (仅 B slice)
//! - 零运动填充, 直到 MaxNumMergeCand
//!
//! # 限制
//! - 不处理 AMVP 与帧内预测单元
//! - 不做运动补偿, 样本生成通过 [`InterSampleSink`] 交给外部

mod availability;
mod combined;
mod layout;
mod merge;
mod merge_list;
mod motion_field;
mod orchestrator;
mod params;
mod partition;
mod picture;
mod spatial;
mod temporal;
mod zero;

#[cfg(test)]
mod tests;

pub use availability::{prediction_block_motion, same_merge_region, zscan_available};
pub use combined::{COMBINED_PAIRS, derive_combined_candidates};
pub use layout::PictureLayout;
pub use merge::{
    MergeContext, MergeOutcome, build_merge_candidate_list, derive_merge_motion,
    is_single_merge_list,
};
pub use merge_list::{
    CandidateSource, MergeCandidate, MergeCandidateList, restrict_bi_prediction,
    select_merge_candidate,
};
pub use motion_field::{MotionField, MotionFieldStore, MotionRecord};
pub use orchestrator::{InterSampleSink, MergeDecoder, NullSampleSink};
pub use params::{PictureParams, RefPicture, SliceHeader, SliceType, TileLayout};
pub use partition::{CodingUnit, CuPredMode, PartMode, PredictionMode, PredictionUnit, PuSyntax};
pub use picture::{CurrentPicture, SliceId};
pub use spatial::{SpatialCandidates, SpatialPosition, derive_spatial_candidates};
pub use temporal::{derive_temporal_candidate, dist_scale_factor, scale_mv};
pub use zero::derive_zero_candidates;

/// 默认保留的运动场数量 (16 个参考 + 当前图像)
pub const DEFAULT_MOTION_FIELD_CAPACITY: usize = 17;

/// 合并解码器配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeConfig {
    /// 运动场存储最多保留的已完成图像数
    pub motion_field_capacity: usize,
    /// 同一并行合并区域内的 PU 是否并发推导
    pub parallel_regions: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            motion_field_capacity: DEFAULT_MOTION_FIELD_CAPACITY,
            parallel_regions: true,
        }
    }
}
