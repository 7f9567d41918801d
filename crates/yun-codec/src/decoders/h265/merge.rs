//! 合并模式运动推导 (8.5.3.2.1 ~ 8.5.3.2.5).
//!
//! 候选按固定顺序追加: 空域 -> 时域 -> 组合双向 (B slice) -> 零运动,
//! 之后按 merge_idx 选择, 8x4/4x8 块再去掉双向预测.

use log::trace;
use yun_core::{PbMotion, YunResult};

use super::combined::derive_combined_candidates;
use super::merge_list::{
    CandidateSource, MergeCandidate, MergeCandidateList, restrict_bi_prediction,
    select_merge_candidate,
};
use super::motion_field::MotionField;
use super::params::SliceHeader;
use super::partition::{CodingUnit, PredictionUnit};
use super::picture::CurrentPicture;
use super::spatial::derive_spatial_candidates;
use super::temporal::derive_temporal_candidate;
use super::zero::derive_zero_candidates;

/// 合并推导的只读上下文
#[derive(Debug, Clone, Copy)]
pub struct MergeContext<'a> {
    /// 当前图像 (含已提交的运动场)
    pub picture: &'a CurrentPicture,
    /// 当前 slice
    pub slice: &'a SliceHeader,
    /// 共位图像的运动场
    pub collocated: Option<&'a MotionField>,
}

impl<'a> MergeContext<'a> {
    pub fn new(
        picture: &'a CurrentPicture,
        slice: &'a SliceHeader,
        collocated: Option<&'a MotionField>,
    ) -> Self {
        Self {
            picture,
            slice,
            collocated,
        }
    }

    /// SPS 与 slice 两级开关都打开时才使用时域候选
    pub fn temporal_mvp_enabled(&self) -> bool {
        self.picture.params().temporal_mvp_enabled
            && self.slice.temporal_mvp_enabled
            && self.slice.slice_type.is_inter()
    }
}

/// 一个 PU 的合并推导结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// 原始预测块 (未做单一合并列表替换)
    pub pu: PredictionUnit,
    pub merge_idx: u8,
    /// 完整候选列表
    pub list: MergeCandidateList,
    /// 被选中的候选
    pub candidate: MergeCandidate,
    /// 最终运动 (已应用小块双向限制)
    pub motion: PbMotion,
}

impl MergeOutcome {
    pub fn source(&self) -> CandidateSource {
        self.candidate.source
    }
}

/// singleMCLFlag: Log2ParMrgLevel > 2 且 CU 为 8x8 时, 所有 PU 共用整 CU 的候选列表
pub fn is_single_merge_list(log2_parallel_merge_level: u8, cb_size: u32) -> bool {
    log2_parallel_merge_level > 2 && cb_size == 8
}

/// 为预测块构建完整的合并候选列表 (长度等于 MaxNumMergeCand)
pub fn build_merge_candidate_list(
    ctx: &MergeContext<'_>,
    pu: &PredictionUnit,
    single_mcl: bool,
) -> YunResult<MergeCandidateList> {
    let mut list = MergeCandidateList::new(ctx.slice.max_num_merge_cand);

    let spatial = derive_spatial_candidates(ctx.picture, pu, single_mcl);
    for (pos, motion) in spatial.iter() {
        list.push(CandidateSource::Spatial(pos), motion);
    }
    if let Some(col) = derive_temporal_candidate(ctx, pu)? {
        list.push(CandidateSource::Temporal, col);
    }
    derive_combined_candidates(ctx.slice, &mut list)?;
    derive_zero_candidates(ctx.slice, &mut list)?;
    Ok(list)
}

/// 推导 CU 第 `part_idx` 个 PU 的合并运动
pub fn derive_merge_motion(
    ctx: &MergeContext<'_>,
    cu: &CodingUnit,
    part_idx: u8,
) -> YunResult<MergeOutcome> {
    let pu = PredictionUnit::from_cu(cu, part_idx)?;
    let merge_idx = cu.merge_idx(part_idx)?;
    let single_mcl =
        is_single_merge_list(ctx.picture.params().log2_parallel_merge_level, pu.cb_size);
    let derive_pu = if single_mcl { pu.as_whole_cu() } else { pu };

    let list = build_merge_candidate_list(ctx, &derive_pu, single_mcl)?;
    let candidate = select_merge_candidate(&list, merge_idx)?;
    let motion = restrict_bi_prediction(candidate.motion, pu.width, pu.height);
    trace!(
        "HEVC: PU ({},{}) {}x{} partIdx={} merge_idx={} -> {} {}",
        pu.x, pu.y, pu.width, pu.height, part_idx, merge_idx, candidate.source, motion
    );
    Ok(MergeOutcome {
        pu,
        merge_idx,
        list,
        candidate,
        motion,
    })
}
