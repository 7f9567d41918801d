//! 合并候选列表与候选选择.

use std::fmt;

use yun_core::{ListMotion, PbMotion, RefList, YunError, YunResult};

use super::spatial::SpatialPosition;

/// 候选来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// 空域邻块
    Spatial(SpatialPosition),
    /// 共位图像
    Temporal,
    /// 两个已有候选组合而成的双向候选 (列表内下标)
    Combined { l0_cand: u8, l1_cand: u8 },
    /// 零运动填充
    Zero { zero_idx: u8 },
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateSource::Spatial(pos) => write!(f, "{:?}", pos),
            CandidateSource::Temporal => f.write_str("Col"),
            CandidateSource::Combined { l0_cand, l1_cand } => {
                write!(f, "Comb({},{})", l0_cand, l1_cand)
            }
            CandidateSource::Zero { zero_idx } => write!(f, "Zero{}", zero_idx),
        }
    }
}

/// 一个合并候选
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeCandidate {
    pub source: CandidateSource,
    pub motion: PbMotion,
}

/// 有序合并候选列表, 长度不超过 MaxNumMergeCand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCandidateList {
    max: u8,
    candidates: Vec<MergeCandidate>,
}

impl MergeCandidateList {
    pub fn new(max_num_merge_cand: u8) -> Self {
        Self {
            max: max_num_merge_cand,
            candidates: Vec::with_capacity(max_num_merge_cand as usize),
        }
    }

    /// MaxNumMergeCand
    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// 列表已达 MaxNumMergeCand
    pub fn is_full(&self) -> bool {
        self.candidates.len() >= self.max as usize
    }

    pub fn get(&self, idx: usize) -> Option<&MergeCandidate> {
        self.candidates.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MergeCandidate> {
        self.candidates.iter()
    }

    /// 追加候选, 列表已满时丢弃并返回 `false`
    pub fn push(&mut self, source: CandidateSource, motion: PbMotion) -> bool {
        if self.is_full() {
            return false;
        }
        self.candidates.push(MergeCandidate { source, motion });
        true
    }
}

impl<'a> IntoIterator for &'a MergeCandidateList {
    type Item = &'a MergeCandidate;
    type IntoIter = std::slice::Iter<'a, MergeCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

/// 按 merge_idx 选择候选
pub fn select_merge_candidate(
    list: &MergeCandidateList,
    merge_idx: u8,
) -> YunResult<MergeCandidate> {
    if merge_idx >= list.max() {
        return Err(YunError::InvalidData(format!(
            "HEVC: merge_idx={} 超出 MaxNumMergeCand={}",
            merge_idx,
            list.max()
        )));
    }
    list.get(merge_idx as usize).copied().ok_or_else(|| {
        YunError::Internal(format!(
            "HEVC: 合并列表仅有 {} 项, 无法选择 merge_idx={}",
            list.len(),
            merge_idx
        ))
    })
}

/// 8x4/4x8 预测块禁止双向预测, 此时丢弃 L1
pub fn restrict_bi_prediction(motion: PbMotion, orig_width: u32, orig_height: u32) -> PbMotion {
    if motion.is_bi() && orig_width + orig_height == 12 {
        motion.with_list(RefList::L1, ListMotion::unused())
    } else {
        motion
    }
}
