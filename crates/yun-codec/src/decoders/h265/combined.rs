//! 组合双向合并候选 (仅 B slice).

use log::trace;
use yun_core::{PbMotion, RefList, YunError, YunResult};

use super::merge_list::{CandidateSource, MergeCandidateList};
use super::params::{SliceHeader, SliceType};

/// combIdx -> (l0CandIdx, l1CandIdx)
pub const COMBINED_PAIRS: [(u8, u8); 12] = [
    (0, 1),
    (1, 0),
    (0, 2),
    (2, 0),
    (1, 2),
    (2, 1),
    (0, 3),
    (3, 0),
    (1, 3),
    (3, 1),
    (2, 3),
    (3, 2),
];

/// 由已有候选两两组合生成双向候选, 追加到列表末尾
pub fn derive_combined_candidates(
    slice: &SliceHeader,
    list: &mut MergeCandidateList,
) -> YunResult<()> {
    let num_orig = list.len();
    if slice.slice_type != SliceType::B || num_orig <= 1 || list.is_full() {
        return Ok(());
    }
    let max_comb = num_orig * (num_orig - 1);
    for comb_idx in 0..max_comb {
        let &(l0_idx, l1_idx) = COMBINED_PAIRS.get(comb_idx).ok_or_else(|| {
            YunError::InvalidData(format!("HEVC: combIdx={} 超出组合表", comb_idx))
        })?;
        let (Some(l0_cand), Some(l1_cand)) =
            (list.get(l0_idx as usize), list.get(l1_idx as usize))
        else {
            return Err(YunError::Internal(format!(
                "HEVC: 组合候选 ({},{}) 超出原始候选数 {}",
                l0_idx, l1_idx, num_orig
            )));
        };
        let l0 = l0_cand.motion.list(RefList::L0);
        let l1 = l1_cand.motion.list(RefList::L1);
        if !l0.pred_flag() || !l1.pred_flag() {
            continue;
        }
        let poc_l0 = slice.ref_picture(RefList::L0, l0.ref_idx())?.poc;
        let poc_l1 = slice.ref_picture(RefList::L1, l1.ref_idx())?.poc;
        if poc_l0 == poc_l1 && l0.mv() == l1.mv() {
            continue;
        }
        trace!(
            "HEVC: 组合候选 combIdx={} l0Cand={} l1Cand={}",
            comb_idx, l0_idx, l1_idx
        );
        list.push(
            CandidateSource::Combined {
                l0_cand: l0_idx,
                l1_cand: l1_idx,
            },
            PbMotion::new(l0, l1),
        );
        if list.is_full() {
            break;
        }
    }
    Ok(())
}
