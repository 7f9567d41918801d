//! 零运动合并候选填充.

use yun_core::{ListMotion, MotionVector, PbMotion, YunResult};

use super::merge_list::{CandidateSource, MergeCandidateList};
use super::params::{SliceHeader, SliceType};

/// 用零运动候选将列表填满到 MaxNumMergeCand
pub fn derive_zero_candidates(
    slice: &SliceHeader,
    list: &mut MergeCandidateList,
) -> YunResult<()> {
    let num_ref_idx = match slice.slice_type {
        SliceType::B => slice.num_ref_idx_active[0].min(slice.num_ref_idx_active[1]),
        _ => slice.num_ref_idx_active[0],
    };
    let mut zero_idx = 0u8;
    while !list.is_full() {
        let ref_idx = if zero_idx < num_ref_idx { zero_idx } else { 0 };
        let zero = ListMotion::new(ref_idx, MotionVector::ZERO)?;
        let motion = match slice.slice_type {
            SliceType::B => PbMotion::new(zero, zero),
            _ => PbMotion::new(zero, ListMotion::unused()),
        };
        list.push(CandidateSource::Zero { zero_idx }, motion);
        zero_idx = zero_idx.saturating_add(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::h265::params::RefPicture;
    use yun_core::RefList;

    fn build_slice(slice_type: SliceType, active: [u8; 2]) -> SliceHeader {
        let refs = |n: u8| -> Vec<RefPicture> {
            (0..n).map(|i| RefPicture::short_term(i as i32 * 2)).collect()
        };
        SliceHeader {
            slice_addr_rs: 0,
            slice_type,
            max_num_merge_cand: 5,
            num_ref_idx_active: active,
            ref_pic_list: [refs(active[0]), refs(active[1])],
            temporal_mvp_enabled: false,
            collocated_from_l0: true,
            collocated_ref_idx: 0,
        }
    }

    #[test]
    fn test_p_slice_cycles_ref_idx() {
        let slice = build_slice(SliceType::P, [2, 0]);
        let mut list = MergeCandidateList::new(5);
        derive_zero_candidates(&slice, &mut list).unwrap();
        let refs: Vec<i8> = list.iter().map(|c| c.motion.list(RefList::L0).ref_idx()).collect();
        assert_eq!(refs, vec![0, 1, 0, 0, 0]);
        assert!(list.iter().all(|c| !c.motion.list(RefList::L1).pred_flag()), "P slice 不使用 L1");
        let idx: Vec<_> = list.iter().map(|c| c.source).collect();
        assert_eq!(idx[4], CandidateSource::Zero { zero_idx: 4 });
    }

    #[test]
    fn test_b_slice_uses_min_active() {
        let slice = build_slice(SliceType::B, [3, 2]);
        let mut list = MergeCandidateList::new(4);
        derive_zero_candidates(&slice, &mut list).unwrap();
        let refs: Vec<(i8, i8)> = list
            .iter()
            .map(|c| {
                (
                    c.motion.list(RefList::L0).ref_idx(),
                    c.motion.list(RefList::L1).ref_idx(),
                )
            })
            .collect();
        assert_eq!(refs, vec![(0, 0), (1, 1), (0, 0), (0, 0)]);
        assert!(list.iter().all(|c| c.motion.list(RefList::L0).mv() == MotionVector::ZERO));
    }

    #[test]
    fn test_full_list_untouched() {
        let slice = build_slice(SliceType::P, [1, 0]);
        let mut list = MergeCandidateList::new(1);
        list.push(CandidateSource::Temporal, PbMotion::uni_l0(0, MotionVector::new(1, 1)));
        derive_zero_candidates(&slice, &mut list).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).map(|c| c.source), Some(CandidateSource::Temporal));
    }
}
