use yun_core::PbMotion;

use super::super::{
    CandidateSource, CodingUnit, MergeConfig, MergeDecoder, MergeOutcome, NullSampleSink,
    PartMode, SpatialPosition,
};
use super::helpers::*;

#[test]
fn test_same_region_neighbour_is_invisible() {
    let left = PbMotion::uni_l0(0, mv(6, 0));
    let run = |log2_pml: u8| {
        let mut dec = build_test_decoder();
        let params = build_test_params(log2_pml, false);
        let slice = begin_test_picture(&mut dec, 8, params, build_p_slice(5));
        put_neighbour(&mut dec, slice, (0, 16, 16, 16), left);
        let a = decode_cu(&mut dec, slice, &CodingUnit::skip(16, 16, 3, 0));
        let b = decode_cu(&mut dec, slice, &CodingUnit::skip(24, 16, 3, 0));
        (a.into_iter().next().unwrap(), b.into_iter().next().unwrap())
    };

    // 16x16 并行合并区域: 第二个 CU 看不到同区域内第一个 CU 的运动
    let (a, b) = run(4);
    assert_eq!(a.motion, left);
    assert!(
        b.list
            .iter()
            .all(|c| !matches!(c.source, CandidateSource::Spatial(_))),
        "同一并行合并区域内的邻块不可用"
    );
    assert_eq!(b.source(), CandidateSource::Zero { zero_idx: 0 });

    // 4x4 区域: 同样的布局下 A1 可用
    let (_, b) = run(2);
    assert_eq!(b.source(), CandidateSource::Spatial(SpatialPosition::A1));
    assert_eq!(b.motion, left);
}

#[test]
fn test_single_merge_list_shared_by_all_parts() {
    let mut dec = build_test_decoder();
    let slice = begin_test_picture(&mut dec, 8, build_test_params(3, false), build_p_slice(5));
    put_neighbour(&mut dec, slice, (0, 16, 16, 16), PbMotion::uni_l0(0, mv(3, 3)));
    put_neighbour(&mut dec, slice, (16, 0, 16, 16), PbMotion::uni_l0(0, mv(5, 5)));
    let cu = CodingUnit::merge(16, 16, 3, PartMode::PartNx2N, &[0, 1]);
    let out = decode_cu(&mut dec, slice, &cu);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].list, out[1].list, "8x8 CU 的两个 PU 共用整 CU 的候选列表");
    assert_eq!(
        out[1].list.get(0).map(|c| c.source),
        Some(CandidateSource::Spatial(SpatialPosition::A1)),
        "单一合并列表下第二个 PU 不排除 A1"
    );
    assert_eq!(out[0].motion, PbMotion::uni_l0(0, mv(3, 3)));
    assert_eq!(out[1].motion, PbMotion::uni_l0(0, mv(5, 5)));
    assert_eq!((out[1].pu.x, out[1].pu.width), (20, 4), "写入的仍是原始 PU 区域");
}

#[test]
fn test_single_merge_list_keeps_small_pu_restriction() {
    let mut dec = build_test_decoder();
    let slice = begin_test_picture(&mut dec, 8, build_test_params(3, false), build_b_slice(5));
    let bi = PbMotion::bi(1, mv(-2, 4), 0, mv(6, -6));
    put_neighbour(&mut dec, slice, (0, 16, 16, 16), bi);
    let cu = CodingUnit::merge(16, 16, 3, PartMode::Part2NxN, &[0, 0]);
    for o in decode_cu(&mut dec, slice, &cu) {
        assert_eq!(o.candidate.motion, bi);
        assert_eq!(o.motion, PbMotion::uni_l0(1, mv(-2, 4)), "限制按原始 8x4 尺寸判断");
    }
}

fn build_region() -> Vec<CodingUnit> {
    vec![
        CodingUnit::skip(16, 16, 3, 0),
        CodingUnit::merge(24, 16, 3, PartMode::Part2NxN, &[1, 2]),
        CodingUnit::skip(16, 24, 3, 1),
        CodingUnit::merge(24, 24, 3, PartMode::PartNx2N, &[0, 3]),
    ]
}

fn decode_region_with(parallel_regions: bool) -> (Vec<MergeOutcome>, MergeDecoder) {
    let mut dec = MergeDecoder::new(MergeConfig {
        parallel_regions,
        ..MergeConfig::default()
    });
    let slice = begin_test_picture(&mut dec, 8, build_test_params(4, false), build_b_slice(5));
    put_neighbour(&mut dec, slice, (0, 16, 16, 16), PbMotion::bi(0, mv(1, 2), 1, mv(3, 4)));
    put_neighbour(&mut dec, slice, (16, 0, 16, 16), PbMotion::uni_l1(0, mv(-5, 7)));
    put_neighbour(&mut dec, slice, (0, 0, 16, 16), PbMotion::uni_l0(1, mv(9, -1)));
    put_neighbour(&mut dec, slice, (32, 0, 16, 16), PbMotion::uni_l0(0, mv(2, 2)));
    let out = dec
        .decode_region(slice, &build_region(), &mut NullSampleSink)
        .expect("区域解码失败");
    (out, dec)
}

#[test]
fn test_parallel_region_matches_sequential() {
    let (par, par_dec) = decode_region_with(true);
    let (seq, seq_dec) = decode_region_with(false);
    assert_eq!(par.len(), 6);
    assert_eq!(par, seq, "并发推导与顺序推导结果必须一致");

    let par_field = par_dec.current_picture().unwrap().motion();
    let seq_field = seq_dec.current_picture().unwrap().motion();
    for y in (16..32).step_by(4) {
        for x in (16..32).step_by(4) {
            assert!(par_field.is_written(x, y), "({},{}) 应已写入", x, y);
            assert_eq!(par_field.motion_at(x, y), seq_field.motion_at(x, y));
        }
    }
}

#[test]
fn test_region_matches_per_cu_decode() {
    let (par, _) = decode_region_with(true);
    let mut dec = build_test_decoder();
    let slice = begin_test_picture(&mut dec, 8, build_test_params(4, false), build_b_slice(5));
    put_neighbour(&mut dec, slice, (0, 16, 16, 16), PbMotion::bi(0, mv(1, 2), 1, mv(3, 4)));
    put_neighbour(&mut dec, slice, (16, 0, 16, 16), PbMotion::uni_l1(0, mv(-5, 7)));
    put_neighbour(&mut dec, slice, (0, 0, 16, 16), PbMotion::uni_l0(1, mv(9, -1)));
    put_neighbour(&mut dec, slice, (32, 0, 16, 16), PbMotion::uni_l0(0, mv(2, 2)));
    let mut per_cu = Vec::new();
    for cu in build_region() {
        per_cu.extend(decode_cu(&mut dec, slice, &cu));
    }
    assert_eq!(par, per_cu);
}
