//! 合并推导端到端流水.
//!
//! 通过 `yun` 门面 crate 驱动多幅图像、多 slice/tile 的解码流程, 检查运动场
//! 写入、样本生成回调以及图像间的时域引用.

use yun::codec::decoders::h265::{
    CandidateSource, CodingUnit, InterSampleSink, MergeConfig, MergeDecoder, NullSampleSink,
    PartMode, PictureParams, PredictionUnit, RefPicture, SliceHeader, SliceType,
    SpatialPosition, TileLayout,
};
use yun::core::{MotionVector, PbMotion, YunError, YunResult};

fn params(tiles: TileLayout, temporal_mvp_enabled: bool) -> PictureParams {
    PictureParams {
        width: 64,
        height: 64,
        log2_ctb_size: 4,
        log2_min_tb_size: 2,
        log2_parallel_merge_level: 2,
        temporal_mvp_enabled,
        tiles,
    }
}

fn p_slice(slice_addr_rs: u32, refs: &[i32], temporal_mvp_enabled: bool) -> SliceHeader {
    SliceHeader {
        slice_addr_rs,
        slice_type: SliceType::P,
        max_num_merge_cand: 5,
        num_ref_idx_active: [refs.len() as u8, 0],
        ref_pic_list: [
            refs.iter().map(|&poc| RefPicture::short_term(poc)).collect(),
            vec![],
        ],
        temporal_mvp_enabled,
        collocated_from_l0: true,
        collocated_ref_idx: 0,
    }
}

fn whole_block(x: u32, y: u32, size: u32) -> PredictionUnit {
    PredictionUnit {
        x_cb: x,
        y_cb: y,
        cb_size: size,
        x,
        y,
        width: size,
        height: size,
        part_idx: 0,
        part_mode: PartMode::Part2Nx2N,
    }
}

/// 记录每次样本生成请求
#[derive(Default)]
struct RecordingSink {
    calls: Vec<(PredictionUnit, PbMotion)>,
}

impl InterSampleSink for RecordingSink {
    fn generate_inter_prediction_samples(
        &mut self,
        pu: &PredictionUnit,
        motion: &PbMotion,
    ) -> YunResult<()> {
        self.calls.push((*pu, *motion));
        Ok(())
    }
}

/// 总是失败的样本生成
struct FailingSink;

impl InterSampleSink for FailingSink {
    fn generate_inter_prediction_samples(
        &mut self,
        _pu: &PredictionUnit,
        _motion: &PbMotion,
    ) -> YunResult<()> {
        Err(YunError::Internal("参考图像样本缺失".into()))
    }
}

#[test]
fn test_full_picture_then_temporal_reference() {
    let mut dec = MergeDecoder::new(MergeConfig::default());

    // POC 0: 首个 CTB 由 AMVP 写入, 其余 CTB 全部为跳过 CU
    dec.begin_picture(0, params(TileLayout::Single, true)).unwrap();
    let slice = dec.add_slice(p_slice(0, &[-8], false)).unwrap();
    let amvp = PbMotion::uni_l0(0, MotionVector::new(12, -4));
    dec.store_inter_motion(slice, &whole_block(0, 0, 16), amvp).unwrap();
    let mut sink = RecordingSink::default();
    for ctb in 1..16u32 {
        let cu = CodingUnit::skip((ctb % 4) * 16, (ctb / 4) * 16, 4, 0);
        let out = dec.decode_coding_unit(slice, &cu, &mut sink).unwrap();
        assert_eq!(out[0].list.len(), 5);
    }
    assert_eq!(sink.calls.len(), 15);
    let poc0 = dec.finish_picture().unwrap();
    for y in (0..64).step_by(4) {
        for x in (0..64).step_by(4) {
            let record = poc0.motion_at(x, y).expect("整幅图像都应被写入");
            assert_eq!(record.ref_poc[0], -8);
        }
    }

    // POC 8: 所有 CU 都应能取到时域候选
    dec.begin_picture(8, params(TileLayout::Single, true)).unwrap();
    let slice = dec.add_slice(p_slice(0, &[0], true)).unwrap();
    let out = dec
        .decode_coding_unit(slice, &CodingUnit::skip(0, 0, 4, 0), &mut NullSampleSink)
        .unwrap();
    assert_eq!(out[0].source(), CandidateSource::Temporal);
    // 右下角跨 CTB 行, 取中心 (8,8); POC 距离都是 8, 不缩放
    assert_eq!(out[0].motion, amvp);
    dec.finish_picture().unwrap();
    assert_eq!(dec.store().pocs(), vec![0, 8]);
}

#[test]
fn test_sink_sees_final_motion_in_order() {
    let mut dec = MergeDecoder::new(MergeConfig::default());
    dec.begin_picture(0, params(TileLayout::Single, false)).unwrap();
    let slice = dec.add_slice(p_slice(0, &[-4, -8], false)).unwrap();
    let left = PbMotion::uni_l0(1, MotionVector::new(-3, 5));
    dec.store_inter_motion(slice, &whole_block(0, 16, 16), left).unwrap();

    let mut sink = RecordingSink::default();
    let cu = CodingUnit::merge(16, 16, 4, PartMode::PartNx2N, &[0, 1]);
    let out = dec.decode_coding_unit(slice, &cu, &mut sink).unwrap();
    assert_eq!(sink.calls.len(), 2);
    for (o, (pu, motion)) in out.iter().zip(&sink.calls) {
        assert_eq!(&o.pu, pu);
        assert_eq!(&o.motion, motion);
    }
    assert_eq!(sink.calls[0].0.x, 16);
    assert_eq!(sink.calls[1].0.x, 24);
    assert_eq!(out[0].source(), CandidateSource::Spatial(SpatialPosition::A1));
    assert_eq!(out[0].motion, left);
}

#[test]
fn test_sink_error_after_motion_written() {
    let mut dec = MergeDecoder::new(MergeConfig::default());
    dec.begin_picture(0, params(TileLayout::Single, false)).unwrap();
    let slice = dec.add_slice(p_slice(0, &[-4], false)).unwrap();
    let err = dec
        .decode_coding_unit(slice, &CodingUnit::skip(0, 0, 4, 0), &mut FailingSink)
        .unwrap_err();
    assert!(matches!(err, YunError::Internal(_)), "err={}", err);
    // 先写运动场, 再生成样本
    assert!(dec.current_picture().unwrap().motion().is_written(0, 0));
    assert_eq!(dec.discard_picture(), Some(0));
    assert!(dec.store().is_empty(), "丢弃的图像不进入运动场存储");
}

/// 左侧 CTB (16,0) 已有运动, 解码 (32,0) 处的 CU
fn decode_next_to_neighbour(tiles: TileLayout, second_slice: bool) -> CandidateSource {
    let mut dec = MergeDecoder::new(MergeConfig::default());
    dec.begin_picture(0, params(tiles, false)).unwrap();
    let first = dec.add_slice(p_slice(0, &[-4], false)).unwrap();
    let left = PbMotion::uni_l0(0, MotionVector::new(7, 7));
    dec.store_inter_motion(first, &whole_block(16, 0, 16), left).unwrap();
    let current = if second_slice {
        dec.add_slice(p_slice(2, &[-4], false)).unwrap()
    } else {
        first
    };
    let out = dec
        .decode_coding_unit(current, &CodingUnit::skip(32, 0, 4, 0), &mut NullSampleSink)
        .unwrap();
    out[0].source()
}

#[test]
fn test_slice_and_tile_boundaries() {
    assert_eq!(
        decode_next_to_neighbour(TileLayout::Single, false),
        CandidateSource::Spatial(SpatialPosition::A1)
    );
    assert_eq!(
        decode_next_to_neighbour(TileLayout::Single, true),
        CandidateSource::Zero { zero_idx: 0 },
        "不同 slice 的邻块不可用"
    );
    assert_eq!(
        decode_next_to_neighbour(TileLayout::Uniform { columns: 2, rows: 1 }, false),
        CandidateSource::Zero { zero_idx: 0 },
        "不同 tile 的邻块不可用"
    );
}

#[test]
fn test_region_decode_through_facade() {
    let mut dec = MergeDecoder::new(MergeConfig::default());
    let mut p = params(TileLayout::Single, false);
    p.log2_parallel_merge_level = 4;
    dec.begin_picture(0, p).unwrap();
    let slice = dec.add_slice(p_slice(0, &[-4], false)).unwrap();
    let cus = [
        CodingUnit::skip(16, 16, 3, 0),
        CodingUnit::skip(24, 16, 3, 1),
        CodingUnit::skip(16, 24, 3, 2),
        CodingUnit::skip(24, 24, 3, 3),
    ];
    let mut sink = RecordingSink::default();
    let out = dec.decode_region(slice, &cus, &mut sink).unwrap();
    assert_eq!(out.len(), 4);
    assert_eq!(sink.calls.len(), 4);
    let idx: Vec<_> = out.iter().map(|o| o.source()).collect();
    assert_eq!(
        idx,
        (0..4).map(|i| CandidateSource::Zero { zero_idx: i }).collect::<Vec<_>>()
    );
}
