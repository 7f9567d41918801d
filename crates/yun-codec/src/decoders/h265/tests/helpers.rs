use yun_core::{MotionVector, PbMotion};

use super::super::{
    CodingUnit, MergeConfig, MergeDecoder, MergeOutcome, NullSampleSink, PartMode, PictureParams,
    PredictionUnit, RefPicture, SliceHeader, SliceId, SliceType, TileLayout,
};

/// 64x64 图像, 16x16 CTB, 4x4 最小变换块
pub fn build_test_params(log2_parallel_merge_level: u8, temporal_mvp_enabled: bool) -> PictureParams {
    PictureParams {
        width: 64,
        height: 64,
        log2_ctb_size: 4,
        log2_min_tb_size: 2,
        log2_parallel_merge_level,
        temporal_mvp_enabled,
        tiles: TileLayout::Single,
    }
}

/// P slice, L0 = [POC 0]
pub fn build_p_slice(max_num_merge_cand: u8) -> SliceHeader {
    SliceHeader {
        slice_addr_rs: 0,
        slice_type: SliceType::P,
        max_num_merge_cand,
        num_ref_idx_active: [1, 0],
        ref_pic_list: [vec![RefPicture::short_term(0)], vec![]],
        temporal_mvp_enabled: false,
        collocated_from_l0: true,
        collocated_ref_idx: 0,
    }
}

/// B slice, L0 = [POC 0, POC 4], L1 = [POC 16, POC 0]
pub fn build_b_slice(max_num_merge_cand: u8) -> SliceHeader {
    SliceHeader {
        slice_addr_rs: 0,
        slice_type: SliceType::B,
        max_num_merge_cand,
        num_ref_idx_active: [2, 2],
        ref_pic_list: [
            vec![RefPicture::short_term(0), RefPicture::short_term(4)],
            vec![RefPicture::short_term(16), RefPicture::short_term(0)],
        ],
        temporal_mvp_enabled: false,
        collocated_from_l0: false,
        collocated_ref_idx: 0,
    }
}

pub fn build_test_decoder() -> MergeDecoder {
    MergeDecoder::new(MergeConfig::default())
}

/// 开始一幅图像并注册单个 slice
pub fn begin_test_picture(
    dec: &mut MergeDecoder,
    poc: i32,
    params: PictureParams,
    slice: SliceHeader,
) -> SliceId {
    dec.begin_picture(poc, params).expect("开始图像失败");
    dec.add_slice(slice).expect("注册 slice 失败")
}

/// 以 AMVP 方式写入一个已解码邻块
pub fn put_neighbour(
    dec: &mut MergeDecoder,
    slice: SliceId,
    rect: (u32, u32, u32, u32),
    motion: PbMotion,
) {
    let (x, y, width, height) = rect;
    let pu = PredictionUnit {
        x_cb: x,
        y_cb: y,
        cb_size: width.max(height),
        x,
        y,
        width,
        height,
        part_idx: 0,
        part_mode: PartMode::Part2Nx2N,
    };
    dec.store_inter_motion(slice, &pu, motion)
        .expect("写入邻块运动失败");
}

pub fn decode_cu(dec: &mut MergeDecoder, slice: SliceId, cu: &CodingUnit) -> Vec<MergeOutcome> {
    dec.decode_coding_unit(slice, cu, &mut NullSampleSink)
        .expect("CU 解码失败")
}

pub fn mv(x: i16, y: i16) -> MotionVector {
    MotionVector::new(x, y)
}
