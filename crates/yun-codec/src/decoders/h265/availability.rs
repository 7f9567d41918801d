//! 邻块可用性判断.
//!
//! - z-scan 可用性 (6.4.1): 图像边界, 解码顺序, slice 与 tile 边界.
//! - 预测块可用性 (6.4.2): 同一 CU 内 NxN 第二块不能引用第三块, 帧内块不可用.
//! - 并行合并区域: 同一区域内的邻块对合并推导不可见.

use super::motion_field::MotionRecord;
use super::partition::PredictionUnit;
use super::picture::CurrentPicture;

/// z-scan 顺序下 (x_nb, y_nb) 对当前位置 (x_curr, y_curr) 是否可用
pub fn zscan_available(
    picture: &CurrentPicture,
    x_curr: u32,
    y_curr: u32,
    x_nb: i32,
    y_nb: i32,
) -> bool {
    let layout = picture.layout();
    if !layout.contains(x_nb, y_nb) {
        return false;
    }
    let (x_nb, y_nb) = (x_nb as u32, y_nb as u32);
    if layout.min_tb_addr_zs(x_nb, y_nb) > layout.min_tb_addr_zs(x_curr, y_curr) {
        return false;
    }
    let (Some(nb_slice), Some(curr_slice)) = (
        picture.slice_at(x_nb as i32, y_nb as i32),
        picture.slice_at(x_curr as i32, y_curr as i32),
    ) else {
        return false;
    };
    if nb_slice.slice_addr_rs != curr_slice.slice_addr_rs {
        return false;
    }
    layout.tile_id(x_nb, y_nb) == layout.tile_id(x_curr, y_curr)
}

/// 预测块可用性判断, 可用时返回邻块运动
pub fn prediction_block_motion(
    picture: &CurrentPicture,
    pu: &PredictionUnit,
    x_nb: i32,
    y_nb: i32,
) -> Option<MotionRecord> {
    let x_cb = pu.x_cb as i32;
    let y_cb = pu.y_cb as i32;
    let n_cbs = pu.cb_size as i32;
    let same_cb = x_cb <= x_nb && y_cb <= y_nb && x_cb + n_cbs > x_nb && y_cb + n_cbs > y_nb;

    let available = if !same_cb {
        zscan_available(picture, pu.x, pu.y, x_nb, y_nb)
    } else {
        // NxN 的 partIdx=1 不能引用尚未解码的 partIdx=2
        !((pu.width << 1) == pu.cb_size
            && (pu.height << 1) == pu.cb_size
            && pu.part_idx == 1
            && y_cb + pu.height as i32 <= y_nb
            && x_cb + pu.width as i32 > x_nb)
    };
    if !available {
        return None;
    }
    // 未写入运动的块为帧内块或尚未解码
    picture.motion().motion_at(x_nb, y_nb)
}

/// 两个位置是否位于同一并行合并区域
pub fn same_merge_region(
    x_pb: u32,
    y_pb: u32,
    x_nb: i32,
    y_nb: i32,
    log2_parallel_merge_level: u8,
) -> bool {
    let shift = u32::from(log2_parallel_merge_level);
    (x_pb as i32 >> shift) == (x_nb >> shift) && (y_pb as i32 >> shift) == (y_nb >> shift)
}
