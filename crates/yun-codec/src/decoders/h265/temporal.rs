//! 时域合并候选 (Col) 推导.
//!
//! 参考索引固定为 0. 先尝试右下角位置, 不可用时回退到中心位置; 两者都对齐到
//! 16x16 压缩运动网格. 共位运动矢量按 POC 距离缩放.

use yun_core::{ListMotion, MotionVector, PbMotion, RefList, YunError, YunResult};

use super::merge::MergeContext;
use super::motion_field::MotionField;
use super::params::SliceType;
use super::partition::PredictionUnit;

/// 按 POC 距离计算缩放因子 (distScaleFactor)
///
/// `col_poc_diff` 不能为 0.
pub fn dist_scale_factor(col_poc_diff: i32, curr_poc_diff: i32) -> i32 {
    let td = col_poc_diff.clamp(-128, 127);
    let tb = curr_poc_diff.clamp(-128, 127);
    let tx = (16384 + (td.abs() >> 1)) / td;
    ((tb * tx + 32) >> 6).clamp(-4096, 4095)
}

/// 按缩放因子缩放运动矢量
pub fn scale_mv(mv: MotionVector, dist_scale_factor: i32) -> MotionVector {
    let scale = |c: i16| {
        let prod = dist_scale_factor * i32::from(c);
        (prod.signum() * ((prod.abs() + 127) >> 8)).clamp(i16::MIN as i32, i16::MAX as i32) as i16
    };
    MotionVector::new(scale(mv.x), scale(mv.y))
}

/// 推导时域候选, 两个列表都不可用时返回 `None`
pub fn derive_temporal_candidate(
    ctx: &MergeContext<'_>,
    pu: &PredictionUnit,
) -> YunResult<Option<PbMotion>> {
    if !ctx.temporal_mvp_enabled() {
        return Ok(None);
    }
    let col = ctx.collocated.ok_or_else(|| {
        YunError::InvalidData(format!(
            "HEVC: POC {} 开启时域 MV 预测, 但共位图像运动场不存在",
            ctx.picture.poc()
        ))
    })?;

    let mv_l0 = temporal_mv_for_list(ctx, pu, col, RefList::L0)?;
    let mv_l1 = if ctx.slice.slice_type == SliceType::B {
        temporal_mv_for_list(ctx, pu, col, RefList::L1)?
    } else {
        None
    };
    if mv_l0.is_none() && mv_l1.is_none() {
        return Ok(None);
    }
    let to_list = |mv: Option<MotionVector>| match mv {
        Some(mv) => ListMotion::new(0, mv),
        None => Ok(ListMotion::unused()),
    };
    Ok(Some(PbMotion::new(to_list(mv_l0)?, to_list(mv_l1)?)))
}

/// 单个列表的时域运动矢量: 右下角优先, 其次中心
fn temporal_mv_for_list(
    ctx: &MergeContext<'_>,
    pu: &PredictionUnit,
    col: &MotionField,
    list: RefList,
) -> YunResult<Option<MotionVector>> {
    let layout = ctx.picture.layout();
    let log2_ctb = u32::from(layout.log2_ctb_size());
    let x_br = pu.x + pu.width;
    let y_br = pu.y + pu.height;
    // 右下角必须与编码块处于同一 CTB 行
    if (pu.y_cb >> log2_ctb) == (y_br >> log2_ctb)
        && y_br < layout.height()
        && x_br < layout.width()
    {
        if let Some(mv) = collocated_mv(ctx, col, list, x_br as i32, y_br as i32)? {
            return Ok(Some(mv));
        }
    }
    let x_ctr = pu.x + (pu.width >> 1);
    let y_ctr = pu.y + (pu.height >> 1);
    collocated_mv(ctx, col, list, x_ctr as i32, y_ctr as i32)
}

/// 共位块运动矢量 (按列表 `list` 的 refIdx=0 缩放)
fn collocated_mv(
    ctx: &MergeContext<'_>,
    col: &MotionField,
    list: RefList,
    x: i32,
    y: i32,
) -> YunResult<Option<MotionVector>> {
    let Some(record) = col.compressed_motion_at(x, y) else {
        return Ok(None);
    };
    let motion = record.motion;
    if !motion.is_inter() {
        return Ok(None);
    }

    let list_col = if !motion.list(RefList::L0).pred_flag() {
        RefList::L1
    } else if !motion.list(RefList::L1).pred_flag() {
        RefList::L0
    } else if ctx.slice.no_backward_pred(ctx.picture.poc()) {
        list
    } else {
        // P slice 推断 collocated_from_l0_flag=1
        let from_l0 = ctx.slice.slice_type != SliceType::B || ctx.slice.collocated_from_l0;
        if from_l0 { RefList::L1 } else { RefList::L0 }
    };

    let target = ctx.slice.ref_picture(list, 0)?;
    if target.long_term != record.is_long_term(list_col) {
        return Ok(None);
    }
    let mv_col = motion.list(list_col).mv();
    let col_poc_diff = col.poc() - record.ref_poc(list_col);
    let curr_poc_diff = ctx.picture.poc() - target.poc;
    if target.long_term || col_poc_diff == curr_poc_diff {
        return Ok(Some(mv_col));
    }
    if col_poc_diff == 0 {
        return Err(YunError::InvalidData(format!(
            "HEVC: 共位图像 POC {} 的运动引用自身",
            col.poc()
        )));
    }
    let dsf = dist_scale_factor(col_poc_diff, curr_poc_diff);
    Ok(Some(scale_mv(mv_col, dsf)))
}
