//! 预测单元调度: 逐 CU 推导合并运动, 写入运动场并交给样本生成.
//!
//! 同一并行合并区域内的 PU 互不可见, 因此可以并发推导, 推导结束后按解码顺序
//! 统一提交. 区域外的 CU 按解码顺序逐个处理.

use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, trace, warn};
use rayon::prelude::*;
use yun_core::{PbMotion, RefList, YunError, YunResult};

use super::MergeConfig;
use super::merge::{MergeContext, MergeOutcome, derive_merge_motion};
use super::motion_field::{MotionField, MotionFieldStore, MotionRecord};
use super::params::{PictureParams, SliceHeader};
use super::partition::{CodingUnit, PredictionMode, PredictionUnit};
use super::picture::{CurrentPicture, SliceId};

/// 帧间样本生成接口 (运动补偿由外部实现)
pub trait InterSampleSink {
    /// 按已确定的运动生成预测块样本
    fn generate_inter_prediction_samples(
        &mut self,
        pu: &PredictionUnit,
        motion: &PbMotion,
    ) -> YunResult<()>;
}

/// 不生成样本的空实现
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSampleSink;

impl InterSampleSink for NullSampleSink {
    fn generate_inter_prediction_samples(
        &mut self,
        _pu: &PredictionUnit,
        _motion: &PbMotion,
    ) -> YunResult<()> {
        Ok(())
    }
}

/// 合并模式运动解码器
#[derive(Debug)]
pub struct MergeDecoder {
    config: MergeConfig,
    store: MotionFieldStore,
    picture: Option<CurrentPicture>,
    /// 当前图像声明的参考集 (含仅供后续图像使用的条目)
    reference_pocs: BTreeSet<i32>,
}

impl MergeDecoder {
    pub fn new(config: MergeConfig) -> Self {
        Self {
            store: MotionFieldStore::new(config.motion_field_capacity),
            config,
            picture: None,
            reference_pocs: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// 已完成图像的运动场存储
    pub fn store(&self) -> &MotionFieldStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut MotionFieldStore {
        &mut self.store
    }

    /// 正在解码的图像
    pub fn current_picture(&self) -> Option<&CurrentPicture> {
        self.picture.as_ref()
    }

    /// 开始解码一幅新图像
    pub fn begin_picture(&mut self, poc: i32, params: PictureParams) -> YunResult<()> {
        if let Some(pic) = &self.picture {
            return Err(YunError::InvalidArgument(format!(
                "HEVC: POC {} 尚未结束, 不能开始 POC {}",
                pic.poc(),
                poc
            )));
        }
        if self.store.get(poc).is_some() {
            return Err(YunError::InvalidData(format!(
                "HEVC: POC {} 的运动场已存在",
                poc
            )));
        }
        let picture = CurrentPicture::new(poc, params)?;
        debug!(
            "HEVC: 开始图像 POC {} ({}x{}, CTB {}, Log2ParMrgLevel {})",
            poc,
            picture.params().width,
            picture.params().height,
            1u32 << picture.params().log2_ctb_size,
            picture.params().log2_parallel_merge_level
        );
        self.picture = Some(picture);
        self.reference_pocs.clear();
        Ok(())
    }

    /// 声明当前图像参考集中的 POC.
    ///
    /// 结束图像时, 这些 POC 与各 slice 活动参考列表中的 POC 一起视为仍被引用,
    /// 其运动场不会被逐出. 只供后续图像使用的参考 (不在当前参考列表中) 需要
    /// 通过此处声明.
    pub fn declare_reference_pocs(&mut self, pocs: &[i32]) -> YunResult<()> {
        self.picture_mut()?;
        self.reference_pocs.extend(pocs.iter().copied());
        Ok(())
    }

    /// 为当前图像注册 slice
    pub fn add_slice(&mut self, header: SliceHeader) -> YunResult<SliceId> {
        let picture = self.picture_mut()?;
        let poc = picture.poc();
        let id = picture.add_slice(header)?;
        debug!("HEVC: POC {} 注册 slice #{}", poc, id.index());
        Ok(id)
    }

    /// 解码一个 CU 的全部 PU (按 partIdx 顺序)
    pub fn decode_coding_unit(
        &mut self,
        slice: SliceId,
        cu: &CodingUnit,
        sink: &mut dyn InterSampleSink,
    ) -> YunResult<Vec<MergeOutcome>> {
        let store = &self.store;
        let picture = self.picture.as_mut().ok_or_else(no_picture)?;
        prepare_coding_unit(picture, slice, cu)?;
        let collocated = collocated_field(store, picture, slice)?;

        let mut outcomes = Vec::with_capacity(cu.part_mode.num_parts() as usize);
        for part_idx in 0..cu.part_mode.num_parts() {
            let (outcome, record) = {
                let header = picture.slice(slice)?;
                let ctx = MergeContext::new(picture, header, collocated.as_deref());
                let outcome = derive_merge_motion(&ctx, cu, part_idx)?;
                let record = motion_record(header, &outcome.motion)?;
                (outcome, record)
            };
            commit(picture, &outcome, record, sink)?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// 解码一组按解码顺序排列的 CU.
    ///
    /// 所有 CU 位于同一并行合并区域且配置允许时, 各 PU 并发推导后统一提交;
    /// 否则逐个 CU 顺序解码. 两种方式结果一致.
    pub fn decode_region(
        &mut self,
        slice: SliceId,
        cus: &[CodingUnit],
        sink: &mut dyn InterSampleSink,
    ) -> YunResult<Vec<MergeOutcome>> {
        let log2_pml = self.picture_mut()?.params().log2_parallel_merge_level;
        if !self.config.parallel_regions || !within_one_merge_region(cus, log2_pml) {
            let mut outcomes = Vec::new();
            for cu in cus {
                outcomes.extend(self.decode_coding_unit(slice, cu, sink)?);
            }
            return Ok(outcomes);
        }

        let store = &self.store;
        let picture = self.picture.as_mut().ok_or_else(no_picture)?;
        for cu in cus {
            prepare_coding_unit(picture, slice, cu)?;
        }
        let collocated = collocated_field(store, picture, slice)?;

        let jobs: Vec<(&CodingUnit, u8)> = cus
            .iter()
            .flat_map(|cu| (0..cu.part_mode.num_parts()).map(move |p| (cu, p)))
            .collect();
        trace!(
            "HEVC: 并行合并区域内并发推导 {} 个 CU / {} 个 PU",
            cus.len(),
            jobs.len()
        );
        let derived = {
            let header = picture.slice(slice)?;
            let ctx = MergeContext::new(picture, header, collocated.as_deref());
            jobs.par_iter()
                .map(|&(cu, part_idx)| {
                    let outcome = derive_merge_motion(&ctx, cu, part_idx)?;
                    let record = motion_record(header, &outcome.motion)?;
                    Ok((outcome, record))
                })
                .collect::<YunResult<Vec<_>>>()?
        };

        let mut outcomes = Vec::with_capacity(derived.len());
        for (outcome, record) in derived {
            commit(picture, &outcome, record, sink)?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// 写入由其他路径 (AMVP) 解码的预测块运动, 供后续合并推导引用
    pub fn store_inter_motion(
        &mut self,
        slice: SliceId,
        pu: &PredictionUnit,
        motion: PbMotion,
    ) -> YunResult<()> {
        if !motion.is_inter() {
            return Err(YunError::InvalidArgument(format!(
                "HEVC: 预测块 ({},{}) 的运动未使用任何参考列表",
                pu.x, pu.y
            )));
        }
        let picture = self.picture_mut()?;
        if !picture.slice(slice)?.slice_type.is_inter() {
            return Err(YunError::InvalidData(format!(
                "HEVC: I slice 中出现帧间预测块 ({},{})",
                pu.x, pu.y
            )));
        }
        let log2_ctb = u32::from(picture.params().log2_ctb_size);
        let last_x = pu.x + pu.width.max(1) - 1;
        let last_y = pu.y + pu.height.max(1) - 1;
        if pu.x >> log2_ctb != last_x >> log2_ctb || pu.y >> log2_ctb != last_y >> log2_ctb {
            warn!(
                "HEVC: 预测块 ({},{}) {}x{} 跨越 CTB 边界",
                pu.x, pu.y, pu.width, pu.height
            );
            return Err(YunError::InvalidData(format!(
                "HEVC: 预测块 ({},{}) {}x{} 跨越 {}x{} CTB 边界",
                pu.x,
                pu.y,
                pu.width,
                pu.height,
                1u32 << log2_ctb,
                1u32 << log2_ctb
            )));
        }
        picture.assign_ctb(pu.x, pu.y, slice)?;
        let record = motion_record(picture.slice(slice)?, &motion)?;
        picture
            .motion_mut()
            .write_block(pu.x, pu.y, pu.width, pu.height, record)?;
        trace!(
            "HEVC: 写入外部运动 ({},{}) {}x{} {}",
            pu.x, pu.y, pu.width, pu.height, motion
        );
        Ok(())
    }

    /// 结束当前图像, 冻结并保留其运动场
    pub fn finish_picture(&mut self) -> YunResult<Arc<MotionField>> {
        let picture = self.picture.take().ok_or_else(no_picture)?;
        let poc = picture.poc();
        let mut referenced = picture.referenced_pocs();
        referenced.extend(self.reference_pocs.iter().copied());
        let field = picture.finish();
        self.store.retain(field.clone(), &referenced)?;
        debug!(
            "HEVC: 结束图像 POC {}, 运动场存储 {}/{}",
            poc,
            self.store.len(),
            self.store.capacity()
        );
        Ok(field)
    }

    /// 丢弃当前图像 (解码出错后调用)
    pub fn discard_picture(&mut self) -> Option<i32> {
        let poc = self.picture.take().map(|p| p.poc());
        if let Some(poc) = poc {
            warn!("HEVC: 丢弃图像 POC {}", poc);
        }
        poc
    }

    fn picture_mut(&mut self) -> YunResult<&mut CurrentPicture> {
        self.picture.as_mut().ok_or_else(no_picture)
    }
}

fn no_picture() -> YunError {
    YunError::InvalidArgument("HEVC: 没有正在解码的图像".into())
}

/// 校验 CU 并登记其所在 CTB 的 slice
fn prepare_coding_unit(
    picture: &mut CurrentPicture,
    slice: SliceId,
    cu: &CodingUnit,
) -> YunResult<()> {
    cu.validate()?;
    let size = cu.size();
    let params = picture.params();
    if cu.log2_size > params.log2_ctb_size {
        return Err(YunError::InvalidData(format!(
            "HEVC: CU log2CbSize={} 大于 CtbLog2SizeY={}",
            cu.log2_size, params.log2_ctb_size
        )));
    }
    if cu.x + size > params.width || cu.y + size > params.height {
        warn!(
            "HEVC: CU ({},{}) {}x{} 超出图像 {}x{}",
            cu.x, cu.y, size, size, params.width, params.height
        );
        return Err(YunError::InvalidData(format!(
            "HEVC: CU ({},{}) {}x{} 超出图像",
            cu.x, cu.y, size, size
        )));
    }
    let header = picture.slice(slice)?;
    if !header.slice_type.is_inter() {
        return Err(YunError::InvalidData(format!(
            "HEVC: I slice 中出现帧间 CU ({},{})",
            cu.x, cu.y
        )));
    }
    let max_num_merge_cand = header.max_num_merge_cand;
    for part_idx in 0..cu.part_mode.num_parts() {
        match cu.prediction_mode(part_idx) {
            PredictionMode::Skip | PredictionMode::Merge => {}
            mode => {
                warn!(
                    "HEVC: CU ({},{}) partIdx={} 为 {:?}, 合并引擎不处理",
                    cu.x, cu.y, part_idx, mode
                );
                return Err(YunError::Unsupported(format!(
                    "HEVC: {:?} 预测单元不属于合并模式",
                    mode
                )));
            }
        }
        let merge_idx = cu.merge_idx(part_idx)?;
        if merge_idx >= max_num_merge_cand {
            return Err(YunError::InvalidData(format!(
                "HEVC: CU ({},{}) partIdx={} merge_idx={} 超出 MaxNumMergeCand={}",
                cu.x, cu.y, part_idx, merge_idx, max_num_merge_cand
            )));
        }
    }
    picture.assign_ctb(cu.x, cu.y, slice)
}

/// 查找当前 slice 的共位运动场
fn collocated_field(
    store: &MotionFieldStore,
    picture: &CurrentPicture,
    slice: SliceId,
) -> YunResult<Option<Arc<MotionField>>> {
    if !picture.params().temporal_mvp_enabled {
        return Ok(None);
    }
    let Some(col_pic) = picture.slice(slice)?.collocated_picture()? else {
        return Ok(None);
    };
    store.get(col_pic.poc).map(Some).ok_or_else(|| {
        YunError::InvalidData(format!(
            "HEVC: 共位图像 POC {} 的运动场未保留",
            col_pic.poc
        ))
    })
}

/// 为运动场记录附加被引用图像的 POC 与长期标记
fn motion_record(slice: &SliceHeader, motion: &PbMotion) -> YunResult<MotionRecord> {
    let mut record = MotionRecord {
        motion: *motion,
        ref_poc: [0; 2],
        long_term: [false; 2],
    };
    for list in RefList::ALL {
        let m = motion.list(list);
        if m.pred_flag() {
            let pic = slice.ref_picture(list, m.ref_idx())?;
            record.ref_poc[list.index()] = pic.poc;
            record.long_term[list.index()] = pic.long_term;
        }
    }
    Ok(record)
}

/// 写入运动场并生成样本
fn commit(
    picture: &mut CurrentPicture,
    outcome: &MergeOutcome,
    record: MotionRecord,
    sink: &mut dyn InterSampleSink,
) -> YunResult<()> {
    let pu = &outcome.pu;
    picture
        .motion_mut()
        .write_block(pu.x, pu.y, pu.width, pu.height, record)?;
    sink.generate_inter_prediction_samples(pu, &outcome.motion)
}

/// 所有 CU 是否完整落在同一个并行合并区域内
fn within_one_merge_region(cus: &[CodingUnit], log2_pml: u8) -> bool {
    let shift = u32::from(log2_pml);
    let region = |x: u32, y: u32| (x >> shift, y >> shift);
    let Some(first) = cus.first() else {
        return false;
    };
    let target = region(first.x, first.y);
    cus.iter().all(|cu| {
        let last = cu.size() - 1;
        region(cu.x, cu.y) == target && region(cu.x + last, cu.y + last) == target
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::h265::partition::PartMode;

    #[test]
    fn test_within_one_merge_region() {
        let cus = [
            CodingUnit::skip(16, 16, 3, 0),
            CodingUnit::skip(24, 16, 3, 0),
            CodingUnit::skip(16, 24, 3, 0),
        ];
        assert!(within_one_merge_region(&cus, 4));
        assert!(!within_one_merge_region(&cus, 3), "8x8 区域只能容纳一个 CU");
        let big = [CodingUnit::merge(0, 0, 5, PartMode::Part2NxN, &[0, 0])];
        assert!(!within_one_merge_region(&big, 4));
        assert!(!within_one_merge_region(&[], 4));
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let cu = CodingUnit::skip(0, 0, 3, 0);
        let pu = PredictionUnit::from_cu(&cu, 0).unwrap();
        let mut sink = NullSampleSink;
        assert!(sink.generate_inter_prediction_samples(&pu, &PbMotion::default()).is_ok());
    }
}
