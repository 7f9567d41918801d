//! 正在解码的图像状态: 参数, 扫描布局, slice 映射与运动场.

use std::collections::BTreeSet;
use std::sync::Arc;

use yun_core::{RefList, YunError, YunResult};

use super::layout::PictureLayout;
use super::motion_field::MotionField;
use super::params::{PictureParams, SliceHeader};

/// 当前图像内 slice 的编号 (按注册顺序)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SliceId(pub(crate) usize);

impl SliceId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// 正在解码的图像
#[derive(Debug)]
pub struct CurrentPicture {
    poc: i32,
    params: PictureParams,
    layout: PictureLayout,
    slices: Vec<SliceHeader>,
    ctb_slice: Vec<Option<SliceId>>,
    motion: MotionField,
}

impl CurrentPicture {
    pub fn new(poc: i32, params: PictureParams) -> YunResult<Self> {
        let layout = PictureLayout::new(&params)?;
        let num_ctbs = (layout.width_in_ctbs() * layout.height_in_ctbs()) as usize;
        let motion = MotionField::new(poc, params.width, params.height);
        Ok(Self {
            poc,
            params,
            layout,
            slices: Vec::new(),
            ctb_slice: vec![None; num_ctbs],
            motion,
        })
    }

    /// 注册一个 slice header
    pub fn add_slice(&mut self, header: SliceHeader) -> YunResult<SliceId> {
        header.validate()?;
        let num_ctbs = self.ctb_slice.len() as u32;
        if header.slice_addr_rs >= num_ctbs {
            return Err(YunError::InvalidData(format!(
                "HEVC: slice_addr_rs={} 超出图像 CTB 数 {}",
                header.slice_addr_rs, num_ctbs
            )));
        }
        if self
            .slices
            .iter()
            .any(|s| s.slice_addr_rs == header.slice_addr_rs)
        {
            return Err(YunError::InvalidData(format!(
                "HEVC: slice_addr_rs={} 重复",
                header.slice_addr_rs
            )));
        }
        self.slices.push(header);
        Ok(SliceId(self.slices.len() - 1))
    }

    /// 将覆盖亮度坐标 (x, y) 的 CTB 归属到 slice.
    ///
    /// CTB 只能属于一个 slice, 重复归属到同一 slice 是允许的.
    pub fn assign_ctb(&mut self, x: u32, y: u32, slice: SliceId) -> YunResult<()> {
        if slice.0 >= self.slices.len() {
            return Err(YunError::InvalidArgument(format!(
                "HEVC: 未注册的 slice #{}",
                slice.0
            )));
        }
        if x >= self.layout.width() || y >= self.layout.height() {
            return Err(YunError::InvalidData(format!(
                "HEVC: 坐标 ({},{}) 不在图像内",
                x, y
            )));
        }
        let addr = self.layout.ctb_addr_rs(x, y);
        let entry = self.ctb_slice.get_mut(addr).ok_or_else(|| {
            YunError::Internal(format!("HEVC: CTB 地址 {} 超出 slice 映射", addr))
        })?;
        match *entry {
            Some(owner) if owner != slice => Err(YunError::InvalidData(format!(
                "HEVC: CTB {} 已属于 slice #{}, 不能再归属 slice #{}",
                addr, owner.0, slice.0
            ))),
            _ => {
                *entry = Some(slice);
                Ok(())
            }
        }
    }

    /// 按编号取 slice header
    pub fn slice(&self, slice: SliceId) -> YunResult<&SliceHeader> {
        self.slices.get(slice.0).ok_or_else(|| {
            YunError::InvalidArgument(format!("HEVC: 未注册的 slice #{}", slice.0))
        })
    }

    /// 覆盖亮度坐标 (x, y) 的 CTB 所属 slice, 尚未解码或图像外返回 `None`
    pub fn slice_at(&self, x: i32, y: i32) -> Option<&SliceHeader> {
        if !self.layout.contains(x, y) {
            return None;
        }
        let addr = self.layout.ctb_addr_rs(x as u32, y as u32);
        self.ctb_slice
            .get(addr)
            .copied()
            .flatten()
            .and_then(|id| self.slices.get(id.0))
    }

    pub fn poc(&self) -> i32 {
        self.poc
    }

    pub fn params(&self) -> &PictureParams {
        &self.params
    }

    pub fn layout(&self) -> &PictureLayout {
        &self.layout
    }

    pub fn motion(&self) -> &MotionField {
        &self.motion
    }

    pub fn motion_mut(&mut self) -> &mut MotionField {
        &mut self.motion
    }

    /// 各 slice 活动参考列表中出现的 POC
    pub fn referenced_pocs(&self) -> BTreeSet<i32> {
        let mut pocs = BTreeSet::new();
        for header in &self.slices {
            for list in RefList::ALL {
                let active = usize::from(header.num_ref_idx_active[list.index()]);
                let refs = &header.ref_pic_list[list.index()];
                pocs.extend(refs.iter().take(active).map(|r| r.poc));
            }
        }
        pocs
    }

    /// 结束解码, 冻结运动场
    pub fn finish(self) -> Arc<MotionField> {
        Arc::new(self.motion)
    }
}
