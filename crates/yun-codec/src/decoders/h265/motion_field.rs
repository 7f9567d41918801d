//! 图像级运动场与已完成运动场的保留存储.
//!
//! 运动场以 4x4 亮度块为粒度记录每个帧间预测块的运动, 并附带被引用图像的
//! POC 与长期参考标记, 使其在后续图像中作为共位 (collocated) 来源时无需
//! 再查询当时的参考列表.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::debug;
use yun_core::{PbMotion, RefList, YunError, YunResult};

/// 运动场存储粒度 (log2, 亮度样本)
const LOG2_GRID: u32 = 2;
/// 时域预测使用的压缩网格 (log2, 亮度样本)
const LOG2_COMPRESSED_GRID: u32 = 4;

/// 一个 4x4 块的运动记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionRecord {
    /// 预测块运动
    pub motion: PbMotion,
    /// 各列表被引用图像的 POC (列表未使用时无意义)
    pub ref_poc: [i32; 2],
    /// 各列表被引用图像是否为长期参考
    pub long_term: [bool; 2],
}

impl MotionRecord {
    /// 指定列表被引用图像的 POC
    pub fn ref_poc(&self, list: RefList) -> i32 {
        self.ref_poc[list.index()]
    }

    /// 指定列表被引用图像是否为长期参考
    pub fn is_long_term(&self, list: RefList) -> bool {
        self.long_term[list.index()]
    }
}

/// 一幅图像的运动场
#[derive(Debug, Clone)]
pub struct MotionField {
    poc: i32,
    width: u32,
    height: u32,
    stride: usize,
    blocks: Vec<Option<MotionRecord>>,
}

impl MotionField {
    /// 创建空运动场 (所有块均为帧内/未解码)
    pub fn new(poc: i32, width: u32, height: u32) -> Self {
        let stride = width.div_ceil(1 << LOG2_GRID) as usize;
        let rows = height.div_ceil(1 << LOG2_GRID) as usize;
        Self {
            poc,
            width,
            height,
            stride,
            blocks: vec![None; stride * rows],
        }
    }

    /// 所属图像的 POC
    pub fn poc(&self) -> i32 {
        self.poc
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        let bx = (x as usize) >> LOG2_GRID;
        let by = (y as usize) >> LOG2_GRID;
        Some(by * self.stride + bx)
    }

    /// 覆盖亮度坐标 (x, y) 的运动记录, 图像外或帧内块返回 `None`
    pub fn motion_at(&self, x: i32, y: i32) -> Option<MotionRecord> {
        self.index(x, y).and_then(|idx| self.blocks[idx])
    }

    /// 时域预测读取: 先对齐到 16x16 压缩网格的左上角
    pub fn compressed_motion_at(&self, x: i32, y: i32) -> Option<MotionRecord> {
        let cx = (x >> LOG2_COMPRESSED_GRID) << LOG2_COMPRESSED_GRID;
        let cy = (y >> LOG2_COMPRESSED_GRID) << LOG2_COMPRESSED_GRID;
        self.motion_at(cx, cy)
    }

    /// 该坐标是否已写入运动
    pub fn is_written(&self, x: i32, y: i32) -> bool {
        self.motion_at(x, y).is_some()
    }

    /// 将一个预测块的运动写入其覆盖的全部 4x4 块.
    ///
    /// 每个位置只能写入一次; 越界或重复写入返回 `InvalidData`, 且不修改运动场.
    pub fn write_block(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        record: MotionRecord,
    ) -> YunResult<()> {
        let grid = 1u32 << LOG2_GRID;
        if width == 0
            || height == 0
            || x % grid != 0
            || y % grid != 0
            || width % grid != 0
            || height % grid != 0
            || x + width > self.width
            || y + height > self.height
        {
            return Err(YunError::InvalidData(format!(
                "HEVC: 运动块 ({},{}) {}x{} 超出 {}x{} 运动场或未按 4 对齐",
                x, y, width, height, self.width, self.height
            )));
        }
        let bx0 = (x >> LOG2_GRID) as usize;
        let by0 = (y >> LOG2_GRID) as usize;
        let bw = (width >> LOG2_GRID) as usize;
        let bh = (height >> LOG2_GRID) as usize;

        for by in by0..by0 + bh {
            let row = &self.blocks[by * self.stride + bx0..by * self.stride + bx0 + bw];
            if row.iter().any(Option::is_some) {
                return Err(YunError::InvalidData(format!(
                    "HEVC: POC {} 的运动块 ({},{}) {}x{} 与已写入区域重叠",
                    self.poc, x, y, width, height
                )));
            }
        }
        for by in by0..by0 + bh {
            let start = by * self.stride + bx0;
            self.blocks[start..start + bw].fill(Some(record));
        }
        Ok(())
    }
}

/// 已完成图像运动场的保留存储, 以 POC 为键.
///
/// 条目以 `Arc` 共享. 仍在参考集中或仍被外部持有的条目不会被逐出.
#[derive(Debug)]
pub struct MotionFieldStore {
    capacity: usize,
    fields: BTreeMap<i32, Arc<MotionField>>,
}

impl MotionFieldStore {
    /// 创建容量为 `capacity` 的存储
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            fields: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 保留一个已完成的运动场.
    ///
    /// `referenced` 为后续图像仍可能引用的 POC. 存储已满时只逐出不在其中且
    /// 无外部引用的条目 (POC 最小者优先); 没有可逐出的条目则返回
    /// `ResourceExhausted`, 存储保持不变.
    pub fn retain(
        &mut self,
        field: Arc<MotionField>,
        referenced: &BTreeSet<i32>,
    ) -> YunResult<()> {
        let poc = field.poc();
        if self.capacity == 0 {
            return Err(YunError::ResourceExhausted(
                "HEVC: 运动场存储容量为 0".into(),
            ));
        }
        if self.fields.contains_key(&poc) {
            return Err(YunError::InvalidData(format!(
                "HEVC: POC {} 的运动场已存在",
                poc
            )));
        }
        let needed = (self.fields.len() + 1).saturating_sub(self.capacity);
        let victims: Vec<i32> = self
            .fields
            .iter()
            .filter(|&(p, f)| !referenced.contains(p) && Arc::strong_count(f) == 1)
            .map(|(&p, _)| p)
            .take(needed)
            .collect();
        if victims.len() < needed {
            return Err(YunError::ResourceExhausted(format!(
                "HEVC: 运动场存储已满 ({} 项均仍被引用), 无法保留 POC {}",
                self.capacity, poc
            )));
        }
        for p in victims {
            debug!("HEVC: 运动场存储已满, 逐出 POC {}", p);
            self.fields.remove(&p);
        }
        self.fields.insert(poc, field);
        Ok(())
    }

    /// 按 POC 获取运动场
    pub fn get(&self, poc: i32) -> Option<Arc<MotionField>> {
        self.fields.get(&poc).cloned()
    }

    /// 释放指定 POC 的运动场, 返回是否存在
    pub fn release(&mut self, poc: i32) -> bool {
        self.fields.remove(&poc).is_some()
    }

    /// 当前保留的 POC (升序)
    pub fn pocs(&self) -> Vec<i32> {
        self.fields.keys().copied().collect()
    }
}
