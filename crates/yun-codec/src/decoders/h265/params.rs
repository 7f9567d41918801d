//! 合并推导所需的图像级与 slice 级参数.
//!
//! 这些参数由上游的参数集/slice header 解析器填充, 本引擎只读取.

use yun_core::{RefList, YunError, YunResult};

/// slice 类型 (slice_type 语法元素: 0=B, 1=P, 2=I)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceType {
    B,
    P,
    I,
}

impl SliceType {
    /// 从 slice_type 语法元素值构造
    pub fn from_syntax(value: u32) -> YunResult<Self> {
        match value {
            0 => Ok(SliceType::B),
            1 => Ok(SliceType::P),
            2 => Ok(SliceType::I),
            _ => Err(YunError::InvalidData(format!("HEVC: 非法 slice_type={}", value))),
        }
    }

    /// 是否为帧间 slice
    pub fn is_inter(self) -> bool {
        !matches!(self, SliceType::I)
    }
}

/// Tile 划分
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TileLayout {
    /// 整幅图像为一个 tile
    #[default]
    Single,
    /// uniform_spacing_flag=1 时的均匀划分
    Uniform { columns: u32, rows: u32 },
    /// 显式列宽/行高 (单位: CTB)
    Explicit {
        column_widths: Vec<u32>,
        row_heights: Vec<u32>,
    },
}

/// 图像级参数 (来自 SPS/PPS)
#[derive(Debug, Clone)]
pub struct PictureParams {
    /// 亮度宽度 (像素)
    pub width: u32,
    /// 亮度高度 (像素)
    pub height: u32,
    /// CtbLog2SizeY
    pub log2_ctb_size: u8,
    /// MinTbLog2SizeY, 决定 z-scan 地址的粒度
    pub log2_min_tb_size: u8,
    /// Log2ParMrgLevel (log2_parallel_merge_level_minus2 + 2)
    pub log2_parallel_merge_level: u8,
    /// sps_temporal_mvp_enabled_flag
    pub temporal_mvp_enabled: bool,
    /// Tile 划分
    pub tiles: TileLayout,
}

impl PictureParams {
    /// 校验参数范围
    pub fn validate(&self) -> YunResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(YunError::InvalidData(format!(
                "HEVC: 图像尺寸无效 {}x{}",
                self.width, self.height
            )));
        }
        if self.width % 8 != 0 || self.height % 8 != 0 {
            return Err(YunError::InvalidData(format!(
                "HEVC: 图像尺寸 {}x{} 不是最小编码块 (8) 的整数倍",
                self.width, self.height
            )));
        }
        if !(4..=6).contains(&self.log2_ctb_size) {
            return Err(YunError::InvalidData(format!(
                "HEVC: CtbLog2SizeY={} 超出 [4, 6]",
                self.log2_ctb_size
            )));
        }
        if self.log2_min_tb_size < 2 || self.log2_min_tb_size >= self.log2_ctb_size {
            return Err(YunError::InvalidData(format!(
                "HEVC: MinTbLog2SizeY={} 非法 (CtbLog2SizeY={})",
                self.log2_min_tb_size, self.log2_ctb_size
            )));
        }
        if self.log2_parallel_merge_level < 2
            || self.log2_parallel_merge_level > self.log2_ctb_size
        {
            return Err(YunError::InvalidData(format!(
                "HEVC: Log2ParMrgLevel={} 超出 [2, {}]",
                self.log2_parallel_merge_level, self.log2_ctb_size
            )));
        }
        Ok(())
    }

    /// 并行合并区域边长 (像素)
    pub fn parallel_merge_region_size(&self) -> u32 {
        1 << self.log2_parallel_merge_level
    }
}

/// 参考图像列表中的一项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefPicture {
    /// 图像顺序号
    pub poc: i32,
    /// 是否标记为长期参考
    pub long_term: bool,
}

impl RefPicture {
    /// 短期参考图像
    pub const fn short_term(poc: i32) -> Self {
        Self {
            poc,
            long_term: false,
        }
    }

    /// 长期参考图像
    pub const fn long_term(poc: i32) -> Self {
        Self {
            poc,
            long_term: true,
        }
    }
}

/// 合并推导所需的 slice header 字段
#[derive(Debug, Clone)]
pub struct SliceHeader {
    /// SliceAddrRs: 所属独立 slice 的首个 CTB 光栅地址
    pub slice_addr_rs: u32,
    /// slice 类型
    pub slice_type: SliceType,
    /// MaxNumMergeCand (5 - five_minus_max_num_merge_cand)
    pub max_num_merge_cand: u8,
    /// num_ref_idx_l0/l1_active_minus1 + 1
    pub num_ref_idx_active: [u8; 2],
    /// RefPicList0 / RefPicList1
    pub ref_pic_list: [Vec<RefPicture>; 2],
    /// slice_temporal_mvp_enabled_flag
    pub temporal_mvp_enabled: bool,
    /// collocated_from_l0_flag
    pub collocated_from_l0: bool,
    /// collocated_ref_idx
    pub collocated_ref_idx: u8,
}

impl SliceHeader {
    /// 校验与合并推导相关的字段
    pub fn validate(&self) -> YunResult<()> {
        if !(1..=5).contains(&self.max_num_merge_cand) {
            return Err(YunError::InvalidData(format!(
                "HEVC: MaxNumMergeCand={} 超出 [1, 5]",
                self.max_num_merge_cand
            )));
        }
        let active_lists = match self.slice_type {
            SliceType::I => 0,
            SliceType::P => 1,
            SliceType::B => 2,
        };
        for (i, list) in RefList::ALL.iter().take(active_lists).enumerate() {
            let active = self.num_ref_idx_active[i];
            if !(1..=16).contains(&active) {
                return Err(YunError::InvalidData(format!(
                    "HEVC: num_ref_idx_l{}_active={} 超出 [1, 16]",
                    i, active
                )));
            }
            let len = self.ref_pic_list[list.index()].len();
            if len < active as usize {
                return Err(YunError::InvalidData(format!(
                    "HEVC: RefPicList{} 仅有 {} 项, 少于 num_ref_idx_active={}",
                    i, len, active
                )));
            }
        }
        if self.slice_type.is_inter() && self.temporal_mvp_enabled {
            let list = self.collocated_list();
            let active = self.num_ref_idx_active[list.index()];
            if self.collocated_ref_idx >= active {
                return Err(YunError::InvalidData(format!(
                    "HEVC: collocated_ref_idx={} 超出 L{} 活动参考数 {}",
                    self.collocated_ref_idx,
                    list.index(),
                    active
                )));
            }
        }
        Ok(())
    }

    /// 当前 slice 实际使用的参考列表数 (P=1, B=2)
    pub fn num_active_lists(&self) -> usize {
        match self.slice_type {
            SliceType::B => 2,
            SliceType::P => 1,
            SliceType::I => 0,
        }
    }

    /// 查找参考列表中的图像, 越界视为码流错误
    pub fn ref_picture(&self, list: RefList, ref_idx: i8) -> YunResult<RefPicture> {
        let entries = &self.ref_pic_list[list.index()];
        usize::try_from(ref_idx)
            .ok()
            .filter(|&idx| idx < self.num_ref_idx_active[list.index()] as usize)
            .and_then(|idx| entries.get(idx).copied())
            .ok_or_else(|| {
                YunError::InvalidData(format!(
                    "HEVC: refIdxL{}={} 超出参考列表 (活动数 {})",
                    list.index(),
                    ref_idx,
                    self.num_ref_idx_active[list.index()]
                ))
            })
    }

    /// 共位图像所在的参考列表
    pub fn collocated_list(&self) -> RefList {
        if self.slice_type == SliceType::B && !self.collocated_from_l0 {
            RefList::L1
        } else {
            RefList::L0
        }
    }

    /// 共位图像 (ColPic), 仅在时域 MV 预测开启时存在
    pub fn collocated_picture(&self) -> YunResult<Option<RefPicture>> {
        if !self.slice_type.is_inter() || !self.temporal_mvp_enabled {
            return Ok(None);
        }
        self.ref_picture(self.collocated_list(), self.collocated_ref_idx as i8)
            .map(Some)
    }

    /// NoBackwardPredFlag: 所有参考图像的 POC 都不大于当前图像
    pub fn no_backward_pred(&self, current_poc: i32) -> bool {
        RefList::ALL
            .iter()
            .take(self.num_active_lists())
            .all(|list| {
                let active = self.num_ref_idx_active[list.index()] as usize;
                self.ref_pic_list[list.index()]
                    .iter()
                    .take(active)
                    .all(|pic| pic.poc <= current_poc)
            })
    }
}
