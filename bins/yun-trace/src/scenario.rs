//! 场景文件: JSON 描述的图像序列, 以及按解码顺序执行它的驱动.

use anyhow::{Context, Result, bail};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use yun_codec::decoders::h265::{
    CodingUnit, MergeConfig, MergeDecoder, MergeOutcome, NullSampleSink, PartMode, PictureParams,
    PredictionUnit, RefPicture, SliceHeader, SliceType, TileLayout,
    DEFAULT_MOTION_FIELD_CAPACITY,
};
use yun_core::{ListMotion, MotionVector, PbMotion, RefList, YunError};

// ============================================================
// 输入结构体
// ============================================================

/// 完整场景
#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: ConfigDesc,
    pub picture: PictureDesc,
    /// 按解码顺序排列的图像
    pub pictures: Vec<PictureEntry>,
}

/// 解码器配置, 缺省字段取库默认值
#[derive(Debug, Deserialize)]
pub struct ConfigDesc {
    #[serde(default = "default_capacity")]
    pub motion_field_capacity: usize,
    #[serde(default = "default_true")]
    pub parallel_regions: bool,
}

impl Default for ConfigDesc {
    fn default() -> Self {
        Self {
            motion_field_capacity: default_capacity(),
            parallel_regions: default_true(),
        }
    }
}

fn default_capacity() -> usize {
    DEFAULT_MOTION_FIELD_CAPACITY
}

fn default_true() -> bool {
    true
}

fn default_parallel_merge_level() -> u8 {
    2
}

fn default_max_num_merge_cand() -> u8 {
    5
}

/// 所有图像共用的 SPS/PPS 参数
#[derive(Debug, Deserialize)]
pub struct PictureDesc {
    pub width: u32,
    pub height: u32,
    pub log2_ctb_size: u8,
    pub log2_min_tb_size: u8,
    #[serde(default = "default_parallel_merge_level")]
    pub log2_parallel_merge_level: u8,
    #[serde(default)]
    pub temporal_mvp_enabled: bool,
    #[serde(default)]
    pub tiles: TilesDesc,
}

#[derive(Debug, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TilesDesc {
    #[default]
    Single,
    Uniform {
        columns: u32,
        rows: u32,
    },
    Explicit {
        column_widths: Vec<u32>,
        row_heights: Vec<u32>,
    },
}

#[derive(Debug, Deserialize)]
pub struct PictureEntry {
    pub poc: i32,
    /// 参考集中只供后续图像使用的 POC
    #[serde(default)]
    pub reference_pocs: Vec<i32>,
    pub slices: Vec<SliceDesc>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub enum SliceTypeDesc {
    P,
    B,
    I,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RefPictureDesc {
    pub poc: i32,
    #[serde(default)]
    pub long_term: bool,
}

#[derive(Debug, Deserialize)]
pub struct SliceDesc {
    #[serde(default)]
    pub slice_addr_rs: u32,
    pub slice_type: SliceTypeDesc,
    #[serde(default = "default_max_num_merge_cand")]
    pub max_num_merge_cand: u8,
    #[serde(default)]
    pub l0: Vec<RefPictureDesc>,
    #[serde(default)]
    pub l1: Vec<RefPictureDesc>,
    /// 缺省为各列表长度
    #[serde(default)]
    pub num_ref_idx_active: Option<[u8; 2]>,
    #[serde(default)]
    pub temporal_mvp_enabled: bool,
    #[serde(default = "default_true")]
    pub collocated_from_l0: bool,
    #[serde(default)]
    pub collocated_ref_idx: u8,
    /// 非合并方式 (AMVP) 解码的预测块, 先于 CU 写入
    #[serde(default)]
    pub blocks: Vec<BlockDesc>,
    /// 合并/跳过 CU, 按解码顺序
    #[serde(default)]
    pub coding_units: Vec<CodingUnitDesc>,
}

/// 单个列表的运动: 参考索引与运动矢量
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ListMotionDesc {
    pub ref_idx: u8,
    pub mv: [i16; 2],
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MotionDesc {
    #[serde(default)]
    pub l0: Option<ListMotionDesc>,
    #[serde(default)]
    pub l1: Option<ListMotionDesc>,
}

#[derive(Debug, Deserialize)]
pub struct BlockDesc {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub motion: MotionDesc,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub enum PartModeDesc {
    #[default]
    #[serde(rename = "2Nx2N")]
    Part2Nx2N,
    #[serde(rename = "2NxN")]
    Part2NxN,
    #[serde(rename = "Nx2N")]
    PartNx2N,
    #[serde(rename = "NxN")]
    PartNxN,
    #[serde(rename = "2NxnU")]
    Part2NxnU,
    #[serde(rename = "2NxnD")]
    Part2NxnD,
    #[serde(rename = "nLx2N")]
    PartnLx2N,
    #[serde(rename = "nRx2N")]
    PartnRx2N,
}

#[derive(Debug, Deserialize)]
pub struct CodingUnitDesc {
    pub x: u32,
    pub y: u32,
    pub log2_size: u8,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub part_mode: PartModeDesc,
    /// 每个 PU 的 merge_idx
    pub merge_idx: Vec<u8>,
}

// ============================================================
// 输出结构体
// ============================================================

/// 一个 PU 的跟踪结果
#[derive(Debug, Serialize)]
pub struct PuTrace {
    pub poc: i32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub part_idx: u8,
    pub merge_idx: u8,
    /// 被选中的候选来源 (A1/B1/B0/A0/B2/Col/Comb(a,b)/ZeroN)
    pub source: String,
    /// 完整候选列表
    pub candidates: Vec<String>,
    pub l0: Option<ListTrace>,
    pub l1: Option<ListTrace>,
}

#[derive(Debug, Serialize)]
pub struct ListTrace {
    pub ref_idx: i8,
    pub ref_poc: i32,
    pub mv: [i16; 2],
}

impl std::fmt::Display for PuTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "POC {} ({},{}) {}x{} part {} merge_idx {} -> {}",
            self.poc,
            self.x,
            self.y,
            self.width,
            self.height,
            self.part_idx,
            self.merge_idx,
            self.source
        )?;
        for (name, list) in [("L0", &self.l0), ("L1", &self.l1)] {
            match list {
                Some(l) => write!(
                    f,
                    " {}[{}@{}]({},{})",
                    name, l.ref_idx, l.ref_poc, l.mv[0], l.mv[1]
                )?,
                None => write!(f, " {}[-]", name)?,
            }
        }
        write!(f, " | {}", self.candidates.join(" "))
    }
}

// ============================================================
// 转换
// ============================================================

impl From<&ConfigDesc> for MergeConfig {
    fn from(desc: &ConfigDesc) -> Self {
        MergeConfig {
            motion_field_capacity: desc.motion_field_capacity,
            parallel_regions: desc.parallel_regions,
        }
    }
}

impl From<&PictureDesc> for PictureParams {
    fn from(desc: &PictureDesc) -> Self {
        let tiles = match &desc.tiles {
            TilesDesc::Single => TileLayout::Single,
            TilesDesc::Uniform { columns, rows } => TileLayout::Uniform {
                columns: *columns,
                rows: *rows,
            },
            TilesDesc::Explicit {
                column_widths,
                row_heights,
            } => TileLayout::Explicit {
                column_widths: column_widths.clone(),
                row_heights: row_heights.clone(),
            },
        };
        PictureParams {
            width: desc.width,
            height: desc.height,
            log2_ctb_size: desc.log2_ctb_size,
            log2_min_tb_size: desc.log2_min_tb_size,
            log2_parallel_merge_level: desc.log2_parallel_merge_level,
            temporal_mvp_enabled: desc.temporal_mvp_enabled,
            tiles,
        }
    }
}

impl From<PartModeDesc> for PartMode {
    fn from(desc: PartModeDesc) -> Self {
        match desc {
            PartModeDesc::Part2Nx2N => PartMode::Part2Nx2N,
            PartModeDesc::Part2NxN => PartMode::Part2NxN,
            PartModeDesc::PartNx2N => PartMode::PartNx2N,
            PartModeDesc::PartNxN => PartMode::PartNxN,
            PartModeDesc::Part2NxnU => PartMode::Part2NxnU,
            PartModeDesc::Part2NxnD => PartMode::Part2NxnD,
            PartModeDesc::PartnLx2N => PartMode::PartnLx2N,
            PartModeDesc::PartnRx2N => PartMode::PartnRx2N,
        }
    }
}

impl TryFrom<MotionDesc> for PbMotion {
    type Error = YunError;

    fn try_from(desc: MotionDesc) -> Result<Self, Self::Error> {
        let list = |l: Option<ListMotionDesc>| match l {
            Some(l) => ListMotion::new(l.ref_idx, MotionVector::new(l.mv[0], l.mv[1])),
            None => Ok(ListMotion::unused()),
        };
        Ok(PbMotion::new(list(desc.l0)?, list(desc.l1)?))
    }
}

impl SliceDesc {
    fn to_header(&self) -> SliceHeader {
        let to_refs = |list: &[RefPictureDesc]| -> Vec<RefPicture> {
            list.iter()
                .map(|r| RefPicture {
                    poc: r.poc,
                    long_term: r.long_term,
                })
                .collect()
        };
        let active = self.num_ref_idx_active.unwrap_or([
            u8::try_from(self.l0.len()).unwrap_or(u8::MAX),
            u8::try_from(self.l1.len()).unwrap_or(u8::MAX),
        ]);
        SliceHeader {
            slice_addr_rs: self.slice_addr_rs,
            slice_type: match self.slice_type {
                SliceTypeDesc::P => SliceType::P,
                SliceTypeDesc::B => SliceType::B,
                SliceTypeDesc::I => SliceType::I,
            },
            max_num_merge_cand: self.max_num_merge_cand,
            num_ref_idx_active: active,
            ref_pic_list: [to_refs(&self.l0), to_refs(&self.l1)],
            temporal_mvp_enabled: self.temporal_mvp_enabled,
            collocated_from_l0: self.collocated_from_l0,
            collocated_ref_idx: self.collocated_ref_idx,
        }
    }
}

impl CodingUnitDesc {
    fn to_coding_unit(&self) -> Result<CodingUnit> {
        if self.skip {
            if self.merge_idx.len() != 1 {
                bail!(
                    "跳过模式 CU ({},{}) 需要且仅需要一个 merge_idx",
                    self.x,
                    self.y
                );
            }
            return Ok(CodingUnit::skip(
                self.x,
                self.y,
                self.log2_size,
                self.merge_idx[0],
            ));
        }
        Ok(CodingUnit::merge(
            self.x,
            self.y,
            self.log2_size,
            self.part_mode.into(),
            &self.merge_idx,
        ))
    }
}

// ============================================================
// 执行
// ============================================================

/// 按解码顺序执行场景, 返回每个 PU 的跟踪结果
pub fn run(scenario: &Scenario) -> Result<Vec<PuTrace>> {
    let mut decoder = MergeDecoder::new(MergeConfig::from(&scenario.config));
    let params = PictureParams::from(&scenario.picture);
    let mut traces = Vec::new();

    for entry in &scenario.pictures {
        decoder
            .begin_picture(entry.poc, params.clone())
            .with_context(|| format!("开始图像 POC {} 失败", entry.poc))?;
        decoder.declare_reference_pocs(&entry.reference_pocs)?;
        if let Err(e) = decode_picture(&mut decoder, entry, &params, &mut traces) {
            decoder.discard_picture();
            return Err(e);
        }
        decoder
            .finish_picture()
            .with_context(|| format!("结束图像 POC {} 失败", entry.poc))?;
        info!("POC {} 解码完成", entry.poc);
    }
    Ok(traces)
}

fn decode_picture(
    decoder: &mut MergeDecoder,
    entry: &PictureEntry,
    params: &PictureParams,
    traces: &mut Vec<PuTrace>,
) -> Result<()> {
    for (slice_idx, desc) in entry.slices.iter().enumerate() {
        let header = desc.to_header();
        let slice = decoder
            .add_slice(header.clone())
            .with_context(|| format!("POC {} slice #{} 参数无效", entry.poc, slice_idx))?;

        for block in &desc.blocks {
            let pu = PredictionUnit {
                x_cb: block.x,
                y_cb: block.y,
                cb_size: block.width.max(block.height),
                x: block.x,
                y: block.y,
                width: block.width,
                height: block.height,
                part_idx: 0,
                part_mode: PartMode::Part2Nx2N,
            };
            PbMotion::try_from(block.motion)
                .and_then(|motion| decoder.store_inter_motion(slice, &pu, motion))
                .with_context(|| {
                    format!("POC {} 写入预测块 ({},{}) 失败", entry.poc, block.x, block.y)
                })?;
        }

        let cus = desc
            .coding_units
            .iter()
            .map(CodingUnitDesc::to_coding_unit)
            .collect::<Result<Vec<_>>>()?;
        for group in merge_region_groups(&cus, params.log2_parallel_merge_level) {
            debug!("POC {} 解码 {} 个 CU", entry.poc, group.len());
            let first = &group[0];
            let outcomes = decoder
                .decode_region(slice, group, &mut NullSampleSink)
                .with_context(|| {
                    format!("POC {} CU ({},{}) 解码失败", entry.poc, first.x, first.y)
                })?;
            traces.extend(outcomes.iter().map(|o| trace_of(entry.poc, &header, o)));
        }
    }
    Ok(())
}

/// 把相邻且左上角位于同一并行合并区域的 CU 分为一组
fn merge_region_groups(cus: &[CodingUnit], log2_pml: u8) -> Vec<&[CodingUnit]> {
    let region = |cu: &CodingUnit| (cu.x >> log2_pml, cu.y >> log2_pml);
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..=cus.len() {
        if i == cus.len() || region(&cus[i]) != region(&cus[start]) {
            if i > start {
                groups.push(&cus[start..i]);
            }
            start = i;
        }
    }
    groups
}

fn trace_of(poc: i32, header: &SliceHeader, outcome: &MergeOutcome) -> PuTrace {
    let list = |list: RefList| {
        let m = outcome.motion.list(list);
        if !m.pred_flag() {
            return None;
        }
        let ref_poc = header
            .ref_picture(list, m.ref_idx())
            .map(|p| p.poc)
            .unwrap_or_default();
        Some(ListTrace {
            ref_idx: m.ref_idx(),
            ref_poc,
            mv: [m.mv().x, m.mv().y],
        })
    };
    PuTrace {
        poc,
        x: outcome.pu.x,
        y: outcome.pu.y,
        width: outcome.pu.width,
        height: outcome.pu.height,
        part_idx: outcome.pu.part_idx,
        merge_idx: outcome.merge_idx,
        source: outcome.source().to_string(),
        candidates: outcome.list.iter().map(|c| c.source.to_string()).collect(),
        l0: list(RefList::L0),
        l1: list(RefList::L1),
    }
}
