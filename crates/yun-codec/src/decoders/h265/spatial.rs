//! 空域合并候选推导 (A1, B1, B0, A0, B2).

use yun_core::PbMotion;

use super::availability::{prediction_block_motion, same_merge_region};
use super::partition::{PartMode, PredictionUnit};
use super::picture::CurrentPicture;

/// 空域邻块位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialPosition {
    A1,
    B1,
    B0,
    A0,
    B2,
}

impl SpatialPosition {
    /// 候选加入列表的顺序
    pub const ORDER: [SpatialPosition; 5] = [
        SpatialPosition::A1,
        SpatialPosition::B1,
        SpatialPosition::B0,
        SpatialPosition::A0,
        SpatialPosition::B2,
    ];

    fn slot(self) -> usize {
        match self {
            SpatialPosition::A1 => 0,
            SpatialPosition::B1 => 1,
            SpatialPosition::B0 => 2,
            SpatialPosition::A0 => 3,
            SpatialPosition::B2 => 4,
        }
    }

    /// 邻块亮度坐标
    pub fn location(self, x_pb: u32, y_pb: u32, width: u32, height: u32) -> (i32, i32) {
        let (x, y, w, h) = (x_pb as i32, y_pb as i32, width as i32, height as i32);
        match self {
            SpatialPosition::A1 => (x - 1, y + h - 1),
            SpatialPosition::B1 => (x + w - 1, y - 1),
            SpatialPosition::B0 => (x + w, y - 1),
            SpatialPosition::A0 => (x - 1, y + h),
            SpatialPosition::B2 => (x - 1, y - 1),
        }
    }
}

/// 各空域位置的候选运动 (按 [`SpatialPosition::ORDER`] 存放)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpatialCandidates {
    slots: [Option<PbMotion>; 5],
}

impl SpatialCandidates {
    pub fn get(&self, pos: SpatialPosition) -> Option<PbMotion> {
        self.slots[pos.slot()]
    }

    pub fn set(&mut self, pos: SpatialPosition, motion: Option<PbMotion>) {
        self.slots[pos.slot()] = motion;
    }

    /// 按列表顺序输出可用候选
    pub fn iter(&self) -> impl Iterator<Item = (SpatialPosition, PbMotion)> + '_ {
        SpatialPosition::ORDER
            .iter()
            .filter_map(|&pos| self.get(pos).map(|m| (pos, m)))
    }

    pub fn count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// 去除重复运动.
    ///
    /// 比较对象是去重前的邻块运动: B1 对 A1, B0 对 B1, A0 对 A1, B2 对 A1 与 B1.
    /// 去重后 A0, A1, B0, B1 全部可用时丢弃 B2.
    pub fn pruned(&self) -> Self {
        use SpatialPosition::*;
        let raw = *self;
        let same = |a: SpatialPosition, b: SpatialPosition| match (raw.get(a), raw.get(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        };

        let mut out = raw;
        if same(B1, A1) {
            out.set(B1, None);
        }
        if same(B0, B1) {
            out.set(B0, None);
        }
        if same(A0, A1) {
            out.set(A0, None);
        }
        if same(B2, A1) || same(B2, B1) {
            out.set(B2, None);
        }
        if [A0, A1, B0, B1].iter().all(|&p| out.get(p).is_some()) {
            out.set(B2, None);
        }
        out
    }
}

/// 同一 CU 内第二个 PU 不使用第一个 PU 的运动
fn excluded_by_partition(pu: &PredictionUnit, pos: SpatialPosition, single_mcl: bool) -> bool {
    if pu.part_idx != 1 {
        return false;
    }
    match pos {
        SpatialPosition::A1 => {
            !single_mcl
                && matches!(
                    pu.part_mode,
                    PartMode::PartNx2N | PartMode::PartnLx2N | PartMode::PartnRx2N
                )
        }
        SpatialPosition::B1 => matches!(
            pu.part_mode,
            PartMode::Part2NxN | PartMode::Part2NxnU | PartMode::Part2NxnD
        ),
        _ => false,
    }
}

/// 推导空域候选 (已去重).
///
/// `pu` 为实际参与推导的预测块; 单一合并列表时调用方已将其替换为整个 CU.
pub fn derive_spatial_candidates(
    picture: &CurrentPicture,
    pu: &PredictionUnit,
    single_mcl: bool,
) -> SpatialCandidates {
    let log2_pml = picture.params().log2_parallel_merge_level;
    let mut raw = SpatialCandidates::default();
    for pos in SpatialPosition::ORDER {
        let (x_nb, y_nb) = pos.location(pu.x, pu.y, pu.width, pu.height);
        if same_merge_region(pu.x, pu.y, x_nb, y_nb, log2_pml)
            || excluded_by_partition(pu, pos, single_mcl)
        {
            continue;
        }
        let motion = prediction_block_motion(picture, pu, x_nb, y_nb).map(|r| r.motion);
        raw.set(pos, motion);
    }
    raw.pruned()
}
