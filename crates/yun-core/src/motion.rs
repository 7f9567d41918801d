//! 运动信息基础类型.
//!
//! 运动矢量以 1/4 亮度样本为单位. 每个预测块最多使用两个参考图像列表 (L0/L1),
//! 每个列表上的运动由参考索引和运动矢量组成.

use std::fmt;

use crate::error::{YunError, YunResult};

/// 参考索引上限 (num_ref_idx_active 最大为 16)
pub const MAX_REF_IDX: u8 = 15;

/// 运动矢量 (1/4 样本精度)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MotionVector {
    /// 水平分量
    pub x: i16,
    /// 垂直分量
    pub y: i16,
}

impl MotionVector {
    /// 零运动矢量
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// 创建运动矢量
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for MotionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// 参考图像列表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefList {
    L0,
    L1,
}

impl RefList {
    /// 按 L0, L1 顺序排列的全部列表
    pub const ALL: [RefList; 2] = [RefList::L0, RefList::L1];

    /// 列表下标 (L0=0, L1=1)
    pub const fn index(self) -> usize {
        match self {
            RefList::L0 => 0,
            RefList::L1 => 1,
        }
    }
}

/// 单个参考列表上的运动.
///
/// 未使用的列表固定为 `ref_idx = -1` 且运动矢量为零, 因此两个 `ListMotion`
/// 可以直接按值比较.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListMotion {
    ref_idx: i8,
    mv: MotionVector,
}

impl ListMotion {
    /// 未使用的列表
    pub const fn unused() -> Self {
        Self {
            ref_idx: -1,
            mv: MotionVector::ZERO,
        }
    }

    /// 使用参考索引 `ref_idx` 的列表运动, 索引超过 [`MAX_REF_IDX`] 时返回
    /// `InvalidArgument`
    pub fn new(ref_idx: u8, mv: MotionVector) -> YunResult<Self> {
        if ref_idx > MAX_REF_IDX {
            return Err(YunError::InvalidArgument(format!(
                "参考索引 {} 超出上限 {}",
                ref_idx, MAX_REF_IDX
            )));
        }
        Ok(Self::checked(ref_idx, mv))
    }

    /// 已确认 `ref_idx <= MAX_REF_IDX` 的构造
    const fn checked(ref_idx: u8, mv: MotionVector) -> Self {
        assert!(ref_idx <= MAX_REF_IDX, "参考索引超出上限");
        Self {
            ref_idx: ref_idx as i8,
            mv,
        }
    }

    /// 是否使用该列表 (predFlagLX)
    pub const fn pred_flag(&self) -> bool {
        self.ref_idx >= 0
    }

    /// 参考索引, 未使用时为 -1
    pub const fn ref_idx(&self) -> i8 {
        self.ref_idx
    }

    /// 运动矢量, 未使用时为零
    pub const fn mv(&self) -> MotionVector {
        self.mv
    }
}

impl Default for ListMotion {
    fn default() -> Self {
        Self::unused()
    }
}

/// 一个预测块的完整运动描述 (两个列表)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PbMotion {
    lists: [ListMotion; 2],
}

impl PbMotion {
    /// 由两个列表的运动组成
    pub const fn new(l0: ListMotion, l1: ListMotion) -> Self {
        Self { lists: [l0, l1] }
    }

    /// 仅使用 L0 的运动.
    ///
    /// # Panics
    ///
    /// `ref_idx` 超过 [`MAX_REF_IDX`] 时 panic; 来自码流的索引应使用
    /// [`ListMotion::new`].
    pub const fn uni_l0(ref_idx: u8, mv: MotionVector) -> Self {
        Self::new(ListMotion::checked(ref_idx, mv), ListMotion::unused())
    }

    /// 仅使用 L1 的运动, 索引约束同 [`PbMotion::uni_l0`]
    pub const fn uni_l1(ref_idx: u8, mv: MotionVector) -> Self {
        Self::new(ListMotion::unused(), ListMotion::checked(ref_idx, mv))
    }

    /// 双向运动, 索引约束同 [`PbMotion::uni_l0`]
    pub const fn bi(
        ref_idx_l0: u8,
        mv_l0: MotionVector,
        ref_idx_l1: u8,
        mv_l1: MotionVector,
    ) -> Self {
        Self::new(
            ListMotion::checked(ref_idx_l0, mv_l0),
            ListMotion::checked(ref_idx_l1, mv_l1),
        )
    }

    /// 指定列表上的运动
    pub const fn list(&self, list: RefList) -> ListMotion {
        self.lists[list.index()]
    }

    /// 替换指定列表上的运动
    pub fn with_list(mut self, list: RefList, motion: ListMotion) -> Self {
        self.lists[list.index()] = motion;
        self
    }

    /// 是否同时使用两个列表
    pub const fn is_bi(&self) -> bool {
        self.lists[0].pred_flag() && self.lists[1].pred_flag()
    }

    /// 是否至少使用一个列表
    pub const fn is_inter(&self) -> bool {
        self.lists[0].pred_flag() || self.lists[1].pred_flag()
    }
}

impl fmt::Display for PbMotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, list) in RefList::ALL.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let m = self.list(*list);
            if m.pred_flag() {
                write!(f, "L{}[{}]{}", i, m.ref_idx(), m.mv())?;
            } else {
                write!(f, "L{}[-]", i)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unused_list_is_canonical() {
        let m = ListMotion::unused();
        assert!(!m.pred_flag());
        assert_eq!(m.ref_idx(), -1);
        assert_eq!(m.mv(), MotionVector::ZERO, "未使用列表的运动矢量应为零");
        assert_eq!(m, ListMotion::default());
    }

    #[test]
    fn test_with_list_clears_l1() {
        let bi = PbMotion::bi(0, MotionVector::new(4, -2), 1, MotionVector::new(-8, 6));
        assert!(bi.is_bi());
        let uni = bi.with_list(RefList::L1, ListMotion::unused());
        assert!(!uni.is_bi());
        assert_eq!(uni, PbMotion::uni_l0(0, MotionVector::new(4, -2)));
    }

    #[test]
    fn test_ref_idx_above_limit_is_rejected() {
        let mv = MotionVector::new(1, 1);
        assert_eq!(ListMotion::new(MAX_REF_IDX, mv).unwrap().ref_idx(), 15);
        for ref_idx in [MAX_REF_IDX + 1, 128, 200, u8::MAX] {
            let err = ListMotion::new(ref_idx, mv);
            assert!(
                matches!(err, Err(YunError::InvalidArgument(_))),
                "ref_idx={} 应被拒绝而不是截断",
                ref_idx
            );
        }
    }

    #[test]
    fn test_display() {
        let m = PbMotion::uni_l0(2, MotionVector::new(4, -2));
        assert_eq!(m.to_string(), "L0[2](4,-2) L1[-]");
    }
}
