//! 编码单元 (CU) 与预测单元 (PU) 的几何划分.

use yun_core::{YunError, YunResult};

/// CU 划分模式 (part_mode)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartMode {
    Part2Nx2N,
    Part2NxN,
    PartNx2N,
    PartNxN,
    Part2NxnU,
    Part2NxnD,
    PartnLx2N,
    PartnRx2N,
}

impl PartMode {
    /// 该模式包含的 PU 数量
    pub fn num_parts(self) -> u8 {
        match self {
            PartMode::Part2Nx2N => 1,
            PartMode::PartNxN => 4,
            _ => 2,
        }
    }

    /// 是否为非对称划分 (AMP)
    pub fn is_asymmetric(self) -> bool {
        matches!(
            self,
            PartMode::Part2NxnU | PartMode::Part2NxnD | PartMode::PartnLx2N | PartMode::PartnRx2N
        )
    }

    /// 第 `part_idx` 个 PU 相对 CU 左上角的位置与尺寸 `(xB, yB, nPbW, nPbH)`
    pub fn pu_rect(self, part_idx: u8, cb_size: u32) -> YunResult<(u32, u32, u32, u32)> {
        if part_idx >= self.num_parts() {
            return Err(YunError::InvalidData(format!(
                "HEVC: {:?} 不存在 partIdx={}",
                self, part_idx
            )));
        }
        let n = cb_size;
        let half = n / 2;
        let quarter = n / 4;
        let i = u32::from(part_idx);
        let rect = match self {
            PartMode::Part2Nx2N => (0, 0, n, n),
            PartMode::Part2NxN => (0, i * half, n, half),
            PartMode::PartNx2N => (i * half, 0, half, n),
            PartMode::PartNxN => ((i & 1) * half, (i >> 1) * half, half, half),
            PartMode::Part2NxnU => {
                if i == 0 {
                    (0, 0, n, quarter)
                } else {
                    (0, quarter, n, n - quarter)
                }
            }
            PartMode::Part2NxnD => {
                if i == 0 {
                    (0, 0, n, n - quarter)
                } else {
                    (0, n - quarter, n, quarter)
                }
            }
            PartMode::PartnLx2N => {
                if i == 0 {
                    (0, 0, quarter, n)
                } else {
                    (quarter, 0, n - quarter, n)
                }
            }
            PartMode::PartnRx2N => {
                if i == 0 {
                    (0, 0, n - quarter, n)
                } else {
                    (n - quarter, 0, quarter, n)
                }
            }
        };
        Ok(rect)
    }
}

/// CU 级预测模式 (CuPredMode 与 cu_skip_flag 合并表示)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CuPredMode {
    Skip,
    Inter,
    Intra,
}

/// 单个 PU 实际使用的预测方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionMode {
    Skip,
    Merge,
    Amvp,
    Intra,
}

/// 熵解码得到的 PU 语法元素
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PuSyntax {
    /// merge_flag
    pub merge_flag: bool,
    /// merge_idx
    pub merge_idx: u8,
}

impl PuSyntax {
    /// 合并模式 PU
    pub const fn merge(merge_idx: u8) -> Self {
        Self {
            merge_flag: true,
            merge_idx,
        }
    }
}

/// 熵解码得到的 CU 语法信息
#[derive(Debug, Clone)]
pub struct CodingUnit {
    /// 亮度左上角 xCb
    pub x: u32,
    /// 亮度左上角 yCb
    pub y: u32,
    /// log2CbSize
    pub log2_size: u8,
    /// 预测模式
    pub pred_mode: CuPredMode,
    /// 划分模式
    pub part_mode: PartMode,
    /// 各 PU 的语法元素, 按 partIdx 排列
    pub prediction_units: Vec<PuSyntax>,
}

impl CodingUnit {
    /// 跳过模式 CU (始终为 2Nx2N 单 PU)
    pub fn skip(x: u32, y: u32, log2_size: u8, merge_idx: u8) -> Self {
        Self {
            x,
            y,
            log2_size,
            pred_mode: CuPredMode::Skip,
            part_mode: PartMode::Part2Nx2N,
            prediction_units: vec![PuSyntax::merge(merge_idx)],
        }
    }

    /// 所有 PU 均为合并模式的帧间 CU
    pub fn merge(x: u32, y: u32, log2_size: u8, part_mode: PartMode, merge_idx: &[u8]) -> Self {
        Self {
            x,
            y,
            log2_size,
            pred_mode: CuPredMode::Inter,
            part_mode,
            prediction_units: merge_idx.iter().map(|&idx| PuSyntax::merge(idx)).collect(),
        }
    }

    /// nCbS
    pub fn size(&self) -> u32 {
        1 << self.log2_size
    }

    /// 第 `part_idx` 个 PU 的预测方式
    pub fn prediction_mode(&self, part_idx: u8) -> PredictionMode {
        match self.pred_mode {
            CuPredMode::Skip => PredictionMode::Skip,
            CuPredMode::Intra => PredictionMode::Intra,
            CuPredMode::Inter => match self.prediction_units.get(part_idx as usize) {
                Some(pu) if pu.merge_flag => PredictionMode::Merge,
                _ => PredictionMode::Amvp,
            },
        }
    }

    /// 第 `part_idx` 个 PU 的 merge_idx
    pub fn merge_idx(&self, part_idx: u8) -> YunResult<u8> {
        self.prediction_units
            .get(part_idx as usize)
            .map(|pu| pu.merge_idx)
            .ok_or_else(|| {
                YunError::InvalidData(format!(
                    "HEVC: CU ({},{}) 缺少 partIdx={} 的 PU 语法",
                    self.x, self.y, part_idx
                ))
            })
    }

    /// 校验 CU 尺寸与划分模式的组合
    pub fn validate(&self) -> YunResult<()> {
        if !(3..=6).contains(&self.log2_size) {
            return Err(YunError::InvalidData(format!(
                "HEVC: log2CbSize={} 超出 [3, 6]",
                self.log2_size
            )));
        }
        let size = self.size();
        if self.x % size != 0 || self.y % size != 0 {
            return Err(YunError::InvalidData(format!(
                "HEVC: CU ({},{}) 未按 {} 对齐",
                self.x, self.y, size
            )));
        }
        if self.pred_mode == CuPredMode::Skip && self.part_mode != PartMode::Part2Nx2N {
            return Err(YunError::InvalidData(format!(
                "HEVC: 跳过模式 CU 不能使用 {:?}",
                self.part_mode
            )));
        }
        if self.part_mode.is_asymmetric() && size < 16 {
            return Err(YunError::InvalidData(format!(
                "HEVC: {}x{} CU 不支持非对称划分 {:?}",
                size, size, self.part_mode
            )));
        }
        if self.part_mode == PartMode::PartNxN && self.pred_mode != CuPredMode::Intra && size == 8 {
            return Err(YunError::InvalidData(
                "HEVC: 8x8 帧间 CU 不能使用 NxN (4x4 帧间块)".into(),
            ));
        }
        let expected = self.part_mode.num_parts() as usize;
        if self.pred_mode != CuPredMode::Intra && self.prediction_units.len() != expected {
            return Err(YunError::InvalidData(format!(
                "HEVC: {:?} 需要 {} 个 PU, 实际 {}",
                self.part_mode,
                expected,
                self.prediction_units.len()
            )));
        }
        Ok(())
    }
}

/// 一个预测单元的完整几何信息 (亮度绝对坐标)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionUnit {
    /// xCb
    pub x_cb: u32,
    /// yCb
    pub y_cb: u32,
    /// nCbS
    pub cb_size: u32,
    /// xPb = xCb + xB
    pub x: u32,
    /// yPb = yCb + yB
    pub y: u32,
    /// nPbW
    pub width: u32,
    /// nPbH
    pub height: u32,
    /// partIdx
    pub part_idx: u8,
    /// 所属 CU 的划分模式
    pub part_mode: PartMode,
}

impl PredictionUnit {
    /// 按划分模式求出 CU 的第 `part_idx` 个 PU
    pub fn from_cu(cu: &CodingUnit, part_idx: u8) -> YunResult<Self> {
        let cb_size = cu.size();
        let (xb, yb, width, height) = cu.part_mode.pu_rect(part_idx, cb_size)?;
        Ok(Self {
            x_cb: cu.x,
            y_cb: cu.y,
            cb_size,
            x: cu.x + xb,
            y: cu.y + yb,
            width,
            height,
            part_idx,
            part_mode: cu.part_mode,
        })
    }

    /// 单一合并列表 (singleMCLFlag) 下替代的整 CU 预测块
    pub fn as_whole_cu(&self) -> Self {
        Self {
            x: self.x_cb,
            y: self.y_cb,
            width: self.cb_size,
            height: self.cb_size,
            part_idx: 0,
            ..*self
        }
    }
}
