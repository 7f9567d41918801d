//! 图像扫描布局: CTB 光栅/tile 扫描转换与最小变换块 z-scan 地址.
//!
//! 对应 H.265 6.5.1 (CtbAddrRsToTs, TileId) 与 6.5.2 (MinTbAddrZs).
//! 邻块可用性判断依赖这里的 z-scan 地址确定解码先后.

use yun_core::{YunError, YunResult};

use super::params::{PictureParams, TileLayout};

/// 一幅图像的扫描布局
#[derive(Debug, Clone)]
pub struct PictureLayout {
    width: u32,
    height: u32,
    log2_ctb_size: u8,
    log2_min_tb_size: u8,
    width_in_ctbs: u32,
    height_in_ctbs: u32,
    ctb_addr_rs_to_ts: Vec<u32>,
    tile_id_rs: Vec<u32>,
    min_tb_stride: usize,
    min_tb_addr_zs: Vec<u32>,
}

impl PictureLayout {
    /// 按图像参数构建布局
    pub fn new(params: &PictureParams) -> YunResult<Self> {
        params.validate()?;
        let ctb_size = 1u32 << params.log2_ctb_size;
        let width_in_ctbs = params.width.div_ceil(ctb_size);
        let height_in_ctbs = params.height.div_ceil(ctb_size);

        let (col_widths, row_heights) =
            tile_dimensions(&params.tiles, width_in_ctbs, height_in_ctbs)?;
        let col_bd = boundaries(&col_widths);
        let row_bd = boundaries(&row_heights);

        let pic_size_in_ctbs = (width_in_ctbs * height_in_ctbs) as usize;
        let mut ctb_addr_rs_to_ts = vec![0u32; pic_size_in_ctbs];
        let mut tile_id_rs = vec![0u32; pic_size_in_ctbs];
        for (ctb_addr_rs, (ts, tile_id)) in ctb_addr_rs_to_ts
            .iter_mut()
            .zip(tile_id_rs.iter_mut())
            .enumerate()
        {
            let tb_x = ctb_addr_rs as u32 % width_in_ctbs;
            let tb_y = ctb_addr_rs as u32 / width_in_ctbs;
            let tile_x = last_boundary_index(&col_bd, tb_x);
            let tile_y = last_boundary_index(&row_bd, tb_y);

            let mut v = 0u32;
            for width in &col_widths[..tile_x] {
                v += row_heights[tile_y] * width;
            }
            for height in &row_heights[..tile_y] {
                v += width_in_ctbs * height;
            }
            v += (tb_y - row_bd[tile_y]) * col_widths[tile_x] + tb_x - col_bd[tile_x];
            *ts = v;
            *tile_id = (tile_y * col_widths.len() + tile_x) as u32;
        }

        // 6.5.2: 每个最小变换块的 z-scan 地址
        let shift = u32::from(params.log2_ctb_size - params.log2_min_tb_size);
        let min_tb_stride = (width_in_ctbs << shift) as usize;
        let min_tb_rows = (height_in_ctbs << shift) as usize;
        let mut min_tb_addr_zs = vec![0u32; min_tb_stride * min_tb_rows];
        for y in 0..min_tb_rows {
            for x in 0..min_tb_stride {
                let tb_x = (x as u32) >> shift;
                let tb_y = (y as u32) >> shift;
                let ctb_addr_rs = (width_in_ctbs * tb_y + tb_x) as usize;
                let mut addr = ctb_addr_rs_to_ts[ctb_addr_rs] << (shift * 2);
                for i in 0..shift {
                    let m = 1u32 << i;
                    if m & x as u32 != 0 {
                        addr += m * m;
                    }
                    if m & y as u32 != 0 {
                        addr += 2 * m * m;
                    }
                }
                min_tb_addr_zs[y * min_tb_stride + x] = addr;
            }
        }

        Ok(Self {
            width: params.width,
            height: params.height,
            log2_ctb_size: params.log2_ctb_size,
            log2_min_tb_size: params.log2_min_tb_size,
            width_in_ctbs,
            height_in_ctbs,
            ctb_addr_rs_to_ts,
            tile_id_rs,
            min_tb_stride,
            min_tb_addr_zs,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn log2_ctb_size(&self) -> u8 {
        self.log2_ctb_size
    }

    /// PicWidthInCtbsY
    pub fn width_in_ctbs(&self) -> u32 {
        self.width_in_ctbs
    }

    /// PicHeightInCtbsY
    pub fn height_in_ctbs(&self) -> u32 {
        self.height_in_ctbs
    }

    /// 坐标是否位于图像内
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// 覆盖该亮度坐标的 CTB 光栅地址
    pub fn ctb_addr_rs(&self, x: u32, y: u32) -> usize {
        let ctb_x = x >> self.log2_ctb_size;
        let ctb_y = y >> self.log2_ctb_size;
        (ctb_y * self.width_in_ctbs + ctb_x) as usize
    }

    /// CtbAddrRsToTs
    pub fn ctb_addr_ts(&self, ctb_addr_rs: usize) -> Option<u32> {
        self.ctb_addr_rs_to_ts.get(ctb_addr_rs).copied()
    }

    /// 覆盖该亮度坐标的 tile 编号
    pub fn tile_id(&self, x: u32, y: u32) -> u32 {
        self.tile_id_rs
            .get(self.ctb_addr_rs(x, y))
            .copied()
            .unwrap_or(u32::MAX)
    }

    /// MinTbAddrZs[x >> MinTbLog2SizeY][y >> MinTbLog2SizeY]
    pub fn min_tb_addr_zs(&self, x: u32, y: u32) -> u32 {
        let tx = (x >> self.log2_min_tb_size) as usize;
        let ty = (y >> self.log2_min_tb_size) as usize;
        self.min_tb_addr_zs
            .get(ty * self.min_tb_stride + tx)
            .copied()
            .unwrap_or(u32::MAX)
    }
}

/// 各 tile 列宽与行高 (单位: CTB)
fn tile_dimensions(
    tiles: &TileLayout,
    width_in_ctbs: u32,
    height_in_ctbs: u32,
) -> YunResult<(Vec<u32>, Vec<u32>)> {
    match tiles {
        TileLayout::Single => Ok((vec![width_in_ctbs], vec![height_in_ctbs])),
        TileLayout::Uniform { columns, rows } => {
            if *columns == 0 || *rows == 0 || *columns > width_in_ctbs || *rows > height_in_ctbs {
                return Err(YunError::InvalidData(format!(
                    "HEVC: tile 划分 {}x{} 与 {}x{} CTB 不匹配",
                    columns, rows, width_in_ctbs, height_in_ctbs
                )));
            }
            Ok((
                uniform_spacing(width_in_ctbs, *columns),
                uniform_spacing(height_in_ctbs, *rows),
            ))
        }
        TileLayout::Explicit {
            column_widths,
            row_heights,
        } => {
            let cols_ok = !column_widths.is_empty()
                && column_widths.iter().all(|&w| w > 0)
                && column_widths.iter().sum::<u32>() == width_in_ctbs;
            let rows_ok = !row_heights.is_empty()
                && row_heights.iter().all(|&h| h > 0)
                && row_heights.iter().sum::<u32>() == height_in_ctbs;
            if !cols_ok || !rows_ok {
                return Err(YunError::InvalidData(format!(
                    "HEVC: 显式 tile 尺寸与图像 {}x{} CTB 不匹配",
                    width_in_ctbs, height_in_ctbs
                )));
            }
            Ok((column_widths.clone(), row_heights.clone()))
        }
    }
}

/// uniform_spacing_flag=1 时的列宽 (6-3)/行高 (6-4)
fn uniform_spacing(total: u32, count: u32) -> Vec<u32> {
    (0..count)
        .map(|i| ((i + 1) * total) / count - (i * total) / count)
        .collect()
}

/// 由尺寸序列得到边界序列 colBd/rowBd
fn boundaries(sizes: &[u32]) -> Vec<u32> {
    let mut bd = Vec::with_capacity(sizes.len() + 1);
    let mut acc = 0u32;
    bd.push(acc);
    for size in sizes {
        acc += size;
        bd.push(acc);
    }
    bd
}

/// 满足 `pos >= bd[i]` 的最大 i (不含末尾边界)
fn last_boundary_index(bd: &[u32], pos: u32) -> usize {
    let tiles = bd.len().saturating_sub(1);
    (0..tiles).rev().find(|&i| pos >= bd[i]).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_params(width: u32, height: u32, tiles: TileLayout) -> PictureParams {
        PictureParams {
            width,
            height,
            log2_ctb_size: 4,
            log2_min_tb_size: 2,
            log2_parallel_merge_level: 2,
            temporal_mvp_enabled: false,
            tiles,
        }
    }

    #[test]
    fn test_zscan_order_inside_ctb() {
        let layout = PictureLayout::new(&build_params(32, 32, TileLayout::Single)).unwrap();
        // 16x16 CTB 内 4x4 块的 z-scan 序
        assert_eq!(layout.min_tb_addr_zs(0, 0), 0);
        assert_eq!(layout.min_tb_addr_zs(4, 0), 1);
        assert_eq!(layout.min_tb_addr_zs(0, 4), 2);
        assert_eq!(layout.min_tb_addr_zs(4, 4), 3);
        assert_eq!(layout.min_tb_addr_zs(8, 0), 4);
        assert_eq!(layout.min_tb_addr_zs(0, 8), 8);
        assert_eq!(layout.min_tb_addr_zs(12, 12), 15);
        // 第二个 CTB 从 16 开始
        assert_eq!(layout.min_tb_addr_zs(16, 0), 16);
        assert_eq!(layout.min_tb_addr_zs(0, 16), 32);
    }

    #[test]
    fn test_tiles_reorder_ctbs() {
        // 4x2 CTB, 两列 tile: 左 tile 先扫描完毕
        let params = build_params(
            64,
            32,
            TileLayout::Explicit {
                column_widths: vec![2, 2],
                row_heights: vec![2],
            },
        );
        let layout = PictureLayout::new(&params).unwrap();
        let ts: Vec<u32> = (0..8).map(|rs| layout.ctb_addr_ts(rs).unwrap()).collect();
        assert_eq!(ts, vec![0, 1, 4, 5, 2, 3, 6, 7]);
        assert_eq!(layout.tile_id(0, 0), 0);
        assert_eq!(layout.tile_id(32, 16), 1);
        assert!(
            layout.min_tb_addr_zs(0, 16) < layout.min_tb_addr_zs(32, 0),
            "左 tile 第二行 CTB 应先于右 tile 解码"
        );
    }

    #[test]
    fn test_uniform_tiles() {
        assert_eq!(uniform_spacing(5, 2), vec![2, 3]);
        assert_eq!(uniform_spacing(6, 3), vec![2, 2, 2]);
        let params = build_params(80, 16, TileLayout::Uniform { columns: 2, rows: 1 });
        let layout = PictureLayout::new(&params).unwrap();
        assert_eq!(layout.tile_id(16, 0), 0);
        assert_eq!(layout.tile_id(32, 0), 1);
    }

    #[test]
    fn test_partial_ctb_picture() {
        let layout = PictureLayout::new(&build_params(40, 24, TileLayout::Single)).unwrap();
        assert_eq!(layout.width_in_ctbs(), 3);
        assert_eq!(layout.height_in_ctbs(), 2);
        assert!(layout.contains(39, 23));
        assert!(!layout.contains(40, 0));
        assert!(!layout.contains(-1, 0));
    }

    #[test]
    fn test_bad_explicit_tiles() {
        let params = build_params(
            64,
            32,
            TileLayout::Explicit {
                column_widths: vec![1, 2],
                row_heights: vec![2],
            },
        );
        assert!(PictureLayout::new(&params).is_err(), "列宽之和必须等于图像宽度");
    }
}
