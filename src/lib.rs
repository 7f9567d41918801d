//! # Yun (运)
//!
//! 纯 Rust 实现的 H.265/HEVC 合并模式运动推导库.
//!
//! 对跳过/合并模式的预测单元, 按标准规定的顺序构建候选列表
//! (空域、时域、组合双向、零运动), 按 merge_idx 选出运动并写入运动场.
//!
//! # 快速开始
//!
//! ```rust
//! use yun::codec::decoders::h265::{
//!     CodingUnit, MergeConfig, MergeDecoder, NullSampleSink, PictureParams, RefPicture,
//!     SliceHeader, SliceType, TileLayout,
//! };
//!
//! let mut dec = MergeDecoder::new(MergeConfig::default());
//! dec.begin_picture(
//!     0,
//!     PictureParams {
//!         width: 32,
//!         height: 32,
//!         log2_ctb_size: 4,
//!         log2_min_tb_size: 2,
//!         log2_parallel_merge_level: 2,
//!         temporal_mvp_enabled: false,
//!         tiles: TileLayout::Single,
//!     },
//! )
//! .unwrap();
//! let slice = dec
//!     .add_slice(SliceHeader {
//!         slice_addr_rs: 0,
//!         slice_type: SliceType::B,
//!         max_num_merge_cand: 3,
//!         num_ref_idx_active: [1, 1],
//!         ref_pic_list: [vec![RefPicture::short_term(-4)], vec![RefPicture::short_term(4)]],
//!         temporal_mvp_enabled: false,
//!         collocated_from_l0: false,
//!         collocated_ref_idx: 0,
//!     })
//!     .unwrap();
//! let out = dec
//!     .decode_coding_unit(slice, &CodingUnit::skip(0, 0, 4, 2), &mut NullSampleSink)
//!     .unwrap();
//! println!("{} -> {}", out[0].source(), out[0].motion);
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `yun-core` | 错误类型与运动信息基础类型 |
//! | `yun-codec` | HEVC 合并模式运动推导 |

/// 核心类型与错误处理
pub use yun_core as core;

/// 运动推导实现
pub use yun_codec as codec;
