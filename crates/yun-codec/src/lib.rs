//! # yun-codec
//!
//! Yun 运动推导库, 实现 H.265/HEVC 跳过/合并模式预测单元的运动重建.
//!
//! 输入为熵解码后的 CU 语法、slice 参数与已解码运动, 输出为每个 PU 的
//! 运动矢量与参考索引, 并写入当前图像运动场.
//!
//! ## 使用示例
//!
//! ```rust
//! use yun_codec::decoders::h265::{
//!     CodingUnit, MergeConfig, MergeDecoder, NullSampleSink, PictureParams, RefPicture,
//!     SliceHeader, SliceType, TileLayout,
//! };
//!
//! let mut dec = MergeDecoder::new(MergeConfig::default());
//! let params = PictureParams {
//!     width: 64,
//!     height: 64,
//!     log2_ctb_size: 4,
//!     log2_min_tb_size: 2,
//!     log2_parallel_merge_level: 2,
//!     temporal_mvp_enabled: false,
//!     tiles: TileLayout::Single,
//! };
//! dec.begin_picture(8, params).unwrap();
//! let slice = dec
//!     .add_slice(SliceHeader {
//!         slice_addr_rs: 0,
//!         slice_type: SliceType::P,
//!         max_num_merge_cand: 5,
//!         num_ref_idx_active: [1, 0],
//!         ref_pic_list: [vec![RefPicture::short_term(0)], vec![]],
//!         temporal_mvp_enabled: false,
//!         collocated_from_l0: true,
//!         collocated_ref_idx: 0,
//!     })
//!     .unwrap();
//!
//! let cu = CodingUnit::skip(0, 0, 4, 0);
//! let out = dec.decode_coding_unit(slice, &cu, &mut NullSampleSink).unwrap();
//! assert_eq!(out.len(), 1);
//! let field = dec.finish_picture().unwrap();
//! assert!(field.is_written(0, 0));
//! ```

pub mod decoders;

// 重导出常用类型
pub use decoders::h265::{
    CodingUnit, InterSampleSink, MergeConfig, MergeDecoder, MergeOutcome, MotionField,
    NullSampleSink, PictureParams, SliceHeader,
};
