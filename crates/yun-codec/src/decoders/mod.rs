//! 各编码标准的运动推导实现.

pub mod h265;
