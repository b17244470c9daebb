//! # PDSP 反演核心模块
//!
//! 多分散球形孔模型的全部数值机制：从散射曲线到孔径分布。
//!
//! ## 子模块
//! - `geometry`: 球形孔形状因子与体积
//! - `kernel`: 半径网格与正演核矩阵
//! - `preprocess`: 背景扣除与 Q 窗口裁剪
//! - `optimize`: 有界非线性最小化器
//! - `solver`: 正则化反演求解
//! - `properties`: 结构性质计算
//! - `export`: 报告与拟合状态导出
//! - `plot`: 图表生成
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `models/` 数据模型

pub mod export;
pub mod geometry;
pub mod kernel;
pub mod optimize;
pub mod plot;
pub mod preprocess;
pub mod properties;
pub mod solver;

pub use kernel::{KernelMatrix, RadiusGrid};
pub use solver::fit_pdsp;
