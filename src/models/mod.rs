//! # 数据模型模块
//!
//! 定义散射曲线、拟合参数和拟合结果的数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `pdsp/` 和 `commands/` 使用
//! - 子模块: curve, params, result

pub mod curve;
pub mod params;
pub mod result;

pub use curve::ScatteringCurve;
pub use params::{FitParams, MajorPhase, PhysicalParams};
pub use result::{FitResult, Measured, StructuralProperties};
