//! # recompute 子命令 CLI 定义
//!
//! 仅结构性质的重算：衬度、密度、主相与 SSA 外推设置可变，
//! 拟合振幅取自已保存的状态文件，不重新拟合。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/recompute.rs`

use crate::models::MajorPhase;

use clap::Args;
use std::path::PathBuf;

/// recompute 子命令参数
#[derive(Args, Debug)]
pub struct RecomputeArgs {
    /// Input: fit state file written by `fit --save-state`
    pub input: PathBuf,

    /// Output report file path
    #[arg(short, long, default_value = "pdsp_recomputed.txt")]
    pub output: PathBuf,

    /// Scattering length density contrast between the 2 phases (1/cm^2)
    #[arg(short, long, default_value_t = 3e10)]
    pub contrast: f64,

    /// Bulk density of the solid phase (g/cm^3)
    #[arg(short, long, default_value_t = 1.0)]
    pub density: f64,

    /// Pore radius the specific surface area is extrapolated to (nm)
    #[arg(long, default_value_t = 0.2)]
    pub ssa_radius: f64,

    /// Number of grid points used for the SSA extrapolation
    #[arg(long, default_value_t = 7)]
    pub ssa_points: u32,

    /// Phase occupying more than half of the sample volume
    #[arg(long, value_enum, default_value = "solid")]
    pub major_phase: MajorPhase,
}
