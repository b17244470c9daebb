//! # fit 子命令 CLI 定义
//!
//! PDSP 拟合的全部命令行参数，默认值与文档化参数域一致。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/fit.rs`

use crate::models::MajorPhase;

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 图像输出格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum PlotFormat {
    /// PNG image
    #[default]
    Png,
    /// SVG vector image
    Svg,
}

/// fit 子命令参数
#[derive(Args, Debug)]
pub struct FitArgs {
    /// Input: SAS data file or directory containing data files
    pub input: PathBuf,

    /// Output: report file path (single mode) or directory (batch mode)
    #[arg(short, long, default_value = "pdsp_result.txt")]
    pub output: PathBuf,

    // ─────────────────────────────────────────────────────────────
    // 预处理参数
    // ─────────────────────────────────────────────────────────────
    /// Flat background to subtract (1/cm)
    #[arg(short, long, default_value_t = 0.0)]
    pub background: f64,

    /// Lower bound of the Q window, exclusive (1/A)
    #[arg(long, default_value_t = 0.0)]
    pub q_min: f64,

    /// Upper bound of the Q window, exclusive (1/A)
    #[arg(long, default_value_t = f64::INFINITY)]
    pub q_max: f64,

    /// Percentage of I used as dI when the data file has no error column
    #[arg(long, default_value_t = 5.0)]
    pub error_percent: f64,

    // ─────────────────────────────────────────────────────────────
    // 求解器参数
    // ─────────────────────────────────────────────────────────────
    /// Number of radius grid points per decade
    #[arg(short, long, default_value_t = 10)]
    pub points_per_decade: u32,

    /// Smoothing factor lambda (0 = unregularized fit)
    #[arg(short, long, default_value_t = 1.0)]
    pub lambda: f64,

    // ─────────────────────────────────────────────────────────────
    // 结构性质参数
    // ─────────────────────────────────────────────────────────────
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

    // ─────────────────────────────────────────────────────────────
    // 输出选项
    // ─────────────────────────────────────────────────────────────
    /// Save the per-bin fit state next to the report (for `recompute`)
    #[arg(long, default_value_t = false)]
    pub save_state: bool,

    /// Write fit-comparison and distribution plots next to the report
    #[arg(long, default_value_t = false)]
    pub plot: bool,

    /// Plot image format
    #[arg(long, value_enum, default_value = "png")]
    pub plot_format: PlotFormat,

    /// Figure width in pixels (PNG) or points (SVG)
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Figure height in pixels (PNG) or points (SVG)
    #[arg(long, default_value_t = 800)]
    pub height: u32,

    // ─────────────────────────────────────────────────────────────
    // 批量处理参数
    // ─────────────────────────────────────────────────────────────
    /// Glob pattern for input files (batch mode)
    #[arg(long, default_value = "*.txt,*.dat,*.csv,*.ABS")]
    pub pattern: String,

    /// Number of parallel jobs (0 = auto, batch mode only)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Recurse into subdirectories (batch mode)
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
