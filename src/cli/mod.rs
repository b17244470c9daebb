//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `fit`: 对散射数据执行 PDSP 拟合（单文件或批量目录）
//! - `recompute`: 从已保存的拟合状态重算结构性质
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: fit, recompute

pub mod fit;
pub mod recompute;

use clap::{Parser, Subcommand};

/// Porosa - 小角散射孔结构分析工具箱
#[derive(Parser)]
#[command(name = "porosa")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "A small-angle scattering porosimetry toolkit", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Fit the polydisperse spherical pore model to SAS data (.txt, .dat, .csv, .ABS)
    Fit(fit::FitArgs),

    /// Recompute structural properties from a saved fit state without refitting
    Recompute(recompute::RecomputeArgs),
}
