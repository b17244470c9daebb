//! # Porosa - 小角散射孔结构分析工具箱
//!
//! 从 SANS/SAXS 散射曲线反演多孔材料的孔径分布与结构性质。
//!
//! ## 子命令
//! - `fit` - 对散射数据执行 PDSP 模型拟合
//! - `recompute` - 从已保存的拟合状态重算结构性质
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/   (数据文件解析器)
//!   │     ├── pdsp/      (反演核心)
//!   │     └── models/    (数据模型)
//!   ├── batch/      (批量处理)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod models;
mod parsers;
mod pdsp;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
