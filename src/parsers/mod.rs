//! # 解析器模块
//!
//! 提供散射数据文件的解析器。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: sas_data

pub mod sas_data;

use crate::error::{PorosaError, Result};
use crate::models::ScatteringCurve;
use std::path::Path;

/// 支持的数据文件扩展名
pub const DATA_EXTENSIONS: &[&str] = &["txt", "dat", "csv", "abs"];

/// 从文件路径推断格式并解析
pub fn parse_data_file(path: &Path) -> Result<ScatteringCurve> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    if DATA_EXTENSIONS.contains(&ext.as_str()) {
        sas_data::parse_sas_file(path)
    } else {
        Err(PorosaError::UnsupportedFormat(format!(
            "Cannot determine format for: {} (expected .txt, .dat, .csv or .ABS)",
            path.display()
        )))
    }
}
