//! # SAS 数据文件解析器
//!
//! 解析两列或三列的小角散射数据文本文件 (Q, I[, dI])。
//!
//! ## 格式说明
//! ```text
//! # 任意表头或注释行（数值列数与正文不同即被忽略）
//! 0.00102   231.5   4.1
//! 0.00115   209.8   3.9
//! ...
//! ```
//! 分隔符可为空白、逗号、分号或制表符（固定分隔符集合，
//! 不做格式猜测）。每行仅保留非负有限数值；数值列数与全文
//! 众数不符的行被丢弃。两列文件视为无 dI，由调用方以强度
//! 百分比补足。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/curve.rs` 的 ScatteringCurve
//! - 使用 `regex` 切分数据列

use crate::error::{PorosaError, Result};
use crate::models::ScatteringCurve;

use regex::Regex;
use std::fs;
use std::path::Path;

/// 解析 SAS 数据文件
pub fn parse_sas_file(path: &Path) -> Result<ScatteringCurve> {
    let content = fs::read_to_string(path).map_err(|e| PorosaError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_sas_content(
        &content,
        path.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

/// 从字符串内容解析 SAS 数据
pub fn parse_sas_content(content: &str, source_name: &str) -> Result<ScatteringCurve> {
    let delimiter = Regex::new(r"[ \t,;]+").unwrap();

    // 每行提取非负有限数值
    let rows: Vec<Vec<f64>> = content
        .lines()
        .map(|line| {
            delimiter
                .split(line.trim())
                .filter_map(|tok| tok.parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
                .collect()
        })
        .collect();

    // 数值列数的众数决定数据行；并列时取列数较多者
    let mut counts: Vec<(usize, usize)> = Vec::new(); // (列数, 行数)
    for row in &rows {
        if row.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(len, _)| *len == row.len()) {
            Some((_, c)) => *c += 1,
            None => counts.push((row.len(), 1)),
        }
    }
    let num_col = counts
        .iter()
        .max_by_key(|&&(len, count)| (count, len))
        .map(|&(len, _)| len)
        .ok_or_else(|| PorosaError::ParseError {
            format: "SAS data".to_string(),
            path: source_name.to_string(),
            reason: "no numeric rows found".to_string(),
        })?;

    if num_col < 2 {
        return Err(PorosaError::ParseError {
            format: "SAS data".to_string(),
            path: source_name.to_string(),
            reason: "data must contain at least Q and I columns".to_string(),
        });
    }

    let mut q = Vec::new();
    let mut intensity = Vec::new();
    let mut error = Vec::new();
    for row in rows.iter().filter(|r| r.len() == num_col) {
        // Q = 0 的行对后续对数处理无意义，跳过
        if row[0] <= 0.0 {
            continue;
        }
        q.push(row[0]);
        intensity.push(row[1]);
        error.push(if num_col > 2 { row[2] } else { 0.0 });
    }

    if q.is_empty() {
        return Err(PorosaError::ParseError {
            format: "SAS data".to_string(),
            path: source_name.to_string(),
            reason: "no usable data rows after filtering".to_string(),
        });
    }

    ScatteringCurve::new(q, intensity, error)
}
