//! # 背景扣除与 Q 窗口预处理
//!
//! 扣除平底背景、在第一个非正点处截断、限制到 (Qmin, Qmax) 窗口。
//! 下游对数拟合要求强度严格为正，出现首个非正点即视为到达噪声底，
//! 其后数据整体丢弃而非仅剔除负值点。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 在求解前调用
//! - 输入输出均为 `models/curve.rs` 的 ScatteringCurve

use crate::models::ScatteringCurve;

/// 扣除背景并裁剪 Q 窗口，返回新曲线（原曲线不变）
///
/// 相对误差按原始强度计算，再折算到扣除背景后的强度上；
/// 过滤不会重新归一化误差
pub fn subtract_and_trim(
    curve: &ScatteringCurve,
    background: f64,
    q_min: f64,
    q_max: f64,
) -> ScatteringCurve {
    let i_sub: Vec<f64> = curve.intensity.iter().map(|&i| i - background).collect();

    // 第一个非正点之前的数据保留，之后全部丢弃
    let cutoff = i_sub
        .iter()
        .position(|&i| i <= 0.0)
        .unwrap_or(i_sub.len());

    let mut q_out = Vec::new();
    let mut i_out = Vec::new();
    let mut e_out = Vec::new();

    for idx in 0..cutoff {
        let q = curve.q[idx];
        if q > q_min && q < q_max {
            let rel = if curve.intensity[idx] != 0.0 {
                curve.error[idx] / curve.intensity[idx]
            } else {
                0.0
            };
            q_out.push(q);
            i_out.push(i_sub[idx]);
            e_out.push(rel * i_sub[idx]);
        }
    }

    ScatteringCurve {
        q: q_out,
        intensity: i_out,
        error: e_out,
    }
}
