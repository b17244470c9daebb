//! # 散射曲线数据模型
//!
//! 存储一条小角散射强度曲线 (Q, I, dI)。
//!
//! ## 不变量
//! - Q 严格递增且 Q > 0
//! - I 与 dI 有限，dI ≥ 0
//! - 三个数组长度一致
//!
//! ## 依赖关系
//! - 被 `parsers/sas_data.rs` 构造
//! - 被 `pdsp/` 模块消费

use crate::error::{PorosaError, Result};

/// 一条散射强度曲线，按 Q 升序排列
#[derive(Debug, Clone)]
pub struct ScatteringCurve {
    /// 散射矢量 Q (Å⁻¹)
    pub q: Vec<f64>,
    /// 散射强度 I(Q) (cm⁻¹)
    pub intensity: Vec<f64>,
    /// 测量不确定度 dI（绝对值）
    pub error: Vec<f64>,
}

impl ScatteringCurve {
    /// 构造曲线并检验不变量；数据按 Q 升序排序
    pub fn new(q: Vec<f64>, intensity: Vec<f64>, error: Vec<f64>) -> Result<Self> {
        if q.len() != intensity.len() || q.len() != error.len() {
            return Err(PorosaError::Other(format!(
                "Curve column lengths differ: Q = {}, I = {}, dI = {}",
                q.len(),
                intensity.len(),
                error.len()
            )));
        }

        for (&qi, (&ii, &ei)) in q.iter().zip(intensity.iter().zip(error.iter())) {
            if !qi.is_finite() || qi <= 0.0 {
                return Err(PorosaError::Other(format!(
                    "Scattering vector must be positive and finite, got Q = {}",
                    qi
                )));
            }
            if !ii.is_finite() || !ei.is_finite() || ei < 0.0 {
                return Err(PorosaError::Other(format!(
                    "Intensity values must be finite (I = {}, dI = {})",
                    ii, ei
                )));
            }
        }

        // 按 Q 升序排序
        let mut order: Vec<usize> = (0..q.len()).collect();
        order.sort_by(|&a, &b| q[a].partial_cmp(&q[b]).unwrap());

        let q_sorted: Vec<f64> = order.iter().map(|&i| q[i]).collect();
        let i_sorted: Vec<f64> = order.iter().map(|&i| intensity[i]).collect();
        let e_sorted: Vec<f64> = order.iter().map(|&i| error[i]).collect();

        Ok(Self {
            q: q_sorted,
            intensity: i_sorted,
            error: e_sorted,
        })
    }

    /// 数据点数量
    pub fn len(&self) -> usize {
        self.q.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// 将缺失的 dI（全零）替换为强度的固定百分比
    pub fn resolve_missing_errors(&mut self, percent: f64) {
        if self.error.iter().all(|&e| e == 0.0) {
            self.error = self
                .intensity
                .iter()
                .map(|&i| i.abs() * percent / 100.0)
                .collect();
        }
    }
}
