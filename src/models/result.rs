//! # 拟合结果数据模型
//!
//! 存储 PDSP 反演得到的全部数值结果：逐 bin 振幅、拟合曲线、
//! 孔径分布以及派生结构性质，各量均携带相对不确定度。
//!
//! ## 依赖关系
//! - 被 `pdsp/solver.rs` 与 `pdsp/properties.rs` 构造
//! - 被 `commands/`, `pdsp/export.rs`, `pdsp/plot.rs` 消费

use serde::{Deserialize, Serialize};

/// 值与相对不确定度的配对
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measured {
    /// 数值
    pub value: f64,
    /// 相对不确定度（绝对误差 = value * rel_err）
    pub rel_err: f64,
}

impl Measured {
    pub fn new(value: f64, rel_err: f64) -> Self {
        Self { value, rel_err }
    }

    /// 绝对误差
    pub fn abs_err(&self) -> f64 {
        self.value * self.rel_err
    }
}

/// 由逐 bin 振幅派生的结构性质；
/// 可在不重新拟合的情况下用新的物理参数重算
#[derive(Debug, Clone)]
pub struct StructuralProperties {
    /// 孔隙率 φ
    pub porosity: Measured,
    /// 平均孔体积 V̄ (cm³)
    pub pore_volume_avg: Measured,
    /// 孔数密度 N = φ/V̄ (cm⁻³)
    pub pore_concentration: Measured,
    /// 外推到指定孔半径的比表面积 (cm²/cm³)
    pub ssa_extrapolated: Measured,
    /// 逐 bin 比表面积分布 SSA(R)：半径 ≥ R 的所有孔的贡献
    pub ssa: Vec<Measured>,
    /// 逐 bin 质量归一化微分孔体积 dV/dr
    pub dv_dr: Vec<Measured>,
    /// 孔隙率二次方程是否有实根；false 时 φ 不可信，须以警告呈现
    pub physical: bool,
}

/// 一次完整 PDSP 拟合的结果
#[derive(Debug, Clone)]
pub struct FitResult {
    /// 裁剪后的名义半径网格 (Å)，严格递增
    pub radius_angstrom: Vec<f64>,
    /// 输出用半径网格 (nm)
    pub radius_nm: Vec<f64>,
    /// 逐 bin 拟合振幅 IQ0_i 及相对不确定度
    pub amplitudes: Vec<Measured>,
    /// 拟合时使用的数据 Q 值 (Å⁻¹)
    pub q: Vec<f64>,
    /// 正演预测强度 I_fit(Q)
    pub intensity_fitted: Vec<f64>,
    /// 输入（扣除背景后）的强度，随结果保存以便对比绘图
    pub intensity_data: Vec<f64>,
    /// 逐 bin 概率质量 f'(r_i)（振幅占比）
    pub f_dash_r: Vec<Measured>,
    /// 数密度加权概率密度 f(r_i)（单位半径）
    pub f_r: Vec<Measured>,
    /// 派生结构性质
    pub properties: StructuralProperties,
}

impl FitResult {
    /// 半径 bin 数量
    pub fn num_bins(&self) -> usize {
        self.radius_angstrom.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measured_abs_err() {
        let m = Measured::new(200.0, 0.05);
        assert!((m.abs_err() - 10.0).abs() < 1e-12);
    }
}
