//! # 结构性质计算器
//!
//! 由逐 bin 拟合振幅计算孔隙率、平均孔体积、孔数密度、
//! 比表面积分布 SSA(R)、微分孔体积 dV/dr 以及外推 SSA。
//! 纯函数：同一振幅向量与参数重复调用结果完全一致，
//! 因此可在不重新拟合的情况下用新的物理参数重算。
//!
//! ## 不确定度模型
//! 逐 bin 相对误差的均值按经验系数放大：孔隙率 ×3，
//! 孔数密度与外推 SSA ×4。该系数沿用既有约定以保持结果兼容，
//! 属近似误差模型而非严格误差传播。
//!
//! ## 依赖关系
//! - 被 `pdsp/solver.rs` 与 `commands/recompute.rs` 调用
//! - 使用 `pdsp/geometry.rs` 的球体积

use crate::models::{MajorPhase, Measured, PhysicalParams, StructuralProperties};
use crate::pdsp::geometry::sphere_volume;

use std::f64::consts::PI;

/// Å → cm 换算
const ANGSTROM_TO_CM: f64 = 1e-8;

/// 计算全部结构性质；返回 (半径网格 nm, 性质)
///
/// `radius_angstrom` 为裁剪后的名义网格，`f_r`/`f_dash_r` 为
/// 数密度概率密度与逐 bin 概率质量，`amplitudes` 为拟合振幅
pub fn compute(
    radius_angstrom: &[f64],
    amplitudes: &[Measured],
    f_r: &[Measured],
    f_dash_r: &[Measured],
    phys: &PhysicalParams,
) -> (Vec<f64>, StructuralProperties) {
    let n = radius_angstrom.len();
    let mean_err = amplitudes.iter().map(|m| m.rel_err).sum::<f64>() / n as f64;

    // 平均孔体积 V̄ = Σ 4/3·π·(r·1e-8)³·f'_i
    let v_avg: f64 = radius_angstrom
        .iter()
        .zip(f_dash_r.iter())
        .map(|(&r, f)| sphere_volume(r * ANGSTROM_TO_CM) * f.value)
        .sum();
    let pore_volume_avg = Measured::new(v_avg, mean_err);

    // 绝对强度 → 体积分数换算因子 K = mean(IQ0_i/Δρ²/f'_i·1e48)，
    // 满足 PDSP 不变量 K = φ(1−φ)/V̄
    let k: f64 = amplitudes
        .iter()
        .zip(f_dash_r.iter())
        .map(|(a, f)| a.value / (phys.contrast * phys.contrast) / f.value * 1e48)
        .sum::<f64>()
        / n as f64;

    // 孔隙率：φ² − φ + K·V̄ = 0；判别式为负时两根共轭，
    // 实部同为 1/2，以 physical = false 标记后继续
    let c = k * v_avg;
    let disc = 1.0 - 4.0 * c;
    let physical = disc >= 0.0;
    let phi = if physical {
        let sqrt_disc = disc.sqrt();
        match phys.major_phase {
            MajorPhase::Solid => (1.0 - sqrt_disc) / 2.0,
            MajorPhase::Void => (1.0 + sqrt_disc) / 2.0,
        }
    } else {
        0.5
    };
    let porosity = Measured::new(phi, mean_err * 3.0);

    // 孔数密度 N = φ/V̄
    let n_conc = phi / v_avg;
    let pore_concentration = Measured::new(n_conc, mean_err * 4.0);

    // SSA(R)：从最大半径向下累加 4π(r·1e-8)²·f'_i·N
    let mut ssa = vec![Measured::new(0.0, 0.0); n];
    let mut running = 0.0;
    for i in (0..n).rev() {
        let r_cm = radius_angstrom[i] * ANGSTROM_TO_CM;
        running += 4.0 * PI * r_cm * r_cm * f_dash_r[i].value * n_conc;
        ssa[i] = Measured::new(running, amplitudes[i].rel_err);
    }

    // dV/dr = (φ/ρ_s)·f(r)·V(r)/V̄
    let dv_dr: Vec<Measured> = radius_angstrom
        .iter()
        .zip(f_r.iter())
        .zip(amplitudes.iter())
        .map(|((&r, f), a)| {
            let value =
                phi / phys.density * f.value * sphere_volume(r * ANGSTROM_TO_CM) / v_avg;
            Measured::new(value, a.rel_err)
        })
        .collect();

    // 输出网格换算为 nm
    let radius_nm: Vec<f64> = radius_angstrom.iter().map(|r| r / 10.0).collect();

    // SSA 外推：取 r ≥ r_e 的前 n_e 个点在 log-log 下线性拟合
    let ssa_extrapolated = Measured::new(
        extrapolate_ssa(&radius_nm, &ssa, phys.ssa_radius, phys.ssa_points as usize),
        mean_err * 4.0,
    );

    (
        radius_nm,
        StructuralProperties {
            porosity,
            pore_volume_avg,
            pore_concentration,
            ssa_extrapolated,
            ssa,
            dv_dr,
            physical,
        },
    )
}

/// SSA(R) 在 log-log 下的线性外推
///
/// 合格点不足 2 个时向更小半径补足；单点网格退化为平线。
/// 局部幂律假设只在 n_e 个点能代表局部趋势时成立
fn extrapolate_ssa(radius_nm: &[f64], ssa: &[Measured], r_e: f64, n_e: usize) -> f64 {
    let mut selected: Vec<usize> = (0..radius_nm.len())
        .filter(|&i| radius_nm[i] >= r_e)
        .take(n_e)
        .collect();

    // 半径全部小于 r_e 时从最大半径一侧补足两点
    while selected.len() < 2 {
        let lowest = selected.first().copied().unwrap_or(radius_nm.len());
        if lowest == 0 {
            break;
        }
        selected.insert(0, lowest - 1);
    }
    if selected.is_empty() {
        return 0.0;
    }

    let xs: Vec<f64> = selected.iter().map(|&i| radius_nm[i].log10()).collect();
    let ys: Vec<f64> = selected.iter().map(|&i| ssa[i].value.log10()).collect();
    let (slope, intercept) = linear_fit(&xs, &ys);
    10f64.powf(slope * r_e.log10() + intercept)
}

/// 最小二乘直线拟合，返回 (斜率, 截距)；单点退化为平线
fn linear_fit(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len() as f64;
    let mean_x: f64 = x.iter().sum::<f64>() / n;
    let mean_y: f64 = y.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        num += (xi - mean_x) * (yi - mean_y);
        den += (xi - mean_x) * (xi - mean_x);
    }
    if den > 0.0 {
        let slope = num / den;
        (slope, mean_y - slope * mean_x)
    } else {
        (0.0, mean_y)
    }
}
