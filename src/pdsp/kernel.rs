//! # 正演算子
//!
//! 构建把对数均匀孔半径网格映射到预测散射强度的核矩阵。
//! 每个半径 bin 在其子区间 [R_min_i, R_max_i] 上用中点法则积分
//! V²(r)·F(Qr)，再按 bin 宽度归一化。
//!
//! ## 算法概述
//! 1. bin 边界取对数空间中相邻格点的几何中点
//! 2. 每个 bin 均分为 600 个子区间（积分精度与开销的经验折中，
//!    改动须重新验证拟合精度）
//! 3. I_q = Σ_i IQ0_i · kernel[i][q]
//!
//! ## 依赖关系
//! - 被 `pdsp/solver.rs` 调用
//! - 使用 `pdsp/geometry.rs` 的形状因子与体积函数

use crate::pdsp::geometry::{sphere_form_factor, sphere_volume};

/// 每个半径 bin 的积分子区间数
const NUM_SUBINTERVALS: usize = 600;

/// 对数均匀半径网格 (Å)
#[derive(Debug, Clone)]
pub struct RadiusGrid {
    /// 格点中心的 log10 值，严格递增，等间距
    pub log_r: Vec<f64>,
    /// 格点中心半径 10^log_r
    pub r: Vec<f64>,
    /// 对数步长 = 1/pointsPerDecade
    pub log_step: f64,
}

impl RadiusGrid {
    /// 在 [log_min, log_max] 上以 log_step 为步长构建网格
    /// （上界含容差，端点计入）
    pub fn from_log_range(log_min: f64, log_max: f64, log_step: f64) -> Self {
        let mut log_r = Vec::new();
        let mut lg = log_min;
        while lg < log_max + log_step / 2.0 {
            log_r.push(lg);
            lg += log_step;
        }
        let r = log_r.iter().map(|&l| 10f64.powf(l)).collect();
        Self { log_r, r, log_step }
    }

    /// 格点数量
    pub fn len(&self) -> usize {
        self.r.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }

    /// 第 i 个 bin 的线性边界 (R_min_i, R_max_i)
    pub fn bin_edges(&self, i: usize) -> (f64, f64) {
        let lo = 10f64.powf(self.log_r[i] - self.log_step / 2.0);
        let hi = 10f64.powf(self.log_r[i] + self.log_step / 2.0);
        (lo, hi)
    }

    /// 第 i 个 bin 的线性宽度 ΔR_i
    pub fn bin_width(&self, i: usize) -> f64 {
        let (lo, hi) = self.bin_edges(i);
        hi - lo
    }
}

/// 核矩阵：kernel[i][q] 为单位振幅 bin i 对 Q_q 处强度的贡献
#[derive(Debug, Clone)]
pub struct KernelMatrix {
    /// 行对应半径 bin，列对应数据点
    pub values: Vec<Vec<f64>>,
}

/// 为给定网格与 Q 集合构建核矩阵
///
/// 网格或 Q 集合变化时须重建；仅重算结构性质时保持不变
pub fn build_kernel(grid: &RadiusGrid, q: &[f64]) -> KernelMatrix {
    let mut values = vec![vec![0.0; q.len()]; grid.len()];

    for (i, row) in values.iter_mut().enumerate() {
        let (r_min, r_max) = grid.bin_edges(i);
        let dr = (r_max - r_min) / NUM_SUBINTERVALS as f64;

        for s in 0..NUM_SUBINTERVALS {
            // 子区间中点处的半径与体积
            let r_mid = r_min + (s as f64 + 0.5) * dr;
            let v2 = {
                let v = sphere_volume(r_mid);
                v * v
            };
            for (entry, &qq) in row.iter_mut().zip(q.iter()) {
                *entry += v2 * sphere_form_factor(qq * r_mid) * dr;
            }
        }

        // 按 bin 宽度归一化
        let width = r_max - r_min;
        for entry in row.iter_mut() {
            *entry /= width;
        }
    }

    KernelMatrix { values }
}

/// 正演预测：I_q = Σ_i amplitudes_i · kernel[i][q]
pub fn predict_intensity(amplitudes: &[f64], kernel: &KernelMatrix) -> Vec<f64> {
    let n_q = kernel.values.first().map_or(0, |row| row.len());
    let mut intensity = vec![0.0; n_q];
    for (amp, row) in amplitudes.iter().zip(kernel.values.iter()) {
        for (out, &k) in intensity.iter_mut().zip(row.iter()) {
            *out += amp * k;
        }
    }
    intensity
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_log_uniform() {
        let grid = RadiusGrid::from_log_range(0.0, 2.0, 0.1);
        assert_eq!(grid.len(), 21);
        for pair in grid.log_r.windows(2) {
            assert!((pair[1] - pair[0] - 0.1).abs() < 1e-12);
        }
        assert!((grid.r[10] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_grid_edges_are_geometric_midpoints() {
        let grid = RadiusGrid::from_log_range(1.0, 2.0, 0.5);
        let (_, hi0) = grid.bin_edges(0);
        let (lo1, _) = grid.bin_edges(1);
        // 相邻 bin 的边界衔接于对数中点
        assert!((hi0 - lo1).abs() < 1e-9);
        assert!((hi0 - 10f64.powf(1.25)).abs() < 1e-9);
    }

    #[test]
    fn test_kernel_entries_nonnegative() {
        let grid = RadiusGrid::from_log_range(1.0, 2.0, 0.2);
        let q: Vec<f64> = (1..=20).map(|i| 0.01 * i as f64).collect();
        let kernel = build_kernel(&grid, &q);
        for row in &kernel.values {
            for &v in row {
                assert!(v >= 0.0, "Kernel entries must be non-negative, got {}", v);
            }
        }
    }

    #[test]
    fn test_single_bin_reproduces_form_factor_shape() {
        // 全部振幅集中在单一窄 bin 时，预测曲线应在积分容差内
        // 重现该半径单分散球的形状因子曲线 V²·F(Qr)
        let grid = RadiusGrid::from_log_range(2.0, 2.0, 0.01);
        assert_eq!(grid.len(), 1);
        let r0 = grid.r[0];

        let q: Vec<f64> = (1..=30).map(|i| 1e-3 * i as f64).collect();
        let kernel = build_kernel(&grid, &q);
        let predicted = predict_intensity(&[1.0], &kernel);

        let v2 = sphere_volume(r0) * sphere_volume(r0);
        for (&p, &qq) in predicted.iter().zip(q.iter()) {
            let analytic = v2 * sphere_form_factor(qq * r0);
            let tol = 0.02 * analytic.max(v2 * 1e-6);
            assert!(
                (p - analytic).abs() < tol,
                "Q = {}: predicted {} vs analytic {}",
                qq,
                p,
                analytic
            );
        }
    }

    #[test]
    fn test_predict_intensity_is_linear() {
        let grid = RadiusGrid::from_log_range(1.0, 2.0, 0.25);
        let q = vec![0.01, 0.05, 0.1];
        let kernel = build_kernel(&grid, &q);

        let a: Vec<f64> = (0..grid.len()).map(|i| (i + 1) as f64).collect();
        let doubled: Vec<f64> = a.iter().map(|x| 2.0 * x).collect();

        let i1 = predict_intensity(&a, &kernel);
        let i2 = predict_intensity(&doubled, &kernel);
        for (x, y) in i1.iter().zip(i2.iter()) {
            assert!((2.0 * x - y).abs() < 1e-9 * y.abs().max(1.0));
        }
    }
}
