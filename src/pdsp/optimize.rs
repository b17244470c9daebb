//! # 有界非线性最小化器
//!
//! 投影梯度法：Barzilai–Borwein 步长 + Armijo 回溯线搜索，
//! 梯度用中心差分数值近似。目标函数光滑、维数为几十个
//! 半径 bin，投影梯度足以收敛到局部极小。
//!
//! ## 算法概述
//! 1. 迭代点始终投影回箱式约束 [lower, upper]
//! 2. BB 步长 α = (sᵀs)/(sᵀy)，曲率非正时回退上一步长
//! 3. Armijo 条件不满足时步长减半回溯
//! 4. 收敛判据：投影梯度无穷范数或目标相对下降量
//!
//! ## 依赖关系
//! - 被 `pdsp/solver.rs` 调用

/// 最小化器选项
#[derive(Debug, Clone)]
pub struct MinimizeOptions {
    /// 最大迭代次数
    pub max_iter: usize,
    /// 投影梯度无穷范数阈值
    pub grad_tol: f64,
    /// 目标函数相对下降阈值
    pub f_tol: f64,
}

impl Default for MinimizeOptions {
    fn default() -> Self {
        Self {
            max_iter: 400,
            grad_tol: 1e-8,
            f_tol: 1e-12,
        }
    }
}

/// 最小化结果
#[derive(Debug, Clone)]
pub struct MinimizeResult {
    /// 找到的极小点
    pub x: Vec<f64>,
    /// 极小点处的目标值
    pub fx: f64,
    /// 实际迭代次数
    pub iterations: usize,
    /// 是否满足收敛判据（否则为迭代耗尽）
    pub converged: bool,
}

/// 在箱式约束内最小化目标函数
///
/// `lower`/`upper` 与 `x0` 等长；初始点越界时先投影
pub fn minimize_bounded<F>(
    objective: F,
    x0: &[f64],
    lower: &[f64],
    upper: &[f64],
    options: &MinimizeOptions,
) -> MinimizeResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = x0.len();
    let mut x = clamp(x0, lower, upper);
    let mut fx = objective(&x);
    let mut grad = numeric_gradient(&objective, &x);

    // 初始步长按梯度规模归一
    let g_norm = inf_norm(&grad);
    let mut alpha = if g_norm > 0.0 { 1.0 / g_norm } else { 1.0 };

    let mut converged = false;
    let mut iterations = 0;

    for _ in 0..options.max_iter {
        iterations += 1;

        // 投影梯度：已收敛则停止
        let pg = projected_gradient_norm(&x, &grad, lower, upper);
        if pg < options.grad_tol {
            converged = true;
            break;
        }

        // Armijo 回溯
        let mut step = alpha;
        let mut accepted = None;
        for _ in 0..40 {
            let candidate: Vec<f64> = (0..n)
                .map(|i| (x[i] - step * grad[i]).clamp(lower[i], upper[i]))
                .collect();
            let f_candidate = objective(&candidate);

            // 投影方向上的方向导数
            let descent: f64 = (0..n).map(|i| grad[i] * (candidate[i] - x[i])).sum();
            if f_candidate <= fx + 1e-4 * descent {
                accepted = Some((candidate, f_candidate));
                break;
            }
            step *= 0.5;
        }

        let Some((x_new, f_new)) = accepted else {
            // 步长已缩至无改进，视为到达局部极小
            converged = true;
            break;
        };

        let grad_new = numeric_gradient(&objective, &x_new);

        // BB 步长更新
        let s: Vec<f64> = (0..n).map(|i| x_new[i] - x[i]).collect();
        let y: Vec<f64> = (0..n).map(|i| grad_new[i] - grad[i]).collect();
        let ss: f64 = s.iter().map(|v| v * v).sum();
        let sy: f64 = s.iter().zip(y.iter()).map(|(a, b)| a * b).sum();
        if sy > 1e-30 {
            alpha = (ss / sy).clamp(1e-10, 1e10);
        }

        let f_drop = (fx - f_new).abs();
        let f_scale = fx.abs().max(1.0);
        x = x_new;
        fx = f_new;
        grad = grad_new;

        if f_drop <= options.f_tol * f_scale {
            converged = true;
            break;
        }
    }

    MinimizeResult {
        x,
        fx,
        iterations,
        converged,
    }
}

/// 投影回箱式约束
fn clamp(x: &[f64], lower: &[f64], upper: &[f64]) -> Vec<f64> {
    x.iter()
        .zip(lower.iter().zip(upper.iter()))
        .map(|(&v, (&lo, &hi))| v.clamp(lo, hi))
        .collect()
}

/// 中心差分数值梯度
fn numeric_gradient<F>(objective: &F, x: &[f64]) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut grad = vec![0.0; x.len()];
    let mut probe = x.to_vec();
    for i in 0..x.len() {
        let h = 1e-6 * (1.0 + x[i].abs());
        let xi = x[i];
        probe[i] = xi + h;
        let f_plus = objective(&probe);
        probe[i] = xi - h;
        let f_minus = objective(&probe);
        probe[i] = xi;
        grad[i] = (f_plus - f_minus) / (2.0 * h);
    }
    grad
}

/// 投影梯度的无穷范数：‖x − P(x − g)‖∞
fn projected_gradient_norm(x: &[f64], grad: &[f64], lower: &[f64], upper: &[f64]) -> f64 {
    x.iter()
        .zip(grad.iter())
        .zip(lower.iter().zip(upper.iter()))
        .map(|((&xi, &gi), (&lo, &hi))| (xi - (xi - gi).clamp(lo, hi)).abs())
        .fold(0.0, f64::max)
}

/// 无穷范数
fn inf_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x.abs()).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconstrained_quadratic() {
        // 极小点 (3, -2) 在界内
        let f = |x: &[f64]| (x[0] - 3.0).powi(2) + 2.0 * (x[1] + 2.0).powi(2);
        let result = minimize_bounded(
            f,
            &[0.0, 0.0],
            &[-10.0, -10.0],
            &[10.0, 10.0],
            &MinimizeOptions::default(),
        );
        assert!(result.converged);
        assert!((result.x[0] - 3.0).abs() < 1e-4, "x0 = {}", result.x[0]);
        assert!((result.x[1] + 2.0).abs() < 1e-4, "x1 = {}", result.x[1]);
    }

    #[test]
    fn test_active_bound() {
        // 无约束极小点 (5) 在上界 2 之外，解应钉在界上
        let f = |x: &[f64]| (x[0] - 5.0).powi(2);
        let result = minimize_bounded(f, &[0.0], &[-2.0], &[2.0], &MinimizeOptions::default());
        assert!((result.x[0] - 2.0).abs() < 1e-6, "x = {}", result.x[0]);
    }

    #[test]
    fn test_start_outside_bounds_is_projected() {
        let f = |x: &[f64]| x[0] * x[0];
        let result = minimize_bounded(f, &[100.0], &[-1.0], &[1.0], &MinimizeOptions::default());
        assert!(result.x[0].abs() < 1e-4);
    }

    #[test]
    fn test_coupled_quadratic() {
        // 条件数较大的二次型仍应收敛
        let f = |x: &[f64]| {
            let a = x[0] - 1.0;
            let b = x[1] - 1.0;
            100.0 * a * a + b * b + 10.0 * a * b
        };
        let result = minimize_bounded(
            f,
            &[-3.0, 4.0],
            &[-10.0, -10.0],
            &[10.0, 10.0],
            &MinimizeOptions::default(),
        );
        let fx_opt = f(&[1.0, 1.0]);
        assert!(
            result.fx < fx_opt + 1e-6,
            "fx = {} vs optimal {}",
            result.fx,
            fx_opt
        );
    }
}
