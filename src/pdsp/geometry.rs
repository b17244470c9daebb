//! # 球形孔几何核函数
//!
//! 球形孔的形状因子与体积，纯函数，无状态。
//!
//! ## 依赖关系
//! - 被 `pdsp/kernel.rs` 的数值积分调用

use std::f64::consts::PI;

/// 球形形状因子 F(Qr) = [3(sin Qr − Qr·cos Qr)/Qr³]²
///
/// Qr → 0 的极限为 1；小参数下直接计算会发生抵消，取级数首项
pub fn sphere_form_factor(qr: f64) -> f64 {
    if qr.abs() < 1e-4 {
        // (1 − Qr²/10)² 与精确值的偏差在此阈值下小于 1e-16
        let t = 1.0 - qr * qr / 10.0;
        return t * t;
    }
    let amp = 3.0 * (qr.sin() - qr * qr.cos()) / (qr * qr * qr);
    amp * amp
}

/// 球体积 V(r) = 4/3·π·r³
pub fn sphere_volume(radius: f64) -> f64 {
    4.0 / 3.0 * PI * radius * radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_factor_limit_at_zero() {
        assert!((sphere_form_factor(0.0) - 1.0).abs() < 1e-12);
        assert!((sphere_form_factor(1e-6) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_form_factor_continuous_across_threshold() {
        // 级数分支与精确分支在阈值两侧衔接
        let below = sphere_form_factor(0.99e-4);
        let above = sphere_form_factor(1.01e-4);
        assert!((below - above).abs() < 1e-12);
    }

    #[test]
    fn test_form_factor_decays() {
        // 形状因子在 0 处最大，随 Qr 振荡衰减
        assert!(sphere_form_factor(1.0) < 1.0);
        assert!(sphere_form_factor(10.0) < sphere_form_factor(1.0));
        assert!(sphere_form_factor(10.0) >= 0.0);
    }

    #[test]
    fn test_form_factor_first_zero() {
        // 第一个零点在 tan(Qr) = Qr 处，Qr ≈ 4.4934
        let near_zero = sphere_form_factor(4.4934);
        assert!(near_zero < 1e-8, "F near first zero = {}", near_zero);
    }

    #[test]
    fn test_sphere_volume() {
        assert!((sphere_volume(1.0) - 4.0 / 3.0 * PI).abs() < 1e-12);
        assert!((sphere_volume(2.0) - 8.0 * sphere_volume(1.0)).abs() < 1e-9);
        assert_eq!(sphere_volume(0.0), 0.0);
    }
}
