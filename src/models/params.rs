//! # 拟合参数数据模型
//!
//! PDSP 拟合与结构性质计算的参数集合，带文档化默认值与域检验。
//!
//! ## 默认值
//! - background = 0, Qmin = 0, Qmax = ∞
//! - pointsPerDecade = 10, lambda = 1
//! - contrast = 3e10 cm⁻², density = 1.0 g/cm³
//! - extrapolationRadius = 0.2 nm, extrapolationPointCount = 7
//! - majorPhase = solid
//!
//! ## 依赖关系
//! - 被 `cli/` 填充，被 `pdsp/` 消费

use crate::error::{PorosaError, Result};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// 多孔体系的主相：占体积 >50% 的相
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum MajorPhase {
    /// 固相为主（孔隙率取较小根）
    Solid,
    /// 空相为主（孔隙率取较大根）
    Void,
}

impl std::fmt::Display for MajorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MajorPhase::Solid => write!(f, "solid"),
            MajorPhase::Void => write!(f, "void"),
        }
    }
}

/// 反演求解器参数
#[derive(Debug, Clone)]
pub struct FitParams {
    /// 平底背景 (cm⁻¹)
    pub background: f64,
    /// Q 窗口下界 (Å⁻¹)，严格不等式
    pub q_min: f64,
    /// Q 窗口上界 (Å⁻¹)，严格不等式
    pub q_max: f64,
    /// 半径网格每十倍程的格点数
    pub points_per_decade: u32,
    /// 平滑因子 λ（0 为无正则化纯数据拟合）
    pub lambda: f64,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            background: 0.0,
            q_min: 0.0,
            q_max: f64::INFINITY,
            points_per_decade: 10,
            lambda: 1.0,
        }
    }
}

impl FitParams {
    /// 检验参数域；任何越界参数使本次操作失败，不改变既有状态
    pub fn validate(&self) -> Result<()> {
        if !self.background.is_finite() || self.background < 0.0 {
            return Err(PorosaError::InvalidParameter(format!(
                "background must be >= 0, got {}",
                self.background
            )));
        }
        if !self.q_min.is_finite() || self.q_min < 0.0 {
            return Err(PorosaError::InvalidParameter(format!(
                "Qmin must be >= 0, got {}",
                self.q_min
            )));
        }
        if self.q_max <= self.q_min {
            return Err(PorosaError::InvalidRange(format!(
                "Qmax must be greater than Qmin, got Qmin = {}, Qmax = {}",
                self.q_min, self.q_max
            )));
        }
        if self.points_per_decade < 3 {
            return Err(PorosaError::InvalidParameter(format!(
                "points per decade must be >= 3, got {}",
                self.points_per_decade
            )));
        }
        if !self.lambda.is_finite() || self.lambda < 0.0 {
            return Err(PorosaError::InvalidParameter(format!(
                "smoothing factor must be >= 0, got {}",
                self.lambda
            )));
        }
        Ok(())
    }
}

/// 结构性质计算参数；可独立于拟合重新计算
#[derive(Debug, Clone)]
pub struct PhysicalParams {
    /// 两相散射长度密度差 Δρ (cm⁻²)
    pub contrast: f64,
    /// 固相体密度 ρ_s (g/cm³)
    pub density: f64,
    /// SSA 外推目标孔半径 r_e (nm)
    pub ssa_radius: f64,
    /// SSA 外推使用的格点数
    pub ssa_points: u32,
    /// 主相选择
    pub major_phase: MajorPhase,
}

impl Default for PhysicalParams {
    fn default() -> Self {
        Self {
            contrast: 3e10,
            density: 1.0,
            ssa_radius: 0.2,
            ssa_points: 7,
            major_phase: MajorPhase::Solid,
        }
    }
}

impl PhysicalParams {
    /// 检验参数域
    pub fn validate(&self) -> Result<()> {
        if !self.contrast.is_finite() || self.contrast <= 0.0 {
            return Err(PorosaError::InvalidParameter(format!(
                "contrast must be > 0, got {}",
                self.contrast
            )));
        }
        if !self.density.is_finite() || self.density <= 0.0 {
            return Err(PorosaError::InvalidParameter(format!(
                "bulk density must be > 0, got {}",
                self.density
            )));
        }
        if !self.ssa_radius.is_finite() || self.ssa_radius <= 0.0 {
            return Err(PorosaError::InvalidParameter(format!(
                "SSA extrapolation radius must be > 0, got {}",
                self.ssa_radius
            )));
        }
        if self.ssa_points < 3 {
            return Err(PorosaError::InvalidParameter(format!(
                "SSA extrapolation point count must be >= 3, got {}",
                self.ssa_points
            )));
        }
        Ok(())
    }
}
