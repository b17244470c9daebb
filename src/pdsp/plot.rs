//! # 拟合结果图表生成
//!
//! 使用 `plotters` 库绘制数据/拟合对比图与孔径分布图。
//!
//! ## 功能
//! - 双对数坐标下的散射数据 vs 拟合曲线
//! - f(r) 与 SSA(R) 分布图
//! - 支持 PNG 和 SVG 输出
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 使用 `models/result.rs` 的 FitResult 结构
//! - 使用 `plotters` 渲染图表

use crate::error::{PorosaError, Result};
use crate::models::FitResult;

use plotters::prelude::*;
use std::path::Path;

/// 生成数据 vs 拟合对比图（双对数）
pub fn generate_fit_plot(
    result: &FitResult,
    output_path: &Path,
    title: &str,
    width: u32,
    height: u32,
    use_svg: bool,
) -> Result<()> {
    if use_svg {
        let root = SVGBackend::new(output_path, (width, height)).into_drawing_area();
        draw_fit_chart(&root, result, title)?;
        root.present()
            .map_err(|e| PorosaError::Other(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
        draw_fit_chart(&root, result, title)?;
        root.present()
            .map_err(|e| PorosaError::Other(e.to_string()))?;
    }
    Ok(())
}

/// 生成 f(r) 与 SSA(R) 分布图（双对数）
pub fn generate_distribution_plot(
    result: &FitResult,
    output_path: &Path,
    title: &str,
    width: u32,
    height: u32,
    use_svg: bool,
) -> Result<()> {
    if use_svg {
        let root = SVGBackend::new(output_path, (width, height)).into_drawing_area();
        draw_distribution_chart(&root, result, title)?;
        root.present()
            .map_err(|e| PorosaError::Other(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
        draw_distribution_chart(&root, result, title)?;
        root.present()
            .map_err(|e| PorosaError::Other(e.to_string()))?;
    }
    Ok(())
}

/// 绘制数据 vs 拟合对比图
fn draw_fit_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    result: &FitResult,
    title: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| PorosaError::Other(format!("{:?}", e)))?;

    let (x_min, x_max) = positive_range(&result.q);
    let mut all_i = result.intensity_data.clone();
    all_i.extend_from_slice(&result.intensity_fitted);
    let (y_min, y_max) = positive_range(&all_i);

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(
            (x_min..x_max).log_scale(),
            (y_min..y_max).log_scale(),
        )
        .map_err(|e| PorosaError::Other(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc("Q (1/A)")
        .y_desc("I(Q) (1/cm)")
        .draw()
        .map_err(|e| PorosaError::Other(format!("{:?}", e)))?;

    chart
        .draw_series(
            result
                .q
                .iter()
                .zip(result.intensity_data.iter())
                .map(|(&q, &i)| Circle::new((q, i), 3, BLACK.filled())),
        )
        .map_err(|e| PorosaError::Other(format!("{:?}", e)))?
        .label("SAS Data")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, BLACK.filled()));

    chart
        .draw_series(LineSeries::new(
            result
                .q
                .iter()
                .zip(result.intensity_fitted.iter())
                .map(|(&q, &i)| (q, i)),
            RED.stroke_width(2),
        ))
        .map_err(|e| PorosaError::Other(format!("{:?}", e)))?
        .label("Fitted Result")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()
        .map_err(|e| PorosaError::Other(format!("{:?}", e)))?;

    Ok(())
}

/// 绘制 f(r) 与 SSA(R) 分布图
fn draw_distribution_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    result: &FitResult,
    title: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| PorosaError::Other(format!("{:?}", e)))?;

    let (x_min, x_max) = positive_range(&result.radius_nm);
    let f_values: Vec<f64> = result.f_r.iter().map(|m| m.value).collect();
    let ssa_values: Vec<f64> = result.properties.ssa.iter().map(|m| m.value).collect();
    let mut all_y = f_values.clone();
    all_y.extend_from_slice(&ssa_values);
    let (y_min, y_max) = positive_range(&all_y);

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(
            (x_min..x_max).log_scale(),
            (y_min..y_max).log_scale(),
        )
        .map_err(|e| PorosaError::Other(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc("r (nm)")
        .y_desc("f(r) | SSA(R)")
        .draw()
        .map_err(|e| PorosaError::Other(format!("{:?}", e)))?;

    chart
        .draw_series(LineSeries::new(
            result
                .radius_nm
                .iter()
                .zip(f_values.iter())
                .map(|(&r, &f)| (r, f)),
            RED.stroke_width(2),
        ))
        .map_err(|e| PorosaError::Other(format!("{:?}", e)))?
        .label("f(r)")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    chart
        .draw_series(
            result
                .radius_nm
                .iter()
                .zip(ssa_values.iter())
                .map(|(&r, &s)| Circle::new((r, s), 3, BLUE.filled())),
        )
        .map_err(|e| PorosaError::Other(format!("{:?}", e)))?
        .label("SSA(R)")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, BLUE.filled()));

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()
        .map_err(|e| PorosaError::Other(format!("{:?}", e)))?;

    Ok(())
}

/// 取正值数据的绘图范围，留一成边距
fn positive_range(values: &[f64]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = 0.0f64;
    for &v in values {
        if v > 0.0 {
            min = min.min(v);
            max = max.max(v);
        }
    }
    if !min.is_finite() || max <= 0.0 {
        return (1e-3, 1.0);
    }
    (min * 0.9, max * 1.1)
}
