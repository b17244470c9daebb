//! # recompute 子命令实现
//!
//! 从 `fit --save-state` 保存的拟合状态重算结构性质。
//! 不触碰核矩阵也不重新拟合：振幅向量原样复用，
//! 只有衬度、密度、主相与 SSA 外推设置参与计算。
//!
//! ## 依赖关系
//! - 使用 `cli/recompute.rs` 定义的 RecomputeArgs
//! - 使用 `pdsp/export.rs` 读写状态与报告
//! - 使用 `pdsp/properties.rs` 重算性质

use crate::cli::recompute::RecomputeArgs;
use crate::error::{PorosaError, Result};
use crate::models::{FitParams, FitResult, Measured, PhysicalParams};
use crate::pdsp::export::{self, FitState};
use crate::pdsp::kernel::RadiusGrid;
use crate::pdsp::properties;
use crate::utils::output;

use tabled::{Table, Tabled};

/// 执行结构性质重算
pub fn execute(args: RecomputeArgs) -> Result<()> {
    output::print_header("PDSP Structural Property Recompute");

    let phys = PhysicalParams {
        contrast: args.contrast,
        density: args.density,
        ssa_radius: args.ssa_radius,
        ssa_points: args.ssa_points,
        major_phase: args.major_phase,
    };
    phys.validate()?;

    if !args.input.is_file() {
        return Err(PorosaError::FileNotFound {
            path: args.input.display().to_string(),
        });
    }

    output::print_info(&format!("Loading fit state: '{}'", args.input.display()));
    let state = export::read_fit_state(&args.input)?;
    output::print_success(&format!("Loaded {} radius bins", state.rows.len()));

    let (params, result) = rebuild_result(&state, &phys);

    print_property_table(&result, &phys);
    if !result.properties.physical {
        output::print_warning(
            "Porosity roots are complex (K*V > 0.25): the fit is not physically real. \
             Derived quantities are reported but unreliable.",
        );
    }

    let source_name = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");
    export::write_report(&args.output, source_name, &params, &phys, &result)?;
    output::print_done(&format!("Report saved to '{}'", args.output.display()));
    Ok(())
}

/// 由拟合状态重建分布并重算性质
fn rebuild_result(state: &FitState, phys: &PhysicalParams) -> (FitParams, FitResult) {
    let r: Vec<f64> = state.rows.iter().map(|row| row.r_angstrom).collect();
    let log_r: Vec<f64> = r.iter().map(|v| v.log10()).collect();
    // 网格为对数均匀，步长由前两个格点恢复
    let log_step = log_r[1] - log_r[0];
    let grid = RadiusGrid {
        log_r,
        r: r.clone(),
        log_step,
    };

    let amplitudes: Vec<Measured> = state
        .rows
        .iter()
        .map(|row| Measured::new(row.iq0, row.rel_err))
        .collect();
    let total: f64 = amplitudes.iter().map(|m| m.value).sum();
    let f_dash_r: Vec<Measured> = amplitudes
        .iter()
        .map(|m| Measured::new(m.value / total, m.rel_err))
        .collect();
    let f_r: Vec<Measured> = f_dash_r
        .iter()
        .enumerate()
        .map(|(i, m)| Measured::new(m.value / grid.bin_width(i), m.rel_err))
        .collect();

    let (radius_nm, props) = properties::compute(&r, &amplitudes, &f_r, &f_dash_r, phys);

    let params = FitParams {
        background: state.background,
        q_min: state.q_min,
        q_max: state.q_max,
        points_per_decade: (1.0 / log_step).round() as u32,
        lambda: state.lambda,
    };

    let result = FitResult {
        radius_angstrom: r,
        radius_nm,
        amplitudes,
        q: Vec::new(),
        intensity_fitted: Vec::new(),
        intensity_data: Vec::new(),
        f_dash_r,
        f_r,
        properties: props,
    };

    (params, result)
}

/// 打印标量结果表格
fn print_property_table(result: &FitResult, phys: &PhysicalParams) {
    #[derive(Tabled)]
    struct PropertyRow {
        #[tabled(rename = "Quantity")]
        quantity: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Error (%)")]
        error: String,
    }

    let props = &result.properties;
    let rows = vec![
        PropertyRow {
            quantity: "Porosity".to_string(),
            value: format!("{:.5e}", props.porosity.value),
            error: format!("{:.2}", props.porosity.rel_err * 100.0),
        },
        PropertyRow {
            quantity: "Average pore volume (cm3)".to_string(),
            value: format!("{:.5e}", props.pore_volume_avg.value),
            error: format!("{:.2}", props.pore_volume_avg.rel_err * 100.0),
        },
        PropertyRow {
            quantity: "Pore concentration (1/cm3)".to_string(),
            value: format!("{:.5e}", props.pore_concentration.value),
            error: format!("{:.2}", props.pore_concentration.rel_err * 100.0),
        },
        PropertyRow {
            quantity: format!("SSA at r = {:.2} nm (cm2/cm3)", phys.ssa_radius),
            value: format!("{:.5e}", props.ssa_extrapolated.value),
            error: format!("{:.2}", props.ssa_extrapolated.rel_err * 100.0),
        },
    ];

    output::print_header("Structural Properties");
    let table = Table::new(&rows);
    println!("{}", table);
}
