//! # fit 子命令实现
//!
//! 从散射数据文件拟合 PDSP 模型并输出报告、拟合状态与图表。
//!
//! ## 功能
//! - 支持单文件和批量目录处理
//! - 并行拟合（rayon）
//! - 非物理孔隙率以警告呈现而非失败
//! - 输出文本报告、拟合状态 CSV 与 PNG/SVG 图表
//!
//! ## 依赖关系
//! - 使用 `cli/fit.rs` 定义的 FitArgs
//! - 使用 `batch/` 模块进行批量处理
//! - 使用 `pdsp/` 模块进行计算
//! - 使用 `parsers/` 读取数据

use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::fit::{FitArgs, PlotFormat};
use crate::error::{PorosaError, Result};
use crate::models::{FitParams, FitResult, PhysicalParams};
use crate::parsers;
use crate::pdsp::{self, fit_pdsp};
use crate::utils::{output, progress};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 执行 PDSP 拟合
pub fn execute(args: FitArgs) -> Result<()> {
    output::print_header("PDSP Pore Size Distribution Fit");

    let config = Arc::new(FitConfig::from_args(&args)?);

    // 检测输入类型
    if args.input.is_file() {
        execute_single_file(&args, &config)
    } else if args.input.is_dir() {
        execute_batch(&args, &config)
    } else {
        Err(PorosaError::FileNotFound {
            path: args.input.display().to_string(),
        })
    }
}

/// 拟合配置（参数已通过域检验）
struct FitConfig {
    params: FitParams,
    phys: PhysicalParams,
    error_percent: f64,
    save_state: bool,
    plot: bool,
    plot_format: PlotFormat,
    width: u32,
    height: u32,
    overwrite: bool,
}

impl FitConfig {
    /// 从命令行参数构造并做前置检验；任何越界参数立即失败
    fn from_args(args: &FitArgs) -> Result<Self> {
        let params = FitParams {
            background: args.background,
            q_min: args.q_min,
            q_max: args.q_max,
            points_per_decade: args.points_per_decade,
            lambda: args.lambda,
        };
        params.validate()?;

        let phys = PhysicalParams {
            contrast: args.contrast,
            density: args.density,
            ssa_radius: args.ssa_radius,
            ssa_points: args.ssa_points,
            major_phase: args.major_phase,
        };
        phys.validate()?;

        if !args.error_percent.is_finite() || args.error_percent < 0.0 {
            return Err(PorosaError::InvalidParameter(format!(
                "error percent must be >= 0, got {}",
                args.error_percent
            )));
        }

        Ok(Self {
            params,
            phys,
            error_percent: args.error_percent,
            save_state: args.save_state,
            plot: args.plot,
            plot_format: args.plot_format,
            width: args.width,
            height: args.height,
            overwrite: args.overwrite,
        })
    }
}

/// 单文件模式
fn execute_single_file(args: &FitArgs, config: &Arc<FitConfig>) -> Result<()> {
    output::print_info(&format!("Single file mode: '{}'", args.input.display()));

    let source_name = file_name_of(&args.input);
    let curve = load_curve(&args.input, config)?;
    output::print_success(&format!(
        "Prepared {} data points after preprocessing, Q = [{:.3e}, {:.3e}] 1/A",
        curve.len(),
        curve.q.first().copied().unwrap_or(0.0),
        curve.q.last().copied().unwrap_or(0.0)
    ));

    if config.params.background > 0.0 {
        output::print_info(&format!(
            "Subtracting flat background: {:.3e} 1/cm",
            config.params.background
        ));
    }
    output::print_info(&format!(
        "Smoothing factor lambda = {}, {} points per decade",
        config.params.lambda, config.params.points_per_decade
    ));

    // 拟合是一次长同步调用，挂 spinner
    let spinner = progress::create_spinner("Fitting PDSP model...");
    let result = fit_pdsp(&curve, &config.params, &config.phys);
    spinner.finish_and_clear();
    let result = result?;

    output::print_success(&format!(
        "Fit complete: {} radius bins over [{:.2}, {:.2}] nm",
        result.num_bins(),
        result.radius_nm.first().copied().unwrap_or(0.0),
        result.radius_nm.last().copied().unwrap_or(0.0)
    ));

    print_property_table(&result, &config.phys);
    if !result.properties.physical {
        output::print_warning(
            "Porosity roots are complex (K*V > 0.25): the fit is not physically real. \
             Derived quantities are reported but unreliable.",
        );
    }

    write_outputs(&args.output, &source_name, config, &result)?;
    output::print_done(&format!("Report saved to '{}'", args.output.display()));
    Ok(())
}

/// 批量处理模式
fn execute_batch(args: &FitArgs, config: &Arc<FitConfig>) -> Result<()> {
    output::print_info(&format!("Batch mode: directory '{}'", args.input.display()));

    // 收集文件
    let collector = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)
        .recursive(args.recursive);

    let files = collector.collect();

    if files.is_empty() {
        return Err(PorosaError::NoFilesFound {
            pattern: args.pattern.clone(),
        });
    }

    output::print_info(&format!("Found {} data files", files.len()));

    // 确保输出目录存在
    fs::create_dir_all(&args.output).map_err(|e| PorosaError::FileWriteError {
        path: args.output.display().to_string(),
        source: e,
    })?;

    let output_dir = args.output.clone();
    let config = Arc::clone(config);

    // 并行处理
    let runner = BatchRunner::new(args.jobs);
    let result = runner.run(files, move |file| {
        process_batch_file(file, &output_dir, &config)
    });

    // 打印统计
    output::print_separator();
    output::print_success(&format!(
        "Batch complete: {} success ({} with warnings), {} skipped, {} failed",
        result.success,
        result.warnings.len(),
        result.skipped,
        result.failed
    ));

    if !result.warnings.is_empty() {
        output::print_warning("Files with non-physical results:");
        for (path, warning) in result.warnings.iter().take(10) {
            output::print_warning(&format!("  {}: {}", path, warning));
        }
    }

    if !result.failures.is_empty() {
        output::print_warning("Failed files:");
        for (path, err) in result.failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", path, err));
        }
        if result.failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", result.failures.len() - 10));
        }
    }

    Ok(())
}

/// 处理批量模式中的单个文件
fn process_batch_file(input: &PathBuf, output_dir: &Path, config: &Arc<FitConfig>) -> ProcessResult {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let report_path = output_dir.join(format!("{}_pdsp.txt", stem));

    // 检查是否已存在
    if report_path.exists() && !config.overwrite {
        return ProcessResult::Skipped(format!(
            "Output exists, skipping: {}",
            report_path.display()
        ));
    }

    let outcome = (|| -> Result<bool> {
        let curve = load_curve(input, config)?;
        let result = fit_pdsp(&curve, &config.params, &config.phys)?;
        write_outputs(&report_path, &file_name_of(input), config, &result)?;
        Ok(result.properties.physical)
    })();

    match outcome {
        Ok(true) => {
            ProcessResult::Success(format!("{} -> {}", input.display(), report_path.display()))
        }
        Ok(false) => ProcessResult::Warned(
            input.display().to_string(),
            "porosity roots are complex, fit not physically real".to_string(),
        ),
        Err(e) => ProcessResult::Failed(input.display().to_string(), e.to_string()),
    }
}

/// 读取数据文件并完成预处理
fn load_curve(
    input: &Path,
    config: &FitConfig,
) -> Result<crate::models::ScatteringCurve> {
    let mut curve = parsers::parse_data_file(input)?;
    curve.resolve_missing_errors(config.error_percent);
    Ok(pdsp::preprocess::subtract_and_trim(
        &curve,
        config.params.background,
        config.params.q_min,
        config.params.q_max,
    ))
}

/// 写出报告、拟合状态与图表
fn write_outputs(
    report_path: &Path,
    source_name: &str,
    config: &FitConfig,
    result: &FitResult,
) -> Result<()> {
    pdsp::export::write_report(report_path, source_name, &config.params, &config.phys, result)?;

    if config.save_state {
        let state_path = report_path.with_extension("state.csv");
        pdsp::export::write_fit_state(&state_path, &config.params, result)?;
    }

    if config.plot {
        let use_svg = config.plot_format == PlotFormat::Svg;
        let ext = if use_svg { "svg" } else { "png" };
        let fit_plot = report_path.with_extension(format!("fit.{}", ext));
        let dist_plot = report_path.with_extension(format!("dist.{}", ext));
        pdsp::plot::generate_fit_plot(
            result,
            &fit_plot,
            &format!("{} - SAS Data vs. Fitted Result", source_name),
            config.width,
            config.height,
            use_svg,
        )?;
        pdsp::plot::generate_distribution_plot(
            result,
            &dist_plot,
            &format!("{} - f(r) and SSA(R)", source_name),
            config.width,
            config.height,
            use_svg,
        )?;
    }

    Ok(())
}

/// 打印标量结果表格
fn print_property_table(result: &FitResult, phys: &PhysicalParams) {
    use tabled::{Table, Tabled};

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

/// 输入文件名（不含路径）
fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}
