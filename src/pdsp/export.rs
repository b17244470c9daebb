//! # 结果导出
//!
//! 写出人读的 PDSP 拟合报告（文本）与机读的拟合状态（CSV）。
//! 拟合状态保存逐 bin 的半径、振幅与相对误差以及拟合参数，
//! 供 `recompute` 在不重新拟合的情况下重算结构性质。
//!
//! ## 报告格式
//! 头部：数据来源、背景、Q 窗口、平滑因子、衬度、固相密度；
//! 标量结果各以 `value ± absolute_error` 给出；
//! 随后为按 r 升序的制表符分隔表：r (nm)、f(r)、SSA(R)、dV/dr、
//! error (%)
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs`, `commands/recompute.rs` 调用
//! - 使用 `csv` 与 `serde` 读写拟合状态

use crate::error::{PorosaError, Result};
use crate::models::{FitParams, FitResult, Measured, PhysicalParams};

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// 拟合状态的一行：一个半径 bin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitStateRow {
    /// bin 中心半径 (Å)
    pub r_angstrom: f64,
    /// 拟合振幅 IQ0
    pub iq0: f64,
    /// 相对不确定度
    pub rel_err: f64,
}

/// 从状态文件恢复的拟合摘要
#[derive(Debug, Clone)]
pub struct FitState {
    /// 拟合时的背景值
    pub background: f64,
    /// 拟合时的 Q 窗口
    pub q_min: f64,
    pub q_max: f64,
    /// 拟合时的平滑因子
    pub lambda: f64,
    /// 逐 bin 状态，按半径升序
    pub rows: Vec<FitStateRow>,
}

/// 写出文本报告
pub fn write_report(
    path: &Path,
    source_name: &str,
    params: &FitParams,
    phys: &PhysicalParams,
    result: &FitResult,
) -> Result<()> {
    let mut file = File::create(path).map_err(|e| PorosaError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;

    let write_err = |e: std::io::Error| PorosaError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    };

    writeln!(file, "PDSP Fit Result for {}", source_name).map_err(write_err)?;
    writeln!(file).map_err(write_err)?;
    writeln!(file, "Background value (cm-1): {:.3e}", params.background).map_err(write_err)?;
    writeln!(
        file,
        "Selected Q range (A-1): [{:.3e}, {:.3e}]",
        params.q_min, params.q_max
    )
    .map_err(write_err)?;
    writeln!(file, "Smoothing factor: {:.3e}", params.lambda).map_err(write_err)?;
    writeln!(
        file,
        "Contrast between 2 phases (cm-2): {:.3e}",
        phys.contrast
    )
    .map_err(write_err)?;
    writeln!(file, "Density of Solid (g/cm3): {:.3}", phys.density).map_err(write_err)?;
    writeln!(file).map_err(write_err)?;

    let props = &result.properties;
    writeln!(file, "Porosity: {}", format_measured(&props.porosity)).map_err(write_err)?;
    writeln!(
        file,
        "Average Pore Volume (cm3): {}",
        format_measured(&props.pore_volume_avg)
    )
    .map_err(write_err)?;
    writeln!(
        file,
        "Pore Concentration (cm-3): {}",
        format_measured(&props.pore_concentration)
    )
    .map_err(write_err)?;
    writeln!(
        file,
        "SSA extrapolated to r = {:.2} nm (cm2/cm3): {}",
        phys.ssa_radius,
        format_measured(&props.ssa_extrapolated)
    )
    .map_err(write_err)?;
    if !props.physical {
        writeln!(
            file,
            "WARNING: porosity roots are complex (fit not physically real)"
        )
        .map_err(write_err)?;
    }
    writeln!(file).map_err(write_err)?;

    writeln!(file, "Pore size distribution table").map_err(write_err)?;
    writeln!(file, "r (nm)\tf(r)\tSSA(R)\tdV/dr\terror (%)").map_err(write_err)?;
    for i in 0..result.num_bins() {
        writeln!(
            file,
            "{:.5e}\t{:.5e}\t{:.5e}\t{:.5e}\t{:.5e}",
            result.radius_nm[i],
            result.f_r[i].value,
            props.ssa[i].value,
            props.dv_dr[i].value,
            result.amplitudes[i].rel_err * 100.0
        )
        .map_err(write_err)?;
    }

    Ok(())
}

/// 值 ± 绝对误差
fn format_measured(m: &Measured) -> String {
    format!("{:.5e} ± {:.3e}", m.value, m.abs_err())
}

/// 写出拟合状态 CSV
///
/// 拟合参数以 `#` 注释行存于文件头，随后为带表头的 CSV 数据
pub fn write_fit_state(path: &Path, params: &FitParams, result: &FitResult) -> Result<()> {
    let mut file = File::create(path).map_err(|e| PorosaError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;

    let write_err = |e: std::io::Error| PorosaError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    };

    writeln!(file, "# background: {:e}", params.background).map_err(write_err)?;
    writeln!(file, "# q_min: {:e}", params.q_min).map_err(write_err)?;
    writeln!(file, "# q_max: {:e}", params.q_max).map_err(write_err)?;
    writeln!(file, "# lambda: {:e}", params.lambda).map_err(write_err)?;

    let mut wtr = csv::Writer::from_writer(file);
    for i in 0..result.num_bins() {
        wtr.serialize(FitStateRow {
            r_angstrom: result.radius_angstrom[i],
            iq0: result.amplitudes[i].value,
            rel_err: result.amplitudes[i].rel_err,
        })?;
    }
    wtr.flush().map_err(|e| PorosaError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// 读回拟合状态
pub fn read_fit_state(path: &Path) -> Result<FitState> {
    let content = fs::read_to_string(path).map_err(|e| PorosaError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    // 注释头中的拟合参数
    let mut background = 0.0;
    let mut q_min = 0.0;
    let mut q_max = f64::INFINITY;
    let mut lambda = 1.0;
    for line in content.lines().filter(|l| l.starts_with('#')) {
        let rest = line.trim_start_matches('#').trim();
        if let Some((key, value)) = rest.split_once(':') {
            let parsed: Option<f64> = value.trim().parse().ok();
            match (key.trim(), parsed) {
                ("background", Some(v)) => background = v,
                ("q_min", Some(v)) => q_min = v,
                ("q_max", Some(v)) => q_max = v,
                ("lambda", Some(v)) => lambda = v,
                _ => {}
            }
        }
    }

    let mut rdr = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .from_reader(content.as_bytes());
    let mut rows = Vec::new();
    for record in rdr.deserialize() {
        let row: FitStateRow = record?;
        rows.push(row);
    }

    if rows.len() < 2 {
        return Err(PorosaError::ParseError {
            format: "fit state".to_string(),
            path: path.display().to_string(),
            reason: format!("expected at least 2 radius bins, found {}", rows.len()),
        });
    }
    for pair in rows.windows(2) {
        if pair[1].r_angstrom <= pair[0].r_angstrom {
            return Err(PorosaError::ParseError {
                format: "fit state".to_string(),
                path: path.display().to_string(),
                reason: "radius bins must be strictly ascending".to_string(),
            });
        }
    }

    Ok(FitState {
        background,
        q_min,
        q_max,
        lambda,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Measured, StructuralProperties};

    fn dummy_result() -> FitResult {
        let amps = vec![Measured::new(1e-9, 0.05), Measured::new(2e-9, 0.04)];
        FitResult {
            radius_angstrom: vec![10.0, 20.0],
            radius_nm: vec![1.0, 2.0],
            amplitudes: amps.clone(),
            q: vec![0.1, 0.2],
            intensity_fitted: vec![1.0, 0.5],
            intensity_data: vec![1.1, 0.45],
            f_dash_r: amps.clone(),
            f_r: amps.clone(),
            properties: StructuralProperties {
                porosity: Measured::new(0.1, 0.15),
                pore_volume_avg: Measured::new(1e-20, 0.05),
                pore_concentration: Measured::new(1e19, 0.2),
                ssa_extrapolated: Measured::new(1e6, 0.2),
                ssa: vec![Measured::new(2e5, 0.05), Measured::new(1e5, 0.04)],
                dv_dr: vec![Measured::new(0.01, 0.05), Measured::new(0.02, 0.04)],
                physical: true,
            },
        }
    }

    #[test]
    fn test_fit_state_roundtrip() {
        let dir = std::env::temp_dir().join("porosa_test_state");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.csv");

        let params = FitParams {
            background: 0.5,
            q_min: 0.01,
            q_max: 0.4,
            points_per_decade: 10,
            lambda: 2.0,
        };
        let result = dummy_result();
        write_fit_state(&path, &params, &result).unwrap();

        let state = read_fit_state(&path).unwrap();
        assert_eq!(state.rows.len(), 2);
        assert!((state.background - 0.5).abs() < 1e-12);
        assert!((state.lambda - 2.0).abs() < 1e-12);
        assert!((state.rows[0].r_angstrom - 10.0).abs() < 1e-12);
        assert!((state.rows[1].iq0 - 2e-9).abs() < 1e-21);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_report_contains_required_fields() {
        let dir = std::env::temp_dir().join("porosa_test_report");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.txt");

        let params = FitParams::default();
        let phys = PhysicalParams::default();
        write_report(&path, "sample.dat", &params, &phys, &dummy_result()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("PDSP Fit Result for sample.dat"));
        assert!(text.contains("Background value (cm-1):"));
        assert!(text.contains("Selected Q range (A-1):"));
        assert!(text.contains("Smoothing factor:"));
        assert!(text.contains("Porosity:"));
        assert!(text.contains("Pore size distribution table"));
        assert!(text.contains("r (nm)\tf(r)\tSSA(R)\tdV/dr\terror (%)"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_read_fit_state_rejects_unsorted_rows() {
        let dir = std::env::temp_dir().join("porosa_test_state_bad");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.csv");
        std::fs::write(
            &path,
            "r_angstrom,iq0,rel_err\n20.0,1e-9,0.05\n10.0,1e-9,0.05\n",
        )
        .unwrap();

        assert!(read_fit_state(&path).is_err());
        std::fs::remove_file(&path).ok();
    }
}
