//! Human-readable text reports.
//!
//! Numeric formatting is controlled by an explicit [`PrintOptions`] value.

use nalgebra::storage::Storage;
use nalgebra::{Dim, Matrix, RowDVector};
use planar_calib_core::Real;
use std::fmt;

use crate::compare::RefinementComparison;
use crate::config::PrintOptions;
use crate::planar_intrinsics::{CalibrationResult, DiscardedView};

/// Format a matrix as nested bracketed rows, one row per line.
///
/// Row and column vectors use `print.vector_precision` decimals, anything
/// larger uses `print.matrix_precision`. Every value is right-aligned in a
/// field of `print.width` characters.
pub fn format_array<R, C, S>(m: &Matrix<Real, R, C, S>, print: &PrintOptions) -> String
where
    R: Dim,
    C: Dim,
    S: Storage<Real, R, C>,
{
    let (rows, cols) = m.shape();
    let precision = if rows == 1 || cols == 1 {
        print.vector_precision
    } else {
        print.matrix_precision
    };
    let width = print.width;

    let body: Vec<String> = (0..rows)
        .map(|r| {
            let cells: Vec<String> = (0..cols)
                .map(|c| format!("{:>width$.precision$}", m[(r, c)]))
                .collect();
            format!("\t[{}]", cells.join(",\t"))
        })
        .collect();
    format!("[\n{}\n]", body.join(",\n"))
}

struct Report<'a> {
    result: &'a CalibrationResult,
    print: &'a PrintOptions,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let res = self.result;
        let dist = RowDVector::from_row_slice(&res.distortion().to_opencv());

        writeln!(f, "# Intrinsic parameters")?;
        writeln!(f, "K = {}", format_array(&res.k_matrix(), self.print))?;
        writeln!(f)?;
        writeln!(f, "dist_coeffs = {}", format_array(&dist, self.print))?;
        writeln!(f)?;
        writeln!(
            f,
            "mean reprojection error: {:.6} px over {} views",
            res.mean_reproj_error(),
            res.views().len()
        )?;
        for v in res.views() {
            writeln!(
                f,
                "  view {}{}: {:.6} px",
                v.index,
                name_suffix(v.name.as_deref()),
                v.reproj_error
            )?;
        }
        write_discarded(f, res.discarded())
    }
}

fn name_suffix(name: Option<&str>) -> String {
    name.map(|n| format!(" ({n})")).unwrap_or_default()
}

fn write_discarded(
    f: &mut fmt::Formatter<'_>,
    discarded: &[DiscardedView],
) -> fmt::Result {
    if discarded.is_empty() {
        return Ok(());
    }
    writeln!(f, "discarded views: {}", discarded.len())?;
    for d in discarded {
        writeln!(
            f,
            "  view {}{} [{}]: {}",
            d.index,
            name_suffix(d.name.as_deref()),
            d.stage,
            d.reason
        )?;
    }
    Ok(())
}

/// Render intrinsics, distortion, reprojection errors and discarded views.
pub fn render_report(result: &CalibrationResult, print: &PrintOptions) -> String {
    Report { result, print }.to_string()
}

struct ExtrinsicsReport<'a> {
    result: &'a CalibrationResult,
    print: &'a PrintOptions,
}

impl fmt::Display for ExtrinsicsReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for v in self.result.views() {
            writeln!(f, "Extrinsics for image {}:", v.index + 1)?;
            writeln!(f, "R:")?;
            writeln!(f, "{}", format_array(&v.pose.rotation_matrix(), self.print))?;
            writeln!(f, "t:")?;
            writeln!(f, "{}", format_array(&v.pose.translation(), self.print))?;
        }
        Ok(())
    }
}

/// Render the rotation and translation of every calibrated view.
///
/// Images are numbered from 1.
pub fn render_extrinsics(result: &CalibrationResult, print: &PrintOptions) -> String {
    ExtrinsicsReport { result, print }.to_string()
}

struct ComparisonReport<'a> {
    cmp: &'a RefinementComparison,
    print: &'a PrintOptions,
}

impl fmt::Display for ComparisonReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cmp = self.cmp;
        let p = self.print.vector_precision;
        let d = &cmp.intrinsics;

        writeln!(f, "# Refined - closed form")?;
        writeln!(
            f,
            "d_fx = {:.p$}, d_fy = {:.p$}, d_cx = {:.p$}, d_cy = {:.p$}, d_skew = {:.p$}",
            d.fx, d.fy, d.cx, d.cy, d.skew
        )?;
        let dist = RowDVector::from_row_slice(&cmp.distortion);
        writeln!(f, "d_dist_coeffs = {}", format_array(&dist, self.print))?;
        for pd in &cmp.poses {
            writeln!(
                f,
                "  view {}: rotation {:.p$} rad, translation {:.p$}",
                pd.index, pd.rotation_angle, pd.translation_distance
            )?;
        }
        if !cmp.missing_in_refined.is_empty() {
            writeln!(f, "missing in refined: {:?}", cmp.missing_in_refined)?;
        }
        if !cmp.missing_in_result.is_empty() {
            writeln!(f, "missing in closed form: {:?}", cmp.missing_in_result)?;
        }
        if let Some(de) = cmp.reproj_error_delta {
            writeln!(f, "d_mean_reproj_error = {de:.p$} px")?;
        }
        Ok(())
    }
}

/// Render a refinement comparison.
pub fn render_comparison(cmp: &RefinementComparison, print: &PrintOptions) -> String {
    ComparisonReport { cmp, print }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalibrationConfig;
    use crate::planar_intrinsics::run_planar_calibration;
    use planar_calib_core::synthetic::planar;
    use planar_calib_core::{CorrespondenceView, FxFyCxCySkew, Mat3, Pt3, Vec3};

    #[test]
    fn matrices_use_three_decimals_and_fixed_width() {
        let m = Mat3::new(800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0);
        let s = format_array(&m, &PrintOptions::default());
        let expected = "[\n\
            \t[   800.000,\t     0.000,\t   320.000],\n\
            \t[     0.000,\t   800.000,\t   240.000],\n\
            \t[     0.000,\t     0.000,\t     1.000]\n\
            ]";
        assert_eq!(s, expected);
    }

    #[test]
    fn vectors_use_six_decimals() {
        let col = format_array(&Vec3::new(0.5, -1.0, 2.0), &PrintOptions::default());
        assert_eq!(
            col,
            "[\n\t[  0.500000],\n\t[ -1.000000],\n\t[  2.000000]\n]"
        );
        let row = RowDVector::from_row_slice(&[0.0, 1.25]);
        assert_eq!(
            format_array(&row, &PrintOptions::default()),
            "[\n\t[  0.000000,\t  1.250000]\n]"
        );
    }

    #[test]
    fn custom_print_options_apply() {
        let print = PrintOptions {
            matrix_precision: 1,
            vector_precision: 2,
            width: 0,
        };
        assert_eq!(
            format_array(&Mat3::identity(), &print),
            "[\n\t[1.0,\t0.0,\t0.0],\n\t[0.0,\t1.0,\t0.0],\n\t[0.0,\t0.0,\t1.0]\n]"
        );
    }

    #[test]
    fn report_lists_sections_and_discards() {
        let k = FxFyCxCySkew {
            fx: 800.0,
            fy: 800.0,
            cx: 320.0,
            cy: 240.0,
            skew: 0.0,
        };
        let board = planar::grid_points(10, 7, 1.0);
        let poses = planar::board_orbit_poses(3, Pt3::new(4.5, 3.0, 0.0), 20.0, 0.4);
        let mut views = planar::project_views(&k, &board, &poses).unwrap();
        views.push(CorrespondenceView::new(vec![], vec![]).unwrap());
        let result = run_planar_calibration(&views, &CalibrationConfig::default()).unwrap();

        let text = render_report(&result, &PrintOptions::default());
        assert!(text.starts_with("# Intrinsic parameters\nK = [\n"));
        assert!(text.contains("\ndist_coeffs = [\n\t[  0.000000,"));
        assert!(text.contains("mean reprojection error:"));
        assert!(text.contains("discarded views: 1"));
        assert!(text.contains("view 3 [homography]"));

        let ext = render_extrinsics(&result, &PrintOptions::default());
        assert_eq!(ext.matches("Extrinsics for image").count(), 3);
        assert!(ext.starts_with("Extrinsics for image 1:\nR:\n[\n"));
    }
}
