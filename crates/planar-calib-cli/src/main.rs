use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use log::info;
use planar_calib_core::CorrespondenceView;
use planar_calib_pipeline::{
    compare_with_refined, io, render_comparison, render_extrinsics, render_report,
    run_planar_calibration, run_planar_calibration_from_detections, CalibrationConfig,
    CalibrationError, CalibrationResult, DetectionSet, PatternSize, RefinedEstimate,
};
use serde::Deserialize;

/// Closed-form planar camera calibration.
#[derive(Debug, Parser)]
#[command(author, version, about = "Planar camera calibration from checkerboard views")]
struct Args {
    /// JSON file with either a detection set or a list of correspondence views.
    #[arg(long)]
    input: PathBuf,

    /// Optional JSON CalibrationConfig. Defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the pattern size of a detection set, e.g. 10x7.
    #[arg(long)]
    pattern: Option<PatternSize>,

    /// Override the square size of a detection set.
    #[arg(long)]
    square_size: Option<f64>,

    /// Refined estimate (JSON) to compare the closed-form result against.
    #[arg(long)]
    refined: Option<PathBuf>,

    /// Write the full result as JSON to this path.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Print per-view extrinsics and enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Input {
    Detections(DetectionSet),
    Views(Vec<CorrespondenceView>),
}

fn calibrate(args: &Args, config: &CalibrationConfig) -> Result<CalibrationResult> {
    let input: Input = io::load_json(&args.input)?;
    let outcome = match input {
        Input::Detections(mut set) => {
            if let Some(pattern) = args.pattern {
                set.pattern = pattern;
            }
            if let Some(s) = args.square_size {
                set.square_size = s;
            }
            info!(
                "{} detections, pattern {}, square size {}",
                set.detections.len(),
                set.pattern,
                set.square_size
            );
            run_planar_calibration_from_detections(&set, config)
        }
        Input::Views(views) => {
            info!("{} correspondence views", views.len());
            run_planar_calibration(&views, config)
        }
    };
    outcome.map_err(|err| anyhow!(describe_failure(&err)))
}

fn describe_failure(err: &CalibrationError) -> String {
    let mut msg = format!("calibration failed: {err}");
    for d in err.discarded() {
        let name = d.name.as_deref().unwrap_or("-");
        let _ = write!(msg, "\n  view {} ({name}) [{}]: {}", d.index, d.stage, d.reason);
    }
    msg
}

fn run(args: &Args) -> Result<String> {
    let config = match &args.config {
        Some(path) => io::load_json::<CalibrationConfig>(path)?,
        None => CalibrationConfig::default(),
    };

    let result = calibrate(args, &config)?;

    let mut out = render_report(&result, &config.print);
    if args.verbose {
        out.push('\n');
        out.push_str(&render_extrinsics(&result, &config.print));
    }

    if let Some(path) = &args.refined {
        let refined: RefinedEstimate = io::load_json(path)?;
        let cmp = compare_with_refined(&result, &refined)?;
        out.push('\n');
        out.push_str(&render_comparison(&cmp, &config.print));
    }

    if let Some(path) = &args.json {
        io::save_json(&result, path)?;
        info!("wrote {}", path.display());
    }

    Ok(out)
}

fn main() {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&args) {
        Ok(out) => print!("{out}"),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planar_calib_core::synthetic::planar;
    use planar_calib_core::{FxFyCxCySkew, Pt3};
    use planar_calib_pipeline::{Detection, DetectionCriteria};

    fn synthetic_views(n: usize) -> Vec<CorrespondenceView> {
        let k = FxFyCxCySkew {
            fx: 800.0,
            fy: 780.0,
            cx: 640.0,
            cy: 360.0,
            skew: 0.0,
        };
        let board = planar::grid_points(10, 7, 1.0);
        let poses = planar::board_orbit_poses(n, Pt3::new(4.5, 3.0, 0.0), 20.0, 0.4);
        planar::project_views(&k, &board, &poses).unwrap()
    }

    fn args(input: PathBuf) -> Args {
        Args {
            input,
            config: None,
            pattern: None,
            square_size: None,
            refined: None,
            json: None,
            verbose: false,
        }
    }

    #[test]
    fn views_file_produces_report_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("views.json");
        let out_json = dir.path().join("result.json");
        io::save_json(&synthetic_views(4), &input).unwrap();

        let mut a = args(input);
        a.json = Some(out_json.clone());
        a.verbose = true;
        let text = run(&a).unwrap();

        assert!(text.starts_with("# Intrinsic parameters\nK = "));
        assert!(text.contains("dist_coeffs = "));
        assert!(text.contains("Extrinsics for image 4:"));

        let result: CalibrationResult = io::load_json(&out_json).unwrap();
        assert!((result.intrinsics().fx - 800.0).abs() < 1e-3);
        assert!((result.intrinsics().cy - 360.0).abs() < 1e-3);
    }

    #[test]
    fn detection_file_with_config_and_refined() {
        let dir = tempfile::tempdir().unwrap();
        let views = synthetic_views(3);
        let set = DetectionSet {
            pattern: PatternSize::new(7, 10),
            square_size: 1.0,
            criteria: DetectionCriteria::default(),
            image_size: Some((1280, 720)),
            detections: views
                .iter()
                .enumerate()
                .map(|(i, v)| Detection {
                    name: format!("{i}.png"),
                    found: true,
                    image_points: v.points_2d.clone(),
                })
                .collect(),
        };
        let input = dir.path().join("detections.json");
        io::save_json(&set, &input).unwrap();

        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, r#"{ "parallel": false }"#).unwrap();

        let refined_path = dir.path().join("refined.json");
        std::fs::write(
            &refined_path,
            r#"{ "camera_matrix": [[801, 0, 640], [0, 780, 360], [0, 0, 1]] }"#,
        )
        .unwrap();

        let mut a = args(input);
        // The file says 7x10; the flag corrects it.
        a.pattern = Some("10x7".parse().unwrap());
        a.config = Some(config_path);
        a.refined = Some(refined_path);
        let text = run(&a).unwrap();

        assert!(text.contains("# Refined - closed form"));
        assert!(text.contains("missing in refined: [0, 1, 2]"));
    }

    #[test]
    fn failure_lists_discarded_views() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("detections.json");
        let set = DetectionSet {
            pattern: PatternSize::new(10, 7),
            square_size: 1.0,
            criteria: DetectionCriteria::default(),
            image_size: None,
            detections: vec![Detection {
                name: "empty.png".into(),
                found: false,
                image_points: Vec::new(),
            }],
        };
        io::save_json(&set, &input).unwrap();

        let err = run(&args(input)).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("calibration failed"));
        assert!(msg.contains("view 0 (empty.png) [detection]: pattern not found"));
    }

    #[test]
    fn args_parse() {
        let a = Args::try_parse_from([
            "planar-calib",
            "--input",
            "in.json",
            "--pattern",
            "9x6",
            "--refined",
            "r.json",
            "-v",
        ])
        .unwrap();
        assert_eq!(a.pattern, Some(PatternSize::new(9, 6)));
        assert!(a.verbose);
        assert!(a.json.is_none());
    }
}
