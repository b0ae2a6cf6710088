use std::fs;
use std::path::PathBuf;

use assert_approx_eq::assert_approx_eq;
use tpa_analysis::app::pipeline::{area_report, run_areas};
use tpa_analysis::io::{load_config, write_area_json};
use tpa_analysis::math::Quadrature;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tpa-analysis-{name}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Five-sample scope export: time, signal trans/ref, control trans/ref.
fn scope_csv(trans: [f64; 5], reference: f64) -> String {
    let mut out = String::from("Model,DPO3034\nTIME,CH1,CH2,CH3,CH4\n");
    for (i, t) in trans.iter().enumerate() {
        out.push_str(&format!("{i}.0,{t},{reference},{t},{reference}\n"));
    }
    out
}

const CONFIG: &str = r#"{
    "channels": {
        "time": 0,
        "signal_transmitted": 1,
        "signal_reference": 2,
        "control_transmitted": 3,
        "control_reference": 4
    },
    "area_channels": "signal",
    "states": [
        { "key": "cph_sph", "signal": "signal.csv", "leakage": "leak.csv", "reference": "ref.csv" },
        { "key": "lph_sph", "signal": "signal.csv", "leakage": "dark.csv", "reference": "ref.csv" }
    ]
}"#;

#[test]
fn areas_pipeline_end_to_end() {
    let dir = scratch_dir("areas");
    fs::write(dir.join("signal.csv"), scope_csv([0.0, 1.0, 2.0, 1.0, 0.0], 2.0)).unwrap();
    fs::write(dir.join("leak.csv"), scope_csv([0.0, 0.5, 1.0, 0.5, 0.0], 2.0)).unwrap();
    fs::write(dir.join("dark.csv"), scope_csv([0.0; 5], 2.0)).unwrap();
    fs::write(dir.join("ref.csv"), scope_csv([0.0, 1.0, 2.0, 1.0, 0.0], 1.0)).unwrap();
    fs::write(dir.join("experiment.json"), CONFIG).unwrap();

    let config = load_config(&dir.join("experiment.json")).unwrap();
    assert!(config.states[0].signal.is_absolute());

    // Both rules give the same areas on these samples.
    for rule in [Quadrature::Trapezoid, Quadrature::Simpson] {
        let states = run_areas(&config, rule).unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].key, "cph_sph");
        assert_approx_eq!(states[0].corrected, (4.0 - 2.0) / 8.0, 1e-12);
        assert_approx_eq!(states[0].reference, 1.0, 1e-12);
        assert_approx_eq!(states[0].ratio, 0.25, 1e-12);
        assert_approx_eq!(states[1].ratio, 0.5, 1e-12);
    }

    let states = run_areas(&config, Quadrature::Trapezoid).unwrap();
    let report = area_report(&states);
    let out = dir.join("areas.json");
    write_area_json(&out, &report).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_approx_eq!(json["ratio"]["lph_sph"].as_f64().unwrap(), 0.5, 1e-12);
    assert_approx_eq!(json["area"]["cph_sph"].as_f64().unwrap(), 0.25, 1e-12);
    assert!(json["generated"].is_string());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_trace_fails_with_io_exit_code() {
    let dir = scratch_dir("missing");
    fs::write(dir.join("experiment.json"), CONFIG).unwrap();

    let config = load_config(&dir.join("experiment.json")).unwrap();
    let err = run_areas(&config, Quadrature::Simpson).unwrap_err();
    assert_eq!(err.exit_code(), 5);

    fs::remove_dir_all(&dir).ok();
}
