use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct TestContext {
    dir: TempDir,
    model_path: PathBuf,
    allowables_path: PathBuf,
    loads_path: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let model_path = dir.path().join("model.json");
        let allowables_path = dir.path().join("allowables.csv");
        let loads_path = dir.path().join("loads.csv");

        // One bar with a neighbouring skin, one lone skin
        let model = r#"{
            "properties": [
                { "id": 1, "kind": "bar", "dim2": 10.0, "value": 5.0, "lower_bound": 1.0, "upper_bound": 20.0 },
                { "id": 11, "kind": "skin", "value": 4.0, "lower_bound": 1.0, "upper_bound": 10.0 },
                { "id": 12, "kind": "skin", "value": 4.0, "lower_bound": 1.0, "upper_bound": 10.0 }
            ],
            "elements": [
                { "id": 101, "property": 1, "measure": 100.0, "centroid": [0.0, 0.0, 0.0] },
                { "id": 111, "property": 11, "measure": 1000.0, "centroid": [50.0, 0.0, 0.0] },
                { "id": 112, "property": 12, "measure": 1000.0, "centroid": [900.0, 0.0, 0.0] }
            ]
        }"#;
        fs::write(&model_path, model).unwrap();

        // allowable = 100 √t
        let mut allow = File::create(&allowables_path).unwrap();
        writeln!(allow, "level,id,thickness,allowable").unwrap();
        for id in [1, 11, 12] {
            for t in 1..=5 {
                writeln!(allow, "property,{},{},{}", id, t, 100.0 * (t as f64).sqrt()).unwrap();
            }
        }

        let mut loads = File::create(&loads_path).unwrap();
        writeln!(loads, "subcase,element,load").unwrap();
        writeln!(loads, "1,101,20000").unwrap();
        writeln!(loads, "2,101,-8000").unwrap();
        writeln!(loads, "1,111,1000").unwrap();
        writeln!(loads, "1,112,200").unwrap();

        Self {
            dir,
            model_path,
            allowables_path,
            loads_path,
        }
    }

    fn run(&self, args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_rfsizer"));
        cmd.arg("--model")
            .arg(&self.model_path)
            .arg("--allowables")
            .arg(&self.allowables_path)
            .args(args);
        cmd.output().expect("Failed to execute rfsizer")
    }

    fn loads(&self) -> &str {
        self.loads_path.to_str().unwrap()
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn assert_ok(output: &Output) {
    assert!(
        output.status.success(),
        "rfsizer failed:\nstdout: {}\nstderr: {}",
        stdout(output),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_fit_prints_table() {
    let ctx = TestContext::new();
    let output = ctx.run(&["fit"]);
    assert_ok(&output);
    let out = stdout(&output);
    assert!(out.contains("ALLOWABLE FITS"));
    assert!(out.contains("3 property fits (0 excluded)"), "{}", out);
}

#[test]
fn test_evaluate_reports_min_rf() {
    let ctx = TestContext::new();
    let output = ctx.run(&["evaluate", "--loads", ctx.loads(), "--elements"]);
    assert_ok(&output);
    let out = stdout(&output);
    assert!(out.contains("DESIGN EVALUATION"));
    assert!(out.contains("FAIL"));
}

#[test]
fn test_optimize_writes_history() {
    let ctx = TestContext::new();
    let history = ctx.path("run");
    let output = ctx.run(&[
        "optimize",
        "--loads",
        ctx.loads(),
        "--strategy",
        "fsd-bottom-up",
        "--max-iterations",
        "40",
        "--history",
        history.to_str().unwrap(),
    ]);
    assert_ok(&output);
    assert!(stdout(&output).contains("OPTIMIZATION RESULT"));

    let csv = fs::read_to_string(history.join("history.csv")).unwrap();
    assert!(csv.starts_with("iteration,evaluated,min_rf"));
    assert!(csv.lines().count() > 2);
    let best: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(history.join("best_design.json")).unwrap()).unwrap();
    assert!(best.get("values").is_some());
}

#[test]
fn test_surrogate_writes_training_samples() {
    let ctx = TestContext::new();
    let history = ctx.path("surrogate");
    let output = ctx.run(&[
        "optimize",
        "--loads",
        ctx.loads(),
        "--strategy",
        "surrogate",
        "--seed",
        "3",
        "--max-iterations",
        "12",
        "--history",
        history.to_str().unwrap(),
    ]);
    assert_ok(&output);
    let samples = fs::read_to_string(history.join("training_samples.csv")).unwrap();
    assert!(samples.starts_with("min_rf,weight,p1,p11,p12"));
    assert_eq!(samples.lines().count(), 13);
}

#[test]
fn test_config_file_is_honoured() {
    let ctx = TestContext::new();
    let config_path = ctx.path("config.json");
    fs::write(&config_path, r#"{ "run": { "target_rf": 0.0 } }"#).unwrap();
    let output = ctx.run(&["--config", config_path.to_str().unwrap(), "evaluate", "--loads", ctx.loads()]);
    assert!(!output.status.success());
    // Flag overrides the invalid file value.
    let output = ctx.run(&[
        "--config",
        config_path.to_str().unwrap(),
        "evaluate",
        "--loads",
        ctx.loads(),
        "--target-rf",
        "1.2",
    ]);
    assert_ok(&output);
}

#[test]
fn test_missing_model_fails() {
    let ctx = TestContext::new();
    let output = Command::new(env!("CARGO_BIN_EXE_rfsizer"))
        .args(["--model", "nope.json", "fit"])
        .arg("--allowables")
        .arg(&ctx.allowables_path)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(!Path::new("nope.json").exists());
}
