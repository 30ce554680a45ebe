use clap::{Args, Command, FromArgMatches};
use rfsizer::config::Config;
use rfsizer::SizerError;
use rstest::rstest;
use std::io::Write;

fn parse(args: &[&str]) -> (Config, clap::ArgMatches) {
    let cmd = Config::augment_args(Command::new("rfsizer-test"));
    let matches = cmd
        .try_get_matches_from(std::iter::once("rfsizer-test").chain(args.iter().copied()))
        .unwrap();
    let config = Config::from_arg_matches(&matches).unwrap();
    (config, matches)
}

#[test]
fn test_clap_defaults_match_default_impl() {
    let (parsed, _) = parse(&[]);
    assert_eq!(
        serde_json::to_value(&parsed).unwrap(),
        serde_json::to_value(Config::default()).unwrap()
    );
}

#[test]
fn test_default_values() {
    let c = Config::default();
    assert_eq!(c.run.target_rf, 1.0);
    assert_eq!(c.run.rf_tolerance, 0.05);
    assert_eq!(c.run.search_distance, 150.0);
    assert_eq!(c.fit.r2_threshold, 0.9);
    assert_eq!(c.stress_ratio.fsd_alpha, 0.5);
    assert_eq!(c.stress_ratio.fsd_max_step, 0.30);
    assert_eq!(c.stress_ratio.proximity_alpha, 0.25);
    assert_eq!(c.stress_ratio.proximity_max_step, 0.15);
    assert_eq!(c.decoupled.bar_phase_threshold, 0.9);
    assert!(c.validate().is_ok());
}

#[test]
fn test_file_config_with_cli_override() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "run": {{ "target_rf": 1.5, "max_iterations": 7 }}, "stress_ratio": {{ "fsd_alpha": 0.4 }} }}"#
    )
    .unwrap();

    let mut config = Config::load_from_file(file.path()).unwrap();
    assert_eq!(config.run.target_rf, 1.5);
    // Missing fields take their defaults.
    assert_eq!(config.run.patience, 10);
    assert_eq!(config.stress_ratio.fsd_max_step, 0.30);

    let (cli, matches) = parse(&["--max-iterations", "20", "--seed", "4"]);
    config.merge_from_cli(&cli, &matches);
    assert_eq!(config.run.max_iterations, 20);
    assert_eq!(config.run.seed, Some(4));
    // Only explicit flags override the file.
    assert_eq!(config.run.target_rf, 1.5);
    assert_eq!(config.stress_ratio.fsd_alpha, 0.4);
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    assert!(matches!(Config::load_from_file(file.path()), Err(SizerError::Json(_))));
}

#[rstest]
#[case::zero_target(|c: &mut Config| c.run.target_rf = 0.0)]
#[case::negative_tolerance(|c: &mut Config| c.run.rf_tolerance = -0.1)]
#[case::bad_density(|c: &mut Config| c.run.default_density = f64::NAN)]
#[case::bad_r2(|c: &mut Config| c.fit.r2_threshold = 1.5)]
#[case::full_step(|c: &mut Config| c.stress_ratio.fsd_max_step = 1.0)]
#[case::inverted_radius(|c: &mut Config| c.response_surface.rsm_min_radius = 0.9)]
#[case::radius_never_shrinks(|c: &mut Config| c.response_surface.rsm_shrink = 1.0)]
#[case::radius_grow_below_one(|c: &mut Config| c.response_surface.rsm_grow = 0.5)]
fn test_validate_rejects(#[case] tweak: fn(&mut Config)) {
    let mut config = Config::default();
    tweak(&mut config);
    assert!(matches!(config.validate(), Err(SizerError::Config(_))));
}
