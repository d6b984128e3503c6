//! Focused unit tests covering CLI configuration validation.

use super::helpers::ExtractFiles;
use super::*;
use geo::{Coord, Rect};
use rstest::rstest;

#[rstest]
#[case(None, Some(Utf8PathBuf::from("out.tiles")), ARG_OSM_PBF, ENV_BUILD_OSM_PBF)]
#[case(Some(Utf8PathBuf::from("in.osm.pbf")), None, ARG_OUTPUT, ENV_BUILD_OUTPUT)]
fn build_config_requires_both_paths(
    #[case] osm_pbf: Option<Utf8PathBuf>,
    #[case] output: Option<Utf8PathBuf>,
    #[case] field: &'static str,
    #[case] env_var: &'static str,
) {
    let args = BuildArgs { osm_pbf, output };
    let err = BuildConfig::try_from(args).expect_err("missing field should error");
    match err {
        CliError::MissingArgument {
            field: missing,
            env,
        } => {
            assert_eq!(missing, field);
            assert_eq!(env, env_var);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn summary_config_names_its_env_var() {
    let err = SummaryConfig::try_from(SummaryArgs::default()).expect_err("missing input");
    assert!(matches!(
        err,
        CliError::MissingArgument {
            field: ARG_OSM_PBF,
            env: ENV_SUMMARY_OSM_PBF,
        }
    ));
}

#[rstest]
fn validate_reports_missing_extract() {
    let files = ExtractFiles::new();
    let config = BuildConfig {
        osm_pbf: files.root().join("absent.osm.pbf"),
        output: files.output(),
    };
    let err = config.validate().expect_err("expected failure");
    match err {
        CliError::MissingSourceFile { field, path } => {
            assert_eq!(field, ARG_OSM_PBF);
            assert!(path.ends_with("absent.osm.pbf"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[rstest]
fn validate_rejects_directory_extract() {
    let files = ExtractFiles::new();
    let config = BuildConfig {
        osm_pbf: files.root().to_path_buf(),
        output: files.output(),
    };
    let err = config.validate().expect_err("expected directory rejection");
    assert!(matches!(
        err,
        CliError::SourcePathNotFile {
            field: ARG_OSM_PBF,
            ..
        }
    ));
}

#[rstest]
fn validate_rejects_directory_output() {
    let files = ExtractFiles::new();
    let config = BuildConfig {
        osm_pbf: files.extract().to_path_buf(),
        output: files.root().to_path_buf(),
    };
    let err = config.validate().expect_err("expected output rejection");
    assert!(matches!(err, CliError::OutputIsDirectory { .. }));
}

#[rstest]
fn validate_accepts_fresh_output() {
    let files = ExtractFiles::new();
    let config = BuildConfig {
        osm_pbf: files.extract().to_path_buf(),
        output: files.output(),
    };
    config.validate().expect("valid config");
}

#[rstest]
fn element_counts_swap_geo_axes() {
    let summary = OsmIngestSummary {
        nodes: 4,
        ways: 1,
        relations: 0,
        changesets: 2,
        bounds: Some(Rect::new(
            Coord { x: 13.40, y: 52.51 },
            Coord { x: 13.42, y: 52.53 },
        )),
    };
    let counts = ElementCounts::from(&summary);
    assert_eq!(counts.nodes, 4);
    assert_eq!(counts.changesets, 2);
    assert_eq!(
        counts.bounds,
        Some(Bounds {
            min_lat: 52.51,
            min_lon: 13.40,
            max_lat: 52.53,
            max_lon: 13.42,
        })
    );
}

#[rstest]
fn empty_summary_has_no_bounds() {
    let counts = ElementCounts::from(&OsmIngestSummary::default());
    let json = serde_json::to_value(&counts).expect("serialise counts");
    assert_eq!(json["bounds"], serde_json::Value::Null);
    assert_eq!(json["nodes"], 0);
}

#[rstest]
fn write_json_ends_with_newline() {
    let mut buffer = Vec::new();
    let output = SummaryOutput {
        input: Utf8PathBuf::from("in.osm.pbf"),
        summary: ElementCounts::from(&OsmIngestSummary::default()),
    };
    write_json(&mut buffer, &output).expect("write report");
    let text = String::from_utf8(buffer).expect("utf-8 report");
    assert!(text.ends_with("}\n"));
    let parsed: serde_json::Value = serde_json::from_str(&text).expect("parse report");
    assert_eq!(parsed["input"], "in.osm.pbf");
}

#[rstest]
#[case(&["atlas"])]
#[case(&["atlas", "render"])]
#[case(&["atlas", "build", "--bogus"])]
fn parser_rejects_bad_invocations(#[case] argv: &[&str]) {
    assert!(Cli::try_parse_from(argv).is_err());
}

#[rstest]
fn log_level_is_global() {
    let cli = Cli::try_parse_from(["atlas", "summary", "--log-level", "debug"])
        .expect("parse invocation");
    assert_eq!(cli.log_level, "debug");
    assert!(matches!(cli.command, Command::Summary(_)));
}
