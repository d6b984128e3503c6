//! Behaviour-driven step definitions driving the CLI subcommands.

use super::helpers::ExtractFiles;
use super::*;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

type Outcome = Result<serde_json::Value, CliError>;

/// Scenario state shared by every step.
struct CliWorld {
    files: ExtractFiles,
    cli_args: RefCell<Vec<String>>,
    outcome: RefCell<Option<Outcome>>,
}

impl CliWorld {
    fn new() -> Self {
        Self {
            files: ExtractFiles::new(),
            cli_args: RefCell::new(Vec::new()),
            outcome: RefCell::new(None),
        }
    }

    fn push_flag(&self, flag: &str, value: &Utf8Path) {
        self.cli_args
            .borrow_mut()
            .extend([format!("--{flag}"), value.as_str().to_owned()]);
    }

    fn invoke(&self, subcommand: &str) {
        let mut argv = vec!["atlas".to_owned(), subcommand.to_owned()];
        argv.extend(self.cli_args.borrow().iter().cloned());
        let outcome = Cli::try_parse_from(argv)
            .map_err(CliError::ArgumentParsing)
            .and_then(|cli| {
                let mut buffer = Vec::new();
                match cli.command {
                    Command::Build(args) => write_json(&mut buffer, &run_build(args)?)?,
                    Command::Summary(args) => write_json(&mut buffer, &run_summary(args)?)?,
                }
                serde_json::from_slice(&buffer).map_err(CliError::SerialiseOutput)
            });
        self.outcome.replace(Some(outcome));
    }

    fn report(&self) -> serde_json::Value {
        let borrowed = self.outcome.borrow();
        match borrowed.as_ref().expect("command ran") {
            Ok(report) => report.clone(),
            Err(err) => panic!("expected success, found {err:?}"),
        }
    }

    fn error(&self) -> CliError {
        let outcome = self.outcome.take().expect("command ran");
        outcome.expect_err("expected failure")
    }
}

#[fixture]
fn world() -> CliWorld {
    CliWorld::new()
}

#[given("an OSM extract on disk")]
fn extract_exists(#[from(world)] world: &CliWorld) {
    assert!(world.files.extract().is_file());
}

#[given("I pass the extract and output paths with CLI flags")]
fn pass_both_paths(#[from(world)] world: &CliWorld) {
    world.push_flag(ARG_OSM_PBF, world.files.extract());
    world.push_flag(ARG_OUTPUT, &world.files.output());
}

#[given("I pass only the output path")]
fn pass_output_only(#[from(world)] world: &CliWorld) {
    world.push_flag(ARG_OUTPUT, &world.files.output());
}

#[given("I pass the extract path with a CLI flag")]
fn pass_extract(#[from(world)] world: &CliWorld) {
    world.push_flag(ARG_OSM_PBF, world.files.extract());
}

#[given("I pass the workspace directory as the extract")]
fn pass_directory(#[from(world)] world: &CliWorld) {
    world.push_flag(ARG_OSM_PBF, world.files.root());
    world.push_flag(ARG_OUTPUT, &world.files.output());
}

#[when("I run the build command")]
fn run_build_command(#[from(world)] world: &CliWorld) {
    world.invoke("build");
}

#[when("I run the summary command")]
fn run_summary_command(#[from(world)] world: &CliWorld) {
    world.invoke("summary");
}

#[then("the report lists two features in one tile")]
fn report_lists_features(#[from(world)] world: &CliWorld) {
    let report = world.report();
    assert_eq!(report["features"], 2);
    assert_eq!(report["skipped_ways"], 0);
    assert_eq!(report["tiles"]["tiles"], 1);
    assert_eq!(report["summary"]["nodes"], 3);
}

#[then("the tile file exists")]
fn tile_file_exists(#[from(world)] world: &CliWorld) {
    let report = world.report();
    assert_eq!(report["output"], world.files.output().as_str());
    assert!(world.files.output().is_file());
}

#[then("the command fails naming the osm-pbf argument")]
fn fails_on_missing_argument(#[from(world)] world: &CliWorld) {
    match world.error() {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_OSM_PBF);
            assert_eq!(env, ENV_BUILD_OSM_PBF);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!world.files.output().exists());
}

#[then("the summary counts three nodes and one way")]
fn summary_counts(#[from(world)] world: &CliWorld) {
    let report = world.report();
    assert_eq!(report["summary"]["nodes"], 3);
    assert_eq!(report["summary"]["ways"], 1);
    assert_eq!(report["summary"]["changesets"], 0);
    assert!(report["summary"]["bounds"].is_object());
}

#[then("the command fails because the extract is not a file")]
fn fails_on_directory(#[from(world)] world: &CliWorld) {
    assert!(matches!(
        world.error(),
        CliError::SourcePathNotFile {
            field: ARG_OSM_PBF,
            ..
        }
    ));
}

macro_rules! register_cli_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/build_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: CliWorld) {
            let _ = world;
        }
    };
}

register_cli_scenario!(building_from_flags, "building a tile file from CLI flags");
register_cli_scenario!(rejecting_missing_extract, "rejecting a missing extract argument");
register_cli_scenario!(summarising_extract, "summarising an extract");
register_cli_scenario!(rejecting_directory_extract, "rejecting a directory as the extract");
