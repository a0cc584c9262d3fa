use std::fs;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use kira_prs::ancestry::{
    self, AncestryEstimator, AncestryInput, AncestryOutcome, DockerAncestry, ESTIMATOR_DIR,
    ESTIMATOR_SCRIPT,
};
use kira_prs::error::{PipelineError, Result};
use kira_prs::tool::{CommandRunner, ToolCommand, ToolOutput};

#[test]
fn chr_prefix_is_stripped_from_data_rows_only() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("in.input");
    let dst = tmp.path().join("out.input");
    fs::write(&src, "chrIID\tchr1:100:A:G_A\nchrS1\t1\nS2\t0\n").unwrap();

    let changed = ancestry::strip_chr_prefix(&src, &dst).unwrap();
    assert_eq!(changed, 1);
    assert_eq!(
        fs::read_to_string(&dst).unwrap(),
        "chrIID\tchr1:100:A:G_A\nS1\t1\nS2\t0\n"
    );
}

#[test]
fn hand_off_copies_and_strips() {
    let tmp = TempDir::new().unwrap();
    let table = tmp.path().join("individual_genotypes2.input");
    fs::write(&table, "IID\tchr1:100:A:G_A\nS1\t2\n").unwrap();
    let shared = tmp.path().join("Ancestry");
    let handoff = shared.join(ancestry::HANDOFF_FILE_NAME);
    let stripped = shared.join(ancestry::STRIPPED_FILE_NAME);

    ancestry::hand_off(&table, &handoff, &stripped).unwrap();
    assert_eq!(fs::read(&handoff).unwrap(), fs::read(&table).unwrap());
    assert!(stripped.exists());
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<ToolCommand>>,
    launch_fails: bool,
    produce: bool,
}

impl CommandRunner for Recorder {
    fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput> {
        self.calls.lock().unwrap().push(cmd.clone());
        if self.launch_fails {
            return Err(PipelineError::Launch {
                tool: cmd.tool_name(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }
        if self.produce {
            let workdir = cmd.arg_strings()
                .iter()
                .find_map(|a| a.strip_suffix(":/app").map(str::to_string))
                .unwrap();
            fs::write(
                std::path::Path::new(&workdir).join(ancestry::OUTPUT_FILE_NAME),
                "EUR 0.9\n",
            )
            .unwrap();
        }
        Ok(ToolOutput::default())
    }
}

fn workdir(tmp: &TempDir, estimator: bool, reference: bool) -> AncestryInput {
    let input = AncestryInput::in_dir(tmp.path());
    fs::write(&input.genotypes, "IID\t1:100:A:G_A\nS1\t1\n").unwrap();
    if estimator {
        fs::create_dir_all(tmp.path().join(ESTIMATOR_DIR)).unwrap();
        fs::write(tmp.path().join(ESTIMATOR_DIR).join(ESTIMATOR_SCRIPT), "").unwrap();
    }
    if reference {
        fs::write(&input.reference, "freqs\n").unwrap();
    }
    input
}

#[test]
fn missing_estimator_is_unavailable_without_running_docker() {
    let tmp = TempDir::new().unwrap();
    let input = workdir(&tmp, false, true);
    let runner = Arc::new(Recorder::default());
    let docker = DockerAncestry::new("docker", "ancestry-py27", runner.clone());

    let outcome = docker.run(&input).unwrap();
    assert!(matches!(outcome, AncestryOutcome::Unavailable { .. }));
    assert!(runner.calls.lock().unwrap().is_empty());
}

#[test]
fn missing_reference_is_unavailable() {
    let tmp = TempDir::new().unwrap();
    let input = workdir(&tmp, true, false);
    let docker = DockerAncestry::new("docker", "ancestry-py27", Arc::new(Recorder::default()));
    match docker.run(&input).unwrap() {
        AncestryOutcome::Unavailable { reason } => assert!(reason.contains("reference")),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn docker_launch_failure_is_unavailable() {
    let tmp = TempDir::new().unwrap();
    let input = workdir(&tmp, true, true);
    let runner = Arc::new(Recorder {
        launch_fails: true,
        ..Recorder::default()
    });
    let docker = DockerAncestry::new("docker", "ancestry-py27", runner);
    assert!(matches!(
        docker.run(&input).unwrap(),
        AncestryOutcome::Unavailable { .. }
    ));
}

#[test]
fn completed_run_mounts_workdir_and_reports_output() {
    let tmp = TempDir::new().unwrap();
    let input = workdir(&tmp, true, true);
    let runner = Arc::new(Recorder {
        produce: true,
        ..Recorder::default()
    });
    let docker = DockerAncestry::new("docker", "ancestry-py27", runner.clone());

    let outcome = docker.run(&input).unwrap();
    assert_eq!(
        outcome,
        AncestryOutcome::Completed {
            output: input.output.clone()
        }
    );

    let calls = runner.calls.lock().unwrap();
    let args = calls[0].arg_strings();
    assert_eq!(calls[0].program, "docker");
    assert_eq!(&args[..2], ["run", "--ulimit"]);
    assert!(args.contains(&"ancestry-py27".to_string()));
    let script = args.last().unwrap();
    assert!(script.contains("./runancestry.py"));
    assert!(script.contains("--geno ../individual_genotypes2_nochr.input"));
    assert!(script.contains("--out ../sample2.ancestry"));
}

#[test]
fn estimator_that_writes_nothing_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let input = workdir(&tmp, true, true);
    let docker = DockerAncestry::new("docker", "ancestry-py27", Arc::new(Recorder::default()));
    let err = docker.run(&input).unwrap_err();
    assert!(matches!(err, PipelineError::ArtifactNotProduced { .. }));
}
