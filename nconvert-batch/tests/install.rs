//! End-to-end installation against a real HTTP server.

mod common;

use std::fs;
use std::sync::Mutex;
use std::time::Duration;

use httpmock::prelude::*;
use nconvert_batch::manager::{
    Architecture, FixedArchitecture, InstallPipeline, InstallStage, ManagerConfig,
    PipelineOutcome,
};
use nconvert_batch::session::{self, Session};
use tempfile::TempDir;

const PATH: &str = "/NConvert-win64.zip";
const MIB: usize = 1024 * 1024;

fn config(temp: &TempDir, url: String) -> ManagerConfig {
    ManagerConfig::new(temp.path().join("app"))
        .with_staging_dir(temp.path().join("staging"))
        .with_url(Architecture::X64, url)
        .with_retry_delay(Duration::ZERO)
}

/// 10 MB archive, previous run stopped at 4 MB: the pipeline resumes from
/// the checkpoint, validates, installs and passes the final check.
#[test]
fn resumes_interrupted_download_and_installs() {
    let server = MockServer::start();
    let (archive, exe) = common::nconvert_archive(10 * MIB);
    let split = 4 * MIB;

    let temp = TempDir::new().unwrap();
    let config = config(&temp, server.url(PATH));
    let archive_path = config.archive_path(Architecture::X64);
    fs::create_dir_all(archive_path.parent().unwrap()).unwrap();
    fs::write(&archive_path, &archive[..split]).unwrap();

    let resume = server.mock(|when, then| {
        when.method(GET)
            .path(PATH)
            .header("range", format!("bytes={}-", split));
        then.status(206)
            .header(
                "content-range",
                format!("bytes {}-{}/{}", split, archive.len() - 1, archive.len()),
            )
            .body(archive[split..].to_vec());
    });

    let pipeline = InstallPipeline::from_config(config).unwrap();
    let stages = Mutex::new(Vec::new());
    let on_stage = |stage: InstallStage, _: &str| stages.lock().unwrap().push(stage);
    let outcome = pipeline
        .run(&FixedArchitecture(Architecture::X64), Some(&on_stage), None)
        .unwrap();

    resume.assert();
    let installed = match outcome {
        PipelineOutcome::Installed(result) => result,
        other => panic!("expected Installed, got {:?}", other),
    };
    assert_eq!(installed.bytes_downloaded, archive.len() as u64);
    assert_eq!(fs::read(&installed.executable).unwrap(), exe);
    assert!(pipeline.config().install_dir.join("Plugins/webp.dll").is_file());
    assert!(!archive_path.exists());
    assert_eq!(stages.into_inner().unwrap().last(), Some(&InstallStage::Complete));

    // A second run finds the executable and never touches the network.
    let again = pipeline
        .run(&FixedArchitecture(Architecture::X64), None, None)
        .unwrap();
    assert!(matches!(again, PipelineOutcome::AlreadyInstalled { .. }));
    resume.assert_hits(1);
}

/// Only the URL and directories are set; the executable name comes from
/// the archive layout.
#[test]
fn default_config_installs_published_layout() {
    let server = MockServer::start();
    let (archive, exe) = common::nconvert_archive(32 * 1024);
    server.mock(|when, then| {
        when.method(GET).path(PATH);
        then.status(200).body(archive.clone());
    });

    let temp = TempDir::new().unwrap();
    let config = ManagerConfig::new(temp.path().join("app"))
        .with_staging_dir(temp.path().join("staging"))
        .with_url(Architecture::X64, server.url(PATH));
    let pipeline = InstallPipeline::from_config(config).unwrap();

    let outcome = pipeline
        .run(&FixedArchitecture(Architecture::X64), None, None)
        .unwrap();

    let installed = match outcome {
        PipelineOutcome::Installed(result) => result,
        other => panic!("expected Installed, got {:?}", other),
    };
    assert_eq!(installed.executable, temp.path().join("app/nconvert.exe"));
    assert_eq!(fs::read(&installed.executable).unwrap(), exe);
}

#[test]
fn corrupt_download_fails_without_installing() {
    let server = MockServer::start();
    let (mut archive, _) = common::nconvert_archive(64 * 1024);
    let middle = archive.len() / 2;
    archive[middle] ^= 0xFF;

    let corrupt = server.mock(|when, then| {
        when.method(GET).path(PATH);
        then.status(200).body(archive.clone());
    });

    let temp = TempDir::new().unwrap();
    let config = config(&temp, server.url(PATH));
    let executable = config.executable_path();
    let pipeline = InstallPipeline::from_config(config).unwrap();

    let failure = pipeline
        .run(&FixedArchitecture(Architecture::X64), None, None)
        .unwrap_err();

    corrupt.assert_hits(3);
    assert_eq!(failure.stage, InstallStage::Download);
    assert!(!executable.exists());
}

#[test]
fn workspace_is_prepared_after_install() {
    let server = MockServer::start();
    let (archive, _) = common::nconvert_archive(16 * 1024);
    server.mock(|when, then| {
        when.method(GET).path(PATH);
        then.status(200).body(archive.clone());
    });

    let temp = TempDir::new().unwrap();
    let config = config(&temp, server.url(PATH));
    let app_dir = config.install_dir.clone();
    InstallPipeline::from_config(config)
        .unwrap()
        .run(&FixedArchitecture(Architecture::X64), None, None)
        .unwrap();

    let workspace = session::prepare_workspace(&app_dir).unwrap();
    let saved = Session::load(&session::session_path(&app_dir));
    assert_eq!(saved.last_folder, Some(workspace));
    assert_eq!(saved.last_from, "PSPIMAGE");
}
