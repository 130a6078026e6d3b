//! Unit tests for pipeline orchestration.
//!
//! These run real builds against temporary project trees; external tools
//! are stubbed with `StubExecutor` and the upload transport is mocked.

use super::*;
use crate::artefact::upload::{Credentials, MockReleaseTransport, TransportResponse};
use crate::test_utils::{ExpectedCall, StubExecutor, failure_output};
use rstest::{fixture, rstest};
use std::fs;
use std::io::Read;
use tempfile::TempDir;

struct Project {
    _dir: TempDir,
    root: Utf8PathBuf,
    dist: Utf8PathBuf,
}

impl Project {
    fn write(&self, relative: &str, contents: &str) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directories");
        }
        fs::write(&path, contents).expect("write file");
    }

    fn context<'a>(&'a self, config: &'a ReleaseConfig) -> PipelineContext<'a> {
        PipelineContext {
            root: &self.root,
            output_dir: &self.dist,
            config,
            quiet: false,
        }
    }
}

#[fixture]
fn project() -> Project {
    let dir = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
    let project = Project {
        dist: root.join("dist"),
        root,
        _dir: dir,
    };
    project.write(
        "CommandSage/CommandSage.toc",
        "## Interface: 100000\n## Title: CommandSage\n## Version: 0.0.1\n",
    );
    project.write("CommandSage/Core.lua", "local x = 1\n");
    project.write("tests/test_core.lua", "describe()\n");
    project.write(".git/HEAD", "ref: refs/heads/main\n");
    project
}

fn release_config() -> ReleaseConfig {
    ReleaseConfig {
        credentials: Credentials {
            project_id: Some("42".to_owned()),
            token: Some("secret".to_owned()),
        },
        ..ReleaseConfig::default()
    }
}

fn entry_text(archive: &Utf8Path, name: &str) -> String {
    let file = fs::File::open(archive).expect("open archive");
    let mut zip = zip::ZipArchive::new(file).expect("valid zip");
    let mut entry = zip.by_name(name).expect("entry present");
    let mut text = String::new();
    entry.read_to_string(&mut text).expect("utf-8 entry");
    text
}

fn checks_passing(root: &Utf8Path) -> StubExecutor {
    StubExecutor::new(vec![
        ExpectedCall::new("luacheck", &["."]).in_dir(root),
        ExpectedCall::new("busted", &["--pattern=test_.*\\.lua", "tests"]).in_dir(root),
    ])
}

fn expect_archive(outcome: BuildOutcome) -> ArchiveHandle {
    match outcome {
        BuildOutcome::Archive(handle) => handle,
        BuildOutcome::Listing(_) => panic!("expected an archive"),
    }
}

#[rstest]
fn build_writes_versioned_archive(project: Project) {
    let config = ReleaseConfig {
        interface_version: Some(ReleaseVersion::try_from("110002").expect("valid")),
        ..ReleaseConfig::default()
    };
    let mut stderr = Vec::new();

    let handle = expect_archive(
        build(&project.context(&config), Some("1.2.3"), false, &mut stderr).expect("build"),
    );

    assert_eq!(handle.path, project.dist.join("CommandSage-1.2.3.zip"));
    assert_eq!(
        handle.entries,
        vec!["CommandSage/CommandSage.toc", "CommandSage/Core.lua"]
    );
    assert_eq!(
        entry_text(&handle.path, "CommandSage/CommandSage.toc"),
        "## Interface: 110002\n## Title: CommandSage\n## Version: 1.2.3\n"
    );
    let stderr = String::from_utf8(stderr).expect("utf-8 stderr");
    assert!(stderr.contains("Building CommandSage 1.2.3..."));
    assert!(stderr.contains("SHA-256: "));
}

#[rstest]
fn build_prefers_environment_version_over_override(project: Project) {
    let config = ReleaseConfig {
        version: Some(ReleaseVersion::try_from("4.5.6").expect("valid")),
        ..ReleaseConfig::default()
    };
    let handle = expect_archive(
        build(&project.context(&config), Some("9.9.9"), false, &mut Vec::new()).expect("build"),
    );
    assert!(handle.path.as_str().ends_with("CommandSage-4.5.6.zip"));
}

#[rstest]
fn manifest_template_is_stamped_and_its_excludes_applied(project: Project) {
    project.write("CommandSage/Dev.lua", "debug()\n");
    project.write(
        "manifest.template.json",
        r#"{"name":"CommandSage","version":"0.0.0","excludeFiles":["CommandSage/Dev.lua"]}"#,
    );
    let config = ReleaseConfig::default();

    let handle = expect_archive(
        build(&project.context(&config), Some("2.0.0"), false, &mut Vec::new()).expect("build"),
    );

    assert_eq!(handle.entries.first().map(String::as_str), Some("manifest.json"));
    assert!(!handle.entries.iter().any(|e| e == "CommandSage/Dev.lua"));
    assert!(!handle.entries.iter().any(|e| e == "manifest.template.json"));
    let manifest: serde_json::Value =
        serde_json::from_str(&entry_text(&handle.path, "manifest.json")).expect("valid JSON");
    assert_eq!(manifest["version"], "2.0.0");
}

#[rstest]
fn environment_excludes_are_applied(project: Project) {
    let config = ReleaseConfig {
        environment_excludes: Some("CommandSage/Core.lua".to_owned()),
        ..ReleaseConfig::default()
    };
    let handle = expect_archive(
        build(&project.context(&config), Some("1.0.0"), false, &mut Vec::new()).expect("build"),
    );
    assert_eq!(handle.entries, vec!["CommandSage/CommandSage.toc"]);
}

#[rstest]
fn dry_run_lists_files_and_writes_nothing(project: Project) {
    let config = ReleaseConfig::default();
    let mut stderr = Vec::new();

    let outcome =
        build(&project.context(&config), Some("1.0.0"), true, &mut stderr).expect("dry run");

    let BuildOutcome::Listing(listing) = outcome else {
        panic!("expected a listing");
    };
    assert_eq!(
        listing.files,
        vec!["CommandSage/CommandSage.toc", "CommandSage/Core.lua"]
    );
    assert!(!project.dist.exists());
    let stderr = String::from_utf8(stderr).expect("utf-8 stderr");
    assert!(stderr.starts_with("Dry run - would package 2 files"));
}

#[rstest]
fn broken_manifest_template_aborts_the_build(project: Project) {
    project.write("manifest.template.json", "{ nope");
    let config = ReleaseConfig::default();

    let err = build(&project.context(&config), Some("1.0.0"), false, &mut Vec::new())
        .expect_err("must fail");
    assert!(matches!(err, PipelineError::Manifest(_)));
    assert!(!project.dist.exists());
}

#[rstest]
fn custom_output_dir_inside_root_is_not_packaged(project: Project) {
    let out = project.root.join("build-output");
    fs::create_dir_all(&out).expect("mkdir");
    fs::write(out.join("old.zip"), b"stale").expect("write stale archive");
    let config = ReleaseConfig::default();
    let context = PipelineContext {
        output_dir: &out,
        ..project.context(&config)
    };

    let handle = expect_archive(
        build(&context, Some("1.0.0"), false, &mut Vec::new()).expect("build"),
    );
    assert!(!handle.entries.iter().any(|e| e.starts_with("build-output/")));
}

#[rstest]
fn custom_output_dir_is_pruned_by_path_not_by_name(project: Project) {
    project.write("CommandSage/Media/icon.png", "png");
    project.write("build/Media/stale.lua", "old()\n");
    let out = project.root.join("build/Media");
    let config = ReleaseConfig::default();
    let context = PipelineContext {
        output_dir: &out,
        ..project.context(&config)
    };

    let handle = expect_archive(
        build(&context, Some("1.0.0"), false, &mut Vec::new()).expect("build"),
    );
    assert!(handle.entries.iter().any(|e| e == "CommandSage/Media/icon.png"));
    assert!(!handle.entries.iter().any(|e| e.starts_with("build/Media/")));
    assert!(out.join("CommandSage-1.0.0.zip").exists());
}

#[rstest]
fn quiet_build_prints_nothing(project: Project) {
    let config = ReleaseConfig::default();
    let context = PipelineContext {
        quiet: true,
        ..project.context(&config)
    };
    let mut stderr = Vec::new();
    build(&context, Some("1.0.0"), false, &mut stderr).expect("build");
    assert!(stderr.is_empty());
}

#[rstest]
fn ci_runs_checks_before_building(project: Project) {
    let config = ReleaseConfig::default();
    let executor = checks_passing(&project.root);

    let handle = ci(&project.context(&config), &executor, &mut Vec::new()).expect("ci");

    executor.assert_finished();
    assert!(handle.path.as_str().ends_with("CommandSage-0.0.0.zip"));
}

#[rstest]
fn ci_stops_at_failing_lint(project: Project) {
    let config = ReleaseConfig::default();
    let executor = StubExecutor::new(vec![
        ExpectedCall::new("luacheck", &["."])
            .in_dir(&project.root)
            .returning(Ok(failure_output("1 error"))),
    ]);

    let err = ci(&project.context(&config), &executor, &mut Vec::new()).expect_err("must fail");

    executor.assert_finished();
    assert!(matches!(err, PipelineError::Tool(_)));
    assert!(!project.dist.exists());
}

#[rstest]
fn lint_runs_luacheck_in_project_root(project: Project) {
    let config = ReleaseConfig::default();
    let executor = StubExecutor::new(vec![
        ExpectedCall::new("luacheck", &["."]).in_dir(&project.root),
    ]);
    let mut stderr = Vec::new();

    lint(&project.context(&config), &executor, &mut stderr).expect("lint");

    executor.assert_finished();
    assert_eq!(String::from_utf8(stderr).expect("utf-8 stderr"), "Lint passed\n");
}

#[rstest]
fn test_forwards_grep_as_busted_filter(project: Project) {
    let config = ReleaseConfig::default();
    let executor = StubExecutor::new(vec![
        ExpectedCall::new(
            "busted",
            &["--pattern=test_.*\\.lua", "tests", "--filter=parser"],
        )
        .in_dir(&project.root),
    ]);
    let mut stderr = Vec::new();

    test(&project.context(&config), &executor, Some("parser"), &mut stderr).expect("test");

    executor.assert_finished();
    assert_eq!(String::from_utf8(stderr).expect("utf-8 stderr"), "Tests passed\n");
}

#[rstest]
fn failing_test_run_is_a_tool_error(project: Project) {
    let config = ReleaseConfig::default();
    let executor = StubExecutor::new(vec![
        ExpectedCall::new("busted", &["--pattern=test_.*\\.lua", "tests"])
            .in_dir(&project.root)
            .returning(Ok(failure_output("2 failures"))),
    ]);

    let err = test(&project.context(&config), &executor, None, &mut Vec::new())
        .expect_err("must fail");

    executor.assert_finished();
    assert!(matches!(err, PipelineError::Tool(_)));
    assert!(err.to_string().contains("2 failures"));
}

#[rstest]
fn release_uploads_archive_with_changelog(project: Project) {
    project.write("CHANGELOG.md", "## 1.2.3\n- New things\n");
    let config = release_config();
    let executor = checks_passing(&project.root);
    let mut transport = MockReleaseTransport::new();
    transport
        .expect_post()
        .times(1)
        .withf(|request| {
            let body = String::from_utf8_lossy(&request.body);
            request.url.ends_with("/projects/42/upload-file")
                && body.contains("\"changelog\":\"## 1.2.3\\n- New things\\n\"")
                && body.contains("\"displayName\":\"CommandSage-1.2.3\"")
        })
        .returning(|_| {
            Ok(TransportResponse {
                status: 200,
                body: r#"{"id":77}"#.to_owned(),
            })
        });
    let client = UploadClient::new(transport, &config.api_url);
    let mut stderr = Vec::new();

    let result = release(
        &project.context(&config),
        &executor,
        &client,
        ReleaseOptions {
            version_override: Some("1.2.3"),
            skip_checks: false,
        },
        &mut stderr,
    )
    .expect("release succeeds");

    executor.assert_finished();
    assert_eq!(result.body, r#"{"id":77}"#);
    let stderr = String::from_utf8(stderr).expect("utf-8 stderr");
    assert!(stderr.contains("Release metadata:"));
    assert!(stderr.contains("\"gameVersions\""));
    assert!(stderr.contains("Upload complete (HTTP 200)"));
}

#[rstest]
fn release_without_credentials_does_nothing(project: Project) {
    let config = ReleaseConfig::default();
    let executor = StubExecutor::new(Vec::new());
    let mut transport = MockReleaseTransport::new();
    transport.expect_post().times(0);
    let client = UploadClient::new(transport, &config.api_url);

    let err = release(
        &project.context(&config),
        &executor,
        &client,
        ReleaseOptions::default(),
        &mut Vec::new(),
    )
    .expect_err("must fail");

    assert!(matches!(
        err,
        PipelineError::Upload(UploadError::MissingCredentials { .. })
    ));
    assert!(!project.dist.exists());
}

#[rstest]
fn release_changelog_environment_overrides_file(project: Project) {
    project.write("CHANGELOG.md", "from file");
    let config = ReleaseConfig {
        changelog: Some("from env".to_owned()),
        ..release_config()
    };
    let mut transport = MockReleaseTransport::new();
    transport
        .expect_post()
        .times(1)
        .withf(|request| String::from_utf8_lossy(&request.body).contains("\"changelog\":\"from env\""))
        .returning(|_| {
            Ok(TransportResponse {
                status: 201,
                body: String::new(),
            })
        });
    let client = UploadClient::new(transport, &config.api_url);

    release(
        &project.context(&config),
        &StubExecutor::new(Vec::new()),
        &client,
        ReleaseOptions {
            version_override: Some("1.0.0"),
            skip_checks: true,
        },
        &mut Vec::new(),
    )
    .expect("release succeeds");
}

#[rstest]
fn rejected_upload_is_reported(project: Project) {
    let config = release_config();
    let mut transport = MockReleaseTransport::new();
    transport.expect_post().times(1).returning(|_| {
        Ok(TransportResponse {
            status: 422,
            body: "invalid game version".to_owned(),
        })
    });
    let client = UploadClient::new(transport, &config.api_url);

    let err = release(
        &project.context(&config),
        &StubExecutor::new(Vec::new()),
        &client,
        ReleaseOptions {
            version_override: None,
            skip_checks: true,
        },
        &mut Vec::new(),
    )
    .expect_err("must fail");

    assert_eq!(
        err.to_string(),
        "upload failed: upload rejected with HTTP 422: invalid game version"
    );
    assert!(project.dist.join("CommandSage-0.0.0.zip").exists());
}

#[rstest]
fn clean_removes_output_directory(project: Project) {
    let config = ReleaseConfig::default();
    build(&project.context(&config), None, false, &mut Vec::new()).expect("build");
    assert!(project.dist.exists());

    assert!(clean(&project.context(&config), &mut Vec::new()).expect("clean"));
    assert!(!project.dist.exists());
    assert!(!clean(&project.context(&config), &mut Vec::new()).expect("second clean"));
}

#[rstest]
fn clean_refuses_to_remove_project_root(project: Project) {
    let config = ReleaseConfig::default();
    let context = PipelineContext {
        output_dir: &project.root,
        ..project.context(&config)
    };
    let err = clean(&context, &mut Vec::new()).expect_err("must refuse");
    assert!(matches!(err, PipelineError::Clean { .. }));
    assert!(project.root.join("CommandSage/Core.lua").exists());
}

#[rstest]
fn clean_refuses_output_directory_above_project_root(project: Project) {
    let config = ReleaseConfig::default();
    let parent = project.root.join("..");
    let context = PipelineContext {
        output_dir: &parent,
        ..project.context(&config)
    };

    let err = clean(&context, &mut Vec::new()).expect_err("must refuse");

    assert!(matches!(err, PipelineError::Clean { .. }));
    assert!(err.to_string().contains(parent.as_str()));
    assert!(project.root.join("CommandSage/Core.lua").exists());
}
