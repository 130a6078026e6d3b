//! Tests for manifest template loading.

use super::*;
use rstest::{fixture, rstest};
use tempfile::TempDir;

#[fixture]
fn version() -> ReleaseVersion {
    ReleaseVersion::try_from("1.2.3").expect("valid version")
}

fn template_path() -> &'static Utf8Path {
    Utf8Path::new("manifest.template.json")
}

fn write_template(dir: &TempDir, raw: &str) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join("manifest.template.json"))
        .expect("utf-8 temp path");
    fs::write(&path, raw).expect("write template");
    path
}

#[rstest]
fn version_is_overwritten_unconditionally(version: ReleaseVersion) {
    let template = ManifestTemplate::parse(
        template_path(),
        r#"{"name":"CommandSage","version":"0.0.1"}"#,
    )
    .expect("valid template");
    assert_eq!(template.template_version(), Some("0.0.1"));

    let rendered = template.render(&version).expect("render");
    let parsed: Value = serde_json::from_str(&rendered).expect("valid JSON");
    assert_eq!(parsed["version"], "1.2.3");
    assert_eq!(parsed["name"], "CommandSage");
}

#[rstest]
fn version_is_added_when_absent(version: ReleaseVersion) {
    let template = ManifestTemplate::parse(template_path(), "{}").expect("valid template");
    let rendered = template.render(&version).expect("render");
    let parsed: Value = serde_json::from_str(&rendered).expect("valid JSON");
    assert_eq!(parsed["version"], "1.2.3");
}

#[rstest]
fn rendering_sorts_keys_for_stable_output(version: ReleaseVersion) {
    let first = ManifestTemplate::parse(template_path(), r#"{"zeta":1,"alpha":2}"#)
        .expect("valid template");
    let second = ManifestTemplate::parse(template_path(), r#"{"alpha":2,"zeta":1}"#)
        .expect("valid template");

    let rendered = first.render(&version).expect("render");
    assert_eq!(rendered, second.render(&version).expect("render"));
    let alpha = rendered.find("\"alpha\"").expect("alpha key");
    let zeta = rendered.find("\"zeta\"").expect("zeta key");
    assert!(alpha < zeta, "keys must be sorted: {rendered}");
}

#[test]
fn exclude_files_are_extracted() {
    let template = ManifestTemplate::parse(
        template_path(),
        r#"{"excludeFiles":["CommandSage/Dev.lua","notes.xml"]}"#,
    )
    .expect("valid template");
    assert_eq!(template.exclude_files(), &["CommandSage/Dev.lua", "notes.xml"]);
}

#[rstest]
#[case::absent(r#"{"version":"1"}"#)]
#[case::string(r#"{"excludeFiles":"Dev.lua"}"#)]
#[case::mixed(r#"{"excludeFiles":["Dev.lua", 3]}"#)]
#[case::null(r#"{"excludeFiles":null}"#)]
fn malformed_or_absent_excludes_default_to_empty(#[case] raw: &str) {
    let template = ManifestTemplate::parse(template_path(), raw).expect("valid template");
    assert!(template.exclude_files().is_empty());
}

#[rstest]
#[case::syntax("{not json")]
#[case::truncated(r#"{"version":"#)]
fn malformed_json_is_rejected(#[case] raw: &str) {
    let err = ManifestTemplate::parse(template_path(), raw).expect_err("must fail");
    assert!(matches!(err, ManifestParseError::Json { .. }));
}

#[rstest]
#[case::array("[]", "an array")]
#[case::string(r#""manifest""#, "a string")]
#[case::null("null", "null")]
fn non_object_templates_are_rejected(#[case] raw: &str, #[case] found: &str) {
    let err = ManifestTemplate::parse(template_path(), raw).expect_err("must fail");
    assert!(
        matches!(err, ManifestParseError::NotAnObject { found: f, .. } if f == found),
        "unexpected error: {err}"
    );
}

#[rstest]
fn load_returns_none_for_missing_template(version: ReleaseVersion) {
    let dir = TempDir::new().expect("temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().join("manifest.template.json"))
        .expect("utf-8 temp path");
    assert!(load(&path, &version).expect("absence is fine").is_none());
}

#[rstest]
fn load_stamps_version_and_returns_excludes(version: ReleaseVersion) {
    let dir = TempDir::new().expect("temp dir");
    let path = write_template(
        &dir,
        r#"{"version":"9.9.9","excludeFiles":["CommandSage/Dev.lua"]}"#,
    );

    let loaded = load(&path, &version)
        .expect("load succeeds")
        .expect("template present");
    assert_eq!(loaded.excludes, vec!["CommandSage/Dev.lua"]);
    let parsed: Value = serde_json::from_str(&loaded.content).expect("valid JSON");
    assert_eq!(parsed["version"], "1.2.3");
    assert_eq!(parsed["excludeFiles"][0], "CommandSage/Dev.lua");
}

#[rstest]
fn load_fails_on_broken_template(version: ReleaseVersion) {
    let dir = TempDir::new().expect("temp dir");
    let path = write_template(&dir, "{ broken");
    let err = load(&path, &version).expect_err("broken template must abort");
    assert!(matches!(err, ManifestParseError::Json { .. }));
    assert!(err.to_string().contains("manifest.template.json"));
}
