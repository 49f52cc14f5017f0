//! The `tplserve` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tplserve::test_utils::TestSite;

/// A command isolated from any config file in the user's home.
fn tplserve(site: &TestSite) -> Command {
    let mut cmd = Command::cargo_bin("tplserve").unwrap();
    cmd.arg("--config").arg(site.temp_dir.path().join("no-config.toml"));
    cmd
}

#[test]
fn test_render_prints_body() {
    let site = TestSite::new().unwrap();
    site.write("/hello.tpl", "Hello, {{ params.name.0 }}!").unwrap();

    tplserve(&site)
        .args(["render", "/hello.tpl?name=CLI", "--root"])
        .arg(site.root())
        .assert()
        .success()
        .stdout("Hello, CLI!");
}

#[test]
fn test_render_alias_attribute() {
    let site = TestSite::new().unwrap();
    site.write("/real.tpl", "{{ request.uri }}").unwrap();

    tplserve(&site)
        .args(["render", "/virtual", "--attr", "template.file=/real.tpl", "--root"])
        .arg(site.root())
        .assert()
        .success()
        .stdout("/virtual");
}

#[test]
fn test_render_missing_template_fails() {
    let site = TestSite::new().unwrap();

    tplserve(&site)
        .args(["render", "/missing.html", "--root"])
        .arg(site.root())
        .assert()
        .failure()
        .stderr(predicate::str::contains("/missing.html"))
        .stderr(predicate::str::contains("suggestion"));
}

#[test]
fn test_render_malformed_directive_fails() {
    let site = TestSite::new().unwrap();
    site.write("/a.html", "a").unwrap();

    tplserve(&site)
        .args(["render", "/a.html?jsp_precompile=often", "--root"])
        .arg(site.root())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot have request parameter jsp_precompile set to often"));
}

#[test]
fn test_precompile_reports_counts() {
    let site = TestSite::new().unwrap();
    site.write("/index.html", "{{ params.q.0 }}").unwrap();
    site.write("/blog/post.tpl", "post").unwrap();
    site.write("/style.css", "body {}").unwrap();

    tplserve(&site)
        .args(["precompile", "--jobs", "2", "--root"])
        .arg(site.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 template(s) compiled, 0 failed"));
}

#[test]
fn test_precompile_fails_on_broken_template() {
    let site = TestSite::new().unwrap();
    site.write("/ok.html", "ok").unwrap();
    site.write("/broken.html", "{% for %}").unwrap();

    tplserve(&site)
        .args(["precompile", "--root"])
        .arg(site.root())
        .assert()
        .failure()
        .stdout(predicate::str::contains("1 template(s) compiled, 1 failed"))
        .stderr(predicate::str::contains("/broken.html"));
}

#[test]
fn test_config_file_supplies_root_and_patterns() {
    let site = TestSite::new().unwrap();
    site.write("/page.j2", "j2").unwrap();
    site.write("/page.html", "html").unwrap();
    let config = site.temp_dir.path().join("tplserve.toml");
    std::fs::write(
        &config,
        format!("root = {:?}\ntemplates = [\"**/*.j2\"]\n", site.root().display().to_string()),
    )
    .unwrap();

    Command::cargo_bin("tplserve")
        .unwrap()
        .args(["stats", "--format", "json", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"/page.j2\""))
        .stdout(predicate::str::contains("/page.html").not());
}

#[test]
fn test_invalid_config_is_reported() {
    let site = TestSite::new().unwrap();
    let config = site.temp_dir.path().join("bad.toml");
    std::fs::write(&config, "check_interval_secs = \"soon\"\n").unwrap();

    Command::cargo_bin("tplserve")
        .unwrap()
        .args(["stats", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}
