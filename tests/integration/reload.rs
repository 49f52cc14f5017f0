//! Development-mode recompilation against real files.

use std::time::{Duration, SystemTime};

use tplserve::core::{DispatchError, SourceIdentity};
use tplserve::request::TemplateRequest;
use tplserve::test_utils::TestSite;

/// Rewrite `path` and push its mtime forward so coarse filesystem clocks
/// still see a change.
fn rewrite(site: &TestSite, path: &str, content: &str, bump: u64) {
    let file = site.write(path, content).unwrap();
    let later = SystemTime::now() + Duration::from_secs(bump);
    std::fs::File::options()
        .write(true)
        .open(&file)
        .unwrap()
        .set_modified(later)
        .unwrap();
}

#[test]
fn test_changed_source_is_recompiled_and_counted() {
    let site = TestSite::new().unwrap();
    site.write("/page.html", "one").unwrap();
    let dispatcher = site.dispatcher(true);
    let runtime = dispatcher.runtime();

    assert_eq!(dispatcher.service(&TemplateRequest::get("/page.html")).unwrap().body, "one");
    runtime.set_reload_count(0);

    rewrite(&site, "/page.html", "two", 10);
    assert_eq!(dispatcher.service(&TemplateRequest::get("/page.html")).unwrap().body, "two");
    rewrite(&site, "/page.html", "three", 20);
    assert_eq!(dispatcher.service(&TemplateRequest::get("/page.html")).unwrap().body, "three");

    // Unchanged: served from the compiled template, no reload.
    assert_eq!(dispatcher.service(&TemplateRequest::get("/page.html")).unwrap().body, "three");

    assert_eq!(runtime.reload_count(), 2);
    let entry = runtime.cache().lookup(&SourceIdentity::parse("/page.html").unwrap()).unwrap();
    assert_eq!(entry.reload_count(), 2);
    assert_eq!(runtime.loaded_count(), 1);
}

#[test]
fn test_production_mode_keeps_first_compilation() {
    let site = TestSite::new().unwrap();
    site.write("/page.html", "one").unwrap();
    let dispatcher = site.dispatcher(false);

    dispatcher.service(&TemplateRequest::get("/page.html")).unwrap();
    rewrite(&site, "/page.html", "two", 10);

    assert_eq!(dispatcher.service(&TemplateRequest::get("/page.html")).unwrap().body, "one");
    assert_eq!(dispatcher.runtime().reload_count(), 0);
}

#[test]
fn test_deleted_source_is_reported_missing() {
    let site = TestSite::new().unwrap();
    site.write("/gone.html", "here").unwrap();
    let dispatcher = site.dispatcher(true);
    dispatcher.service(&TemplateRequest::get("/gone.html")).unwrap();

    site.remove("/gone.html").unwrap();
    let error = dispatcher.service(&TemplateRequest::get("/gone.html")).unwrap_err();
    assert!(matches!(error, DispatchError::SourceNotFound { ref identity } if identity == "/gone.html"));
    assert_eq!(dispatcher.respond(&TemplateRequest::get("/gone.html")).status, 404);
}

#[test]
fn test_mark_for_reload_recompiles_unchanged_source() {
    let site = TestSite::new().unwrap();
    site.write("/page.html", "same").unwrap();
    let dispatcher = site.dispatcher(false);
    dispatcher.service(&TemplateRequest::get("/page.html")).unwrap();

    let entry =
        dispatcher.runtime().cache().lookup(&SourceIdentity::parse("/page.html").unwrap()).unwrap();
    entry.mark_for_reload();
    dispatcher.service(&TemplateRequest::get("/page.html")).unwrap();

    assert_eq!(entry.reload_count(), 1);
    assert_eq!(dispatcher.runtime().reload_count(), 1);
}
