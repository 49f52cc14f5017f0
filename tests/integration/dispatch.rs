//! Dispatch through the real compiler and filesystem store.

use tplserve::constants::{INC_REQUEST_URI, INC_SERVLET_PATH, TEMPLATE_FILE};
use tplserve::core::{DispatchError, SourceIdentity};
use tplserve::request::TemplateRequest;
use tplserve::test_utils::TestSite;

#[test]
fn test_renders_params_attributes_and_headers() {
    let site = TestSite::new().unwrap();
    site.write(
        "/greet.html",
        "{{ request.method }} {{ params.name.0 }} {{ attributes.role }} {{ headers[\"x-user\"] }}",
    )
    .unwrap();
    let dispatcher = site.dispatcher(false);

    let request = TemplateRequest::get("/greet.html?name=Ada")
        .with_method("post")
        .with_attribute("role", "admin")
        .with_header("X-User", "ada");
    let response = dispatcher.service(&request).unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "POST Ada admin ada");
}

#[test]
fn test_precompile_request_compiles_without_rendering() {
    let site = TestSite::new().unwrap();
    // Rendering would fail: `missing` is undefined. Compiling succeeds.
    site.write("/lazy.html", "{{ missing.value }}").unwrap();
    let dispatcher = site.dispatcher(false);

    for uri in ["/lazy.html?jsp_precompile", "/lazy.html?jsp_precompile=true", "/lazy.html?a=1&jsp_precompile=false"] {
        let response = dispatcher.service(&TemplateRequest::get(uri)).unwrap();
        assert_eq!(response.status, 200, "{uri}");
        assert!(response.body.is_empty(), "{uri}");
    }

    let identity = SourceIdentity::parse("/lazy.html").unwrap();
    assert!(dispatcher.runtime().cache().lookup(&identity).unwrap().is_compiled());
    assert_eq!(dispatcher.runtime().loaded_count(), 1);

    let error = dispatcher.service(&TemplateRequest::get("/lazy.html")).unwrap_err();
    assert!(matches!(error, DispatchError::Execution { .. }));
}

#[test]
fn test_malformed_directive_is_400_and_creates_nothing() {
    let site = TestSite::new().unwrap();
    site.write("/a.html", "a").unwrap();
    let dispatcher = site.dispatcher(false);

    let response = dispatcher.respond(&TemplateRequest::get("/a.html?jsp_precompile=yes"));
    assert_eq!(response.status, 400);
    assert_eq!(response.body, "Cannot have request parameter jsp_precompile set to yes");
    assert_eq!(dispatcher.runtime().loaded_count(), 0);
}

#[test]
fn test_missing_source_is_404_and_not_cached() {
    let site = TestSite::new().unwrap();
    let dispatcher = site.dispatcher(false);

    let response = dispatcher.respond(&TemplateRequest::get("/later.html"));
    assert_eq!(response.status, 404);
    assert_eq!(response.body, "/later.html");
    assert_eq!(dispatcher.runtime().loaded_count(), 0);

    // The source appears; the next request finds it.
    site.write("/later.html", "now").unwrap();
    let response = dispatcher.respond(&TemplateRequest::get("/later.html"));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "now");
}

#[test]
fn test_spellings_of_one_path_share_an_entry() {
    let site = TestSite::new().unwrap();
    site.write("/docs/index.html", "docs").unwrap();
    let dispatcher = site.dispatcher(false);

    for uri in ["/docs/index.html", "/docs//index.html", "/docs/./index.html", "/other/../docs/index.html"] {
        assert_eq!(dispatcher.service(&TemplateRequest::get(uri)).unwrap().body, "docs", "{uri}");
    }
    assert_eq!(dispatcher.runtime().loaded_count(), 1);
}

#[test]
fn test_path_escaping_root_is_rejected() {
    let site = TestSite::new().unwrap();
    let dispatcher = site.dispatcher(false);

    let error = dispatcher.service(&TemplateRequest::get("/../secret.html")).unwrap_err();
    assert!(matches!(error, DispatchError::IdentityResolution { .. }));
}

#[test]
fn test_path_info_is_appended_to_servlet_path() {
    let site = TestSite::new().unwrap();
    site.write("/app/view.html", "{{ request.path_info | safe }}").unwrap();
    let dispatcher = site.dispatcher(false);

    let request = TemplateRequest::get("/app/view.html").with_path_info("/app", "/view.html");
    assert_eq!(dispatcher.service(&request).unwrap().body, "/view.html");
}

#[test]
fn test_include_target_is_corrected_from_request_uri() {
    let site = TestSite::new().unwrap();
    site.write("/fragments/nav.html", "nav").unwrap();
    let dispatcher = site.dispatcher(false);

    // A stale include path is extended to the rest of the include request URI.
    let request = TemplateRequest::get("/page.html")
        .with_attribute(INC_SERVLET_PATH, "/fragments")
        .with_attribute(INC_REQUEST_URI, "/ctx/fragments/nav.html");
    assert_eq!(dispatcher.service(&request).unwrap().body, "nav");

    let identity = SourceIdentity::parse("/fragments/nav.html").unwrap();
    assert!(dispatcher.runtime().cache().lookup(&identity).is_some());
}

#[test]
fn test_alias_attribute_wins() {
    let site = TestSite::new().unwrap();
    site.write("/real.html", "real").unwrap();
    let dispatcher = site.dispatcher(false);

    let request = TemplateRequest::get("/virtual/page")
        .with_attribute(TEMPLATE_FILE, "/real.html")
        .with_attribute(INC_SERVLET_PATH, "/ignored.html");
    assert_eq!(dispatcher.service(&request).unwrap().body, "real");
}

#[test]
fn test_compile_error_is_500_and_retried_after_fix() {
    let site = TestSite::new().unwrap();
    site.write("/broken.html", "{% if %}").unwrap();
    let dispatcher = site.dispatcher(true);

    let response = dispatcher.respond(&TemplateRequest::get("/broken.html"));
    assert_eq!(response.status, 500);
    assert!(response.body.starts_with("Failed to compile '/broken.html'"));

    site.write("/broken.html", "fixed").unwrap();
    let response = dispatcher.respond(&TemplateRequest::get("/broken.html"));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "fixed");
}

#[test]
fn test_error_page_renders_server_errors() {
    let site = TestSite::new().unwrap();
    site.write("/broken.html", "{{ nope.nope }}").unwrap();
    site.write("/error.html", "<p>Sorry: {{ error }}</p>").unwrap();
    let dispatcher = site
        .dispatcher(false)
        .with_error_page(SourceIdentity::parse("/error.html").unwrap());

    let response = dispatcher.respond(&TemplateRequest::get("/broken.html"));
    assert_eq!(response.status, 500);
    assert!(response.body.starts_with("<p>Sorry: Failed to execute"));
    assert!(response.body.contains("broken.html"));

    // Client errors never reach the error page.
    let response = dispatcher.respond(&TemplateRequest::get("/absent.html"));
    assert_eq!(response.status, 404);
    assert_eq!(response.body, "/absent.html");
}
