//! Runtime teardown.

use std::sync::Arc;

use tplserve::core::DispatchError;
use tplserve::request::TemplateRequest;
use tplserve::runtime::TeardownReport;
use tplserve::test_utils::TestSite;

#[test]
fn test_teardown_releases_and_refuses_new_requests() {
    let site = TestSite::new().unwrap();
    site.write("/a.html", "a").unwrap();
    site.write("/b.html", "b").unwrap();
    let dispatcher = site.dispatcher(false);

    dispatcher.service(&TemplateRequest::get("/a.html")).unwrap();
    dispatcher.service(&TemplateRequest::get("/b.html?jsp_precompile")).unwrap();
    assert_eq!(dispatcher.runtime().loaded_count(), 2);

    let report = dispatcher.runtime().teardown();
    assert_eq!(report, TeardownReport { released: 2, failed: 0 });
    assert_eq!(dispatcher.runtime().loaded_count(), 0);

    let error = dispatcher.service(&TemplateRequest::get("/a.html")).unwrap_err();
    assert!(matches!(error, DispatchError::RuntimeShutDown));
    assert_eq!(dispatcher.respond(&TemplateRequest::get("/a.html")).status, 503);

    assert_eq!(dispatcher.runtime().teardown(), TeardownReport::default());
}

#[test]
fn test_teardown_with_requests_in_flight() {
    let site = TestSite::new().unwrap();
    for i in 0..8 {
        site.write(&format!("/p{i}.html"), &format!("page {i}")).unwrap();
    }
    let dispatcher = Arc::new(site.dispatcher(false));

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    let response = dispatcher.respond(&TemplateRequest::get(&format!("/p{i}.html")));
                    // Either served or refused after shutdown; never anything else.
                    assert!(response.status == 200 || response.status == 503, "{}", response.status);
                }
            })
        })
        .collect();

    dispatcher.runtime().teardown();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(dispatcher.runtime().loaded_count(), 0);
}
