//! Recompilation under load.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tplserve::cache::WrapperOptions;
use tplserve::dispatch::Dispatcher;
use tplserve::request::TemplateRequest;
use tplserve::runtime::RuntimeContext;
use tplserve::test_utils::{CountingCompiler, MemorySourceStore, init_test_logging};

/// Readers never see a failure while a writer keeps changing the source.
#[test]
fn test_reloads_while_serving() {
    init_test_logging(None);

    let compiler = Arc::new(CountingCompiler::new());
    let store = Arc::new(MemorySourceStore::new().with("/live.html", "v0"));
    let runtime = RuntimeContext::new(
        compiler.clone(),
        store.clone(),
        WrapperOptions {
            development: true,
            check_interval: Duration::ZERO,
        },
    );
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(runtime)));
    dispatcher.service(&TemplateRequest::get("/live.html")).unwrap();
    dispatcher.runtime().set_reload_count(0);

    let stop = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..8)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                let mut served = 0usize;
                while !stop.load(Ordering::Relaxed) {
                    let body = dispatcher.service(&TemplateRequest::get("/live.html")).unwrap().body;
                    assert!(body.starts_with('v'), "{body}");
                    served += 1;
                }
                served
            })
        })
        .collect();

    let versions = 200;
    for v in 1..=versions {
        store.insert("/live.html", &format!("v{v}"));
        std::thread::sleep(Duration::from_micros(200));
    }
    stop.store(true, Ordering::Relaxed);
    let served: usize = readers.into_iter().map(|r| r.join().unwrap()).sum();

    // Let the final version be picked up.
    let last = dispatcher.service(&TemplateRequest::get("/live.html")).unwrap();
    assert_eq!(last.body, format!("v{versions}"));

    let reloads = dispatcher.runtime().reload_count();
    assert!((1..=versions).contains(&reloads), "{reloads}");
    assert_eq!(compiler.compiles(), reloads + 1);
    // Every replaced artifact was released.
    assert_eq!(compiler.releases(), reloads);
    println!("served {served} requests across {reloads} reloads");
}
