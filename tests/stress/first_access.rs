//! Concurrent first access to cold identities.

use std::sync::{Arc, Barrier};
use std::time::{Duration, Instant};

use tplserve::cache::WrapperOptions;
use tplserve::dispatch::Dispatcher;
use tplserve::request::TemplateRequest;
use tplserve::runtime::RuntimeContext;
use tplserve::test_utils::{CountingCompiler, MemorySourceStore, TestSite, init_test_logging};

const THREADS: usize = 32;
const TEMPLATES: usize = 200;

fn dispatcher(compiler: Arc<CountingCompiler>, store: MemorySourceStore) -> Arc<Dispatcher> {
    let runtime = RuntimeContext::new(
        compiler,
        Arc::new(store),
        WrapperOptions {
            development: false,
            check_interval: Duration::ZERO,
        },
    );
    Arc::new(Dispatcher::new(Arc::new(runtime)))
}

/// Every thread requests every identity, starting at different offsets.
#[test]
fn test_every_identity_compiles_exactly_once() {
    init_test_logging(None);

    let store = MemorySourceStore::new();
    for i in 0..TEMPLATES {
        store.insert(&format!("/t{i}.html"), &format!("template {i}"));
    }
    let compiler = Arc::new(CountingCompiler::new().with_delay(Duration::from_millis(1)));
    let dispatcher = dispatcher(Arc::clone(&compiler), store);
    let barrier = Arc::new(Barrier::new(THREADS));

    let start = Instant::now();
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let dispatcher = Arc::clone(&dispatcher);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                for k in 0..TEMPLATES {
                    let i = (k + t * 7) % TEMPLATES;
                    let response = dispatcher.service(&TemplateRequest::get(&format!("/t{i}.html"))).unwrap();
                    assert_eq!(response.body, format!("template {i}"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    let elapsed = start.elapsed();

    assert_eq!(compiler.compiles(), TEMPLATES);
    assert_eq!(compiler.executions(), THREADS * TEMPLATES);
    assert_eq!(dispatcher.runtime().loaded_count(), TEMPLATES);
    assert_eq!(dispatcher.runtime().reload_count(), 0);
    println!(
        "{} requests over {} templates in {:?} ({:.0} req/s)",
        THREADS * TEMPLATES,
        TEMPLATES,
        elapsed,
        (THREADS * TEMPLATES) as f64 / elapsed.as_secs_f64()
    );
}

/// Precompile and render requests racing on one cold identity.
#[test]
fn test_mixed_precompile_and_render_race() {
    init_test_logging(None);

    let compiler = Arc::new(CountingCompiler::new().with_delay(Duration::from_millis(25)));
    let dispatcher = dispatcher(Arc::clone(&compiler), MemorySourceStore::new().with("/hot.html", "hot"));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let dispatcher = Arc::clone(&dispatcher);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let uri = if t % 2 == 0 { "/hot.html?jsp_precompile" } else { "/hot.html" };
                barrier.wait();
                dispatcher.service(&TemplateRequest::get(uri)).unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().status, 200);
    }

    assert_eq!(compiler.compiles(), 1);
    assert_eq!(compiler.executions(), THREADS / 2);
}

/// Missing sources under contention are never cached.
#[test]
fn test_missing_sources_under_contention() {
    init_test_logging(None);

    let dispatcher = dispatcher(Arc::new(CountingCompiler::new()), MemorySourceStore::new());
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let dispatcher = Arc::clone(&dispatcher);
            std::thread::spawn(move || {
                for i in 0..100 {
                    let response = dispatcher.respond(&TemplateRequest::get(&format!("/missing{}.html", (i + t) % 10)));
                    assert_eq!(response.status, 404);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(dispatcher.runtime().loaded_count(), 0);
}

/// The real Tera stack under the same access pattern.
#[test]
fn test_tera_site_concurrent_first_access() {
    let site = TestSite::new().unwrap();
    for i in 0..50 {
        site.write(&format!("/section{}/page{i}.html", i % 5), "{{ request.identity }}").unwrap();
    }
    let dispatcher = Arc::new(site.dispatcher(false));
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                for i in 0..50 {
                    let path = format!("/section{}/page{i}.html", i % 5);
                    let response = dispatcher.service(&TemplateRequest::get(&path)).unwrap();
                    assert!(response.body.ends_with(&format!("page{i}.html")));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(dispatcher.runtime().loaded_count(), 50);
}
