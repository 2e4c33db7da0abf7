//! Concurrent access tests
//!
//! First resolutions racing on the same identifier build once, and the
//! hierarchy stays consistent when many tasks resolve through it.

use async_trait::async_trait;
use ferrous_injector::{of, Arguments, BoxError, Construct, Injector, Provider, Token};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

static SLOW_BUILDS: AtomicUsize = AtomicUsize::new(0);

struct SlowService {
    id: usize,
}

#[async_trait]
impl Construct for SlowService {
    async fn construct(_args: Arguments) -> Result<Self, BoxError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(SlowService {
            id: SLOW_BUILDS.fetch_add(1, Ordering::SeqCst),
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_resolution_builds_once() {
    let app = Injector::create("App", None);
    app.register(Provider::constructible::<SlowService>()).unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let node = if i % 2 == 0 { app.clone() } else { app.child(format!("Request {}", i)) };
        handles.push(tokio::spawn(async move { node.resolve(&of::<SlowService>()).await }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(SLOW_BUILDS.load(Ordering::SeqCst), 1);
    for service in &results {
        assert!(Arc::ptr_eq(service, &results[0]));
        assert_eq!(service.id, 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_multi_collection_is_complete() {
    let builds = Arc::new(AtomicUsize::new(0));
    let handlers: Token<usize> = Token::new("handlers");

    let app = Injector::create("App", None);
    for n in 0..8usize {
        let builds = builds.clone();
        app.register(
            Provider::factory(&handlers, vec![], move |_| {
                let builds = builds.clone();
                async move {
                    tokio::task::yield_now().await;
                    builds.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, BoxError>(n)
                }
            })
            .multi(),
        )
        .unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        let handlers = handlers.clone();
        handles.push(tokio::spawn(async move { app.resolve_all(&handlers).await }));
    }
    for handle in handles {
        let values: Vec<usize> = handle.await.unwrap().unwrap().iter().map(|v| **v).collect();
        assert_eq!(values, (0..8).collect::<Vec<_>>());
    }
    assert_eq!(builds.load(Ordering::SeqCst), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_identifiers_do_not_block_each_other() {
    let gate = Arc::new(tokio::sync::Notify::new());
    let blocked: Token<u8> = Token::new("blocked");
    let free: Token<u8> = Token::new("free");

    let app = Injector::create("App", None);
    let waiter = gate.clone();
    app.register([
        Provider::factory(&blocked, vec![], move |_| {
            let waiter = waiter.clone();
            async move {
                waiter.notified().await;
                Ok::<_, BoxError>(1u8)
            }
        }),
        Provider::value(&free, 2u8),
    ])
    .unwrap();

    let pending = {
        let app = app.clone();
        let blocked = blocked.clone();
        tokio::spawn(async move { app.resolve(&blocked).await })
    };

    let value = tokio::time::timeout(Duration::from_secs(5), app.resolve(&free))
        .await
        .expect("unrelated identifier must not wait")
        .unwrap();
    assert_eq!(*value, 2);

    gate.notify_one();
    assert_eq!(*pending.await.unwrap().unwrap(), 1);
}
