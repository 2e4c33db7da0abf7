use async_trait::async_trait;
use ferrous_injector::{
    key_of_type, of, Arguments, BoxError, Construct, Dependency, DiError, EngineConfig, Injector, Key,
    MetadataRegistry, Provider, RootInjector, Token,
};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

const MAX_DEPTH: usize = 8;

fn root() -> &'static Injector {
    static ROOT: OnceLock<Injector> = OnceLock::new();
    ROOT.get_or_init(|| {
        RootInjector::builder()
            .metadata(Arc::new(MetadataRegistry::new()))
            .config(EngineConfig {
                max_depth: MAX_DEPTH,
                ..EngineConfig::default()
            })
            .install()
            .unwrap()
    })
}

/// Helper: assert that `result` failed with a cycle whose path contains `expected`.
fn assert_circular<T>(result: Result<T, DiError>, expected: &[&str]) {
    match result {
        Err(DiError::Circular(path)) => {
            assert_eq!(path.first(), path.last(), "cycle must start and end on the same frame");
            for element in expected {
                assert!(
                    path.iter().any(|p| p.contains(element)),
                    "path missing element '{}'; got: {:?}",
                    element,
                    path
                );
            }
        }
        Err(other) => panic!("expected circular error, got {other}"),
        Ok(_) => panic!("expected circular error, got a value"),
    }
}

struct A;
struct B;

#[async_trait]
impl Construct for A {
    fn parameters() -> Vec<Option<Key>> {
        vec![Some(key_of_type::<B>())]
    }

    async fn construct(_args: Arguments) -> Result<Self, BoxError> {
        Ok(A)
    }
}

#[async_trait]
impl Construct for B {
    fn parameters() -> Vec<Option<Key>> {
        vec![Some(key_of_type::<A>())]
    }

    async fn construct(_args: Arguments) -> Result<Self, BoxError> {
        Ok(B)
    }
}

#[tokio::test]
async fn test_two_class_cycle() {
    let app = Injector::create("App", Some(root()));
    app.register([Provider::constructible::<A>(), Provider::constructible::<B>()])
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), app.resolve(&of::<A>()))
        .await
        .expect("cycle must not hang");
    assert_circular(result, &["A", "B"]);

    // Nothing was cached
    assert!(app.get_optional(&of::<A>()).unwrap().is_none());
}

#[tokio::test]
async fn test_factory_self_cycle() {
    let selfish: Token<u8> = Token::new("selfish");
    let app = Injector::create("App", Some(root()));
    app.register(Provider::factory_sync(&selfish, vec![Dependency::on(&selfish)], |args| {
        Ok(*args.required::<u8>(0)?)
    }))
    .unwrap();

    assert_circular(app.resolve(&selfish).await, &["Token(selfish)"]);
}

#[tokio::test]
async fn test_cycle_across_nodes() {
    let ping: Token<u8> = Token::new("ping");
    let pong: Token<u8> = Token::new("pong");

    let app = Injector::create("App", Some(root()));
    app.register(Provider::factory_sync(&ping, vec![Dependency::on(&pong)], |_| Ok(1)))
        .unwrap();
    let request = app.child("Request");
    request
        .register(Provider::factory_sync(&pong, vec![Dependency::on(&ping)], |_| Ok(2)))
        .unwrap();

    // pong@Request -> ping@App -> pong is not visible from App
    let err = request.resolve(&pong).await.unwrap_err();
    assert!(err.is_unresolved(), "unexpected error {err}");

    // Registering pong on App closes the loop there
    app.register(Provider::factory_sync(&pong, vec![Dependency::on(&ping)], |_| Ok(3)))
        .unwrap();
    assert_circular(app.resolve(&ping).await, &["Token(ping)", "Token(pong)"]);
}

#[tokio::test]
async fn test_depth_exceeded() {
    let tokens: Vec<Token<usize>> = (0..MAX_DEPTH + 2).map(|i| Token::new(format!("level {}", i))).collect();
    let app = Injector::create("App", Some(root()));

    let last = tokens.len() - 1;
    app.register(Provider::value(&tokens[last], 0usize)).unwrap();
    for i in 0..last {
        app.register(Provider::factory_sync(
            &tokens[i],
            vec![Dependency::on(&tokens[i + 1])],
            |args| Ok(*args.required::<usize>(0)? + 1),
        ))
        .unwrap();
    }

    assert!(matches!(
        app.resolve(&tokens[0]).await,
        Err(DiError::DepthExceeded(depth)) if depth == MAX_DEPTH
    ));

    // A shorter chain from the middle fits
    assert_eq!(*app.resolve(&tokens[4]).await.unwrap(), last - 4);
}
