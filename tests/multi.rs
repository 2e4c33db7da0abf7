use ferrous_injector::{Arguments, BoxError, DiError, Injector, Provider, ResolveOptions, Token};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

trait Plugin: Send + Sync {
    fn name(&self) -> &str;
}

struct Named(&'static str);

impl Plugin for Named {
    fn name(&self) -> &str {
        self.0
    }
}

fn plugin(name: &'static str) -> Arc<dyn Plugin> {
    Arc::new(Named(name))
}

fn names(plugins: &[Arc<Arc<dyn Plugin>>]) -> Vec<String> {
    plugins.iter().map(|p| p.name().to_string()).collect()
}

#[tokio::test]
async fn test_multi_binding_basics() {
    let plugins: Token<Arc<dyn Plugin>> = Token::new("plugins");
    let app = Injector::create("App", None);
    app.register([
        Provider::value(&plugins, plugin("PluginA")).multi(),
        Provider::value(&plugins, plugin("PluginB")).multi(),
        Provider::value(&plugins, plugin("PluginC")).multi(),
    ])
    .unwrap();

    let first = app.resolve_all(&plugins).await.unwrap();
    assert_eq!(names(&first), ["PluginA", "PluginB", "PluginC"]);

    // Resolving again returns the same instances
    let second = app.resolve_all(&plugins).await.unwrap();
    for (a, b) in first.iter().zip(second.iter()) {
        assert!(Arc::ptr_eq(a, b));
    }

    // resolve returns the first element
    assert_eq!(app.resolve(&plugins).await.unwrap().name(), "PluginA");
}

#[tokio::test]
async fn test_child_values_precede_parent_values() {
    let plugins: Token<Arc<dyn Plugin>> = Token::new("plugins");
    let app = Injector::create("App", None);
    app.register(Provider::value(&plugins, plugin("v1")).multi()).unwrap();

    let request = app.child("Request");
    request
        .register([
            Provider::value(&plugins, plugin("v2")).multi(),
            Provider::value(&plugins, plugin("v3")).multi(),
        ])
        .unwrap();

    let all = request.resolve_all(&plugins).await.unwrap();
    assert_eq!(names(&all), ["v2", "v3", "v1"]);

    // The parent's element was built and cached in the parent
    assert_eq!(names(&app.get_all(&plugins).unwrap()), ["v1"]);
    assert_eq!(names(&request.get_all(&plugins).unwrap()), ["v2", "v3", "v1"]);
}

#[tokio::test]
async fn test_child_without_providers_sees_parent_collection() {
    let plugins: Token<Arc<dyn Plugin>> = Token::new("plugins");
    let app = Injector::create("App", None);
    app.register([
        Provider::value(&plugins, plugin("a")).multi(),
        Provider::value(&plugins, plugin("b")).multi(),
    ])
    .unwrap();

    let leaf = app.child("Request").child("Handler");
    assert_eq!(names(&leaf.resolve_all(&plugins).await.unwrap()), ["a", "b"]);
}

#[tokio::test]
async fn test_late_multi_provider_builds_only_new_one() {
    let built = Arc::new(AtomicUsize::new(0));
    let hooks: Token<usize> = Token::new("hooks");

    let counting = |built: Arc<AtomicUsize>| {
        move |_: Arguments| -> Result<usize, BoxError> { Ok(built.fetch_add(1, Ordering::SeqCst)) }
    };

    let app = Injector::create("App", None);
    app.register([
        Provider::factory_sync(&hooks, vec![], counting(built.clone())).multi(),
        Provider::factory_sync(&hooks, vec![], counting(built.clone())).multi(),
    ])
    .unwrap();

    let before = app.resolve_all(&hooks).await.unwrap();
    assert_eq!(before.len(), 2);
    assert_eq!(built.load(Ordering::SeqCst), 2);

    app.register(Provider::factory_sync(&hooks, vec![], counting(built.clone())).multi())
        .unwrap();
    let after = app.resolve_all(&hooks).await.unwrap();
    assert_eq!(after.len(), 3);
    assert_eq!(built.load(Ordering::SeqCst), 3);
    assert!(Arc::ptr_eq(&before[0], &after[0]));
    assert!(Arc::ptr_eq(&before[1], &after[1]));
    assert_eq!(*after[2], 2);
}

#[tokio::test]
async fn test_failed_multi_element_is_retried_alone() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = attempts.clone();
    let items: Token<u32> = Token::new("items");

    let app = Injector::create("App", None);
    app.register([
        Provider::value(&items, 1u32).multi(),
        Provider::factory_sync(&items, vec![], move |_| {
            if attempts_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("not yet".into())
            } else {
                Ok(2u32)
            }
        })
        .multi(),
    ])
    .unwrap();

    assert!(matches!(
        app.resolve_all(&items).await,
        Err(DiError::Construction { .. })
    ));
    // The first element stays cached
    assert_eq!(app.get_all(&items).unwrap().len(), 1);

    let all: Vec<u32> = app.resolve_all(&items).await.unwrap().iter().map(|v| **v).collect();
    assert_eq!(all, [1, 2]);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_optional_multi_without_providers_is_empty() {
    let nothing: Token<u8> = Token::new("nothing");
    let app = Injector::create("App", None);
    assert!(app
        .resolve_all_with(&nothing, ResolveOptions::optional())
        .await
        .unwrap()
        .is_empty());
    assert!(app.resolve_all(&nothing).await.unwrap_err().is_unresolved());
}
