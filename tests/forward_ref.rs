use async_trait::async_trait;
use ferrous_injector::{
    forward_ref, of, Arguments, BoxError, Construct, Dependency, Injector, MetadataRegistry, Provide, Provider, Token,
};
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static DEREFS: AtomicUsize = AtomicUsize::new(0);

// Metadata names this token only through a forward reference.
static LATER: Lazy<Token<String>> = Lazy::new(|| Token::new("later"));

struct Consumer {
    value: Arc<String>,
}

#[async_trait]
impl Construct for Consumer {
    async fn construct(args: Arguments) -> Result<Self, BoxError> {
        Ok(Consumer {
            value: args.required::<String>(0)?,
        })
    }
}

#[tokio::test]
async fn test_forward_ref_in_metadata_is_lazy() {
    MetadataRegistry::global()
        .describe::<Consumer>()
        .inject(
            0,
            forward_ref(|| {
                DEREFS.fetch_add(1, Ordering::SeqCst);
                LATER.key()
            }),
        )
        .register();

    let app = Injector::create("App", None);
    app.register(Provider::constructible::<Consumer>()).unwrap();
    let before = DEREFS.load(Ordering::SeqCst);

    app.register(Provider::value(&*LATER, "resolved late".to_string())).unwrap();
    let consumer = app.resolve(&of::<Consumer>()).await.unwrap();
    assert_eq!(*consumer.value, "resolved late");
    assert!(DEREFS.load(Ordering::SeqCst) > before);
}

#[tokio::test]
async fn test_forward_ref_dependency_not_called_at_registration() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let target: Arc<once_cell::sync::OnceCell<Token<u32>>> = Arc::new(once_cell::sync::OnceCell::new());
    let target_clone = target.clone();
    let doubled: Token<u32> = Token::new("doubled");

    let app = Injector::create("App", None);
    app.register(Provider::factory_sync(
        &doubled,
        vec![Dependency::on(forward_ref(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            target_clone.get().map(|t| t.key()).unwrap_or_else(|| of::<u32>().key())
        }))],
        |args| Ok(*args.required::<u32>(0)? * 2),
    ))
    .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // The token the reference points to is created after registration
    let base: Token<u32> = Token::new("base");
    target.set(base.clone()).unwrap();
    app.register(Provider::value(&base, 21u32)).unwrap();

    assert_eq!(*app.resolve(&doubled).await.unwrap(), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
