use ferrous_injector::{BoxError, DiError, Dependency, Injector, Provider, Scope, Token};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn delayed(token: &Token, label: &'static str, delay_ms: u64) -> Provider {
    Provider::async_factory(token.clone(), vec![], move |_| async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Ok(label.to_string())
    })
    .multi()
}

#[tokio::test]
async fn multi_members_come_back_in_registration_order() {
    let plugins = Token::named("Plugins");
    let injector = Injector::builder()
        .provider(delayed(&plugins, "auth", 30))
        .provider(delayed(&plugins, "cache", 1))
        .provider(delayed(&plugins, "metrics", 15))
        .build()
        .unwrap();

    let names = injector.inject_all::<String>(&plugins).await.unwrap();
    let names: Vec<&str> = names.iter().map(|name| name.as_str()).collect();
    assert_eq!(names, vec!["auth", "cache", "metrics"]);
}

#[tokio::test]
async fn multi_members_are_built_concurrently() {
    let plugins = Token::named("Plugins");
    let injector = Injector::builder()
        .provider(delayed(&plugins, "a", 50))
        .provider(delayed(&plugins, "b", 50))
        .provider(delayed(&plugins, "c", 50))
        .provider(delayed(&plugins, "d", 50))
        .build()
        .unwrap();

    let started = std::time::Instant::now();
    let names = injector.inject_all::<String>(&plugins).await.unwrap();
    assert_eq!(names.len(), 4);
    assert!(started.elapsed() < Duration::from_millis(180));
}

#[tokio::test]
async fn multi_member_singletons_are_cached_individually() {
    let built = Arc::new(AtomicUsize::new(0));
    let handlers = Token::named("Handlers");
    let counting = |name: &'static str| {
        let built = built.clone();
        Provider::factory(handlers.clone(), vec![], move |_| {
            built.fetch_add(1, Ordering::SeqCst);
            Ok(name)
        })
        .multi()
    };
    let injector = Injector::builder()
        .provider(counting("first").singleton())
        .provider(counting("second"))
        .build()
        .unwrap();

    let a = injector.inject_all::<&'static str>(&handlers).await.unwrap();
    let b = injector.inject_all::<&'static str>(&handlers).await.unwrap();

    assert!(Arc::ptr_eq(&a[0], &b[0]));
    assert!(!Arc::ptr_eq(&a[1], &b[1]));
    // One singleton build plus two builds of the other member.
    assert_eq!(built.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn multi_members_resolve_their_own_dependencies() {
    let prefix = Token::named("Prefix");
    let routes = Token::named("Routes");
    let route = |path: &'static str| {
        Provider::factory(routes.clone(), vec![Dependency::new(&prefix)], move |args| {
            Ok(format!("{}{}", args.get::<String>(0)?, path))
        })
        .multi()
    };
    let injector = Injector::builder()
        .provider(Provider::value(prefix.clone(), "/api".to_string()))
        .provider(route("/users"))
        .provider(route("/orders"))
        .build()
        .unwrap();

    let routes = injector.inject_all::<String>(&routes).await.unwrap();
    assert_eq!(*routes[0], "/api/users");
    assert_eq!(*routes[1], "/api/orders");
}

#[tokio::test]
async fn child_multi_entry_replaces_the_parent_entry() {
    let hooks = Token::named("Hooks");
    let root = Injector::builder()
        .provider(Provider::value(hooks.clone(), "root-a").multi())
        .provider(Provider::value(hooks.clone(), "root-b").multi())
        .build()
        .unwrap();
    let child = root
        .create_child(
            Scope::named("child"),
            vec![Provider::value(hooks.clone(), "child").multi()],
        )
        .unwrap();

    assert_eq!(root.inject_all::<&str>(&hooks).await.unwrap().len(), 2);
    let from_child = child.inject_all::<&str>(&hooks).await.unwrap();
    assert_eq!(from_child.len(), 1);
    assert_eq!(*from_child[0], "child");
}

#[tokio::test]
async fn unregistered_multi_token_is_empty() {
    let injector = Injector::builder().build().unwrap();
    let all = injector.inject_all::<String>(&Token::named("Nothing")).await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn single_and_multi_registrations_conflict() {
    let token = Token::named("Mixed");
    let injector = Injector::builder()
        .provider(Provider::value(token.clone(), 1u8).multi())
        .build()
        .unwrap();

    let err = injector.register(Provider::value(token.clone(), 2u8)).unwrap_err();
    assert!(matches!(err, DiError::ConflictingOptions { .. }));

    let err = Injector::builder()
        .provider(Provider::value(token.clone(), 1u8))
        .provider(Provider::value(token.clone(), 2u8).multi())
        .build()
        .unwrap_err();
    assert!(matches!(err, DiError::ConflictingOptions { .. }));
}

#[tokio::test]
async fn failing_member_fails_the_whole_collection() {
    let plugins = Token::named("Plugins");
    let injector = Injector::builder()
        .provider(delayed(&plugins, "ok", 1))
        .provider(
            Provider::factory(plugins.clone(), vec![], |_| -> Result<String, BoxError> {
                Err("broken plugin".into())
            })
            .multi(),
        )
        .build()
        .unwrap();

    let err = injector.inject_all::<String>(&plugins).await.unwrap_err();
    assert!(matches!(err, DiError::Construction { ref message, .. } if message == "broken plugin"));
}
