/// Unit tests for provider descriptors

use ferrous_injector::{
    Args, BoxError, Injectable, Injector, Provider, Scope, ScopeKind, ScopeRestriction, Token,
};

struct Mailer;

impl Injectable for Mailer {
    fn construct(_args: Args) -> Result<Self, BoxError> {
        Ok(Mailer)
    }
}

#[test]
fn test_descriptor_shapes() {
    let value = Token::named("Value");
    let factory = Token::named("Factory");
    let lazy = Token::named("Lazy");
    let alias = Token::named("Alias");
    let injector = Injector::builder()
        .provider(Provider::value(value.clone(), 1u8))
        .provider(Provider::factory(factory.clone(), vec![], |_| Ok(2u8)))
        .provider(Provider::async_factory(lazy.clone(), vec![], |_| async { Ok(3u8) }))
        .provider(Provider::class::<Mailer>())
        .provider(Provider::existing(alias.clone(), value.clone()))
        .build()
        .unwrap();

    let descriptors = injector.descriptors();
    let shape = |token: &Token| {
        descriptors
            .iter()
            .find(|d| &d.token == token)
            .map(|d| d.shape)
            .unwrap()
    };
    assert_eq!(shape(&value), "value");
    assert_eq!(shape(&factory), "factory");
    assert_eq!(shape(&lazy), "async factory");
    assert_eq!(shape(&Token::of::<Mailer>()), "class");
    assert_eq!(shape(&alias), "existing");
}

#[test]
fn test_descriptor_flags() {
    let cache = Token::named("Cache");
    let tenant = Token::named("Tenant");
    let plugin = Token::named("Plugin");
    let injector = Injector::builder()
        .provider(Provider::factory(cache.clone(), vec![], |_| Ok(0u8)).singleton())
        .provider(
            Provider::value(tenant.clone(), "acme")
                .parents_only()
                .restrict_scope(ScopeRestriction::Kind(ScopeKind::Named)),
        )
        .provider(Provider::value(plugin.clone(), 1u8).multi())
        .provider(Provider::value(plugin.clone(), 2u8).multi())
        .build()
        .unwrap();

    let descriptors = injector.descriptors();

    let cache = descriptors.iter().find(|d| d.token == cache).unwrap();
    assert!(cache.singleton);
    assert!(!cache.multi);
    assert!(!cache.is_restricted());
    assert_eq!(cache.scope, "root");

    let tenant = descriptors.iter().find(|d| d.token == tenant).unwrap();
    assert!(tenant.parents_only);
    assert!(tenant.is_restricted());
    assert_eq!(
        tenant.restriction,
        Some(ScopeRestriction::Kind(ScopeKind::Named))
    );

    let plugins: Vec<_> = descriptors.iter().filter(|d| d.token == plugin).collect();
    assert_eq!(plugins.len(), 2);
    assert!(plugins.iter().all(|d| d.multi));
    assert_ne!(plugins[0].provider, plugins[1].provider);
}

#[test]
fn test_descriptors_follow_registration_and_shadowing() {
    let port = Token::named("Port");
    let root = Injector::builder().build().unwrap();
    assert!(root.descriptors().iter().all(|d| d.token != port));

    root.register(Provider::value(port.clone(), 80u16)).unwrap();
    let child = root.create_child(Scope::named("request"), vec![]).unwrap();
    let listed: Vec<_> = child
        .descriptors()
        .into_iter()
        .filter(|d| d.token == port)
        .collect();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].scope, "root");
    assert!(!listed[0].shadowed);

    child.register(Provider::value(port.clone(), 8080u16)).unwrap();
    let listed: Vec<_> = child
        .descriptors()
        .into_iter()
        .filter(|d| d.token == port)
        .collect();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].scope, "request");
    assert!(listed[1].shadowed);
}
