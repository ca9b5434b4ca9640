use async_trait::async_trait;
use ferrous_injector::{
    DefaultGenerator, DiResult, Dependency, GenerationContext, Generator, Injector, Instance,
    Provider, Token,
};
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

static NAME: Lazy<Token> = Lazy::new(|| Token::named("Name"));
static GREETING: Lazy<Token> = Lazy::new(|| Token::named("Greeting"));

/// Wraps the default generator and records every token it is asked for.
struct Recording {
    inner: DefaultGenerator,
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Generator for Recording {
    async fn generate(&self, cx: GenerationContext) -> DiResult<Option<Instance>> {
        self.seen.lock().unwrap().push(cx.token().to_string());
        self.inner.generate(cx).await
    }
}

/// Produces greetings itself and leaves every other token to the default generator.
struct Greeter;

#[async_trait]
impl Generator for Greeter {
    async fn generate(&self, cx: GenerationContext) -> DiResult<Option<Instance>> {
        if cx.token() != &*GREETING {
            return DefaultGenerator.generate(cx).await;
        }
        let name = match cx.inject(&NAME, false).await? {
            Some(instance) => instance.downcast::<String>()?,
            None => return Ok(None),
        };
        Ok(Some(Instance::single(format!("custom hello {name}"))))
    }
}

#[tokio::test]
async fn custom_generator_sees_every_construction() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let injector = Injector::builder()
        .provider(Provider::value(NAME.clone(), "ada".to_string()))
        .provider(Provider::factory(
            GREETING.clone(),
            vec![Dependency::new(&*NAME)],
            |args| Ok(format!("hello {}", args.get::<String>(0)?)),
        ))
        .generator(Recording {
            inner: DefaultGenerator,
            seen: seen.clone(),
        })
        .build()
        .unwrap();

    assert_eq!(*injector.inject::<String>(&GREETING).await.unwrap(), "hello ada");
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, vec!["Greeting", "Name"]);
}

#[tokio::test]
async fn custom_generator_can_replace_construction() {
    let injector = Injector::builder()
        .provider(Provider::value(NAME.clone(), "ada".to_string()))
        .provider(Provider::factory(GREETING.clone(), vec![], |_| Ok("unused".to_string())))
        .generator(Greeter)
        .build()
        .unwrap();

    assert_eq!(
        *injector.inject::<String>(&GREETING).await.unwrap(),
        "custom hello ada"
    );
    assert_eq!(*injector.inject::<String>(&NAME).await.unwrap(), "ada");
}

#[tokio::test]
async fn construction_waits_for_a_deferred_generator() {
    let (tx, rx) = tokio::sync::oneshot::channel::<Arc<dyn Generator>>();
    let built = Arc::new(AtomicUsize::new(0));
    let token = Token::named("Service");
    let counter = built.clone();

    let injector = Injector::builder()
        .provider(Provider::factory(token.clone(), vec![], move |_| {
            Ok(counter.fetch_add(1, Ordering::SeqCst))
        }))
        .generator_future(async move {
            rx.await
                .unwrap_or_else(|_| Arc::new(DefaultGenerator) as Arc<dyn Generator>)
        })
        .build()
        .unwrap();

    // Lookups do not wait for the generator.
    assert!(!injector.is_ready());
    assert!(injector.can_resolve(&token, vec![]));

    let pending = {
        let injector = injector.clone();
        let token = token.clone();
        tokio::spawn(async move { injector.inject::<usize>(&token).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!pending.is_finished());
    assert_eq!(built.load(Ordering::SeqCst), 0);

    assert!(tx.send(Arc::new(DefaultGenerator)).is_ok());
    assert_eq!(*pending.await.unwrap().unwrap(), 0);
    injector.ready().await;
    assert!(injector.is_ready());
}

#[tokio::test]
async fn default_generator_is_ready_immediately() {
    let injector = Injector::builder().build().unwrap();
    injector.ready().await;
    assert!(injector.is_ready());
}
