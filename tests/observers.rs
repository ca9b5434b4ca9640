use ferrous_injector::{
    BoxError, DiError, DiObserver, Injector, LoggingObserver, MetricsObserver, Provider, Scope,
    Token,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl EventLog {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl DiObserver for EventLog {
    fn resolving(&self, token: &Token) {
        self.events.lock().unwrap().push(format!("resolving {token}"));
    }

    fn resolved(&self, token: &Token, _duration: Duration) {
        self.events.lock().unwrap().push(format!("resolved {token}"));
    }

    fn missing(&self, token: &Token, ancestry: &[String]) {
        self.events
            .lock()
            .unwrap()
            .push(format!("missing {token} in {}", ancestry.join("/")));
    }

    fn construction_failed(&self, token: &Token, _error: &DiError) {
        self.events.lock().unwrap().push(format!("failed {token}"));
    }

    fn disposed(&self, scope: &Scope, reason: &str) {
        self.events.lock().unwrap().push(format!("disposed {scope}: {reason}"));
    }
}

#[tokio::test]
async fn observer_sees_the_resolution_lifecycle() {
    let log = Arc::new(EventLog::default());
    let port = Token::named("Port");
    let broken = Token::named("Broken");
    let root = Injector::builder()
        .provider(Provider::value(port.clone(), 80u16))
        .provider(Provider::factory(broken.clone(), vec![], |_| -> Result<u8, BoxError> {
            Err("boom".into())
        }))
        .observer(log.clone())
        .build()
        .unwrap();

    root.inject::<u16>(&port).await.unwrap();
    assert_eq!(log.events(), vec!["resolving Port", "resolved Port"]);

    let child = root.create_child(Scope::named("request"), vec![]).unwrap();
    child.inject::<u8>(&Token::named("Ghost")).await.unwrap_err();
    assert!(log
        .events()
        .contains(&"missing Ghost in request/root/ambient".to_string()));

    child.inject::<u8>(&broken).await.unwrap_err();
    assert!(log.events().contains(&"failed Broken".to_string()));

    child.dispose("request finished").await;
    assert_eq!(
        log.events().last().map(String::as_str),
        Some("disposed request: request finished")
    );
}

#[tokio::test]
async fn metrics_observer_counts_events() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let metrics = Arc::new(MetricsObserver::new());
    let port = Token::named("Port");
    let root = Injector::builder()
        .provider(Provider::value(port.clone(), 80u16))
        .observer(metrics.clone())
        .observer(Arc::new(LoggingObserver::with_prefix("test")))
        .build()
        .unwrap();

    for _ in 0..3 {
        root.inject::<u16>(&port).await.unwrap();
    }
    root.inject_optional::<u16>(&Token::named("Absent")).await.unwrap();
    root.inject::<u16>(&Token::named("Absent")).await.unwrap_err();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.resolving, 5);
    assert_eq!(snapshot.resolved, 3);
    assert_eq!(snapshot.missing, 1);
    assert_eq!(snapshot.failed, 0);

    let child = root.create_child(Scope::named("job"), vec![]).unwrap();
    child.dispose("done").await;
    assert_eq!(metrics.snapshot().disposed, 1);
}
