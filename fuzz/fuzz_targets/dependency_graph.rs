#![no_main]

use ferrous_injector::{DiError, Dependency, Injector, Provider, Token};
use libfuzzer_sys::fuzz_target;

const NODES: usize = 8;

// Builds a random dependency graph. Every resolution either succeeds or
// reports the cycle; it never panics or hangs.
fuzz_target!(|data: &[u8]| {
    let rt = match tokio::runtime::Builder::new_current_thread().build() {
        Ok(rt) => rt,
        Err(_) => return,
    };
    let tokens: Vec<Token> = (0..NODES).map(|i| Token::named(format!("N{i}"))).collect();

    let providers: Vec<Provider> = tokens
        .iter()
        .enumerate()
        .map(|(i, token)| {
            let edges = data.get(i).copied().unwrap_or(0);
            let deps: Vec<Dependency> = (0..NODES)
                .filter(|bit| edges & (1 << bit) != 0)
                .map(|bit| Dependency::new(&tokens[bit]))
                .collect();
            let provider = Provider::factory(token.clone(), deps, |_| Ok(()));
            if data.get(NODES + i).is_some_and(|flag| flag & 1 == 1) {
                provider.singleton()
            } else {
                provider
            }
        })
        .collect();
    let injector = match Injector::builder().providers(providers).build() {
        Ok(injector) => injector,
        Err(_) => return,
    };

    let check = |result: Result<_, DiError>| match result {
        Ok(_) | Err(DiError::Circular(_)) | Err(DiError::DepthExceeded(_)) => {}
        Err(other) => panic!("unexpected error: {other}"),
    };

    rt.block_on(async {
        // All tokens at once, so singleton builds overlap.
        let all = futures::future::join_all(tokens.iter().map(|token| injector.inject::<()>(token))).await;
        all.into_iter().for_each(check);

        for token in &tokens {
            check(injector.inject::<()>(token).await);
        }
    });
});
