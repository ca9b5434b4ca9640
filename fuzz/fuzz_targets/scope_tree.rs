#![no_main]

use ferrous_injector::{DiError, Injector, Provider, Scope, Token};
use libfuzzer_sys::fuzz_target;

const TOKENS: usize = 4;

// Each pair of bytes drives one operation against a scope in the tree.
fuzz_target!(|data: &[u8]| {
    let rt = match tokio::runtime::Builder::new_current_thread().build() {
        Ok(rt) => rt,
        Err(_) => return,
    };
    let tokens: Vec<Token> = (0..TOKENS).map(|i| Token::named(format!("T{i}"))).collect();
    let root = match Injector::builder().build() {
        Ok(root) => root,
        Err(_) => return,
    };
    let mut scopes = vec![root];

    rt.block_on(async {
        for chunk in data.chunks(2) {
            let op = chunk[0];
            let arg = chunk.get(1).copied().unwrap_or(0);
            let index = arg as usize % scopes.len();
            let scope = scopes[index].clone();
            let token = &tokens[(op >> 3) as usize % TOKENS];

            match op % 6 {
                0 => {
                    let _ = scope.register(Provider::value(token.clone(), arg));
                }
                1 => {
                    let _ = scope.register(
                        Provider::factory(token.clone(), vec![], move |_| Ok(arg)).singleton(),
                    );
                }
                2 => {
                    if let Ok(child) = scope.create_child(Scope::named(format!("s{}", arg % 3)), vec![]) {
                        scopes.push(child);
                    }
                }
                3 => {
                    let disposed = scope.is_disposed();
                    match scope.inject_optional::<u8>(token).await {
                        Ok(_) => assert!(!disposed),
                        Err(DiError::Disposed(_)) => {}
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
                4 => {
                    let first = scope.inject_optional::<u8>(token).await;
                    let second = scope.inject_optional::<u8>(token).await;
                    if let (Ok(Some(a)), Ok(Some(b))) = (first, second) {
                        assert_eq!(*a, *b);
                    }
                }
                _ => {
                    if index != 0 {
                        scope.dispose("fuzz").await;
                        assert!(scope.is_disposed());
                    }
                }
            }
        }

        for scope in scopes.iter().rev() {
            scope.dispose("done").await;
        }
    });
});
