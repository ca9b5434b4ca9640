use ferrous_injector::{Args, DiError, Instance};

#[test]
fn missing_provider_lists_the_ancestry() {
    let err = DiError::MissingProvider {
        token: "Database".to_string(),
        ancestry: vec!["request".to_string(), "root".to_string(), "ambient".to_string()],
    };
    assert_eq!(
        err.to_string(),
        "No provider for Database (ancestry: request -> root -> ambient)"
    );
    assert!(err.is_missing_provider());
    assert!(!err.is_configuration());
}

#[test]
fn configuration_errors_are_classified() {
    let errors = [
        DiError::PolicyConflict {
            token: "Session".to_string(),
            option: "singleton",
            expected: "true".to_string(),
            found: "false".to_string(),
        },
        DiError::ConflictingOptions {
            token: "Hooks".to_string(),
            reason: "single provider registered over multi providers",
        },
        DiError::InvalidRegistration("no provide token".to_string()),
        DiError::AmbientRepository("store instances"),
        DiError::Configuration("max_depth must be at least 1".to_string()),
    ];
    assert!(errors.iter().all(DiError::is_configuration));
    assert_eq!(
        errors[0].to_string(),
        "Provider for Session sets singleton=false but the token requires singleton=true"
    );
    assert_eq!(errors[3].to_string(), "The ambient repository cannot store instances");
}

#[test]
fn resolution_error_messages() {
    assert_eq!(DiError::DepthExceeded(8).to_string(), "Max depth 8 exceeded");
    assert_eq!(
        DiError::MethodNotFound {
            target: "Checkout".to_string(),
            method: "refund".to_string(),
        }
        .to_string(),
        "Method refund not found on Checkout"
    );
    assert_eq!(
        DiError::ArgumentAbsent {
            target: "Greeter".to_string(),
            index: 2,
        }
        .to_string(),
        "Argument 2 of Greeter is absent"
    );
    assert_eq!(DiError::InvalidToken("Later".to_string()).to_string(), "Invalid token: Later");
}

#[test]
fn absent_and_mistyped_arguments() {
    let args = Args::new("Greeter", vec![Some(Instance::single(1u8)), None]);

    assert!(matches!(
        args.get::<u8>(1),
        Err(DiError::ArgumentAbsent { index: 1, .. })
    ));
    assert!(matches!(
        args.get::<u8>(5),
        Err(DiError::ArgumentAbsent { index: 5, .. })
    ));
    assert!(matches!(args.get::<String>(0), Err(DiError::TypeMismatch(_))));
    assert!(args.optional::<u8>(1).unwrap().is_none());
    assert!(args.all::<u8>(1).unwrap().is_empty());
    assert_eq!(args.all::<u8>(0).unwrap().len(), 1);
}

#[test]
fn errors_are_cloneable_for_shared_waiters() {
    let err = DiError::Construction {
        token: "Pool".to_string(),
        message: "timeout".to_string(),
    };
    let copy = err.clone();
    assert_eq!(err.to_string(), copy.to_string());
}
