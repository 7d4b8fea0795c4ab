//! Primary/fallback backend arbitration.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! The arbiter holds two backend slots. A render goes to the primary; if it
//! fails, the failure is logged once and the fallback gets the identical
//! request. There is never more than one fallback attempt.
//!
//! ```text
//! Idle -> PrimaryAttempted -> Done
//!                          -> FallbackAttempted -> Done
//! ```

use tracing::{debug, warn};

use crate::backend::{GrassBackend, RenderRequest, RsassBackend, SassBackend};
use crate::error::BackendError;

/// Progress of the most recent [`EngineArbiter::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArbiterState {
    #[default]
    Idle,
    PrimaryAttempted,
    FallbackAttempted,
    Done,
}

/// Tagged result of one arbitration.
#[derive(Debug)]
pub enum ArbiterOutcome {
    PrimarySucceeded(String),
    /// The primary failed and the fallback produced CSS.
    FallbackSucceeded {
        css: String,
        primary_error: BackendError,
    },
    BothFailed {
        primary_error: BackendError,
        fallback_error: BackendError,
    },
    /// The primary failed and no fallback is configured.
    PrimaryFailed(BackendError),
}

impl ArbiterOutcome {
    /// Collapse to the CSS or the error the caller should see.
    ///
    /// A recovered primary failure is dropped; when both fail the fallback's
    /// error is returned.
    pub fn into_result(self) -> Result<String, BackendError> {
        match self {
            ArbiterOutcome::PrimarySucceeded(css) | ArbiterOutcome::FallbackSucceeded { css, .. } => {
                Ok(css)
            }
            ArbiterOutcome::BothFailed { fallback_error, .. } => Err(fallback_error),
            ArbiterOutcome::PrimaryFailed(err) => Err(err),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ArbiterOutcome::PrimarySucceeded(_) | ArbiterOutcome::FallbackSucceeded { .. }
        )
    }
}

/// Two-slot backend selector.
pub struct EngineArbiter {
    primary: Box<dyn SassBackend>,
    fallback: Option<Box<dyn SassBackend>>,
    state: ArbiterState,
}

impl EngineArbiter {
    pub fn new(primary: Box<dyn SassBackend>, fallback: Option<Box<dyn SassBackend>>) -> Self {
        Self {
            primary,
            fallback,
            state: ArbiterState::Idle,
        }
    }

    /// grass first, rsass as fallback.
    pub fn with_default_backends() -> Self {
        Self::new(Box::new(GrassBackend::new()), Some(Box::new(RsassBackend::new())))
    }

    /// A single backend with no fallback.
    pub fn single(backend: Box<dyn SassBackend>) -> Self {
        Self::new(backend, None)
    }

    pub fn state(&self) -> ArbiterState {
        self.state
    }

    pub fn primary_name(&self) -> &'static str {
        self.primary.name()
    }

    pub fn fallback_name(&self) -> Option<&'static str> {
        self.fallback.as_ref().map(|b| b.name())
    }

    /// Render `request`, falling back once if the primary fails.
    pub fn run(&mut self, request: &RenderRequest<'_>) -> ArbiterOutcome {
        self.state = ArbiterState::PrimaryAttempted;
        let primary_error = match self.primary.render(request) {
            Ok(css) => {
                self.state = ArbiterState::Done;
                return ArbiterOutcome::PrimarySucceeded(css);
            }
            Err(err) => err,
        };

        warn!(
            backend = primary_error.backend(),
            kind = primary_error.kind(),
            error = %primary_error,
            "Primary stylesheet compiler failed"
        );

        let Some(fallback) = self.fallback.as_ref() else {
            self.state = ArbiterState::Done;
            return ArbiterOutcome::PrimaryFailed(primary_error);
        };

        self.state = ArbiterState::FallbackAttempted;
        debug!(backend = fallback.name(), "Retrying with fallback compiler");
        let outcome = match fallback.render(request) {
            Ok(css) => ArbiterOutcome::FallbackSucceeded { css, primary_error },
            Err(fallback_error) => ArbiterOutcome::BothFailed {
                primary_error,
                fallback_error,
            },
        };
        self.state = ArbiterState::Done;
        outcome
    }
}

impl Default for EngineArbiter {
    fn default() -> Self {
        Self::with_default_backends()
    }
}

impl std::fmt::Debug for EngineArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineArbiter")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback_name())
            .field("state", &self.state)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::StubBackend;
    use super::*;
    use crate::backend::OutputStyle;
    use crate::functions::FunctionRegistry;
    use crate::importer::VirtualImporter;
    use crate::types::{AliasCache, FileSet};
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    fn run(arbiter: &mut EngineArbiter) -> ArbiterOutcome {
        let files = FileSet::new();
        let mut aliases = AliasCache::new();
        let importer = VirtualImporter::new(&files, &mut aliases);
        let functions = FunctionRegistry::new();
        arbiter.run(&RenderRequest {
            source: "a {}",
            functions: &functions,
            importer: &importer,
            output: None,
            source_map: false,
            style: OutputStyle::Expanded,
        })
    }

    #[test]
    fn test_primary_success_skips_fallback() {
        let fallback = StubBackend::ok("fallback", "b {}");
        let fallback_calls = fallback.calls.clone();
        let mut arbiter = EngineArbiter::new(
            Box::new(StubBackend::ok("primary", "a {}")),
            Some(Box::new(fallback)),
        );

        let outcome = run(&mut arbiter);
        assert!(matches!(outcome, ArbiterOutcome::PrimarySucceeded(ref css) if css == "a {}"));
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
        assert_eq!(arbiter.state(), ArbiterState::Done);
    }

    #[test]
    fn test_fallback_recovers_primary_failure() {
        let primary = StubBackend::failing("primary", "boom");
        let fallback = StubBackend::ok("fallback", "b {}");
        let (primary_calls, fallback_calls) = (primary.calls.clone(), fallback.calls.clone());
        let mut arbiter = EngineArbiter::new(Box::new(primary), Some(Box::new(fallback)));

        let outcome = run(&mut arbiter);
        match &outcome {
            ArbiterOutcome::FallbackSucceeded { css, primary_error } => {
                assert_eq!(css, "b {}");
                assert_eq!(primary_error.to_string(), "primary: boom");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.into_result().unwrap(), "b {}");
    }

    #[test]
    fn test_both_failed_surfaces_fallback_error() {
        let mut arbiter = EngineArbiter::new(
            Box::new(StubBackend::failing("primary", "first")),
            Some(Box::new(StubBackend::failing("fallback", "second"))),
        );

        let outcome = run(&mut arbiter);
        assert!(matches!(outcome, ArbiterOutcome::BothFailed { .. }));
        assert!(!outcome.is_success());
        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.backend(), "fallback");
        assert_eq!(err.to_string(), "fallback: second");
    }

    #[test]
    fn test_single_backend_failure() {
        let mut arbiter = EngineArbiter::single(Box::new(StubBackend::failing("only", "nope")));
        let outcome = run(&mut arbiter);
        assert!(matches!(outcome, ArbiterOutcome::PrimaryFailed(_)));
        assert_eq!(arbiter.fallback_name(), None);
    }

    #[test]
    fn test_default_backends() {
        let arbiter = EngineArbiter::default();
        assert_eq!(arbiter.primary_name(), "grass");
        assert_eq!(arbiter.fallback_name(), Some("rsass"));
        assert_eq!(arbiter.state(), ArbiterState::Idle);
    }

    /// Records the `backend` field of every WARN event.
    #[derive(Clone, Default)]
    struct WarnCapture {
        backends: Arc<Mutex<Vec<String>>>,
    }

    struct BackendField(Option<String>);

    impl Visit for BackendField {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "backend" {
                self.0 = Some(value.to_string());
            }
        }

        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "backend" && self.0.is_none() {
                self.0 = Some(format!("{value:?}"));
            }
        }
    }

    impl<S: Subscriber> Layer<S> for WarnCapture {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() != Level::WARN {
                return;
            }
            let mut field = BackendField(None);
            event.record(&mut field);
            self.backends
                .lock()
                .unwrap()
                .push(field.0.unwrap_or_default());
        }
    }

    #[test]
    fn test_primary_failure_is_logged_once() {
        let capture = WarnCapture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());

        let outcome = tracing::subscriber::with_default(subscriber, || {
            let mut arbiter = EngineArbiter::new(
                Box::new(StubBackend::failing("primary", "unsupported")),
                Some(Box::new(StubBackend::ok("fallback", "b {}"))),
            );
            run(&mut arbiter)
        });

        assert!(matches!(outcome, ArbiterOutcome::FallbackSucceeded { .. }));
        assert_eq!(*capture.backends.lock().unwrap(), vec!["primary".to_string()]);
    }
}
