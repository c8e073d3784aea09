// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::handler::handler_fn;
use hearth_core::EventType;
use parking_lot::Mutex;

fn ctx() -> HandlerContext {
    HandlerContext {
        handler_name: "test".into(),
        attempt: 0,
    }
}

fn event() -> DomainEvent {
    DomainEvent::new(EventType::XpGained, "stu-1")
}

/// Middleware that records when it was entered.
struct Tracer {
    tag: &'static str,
    trace: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait::async_trait]
impl Middleware for Tracer {
    async fn call(
        &self,
        ctx: &HandlerContext,
        event: &DomainEvent,
        next: Next<'_>,
    ) -> Result<(), HandlerError> {
        self.trace.lock().push(self.tag);
        next.run(ctx, event).await
    }
}

#[tokio::test]
async fn chain_runs_in_registration_order() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let middlewares: Vec<Arc<dyn Middleware>> = vec![
        Arc::new(Tracer {
            tag: "outer",
            trace: Arc::clone(&trace),
        }),
        Arc::new(Tracer {
            tag: "inner",
            trace: Arc::clone(&trace),
        }),
    ];

    let trace_h = Arc::clone(&trace);
    let handler = handler_fn(move |_| {
        let trace_h = Arc::clone(&trace_h);
        async move {
            trace_h.lock().push("handler");
            Ok(())
        }
    });

    Next::new(&middlewares, handler.as_ref())
        .run(&ctx(), &event())
        .await
        .unwrap();

    assert_eq!(*trace.lock(), vec!["outer", "inner", "handler"]);
}

#[tokio::test]
async fn empty_chain_calls_handler_directly() {
    let handler = handler_fn(|_| async { Ok(()) });
    Next::new(&[], handler.as_ref())
        .run(&ctx(), &event())
        .await
        .unwrap();
}

#[tokio::test]
async fn recovery_converts_panic() {
    let middlewares: Vec<Arc<dyn Middleware>> = vec![Arc::new(RecoveryMiddleware)];
    let handler = handler_fn(|_| async { panic!("kaboom") });

    let err = Next::new(&middlewares, handler.as_ref())
        .run(&ctx(), &event())
        .await
        .unwrap_err();

    match err {
        HandlerError::Panic(detail) => assert!(detail.contains("kaboom")),
        other => panic!("expected panic error, got {other:?}"),
    }
}

#[tokio::test]
async fn recovery_passes_success_through() {
    let middlewares: Vec<Arc<dyn Middleware>> = vec![Arc::new(RecoveryMiddleware)];
    let handler = handler_fn(|_| async { Ok(()) });
    Next::new(&middlewares, handler.as_ref())
        .run(&ctx(), &event())
        .await
        .unwrap();
}

#[tokio::test]
async fn timeout_middleware_bounds_slow_handlers() {
    let middlewares: Vec<Arc<dyn Middleware>> =
        vec![Arc::new(TimeoutMiddleware::new(Duration::from_millis(10)))];
    let handler = handler_fn(|_| async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(())
    });

    let err = Next::new(&middlewares, handler.as_ref())
        .run(&ctx(), &event())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HandlerError::Domain(DomainError::Timeout(_))
    ));
}

#[tokio::test]
async fn metrics_middleware_counts_attempts() {
    let metrics = Arc::new(DispatchMetrics::new());
    let middlewares: Vec<Arc<dyn Middleware>> =
        vec![Arc::new(MetricsMiddleware::new(Arc::clone(&metrics)))];

    let ok = handler_fn(|_| async { Ok(()) });
    let bad = handler_fn(|_| async {
        Err(HandlerError::Domain(DomainError::NotFound("x".into())))
    });

    Next::new(&middlewares, ok.as_ref())
        .run(&ctx(), &event())
        .await
        .unwrap();
    let _ = Next::new(&middlewares, bad.as_ref())
        .run(&ctx(), &event())
        .await;

    let m = metrics.for_type("student:xp_gained");
    assert_eq!(m.attempts, 2);
    assert_eq!(m.succeeded, 1);
    assert_eq!(m.failed, 1);
    assert!((m.success_rate() - 0.5).abs() < f64::EPSILON);
}
