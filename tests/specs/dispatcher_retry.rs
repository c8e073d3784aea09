// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher retry accounting and dead-letter overflow.

use hearth_bus::{
    handler_fn, DeadLetter, DeadLetterQueue, Dispatcher, DispatcherConfig, EventBus,
    HandlerError, HandlerRegistration, LocalBus, LocalBusConfig, MetricsMiddleware,
    RetryPolicy,
};
use hearth_core::{DomainError, DomainEvent, EventType};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn fails_twice_then_succeeds() {
    let dispatcher = Arc::new(Dispatcher::new(DispatcherConfig::default()));
    let metrics = dispatcher.metrics();
    dispatcher.add_middleware(Arc::new(MetricsMiddleware::new(Arc::clone(&metrics))));

    let calls = Arc::new(AtomicUsize::new(0));
    let captured = Arc::clone(&calls);
    dispatcher.register(
        EventType::XpGained,
        HandlerRegistration::new(
            "flaky",
            handler_fn(move |_| {
                let captured = Arc::clone(&captured);
                async move {
                    if captured.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(HandlerError::Domain(DomainError::RetryableNetwork(
                            "blip".into(),
                        )))
                    } else {
                        Ok(())
                    }
                }
            }),
        )
        .with_retry(RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_millis(10),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(1),
        }),
    );

    let bus = LocalBus::new(LocalBusConfig::synchronous());
    Dispatcher::attach(&dispatcher, &bus).unwrap();
    bus.publish(DomainEvent::new(EventType::XpGained, "stu-1"))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3, "total attempts");
    let m = metrics.for_type("student:xp_gained");
    assert_eq!(m.attempts, 3);
    assert_eq!(m.retries, 1);
    assert_eq!(m.retry_successes, 1);
    assert_eq!(m.exhausted, 0);
    assert_eq!(dispatcher.dead_letters().unwrap().len(), 0);
}

#[tokio::test]
async fn dlq_overflow_keeps_newest() {
    let dlq = DeadLetterQueue::new(2);
    for tag in ["e1", "e2", "e3"] {
        dlq.push(DeadLetter {
            event: DomainEvent::new(EventType::XpGained, tag),
            handler_name: "h".into(),
            error: "x".into(),
            attempts: 1,
            failed_at: chrono::Utc::now(),
        });
    }

    let ids: Vec<String> = dlq
        .entries()
        .iter()
        .map(|l| l.event.aggregate_id.clone())
        .collect();
    assert_eq!(ids, vec!["e2", "e3"]);
    assert_eq!(dlq.len(), 2);
}

#[tokio::test]
async fn late_subscriber_misses_publish_and_closed_bus_rejects() {
    let bus = LocalBus::new(LocalBusConfig::synchronous());
    bus.publish(DomainEvent::new(EventType::XpGained, "stu-1"))
        .await
        .unwrap();

    let count = Arc::new(AtomicUsize::new(0));
    let captured = Arc::clone(&count);
    bus.subscribe(
        EventType::XpGained,
        handler_fn(move |_| {
            let captured = Arc::clone(&captured);
            async move {
                captured.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }),
    )
    .unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);

    bus.close().await.unwrap();
    assert_eq!(
        bus.publish(DomainEvent::new(EventType::XpGained, "stu-1"))
            .await
            .unwrap_err(),
        DomainError::Closed
    );
    assert_eq!(count.load(Ordering::SeqCst), 0, "no handler invoked after close");
}
