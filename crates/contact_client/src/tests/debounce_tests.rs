use super::*;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::Mutex;

#[tokio::test(start_paused = true)]
async fn runs_once_after_delay() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut debouncer = Debouncer::new(Duration::from_millis(500));

    let counter = Arc::clone(&hits);
    debouncer.schedule(move || async move {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert!(debouncer.is_pending());

    tokio::time::sleep(Duration::from_millis(499)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(!debouncer.is_pending());
}

#[tokio::test(start_paused = true)]
async fn rescheduling_cancels_the_previous_callback() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut debouncer = Debouncer::new(Duration::from_millis(500));

    for value in ["h", "he", "hel", "hello"] {
        let seen = Arc::clone(&seen);
        debouncer.schedule(move || async move {
            seen.lock().await.push(value);
        });
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(*seen.lock().await, vec!["hello"]);
}

#[tokio::test(start_paused = true)]
async fn cancel_discards_pending_callback() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut debouncer = Debouncer::new(Duration::from_millis(500));

    let counter = Arc::clone(&hits);
    debouncer.schedule(move || async move {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert!(debouncer.cancel());
    assert!(!debouncer.cancel());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_debouncer_discards_pending_callback() {
    let hits = Arc::new(AtomicUsize::new(0));
    {
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        let counter = Arc::clone(&hits);
        debouncer.schedule(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
