//! Polling helpers for asynchronous assertions.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};

const DEADLINE: Duration = Duration::from_secs(3);

/// Poll `condition` until it holds, panicking after a few seconds.
pub async fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    while !condition() {
        assert!(start.elapsed() < DEADLINE, "timed out waiting for {what}");
        sleep(Duration::from_millis(5)).await;
    }
}

/// Next hub frame whose event name is `event`, skipping others.
pub async fn next_event(frames: &mut mpsc::Receiver<Arc<str>>, event: &str) -> serde_json::Value {
    let found = timeout(DEADLINE, async {
        while let Some(frame) = frames.recv().await {
            let value: serde_json::Value = serde_json::from_str(&frame).expect("frame is JSON");
            if value["event"] == event {
                return Some(value);
            }
        }
        None
    })
    .await;

    match found {
        Ok(Some(value)) => value,
        Ok(None) => panic!("observer channel closed before {event}"),
        Err(_) => panic!("timed out waiting for {event}"),
    }
}
