// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Quiet-period timer with last-write-wins sequencing.
///
/// Each `schedule` aborts the pending timer and takes a fresh sequence
/// number; the timer posts `make(seq)` when it fires.  Receivers compare the
/// number against [`Debouncer::is_current`] and drop anything older.
pub struct Debouncer {
    delay: Duration,
    seq: u64,
    timer: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, seq: 0, timer: None }
    }

    pub fn schedule<T, F>(&mut self, tx: &mpsc::Sender<T>, make: F) -> u64
    where
        T: Send + 'static,
        F: FnOnce(u64) -> T + Send + 'static,
    {
        self.abort_timer();
        self.seq += 1;
        let seq = self.seq;
        let delay = self.delay;
        let tx = tx.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(make(seq)).await;
        }));
        seq
    }

    /// Drop the pending timer and invalidate every number handed out so far,
    /// including those of searches already in flight.
    pub fn cancel(&mut self) {
        self.abort_timer();
        self.seq += 1;
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.seq
    }

    fn abort_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.abort_timer();
    }
}
