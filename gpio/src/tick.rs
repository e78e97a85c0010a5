//! Timing sources: one-shot settle delays and the periodic keypad tick.
use crate::{GpioError, GpioResult};
use log::{debug, trace};
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// The keypad is polled at roughly 12 Hz, fast enough for typing and slow enough to ride out
/// contact bounce without a separate debouncer.
pub const KEYPAD_POLL_PERIOD: Duration = Duration::from_micros(83_333);

/// Blocks the caller for at least the given duration.
pub trait Delay: Debug {
    fn delay(&self, duration: Duration);
}

/// [Delay] backed by [thread::sleep].
#[derive(Debug, Default, Copy, Clone)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Producer side of a periodic tick. Stops its thread when dropped.
#[derive(Debug)]
pub struct Ticker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

/// Consumer side of a periodic tick.
///
/// Ticks are carried by a channel of capacity 1, so a consumer that falls behind sees a single
/// pending tick rather than a backlog.
#[derive(Debug)]
pub struct TickReceiver {
    rx: Receiver<()>,
}

impl Ticker {
    /// Starts raising a tick every `period`.
    pub fn every(period: Duration) -> GpioResult<(Ticker, TickReceiver)> {
        let (tx, rx) = mpsc::sync_channel(1);
        let stop = Arc::new(AtomicBool::new(false));
        let handle = thread::Builder::new()
            .name("tick".into())
            .spawn({
                let stop = stop.clone();
                move || Self::run(period, tx, stop)
            })?;
        debug!("Ticker started with period {:?}", period);

        Ok((
            Ticker {
                stop,
                handle: Some(handle),
            },
            TickReceiver { rx },
        ))
    }

    fn run(period: Duration, tx: SyncSender<()>, stop: Arc<AtomicBool>) {
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(period);
            match tx.try_send(()) {
                Ok(()) => {}
                Err(TrySendError::Full(())) => trace!("Tick dropped, previous one still pending"),
                Err(TrySendError::Disconnected(())) => break,
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl TickReceiver {
    /// Blocks until the next tick.
    ///
    /// # Errors
    /// - `GpioError::TickSourceStopped` if the [Ticker] is gone.
    pub fn wait(&self) -> GpioResult<()> {
        self.rx.recv().map_err(|_| GpioError::TickSourceStopped)
    }

    /// Consumes a pending tick, if there is one.
    pub fn try_take(&self) -> GpioResult<bool> {
        match self.rx.try_recv() {
            Ok(()) => Ok(true),
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => Err(GpioError::TickSourceStopped),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ticks_arrive() {
        let (_ticker, ticks) = Ticker::every(Duration::from_millis(1)).unwrap();
        for _ in 0..3 {
            ticks.wait().unwrap();
        }
    }

    #[test]
    fn missed_ticks_do_not_pile_up() {
        let (_ticker, ticks) = Ticker::every(Duration::from_millis(10)).unwrap();
        thread::sleep(Duration::from_millis(100));
        let mut drained = 0;
        while ticks.try_take().unwrap() {
            drained += 1;
        }
        // One pending tick, plus at most one the producer squeezed in while draining.
        assert!((1..=2).contains(&drained));
    }

    #[test]
    fn stopped_ticker_is_reported() {
        let (ticker, ticks) = Ticker::every(Duration::from_millis(1)).unwrap();
        drop(ticker);
        while ticks.try_take().unwrap_or(false) {}
        assert_eq!(ticks.wait(), Err(GpioError::TickSourceStopped));
    }
}
