//! Clock adapters.
//!
//! - [`MonotonicClock`]: production clock.  `now()` reads
//!   `esp_timer_get_time()` on the device and `std::time::Instant` on the
//!   host; `sleep()` is an `async-io-mini` timer, so waiting costs nothing
//!   while the executor is parked.
//! - [`VirtualClock`]: deterministic discrete-event clock for tests and
//!   dry runs.  Time only moves when every task is parked on a sleep, and
//!   then jumps straight to the earliest pending deadline.

use core::cell::RefCell;
use core::future::Future;
use core::pin::{Pin, pin};
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::{Context, Poll, Waker};
use core::time::Duration;

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use std::task::Wake;

use async_io_mini::Timer;

use crate::app::ports::Clock;

// ---------------------------------------------------------------------------
// Production clock
// ---------------------------------------------------------------------------

pub struct MonotonicClock {
    #[cfg(target_os = "espidf")]
    start_us: i64,
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "espidf")]
            start_us: unsafe { esp_idf_svc::sys::esp_timer_get_time() },
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    #[cfg(target_os = "espidf")]
    fn now(&self) -> Duration {
        let now_us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
        Duration::from_micros(now_us.saturating_sub(self.start_us).max(0) as u64)
    }

    #[cfg(not(target_os = "espidf"))]
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        async move {
            Timer::after(duration).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Virtual clock
// ---------------------------------------------------------------------------

#[derive(Default)]
struct VirtualState {
    now: Duration,
    next_id: u64,
    /// Pending sleeps keyed by (deadline, registration order).
    timers: BTreeMap<(Duration, u64), Option<Waker>>,
}

/// Shared handle; clones observe the same time.
#[derive(Clone, Default)]
pub struct VirtualClock {
    state: Rc<RefCell<VirtualState>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sleeps currently pending.
    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// Drive `fut` to completion, advancing virtual time whenever it is
    /// blocked on nothing but sleeps.
    ///
    /// # Panics
    ///
    /// If the future is pending with no timer registered and nothing woke
    /// it; under a virtual clock that would block forever.
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        let flag = Arc::new(FlagWaker::default());
        let waker = Waker::from(flag.clone());
        let mut cx = Context::from_waker(&waker);
        let mut fut = pin!(fut);

        loop {
            flag.woken.store(false, Ordering::Release);
            if let Poll::Ready(out) = fut.as_mut().poll(&mut cx) {
                return out;
            }
            if flag.woken.load(Ordering::Acquire) {
                continue;
            }
            assert!(self.advance_to_next(), "virtual clock stalled at {:?}", self.now());
        }
    }

    /// Jump to the earliest deadline and wake everything due.  Returns
    /// `false` when no timer is pending.
    fn advance_to_next(&self) -> bool {
        let due: Vec<Waker> = {
            let mut st = self.state.borrow_mut();
            let Some(&(deadline, _)) = st.timers.keys().next() else {
                return false;
            };
            if deadline > st.now {
                st.now = deadline;
            }
            let now = st.now;
            st.timers
                .iter_mut()
                .take_while(|((d, _), _)| *d <= now)
                .filter_map(|(_, w)| w.take())
                .collect()
        };
        for w in due {
            w.wake();
        }
        true
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        self.state.borrow().now
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        let mut st = self.state.borrow_mut();
        let deadline = st.now + duration;
        let id = st.next_id;
        st.next_id += 1;
        if !duration.is_zero() {
            st.timers.insert((deadline, id), None);
        }
        VirtualSleep {
            clock: self.clone(),
            key: (deadline, id),
        }
    }
}

struct VirtualSleep {
    clock: VirtualClock,
    key: (Duration, u64),
}

impl Future for VirtualSleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut st = self.clock.state.borrow_mut();
        if st.now >= self.key.0 {
            st.timers.remove(&self.key);
            return Poll::Ready(());
        }
        if let Some(slot) = st.timers.get_mut(&self.key) {
            *slot = Some(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl Drop for VirtualSleep {
    fn drop(&mut self) {
        if let Ok(mut st) = self.clock.state.try_borrow_mut() {
            st.timers.remove(&self.key);
        }
    }
}

#[derive(Default)]
struct FlagWaker {
    woken: AtomicBool,
}

impl Wake for FlagWaker {
    fn wake(self: Arc<Self>) {
        self.woken.store(true, Ordering::Release);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.woken.store(true, Ordering::Release);
    }
}
