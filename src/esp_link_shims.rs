//! Runtime symbol providers for third-party crates.
//!
//! - `critical-section`: the cancel token's waker registry sits behind an
//!   embassy-sync `CriticalSectionRawMutex`.  On the host the crate's `std`
//!   feature supplies the implementation; on the device it comes from here.
//! - `embassy-time-driver`: `async_io_mini::Timer` (behind
//!   [`MonotonicClock`](crate::adapters::time::MonotonicClock)) reads
//!   `_embassy_time_now` and arms `_embassy_time_schedule_wake`.  Both
//!   targets get a driver here: `esp_timer_get_time()` on the device,
//!   `Instant` on the host.  Ticks are microseconds.

use core::task::Waker;
use core::time::Duration;

#[cfg(target_os = "espidf")]
mod imp {
    use core::cell::{Cell, RefCell};
    use std::sync::{Mutex, MutexGuard, PoisonError};

    use critical_section::RawRestoreState;

    static SECTION_LOCK: Mutex<()> = Mutex::new(());

    thread_local! {
        static NESTING: Cell<u8> = const { Cell::new(0) };
        static HELD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
    }

    // Nesting is tracked per thread: only the outermost acquire takes the
    // process-wide lock.  Never entered from interrupt context.
    struct EspCriticalSection;

    critical_section::set_impl!(EspCriticalSection);

    unsafe impl critical_section::Impl for EspCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let depth = NESTING.with(Cell::get);
            if depth == 0 {
                // Poisoning is ignored.
                let guard = SECTION_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
                HELD.with(|h| *h.borrow_mut() = Some(guard));
            }
            NESTING.with(|n| n.set(depth.saturating_add(1)));
        }

        unsafe fn release(_restore: RawRestoreState) {
            let depth = NESTING.with(Cell::get);
            if depth == 0 {
                return;
            }
            NESTING.with(|n| n.set(depth - 1));
            if depth == 1 {
                HELD.with(|h| h.borrow_mut().take());
            }
        }
    }

    pub fn now_us() -> u64 {
        // SAFETY: esp_timer is started by the IDF before app_main.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }).max(0) as u64
    }
}

#[cfg(not(target_os = "espidf"))]
mod imp {
    use std::sync::LazyLock;
    use std::time::Instant;

    static EPOCH: LazyLock<Instant> = LazyLock::new(Instant::now);

    pub fn now_us() -> u64 {
        EPOCH.elapsed().as_micros() as u64
    }
}

/// Current time in driver ticks (µs).
#[unsafe(no_mangle)]
pub fn _embassy_time_now() -> u64 {
    imp::now_us()
}

/// Wake `waker` once `at` has passed, from a short-lived sleeper thread.
#[unsafe(no_mangle)]
pub fn _embassy_time_schedule_wake(at: u64, waker: &Waker) {
    let sleeper = waker.clone();
    let spawned = std::thread::Builder::new()
        .name("time-wake".into())
        .spawn(move || {
            let now = imp::now_us();
            if at > now {
                std::thread::sleep(Duration::from_micros(at - now));
            }
            sleeper.wake();
        });
    if let Err(e) = spawned {
        // An early wake only re-polls the timer, which re-arms itself.
        log::warn!("time driver: sleeper spawn failed ({}), waking now", e);
        waker.wake_by_ref();
    }
}
