// ============================================================================
// Clock
// Low-overhead monotonic ticks with calibrated conversion to nanoseconds
// ============================================================================
//
// On x86_64 the hot path reads the time-stamp counter directly; elsewhere it
// falls back to `Instant`. Nothing assumes a counter frequency: `calibrate`
// measures it against the OS clock at startup and stores a 32.32 fixed-point
// multiplier so conversion never touches floating point.

use std::time::{Duration, Instant};

/// Opaque counter value. Only differences between ticks from the same
/// `Clock` are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticks(u64);

impl Ticks {
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    /// CPU time-stamp counter
    Tsc,
    /// `std::time::Instant`, one tick per nanosecond
    Monotonic,
}

/// Monotonic clock capability. `Copy`, so every thread keeps its own.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    source: ClockSource,
    origin: Instant,
    origin_ticks: u64,
    /// nanoseconds per tick in 32.32 fixed point
    nanos_per_tick_q32: u64,
}

const Q32: u64 = 1 << 32;

impl Clock {
    /// Portable clock backed by `Instant`.
    pub fn monotonic() -> Self {
        Self {
            source: ClockSource::Monotonic,
            origin: Instant::now(),
            origin_ticks: 0,
            nanos_per_tick_q32: Q32,
        }
    }

    /// Measure the cycle counter against the OS clock over `window` and use it
    /// when it ticks forward; otherwise fall back to `monotonic()`.
    pub fn calibrate(window: Duration) -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            let start = Instant::now();
            let start_cycles = read_tsc();
            while start.elapsed() < window {
                std::hint::spin_loop();
            }
            let end_cycles = read_tsc();
            let elapsed_nanos = start.elapsed().as_nanos();
            let cycles = end_cycles.saturating_sub(start_cycles) as u128;

            if cycles > 0 && elapsed_nanos > 0 {
                let q32 = (elapsed_nanos << 32) / cycles;
                if let Ok(nanos_per_tick_q32) = u64::try_from(q32) {
                    if nanos_per_tick_q32 > 0 {
                        let clock = Self {
                            source: ClockSource::Tsc,
                            origin: start,
                            origin_ticks: start_cycles,
                            nanos_per_tick_q32,
                        };
                        tracing::info!(
                            frequency_hz = clock.frequency_hz(),
                            "calibrated cycle counter"
                        );
                        return clock;
                    }
                }
            }
            tracing::warn!("cycle counter did not advance during calibration, using Instant");
        }

        #[cfg(not(target_arch = "x86_64"))]
        let _ = window;

        Self::monotonic()
    }

    #[inline]
    pub fn source(&self) -> ClockSource {
        self.source
    }

    #[inline]
    pub fn now(&self) -> Ticks {
        match self.source {
            ClockSource::Tsc => Ticks(read_tsc()),
            ClockSource::Monotonic => Ticks(self.origin.elapsed().as_nanos() as u64),
        }
    }

    /// Convert a tick difference to nanoseconds.
    #[inline]
    pub fn ticks_to_nanos(&self, ticks: u64) -> u64 {
        ((ticks as u128 * self.nanos_per_tick_q32 as u128) >> 32) as u64
    }

    /// Nanoseconds between `start` and now.
    #[inline]
    pub fn elapsed_nanos(&self, start: Ticks) -> u64 {
        self.ticks_to_nanos(self.now().0.saturating_sub(start.0))
    }

    /// Nanoseconds since the clock was created; used as trade timestamps.
    #[inline]
    pub fn now_nanos(&self) -> u64 {
        self.ticks_to_nanos(self.now().0.saturating_sub(self.origin_ticks))
    }

    pub fn frequency_hz(&self) -> f64 {
        1e9 * Q32 as f64 / self.nanos_per_tick_q32 as f64
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::monotonic()
    }
}

#[cfg(target_arch = "x86_64")]
#[inline]
fn read_tsc() -> u64 {
    // SAFETY: rdtsc is available on every x86_64 CPU and has no side effects.
    #[allow(unused_unsafe)]
    unsafe {
        core::arch::x86_64::_rdtsc()
    }
}

#[cfg(not(target_arch = "x86_64"))]
#[inline]
fn read_tsc() -> u64 {
    0
}
