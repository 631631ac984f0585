//! Frame-based clock sources that drive the timer update loop.
//!
//! A clock hands out at most one pending frame at a time. The host pulls the
//! frame with [`ClockSource::next_frame`] and feeds it to the engine, which
//! schedules the following one. Cancelling a frame is immediate.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Identifies one scheduled frame
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

/// A delivered frame and the timestamp it fired at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    pub handle: FrameHandle,
    pub timestamp_ms: u64,
}

/// Source of timestamps and per-frame callbacks
pub trait ClockSource {
    /// Current time in milliseconds on this clock's timeline
    fn now_millis(&self) -> u64;

    /// Arrange for one frame to be delivered on the next available tick.
    ///
    /// Replaces any frame that is still pending.
    fn schedule(&mut self) -> FrameHandle;

    /// Cancel a pending frame. Unknown or already delivered handles are ignored.
    fn cancel(&mut self, handle: FrameHandle);

    /// Deliver the pending frame once it is due.
    ///
    /// Returns `None` when nothing is scheduled (or, for virtual clocks, when
    /// the pending frame is not due yet).
    fn next_frame(&mut self) -> Option<Frame>;
}

// ============================================================================
// System Clock
// ============================================================================

/// Wall-clock source that delivers frames at a fixed cadence
pub struct SystemClock {
    origin: Instant,
    frame_interval: Duration,
    next_handle: u64,
    pending: Option<(FrameHandle, Instant)>,
}

impl SystemClock {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            origin: Instant::now(),
            frame_interval,
            next_handle: 0,
            pending: None,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.pending.is_some()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(Duration::from_millis(16))
    }
}

impl ClockSource for SystemClock {
    fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn schedule(&mut self) -> FrameHandle {
        self.next_handle += 1;
        let handle = FrameHandle(self.next_handle);
        self.pending = Some((handle, Instant::now() + self.frame_interval));
        handle
    }

    fn cancel(&mut self, handle: FrameHandle) {
        if matches!(self.pending, Some((pending, _)) if pending == handle) {
            self.pending = None;
        }
    }

    fn next_frame(&mut self) -> Option<Frame> {
        let (handle, due) = self.pending.take()?;
        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        }
        Some(Frame {
            handle,
            timestamp_ms: self.now_millis(),
        })
    }
}

// ============================================================================
// Virtual Clock
// ============================================================================

#[derive(Debug)]
struct VirtualTimeline {
    now_ms: u64,
    frame_interval_ms: u64,
    next_handle: u64,
    pending: Option<(FrameHandle, u64)>,
    scheduled_total: u64,
}

/// Manually advanced clock for tests and simulated playback
///
/// Clones share a single timeline: a host can keep one handle to advance
/// time while the engine owns another.
#[derive(Clone, Debug)]
pub struct VirtualClock {
    inner: Rc<RefCell<VirtualTimeline>>,
}

impl VirtualClock {
    /// Create a clock at t=0 that delivers a frame every `frame_interval_ms`
    pub fn new(frame_interval_ms: u64) -> Self {
        Self {
            inner: Rc::new(RefCell::new(VirtualTimeline {
                now_ms: 0,
                frame_interval_ms: frame_interval_ms.max(1),
                next_handle: 0,
                pending: None,
                scheduled_total: 0,
            })),
        }
    }

    /// Move time forward without delivering anything
    pub fn advance(&self, millis: u64) {
        self.inner.borrow_mut().now_ms += millis;
    }

    pub fn frame_interval_ms(&self) -> u64 {
        self.inner.borrow().frame_interval_ms
    }

    pub fn is_scheduled(&self) -> bool {
        self.inner.borrow().pending.is_some()
    }

    /// Number of frames ever scheduled on this timeline
    pub fn scheduled_total(&self) -> u64 {
        self.inner.borrow().scheduled_total
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl ClockSource for VirtualClock {
    fn now_millis(&self) -> u64 {
        self.inner.borrow().now_ms
    }

    fn schedule(&mut self) -> FrameHandle {
        let mut tl = self.inner.borrow_mut();
        tl.next_handle += 1;
        tl.scheduled_total += 1;
        let handle = FrameHandle(tl.next_handle);
        let due = tl.now_ms + tl.frame_interval_ms;
        tl.pending = Some((handle, due));
        handle
    }

    fn cancel(&mut self, handle: FrameHandle) {
        let mut tl = self.inner.borrow_mut();
        if matches!(tl.pending, Some((pending, _)) if pending == handle) {
            tl.pending = None;
        }
    }

    fn next_frame(&mut self) -> Option<Frame> {
        let mut tl = self.inner.borrow_mut();
        match tl.pending {
            Some((handle, due)) if due <= tl.now_ms => {
                tl.pending = None;
                Some(Frame {
                    handle,
                    timestamp_ms: tl.now_ms,
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_frame_not_due_until_interval() {
        let mut clock = VirtualClock::new(250);
        let handle = clock.schedule();

        clock.advance(200);
        assert!(clock.next_frame().is_none());

        clock.advance(50);
        let frame = clock.next_frame().unwrap();
        assert_eq!(frame.handle, handle);
        assert_eq!(frame.timestamp_ms, 250);

        // Delivered exactly once
        assert!(clock.next_frame().is_none());
    }

    #[test]
    fn test_virtual_cancel_is_immediate() {
        let mut clock = VirtualClock::new(100);
        let handle = clock.schedule();
        clock.advance(500);
        clock.cancel(handle);
        assert!(clock.next_frame().is_none());
        assert!(!clock.is_scheduled());
    }

    #[test]
    fn test_virtual_clones_share_timeline() {
        let host = VirtualClock::new(1000);
        let mut owned = host.clone();
        owned.schedule();
        host.advance(1000);
        assert_eq!(owned.now_millis(), 1000);
        assert!(owned.next_frame().is_some());
        assert_eq!(host.scheduled_total(), 1);
    }

    #[test]
    fn test_cancel_stale_handle_keeps_pending_frame() {
        let mut clock = VirtualClock::new(10);
        let old = clock.schedule();
        let fresh = clock.schedule();
        clock.cancel(old);
        clock.advance(10);
        assert_eq!(clock.next_frame().map(|f| f.handle), Some(fresh));
    }

    #[test]
    fn test_system_clock_delivers_and_cancels() {
        let mut clock = SystemClock::new(Duration::from_millis(1));
        let handle = clock.schedule();
        let frame = clock.next_frame().unwrap();
        assert_eq!(frame.handle, handle);

        let handle = clock.schedule();
        clock.cancel(handle);
        assert!(!clock.is_scheduled());
        assert!(clock.next_frame().is_none());
    }
}
