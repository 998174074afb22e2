use crate::clock::Clock;
use crate::errors::BotError;
use crate::snapshot::{NodeAttributes, UiNode, UiSnapshot};
use crate::types::Rect;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// The common trait every device backend must implement.
///
/// Calls are synchronous and expected to return quickly; a backend that talks to a
/// remote device is responsible for its own timeouts.
pub trait UiSource: Send + Sync {
    /// Capture the target app's windows. `None` means the app is not in the foreground.
    fn capture_snapshot(&self) -> Option<UiSnapshot>;

    /// Tap the centre of `bounds` with a press lasting `gesture_ms`
    fn dispatch_tap(&self, bounds: Rect, gesture_ms: u64) -> bool;

    fn dispatch_back(&self) -> bool;

    fn dispatch_home(&self) -> bool;

    /// Scroll a container forward by one page
    fn dispatch_scroll(&self, node: &NodeAttributes) -> bool;

    fn force_stop_app(&self) -> Result<(), BotError>;

    fn launch_app(&self) -> Result<(), BotError>;
}

/// One interaction issued through a [`UiSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Tap(Rect),
    Back,
    Home,
    Scroll(Rect),
    ForceStop,
    Launch,
}

impl Dispatched {
    pub fn is_tap(&self) -> bool {
        matches!(self, Dispatched::Tap(_))
    }
}

/// A source that serves prepared widget trees and records every dispatched action.
///
/// Used for dry runs against captured trees and as the device double in tests. Queued
/// frames are served one per capture; once the queue drains the last frame keeps being
/// served until [`ReplaySource::set_screen`] replaces it.
pub struct ReplaySource {
    clock: Arc<dyn Clock>,
    queued: Mutex<VecDeque<Option<UiNode>>>,
    current: Mutex<Option<UiNode>>,
    other_windows: Mutex<Vec<UiNode>>,
    log: Mutex<Vec<(u64, Dispatched)>>,
    reject_taps: AtomicBool,
    fail_app_control: AtomicBool,
}

impl ReplaySource {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            queued: Mutex::new(VecDeque::new()),
            current: Mutex::new(None),
            other_windows: Mutex::new(Vec::new()),
            log: Mutex::new(Vec::new()),
            reject_taps: AtomicBool::new(false),
            fail_app_control: AtomicBool::new(false),
        }
    }

    /// Replace the frame served by every following capture
    pub fn set_screen(&self, root: Option<UiNode>) {
        if let Ok(mut queued) = self.queued.lock() {
            queued.clear();
        }
        if let Ok(mut current) = self.current.lock() {
            *current = root;
        }
    }

    pub fn push_frame(&self, root: Option<UiNode>) {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(root);
        }
    }

    pub fn set_other_windows(&self, windows: Vec<UiNode>) {
        if let Ok(mut other) = self.other_windows.lock() {
            *other = windows;
        }
    }

    /// Make every tap report failure, as a device does when a gesture is cancelled
    pub fn reject_taps(&self, reject: bool) {
        self.reject_taps.store(reject, Ordering::SeqCst);
    }

    /// Make force-stop and launch fail
    pub fn fail_app_control(&self, fail: bool) {
        self.fail_app_control.store(fail, Ordering::SeqCst);
    }

    /// Every dispatched action with the clock reading at dispatch time
    pub fn dispatched(&self) -> Vec<(u64, Dispatched)> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn taps(&self) -> Vec<Rect> {
        self.dispatched()
            .into_iter()
            .filter_map(|(_, d)| match d {
                Dispatched::Tap(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn clear_log(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.clear();
        }
    }

    fn record(&self, action: Dispatched) {
        let now = self.clock.now_ms();
        debug!(?action, now, "replay dispatch");
        if let Ok(mut log) = self.log.lock() {
            log.push((now, action));
        }
    }
}

impl UiSource for ReplaySource {
    fn capture_snapshot(&self) -> Option<UiSnapshot> {
        let next = self.queued.lock().ok().and_then(|mut q| q.pop_front());
        let mut current = self.current.lock().ok()?;
        if let Some(frame) = next {
            *current = frame;
        }
        let root = current.clone()?;
        let others = self
            .other_windows
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default();
        Some(UiSnapshot::with_windows(root, others, self.clock.now_ms()))
    }

    fn dispatch_tap(&self, bounds: Rect, _gesture_ms: u64) -> bool {
        if self.reject_taps.load(Ordering::SeqCst) {
            return false;
        }
        self.record(Dispatched::Tap(bounds));
        true
    }

    fn dispatch_back(&self) -> bool {
        self.record(Dispatched::Back);
        true
    }

    fn dispatch_home(&self) -> bool {
        self.record(Dispatched::Home);
        true
    }

    fn dispatch_scroll(&self, node: &NodeAttributes) -> bool {
        self.record(Dispatched::Scroll(node.bounds));
        true
    }

    fn force_stop_app(&self) -> Result<(), BotError> {
        if self.fail_app_control.load(Ordering::SeqCst) {
            return Err(BotError::PlatformError("force-stop refused".to_string()));
        }
        self.record(Dispatched::ForceStop);
        Ok(())
    }

    fn launch_app(&self) -> Result<(), BotError> {
        if self.fail_app_control.load(Ordering::SeqCst) {
            return Err(BotError::PlatformError("launch refused".to_string()));
        }
        self.record(Dispatched::Launch);
        Ok(())
    }
}
