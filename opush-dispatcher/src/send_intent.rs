use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Creates the two ends of the "send is waiting for a device" handoff.
///
/// The send flow keeps the [`SendIntent`]; the dispatcher keeps the
/// [`PendingDevicePicker`]. However often the radio comes up, each mark is
/// consumed by exactly one [`PendingDevicePicker::take`].
pub fn send_intent() -> (SendIntent, PendingDevicePicker) {
    let flag = Arc::new(AtomicBool::new(false));
    (
        SendIntent {
            flag: Arc::clone(&flag),
        },
        PendingDevicePicker { flag },
    )
}

#[derive(Debug, Clone)]
pub struct SendIntent {
    flag: Arc<AtomicBool>,
}

impl SendIntent {
    /// Marks that a send was started while the radio was off.
    pub fn await_device_selection(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn cancel(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone)]
pub struct PendingDevicePicker {
    flag: Arc<AtomicBool>,
}

impl PendingDevicePicker {
    pub fn take(&self) -> bool {
        self.flag.swap(false, Ordering::AcqRel)
    }
}
