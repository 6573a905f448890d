//! Progress bar helpers for following an operation.

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

pub type ProgressBar = Arc<Mutex<Bar>>;

/// Bar with an unknown total; the total is set once the batch size is known.
pub fn create_counter(desc: &'static str, unit: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = unit
    )))
}

/// Set the bar's total (e.g. when `JobBegin` or the search reports the batch size).
pub fn set_bar_total(pb: &ProgressBar, total: usize) {
    if let Ok(mut bar) = pb.try_lock() {
        bar.total = total;
        let _ = bar.refresh();
    }
}

/// Grow the total by `n`, for results that arrive in waves.
pub fn add_to_bar_total(pb: &ProgressBar, n: usize) {
    if let Ok(mut bar) = pb.lock() {
        bar.total += n;
        let _ = bar.refresh();
    }
}

/// Advance by `n`. Skips the update if the bar is busy; the next one catches up.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.update(n);
    }
}

/// Final refresh, then move the cursor past the bar.
pub fn finish_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.lock() {
        let _ = bar.refresh();
        eprintln!();
    }
}
