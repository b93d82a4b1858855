use std::time::Duration;

use filehub_client::{DateRange, FilterSet};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Quiet period after the last filename edit before it is emitted
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Search form state.
///
/// The draft follows every edit immediately. Committed filter sets are sent
/// on `sink`: filename edits after the debounce delay, everything else on
/// [`submit`](Self::submit), [`reset`](Self::reset) or
/// [`clear_filename`](Self::clear_filename). Filename edits spawn a tokio
/// task, so the panel must live inside a runtime.
pub struct SearchPanel {
    draft: FilterSet,
    sink: UnboundedSender<FilterSet>,
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

fn text(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl SearchPanel {
    pub fn new(sink: UnboundedSender<FilterSet>) -> Self {
        Self::with_delay(sink, DEFAULT_DEBOUNCE)
    }

    pub fn with_delay(sink: UnboundedSender<FilterSet>, delay: Duration) -> Self {
        Self {
            draft: FilterSet::default(),
            sink,
            delay,
            pending: None,
        }
    }

    pub fn draft(&self) -> &FilterSet {
        &self.draft
    }

    /// Whether a debounced emission is scheduled and has not fired yet
    pub fn has_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn set_filename(&mut self, value: &str) {
        self.draft.filename = text(value);
        self.cancel();

        let snapshot = self.draft.clone();
        let sink = self.sink.clone();
        let deadline = Instant::now() + self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            trace!("debounced search {:?}", snapshot);
            if sink.send(snapshot).is_err() {
                debug!("search receiver is gone, dropping debounced filter");
            }
        }));
    }

    pub fn set_file_type(&mut self, value: &str) {
        self.draft.file_type = text(value);
    }

    pub fn set_min_size(&mut self, value: Option<u64>) {
        self.draft.min_size = value;
    }

    pub fn set_max_size(&mut self, value: Option<u64>) {
        self.draft.max_size = value;
    }

    pub fn set_date_range(&mut self, value: Option<DateRange>) {
        self.draft.date_range = value;
    }

    /// Emit the whole draft now
    pub fn submit(&mut self) {
        self.cancel();
        self.emit(self.draft.clone());
    }

    /// Clear every field and emit the empty filter set
    pub fn reset(&mut self) {
        self.cancel();
        self.draft = FilterSet::default();
        self.emit(FilterSet::default());
    }

    /// Clear only the filename, bypassing the debounce
    pub fn clear_filename(&mut self) {
        self.cancel();
        self.draft.filename = None;
        self.emit(self.draft.clone());
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    fn emit(&self, filter: FilterSet) {
        if self.sink.send(filter).is_err() {
            debug!("search receiver is gone, dropping filter");
        }
    }
}

impl Drop for SearchPanel {
    fn drop(&mut self) {
        self.cancel();
    }
}
