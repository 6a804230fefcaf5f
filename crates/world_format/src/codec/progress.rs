use std::cell::Cell;

/// Receives fractional completion in `[0.0, 1.0]` while a world loads or saves.
///
/// Called synchronously on the thread running the codec. Implementations
/// should return quickly; the codec never waits on them for anything else.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, fraction: f32);
}

impl<F> ProgressSink for F
where
    F: Fn(f32) + Send + Sync,
{
    fn on_progress(&self, fraction: f32) {
        self(fraction)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _fraction: f32) {}
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Load { total_bytes: usize },
    Save { section_count: usize },
}

/// Per-operation progress state. Never reports a fraction lower than the last one.
pub(crate) struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    mode: Mode,
    rows_per_report: u32,
    section_index: Cell<usize>,
    last: Cell<Option<f32>>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn for_load(sink: &'a dyn ProgressSink, total_bytes: usize, rows_per_report: u32) -> Self {
        Self::new(sink, Mode::Load { total_bytes }, rows_per_report)
    }

    pub(crate) fn for_save(sink: &'a dyn ProgressSink, section_count: usize, rows_per_report: u32) -> Self {
        Self::new(sink, Mode::Save { section_count }, rows_per_report)
    }

    fn new(sink: &'a dyn ProgressSink, mode: Mode, rows_per_report: u32) -> Self {
        Self {
            sink,
            mode,
            rows_per_report: rows_per_report.max(1),
            section_index: Cell::new(0),
            last: Cell::new(None),
        }
    }

    pub(crate) fn report(&self, fraction: f32) {
        let fraction = fraction.clamp(0.0, 1.0);
        if self.last.get().is_some_and(|last| fraction <= last) {
            return;
        }
        self.last.set(Some(fraction));
        self.sink.on_progress(fraction);
    }

    pub(crate) fn report_bytes(&self, consumed: usize) {
        if let Mode::Load { total_bytes } = self.mode {
            if total_bytes > 0 {
                self.report(consumed as f32 / total_bytes as f32);
            }
        }
    }

    /// Marks the start of save section `index`.
    pub(crate) fn begin_section(&self, index: usize) {
        self.section_index.set(index);
    }

    pub(crate) fn end_section(&self) {
        if let Mode::Save { section_count } = self.mode {
            let done = self.section_index.get() + 1;
            self.report(done as f32 / section_count.max(1) as f32);
        }
    }

    /// Called once per finished tile row; reports every `rows_per_report` rows.
    pub(crate) fn tile_row_done(&self, rows_done: u32, total_rows: u32, byte_position: usize) {
        if rows_done % self.rows_per_report != 0 || rows_done >= total_rows {
            return;
        }
        match self.mode {
            Mode::Load { .. } => self.report_bytes(byte_position),
            Mode::Save { section_count } => {
                let within = rows_done as f32 / total_rows.max(1) as f32;
                let index = self.section_index.get() as f32;
                self.report((index + within) / section_count.max(1) as f32);
            }
        }
    }

    pub(crate) fn finish(&self) {
        self.report(1.0);
    }
}
