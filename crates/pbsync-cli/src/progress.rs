//! Terminal rendering of a migration run.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

use pbsync_core::{MigrationObserver, ProgressSink, Stage, Warning};

use crate::output;

const BAR_TEMPLATE: &str = "{msg} [{bar:40}] {percent}%";
const SPINNER_TEMPLATE: &str = "{spinner} {msg} {bytes} ({bytes_per_sec})";

/// Prints stage lines and draws the download progress bar.
#[derive(Default)]
pub struct TerminalObserver {
    bar: Mutex<Option<ProgressBar>>,
}

impl TerminalObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn take_bar(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|mut bar| bar.take())
    }
}

fn new_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) => {
            let bar = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
                bar.set_style(style.progress_chars("=> "));
            }
            bar
        }
        None => {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template(SPINNER_TEMPLATE) {
                bar.set_style(style);
            }
            bar
        }
    }
}

impl ProgressSink for TerminalObserver {
    fn start(&self, total: Option<u64>) {
        let bar = new_bar(total);
        bar.set_message("Downloading backup");
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn advance(&self, transferred: u64) {
        if let Ok(slot) = self.bar.lock()
            && let Some(bar) = slot.as_ref()
        {
            bar.set_position(transferred);
        }
    }

    fn finish(&self) {
        if let Some(bar) = self.take_bar() {
            bar.finish_and_clear();
        }
    }

    fn abandon(&self) {
        if let Some(bar) = self.take_bar() {
            bar.abandon();
        }
    }
}

impl MigrationObserver for TerminalObserver {
    fn stage_started(&self, stage: Stage) {
        output::status(stage.description());
    }

    fn warned(&self, warning: &Warning) {
        output::warning(&warning.to_string());
    }
}
