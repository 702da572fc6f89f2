//! Progress rendering.
//!
//! [`ProgressBoard`] subscribes to the task registry and keeps one progress
//! bar per task. When stderr is not a terminal it falls back to one plain
//! line per change.

use std::collections::HashMap;
use std::io::IsTerminal;

use clipper_tasks::{TaskId, TaskObserver, TaskRecord};
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use parking_lot::Mutex;

pub struct ProgressBoard {
    multi: Option<MultiProgress>,
    bars: Mutex<HashMap<TaskId, ProgressBar>>,
}

impl ProgressBoard {
    pub fn new() -> Self {
        let multi = std::io::stderr().is_terminal().then(MultiProgress::new);
        Self {
            multi,
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template("{prefix:>12.dim} [{bar:30.cyan/blue}] {pos:>3}% {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }

    /// Prints a line without tearing the progress bars.
    pub fn println(&self, line: impl AsRef<str>) {
        match &self.multi {
            Some(multi) => {
                if multi.println(line.as_ref()).is_err() {
                    eprintln!("{}", line.as_ref());
                }
            }
            None => eprintln!("{}", line.as_ref()),
        }
    }
}

impl Default for ProgressBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskObserver for ProgressBoard {
    fn on_created(&self, record: &TaskRecord) {
        let Some(multi) = &self.multi else {
            eprintln!("{} {} {}", "new".cyan(), record.id, record.title);
            return;
        };
        let bar = multi.add(ProgressBar::new(100));
        bar.set_style(Self::style());
        bar.set_prefix(record.id.to_string());
        bar.set_message(record.title.clone());
        bar.set_position(u64::from(record.progress));
        self.bars.lock().insert(record.id, bar);
    }

    fn on_progress(&self, record: &TaskRecord) {
        match self.bars.lock().get(&record.id) {
            Some(bar) => bar.set_position(u64::from(record.progress)),
            None if self.multi.is_none() => {
                eprintln!("{:>3}% {} {}", record.progress, record.id, record.title)
            }
            None => {}
        }
    }

    fn on_completed(&self, record: &TaskRecord) {
        let done = format!("{} {}", record.title, "done".green());
        match self.bars.lock().get(&record.id) {
            Some(bar) => bar.finish_with_message(done),
            None => eprintln!("{} {}", record.id, done),
        }
    }
}
