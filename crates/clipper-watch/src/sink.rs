//! Playback sinks for the terminal.
//!
//! There is no embedded player here: a result is "played" either by handing
//! its URL to the desktop opener or by printing it.

use clipper_tasks::{PlaybackSink, PlaybackSource};
use colored::Colorize;

/// Opens the video URL with the system's default handler.
pub struct BrowserSink {
    label: &'static str,
}

impl BrowserSink {
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }
}

impl PlaybackSink for BrowserSink {
    fn play(&self, source: &PlaybackSource) {
        println!("{} {} ({})", format!("[{}]", self.label).cyan(), source.url, source.mime_type);
        if let Err(e) = open::that(&source.url) {
            tracing::warn!(url = %source.url, error = %e, "failed to open player");
            eprintln!("Failed to open player: {}", e);
        }
    }
}

/// Prints the video URL and MIME type.
pub struct PrintSink {
    label: &'static str,
}

impl PrintSink {
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }

    pub fn line(&self, source: &PlaybackSource) -> String {
        format!("[{}] {} ({})", self.label, source.url, source.mime_type)
    }
}

impl PlaybackSink for PrintSink {
    fn play(&self, source: &PlaybackSource) {
        println!("{}", self.line(source));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn print_line_names_the_sink() {
        let source = PlaybackSource::for_video("http://localhost:8080", "cut_a.mp4");
        assert_eq!(
            PrintSink::new("player").line(&source),
            "[player] http://localhost:8080/api/videos/cut_a.mp4 (video/mp4)"
        );
    }
}
