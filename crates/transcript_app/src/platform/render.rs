use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use transcript_core::{AppViewModel, JobStatus, LogLevel, Severity};

/// Line-oriented terminal renderer for the dashboard view model.
///
/// Only what changed since the previous frame is printed: new log lines, and the
/// status line when the label or the progress moved.
pub struct Renderer<W: Write> {
    out: W,
    color: bool,
    printed_logs: usize,
    last_status: Option<(String, u32)>,
}

impl Renderer<io::Stdout> {
    pub fn stdout() -> Self {
        let color = io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self::new(io::stdout(), color)
    }
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            printed_logs: 0,
            last_status: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn render(&mut self, view: &AppViewModel) {
        for line in view.logs.iter().skip(self.printed_logs) {
            let text = paint(&line.message, line.level, self.color);
            let _ = writeln!(self.out, "{text}");
        }
        self.printed_logs = view.logs.len();

        if view.status_label.is_empty() {
            return;
        }
        let status = (view.status_label.clone(), view.progress_done);
        if self.last_status.as_ref() == Some(&status) {
            return;
        }
        let line = format!(
            "[{}/{} {:>3.0}%] {}",
            view.progress_done,
            view.progress_total,
            view.percent(),
            view.status_label
        );
        let line = if self.color {
            line.cyan().to_string()
        } else {
            line
        };
        let _ = writeln!(self.out, "{line}");
        self.last_status = Some(status);
    }

    pub fn notice(&mut self, message: &str, severity: Severity) {
        let line = match (severity, self.color) {
            (Severity::Warning, true) => format!("! {message}").yellow().to_string(),
            (Severity::Warning, false) => format!("! {message}"),
            (Severity::Information, true) => format!("* {message}").dimmed().to_string(),
            (Severity::Information, false) => format!("* {message}"),
        };
        let _ = writeln!(self.out, "{line}");
    }

    /// One row per job: status, file name, then the output or the error.
    pub fn summary(&mut self, view: &AppViewModel) {
        if view.jobs.is_empty() {
            return;
        }
        let _ = writeln!(self.out);
        let width = view
            .jobs
            .iter()
            .map(|row| row.name.chars().count())
            .max()
            .unwrap_or(0);
        for row in &view.jobs {
            let status = format!("{:<12}", row.status.as_str());
            let status = if self.color {
                match row.status {
                    JobStatus::Done => status.green().to_string(),
                    JobStatus::Error => status.red().to_string(),
                    _ => status.dimmed().to_string(),
                }
            } else {
                status
            };
            let detail = match row.status {
                JobStatus::Error => row.error.as_str(),
                _ => row.output.as_str(),
            };
            let _ = writeln!(
                self.out,
                "{status} {:<width$}  [{}]  {detail}",
                row.name, row.language_label
            );
        }
        let _ = self.out.flush();
    }
}

fn paint(message: &str, level: LogLevel, color: bool) -> String {
    if !color {
        return message.to_string();
    }
    match level {
        LogLevel::Info => message.to_string(),
        LogLevel::Highlight => message.bold().to_string(),
        LogLevel::Success => message.green().to_string(),
        LogLevel::Warning => message.yellow().to_string(),
        LogLevel::Error => message.red().to_string(),
        LogLevel::Dim => message.dimmed().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcript_core::{JobRowView, LogLine};

    fn log(message: &str, level: LogLevel) -> LogLine {
        LogLine {
            message: message.to_string(),
            level,
        }
    }

    fn rendered(renderer: Renderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn prints_only_new_log_lines_and_changed_status() {
        let mut renderer = Renderer::new(Vec::new(), false);
        let mut view = AppViewModel {
            progress_total: 2,
            status_label: "Transcribing a.mp3 (1 MB, Spanish) [1/1]...".to_string(),
            logs: vec![log("Transcribing: a.mp3 (1 MB, Spanish)", LogLevel::Highlight)],
            ..AppViewModel::default()
        };
        renderer.render(&view);
        renderer.render(&view);

        view.logs.push(log("  Uploading to Deepgram...", LogLevel::Dim));
        view.progress_done = 1;
        renderer.render(&view);

        assert_eq!(
            rendered(renderer),
            "Transcribing: a.mp3 (1 MB, Spanish)\n\
             [0/2   0%] Transcribing a.mp3 (1 MB, Spanish) [1/1]...\n  \
             Uploading to Deepgram...\n\
             [1/2  50%] Transcribing a.mp3 (1 MB, Spanish) [1/1]...\n"
        );
    }

    #[test]
    fn summary_shows_output_or_error() {
        let mut renderer = Renderer::new(Vec::new(), false);
        let row = |name: &str, status, output: &str, error: &str| JobRowView {
            job_id: 1,
            name: name.to_string(),
            language: "es".to_string(),
            language_label: "Spanish".to_string(),
            status,
            output: output.to_string(),
            error: error.to_string(),
        };
        let view = AppViewModel {
            jobs: vec![
                row("a.mp3", JobStatus::Done, "out/Test_1.md", ""),
                row("bb.mp3", JobStatus::Error, "", "cancelled"),
            ],
            ..AppViewModel::default()
        };
        renderer.summary(&view);

        assert_eq!(
            rendered(renderer),
            "\ndone         a.mp3   [Spanish]  out/Test_1.md\n\
             error        bb.mp3  [Spanish]  cancelled\n"
        );
    }
}
