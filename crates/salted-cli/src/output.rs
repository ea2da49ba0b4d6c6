use std::io::Write;
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use salted_core::{ProgressEvent, Store};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Renders [`ProgressEvent`]s as one `indicatif` bar per phase. Workers call
/// into `report` concurrently from the URL/DOI pools, so the current bar is
/// guarded by a mutex — updates are cheap, and the store's own single-writer
/// rule doesn't extend to this purely cosmetic sink.
pub struct ProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
    to_stderr: bool,
}

impl ProgressReporter {
    pub fn new(to_stderr: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            to_stderr,
        }
    }

    pub fn report(&self, event: ProgressEvent) {
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };
        match event {
            ProgressEvent::UrlPhaseStarted { total, workers } => {
                *slot = Some(self.new_bar(total, &format!("URLs ({workers} workers)")));
            }
            ProgressEvent::UrlProbed { done, .. } | ProgressEvent::DoiProbed { done, .. } => {
                if let Some(bar) = slot.as_ref() {
                    bar.set_position(done as u64);
                }
            }
            ProgressEvent::UrlPhaseFinished | ProgressEvent::DoiPhaseFinished => {
                if let Some(bar) = slot.take() {
                    bar.finish_and_clear();
                }
            }
            ProgressEvent::DoiPhaseStarted { total, workers } => {
                *slot = Some(self.new_bar(total, &format!("DOIs ({workers} workers)")));
            }
        }
    }

    fn new_bar(&self, total: usize, label: &str) -> ProgressBar {
        let bar = ProgressBar::new(total as u64);
        if self.to_stderr {
            bar.set_draw_target(ProgressDrawTarget::stderr());
        }
        if let Ok(style) = ProgressStyle::with_template(
            "{msg} [{bar:40.cyan/dim}] {pos}/{len} ({eta})",
        ) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message(label.to_owned());
        bar
    }
}

/// Print the final summary: counts per classification plus file-access
/// errors, which `Engine::check` never surfaces on its own (they are an
/// ingest-side concern the CLI layers on top of the returned store).
pub fn print_summary(w: &mut dyn Write, store: &Store, color: ColorMode) -> std::io::Result<()> {
    writeln!(w)?;
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", "SUMMARY".bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{sep}")?;
        writeln!(w, "SUMMARY")?;
        writeln!(w, "{sep}")?;
    }

    if color.enabled() {
        writeln!(w, "  {} {}", "Valid URLs (cache + this run):".green(), store.valid_urls.len())?;
    } else {
        writeln!(w, "  Valid URLs (cache + this run): {}", store.valid_urls.len())?;
    }
    if !store.redirects.is_empty() {
        if color.enabled() {
            writeln!(w, "  {} {}", "Permanent redirects:".yellow(), store.redirects.len())?;
        } else {
            writeln!(w, "  Permanent redirects: {}", store.redirects.len())?;
        }
    }
    if !store.errors.is_empty() {
        if color.enabled() {
            writeln!(w, "  {} {}", "Dead links:".red(), store.errors.len())?;
        } else {
            writeln!(w, "  Dead links: {}", store.errors.len())?;
        }
    }
    if !store.exceptions.is_empty() {
        if color.enabled() {
            writeln!(w, "  {} {}", "Exceptions:".yellow(), store.exceptions.len())?;
        } else {
            writeln!(w, "  Exceptions: {}", store.exceptions.len())?;
        }
    }

    writeln!(
        w,
        "  DOIs valid: {}, invalid: {}",
        store.valid_dois.len(),
        store.invalid_dois.len()
    )?;

    if !store.file_access_errors.is_empty() {
        writeln!(w)?;
        if color.enabled() {
            writeln!(w, "{}", "Files skipped:".yellow())?;
        } else {
            writeln!(w, "Files skipped:")?;
        }
        for row in &store.file_access_errors {
            writeln!(w, "  {}: {}", row.file_path, row.reason)?;
        }
    }

    writeln!(w)?;
    Ok(())
}
