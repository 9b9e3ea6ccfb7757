use std::time::Duration;

use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use crate::ui::icons::{CHECK, CROSS};

/// Single-line spinner for network operations.
///
/// Hidden when stderr is not a terminal so piped output and tests stay clean.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn new(message: impl Into<String>) -> Self {
        let bar = if console::Term::stderr().is_term() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("progress bar template is a valid static string");
        bar.set_style(spinner_style);
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    pub fn success(self, message: impl AsRef<str>) {
        self.bar.finish_and_clear();
        println!("{}{}", CHECK, style(message.as_ref()).green());
    }

    pub fn fail(self, message: impl AsRef<str>) {
        self.bar.finish_and_clear();
        eprintln!("{}{}", CROSS, style(message.as_ref()).red());
    }
}

/// Ask for a yes/no confirmation. `assume_yes` skips the prompt; a prompt
/// that cannot be shown (no TTY) counts as "no".
pub fn confirm(prompt: impl Into<String>, assume_yes: bool) -> bool {
    if assume_yes {
        return true;
    }
    Confirm::new()
        .with_prompt(prompt.into())
        .default(false)
        .interact()
        .unwrap_or(false)
}
