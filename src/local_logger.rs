use std::io::{IsTerminal, Write};
use std::sync::Mutex;
use std::time::Duration;

use console::{Style, style};
use indicatif::{ProgressBar, ProgressStyle};
use lazy_static::lazy_static;
use log::{Level, LevelFilter, Log, Metadata, Record};
use simplelog::{CombinedLogger, SharedLogger};

use crate::logger::{GroupEvent, get_group_event, tagged};
use crate::prelude::*;

pub const DEVICEFARM_U8_COLOR_CODE: u8 = 214; // #FFAF00
const LOG_LEVEL_VAR: &str = "DEVICEFARM_LOG";

lazy_static! {
    /// Spinner of the group currently open, only drawn on a TTY.
    static ref GROUP_SPINNER: Mutex<Option<ProgressBar>> = Mutex::new(None);
}

fn log_level_from_env() -> LevelFilter {
    std::env::var(LOG_LEVEL_VAR)
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Info)
}

fn open_spinner(name: &str) {
    let template = format!(
        "  {{spinner:>.{DEVICEFARM_U8_COLOR_CODE}}} {{wide_msg:.{DEVICEFARM_U8_COLOR_CODE}.bold}}"
    );
    let Ok(spinner_style) = ProgressStyle::with_template(&template) else {
        return;
    };
    let spinner = ProgressBar::new_spinner()
        .with_style(spinner_style)
        .with_message(format!("{name}..."));
    spinner.enable_steady_tick(Duration::from_millis(100));
    if let Ok(mut current) = GROUP_SPINNER.lock() {
        if let Some(previous) = current.replace(spinner) {
            previous.finish_and_clear();
        }
    }
}

fn close_spinner() {
    if let Ok(mut current) = GROUP_SPINNER.lock() {
        if let Some(spinner) = current.take() {
            spinner.finish_and_clear();
        }
    }
}

/// Line printed for `record`, tagged at info and above, with the target below.
fn format_record(record: &Record) -> String {
    match record.level() {
        Level::Error | Level::Warn | Level::Info => tagged(record.args()),
        level => format!("[{level}::{}] {}", record.target(), record.args()),
    }
}

fn level_style(level: Level) -> Style {
    match level {
        Level::Error => Style::new().red(),
        Level::Warn => Style::new().yellow(),
        Level::Info => Style::new().white(),
        Level::Debug => Style::new().blue().dim(),
        Level::Trace => Style::new().black().dim(),
    }
}

/// Console logger of the CLI: tagged lines, groups rendered as headers with a spinner.
pub struct LocalLogger {
    level: LevelFilter,
    is_tty: bool,
}

impl LocalLogger {
    pub fn new() -> Self {
        Self {
            level: log_level_from_env(),
            is_tty: std::io::stdout().is_terminal(),
        }
    }

    fn on_group_event(&self, event: GroupEvent) {
        match event {
            GroupEvent::Start(name) | GroupEvent::StartOpened(name) => {
                println!(
                    "\n{}",
                    style(format!("►►► {name} "))
                        .bold()
                        .color256(DEVICEFARM_U8_COLOR_CODE)
                );
                if self.is_tty {
                    open_spinner(&name);
                }
            }
            GroupEvent::End if self.is_tty => close_spinner(),
            GroupEvent::End => {}
        }
    }

    fn print(&self, record: &Record) {
        let line = level_style(record.level()).apply_to(format_record(record));
        let print_line = || match record.level() {
            Level::Error | Level::Warn => eprintln!("{line}"),
            _ => println!("{line}"),
        };
        // Lines printed under a running spinner would be overdrawn by its next tick
        let spinner = GROUP_SPINNER.lock().ok().and_then(|current| current.clone());
        match spinner {
            Some(spinner) if self.is_tty => spinner.suspend(print_line),
            _ => print_line(),
        }
    }
}

impl Default for LocalLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Log for LocalLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match get_group_event(record) {
            Some(event) => self.on_group_event(event),
            None => self.print(record),
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}

impl SharedLogger for LocalLogger {
    fn level(&self) -> LevelFilter {
        self.level
    }

    fn config(&self) -> Option<&simplelog::Config> {
        None
    }

    fn as_log(self: Box<Self>) -> Box<dyn Log> {
        Box::new(*self)
    }
}

pub fn init_local_logger() -> Result<()> {
    CombinedLogger::init(vec![Box::new(LocalLogger::new())]).context("Failed to init logger")?;
    Ok(())
}

/// Clears any spinner left open, before the process prints its last lines.
pub fn clean_logger() {
    close_spinner();
}
