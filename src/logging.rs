use std::fs::OpenOptions;

use log::{LevelFilter, info};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};

use crate::config::LoggingConfig;
use crate::eval::ResolvedDecision;

/// Install the process logger: decisions and info-level events append to
/// `<data dir>/scopegate/decisions.log`; stderr gets the configured level
/// when verbose. Failures to open the log file are ignored.
pub fn init(config: &LoggingConfig) {
    let level = config.level.parse().unwrap_or(LevelFilter::Warn);
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    if config.verbose {
        loggers.push(TermLogger::new(
            level.max(LevelFilter::Debug),
            log_config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }

    if let Some(data_dir) = dirs::data_local_dir() {
        let log_dir = data_dir.join("scopegate");
        let _ = std::fs::create_dir_all(&log_dir);
        if let Ok(file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("decisions.log"))
        {
            loggers.push(WriteLogger::new(level.max(LevelFilter::Info), log_config, file));
        }
    }

    let _ = CombinedLogger::init(loggers);
}

/// Record one resolved decision.
pub fn log_decision(tool_name: &str, rule_content: Option<&str>, decision: &ResolvedDecision) {
    info!(target: "decision", "{}", decision_line(tool_name, rule_content, decision));
}

/// `DECISION<TAB>tool[:content]<TAB>reason`, on a single line.
fn decision_line(tool_name: &str, rule_content: Option<&str>, decision: &ResolvedDecision) -> String {
    let request: String = match rule_content {
        Some(content) => format!("{tool_name}:{content}"),
        None => tool_name.to_string(),
    }
    .chars()
    .take(200)
    .collect();
    let reason_oneline = decision.reason().replace('\n', "; ");
    format!(
        "{}\t{}\t{}",
        decision.behavior().as_str(),
        request.replace('\n', "; "),
        reason_oneline
    )
}
