//! scopegate: permission oracle for coding-agent tool calls.
//!
//! Subcommands:
//!   - `check`: reads `{"tool_name": .., "rule_content": ..}` JSON from stdin,
//!     writes a permission decision to stdout.
//!   - `config get <key> [--global]` / `config set <key> <value> [--global]`
//!   - `allow <entry> [--scope <scope>]` / `deny <entry> [--scope <scope>]`
//!
//! A corrupt settings file triggers an interactive reset-or-exit prompt.

use std::io::Read;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use scopegate::config::Config;
use scopegate::recovery::{self, RecoveryChoice, TerminalPrompt};
use scopegate::settings::ConfigKey;
use scopegate::{PermissionService, Scope, SettingsError, logging};

const USAGE: &str = "usage: scopegate check < input.json
       scopegate config get <key> [--global]
       scopegate config set <key> <value> [--global]
       scopegate allow <tool[:content]> [--scope user|project|local]
       scopegate deny <tool[:content]> [--scope user|project|local]";

#[derive(Deserialize)]
struct CheckInput {
    tool_name: Option<String>,
    rule_content: Option<String>,
    scopes: Option<Vec<Scope>>,
}

#[derive(Debug, PartialEq)]
enum Command {
    Check,
    ConfigGet { key: String, global: bool },
    ConfigSet { key: String, value: String, global: bool },
    Allow { entry: String, scope: Scope },
    Deny { entry: String, scope: Scope },
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let global = args.iter().any(|a| a == "--global" || a == "-g");
    let scope = match args.iter().position(|a| a == "--scope") {
        Some(i) => args
            .get(i + 1)
            .ok_or("--scope needs a value")?
            .parse::<Scope>()?,
        None => Scope::Local,
    };
    let positional: Vec<&str> = args
        .iter()
        .enumerate()
        .filter(|(i, a)| !a.starts_with('-') && !(*i > 0 && args[i - 1] == "--scope"))
        .map(|(_, a)| a.as_str())
        .collect();

    match positional.as_slice() {
        ["check"] => Ok(Command::Check),
        ["config", "get", key] => Ok(Command::ConfigGet {
            key: key.to_string(),
            global,
        }),
        ["config", "set", key, value] => Ok(Command::ConfigSet {
            key: key.to_string(),
            value: value.to_string(),
            global,
        }),
        ["allow", entry] => Ok(Command::Allow {
            entry: entry.to_string(),
            scope,
        }),
        ["deny", entry] => Ok(Command::Deny {
            entry: entry.to_string(),
            scope,
        }),
        _ => Err("unrecognized arguments".into()),
    }
}

/// Run one command. Returns what to print on stdout.
fn run(service: &mut PermissionService, command: &Command, input: &str) -> scopegate::Result<String> {
    match command {
        Command::Check => {
            let check: CheckInput = serde_json::from_str(input)?;
            let Some(tool_name) = check.tool_name.filter(|t| !t.is_empty()) else {
                return Ok(String::new());
            };
            let decision = service.resolve(
                &tool_name,
                check.rule_content.as_deref(),
                check.scopes.as_deref(),
            )?;
            let output = serde_json::json!({
                "permissionDecision": decision.behavior().as_str(),
                "permissionDecisionReason": decision.reason(),
                "matchedRule": decision.matched_rule,
            });
            Ok(serde_json::to_string(&output)?)
        }
        Command::ConfigGet { key, global } => {
            let key = ConfigKey::parse(key, *global)?;
            Ok(service.get_config_value(key)?.to_string())
        }
        Command::ConfigSet { key, value, global } => {
            let key = ConfigKey::parse(key, *global)?;
            let value: Value =
                serde_json::from_str(value).unwrap_or_else(|_| Value::from(value.as_str()));
            service.set_config_value(key, value)?;
            Ok(String::new())
        }
        Command::Allow { entry, scope } => {
            let added = service.allow_tool(*scope, entry)?;
            Ok(if added {
                format!("allowed {entry} in {scope} settings")
            } else {
                format!("{entry} unchanged in {scope} settings")
            })
        }
        Command::Deny { entry, scope } => {
            let added = service.deny_tool(*scope, entry)?;
            Ok(if added {
                format!("denied {entry} in {scope} settings")
            } else {
                format!("{entry} unchanged in {scope} settings")
            })
        }
    }
}

fn main() {
    let config = Config::load();
    logging::init(&config.logging);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("scopegate: {e}\n{USAGE}");
            std::process::exit(2);
        }
    };

    let mut input = String::new();
    if command == Command::Check && std::io::stdin().read_to_string(&mut input).is_err() {
        eprintln!("failed to read stdin");
        std::process::exit(1);
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut service = PermissionService::from_config(&config, &cwd);

    // At most one reset per invocation: a file that is corrupt again right
    // after a reset is not something the prompt can fix.
    let mut reset_done = false;
    loop {
        match run(&mut service, &command, &input) {
            Ok(output) => {
                if !output.is_empty() {
                    println!("{output}");
                }
                return;
            }
            Err(SettingsError::Corrupt(corruption)) if !reset_done => {
                match recovery::recover(service.store_mut(), &corruption, &mut TerminalPrompt) {
                    Ok(RecoveryChoice::Reset) => reset_done = true,
                    Ok(RecoveryChoice::Exit) => std::process::exit(1),
                    Err(e) => {
                        eprintln!("scopegate: {e}");
                        std::process::exit(1);
                    }
                }
            }
            Err(e) => {
                eprintln!("scopegate: {e}");
                std::process::exit(1);
            }
        }
    }
}
