//! Shared output formatting for taskdeck commands.
//!
//! Every command either prints a human summary or, with `--json`, one
//! envelope: `{schema_version, command, status, data, warnings, next_steps}`.

use std::fmt::Write as _;

use serde::Serialize;

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: &str = "taskdeck.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Plain-text report: a header line, then optional sections.
#[derive(Debug, Clone, Default)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..Self::default()
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }

    pub fn extend_warnings<I: IntoIterator<Item = String>>(&mut self, warnings: I) {
        self.warnings.extend(warnings);
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "is_empty")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    next_steps: &'a [String],
}

fn is_empty(items: &&[String]) -> bool {
    items.is_empty()
}

impl<T: Serialize> Envelope<'_, T> {
    fn print(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        return Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data: Some(data),
            error: None,
            warnings: human.map(|h| h.warnings.as_slice()).unwrap_or_default(),
            next_steps: human.map(|h| h.next_steps.as_slice()).unwrap_or_default(),
        }
        .print();
    }

    match human {
        Some(human) if !options.quiet => println!("{}", format_human(human)),
        _ => {}
    }
    Ok(())
}

/// Print a document (CSV, backup JSON) as-is.
pub fn emit_raw(options: OutputOptions, content: &str) {
    if options.quiet {
        return;
    }
    print!("{content}");
    if !content.ends_with('\n') {
        println!();
    }
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        return Envelope::<()> {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            data: None,
            error: Some(ErrorBody {
                message: err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            }),
            warnings: &[],
            next_steps: &next_steps,
        }
        .print();
    }

    eprintln!("error: {err}");
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut text = output.header.clone();

    if !output.summary.is_empty() {
        text.push_str("\n\nSummary:");
        for (key, value) in &output.summary {
            if value.is_empty() {
                let _ = write!(text, "\n- {key}");
            } else {
                let _ = write!(text, "\n- {key}: {value}");
            }
        }
    }

    let sections = [
        ("Details", &output.details),
        ("Warnings", &output.warnings),
        ("Next steps", &output.next_steps),
    ];
    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        let _ = write!(text, "\n\n{title}:");
        for item in items {
            let _ = write!(text, "\n- {item}");
        }
    }
    text
}

/// Best-effort command name (`task new`, `board`, ...) for error envelopes.
pub fn infer_command_name_from_args() -> String {
    command_name(std::env::args().skip(1))
}

/// Global flags that take a value.
const VALUE_FLAGS: [&str; 4] = ["--root", "--author", "--remote-url", "--remote-key"];

/// Commands whose first positional argument is a subcommand.
const GROUPS: [&str; 7] = ["task", "project", "export", "settings", "notify", "auth", "sync"];

fn command_name<I: Iterator<Item = String>>(mut args: I) -> String {
    let mut positional = Vec::with_capacity(2);
    while let Some(arg) = args.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            args.next();
        } else if !arg.starts_with('-') {
            positional.push(arg);
            let grouped = positional.len() == 1 && GROUPS.contains(&positional[0].as_str());
            if !grouped {
                break;
            }
        }
    }

    match positional.as_slice() {
        [] => "taskdeck".to_string(),
        [command] => command.clone(),
        [group, sub, ..] => format!("{group} {sub}"),
    }
}

fn error_kind(err: &Error) -> &'static str {
    if err.exit_code() == crate::error::exit_codes::USER_ERROR {
        "user_error"
    } else {
        "operation_failed"
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    let step = match err {
        Error::NotSignedIn => "taskdeck auth login <email>",
        Error::RemoteNotConfigured => "set [remote] url and anon_key in .taskdeck.toml",
        Error::NotFound { kind: "task", .. } => "taskdeck task list",
        Error::NotFound { kind: "project", .. } => "taskdeck project list",
        Error::InvalidConfig(_) => "fix .taskdeck.toml then retry",
        Error::LockFailed(_) => "retry once the other taskdeck process finishes",
        _ => return Vec::new(),
    };
    vec![step.to_string()]
}
