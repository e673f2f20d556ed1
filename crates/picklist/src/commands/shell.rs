//! Interactive shell over an in-process engine and sync session.
//!
//! Reads one command per line from stdin. Command errors are reported and
//! the shell keeps going; only setup failures end the process.

use std::fmt::Write as _;
use std::io::IsTerminal;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use picklist_core::{ActionReport, AddReport, CatalogStats, Engine, Item, ItemId, Queued};
use picklist_sync::{ListSide, SyncSession};

use crate::cli::{GlobalOpts, OutputFormat, ShellArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

const PROMPT: &str = "picklist> ";

const HELP: &str = "\
Commands:
  available [more]            show the available list (more: load next page)
  selected [more]             show the selected list
  search available|selected [text]
                              filter a list by id substring (no text clears)
  add <id>                    request a new item
  select <id>                 move an item to the selected list
  unselect <id>               move an item back to the available list
  move <from> <to>            reorder the selected list by row number
  flush                       commit pending adds and actions now
  stats                       show catalog counters
  help                        show this text
  quit                        leave the shell";

// ── Command parsing ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Show { side: ListSide, more: bool },
    Search { side: ListSide, text: String },
    Add(ItemId),
    Select(ItemId),
    Unselect(ItemId),
    /// Zero-based display positions.
    Move { from: usize, to: usize },
    Flush,
    Stats,
    Help,
    Quit,
}

fn usage(line: &str) -> CliError {
    CliError::Usage {
        input: line.trim().to_owned(),
    }
}

fn parse_side(word: &str, line: &str) -> Result<ListSide, CliError> {
    match word {
        "available" | "a" => Ok(ListSide::Available),
        "selected" | "s" => Ok(ListSide::Selected),
        _ => Err(usage(line)),
    }
}

fn parse_position(raw: &str) -> Result<usize, CliError> {
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(CliError::Validation {
            field: "move".into(),
            reason: format!("'{raw}' is not a row number"),
        }),
    }
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, CliError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let words: Vec<&str> = trimmed.split_whitespace().collect();

    let cmd = match words.as_slice() {
        ["flush"] => ShellCommand::Flush,
        ["stats"] => ShellCommand::Stats,
        ["help" | "?"] => ShellCommand::Help,
        ["quit" | "exit" | "q"] => ShellCommand::Quit,
        ["add", id] => ShellCommand::Add(ItemId::parse(id)),
        ["select", id] => ShellCommand::Select(ItemId::parse(id)),
        ["unselect", id] => ShellCommand::Unselect(ItemId::parse(id)),
        ["move", from, to] => ShellCommand::Move {
            from: parse_position(from)?,
            to: parse_position(to)?,
        },
        ["search", side, rest @ ..] => ShellCommand::Search {
            side: parse_side(side, line)?,
            text: rest.join(" "),
        },
        [side] => ShellCommand::Show {
            side: parse_side(side, line)?,
            more: false,
        },
        [side, "more"] => ShellCommand::Show {
            side: parse_side(side, line)?,
            more: true,
        },
        _ => return Err(usage(line)),
    };
    Ok(Some(cmd))
}

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
}

#[derive(Serialize)]
struct FlushSummary {
    adds: AddReport,
    actions: ActionReport,
}

fn stamp(t: Option<DateTime<Utc>>) -> String {
    t.map_or_else(
        || "never".to_owned(),
        |t| t.format("%H:%M:%S%.3f").to_string(),
    )
}

fn stats_detail(stats: &CatalogStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total items:       {}", stats.total_items);
    let _ = writeln!(out, "Selected items:    {}", stats.selected_items);
    let _ = writeln!(out, "Pending adds:      {}", stats.pending_adds);
    let _ = writeln!(out, "Pending actions:   {}", stats.pending_actions);
    let _ = writeln!(out, "Revision:          {}", stats.revision);
    let _ = writeln!(out, "Last add flush:    {}", stamp(stats.last_add_flush));
    let _ = write!(out, "Last action flush: {}", stamp(stats.last_action_flush));
    out
}

fn flush_detail(summary: &FlushSummary) -> String {
    let (a, r) = (&summary.adds, &summary.actions);
    format!(
        "Adds: {} inserted, {} dropped\nActions: {} applied, {} no-op, {} stale, {} invalid",
        a.inserted, a.dropped, r.applied, r.noop, r.stale, r.invalid
    )
}

// ── Shell ───────────────────────────────────────────────────────────

struct Shell {
    engine: Engine,
    session: SyncSession<Engine>,
    format: OutputFormat,
    quiet: bool,
    color: bool,
}

impl Shell {
    /// Run one command. Returns `false` when the shell should exit.
    async fn execute(&self, cmd: ShellCommand) -> Result<bool, CliError> {
        match cmd {
            ShellCommand::Show { side, more } => {
                if more && !self.session.load_more(side).await? {
                    self.note(&format!("no more {side} items"));
                }
                self.print_list(side);
            }

            ShellCommand::Search { side, text } => {
                self.session.set_search(side, &text).await?;
                self.print_list(side);
            }

            ShellCommand::Add(id) => {
                let ack = self.session.add_item(id).await?;
                self.print_ack(&ack);
            }

            ShellCommand::Select(id) => {
                let ack = self.session.select(&id).await?;
                self.print_ack(&ack);
            }

            ShellCommand::Unselect(id) => {
                let ack = self.session.unselect(&id).await?;
                self.print_ack(&ack);
            }

            ShellCommand::Move { from, to } => {
                self.session.move_selected(from, to).await?;
                self.print_list(ListSide::Selected);
            }

            ShellCommand::Flush => {
                let summary = FlushSummary {
                    adds: self.engine.flush_adds(),
                    actions: self.engine.flush_actions(),
                };
                self.session.poll_all().await?;
                let out = output::render_single(self.format, &summary, flush_detail, |s| {
                    format!("{} {}", s.adds.inserted, s.actions.applied)
                });
                output::print_output(&out, self.quiet);
            }

            ShellCommand::Stats => {
                let stats = self.engine.stats();
                let out = output::render_single(self.format, &stats, stats_detail, |s| {
                    format!("{} {}", s.total_items, s.selected_items)
                });
                output::print_output(&out, self.quiet);
            }

            ShellCommand::Help => output::print_output(HELP, self.quiet),

            ShellCommand::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn print_list(&self, side: ListSide) {
        let items = self.session.displayed(side);
        let pending: Vec<bool> = self.session.with_list(side, |list| {
            items.iter().map(|i| list.is_pending_added(&i.id)).collect()
        });

        let out = output::render_list(
            self.format,
            items.as_slice(),
            |pos, item: &Item| ItemRow {
                position: pos + 1,
                id: item.id.to_string(),
                name: item.name.clone(),
                state: if pending.get(pos).copied().unwrap_or(false) {
                    output::accent("pending", self.color)
                } else {
                    String::new()
                },
            },
            |item| item.id.to_string(),
        );
        output::print_output(&out, self.quiet);

        if self.format == OutputFormat::Table {
            let more = if self.session.has_more(side) {
                "; 'more' loads the next page"
            } else {
                ""
            };
            self.note(&format!("{} {side} shown{more}", items.len()));
        }
    }

    fn print_ack(&self, ack: &Queued) {
        let out = output::render_single(
            self.format,
            ack,
            |a| a.message.clone().unwrap_or_else(|| "queued".into()),
            |_| "queued".into(),
        );
        output::print_output(&out, self.quiet);
    }

    fn note(&self, text: &str) {
        if self.format != OutputFormat::Json {
            output::print_output(&output::muted(text, self.color), self.quiet);
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ShellArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let (engine_config, sync_config) = config::resolve_shell(&cfg, &args)?;

    let engine = Engine::new(engine_config);
    engine.start().await?;
    let session = SyncSession::new(engine.clone(), sync_config);
    session.poll_all().await?;
    session.start().await?;

    let shell = Shell {
        engine: engine.clone(),
        session: session.clone(),
        format: config::output_format(global, &cfg),
        quiet: global.quiet,
        color: output::should_color(global.color),
    };

    let interactive = std::io::stdin().is_terminal();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if interactive {
            stdout.write_all(PROMPT.as_bytes()).await?;
            stdout.flush().await?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let cmd = match parse_line(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{:?}", miette::Report::new(err));
                continue;
            }
        };
        tracing::debug!(command = ?cmd, "shell command");
        match shell.execute(cmd).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => eprintln!("{:?}", miette::Report::new(err)),
        }
    }

    session.shutdown().await;
    engine.shutdown().await;
    Ok(())
}
