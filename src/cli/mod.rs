//! Command-line interface for taskdeck
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::board::{Board, OpenReport};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{NotificationSettings, Priority, Status};
use crate::notify::{effective_targets, Channel, Delivery, Notifier};
use crate::output::{HumanOutput, OutputOptions};
use crate::remote::{self, RemoteClient, Session};
use crate::storage::LocalStore;
use crate::sync::{Dispatcher, DrainReport, Effect};
use crate::views::kanban::Swimlane;

mod auth;
mod data;
mod project;
mod serve;
mod settings;
mod sync;
mod task;
mod views;

/// taskdeck - projects, tasks and a kanban board
///
/// Local-first task tracking with calendar, timeline and dashboard views,
/// outbound notifications and optional sync to a hosted backend.
#[derive(Parser, Debug)]
#[command(name = "taskdeck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding `.taskdeck.toml` and `data/`
    #[arg(long, global = true, env = "TASKDECK_ROOT")]
    pub root: Option<PathBuf>,

    /// Author name for new comments
    #[arg(long, global = true)]
    pub author: Option<String>,

    /// Override `[remote] url`
    #[arg(long, global = true, env = "TASKDECK_REMOTE_URL", hide = true)]
    pub remote_url: Option<String>,

    /// Override `[remote] anon_key`
    #[arg(long, global = true, env = "TASKDECK_REMOTE_KEY", hide = true, hide_env_values = true)]
    pub remote_key: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Project management
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Kanban board, one column per status
    Board {
        /// Only tasks in this project (id or name)
        #[arg(long)]
        project: Option<String>,

        /// Only tasks with this assignee
        #[arg(long)]
        assignee: Option<String>,

        /// Free-text filter on title and assignee
        #[arg(long)]
        search: Option<String>,

        /// Split columns into swimlanes
        #[arg(long, value_enum)]
        swimlane: Option<Swimlane>,
    },

    /// Month calendar of due dates
    Calendar {
        /// Month as YYYY-MM (defaults to the current month)
        #[arg(long)]
        month: Option<String>,
    },

    /// Project timeline with milestones
    Timeline,

    /// Totals, overdue work and project progress
    Dashboard {
        /// Evaluate as of this date (YYYY-MM-DD)
        #[arg(long)]
        today: Option<String>,
    },

    /// Export tasks as CSV or the full state as a JSON backup
    #[command(subcommand)]
    Export(ExportCommands),

    /// Replace local state with a JSON backup
    Import {
        /// Backup file written by `export json`
        file: PathBuf,
    },

    /// Notification destination settings
    #[command(subcommand)]
    Settings(SettingsCommands),

    /// Notification tools
    #[command(subcommand)]
    Notify(NotifyCommands),

    /// Sign in to the hosted backend
    #[command(subcommand)]
    Auth(AuthCommands),

    /// Mirror local state to and from the hosted backend
    #[command(subcommand)]
    Sync(SyncCommands),

    /// Follow the realtime change feed and apply it locally
    Watch {
        /// Stop after this many changes
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Run the reference notification endpoint
    Serve {
        /// Address to bind (defaults to `[server] bind`)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Upgrade stored data to the current schema
    Migrate,
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    New {
        /// Task title
        title: String,

        /// Project id or name
        #[arg(long)]
        project: Option<String>,

        #[arg(long)]
        assignee: Option<String>,

        #[arg(long, value_enum)]
        priority: Option<Priority>,

        #[arg(long, value_enum)]
        status: Option<Status>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Estimate in hours
        #[arg(long)]
        estimate: Option<f64>,
    },

    /// Edit task fields; empty strings clear project and due date
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        project: Option<String>,

        #[arg(long)]
        assignee: Option<String>,

        #[arg(long, value_enum)]
        priority: Option<Priority>,

        #[arg(long, value_enum)]
        status: Option<Status>,

        #[arg(long)]
        due: Option<String>,

        #[arg(long)]
        estimate: Option<f64>,
    },

    /// Move a task to another status lane
    Move {
        id: String,

        /// todo, in-progress, blocked or done
        status: String,
    },

    /// Delete a task
    Delete { id: String },

    /// Add a comment
    Comment {
        id: String,

        /// Comment text
        body: String,
    },

    /// Attach a file (uploaded when signed in, inlined otherwise)
    Attach {
        id: String,

        file: PathBuf,

        /// Display name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// List tasks
    List {
        #[arg(long)]
        project: Option<String>,

        #[arg(long)]
        assignee: Option<String>,

        #[arg(long, value_enum)]
        status: Option<Status>,

        #[arg(long)]
        search: Option<String>,
    },

    /// Show one task with comments and attachments
    Show { id: String },
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project
    New {
        name: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Milestone line `YYYY-MM-DD - Title`; repeatable
        #[arg(long = "milestone")]
        milestones: Vec<String>,
    },

    /// Edit a project; empty strings clear dates
    Edit {
        /// Project id or name
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        /// Replace all milestones; repeatable
        #[arg(long = "milestone")]
        milestones: Vec<String>,

        /// Remove all milestones
        #[arg(long, conflicts_with = "milestones")]
        clear_milestones: bool,
    },

    /// Delete a project; its tasks become unassigned
    Delete {
        /// Project id or name
        id: String,
    },

    /// List projects
    List,
}

/// Export subcommands
#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    /// Tasks as CSV
    Csv {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Full backup as JSON
    Json {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Settings subcommands
#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Show stored and effective destinations
    Show,

    /// Set destinations; an empty value unsets
    Set {
        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        slack: Option<String>,
    },
}

/// Notify subcommands
#[derive(Subcommand, Debug)]
pub enum NotifyCommands {
    /// Send one test notification
    Test {
        #[arg(long, value_enum, default_value = "email")]
        channel: Channel,

        /// Destination (defaults to the configured one)
        #[arg(long)]
        to: Option<String>,

        #[arg(long, default_value = "taskdeck test")]
        subject: String,

        #[arg(long, default_value = "This is a test notification from taskdeck.")]
        message: String,
    },
}

/// Auth subcommands
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Email a sign-in link and code
    Login { email: String },

    /// Finish sign-in with the emailed code or the redirect URL
    Verify {
        /// Email the code was sent to
        #[arg(long, required_unless_present = "redirect_url")]
        email: Option<String>,

        /// One-time code from the email
        #[arg(long, requires = "email", conflicts_with = "redirect_url")]
        code: Option<String>,

        /// URL the sign-in link redirected to
        #[arg(long)]
        redirect_url: Option<String>,
    },

    /// Sign out and forget the session
    Logout,

    /// Show the current session
    Status,
}

/// Sync subcommands
#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// Fetch remote records and fold them in by id
    Pull,

    /// Upsert every local record to the remote
    Push,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute())
    }

    async fn execute(self) -> Result<()> {
        let global = GlobalArgs {
            root: self.root,
            author: self.author,
            remote_url: self.remote_url,
            remote_key: self.remote_key,
            output: OutputOptions {
                json: self.json,
                quiet: self.quiet,
            },
        };

        match self.command {
            Commands::Task(cmd) => match cmd {
                TaskCommands::New {
                    title,
                    project,
                    assignee,
                    priority,
                    status,
                    due,
                    estimate,
                } => {
                    task::run_new(task::NewOptions {
                        title,
                        project,
                        assignee,
                        priority,
                        status,
                        due,
                        estimate,
                        global,
                    })
                    .await
                }
                TaskCommands::Edit {
                    id,
                    title,
                    project,
                    assignee,
                    priority,
                    status,
                    due,
                    estimate,
                } => {
                    task::run_edit(task::EditOptions {
                        id,
                        title,
                        project,
                        assignee,
                        priority,
                        status,
                        due,
                        estimate,
                        global,
                    })
                    .await
                }
                TaskCommands::Move { id, status } => {
                    task::run_move(task::MoveOptions { id, status, global }).await
                }
                TaskCommands::Delete { id } => {
                    task::run_delete(task::DeleteOptions { id, global }).await
                }
                TaskCommands::Comment { id, body } => {
                    task::run_comment(task::CommentOptions { id, body, global }).await
                }
                TaskCommands::Attach { id, file, name } => {
                    task::run_attach(task::AttachOptions {
                        id,
                        file,
                        name,
                        global,
                    })
                    .await
                }
                TaskCommands::List {
                    project,
                    assignee,
                    status,
                    search,
                } => task::run_list(task::ListOptions {
                    project,
                    assignee,
                    status,
                    search,
                    global,
                }),
                TaskCommands::Show { id } => task::run_show(task::ShowOptions { id, global }),
            },
            Commands::Project(cmd) => match cmd {
                ProjectCommands::New {
                    name,
                    start,
                    end,
                    milestones,
                } => {
                    project::run_new(project::NewOptions {
                        name,
                        start,
                        end,
                        milestones,
                        global,
                    })
                    .await
                }
                ProjectCommands::Edit {
                    id,
                    name,
                    start,
                    end,
                    milestones,
                    clear_milestones,
                } => {
                    project::run_edit(project::EditOptions {
                        id,
                        name,
                        start,
                        end,
                        milestones,
                        clear_milestones,
                        global,
                    })
                    .await
                }
                ProjectCommands::Delete { id } => {
                    project::run_delete(project::DeleteOptions { id, global }).await
                }
                ProjectCommands::List => project::run_list(global),
            },
            Commands::Board {
                project,
                assignee,
                search,
                swimlane,
            } => views::run_board(views::BoardOptions {
                project,
                assignee,
                search,
                swimlane,
                global,
            }),
            Commands::Calendar { month } => {
                views::run_calendar(views::CalendarOptions { month, global })
            }
            Commands::Timeline => views::run_timeline(global),
            Commands::Dashboard { today } => {
                views::run_dashboard(views::DashboardOptions { today, global })
            }
            Commands::Export(cmd) => match cmd {
                ExportCommands::Csv { output } => data::run_export_csv(output, global),
                ExportCommands::Json { output } => data::run_export_json(output, global),
            },
            Commands::Import { file } => data::run_import(file, global),
            Commands::Migrate => data::run_migrate(global),
            Commands::Settings(cmd) => match cmd {
                SettingsCommands::Show => settings::run_show(global),
                SettingsCommands::Set { email, slack } => {
                    settings::run_set(settings::SetOptions {
                        email,
                        slack,
                        global,
                    })
                }
            },
            Commands::Notify(NotifyCommands::Test {
                channel,
                to,
                subject,
                message,
            }) => {
                settings::run_notify_test(settings::NotifyTestOptions {
                    channel,
                    to,
                    subject,
                    message,
                    global,
                })
                .await
            }
            Commands::Auth(cmd) => match cmd {
                AuthCommands::Login { email } => auth::run_login(email, global).await,
                AuthCommands::Verify {
                    email,
                    code,
                    redirect_url,
                } => {
                    auth::run_verify(auth::VerifyOptions {
                        email,
                        code,
                        redirect_url,
                        global,
                    })
                    .await
                }
                AuthCommands::Logout => auth::run_logout(global).await,
                AuthCommands::Status => auth::run_status(global),
            },
            Commands::Sync(cmd) => match cmd {
                SyncCommands::Pull => sync::run_pull(global).await,
                SyncCommands::Push => sync::run_push(global).await,
            },
            Commands::Watch { limit } => sync::run_watch(limit, global).await,
            Commands::Serve { bind } => serve::run(bind, global).await,
        }
    }
}

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub root: Option<PathBuf>,
    pub author: Option<String>,
    pub remote_url: Option<String>,
    pub remote_key: Option<String>,
    pub output: OutputOptions,
}

/// Everything a command needs, resolved once.
pub struct Context {
    pub config: Config,
    pub store: LocalStore,
    pub session: Option<Session>,
    pub author: Option<String>,
    pub output: OutputOptions,
}

pub(crate) fn load_context(global: GlobalArgs) -> Result<Context> {
    let root = resolve_root(global.root)?;
    let config =
        Config::load_from_root(&root).with_remote_overrides(global.remote_url, global.remote_key);
    let store = LocalStore::for_root(&root);
    let session = remote::load_session(&store);
    tracing::debug!(root = %root.display(), signed_in = session.is_some(), "loaded context");
    Ok(Context {
        config,
        store,
        session,
        author: global.author,
        output: global.output,
    })
}

fn resolve_root(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(root) = explicit.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(root);
    }
    directories::ProjectDirs::from("", "", "taskdeck")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::InvalidConfig("cannot determine a data directory; pass --root".to_string())
        })
}

impl Context {
    /// Open the board, turning skipped records into warnings.
    pub fn open_board(&self) -> (Board, Vec<String>) {
        let (board, report) = Board::open(self.store.clone());
        (board, open_warnings(&report))
    }

    pub fn author(&self) -> String {
        let email = self
            .session
            .as_ref()
            .and_then(|session| session.user.email.as_deref());
        crate::author::resolve_author(&self.config, self.author.as_deref(), email)
    }

    /// Client for the configured backend, carrying the session if any.
    pub fn remote(&self) -> Result<RemoteClient> {
        Ok(RemoteClient::from_config(&self.config.remote)?.with_session(self.session.clone()))
    }

    /// Signed-in client, refreshing an expired session first.
    pub async fn signed_in(&mut self) -> Result<RemoteClient> {
        let client = self.remote()?;
        let session = client.require_session()?.clone();
        if !session.is_expired(chrono::Utc::now()) {
            return Ok(client);
        }
        let refreshed = client.refresh_session(&session).await?;
        remote::save_session(&self.store, &refreshed)?;
        tracing::debug!(user = %refreshed.user.id, "refreshed session");
        self.session = Some(refreshed.clone());
        Ok(client.with_session(Some(refreshed)))
    }

    /// Signed-in client when available; local-only otherwise.
    pub async fn sync_remote(&mut self) -> Option<RemoteClient> {
        if self.session.is_none() || self.config.remote.credentials().is_none() {
            return None;
        }
        match self.signed_in().await {
            Ok(client) => Some(client),
            Err(err) => {
                tracing::warn!(error = %err, "remote unavailable, continuing local-only");
                None
            }
        }
    }

    pub fn notifier(&self, stored: &NotificationSettings) -> Notifier {
        Notifier::new(
            self.config.notify.endpoint.clone(),
            effective_targets(stored, &self.config.notify.defaults()),
        )
    }

    /// Dispatch effects and wait for them, reporting failures as warnings.
    pub async fn run_effects(
        &mut self,
        board: &Board,
        effects: Vec<Effect>,
        human: &mut HumanOutput,
    ) -> DrainReport {
        if effects.is_empty() {
            return DrainReport::default();
        }
        let remote = self.sync_remote().await;
        let mut dispatcher = Dispatcher::new(remote, self.notifier(board.settings()));
        dispatcher.dispatch(effects);
        let report = dispatcher.drain().await;
        for failure in &report.sync_failures {
            human.push_warning(format!("remote sync failed: {failure}"));
        }
        for delivery in &report.deliveries {
            human.push_detail(describe_delivery(delivery));
        }
        report
    }
}

pub(crate) fn open_warnings(report: &OpenReport) -> Vec<String> {
    report
        .skipped
        .iter()
        .map(|skipped| {
            format!(
                "skipped stored {} record #{}{}: {}",
                skipped.key,
                skipped.index,
                skipped
                    .id
                    .as_deref()
                    .map(|id| format!(" ({id})"))
                    .unwrap_or_default(),
                skipped.reason
            )
        })
        .collect()
}

pub(crate) fn describe_delivery(delivery: &Delivery) -> String {
    match delivery {
        Delivery::Accepted { channel, to, .. } => {
            format!("notified {} {}", channel.as_str(), to)
        }
        Delivery::Simulated { channel, to, reason } => {
            format!("notification to {} {} simulated ({reason})", channel.as_str(), to)
        }
        Delivery::Skipped { channel, reason } => {
            format!("{} notification skipped ({reason})", channel.as_str())
        }
    }
}
