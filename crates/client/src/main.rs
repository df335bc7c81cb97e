//! OneView command-line client.
//!
//! # Usage
//!
//! ```bash
//! oneview register --email ana@example.com --password 'Secret1!'
//! oneview login --email ana@example.com --password 'Secret1!'
//! oneview code            # show your public code
//! oneview send --to f5ff86b2 "hello"
//! oneview inbox
//! oneview read 17
//! oneview listen          # print push events
//! ```

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use oneview_client::views::{AlertKind, RotateOutcome};
use oneview_client::{logging, App, ConfigOverrides, Outcome, PushEvent};
use oneview_shared::{FieldErrors, MessageId};
use std::path::PathBuf;

/// OneView anonymous messaging client
#[derive(Parser, Debug)]
#[command(name = "oneview")]
#[command(version)]
struct Args {
    /// REST API base URL [env: ONEVIEW_API_BASE]
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Push base URL [env: ONEVIEW_WS_BASE]
    #[arg(long, global = true)]
    ws_base: Option<String>,

    /// Where the session token is kept [env: ONEVIEW_DATA_DIR]
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show who is logged in
    Status,
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Defaults to --password
        #[arg(long)]
        confirm: Option<String>,
    },
    Logout,
    /// Show your public code
    Code,
    /// Replace your public code with a new one
    Rotate,
    /// List received messages
    Inbox,
    /// Show one message
    Read { id: String },
    /// Reply to the sender of a message
    Reply { id: String, content: String },
    /// Send a message to a public code
    Send {
        #[arg(long)]
        to: String,
        content: String,
    },
    /// Print push events until the connection closes
    Listen,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = ConfigOverrides::from_env()
        .merge(ConfigOverrides {
            api_base: args.api_base,
            ws_base: args.ws_base,
            data_dir: args.data_dir,
        })
        .resolve()
        .context("invalid configuration")?;
    let app = App::build(config);

    match args.command {
        Command::Status => match app.session().state().user_id() {
            Some(user_id) => println!("Logged in as user {user_id}"),
            None => println!("Not logged in"),
        },
        Command::Login { email, password } => {
            let mut screen = app.login_screen();
            screen.form.email = email;
            screen.form.password = password;
            report(screen.submit().await)?;
            if let Some(user_id) = app.session().state().user_id() {
                println!("Logged in as user {user_id}");
            }
        }
        Command::Register { email, password, confirm } => {
            let mut screen = app.register_screen();
            screen.form.confirm_password = confirm.unwrap_or_else(|| password.clone());
            screen.form.email = email;
            screen.form.password = password;
            report(screen.submit().await)?;
        }
        Command::Logout => {
            app.session().logout();
            println!("Logged out");
        }
        Command::Code => {
            let dashboard = authenticated(&app)?.dashboard();
            dashboard.load().await;
            match dashboard.code() {
                Some(code) => println!("{code}"),
                None => bail!("could not fetch your public code"),
            }
        }
        Command::Rotate => match authenticated(&app)?.dashboard().rotate().await {
            RotateOutcome::Rotated(code) => println!("{code}"),
            RotateOutcome::AlreadyRotating => println!("A rotation is already in progress"),
            RotateOutcome::Failed => bail!("could not rotate your public code"),
        },
        Command::Inbox => {
            let dashboard = authenticated(&app)?.dashboard();
            dashboard.load().await;
            let rows = dashboard.rows(Utc::now());
            if rows.is_empty() {
                println!("No messages yet");
            }
            for row in rows {
                let status = if row.read { "read" } else { "new" };
                println!("{:>6}  {:<20} {:<5} {}", row.id, row.alias, status, row.received);
            }
        }
        Command::Read { id } => {
            let mut screen = authenticated(&app)?.message_view(MessageId(id));
            print_outcome(&screen.open().await);
            if let Some(message) = screen.message() {
                match &message.sender_code {
                    Some(code) => println!("From: {code}"),
                    None => println!("From: (unknown)"),
                }
                println!();
                println!("{}", message.message);
            }
        }
        Command::Reply { id, content } => {
            let mut screen = authenticated(&app)?.message_view(MessageId(id));
            let opened = screen.open().await;
            if screen.message().is_none() {
                print_outcome(&opened);
                bail!("message unavailable");
            }
            println!("{}", oneview_client::views::message_view::STALE_CODE_WARNING);
            screen.reply = content;
            report(screen.send_reply().await)?;
        }
        Command::Send { to, content } => {
            let mut screen = authenticated(&app)?.send_message_screen();
            screen.form.to_code = to;
            screen.form.content = content;
            report(screen.submit().await)?;
        }
        Command::Listen => {
            let push = authenticated(&app)?.push();
            let mut events = push.subscribe();
            while let Some(event) = events.next().await {
                match event {
                    PushEvent::Connected { user_id } => println!("connected as {user_id}"),
                    PushEvent::Message(payload) => println!("{payload}"),
                    PushEvent::Closed { code, reason } => {
                        println!("closed ({}) {reason}", code.map_or("-".into(), |c| c.to_string()));
                        break;
                    }
                    PushEvent::Error(e) => bail!("push connection failed: {e}"),
                }
            }
        }
    }

    Ok(())
}

fn authenticated(app: &App) -> Result<&App> {
    if !app.session().state().is_authenticated() {
        bail!("not logged in; run `oneview login` first");
    }
    Ok(app)
}

fn print_outcome(outcome: &Outcome) {
    if let Some(alert) = &outcome.alert {
        match alert.kind {
            AlertKind::Success => println!("{}: {}", alert.title(), alert.message),
            AlertKind::Error => eprintln!("{}: {}", alert.title(), alert.message),
        }
    }
}

/// Print a submission and fail the process on field errors or error alerts.
fn report(submission: Result<Outcome, FieldErrors>) -> Result<()> {
    let outcome = match submission {
        Ok(outcome) => outcome,
        Err(errors) => {
            for (field, message) in errors.iter() {
                eprintln!("{}: {message}", field.name());
            }
            bail!("invalid input");
        }
    };
    match outcome.alert {
        Some(alert) if alert.kind == AlertKind::Error => bail!("{}", alert.message),
        Some(alert) => println!("{}: {}", alert.title(), alert.message),
        None => {}
    }
    Ok(())
}
