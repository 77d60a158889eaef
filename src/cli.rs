use std::{
    env,
    io::{self, Write},
    process::{Command, Stdio},
    sync::Arc,
    time::Duration,
};

use anyhow::{anyhow, Context};
use chrono::Local;
use tokio::time::MissedTickBehavior;

use desktop_agenda::{
    agenda::{build_entries, AgendaEntry, ClockFace, PresentationOptions},
    app::{AgendaApp, TickOutcome},
    calendar::CalendarEvent,
    storage::{
        config::Config,
        preferences::{Preferences, PreferencesStore},
    },
    sync::{AgendaSync, GoogleAuthenticator, GoogleCalendarClient},
};

pub const USAGE: &str = "Usage: desktop-agenda [--agenda | --open N | --prefs | --set KEY=VALUE]";

#[derive(Debug, Clone, PartialEq)]
pub enum CliMode {
    Watch,
    Agenda,
    Open(usize),
    ShowPreferences,
    SetPreference { key: String, value: String },
    Help,
}

pub fn parse_cli_mode<I>(args: I) -> Result<CliMode, String>
where
    I: IntoIterator<Item = String>,
{
    let mut mode = CliMode::Watch;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        mode = match arg.as_str() {
            "--agenda" => CliMode::Agenda,
            "--open" => {
                let raw = args.next().ok_or("--open needs an entry number")?;
                let index = raw.parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| format!("Invalid entry number '{}'", raw))?;
                CliMode::Open(index)
            }
            "--prefs" => CliMode::ShowPreferences,
            "--set" => {
                let edit = args.next().ok_or("--set needs KEY=VALUE")?;
                let (key, value) = edit.split_once('=')
                    .ok_or_else(|| format!("Invalid preference edit '{}'. Use KEY=VALUE.", edit))?;
                CliMode::SetPreference {
                    key: key.trim().to_string(),
                    value: value.to_string(),
                }
            }
            "--help" | "-h" => return Ok(CliMode::Help),
            _ => return Err(format!("Unknown argument: {}", arg)),
        };
    }

    Ok(mode)
}

fn preferences_store(config: &Config) -> PreferencesStore {
    PreferencesStore::new(config.paths.preferences.clone())
}

pub fn show_preferences(config: &Config) -> anyhow::Result<()> {
    let store = preferences_store(config);
    let prefs = store.load()?;
    print!("{}", format_preferences(&prefs));
    Ok(())
}

pub fn set_preference(config: &Config, key: &str, value: &str) -> anyhow::Result<()> {
    let store = preferences_store(config);
    let mut prefs = store.load()?;
    let before = prefs.clone();

    prefs.apply(key, value)?;
    if prefs == before {
        eprintln!("Value '{}' for {} was not accepted; keeping current setting.", value, key);
    } else {
        store.save(&prefs)?;
    }

    print!("{}", format_preferences(&prefs));
    Ok(())
}

fn format_preferences(prefs: &Preferences) -> String {
    format!(
        "queryDays = {}\nqueryLimit = {}\nstyleCalendarColors = {}\nscreenPosition = {}\n",
        prefs.query_days(),
        prefs.query_limit(),
        prefs.style_calendar_colors(),
        prefs.screen_position(),
    )
}

async fn build_sync(config: &Config, auth: GoogleAuthenticator) -> AgendaSync<GoogleCalendarClient> {
    let client = GoogleCalendarClient::new(Arc::new(auth))
        .with_base_url(config.google.api_base_url.clone())
        .with_timeout(config.google.request_timeout());
    AgendaSync::new(client).await
}

async fn load_entries(config: &Config, auth: GoogleAuthenticator) -> anyhow::Result<Vec<AgendaEntry>> {
    let prefs = preferences_store(config).load()?;
    let mut sync = build_sync(config, auth).await;
    let snapshot = sync.refresh(prefs.query_days(), prefs.query_limit()).await;

    let options = PresentationOptions::from_config(
        &config.agenda,
        Local::now().date_naive(),
        prefs.style_calendar_colors(),
    );
    Ok(build_entries(&snapshot, &options))
}

pub async fn run_agenda_mode(config: Config, auth: GoogleAuthenticator) -> anyhow::Result<()> {
    let entries = load_entries(&config, auth).await?;
    let clock = ClockFace::at(&Local::now(), &config.agenda);
    display_with_pager(&format_agenda_text(&clock, &entries))?;
    Ok(())
}

pub async fn run_open_mode(config: Config, auth: GoogleAuthenticator, index: usize) -> anyhow::Result<()> {
    let entries = load_entries(&config, auth).await?;
    let entry = event_entries(&entries)
        .nth(index - 1)
        .ok_or_else(|| anyhow!("No agenda entry number {}", index))?;
    let link = entry.link
        .as_ref()
        .ok_or_else(|| anyhow!("'{}' has no link", entry.title))?;
    link.open().context("Failed to launch browser")?;
    Ok(())
}

pub async fn run_watch_mode(config: Config, auth: GoogleAuthenticator) -> anyhow::Result<()> {
    let prefs = preferences_store(&config).load()?;
    let sync = build_sync(&config, auth).await;
    let mut app = AgendaApp::new(config, prefs, sync);

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let outcome = app.tick(Local::now()).await;
                render_tick(&outcome)?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                return Ok(());
            }
        }
    }
}

fn render_tick(outcome: &TickOutcome) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    if let Some(entries) = &outcome.agenda {
        writeln!(stdout, "{}", format_agenda_text(&outcome.clock, entries))?;
    }
    if let Some(event) = &outcome.reminder {
        writeln!(stdout, "{}", format_reminder(event))?;
    }
    stdout.flush()
}

fn event_entries(entries: &[AgendaEntry]) -> impl Iterator<Item = &desktop_agenda::agenda::EventEntry> {
    entries.iter().filter_map(|entry| match entry {
        AgendaEntry::Event(event) => Some(event),
        AgendaEntry::DateHeader { .. } => None,
    })
}

fn format_agenda_text(clock: &ClockFace, entries: &[AgendaEntry]) -> String {
    let mut lines = vec![clock.time.clone(), clock.date.clone(), String::new()];

    if entries.is_empty() {
        lines.push("No upcoming events.".to_string());
    }

    let mut number = 0;
    for entry in entries {
        match entry {
            AgendaEntry::DateHeader { label, .. } => {
                lines.push(String::new());
                lines.push(label.clone());
            }
            AgendaEntry::Event(event) => {
                number += 1;
                let time = event.time_label.as_deref().unwrap_or("");
                lines.push(format!("{:>3}. {:>6}  {}", number, time, event.title));
            }
        }
    }

    lines.join("\n")
}

fn format_reminder(event: &CalendarEvent) -> String {
    let when = event.start
        .timed()
        .map(|start| start.with_timezone(&Local).format("%-I:%M %p").to_string())
        .unwrap_or_default();
    format!("Reminder: {} at {}", event.display_title(), when)
}

fn display_with_pager(text: &str) -> Result<(), io::Error> {
    let pager_value = env::var("PAGER").unwrap_or_else(|_| "less".to_string());
    let mut parts = pager_value.split_whitespace();
    let cmd = match parts.next() {
        Some(c) => c,
        None => {
            println!("{text}");
            return Ok(());
        }
    };
    let args: Vec<&str> = parts.collect();

    match Command::new(cmd)
        .args(&args)
        .stdin(Stdio::piped())
        .spawn()
    {
        Ok(mut child) => {
            if let Some(stdin) = child.stdin.as_mut() {
                stdin.write_all(text.as_bytes())?;
            }
            let _ = child.wait();
        }
        Err(_) => {
            println!("{text}");
        }
    }

    Ok(())
}
