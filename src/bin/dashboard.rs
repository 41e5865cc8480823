use equipment_visualizer::charts::write_charts;
use equipment_visualizer::client::ApiClient;
use equipment_visualizer::config::AppConfig;
use equipment_visualizer::dashboard::{DashboardState, UiEvent};
use std::io::BufRead;
use std::path::PathBuf;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

const HELP: &str = "commands: upload <path> | refresh | report [id] [dest] | charts [dir] | help | quit";

/// Interactive client for the equipment API
///
/// Network calls run on worker tasks and report back through a channel;
/// only the loop in `main` mutates the dashboard state.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = AppConfig::from_env()?;
    let client = ApiClient::new(&config.api_base_url, &config.auth_token)?;

    let (events, mut event_rx) = unbounded_channel::<UiEvent>();
    let (commands, mut command_rx) = unbounded_channel::<String>();

    // stdin is blocking, keep it off the runtime workers
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if commands.send(line).is_err() {
                break;
            }
        }
    });

    let mut state = DashboardState::default();
    println!("{}", HELP);
    fetch_all(&client, &events);

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                state.apply(event);
                print!("{}", state.render());
            }
            command = command_rx.recv() => {
                let Some(command) = command else { break };
                if !handle_command(command.trim(), &state, &client, &events) {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Dispatch one command line; returns false when the user quits
fn handle_command(
    command: &str,
    state: &DashboardState,
    client: &ApiClient,
    events: &UnboundedSender<UiEvent>,
) -> bool {
    let mut parts = command.split_whitespace();
    match parts.next() {
        Some("quit") | Some("exit") => return false,
        Some("refresh") => fetch_all(client, events),
        Some("upload") => match parts.next() {
            Some(path) => upload(client, events, PathBuf::from(path)),
            None => status(events, "usage: upload <path>"),
        },
        Some("report") => {
            let id = parts
                .next()
                .and_then(|s| s.parse().ok())
                .or_else(|| state.latest_id());
            match id {
                Some(id) => {
                    let dest = parts
                        .next()
                        .map(PathBuf::from)
                        .unwrap_or_else(|| PathBuf::from(format!("dataset_{}.pdf", id)));
                    report(client, events, id, dest);
                }
                None => status(events, "No dataset selected"),
            }
        }
        Some("charts") => match &state.latest {
            Some(dataset) => {
                let dir = PathBuf::from(parts.next().unwrap_or("charts"));
                let summary = dataset.summary.clone();
                let events = events.clone();
                tokio::task::spawn_blocking(move || {
                    let text = match write_charts(&summary, &dir) {
                        Ok(paths) => format!("Wrote {} chart(s) to {}", paths.len(), dir.display()),
                        Err(e) => format!("Chart rendering failed: {}", e),
                    };
                    let _ = events.send(UiEvent::Status(text));
                });
            }
            None => status(events, "No data loaded"),
        },
        Some("help") | None => println!("{}", HELP),
        Some(other) => status(events, &format!("unknown command {:?}; {}", other, HELP)),
    }
    true
}

fn status(events: &UnboundedSender<UiEvent>, text: &str) {
    let _ = events.send(UiEvent::Status(text.to_string()));
}

/// Fetch the latest summary and the history concurrently
fn fetch_all(client: &ApiClient, events: &UnboundedSender<UiEvent>) {
    let (c, tx) = (client.clone(), events.clone());
    tokio::spawn(async move {
        let event = match c.latest_summary().await {
            Ok(latest) => UiEvent::Summary(latest),
            Err(e) => UiEvent::Status(format!("Failed to load summary: {}", e)),
        };
        let _ = tx.send(event);
    });

    let (c, tx) = (client.clone(), events.clone());
    tokio::spawn(async move {
        let event = match c.history().await {
            Ok(history) => UiEvent::History(history),
            Err(e) => UiEvent::Status(format!("Failed to load history: {}", e)),
        };
        let _ = tx.send(event);
    });
}

fn upload(client: &ApiClient, events: &UnboundedSender<UiEvent>, path: PathBuf) {
    let (c, tx) = (client.clone(), events.clone());
    status(events, &format!("Uploading {}...", path.display()));
    tokio::spawn(async move {
        match c.upload(&path).await {
            Ok(receipt) => {
                let _ = tx.send(UiEvent::Status(format!(
                    "{}: dataset {}",
                    receipt.message, receipt.dataset_id
                )));
                fetch_all(&c, &tx);
            }
            Err(e) => {
                let _ = tx.send(UiEvent::Status(format!("Upload failed: {}", e)));
            }
        }
    });
}

fn report(client: &ApiClient, events: &UnboundedSender<UiEvent>, id: u64, dest: PathBuf) {
    let (c, tx) = (client.clone(), events.clone());
    tokio::spawn(async move {
        let text = match c.download_report(id).await {
            Ok(pdf) => match tokio::fs::write(&dest, pdf).await {
                Ok(()) => format!("Saved report to {}", dest.display()),
                Err(e) => format!("Could not save report: {}", e),
            },
            Err(e) => format!("Report download failed: {}", e),
        };
        let _ = tx.send(UiEvent::Status(text));
    });
}
