use std::{
    fs,
    io::{self, BufRead},
    path::PathBuf,
    sync::Arc,
};

use clap::Parser;
use opush_core::Event;
use opush_dispatcher::{
    Collaborators, Dispatcher, channel,
    config::load_config_or_default,
    host::{RecordingTransfers, RecordingUi, ViewerTable},
    memory::{ExtensionTypeResolver, MemoryStore, StaticDirectory, StoreSeed},
    send_intent,
};
use tracing::{error, info, warn};

/// Replays transfer events against an in-memory record table.
#[derive(Parser, Debug)]
#[command(name = "opush-dispatcher")]
struct DispatcherArgs {
    /// JSON config with the record base URI, viewer types and UI strings.
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON seed with `devices` and `records`.
    #[arg(long)]
    records: Option<PathBuf>,
    /// File with one JSON event per line; stdin when omitted.
    #[arg(long)]
    events: Option<PathBuf>,
    /// Pretend a send is waiting for the radio to come up.
    #[arg(long)]
    sending: bool,
    /// Number of files in the outgoing batch reported on device selection.
    #[arg(long, default_value_t = 1)]
    batch_size: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = DispatcherArgs::parse();
    let config = load_config_or_default(args.config.as_deref());

    let seed = match args.records.as_deref().map(load_seed).transpose() {
        Ok(seed) => seed.unwrap_or_default(),
        Err(err) => {
            error!("{}", err);
            std::process::exit(1);
        }
    };

    let lines = match read_event_lines(args.events.as_ref()) {
        Ok(lines) => lines,
        Err(err) => {
            error!("failed to read events: {}", err);
            std::process::exit(1);
        }
    };

    let (intent, picker) = send_intent();
    if args.sending {
        intent.await_device_selection();
    }

    info!(
        records = seed.records.len(),
        devices = seed.devices.len(),
        "replaying {} event lines",
        lines.len()
    );

    let ports = Collaborators {
        store: Arc::new(MemoryStore::with_rows(seed.records)),
        directory: Arc::new(StaticDirectory::new(seed.devices)),
        content_types: Arc::new(ExtensionTypeResolver),
        handlers: Arc::new(ViewerTable::new(config.viewer_types.clone())),
        ui: Arc::new(RecordingUi::default()),
        transfers: Arc::new(RecordingTransfers::new(args.batch_size)),
    };
    let (sender, service) = channel(Dispatcher::new(ports, config, picker));
    let running = tokio::spawn(service.run());

    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<Event>(trimmed) {
            Ok(event) => {
                if let Err(err) = sender.send(event) {
                    warn!("{}", err);
                }
            }
            Err(err) => warn!("line {}: not an event: {}", index + 1, err),
        }
    }
    drop(sender);

    match running.await {
        Ok(report) => info!(
            handled = report.handled,
            ignored = report.ignored,
            aborted = report.aborted,
            panicked = report.panicked,
            "replay finished"
        ),
        Err(err) => error!("dispatch service failed: {}", err),
    }
}

fn load_seed(path: &std::path::Path) -> Result<StoreSeed, String> {
    let data = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;
    serde_json::from_str(&data).map_err(|err| format!("invalid seed {}: {}", path.display(), err))
}

fn read_event_lines(path: Option<&PathBuf>) -> io::Result<Vec<String>> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?.lines().map(str::to_owned).collect()),
        None => io::stdin().lock().lines().collect(),
    }
}
