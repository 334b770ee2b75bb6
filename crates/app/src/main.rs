use engine::{GestureInterpreter, Session};
use tokio::{io::BufReader, sync::broadcast::error::RecvError};

use crate::{api::ApiClient, error::Result, shell::Shell, store::JsonFileStore};

mod api;
mod commands;
mod error;
mod settings;
mod shell;
mod store;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = settings::load()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "swipedeck={level},engine={level}",
            level = settings.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let api = ApiClient::new(
        settings.base_url.clone(),
        settings.token.clone(),
        settings.request_timeout(),
    )?;
    let store = match JsonFileStore::load(&settings.state_path) {
        Ok(store) => store,
        Err(err) => {
            tracing::warn!(
                "state file {} unreadable, starting fresh: {err}",
                settings.state_path
            );
            JsonFileStore::empty(&settings.state_path)
        }
    };
    tracing::info!(
        "using backend {} and state file {}",
        settings.base_url,
        store.path().display()
    );

    let session = Session::builder(api, store)
        .config(settings.session_config())
        .build()
        .await;
    session
        .spawn_reset_watcher(settings.reset_check_interval())
        .await;

    let mut events = session.subscribe();
    tasks.spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("{}", shell::announce(&event)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("dropped {skipped} session events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut shell = Shell::new(
        session.clone(),
        GestureInterpreter::new(settings.thresholds()),
        settings.discovery_query(),
    );
    println!("{}", shell.refill().await);
    println!("type `help` for commands");

    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!("cannot listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };
    let exit = shell
        .run(BufReader::new(tokio::io::stdin()), interrupt, |line| {
            println!("{line}")
        })
        .await;
    tracing::debug!(?exit, "command loop stopped");

    session.shutdown().await?;
    tasks.shutdown().await;
    Ok(())
}
