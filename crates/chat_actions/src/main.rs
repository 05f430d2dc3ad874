use std::io;
use std::sync::{Arc, Mutex};

use chat_actions::backends;
use chat_actions::{ActionController, ClientSettings, NoAnalysis};
use chat_history::ChatHistoryStore;
use chat_transcript::{new_id, TranscriptStore};
use tracing_subscriber::EnvFilter;

/// `aiconsole-chat [CHAT_ID] [MESSAGE...]`
///
/// Opens (or starts) the chat, submits MESSAGE when given, and prints the
/// resulting conversation as JSON. Ctrl-C stops the current work.
#[tokio::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let mut args = std::env::args().skip(1);
    let chat_id = args.next().unwrap_or_else(new_id);
    let command = args.collect::<Vec<_>>().join(" ");

    let settings = ClientSettings::from_env().map_err(io::Error::other)?;
    let backend = backends::backend_from_env(&settings).map_err(io::Error::other)?;
    let cwd = std::env::current_dir()?;
    let history = ChatHistoryStore::new(settings.history_root(&cwd));
    tracing::info!(%chat_id, history = %history.root().display(), "starting chat");

    let controller = Arc::new(
        ActionController::new(
            Arc::new(Mutex::new(TranscriptStore::empty(chat_id.as_str()))),
            backend,
            Arc::new(history),
            Arc::new(NoAnalysis),
        )
        .with_always_execute_code(settings.always_execute_code),
    );

    controller
        .open_chat(&chat_id)
        .await
        .map_err(io::Error::other)?;

    if !command.trim().is_empty() {
        let worker = Arc::clone(&controller);
        let mut task = tokio::spawn(async move { worker.submit_command(&command).await });
        let joined = tokio::select! {
            joined = &mut task => joined,
            _ = tokio::signal::ctrl_c() => {
                controller.stop_work();
                task.await
            }
        };
        joined
            .map_err(io::Error::other)?
            .map_err(io::Error::other)?;
    }

    let chat = controller.snapshot();
    let rendered = serde_json::to_string_pretty(&chat).map_err(io::Error::other)?;
    println!("{rendered}");
    Ok(())
}
