//! Tokio task that owns the [`Session`] and runs its fetches.

use crate::omdb::{FetchError, OmdbApi};
use crate::session::{Command, CommandError, Completion, Effect, Session, SessionView};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const CHANNEL_CAPACITY: usize = 64;

enum Message {
    Command {
        command: Command,
        reply: oneshot::Sender<Result<SessionView, CommandError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionView>,
    },
    Completed(Completion),
}

/// Cheap, clonable way to talk to the session task.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Message>,
}

impl SessionHandle {
    pub async fn send(&self, command: Command) -> Result<Result<SessionView, CommandError>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Command { command, reply })
            .await
            .map_err(|_| anyhow!("session task stopped"))?;
        rx.await.map_err(|_| anyhow!("session task dropped the reply"))
    }

    pub async fn snapshot(&self) -> Result<SessionView> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Snapshot { reply })
            .await
            .map_err(|_| anyhow!("session task stopped"))?;
        rx.await.map_err(|_| anyhow!("session task dropped the reply"))
    }
}

/// Starts the session task. It stops once every handle is dropped and no
/// fetch is outstanding; dropping the session cancels whatever is left.
pub fn spawn_session(session: Session, api: Arc<dyn OmdbApi>) -> (SessionHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let weak = tx.downgrade();
    let task = tokio::spawn(run(session, api, rx, weak));
    (SessionHandle { tx }, task)
}

async fn run(
    mut session: Session,
    api: Arc<dyn OmdbApi>,
    mut rx: mpsc::Receiver<Message>,
    tx: mpsc::WeakSender<Message>,
) {
    info!("Session started with {} watched movies", session.watched().list().len());
    while let Some(message) = rx.recv().await {
        match message {
            Message::Command { command, reply } => {
                let outcome = session.apply(command).map(|effects| {
                    for effect in effects {
                        dispatch(effect, &api, &tx);
                    }
                    session.view()
                });
                let _ = reply.send(outcome);
            }
            Message::Snapshot { reply } => {
                let _ = reply.send(session.view());
            }
            Message::Completed(completion) => {
                session.complete(completion);
            }
        }
    }
    info!("Session closed");
}

fn dispatch(effect: Effect, api: &Arc<dyn OmdbApi>, tx: &mpsc::WeakSender<Message>) {
    let Some(tx) = tx.upgrade() else {
        return;
    };
    let api = api.clone();
    tokio::spawn(async move {
        let (token, completion) = match effect {
            Effect::Search {
                request,
                query,
                page,
                token,
            } => {
                let result = token
                    .run_until_cancelled(api.search(&query, page))
                    .await
                    .unwrap_or(Err(FetchError::Cancelled));
                (token, Completion::Search { request, result })
            }
            Effect::Detail { request, id, token } => {
                let result = token
                    .run_until_cancelled(api.fetch_detail(&id))
                    .await
                    .unwrap_or(Err(FetchError::Cancelled));
                (token, Completion::Detail { request, result })
            }
        };
        if token.is_cancelled() {
            debug!("fetch cancelled, result discarded");
            return;
        }
        let _ = tx.send(Message::Completed(completion)).await;
    });
}
