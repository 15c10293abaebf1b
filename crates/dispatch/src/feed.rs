//! The live trip feed.
//!
//! One worker task owns the refetch. Change notifications and explicit
//! refresh bumps both queue a [`Command::Refresh`]; queued commands are
//! coalesced into a single `list_trips` call whose result replaces the
//! snapshot wholesale. Readers get `Arc` snapshots through a watch channel
//! and never block the worker.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Local};
use model::{trip::Trip, WithId};
use tokio::{
    sync::{mpsc, oneshot, watch, Mutex},
    task::JoinHandle,
};

use crate::{
    database::{Database, DatabaseError, Subscription, TripChange},
    RequestError, RequestResult,
};

type Responder = oneshot::Sender<Result<u64, String>>;

#[derive(Debug)]
enum Command {
    Refresh {
        token: u64,
        responder: Option<Responder>,
    },
}

/// What the feed last fetched.
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    pub trips: Arc<Vec<WithId<Trip>>>,
    /// The highest refresh token this snapshot reflects.
    pub refresh_token: u64,
    pub fetched_at: Option<DateTime<Local>>,
    /// Set when the latest fetch failed. `trips` then still holds the last
    /// good result.
    pub last_error: Option<String>,
}

impl FeedSnapshot {
    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }
}

struct Inner {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<Arc<FeedSnapshot>>,
    token: Arc<AtomicU64>,
    subscription: Mutex<Option<Subscription>>,
    worker: JoinHandle<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[derive(Clone)]
pub struct TripFeed {
    inner: Arc<Inner>,
}

impl fmt::Debug for TripFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TripFeed")
            .field("refresh_token", &self.refresh_token())
            .finish_non_exhaustive()
    }
}

impl TripFeed {
    /// Subscribes to trip changes, starts the worker and performs the
    /// initial fetch. A failed initial fetch leaves the feed running with an
    /// empty snapshot in error state.
    pub async fn start<D: Database>(database: D) -> RequestResult<Self> {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(Arc::new(FeedSnapshot::default()));
        let token = Arc::new(AtomicU64::new(0));

        let on_change = {
            let commands = commands.clone();
            let token = token.clone();
            Arc::new(move |change: TripChange| {
                log::debug!("Trip change {:?} on {:?}", change.kind, change.trip_id);
                let _ = commands.send(Command::Refresh {
                    token: token.load(Ordering::SeqCst),
                    responder: None,
                });
            })
        };
        let subscription = database.subscribe_trip_changes(on_change).await?;
        log::info!("Subscribed to trip changes");

        let worker = tokio::spawn(run(database, receiver, snapshot_tx));
        let feed = Self {
            inner: Arc::new(Inner {
                commands,
                snapshot,
                token,
                subscription: Mutex::new(Some(subscription)),
                worker,
            }),
        };
        if let Err(why) = feed.bump_refresh().await {
            log::warn!("Initial trip fetch failed: {}", why);
        }
        Ok(feed)
    }

    pub fn snapshot(&self) -> Arc<FeedSnapshot> {
        self.inner.snapshot.borrow().clone()
    }

    pub fn current_trips(&self) -> Arc<Vec<WithId<Trip>>> {
        self.snapshot().trips.clone()
    }

    /// A receiver that sees every replaced snapshot.
    pub fn watch(&self) -> watch::Receiver<Arc<FeedSnapshot>> {
        self.inner.snapshot.clone()
    }

    pub fn refresh_token(&self) -> u64 {
        self.inner.token.load(Ordering::SeqCst)
    }

    /// Increments the refresh token and waits until a fetch reflecting it
    /// has replaced the snapshot. Returns the token the snapshot now
    /// carries.
    ///
    /// Dropping the returned future abandons the wait; the fetch still runs.
    pub async fn bump_refresh(&self) -> RequestResult<u64> {
        let token = self.inner.token.fetch_add(1, Ordering::SeqCst) + 1;
        let (responder, response) = oneshot::channel();
        self.inner
            .commands
            .send(Command::Refresh {
                token,
                responder: Some(responder),
            })
            .map_err(|_| RequestError::SendError)?;
        response
            .await?
            .map_err(|why| RequestError::Database(DatabaseError::Other(why.into())))
    }

    /// The "try again" action after a failed fetch.
    pub async fn retry(&self) -> RequestResult<Arc<FeedSnapshot>> {
        self.bump_refresh().await?;
        Ok(self.snapshot())
    }

    pub async fn is_subscribed(&self) -> bool {
        self.inner
            .subscription
            .lock()
            .await
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Tears down the change subscription and stops the worker. Snapshots
    /// already handed out stay readable.
    pub async fn close(&self) {
        if let Some(subscription) = self.inner.subscription.lock().await.take() {
            subscription.unsubscribe();
            log::info!("Unsubscribed from trip changes");
        }
        self.inner.worker.abort();
    }
}

async fn run<D: Database>(
    database: D,
    mut commands: mpsc::UnboundedReceiver<Command>,
    snapshot: watch::Sender<Arc<FeedSnapshot>>,
) {
    while let Some(first) = commands.recv().await {
        let mut batch = vec![first];
        while let Ok(next) = commands.try_recv() {
            batch.push(next);
        }

        let mut token = snapshot.borrow().refresh_token;
        let mut responders = vec![];
        for command in batch {
            match command {
                Command::Refresh {
                    token: requested,
                    responder,
                } => {
                    token = token.max(requested);
                    responders.extend(responder);
                }
            }
        }

        let result = match database.list_trips().await {
            Ok(trips) => {
                log::debug!("Refreshed {} trips at token {}", trips.len(), token);
                snapshot.send_replace(Arc::new(FeedSnapshot {
                    trips: Arc::new(trips),
                    refresh_token: token,
                    fetched_at: Some(Local::now()),
                    last_error: None,
                }));
                Ok(token)
            }
            Err(why) => {
                log::warn!("Failed to refresh trips: {}", why);
                let previous = snapshot.borrow().clone();
                snapshot.send_replace(Arc::new(FeedSnapshot {
                    last_error: Some(why.to_string()),
                    ..(*previous).clone()
                }));
                Err(why.to_string())
            }
        };

        for responder in responders {
            // The caller may have stopped waiting.
            let _ = responder.send(result.clone());
        }
    }
}
