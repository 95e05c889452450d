//! The TCP acceptor and the state shared across connections.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use feldspar_world::World;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::session;

/// State shared by every connection and the HTTP surface.
pub struct Server {
    pub world: Arc<World>,
    pub view_radius: i32,
    events: broadcast::Sender<Event>,
    next_entity_id: AtomicU32,
}

/// Fan-out traffic delivered to every live session.
#[derive(Clone, Debug)]
pub enum Event {
    /// A chat line to forward to every client.
    Chat(String),
    /// The current world time.
    Time(u64),
}

impl Server {
    pub fn new(world: Arc<World>, view_radius: i32) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            world,
            view_radius,
            events,
            next_entity_id: AtomicU32::new(1),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn broadcast(&self, event: Event) {
        let _ = self.events.send(event);
    }

    pub fn next_entity_id(&self) -> u32 {
        self.next_entity_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Accepts connections forever, one task per client.
pub async fn run(server: Arc<Server>, bind: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!(%bind, "listening");

    loop {
        let (stream, remote) = listener.accept().await?;
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            if let Err(e) = session::run(server, stream).await {
                warn!(%remote, "session ended with error: {e:#}");
            }
        });
    }
}

/// Broadcasts the world time once per second, 20 ticks at a time.
pub fn spawn_time_loop(server: &Arc<Server>) -> tokio::task::JoinHandle<()> {
    let server = Arc::clone(server);
    tokio::spawn(async move {
        let mut timestamp = 0_u64;
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        loop {
            tick.tick().await;
            timestamp += 20;
            server.broadcast(Event::Time(timestamp));
        }
    })
}
