//! Fleet Commit Demo
//!
//! Two peers in one process play a full match over the configured signal
//! transport, then disclose their boards and audit each other.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rand::seq::SliceRandom;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use fleet_commit::{
    config::{PeerConfig, TransportKind},
    game::PlayerId,
    network::{HandlerId, LocalBus, PeerSession, SignalMessage, SignalTransport, WsSignalChannel},
    VERSION,
};

/// Guess retries before the turn is skipped.
const GUESS_ATTEMPTS: u32 = 3;

/// One peer: its session, its carrier and its inbox.
struct Peer {
    session: PeerSession,
    transport: Arc<dyn SignalTransport>,
    inbox: mpsc::UnboundedReceiver<SignalMessage>,
    handler: HandlerId,
}

impl Peer {
    fn attach(session: PeerSession, transport: Arc<dyn SignalTransport>) -> Self {
        let (tx, inbox) = mpsc::unbounded_channel();
        let handler = transport.on_signal(Arc::new(move |message: &SignalMessage| {
            let _ = tx.send(message.clone());
        }));
        Self { session, transport, inbox, handler }
    }

    fn send(&self, message: &SignalMessage) {
        if let Err(e) = self.transport.send_signal(message) {
            warn!(player = %self.session.player_id(), "Failed to send {}: {}", message.kind(), e);
        }
    }

    fn deliver(&mut self, message: &SignalMessage) {
        let now = chrono::Utc::now().timestamp_millis();
        match self.session.handle_signal(message, now) {
            Ok(replies) => {
                for reply in &replies {
                    self.send(reply);
                }
            }
            Err(e) => warn!(player = %self.session.player_id(), "Dropped {}: {}", message.kind(), e),
        }
    }

    fn detach(&self) {
        self.transport.off_signal(self.handler);
    }
}

/// Deliver signals to both peers until `done` holds or `wait` elapses.
async fn pump_until<F>(peers: &mut [Peer; 2], wait: Duration, done: F) -> bool
where
    F: Fn(&[Peer; 2]) -> bool,
{
    let deadline = tokio::time::Instant::now() + wait;

    while !done(peers) {
        let [first, second] = &mut *peers;
        let received = tokio::select! {
            Some(message) = first.inbox.recv() => Some((0, message)),
            Some(message) = second.inbox.recv() => Some((1, message)),
            _ = tokio::time::sleep_until(deadline) => None,
        };

        let Some((i, message)) = received else {
            return false;
        };
        debug!(to = i, kind = message.kind(), "Delivering signal");
        peers[i].deliver(&message);
    }

    true
}

async fn transports(config: &PeerConfig) -> Result<[Arc<dyn SignalTransport>; 2]> {
    match config.transport {
        TransportKind::Local => {
            let bus = LocalBus::new();
            let first: Arc<dyn SignalTransport> = Arc::new(bus.clone());
            let second: Arc<dyn SignalTransport> = Arc::new(bus);
            Ok([first, second])
        }
        TransportKind::Ws => {
            let listener = TcpListener::bind(config.ws_addr)
                .await
                .with_context(|| format!("binding {}", config.ws_addr))?;
            let addr = listener.local_addr()?;
            info!("Signal channel listening on {}", addr);

            let accept = tokio::spawn(async move {
                let (stream, _) = listener.accept().await?;
                anyhow::Ok(WsSignalChannel::accept(stream).await?)
            });
            let client = WsSignalChannel::connect(&format!("ws://{}", addr)).await?;
            let server: Arc<dyn SignalTransport> = Arc::new(accept.await??);
            let client: Arc<dyn SignalTransport> = Arc::new(client);
            Ok([server, client])
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = PeerConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .init();

    info!("Fleet Commit v{}", VERSION);
    info!("Transport: {:?}", config.transport);

    let game_id = Uuid::new_v4().to_string();
    info!("Match ID: {}", game_id);

    let mut rng = rand::thread_rng();
    let sessions = [
        PeerSession::with_random_fleet(&game_id, PlayerId::from("0"), &mut rng, config.salt_bytes)?,
        PeerSession::with_random_fleet(&game_id, PlayerId::from("1"), &mut rng, config.salt_bytes)?,
    ];

    let [t0, t1] = transports(&config).await?;
    let [s0, s1] = sessions;
    let mut peers = [Peer::attach(s0, t0), Peer::attach(s1, t1)];

    // === Placement ===
    for peer in peers.iter_mut() {
        let commit = peer.session.commit_signal()?;
        peer.send(&commit);
    }
    let ready = pump_until(&mut peers, config.signal_timeout, |p| {
        p.iter().all(|peer| peer.session.opponent().is_some())
    })
    .await;
    if !ready {
        bail!("commitments were not exchanged within {:?}", config.signal_timeout);
    }
    for peer in &peers {
        info!(player = %peer.session.player_id(), root = %peer.session.root_hex(), "Committed");
    }

    // === Battle ===
    for turn in 0..config.max_turns {
        if peers.iter().any(|p| p.session.state().is_ended()) {
            break;
        }

        let g = (turn % 2) as usize;
        let Some(target) = peers[g].session.unknown_targets().choose(&mut rng).copied() else {
            break;
        };
        let guess = peers[g].session.guess_signal(target)?;

        let mut answered = false;
        for attempt in 1..=GUESS_ATTEMPTS {
            peers[g].send(&guess);
            answered = pump_until(&mut peers, config.signal_timeout, |p| p[g].session.knows(target)).await;
            if answered {
                break;
            }
            warn!(%target, attempt, "No answer to guess, retrying");
        }
        if !answered {
            warn!(%target, "Guess never answered, skipping turn");
        }
    }

    for peer in peers.iter_mut() {
        if !peer.session.state().is_ended() {
            warn!(player = %peer.session.player_id(), "Turn limit reached, abandoning");
            peer.session.abandon();
        }
    }

    match &peers[0].session.state().winner {
        Some(winner) => info!("Winner: player {}", winner),
        None => info!("No winner"),
    }

    // === Disclosure ===
    for peer in &peers {
        let reveal = peer.session.full_reveal_signal()?;
        peer.send(&reveal);
    }
    let audited = pump_until(&mut peers, config.signal_timeout, |p| {
        p.iter().all(|peer| {
            peer.session
                .opponent()
                .and_then(|o| peer.session.audit_report(o))
                .is_some()
        })
    })
    .await;
    if !audited {
        warn!("Disclosures incomplete");
    }

    for peer in &peers {
        let Some(opponent) = peer.session.opponent() else {
            continue;
        };
        if let Some(report) = peer.session.audit_report(opponent) {
            info!(
                auditor = %peer.session.player_id(),
                owner = %opponent,
                root_matches = report.root_matches,
                fleet_ok = report.fleet_ok,
                mismatches = report.guess_mismatches.len(),
                "Audit report"
            );
        }
    }

    let hashes: Vec<String> = peers
        .iter()
        .map(|p| hex::encode(p.session.state().compute_hash()))
        .collect();
    info!("Replica hashes: {} / {}", hashes[0], hashes[1]);
    if hashes[0] == hashes[1] {
        info!("REPLICAS CONSISTENT");
    } else {
        warn!("REPLICAS DIVERGED");
    }

    for peer in &peers {
        peer.detach();
    }

    Ok(())
}
