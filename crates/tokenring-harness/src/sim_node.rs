//! Networked ring member for turmoil simulations.
//!
//! Drives one [`Node`] over turmoil TCP. Node `i` accepts connections from
//! higher positions and dials every lower position, so each pair shares
//! exactly one connection. Connection tasks feed a single inbox; the driver
//! loop owns the node and is the only place its events are processed.
//!
//! ```text
//!  accept / dial ──> handshake ──> read loop ──┐
//!                        │                     ├──> inbox ──> driver ──> Node
//!                        └──── write loop <────┼──────────── broadcast
//!                                              │
//!                         timer deadline ──────┘
//! ```

use std::{
    future::Future,
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

use bytes::Bytes;
use tokenring_core::{Environment, Node, NodeAction, NodeEvent, PeerInfo};
use tokenring_proto::{Hello, NodeId, Payload, Token};
use tokio::{
    io::AsyncWriteExt,
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinSet,
};
use turmoil::net::{
    TcpListener, TcpStream,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};

use crate::{
    config::SimConfig,
    coordinator::SharedCoordinator,
    error::SimError,
    report::NodeReport,
    sim_transport::{
        PORT, connect_with_retry, encode_frame, host_name, identity, is_disconnect, read_frame,
    },
};

/// Dial attempts per lower-positioned peer.
const CONNECT_ATTEMPTS: u32 = 50;

/// Pause between dial attempts.
const CONNECT_BACKOFF: Duration = Duration::from_millis(50);

/// Messages from connection tasks to the driver loop.
enum Inbound {
    /// A connection was accepted or dialed
    Stream(TcpStream),
    /// A peer completed identity exchange
    PeerHello { peer: PeerInfo, writer: UnboundedSender<Bytes> },
    /// A peer delivered a token
    Token(Token),
    /// A connection task failed
    Failed(SimError),
}

type Inbox = UnboundedSender<Inbound>;

/// Run node `node_num` until it halts.
///
/// # Errors
///
/// - `SimError::Config` if the node's configuration is invalid
/// - `SimError::Node` if the node detects a protocol violation
/// - `SimError::Io`, `SimError::Protocol` or `SimError::Handshake` if a
///   connection fails for any reason other than the peer going away
pub async fn run_node<E: Environment>(
    node_num: u32,
    config: &SimConfig,
    coordinator: SharedCoordinator,
    env: E,
) -> Result<NodeReport, SimError> {
    let me = NodeId::new(node_num);
    let own_identity = identity(node_num);
    let mut node =
        Node::new(config.node_config(node_num)?, config.timings, own_identity.clone(), env.now());

    let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, PORT))).await?;
    tracing::info!(node = %me, identity = %own_identity, "Listening");

    let (inbox, mut rx) = mpsc::unbounded_channel();
    let mut tasks = JoinSet::new();

    spawn_reporting(&mut tasks, &inbox, accept_loop(listener, inbox.clone()));

    for peer in 0..node_num {
        let inbox_for_dial = inbox.clone();
        spawn_reporting(&mut tasks, &inbox, async move {
            let host = host_name(peer);
            let stream = connect_with_retry(&host, CONNECT_ATTEMPTS, CONNECT_BACKOFF).await?;
            tracing::debug!(node = %me, %host, "Connected");
            let _ = inbox_for_dial.send(Inbound::Stream(stream));
            Ok::<_, SimError>(())
        });
    }

    let mut ready_peers: Vec<PeerInfo> = Vec::new();
    let mut writers: Vec<UnboundedSender<Bytes>> = Vec::new();

    loop {
        let inbound = match node.next_deadline() {
            Some(deadline) => {
                let now = env.now();
                let wait = if deadline > now { deadline - now } else { Duration::ZERO };
                tokio::select! {
                    inbound = rx.recv() => inbound,
                    () = env.sleep(wait) => None,
                }
            },
            None => rx.recv().await,
        };

        let event = match inbound {
            None => NodeEvent::Tick,
            Some(Inbound::Stream(stream)) => {
                spawn_reporting(
                    &mut tasks,
                    &inbox,
                    run_connection(stream, me, own_identity.clone(), inbox.clone()),
                );
                continue;
            },
            Some(Inbound::PeerHello { peer, writer }) => {
                tracing::debug!(node = %me, peer = %peer.identity, "Peer ready");
                writers.push(writer);
                ready_peers.push(peer.clone());
                NodeEvent::PeerReady { peer, ready_peers: ready_peers.clone() }
            },
            Some(Inbound::Token(token)) => NodeEvent::TokenReceived(token),
            Some(Inbound::Failed(error)) => {
                tracing::error!(node = %me, %error, "Connection failed");
                node.shutdown();
                tasks.abort_all();
                return Err(error);
            },
        };

        let actions = node
            .handle(event, env.now(), &coordinator)
            .map_err(|source| SimError::Node { node: me, source })?;

        for action in actions {
            match action {
                NodeAction::Broadcast(token) => {
                    let bytes = encode_frame(Payload::Token(token), me)?;
                    for writer in &writers {
                        // Closed outboxes belong to peers that already halted.
                        let _ = writer.send(bytes.clone());
                    }
                },
                NodeAction::Halt => {
                    tracing::info!(node = %me, "Halted");
                    tasks.abort_all();
                    return Ok(NodeReport::from_node(&node));
                },
            }
        }
    }
}

fn spawn_reporting<F>(tasks: &mut JoinSet<()>, inbox: &Inbox, task: F)
where
    F: Future<Output = Result<(), SimError>> + Send + 'static,
{
    let inbox = inbox.clone();
    tasks.spawn(async move {
        if let Err(error) = task.await {
            let _ = inbox.send(Inbound::Failed(error));
        }
    });
}

async fn accept_loop(listener: TcpListener, inbox: Inbox) -> Result<(), SimError> {
    loop {
        let (stream, addr) = listener.accept().await?;
        tracing::trace!(%addr, "Accepted connection");
        if inbox.send(Inbound::Stream(stream)).is_err() {
            return Ok(());
        }
    }
}

async fn run_connection(
    stream: TcpStream,
    me: NodeId,
    own_identity: String,
    inbox: Inbox,
) -> Result<(), SimError> {
    let (mut reader, mut writer) = stream.into_split();

    writer.write_all(&encode_frame(Payload::Hello(Hello::new(own_identity)), me)?).await?;

    let frame = read_frame(&mut reader)
        .await?
        .ok_or_else(|| SimError::Handshake("connection closed before hello".to_string()))?;

    let hello = match Payload::from_frame(&frame)? {
        Payload::Hello(hello) => hello,
        Payload::Token(token) => {
            return Err(SimError::Handshake(format!(
                "token {} received before hello",
                token.counter()
            )));
        },
    };

    let (outbox, outbox_rx) = mpsc::unbounded_channel();
    let peer = PeerInfo::new(hello.identity).with_version(hello.version);
    if inbox.send(Inbound::PeerHello { peer, writer: outbox }).is_err() {
        return Ok(());
    }

    tokio::try_join!(read_loop(reader, inbox), write_loop(writer, outbox_rx))?;
    Ok(())
}

async fn read_loop(mut reader: OwnedReadHalf, inbox: Inbox) -> Result<(), SimError> {
    loop {
        let frame = match read_frame(&mut reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(()),
            Err(SimError::Io(e)) if is_disconnect(&e) => return Ok(()),
            Err(e) => return Err(e),
        };

        match Payload::from_frame(&frame)? {
            Payload::Token(token) => {
                if inbox.send(Inbound::Token(token)).is_err() {
                    return Ok(());
                }
            },
            Payload::Hello(hello) => {
                return Err(SimError::Handshake(format!("repeated hello from {}", hello.identity)));
            },
        }
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut outbox: UnboundedReceiver<Bytes>,
) -> Result<(), SimError> {
    while let Some(bytes) = outbox.recv().await {
        match writer.write_all(&bytes).await {
            Ok(()) => {},
            Err(e) if is_disconnect(&e) => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
