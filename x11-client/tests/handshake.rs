//! End-to-end connection tests against an in-process fake X server.
//!
//! The fake server listens on a Unix socket in a temporary directory, reads
//! the client hello, and answers with a canned response. Displays are named
//! with the explicit socket path form (`/path/to/sock:N`).

#![cfg(unix)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixListener;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;
use x11_client::{
    Config, Connector, NoAuthority, StaticAuthority, StaticDisplay, X11ClientError,
};
use x11_protocol::setup::testing::{encode_success, sample_setup};

/// Counts WARN events.
struct WarnCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// What the fake server saw from the client.
struct Received {
    hello: Vec<u8>,
}

/// Start a fake server answering one client with `reply`.
///
/// The server reads the 12-byte hello header plus the padded name and data it
/// announces, writes `reply`, then waits for the client to hang up.
fn spawn_server(
    dir: &tempfile::TempDir,
    display: u32,
    reply: Vec<u8>,
) -> (String, tokio::task::JoinHandle<Received>) {
    let base = dir.path().join("xserver");
    let listener = UnixListener::bind(format!("{}:{}", base.display(), display)).unwrap();
    let task = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut hello = vec![0u8; 12];
        stream.read_exact(&mut hello).await.unwrap();
        let name_len = u16::from_le_bytes([hello[6], hello[7]]) as usize;
        let data_len = u16::from_le_bytes([hello[8], hello[9]]) as usize;
        let rest = x11_protocol::padded_len(name_len) + x11_protocol::padded_len(data_len);
        let mut tail = vec![0u8; rest];
        stream.read_exact(&mut tail).await.unwrap();
        hello.extend_from_slice(&tail);

        stream.write_all(&reply).await.unwrap();
        let mut drain = Vec::new();
        let _ = stream.read_to_end(&mut drain).await;
        Received { hello }
    });
    (format!("{}:{}", base.display(), display), task)
}

fn header(status: u8, reason_len: u8, major: u16, minor: u16, units: u16) -> Vec<u8> {
    let mut head = vec![status, reason_len];
    head.extend_from_slice(&major.to_le_bytes());
    head.extend_from_slice(&minor.to_le_bytes());
    head.extend_from_slice(&units.to_le_bytes());
    head
}

#[tokio::test]
async fn unauthenticated_fallback_connects_and_warns_once() {
    let warnings = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&warnings)));
    let _guard = tracing::subscriber::set_default(subscriber);

    let dir = tempfile::tempdir().unwrap();
    let (display, server) = spawn_server(&dir, 0, encode_success(&sample_setup(1)));

    let connector = Connector::new(Config::default(), NoAuthority);
    let conn = connector
        .connect(&StaticDisplay::new(display))
        .await
        .unwrap();

    assert!(!conn.is_authenticated());
    assert_eq!(conn.setup().vendor, "The X.Org Foundation");
    assert_eq!(conn.host(), "");
    assert_eq!(warnings.load(Ordering::SeqCst), 1);
    drop(conn);

    let received = server.await.unwrap();
    assert_eq!(received.hello, vec![0x6c, 0, 11, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
}

#[tokio::test]
async fn authenticated_connection_sends_cookie() {
    let dir = tempfile::tempdir().unwrap();
    let (display, server) = spawn_server(&dir, 3, encode_success(&sample_setup(2)));

    let cookie = [0xA5u8; 16];
    let config = Config::builder().display(display).build().unwrap();
    let connector = Connector::new(config, StaticAuthority::mit_magic_cookie(cookie));
    let conn = connector.connect(&StaticDisplay::unset()).await.unwrap();

    assert!(conn.is_authenticated());
    assert_eq!(conn.display_number(), 3);
    assert_eq!(conn.setup().roots.len(), 2);
    drop(conn);

    let received = server.await.unwrap();
    assert_eq!(received.hello.len(), 12 + 20 + 16);
    assert_eq!(&received.hello[12..30], b"MIT-MAGIC-COOKIE-1");
    assert_eq!(&received.hello[32..], &cookie);
}

#[tokio::test]
async fn refusal_reason_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut reply = header(0, 5, 11, 0, 2);
    reply.extend_from_slice(b"nope!\0\0\0");
    let (display, _server) = spawn_server(&dir, 0, reply);

    let connector = Connector::new(Config::default(), NoAuthority);
    let err = connector
        .connect(&StaticDisplay::new(display))
        .await
        .err()
        .unwrap();

    match err {
        X11ClientError::ConnectionRefused(reason) => assert_eq!(reason, "nope!"),
        other => panic!("expected refusal, got {other:?}"),
    }
}

#[tokio::test]
async fn version_mismatch_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut reply = header(1, 0, 10, 0, 3);
    reply.extend_from_slice(&[0xEE; 12]);
    let (display, _server) = spawn_server(&dir, 0, reply);

    let connector = Connector::new(Config::default(), NoAuthority);
    let err = connector
        .connect(&StaticDisplay::new(display))
        .await
        .err()
        .unwrap();

    assert!(matches!(err, X11ClientError::VersionMismatch { major: 10, .. }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn fallback_disabled_fails_before_handshake() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("xserver");
    let listener = UnixListener::bind(format!("{}:0", base.display())).unwrap();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();
        received
    });

    let config = Config::builder().allow_unauthenticated(false).build().unwrap();
    let connector = Connector::new(config, NoAuthority);
    let err = connector
        .connect(&StaticDisplay::new(format!("{}:0", base.display())))
        .await
        .err()
        .unwrap();

    assert!(matches!(err, X11ClientError::AuthorityUnavailable(_)));
    assert!(server.await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_display_is_empty_spec() {
    let connector = Connector::new(Config::default(), NoAuthority);
    let err = connector
        .connect(&StaticDisplay::unset())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, X11ClientError::EmptyDisplaySpec));
}

#[tokio::test]
async fn unreachable_socket_is_connect_error() {
    let dir = tempfile::tempdir().unwrap();
    let display = format!("{}:4", dir.path().join("nobody").display());

    let connector = Connector::new(Config::default(), NoAuthority);
    let err = connector
        .connect(&StaticDisplay::new(display.clone()))
        .await
        .err()
        .unwrap();

    match &err {
        X11ClientError::Connect { display: d, .. } => assert_eq!(d, &display),
        other => panic!("expected connect error, got {other:?}"),
    }
    assert!(err.is_retryable());
}
