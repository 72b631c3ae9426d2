//! Connection establishment.
//!
//! Resolves the display, opens the transport, picks the credential, runs the
//! setup handshake and decodes the setup block. The result is a
//! [`Connection`] that owns the transport; nothing is returned on failure and
//! the transport is dropped (closed) with the error.

use crate::auth::{AuthorityLookup, Authenticator};
use crate::config::Config;
use crate::environment::{resolve_display, DisplayProvider};
use crate::errors::X11ClientError;
use crate::transport::Transport;
use tokio::io::{split, AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use x11_protocol::handshake;
use x11_protocol::{DisplaySpec, Setup, X11InStream, X11OutStream};

/// Decodes the setup block of an accepted handshake.
pub trait SetupDecoder: Send + Sync {
    /// Decode `buffer` (response header included).
    fn decode(&self, buffer: &[u8]) -> Result<Setup, X11ClientError>;
}

/// The wire-format decoder from `x11-protocol`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireSetupDecoder;

impl SetupDecoder for WireSetupDecoder {
    fn decode(&self, buffer: &[u8]) -> Result<Setup, X11ClientError> {
        Setup::decode(buffer).map_err(|e| X11ClientError::SetupDecode(e.to_string()))
    }
}

/// An established X11 session.
pub struct Connection<S = Transport> {
    /// Buffered input stream for reading protocol data.
    pub input: X11InStream<ReadHalf<S>>,
    /// Buffered output stream for writing protocol data.
    pub output: X11OutStream<WriteHalf<S>>,
    host: String,
    display_number: u32,
    default_screen: usize,
    authenticated: bool,
    setup: Setup,
}

impl<S: AsyncRead + AsyncWrite> Connection<S> {
    /// Host the session is connected to (empty for local connections).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Display number of the session.
    pub fn display_number(&self) -> u32 {
        self.display_number
    }

    /// Index of the default screen in [`Setup::roots`].
    pub fn default_screen(&self) -> usize {
        self.default_screen
    }

    /// Whether the handshake carried an authority credential.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Setup information sent by the server.
    pub fn setup(&self) -> &Setup {
        &self.setup
    }

    /// The default screen, if the server reported any.
    pub fn default_root(&self) -> Option<&x11_protocol::setup::Screen> {
        self.setup.roots.get(self.default_screen)
    }

    /// Take the streams back out of the connection.
    pub fn into_streams(self) -> (X11InStream<ReadHalf<S>>, X11OutStream<WriteHalf<S>>) {
        (self.input, self.output)
    }
}

/// Opens connections using an authority and a setup decoder.
pub struct Connector {
    config: Config,
    authority: Box<dyn AuthorityLookup>,
    decoder: Box<dyn SetupDecoder>,
}

impl Connector {
    /// Create a connector with the wire-format setup decoder.
    pub fn new(config: Config, authority: impl AuthorityLookup + 'static) -> Self {
        Self {
            config,
            authority: Box::new(authority),
            decoder: Box::new(WireSetupDecoder),
        }
    }

    /// Replace the setup decoder.
    #[must_use]
    pub fn with_decoder(mut self, decoder: impl SetupDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connect to the configured display, or the provider's current display.
    pub async fn connect(
        &self,
        provider: &dyn DisplayProvider,
    ) -> Result<Connection<Transport>, X11ClientError> {
        let spec = resolve_display(self.config.connection.display.as_deref(), provider)?;
        self.connect_to(&spec).await
    }

    /// Connect to a parsed display.
    pub async fn connect_to(
        &self,
        spec: &DisplaySpec,
    ) -> Result<Connection<Transport>, X11ClientError> {
        let transport = Transport::open(spec).await?;
        tracing::debug!(endpoint = %x11_protocol::X11Socket::peer_endpoint(&transport), "transport open");
        self.handshake(transport, spec).await
    }

    /// Run the setup handshake over an already open stream.
    ///
    /// `stream` is consumed: on success it lives on inside the returned
    /// [`Connection`], on failure it is dropped.
    pub async fn handshake<S>(
        &self,
        stream: S,
        spec: &DisplaySpec,
    ) -> Result<Connection<S>, X11ClientError>
    where
        S: AsyncRead + AsyncWrite,
    {
        let host = spec.host.clone().unwrap_or_default();
        let authenticator =
            Authenticator::new(self.authority.as_ref(), self.config.security.allow_unauthenticated);
        let (credential, authenticated) = authenticator.credential(&host, spec.display_number)?;

        let (read_half, write_half) = split(stream);
        let mut input = X11InStream::new(read_half);
        let mut output = X11OutStream::new(write_half);

        let accepted = handshake::perform(&mut input, &mut output, &credential).await?;
        let setup = self.decoder.decode(&accepted.buffer)?;

        let requested = spec.screen_number as usize;
        let default_screen = if requested >= setup.roots.len() {
            0
        } else {
            requested
        };

        tracing::info!(
            display = %spec.raw(),
            vendor = %setup.vendor,
            screens = setup.roots.len(),
            default_screen,
            authenticated,
            "connected to X server"
        );

        Ok(Connection {
            input,
            output,
            host,
            display_number: spec.display_number,
            default_screen,
            authenticated,
            setup,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{NoAuthority, StaticAuthority};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
    use x11_protocol::setup::testing::{encode_success, sample_setup};

    /// Fake server: reads a hello of `hello_len` bytes, answers with `reply`.
    fn fake_server(hello_len: usize, reply: Vec<u8>) -> (DuplexStream, tokio::task::JoinHandle<Vec<u8>>) {
        let (client, mut server) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(async move {
            let mut hello = vec![0u8; hello_len];
            server.read_exact(&mut hello).await.unwrap();
            server.write_all(&reply).await.unwrap();
            // Keep the stream open until the client is done with it.
            let mut rest = Vec::new();
            let _ = server.read_to_end(&mut rest).await;
            hello
        });
        (client, task)
    }

    #[tokio::test]
    async fn test_handshake_with_cookie() {
        let cookie: Vec<u8> = (100u8..116).collect();
        let connector = Connector::new(Config::default(), StaticAuthority::mit_magic_cookie(cookie.clone()));
        let (stream, server) = fake_server(48, encode_success(&sample_setup(1)));
        let spec = DisplaySpec::parse("host:0").unwrap();

        let conn = connector.handshake(stream, &spec).await.unwrap();
        assert!(conn.is_authenticated());
        assert_eq!(conn.host(), "host");
        assert_eq!(conn.display_number(), 0);
        assert_eq!(conn.setup(), &sample_setup(1));
        drop(conn);

        let hello = server.await.unwrap();
        assert_eq!(&hello[12..30], b"MIT-MAGIC-COOKIE-1");
        assert_eq!(&hello[32..48], cookie.as_slice());
    }

    #[tokio::test]
    async fn test_default_screen_kept_when_in_range() {
        let connector = Connector::new(Config::default(), NoAuthority);
        let (stream, _server) = fake_server(12, encode_success(&sample_setup(3)));
        let spec = DisplaySpec::parse(":0.2").unwrap();

        let conn = connector.handshake(stream, &spec).await.unwrap();
        assert_eq!(conn.default_screen(), 2);
        assert!(conn.default_root().is_some());
    }

    #[tokio::test]
    async fn test_default_screen_clamped() {
        let connector = Connector::new(Config::default(), NoAuthority);
        let (stream, _server) = fake_server(12, encode_success(&sample_setup(1)));
        let spec = DisplaySpec::parse(":0.5").unwrap();

        let conn = connector.handshake(stream, &spec).await.unwrap();
        assert_eq!(conn.default_screen(), 0);
        assert_eq!(conn.default_root().unwrap().width_in_pixels, 1920);
    }

    #[tokio::test]
    async fn test_bad_credential_sends_nothing() {
        let connector = Connector::new(
            Config::default(),
            StaticAuthority::mit_magic_cookie(vec![1u8; 4]),
        );
        let (client, mut server) = tokio::io::duplex(1024);
        let spec = DisplaySpec::parse(":0").unwrap();

        let err = connector.handshake(client, &spec).await.err().unwrap();
        assert!(matches!(err, X11ClientError::UnsupportedAuthProtocol(_)));

        // The client half was dropped without writing anything.
        let mut received = Vec::new();
        server.read_to_end(&mut received).await.unwrap();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn test_decoder_failure_surfaces() {
        let connector = Connector::new(Config::default(), NoAuthority);
        // Accepted header with an empty body: the wire decoder cannot use it.
        let (stream, _server) = fake_server(12, vec![1, 0, 11, 0, 0, 0, 0, 0]);
        let spec = DisplaySpec::parse(":0").unwrap();

        let err = connector.handshake(stream, &spec).await.err().unwrap();
        assert!(matches!(err, X11ClientError::SetupDecode(_)));
    }
}
