//! # Lock-step Synchronisation Channel
//!
//! Exchanges a fixed-length numeric vector between two real-time control loops running in
//! separate processes. Each call to [`SynchChannel::update`] drains every message currently
//! waiting from the peer without blocking, keeps the newest payload, and then publishes exactly
//! one message of its own.
//!
//! ## Wire format
//!
//! ```text
//! +--------+-----------+--------------------------------+
//! | letter | counter   | payload                        |
//! | 1 byte | 3 bytes   | len * size_of::<T>() bytes     |
//! | 'A'/'B'| "000"-"999" or "-42" | native endian        |
//! +--------+-----------+--------------------------------+
//! ```
//!
//! One peer acts as the acknowledger and echoes the last counter it observed. The other peer
//! owns the counter and increments it (modulo 1000) whenever it sees its current value echoed
//! back. This gives at most one outstanding message per side, not exactly-once delivery: a peer
//! which ticks faster than the other republishes stale counters, and a peer which misses a cycle
//! silently skips messages.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use byteorder::{ByteOrder, NativeEndian};
use log::{error, trace};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use super::{MonitoredSocket, MonitoredSocketError, SocketOptions, zmq};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Length of the message header (sender letter plus three counter digits).
pub const HEADER_LEN: usize = 4;

/// Counters wrap at this value.
pub const COUNTER_MODULUS: u16 = 1000;

/// Counter sent by an acknowledger which has not observed any message yet. Any negative counter
/// received is read as no counter.
const NO_COUNTER: i16 = -42;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A transport able to carry synchronisation messages between the two peers.
pub trait SynchTransport {
    /// Publish a message to the peer.
    fn send(&mut self, msg: &[u8]) -> Result<(), SynchError>;

    /// Receive the next waiting message from the peer, or `None` if nothing is waiting. Must never
    /// block.
    fn try_recv(&mut self) -> Result<Option<Vec<u8>>, SynchError>;
}

/// A numeric element type which can be carried in a synchronisation payload.
pub trait SynchElement: Copy {
    /// Size of one element on the wire in bytes.
    const SIZE: usize;

    /// Write the element into the buffer, which is exactly `SIZE` bytes long.
    fn write_to(self, buf: &mut [u8]);

    /// Read an element from the buffer, which is exactly `SIZE` bytes long.
    fn read_from(buf: &[u8]) -> Self;
}

macro_rules! impl_synch_element {
    ($($t:ty => $size:expr, $write:ident, $read:ident);+ $(;)?) => {
        $(
            impl SynchElement for $t {
                const SIZE: usize = $size;

                fn write_to(self, buf: &mut [u8]) {
                    NativeEndian::$write(buf, self)
                }

                fn read_from(buf: &[u8]) -> Self {
                    NativeEndian::$read(buf)
                }
            }
        )+
    };
}

impl_synch_element!(
    f64 => 8, write_f64, read_f64;
    f32 => 4, write_f32, read_f32;
    i64 => 8, write_i64, read_i64;
    i32 => 4, write_i32, read_i32;
);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Identity of a peer, which is also the first byte of each message it sends.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerId {
    A,
    B,
}

/// How a peer treats the counter field.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynchRole {
    /// Echo back the last counter observed from the peer.
    Acknowledger,

    /// Own the counter, incrementing it each time the peer echoes the current value.
    Counter,
}

#[derive(thiserror::Error, Debug)]
pub enum SynchError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send to the peer: {0}")]
    SendError(zmq::Error),

    #[error("Could not receive from the peer: {0}")]
    RecvError(zmq::Error),

    #[error("The peer transport has been closed")]
    Disconnected,

    #[error("Malformed message header: {0:?}")]
    BadHeader(Vec<u8>),

    #[error("Payload of {num_bytes} bytes doesn't fit {expected_len} elements of {elem_size} bytes")]
    PayloadShape {
        num_bytes: usize,
        expected_len: usize,
        elem_size: usize
    },

    #[error("Outbound data has {0} elements but the channel carries {1}")]
    OutboundShape(usize, usize),

    #[error("More than {0} messages were waiting from the peer")]
    DrainLimitExceeded(usize),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of a synchronisation channel.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SynchParams {
    /// Which peer this process is.
    pub peer: PeerId,

    /// Role of this peer, if not set the conventional role for the peer is used.
    pub role: Option<SynchRole>,

    /// Endpoint this peer publishes on.
    pub bind_endpoint: String,

    /// Endpoint of the other peer's publisher.
    pub connect_endpoint: String,

    /// Number of elements in each payload, agreed by both peers.
    pub payload_len: usize,

    /// Maximum number of messages drained in one update before giving up.
    pub max_drain: usize,
}

/// A lock-step synchronisation channel.
pub struct SynchChannel<T, X>
where
    T: SynchElement,
    X: SynchTransport
{
    transport: X,

    peer: PeerId,

    role: SynchRole,

    payload_len: usize,

    max_drain: usize,

    /// The counter this peer owns (counter role).
    count: u16,

    /// The last counter received from the peer.
    last_seen: Option<u16>,

    data_out: Option<Vec<T>>,
}

/// A decoded synchronisation message.
#[derive(Debug, Clone, PartialEq)]
pub struct SynchMessage<T> {
    pub peer: PeerId,

    pub counter: Option<u16>,

    pub payload: Vec<T>,
}

/// [`SynchTransport`] over a pair of ZMQ PUB/SUB sockets.
pub struct ZmqTransport {
    pub_socket: MonitoredSocket,

    sub_socket: MonitoredSocket,
}

/// In-process [`SynchTransport`], used to connect two channels in the same process.
pub struct MemTransport {
    tx: Sender<Vec<u8>>,

    rx: Receiver<Vec<u8>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PeerId {
    /// The letter which prefixes this peer's messages.
    pub fn letter(&self) -> u8 {
        match self {
            PeerId::A => b'A',
            PeerId::B => b'B',
        }
    }

    /// The other peer.
    pub fn other(&self) -> PeerId {
        match self {
            PeerId::A => PeerId::B,
            PeerId::B => PeerId::A,
        }
    }

    /// Conventional role of this peer, A acknowledges and B counts.
    pub fn default_role(&self) -> SynchRole {
        match self {
            PeerId::A => SynchRole::Acknowledger,
            PeerId::B => SynchRole::Counter,
        }
    }

    fn from_letter(letter: u8) -> Option<Self> {
        match letter {
            b'A' => Some(PeerId::A),
            b'B' => Some(PeerId::B),
            _ => None
        }
    }
}

impl SynchError {
    /// Return `true` if the error means the peers disagree on the protocol, rather than a
    /// transport problem which may clear on a later update.
    pub fn is_desynchronised(&self) -> bool {
        matches!(
            self,
            SynchError::BadHeader(_)
                | SynchError::PayloadShape { .. }
                | SynchError::OutboundShape(..)
        )
    }
}

impl Default for SynchParams {
    fn default() -> Self {
        Self::default_for(PeerId::A)
    }
}

impl SynchParams {
    /// Default parameters for the given peer, with A publishing on port 5557 and B on 5558.
    pub fn default_for(peer: PeerId) -> Self {
        let (bind_endpoint, connect_endpoint) = match peer {
            PeerId::A => ("tcp://*:5557", "tcp://localhost:5558"),
            PeerId::B => ("tcp://*:5558", "tcp://localhost:5557"),
        };

        Self {
            peer,
            role: None,
            bind_endpoint: bind_endpoint.into(),
            connect_endpoint: connect_endpoint.into(),
            payload_len: 1,
            max_drain: 1000,
        }
    }

    /// The role this peer will take.
    pub fn role(&self) -> SynchRole {
        self.role.unwrap_or_else(|| self.peer.default_role())
    }
}

impl<T, X> SynchChannel<T, X>
where
    T: SynchElement,
    X: SynchTransport
{
    /// Create a new channel over the given transport.
    pub fn new(transport: X, params: &SynchParams) -> Self {
        Self {
            transport,
            peer: params.peer,
            role: params.role(),
            payload_len: params.payload_len,
            max_drain: params.max_drain,
            count: 0,
            last_seen: None,
            data_out: None,
        }
    }

    /// Read all waiting messages, then send `data_in` to the peer.
    ///
    /// Returns the newest payload received from the peer so far, which may be from a previous
    /// update if nothing new arrived, or `None` if the peer has never been heard from.
    pub fn update(&mut self, data_in: &[T]) -> Result<Option<&[T]>, SynchError> {
        if data_in.len() != self.payload_len {
            return Err(SynchError::OutboundShape(data_in.len(), self.payload_len));
        }

        // Drain everything currently waiting, one extra receive detects an overfull queue
        let mut waiting = Vec::new();
        loop {
            match self.transport.try_recv()? {
                Some(_) if waiting.len() == self.max_drain => {
                    return Err(SynchError::DrainLimitExceeded(self.max_drain));
                },
                Some(raw) => waiting.push(raw),
                None => break
            }
        }

        // Decode everything before touching any state
        let mut msgs = Vec::with_capacity(waiting.len());
        for raw in waiting.iter() {
            match decode(raw, self.payload_len) {
                Ok(m) => msgs.push(m),
                Err(e) => {
                    error!("Could not decode message from the peer: {}", e);
                    return Err(e);
                }
            }
        }

        for msg in msgs {
            // Ignore our own messages should the transport loop them back
            if msg.peer == self.peer {
                continue;
            }

            self.receive(&msg);
            self.data_out = Some(msg.payload);
        }

        // Publish our own message
        let counter = match self.role {
            SynchRole::Counter => Some(self.count),
            SynchRole::Acknowledger => self.last_seen,
        };
        self.transport.send(&encode(self.peer, counter, data_in))?;

        Ok(self.data_out.as_deref())
    }

    /// The counter that will be attached to the next outbound message.
    pub fn counter(&self) -> Option<u16> {
        match self.role {
            SynchRole::Counter => Some(self.count),
            SynchRole::Acknowledger => self.last_seen,
        }
    }

    /// The last counter received from the peer.
    pub fn last_seen(&self) -> Option<u16> {
        self.last_seen
    }

    pub fn role(&self) -> SynchRole {
        self.role
    }

    /// Update the counters from a received message.
    fn receive(&mut self, msg: &SynchMessage<T>) {
        trace!("Synch {:?} got counter {:?} from {:?}", self.peer, msg.counter, msg.peer);

        self.last_seen = msg.counter;

        if self.role == SynchRole::Counter && msg.counter == Some(self.count) {
            self.count = (self.count + 1) % COUNTER_MODULUS;
        }
    }
}

impl<T> SynchChannel<T, ZmqTransport>
where
    T: SynchElement
{
    /// Create a channel over ZMQ using the endpoints in the parameters.
    pub fn connect(ctx: &zmq::Context, params: &SynchParams) -> Result<Self, SynchError> {
        Ok(Self::new(ZmqTransport::new(ctx, params)?, params))
    }

    /// Return `true` if the peer's publisher is connected.
    pub fn peer_connected(&self) -> bool {
        self.transport.sub_socket.connected()
    }
}

impl ZmqTransport {
    /// Create the publisher and subscriber sockets for a peer.
    ///
    /// Neither socket waits for the other process, so peers can be started in any order.
    pub fn new(ctx: &zmq::Context, params: &SynchParams) -> Result<Self, SynchError> {
        let pub_options = SocketOptions {
            bind: true,
            linger: 0,
            send_timeout: 0,
            ..Default::default()
        };
        let sub_options = SocketOptions {
            subscribe: vec![vec![params.peer.other().letter()]],
            linger: 0,
            ..Default::default()
        };

        let pub_socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            pub_options,
            &params.bind_endpoint
        ).map_err(SynchError::SocketError)?;
        let sub_socket = MonitoredSocket::new(
            ctx,
            zmq::SUB,
            sub_options,
            &params.connect_endpoint
        ).map_err(SynchError::SocketError)?;

        Ok(Self {
            pub_socket,
            sub_socket
        })
    }
}

impl SynchTransport for ZmqTransport {
    fn send(&mut self, msg: &[u8]) -> Result<(), SynchError> {
        match self.pub_socket.send(msg, zmq::DONTWAIT) {
            Ok(_) => Ok(()),
            // PUB sockets drop messages rather than block, a full queue is not an error
            Err(zmq::Error::EAGAIN) => Ok(()),
            Err(e) => Err(SynchError::SendError(e))
        }
    }

    fn try_recv(&mut self) -> Result<Option<Vec<u8>>, SynchError> {
        match self.sub_socket.recv_bytes(zmq::DONTWAIT) {
            Ok(b) => Ok(Some(b)),
            Err(zmq::Error::EAGAIN) => Ok(None),
            Err(e) => Err(SynchError::RecvError(e))
        }
    }
}

impl MemTransport {
    /// Create a pair of connected transports.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_b) = mpsc::channel();
        let (tx_b, rx_a) = mpsc::channel();

        (
            Self { tx: tx_a, rx: rx_a },
            Self { tx: tx_b, rx: rx_b },
        )
    }
}

impl SynchTransport for MemTransport {
    fn send(&mut self, msg: &[u8]) -> Result<(), SynchError> {
        self.tx.send(msg.to_vec()).map_err(|_| SynchError::Disconnected)
    }

    fn try_recv(&mut self) -> Result<Option<Vec<u8>>, SynchError> {
        match self.rx.try_recv() {
            Ok(m) => Ok(Some(m)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SynchError::Disconnected)
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Encode a message for the wire.
pub fn encode<T: SynchElement>(peer: PeerId, counter: Option<u16>, payload: &[T]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(HEADER_LEN + payload.len() * T::SIZE);

    msg.push(peer.letter());
    match counter {
        Some(c) => msg.extend_from_slice(format!("{:03}", c % COUNTER_MODULUS).as_bytes()),
        None => msg.extend_from_slice(format!("{:03}", NO_COUNTER).as_bytes()),
    }

    for elem in payload {
        let start = msg.len();
        msg.resize(start + T::SIZE, 0);
        elem.write_to(&mut msg[start..]);
    }

    msg
}

/// Decode a message from the wire, checking that the payload holds exactly `payload_len`
/// elements.
pub fn decode<T: SynchElement>(
    msg: &[u8],
    payload_len: usize
) -> Result<SynchMessage<T>, SynchError> {
    if msg.len() < HEADER_LEN {
        return Err(SynchError::BadHeader(msg.to_vec()));
    }

    let peer = PeerId::from_letter(msg[0])
        .ok_or_else(|| SynchError::BadHeader(msg[..HEADER_LEN].to_vec()))?;

    let counter_bytes = &msg[1..HEADER_LEN];
    let counter = match std::str::from_utf8(counter_bytes)
        .ok()
        .filter(|s| s.bytes().all(|b| b.is_ascii_digit() || b == b'-'))
        .and_then(|s| s.parse::<i16>().ok())
    {
        Some(c) if c < 0 => None,
        Some(c) => Some(c as u16),
        None => return Err(SynchError::BadHeader(msg[..HEADER_LEN].to_vec()))
    };

    let body = &msg[HEADER_LEN..];
    if body.len() % T::SIZE != 0 || body.len() / T::SIZE != payload_len {
        return Err(SynchError::PayloadShape {
            num_bytes: body.len(),
            expected_len: payload_len,
            elem_size: T::SIZE
        });
    }

    let payload = body.chunks_exact(T::SIZE).map(T::read_from).collect();

    Ok(SynchMessage {
        peer,
        counter,
        payload
    })
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn channel_pair(
        role_a: SynchRole,
        role_b: SynchRole,
        len: usize
    ) -> (SynchChannel<f64, MemTransport>, SynchChannel<f64, MemTransport>) {
        let (ta, tb) = MemTransport::pair();

        let params_a = SynchParams {
            role: Some(role_a),
            payload_len: len,
            ..SynchParams::default_for(PeerId::A)
        };
        let params_b = SynchParams {
            role: Some(role_b),
            payload_len: len,
            ..SynchParams::default_for(PeerId::B)
        };

        (SynchChannel::new(ta, &params_a), SynchChannel::new(tb, &params_b))
    }

    #[test]
    fn test_header() -> Result<(), SynchError> {
        let msg = encode(PeerId::B, Some(7), &[1.5f64, -2.0]);
        assert_eq!(&msg[..4], b"B007");
        assert_eq!(msg.len(), 4 + 16);

        let decoded: SynchMessage<f64> = decode(&msg, 2)?;
        assert_eq!(decoded.peer, PeerId::B);
        assert_eq!(decoded.counter, Some(7));
        assert_eq!(decoded.payload, vec![1.5, -2.0]);

        let msg = encode::<f32>(PeerId::A, None, &[]);
        assert_eq!(msg, b"A-42".to_vec());

        Ok(())
    }

    #[test]
    fn test_negative_counter() -> Result<(), SynchError> {
        // An acknowledger which hasn't heard anything yet sends -42
        let mut msg = b"A-42".to_vec();
        msg.extend_from_slice(&1.0f64.to_ne_bytes());

        let decoded: SynchMessage<f64> = decode(&msg, 1)?;
        assert_eq!(decoded.peer, PeerId::A);
        assert_eq!(decoded.counter, None);
        assert_eq!(decoded.payload, vec![1.0]);

        assert_eq!(decode::<f64>(b"B-01", 0)?.counter, None);
        assert!(matches!(decode::<f64>(b"B4-2", 0), Err(SynchError::BadHeader(_))));
        assert!(matches!(decode::<f64>(b"B---", 0), Err(SynchError::BadHeader(_))));

        Ok(())
    }

    #[test]
    fn test_payload_shape_mismatch() {
        // 12 bytes is not a whole number of f64s
        let mut msg = b"A001".to_vec();
        msg.extend_from_slice(&[0u8; 12]);
        match decode::<f64>(&msg, 2) {
            Err(SynchError::PayloadShape { num_bytes: 12, .. }) => (),
            r => panic!("Expected a payload shape error, got {:?}", r)
        }

        // Right element size but the wrong number of elements
        let msg = encode(PeerId::A, Some(1), &[1.0f64, 2.0, 3.0]);
        assert!(matches!(decode::<f64>(&msg, 2), Err(SynchError::PayloadShape { .. })));

        // Garbage header
        assert!(matches!(decode::<f64>(b"Cx12", 0), Err(SynchError::BadHeader(_))));
        assert!(matches!(decode::<f64>(b"A1x2", 0), Err(SynchError::BadHeader(_))));
        assert!(matches!(decode::<f64>(b"A1", 0), Err(SynchError::BadHeader(_))));
    }

    #[test]
    fn test_round_trip() -> Result<(), SynchError> {
        // A owns the counter, B echoes it
        let (mut a, mut b) = channel_pair(SynchRole::Counter, SynchRole::Acknowledger, 2);
        let n = a.counter();
        assert_eq!(n, Some(0));

        // A publishes P with counter n, nothing received yet
        assert_eq!(a.update(&[1.0, 2.0])?, None);

        // B's next poll returns P and echoes n
        assert_eq!(b.update(&[3.0, 4.0])?, Some(&[1.0, 2.0][..]));
        assert_eq!(b.last_seen(), n);
        assert_eq!(b.counter(), n);

        // A's next poll returns B's payload, carrying the same counter n
        assert_eq!(a.update(&[5.0, 6.0])?, Some(&[3.0, 4.0][..]));
        assert_eq!(a.last_seen(), n);

        // Having seen its counter echoed, A moves on to the next one
        assert_eq!(a.counter(), Some(1));

        Ok(())
    }

    #[test]
    fn test_conventional_roles() -> Result<(), SynchError> {
        let (ta, tb) = MemTransport::pair();
        let mut a: SynchChannel<f64, _> = SynchChannel::new(ta, &SynchParams::default_for(PeerId::A));
        let mut b: SynchChannel<f64, _> = SynchChannel::new(tb, &SynchParams::default_for(PeerId::B));

        assert_eq!(a.role(), SynchRole::Acknowledger);
        assert_eq!(b.role(), SynchRole::Counter);

        // A hasn't seen anything yet so sends the empty counter
        assert_eq!(a.counter(), None);
        a.update(&[0.5])?;

        // B doesn't increment on an empty counter
        assert_eq!(b.update(&[1.0])?, Some(&[0.5][..]));
        assert_eq!(b.counter(), Some(0));

        // A echoes B's 0, B increments when it sees it
        assert_eq!(a.update(&[0.6])?, Some(&[1.0][..]));
        assert_eq!(a.counter(), Some(0));
        assert_eq!(b.update(&[1.1])?, Some(&[0.6][..]));
        assert_eq!(b.counter(), Some(1));

        Ok(())
    }

    #[test]
    fn test_counter_wraps() -> Result<(), SynchError> {
        let (mut a, mut b) = channel_pair(SynchRole::Acknowledger, SynchRole::Counter, 1);

        for _ in 0..COUNTER_MODULUS {
            b.update(&[0.0])?;
            a.update(&[0.0])?;
        }
        b.update(&[0.0])?;

        // B started at 0 and was acknowledged 1000 times
        assert_eq!(b.counter(), Some(0));

        Ok(())
    }

    #[test]
    fn test_keeps_newest_payload() -> Result<(), SynchError> {
        let (mut a, mut b) = channel_pair(SynchRole::Counter, SynchRole::Acknowledger, 1);

        // A ticks three times before B polls once, B only keeps the newest
        a.update(&[1.0])?;
        a.update(&[2.0])?;
        a.update(&[3.0])?;
        assert_eq!(b.update(&[0.0])?, Some(&[3.0][..]));

        // Nothing new, the previous payload is retained
        assert_eq!(b.update(&[0.0])?, Some(&[3.0][..]));

        // A republished the same counter since it was never acknowledged in between
        assert_eq!(b.last_seen(), Some(0));

        Ok(())
    }

    #[test]
    fn test_drain_limit() -> Result<(), SynchError> {
        let (ta, tb) = MemTransport::pair();
        let mut a: SynchChannel<f64, _> = SynchChannel::new(ta, &SynchParams {
            payload_len: 1,
            ..SynchParams::default_for(PeerId::A)
        });
        let mut b: SynchChannel<f64, _> = SynchChannel::new(tb, &SynchParams {
            payload_len: 1,
            max_drain: 2,
            ..SynchParams::default_for(PeerId::B)
        });

        for i in 0..3 {
            a.update(&[i as f64])?;
        }

        assert!(matches!(b.update(&[0.0]), Err(SynchError::DrainLimitExceeded(2))));

        // Nothing was taken from the overfull queue
        assert_eq!(b.last_seen(), None);
        assert_eq!(b.counter(), Some(0));

        Ok(())
    }

    #[test]
    fn test_drain_exactly_limit() -> Result<(), SynchError> {
        let (mut a, mut b) = channel_pair(SynchRole::Acknowledger, SynchRole::Counter, 1);
        b.max_drain = 2;

        a.update(&[1.0])?;
        a.update(&[2.0])?;

        assert_eq!(b.update(&[0.0])?, Some(&[2.0][..]));

        Ok(())
    }

    #[test]
    fn test_desynchronised() {
        let (mut a, mut b) = channel_pair(SynchRole::Counter, SynchRole::Acknowledger, 2);

        // B expects two elements per payload, A publishes a malformed message
        a.transport.send(&encode(PeerId::A, Some(1), &[1.0f64, 2.0, 3.0])).unwrap();

        let err = b.update(&[0.0, 0.0]).unwrap_err();
        assert!(matches!(err, SynchError::PayloadShape { .. }));
        assert!(err.is_desynchronised());

        assert!(SynchError::BadHeader(b"C000".to_vec()).is_desynchronised());
        assert!(!SynchError::Disconnected.is_desynchronised());
        assert!(!SynchError::DrainLimitExceeded(1).is_desynchronised());
    }

    #[test]
    fn test_outbound_shape() {
        let (mut a, _b) = channel_pair(SynchRole::Counter, SynchRole::Acknowledger, 3);
        assert!(matches!(a.update(&[1.0]), Err(SynchError::OutboundShape(1, 3))));
    }

    #[test]
    fn test_params_from_toml() {
        let params: SynchParams = toml::from_str(
            "peer = \"B\"\nrole = \"Acknowledger\"\npayload_len = 8"
        ).unwrap();

        assert_eq!(params.peer, PeerId::B);
        assert_eq!(params.role(), SynchRole::Acknowledger);
        assert_eq!(params.payload_len, 8);
        assert_eq!(params.max_drain, 1000);
    }
}
