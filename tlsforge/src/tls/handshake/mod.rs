//! Handshake messages and the handlers which prepare and parse them.
//!
//! Every message kind is a struct whose wire fields are [`Injectable`] values. The handler logic
//! of a kind is its [`HandshakeBody`] implementation; [`prepare_message`] and [`parse_message`]
//! wrap it with the 4 byte header `(type << 24) | length` and update the transcript digest.
//! [`HandshakeMessage`] closes the set of kinds and dispatches to them.
//!
//! [`Injectable`]: forge::inject::Injectable

use std::fmt::Debug;

use forge::codec::{put_uint, Reader};
use forge::error::Error;
use forge::inject::{FieldMut, InjectableByte, InjectableBytes, InjectableInteger};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::tls::algorithm::{key_exchange_algorithm, KeyExchangeFamily};
use crate::tls::context::{LengthCheck, TlsContext};
use crate::tls::enums::HandshakeType;

pub mod certificate;
pub mod certificate_request;
pub mod client_hello;
pub mod client_key_exchange;
pub mod finished;
pub mod hello_verify_request;
pub mod server_hello;
pub mod server_hello_done;

pub use certificate::CertificateMessage;
pub use certificate_request::CertificateRequestMessage;
pub use client_hello::ClientHelloMessage;
pub use client_key_exchange::ClientKeyExchangeMessage;
pub use finished::FinishedMessage;
pub use hello_verify_request::HelloVerifyRequestMessage;
pub use server_hello::ServerHelloMessage;
pub use server_hello_done::ServerHelloDoneMessage;

pub const HEADER_LENGTH: usize = 4;

/// Fields shared by all handshake messages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandshakeHeader {
    pub typ: InjectableByte,
    pub length: InjectableInteger,
    /// Header and payload as written or read
    pub complete_resulting_message: InjectableBytes,
}

impl HandshakeHeader {
    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        match name {
            "type" => Some(FieldMut::Byte(&mut self.typ)),
            "length" => Some(FieldMut::Integer(&mut self.length)),
            "complete_resulting_message" => {
                Some(FieldMut::Bytes(&mut self.complete_resulting_message))
            }
            _ => None,
        }
    }

    /// Declared payload length of a parsed message
    pub fn declared_length(&self) -> usize {
        self.length.original().copied().unwrap_or_default() as usize
    }
}

/// The handler of one message kind
pub trait HandshakeBody: Debug {
    const TYPE: HandshakeType;

    fn header(&self) -> &HandshakeHeader;

    fn header_mut(&mut self) -> &mut HandshakeHeader;

    /// Fail if the negotiated parameters are not the ones this handler implements
    fn check_context(&self, _ctx: &TlsContext) -> Result<(), Error> {
        Ok(())
    }

    /// Compute the fields from the context and return the serialized payload
    fn prepare_body(&mut self, ctx: &mut TlsContext) -> Result<Vec<u8>, Error>;

    /// Read the fields from `r`, which is positioned right after the header
    fn parse_body(&mut self, r: &mut Reader) -> Result<(), Error>;

    /// Apply the parsed fields to the context. Only called for a message which passed the
    /// length check, so a rejected message leaves the context as it was.
    fn adjust_context(&mut self, _ctx: &mut TlsContext) -> Result<(), Error> {
        Ok(())
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>>;

    fn updates_digest(&self) -> bool {
        true
    }
}

/// Serialize `message` from the context. Injected field chains are applied while writing.
pub fn prepare_message<M: HandshakeBody>(
    message: &mut M,
    ctx: &mut TlsContext,
) -> Result<Vec<u8>, Error> {
    message.check_context(ctx)?;
    let payload = message.prepare_body(ctx)?;

    let header = message.header_mut();
    header.typ.set_original(M::TYPE.get_u8());
    header.length.set_original(payload.len() as u32);

    let mut bytes = Vec::with_capacity(HEADER_LENGTH + payload.len());
    bytes.push(header.typ.value());
    put_uint(header.length.value(), 3, &mut bytes);
    bytes.extend_from_slice(&payload);
    header.complete_resulting_message.set_original(bytes);
    let complete = header.complete_resulting_message.value();

    if message.updates_digest() {
        ctx.digest.add_message(&complete);
    }
    debug!("Prepared {:?} ({} bytes)", M::TYPE, complete.len());
    trace!("{:?}: {}", M::TYPE, hex::encode(&complete));
    Ok(complete)
}

/// Parse a message of kind `M` starting at `pointer` in `bytes`. Returns the position right after
/// the last consumed byte.
pub fn parse_message<M: HandshakeBody>(
    message: &mut M,
    ctx: &mut TlsContext,
    bytes: &[u8],
    pointer: usize,
) -> Result<usize, Error> {
    let mut r = Reader::init_at(bytes, pointer);
    let typ = r.read_u8()?;
    if typ != M::TYPE.get_u8() {
        return Err(Error::ProtocolViolation(format!(
            "invalid message type {:#04x}, expected {:?}",
            typ,
            M::TYPE
        )));
    }
    let length = r.read_u24()?;
    let header = message.header_mut();
    header.typ.set_original(typ);
    header.length.set_original(length);

    message.check_context(ctx)?;
    let body_start = r.used();
    message.parse_body(&mut r)?;
    check_length(ctx.length_check, M::TYPE, length as usize, r.used() - body_start)?;
    message.adjust_context(ctx)?;

    let complete = r.consumed_since(pointer).to_vec();
    if message.updates_digest() {
        ctx.digest.add_message(&complete);
    }
    message
        .header_mut()
        .complete_resulting_message
        .set_original(complete);
    debug!("Parsed {:?} ending at {}", M::TYPE, r.used());
    Ok(r.used())
}

fn check_length(
    policy: LengthCheck,
    typ: HandshakeType,
    declared: usize,
    consumed: usize,
) -> Result<(), Error> {
    if declared == consumed {
        return Ok(());
    }
    match policy {
        LengthCheck::Strict => Err(Error::ProtocolViolation(format!(
            "{:?} declares a length of {} but its fields span {} bytes",
            typ, declared, consumed
        ))),
        LengthCheck::Tolerant => {
            warn!(
                "{:?} declares a length of {} but its fields span {} bytes",
                typ, declared, consumed
            );
            Ok(())
        }
    }
}

/// Whether bytes of the declared payload remain, used for optional trailing sections
pub(crate) fn payload_left(header: &HandshakeHeader, body_start: usize, r: &Reader) -> bool {
    r.used() < body_start + header.declared_length() && r.any_left()
}

/// Read a `width` byte length followed by that many bytes into the pair of fields
pub(crate) fn read_vector(
    r: &mut Reader,
    width: usize,
    length: &mut InjectableInteger,
    payload: &mut InjectableBytes,
) -> Result<(), Error> {
    let len = r.read_uint(width)?;
    length.set_original(len);
    payload.set_original(r.take(len as usize)?.to_vec());
    Ok(())
}

/// Set the payload field, derive its length from the payload as written and append both
pub(crate) fn write_vector(
    bytes: &mut Vec<u8>,
    width: usize,
    length: &mut InjectableInteger,
    payload: &mut InjectableBytes,
    original: Vec<u8>,
) {
    payload.set_original(original);
    let data = payload.value();
    length.set_original(data.len() as u32);
    put_uint(length.value(), width, bytes);
    bytes.extend_from_slice(&data);
}

macro_rules! dispatch {
    ($value:expr, $message:ident => $body:expr) => {
        match $value {
            HandshakeMessage::ClientHello($message) => $body,
            HandshakeMessage::ServerHello($message) => $body,
            HandshakeMessage::HelloVerifyRequest($message) => $body,
            HandshakeMessage::Certificate($message) => $body,
            HandshakeMessage::CertificateRequest($message) => $body,
            HandshakeMessage::ServerHelloDone($message) => $body,
            HandshakeMessage::ClientKeyExchange($message) => $body,
            HandshakeMessage::Finished($message) => $body,
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HandshakeMessage {
    ClientHello(ClientHelloMessage),
    ServerHello(ServerHelloMessage),
    HelloVerifyRequest(HelloVerifyRequestMessage),
    Certificate(CertificateMessage),
    CertificateRequest(CertificateRequestMessage),
    ServerHelloDone(ServerHelloDoneMessage),
    ClientKeyExchange(ClientKeyExchangeMessage),
    Finished(FinishedMessage),
}

impl HandshakeMessage {
    /// An empty message of kind `typ`. A ClientKeyExchange needs to know its key exchange and
    /// is created with [`HandshakeMessage::for_context`] instead.
    pub fn new(typ: HandshakeType) -> Result<Self, Error> {
        Ok(match typ {
            HandshakeType::ClientHello => Self::ClientHello(ClientHelloMessage::default()),
            HandshakeType::ServerHello => Self::ServerHello(ServerHelloMessage::default()),
            HandshakeType::HelloVerifyRequest => {
                Self::HelloVerifyRequest(HelloVerifyRequestMessage::default())
            }
            HandshakeType::Certificate => Self::Certificate(CertificateMessage::default()),
            HandshakeType::CertificateRequest => {
                Self::CertificateRequest(CertificateRequestMessage::default())
            }
            HandshakeType::ServerHelloDone => {
                Self::ServerHelloDone(ServerHelloDoneMessage::default())
            }
            HandshakeType::Finished => Self::Finished(FinishedMessage::default()),
            other => {
                return Err(Error::ConfigurationMismatch(format!(
                    "no handler for {:?} messages",
                    other
                )))
            }
        })
    }

    pub fn client_key_exchange(family: KeyExchangeFamily) -> Self {
        Self::ClientKeyExchange(ClientKeyExchangeMessage::new(family))
    }

    /// An empty message of kind `typ`, specialized for the parameters negotiated in `ctx`
    pub fn for_context(typ: HandshakeType, ctx: &TlsContext) -> Result<Self, Error> {
        match typ {
            HandshakeType::ClientKeyExchange => {
                let family = key_exchange_algorithm(ctx.selected_cipher_suite)?.family();
                Ok(Self::client_key_exchange(family))
            }
            typ => Self::new(typ),
        }
    }

    pub fn typ(&self) -> HandshakeType {
        match self {
            HandshakeMessage::ClientHello(_) => HandshakeType::ClientHello,
            HandshakeMessage::ServerHello(_) => HandshakeType::ServerHello,
            HandshakeMessage::HelloVerifyRequest(_) => HandshakeType::HelloVerifyRequest,
            HandshakeMessage::Certificate(_) => HandshakeType::Certificate,
            HandshakeMessage::CertificateRequest(_) => HandshakeType::CertificateRequest,
            HandshakeMessage::ServerHelloDone(_) => HandshakeType::ServerHelloDone,
            HandshakeMessage::ClientKeyExchange(_) => HandshakeType::ClientKeyExchange,
            HandshakeMessage::Finished(_) => HandshakeType::Finished,
        }
    }

    pub fn header(&self) -> &HandshakeHeader {
        dispatch!(self, m => m.header())
    }

    /// The bytes of the message as last prepared or parsed
    pub fn complete_resulting_message(&self) -> Vec<u8> {
        self.header().complete_resulting_message.value()
    }

    pub fn prepare(&mut self, ctx: &mut TlsContext) -> Result<Vec<u8>, Error> {
        dispatch!(self, m => prepare_message(m, ctx))
    }

    pub fn parse(
        &mut self,
        ctx: &mut TlsContext,
        bytes: &[u8],
        pointer: usize,
    ) -> Result<usize, Error> {
        dispatch!(self, m => parse_message(m, ctx, bytes, pointer))
    }

    /// Parse whichever supported message starts at `pointer`
    pub fn read_next(
        ctx: &mut TlsContext,
        bytes: &[u8],
        pointer: usize,
    ) -> Result<(Self, usize), Error> {
        let typ = Reader::init_at(bytes, pointer).read_u8()?;
        let typ = HandshakeType::from(typ);
        let mut message = match typ {
            HandshakeType::ClientKeyExchange => Self::for_context(typ, ctx)?,
            typ => Self::new(typ).map_err(|_| {
                Error::ProtocolViolation(format!("unexpected handshake message {:?}", typ))
            })?,
        };
        let next = message.parse(ctx, bytes, pointer)?;
        Ok((message, next))
    }

    /// Access a field by name, e.g. to attach a modification chain loaded from a file. The header
    /// fields are called `type`, `length` and `complete_resulting_message`.
    pub fn field_mut(&mut self, name: &str) -> Result<FieldMut<'_>, Error> {
        let typ = self.typ();
        let field = match name {
            "type" | "length" | "complete_resulting_message" => {
                dispatch!(self, m => m.header_mut().field_mut(name))
            }
            _ => dispatch!(self, m => m.field_mut(name)),
        };
        field.ok_or_else(|| Error::Config(format!("{:?} has no field named {}", typ, name)))
    }
}
