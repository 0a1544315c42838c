//! Binary control protocol server
//!
//! Every frame carries a 2-byte big-endian length prefix. Requests are `[op, param, payload...]`
//! and each one gets a `[status, value...]` reply where status is an [`Ack`] code.

use std::net::SocketAddr;

use bytes::{BufMut, Bytes, BytesMut};
use futures::prelude::*;
use strum_macros::FromRepr;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_util::codec::LengthDelimitedCodec;

use super::common::is_disconnect;
use crate::{
    control::{Ack, ParamKind},
    lamp::LampHandle,
};

#[derive(Debug, Error)]
pub enum ControlServerError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u8)]
enum Op {
    Write = 0x01,
    Read = 0x02,
    Advance = 0x03,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("empty request")]
    Empty,
    #[error("unknown operation {0:#04x}")]
    UnknownOp(u8),
    #[error("missing parameter id")]
    MissingParam,
    #[error("unknown parameter {0:#04x}")]
    UnknownParam(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request<'a> {
    Write(ParamKind, &'a [u8]),
    Read(ParamKind),
    NextPattern,
}

impl<'a> Request<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, RequestError> {
        let (&op, rest) = bytes.split_first().ok_or(RequestError::Empty)?;
        let op = Op::from_repr(op).ok_or(RequestError::UnknownOp(op))?;

        if op == Op::Advance {
            return Ok(Request::NextPattern);
        }

        let (&param, payload) = rest.split_first().ok_or(RequestError::MissingParam)?;
        let param = ParamKind::from_repr(param).ok_or(RequestError::UnknownParam(param))?;

        Ok(match op {
            Op::Write => Request::Write(param, payload),
            Op::Read | Op::Advance => Request::Read(param),
        })
    }
}

fn reply(ack: Ack, value: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + value.len());
    buf.put_u8(ack.code());
    buf.put_slice(value);
    buf.freeze()
}

async fn handle_request(peer_addr: SocketAddr, request_bytes: &[u8], lamp: &LampHandle) -> Bytes {
    let request = match Request::parse(request_bytes) {
        Ok(request) => request,
        Err(error) => {
            warn!("({}) invalid request: {}", peer_addr, error);
            return reply(Ack::InternalError, &[]);
        }
    };

    trace!("({}) got request: {:?}", peer_addr, request);

    match request {
        Request::Write(kind, payload) => {
            let result = lamp.write(kind, payload.to_vec()).await;
            if let Err(error) = &result {
                debug!("({}) write of {} failed: {}", peer_addr, kind, error);
            }

            reply(Ack::from(&result), &[])
        }
        Request::Read(kind) => match lamp.read(kind).await {
            Ok(value) => reply(Ack::Success, &value),
            Err(error) => {
                error!("({}) error reading {}: {}", peer_addr, kind, error);
                reply(Ack::InternalError, &[])
            }
        },
        Request::NextPattern => match lamp.next_pattern().await {
            Ok(pattern) => reply(Ack::Success, &[pattern.id()]),
            Err(error) => {
                error!("({}) error advancing pattern: {}", peer_addr, error);
                reply(Ack::InternalError, &[])
            }
        },
    }
}

pub fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(2)
        .new_codec()
}

pub async fn handle_client(
    (socket, peer_addr): (TcpStream, SocketAddr),
    lamp: LampHandle,
) -> Result<(), ControlServerError> {
    debug!("accepted new connection from {}", peer_addr);

    let framed = tokio_util::codec::Framed::new(socket, codec());
    let (mut writer, mut reader) = framed.split();

    while let Some(request_bytes) = reader.next().await {
        let request_bytes = match request_bytes {
            Ok(rb) => rb,
            Err(error) if is_disconnect(&error) => break,
            Err(error) => {
                error!("({}) error reading frame: {}", peer_addr, error);
                continue;
            }
        };

        let reply = handle_request(peer_addr, &request_bytes, &lamp).await;

        trace!("({}) sending response: {:?}", peer_addr, reply);
        writer.send(reply).await?;
    }

    debug!("({}) connection closed", peer_addr);
    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio_util::codec::Framed;

    use super::*;
    use crate::{
        lamp::{device::tests::CaptureDevice, Lamp},
        mapping::AddressMap,
        models::{Config, Pattern},
        servers,
    };

    #[test]
    fn parse_requests() {
        assert_eq!(
            Request::parse(&[0x01, 0x01, 1, 2, 3, 4]),
            Ok(Request::Write(ParamKind::Color, &[1, 2, 3, 4]))
        );
        assert_eq!(
            Request::parse(&[0x02, 0x04]),
            Ok(Request::Read(ParamKind::Pattern))
        );
        assert_eq!(Request::parse(&[0x03]), Ok(Request::NextPattern));

        assert_eq!(Request::parse(&[]), Err(RequestError::Empty));
        assert_eq!(Request::parse(&[0x07]), Err(RequestError::UnknownOp(7)));
        assert_eq!(Request::parse(&[0x01]), Err(RequestError::MissingParam));
        assert_eq!(
            Request::parse(&[0x01, 0x09, 0]),
            Err(RequestError::UnknownParam(9))
        );
    }

    async fn exchange(
        client: &mut Framed<TcpStream, LengthDelimitedCodec>,
        request: &'static [u8],
    ) -> Vec<u8> {
        client.send(Bytes::from_static(request)).await.unwrap();
        client.next().await.unwrap().unwrap().to_vec()
    }

    #[tokio::test]
    async fn control_session() {
        let config = Config::default();
        let (lamp, handle) = Lamp::with_device(
            &config,
            AddressMap::hex_panel(),
            CaptureDevice::default().into_device(96, config.settings.brightness),
        )
        .unwrap();
        tokio::spawn(lamp.run());

        let server = servers::bind("Control", "127.0.0.1:0".parse().unwrap(), {
            let handle = handle.clone();
            move |tcp| handle_client(tcp, handle.clone())
        })
        .await
        .unwrap();

        let socket = TcpStream::connect(server.local_addr()).await.unwrap();
        let mut client = Framed::new(socket, codec());

        // Initial settings read back
        assert_eq!(exchange(&mut client, &[0x02, 0x02]).await, vec![0x00, 226]);
        assert_eq!(exchange(&mut client, &[0x02, 0x04]).await, vec![0x00, 1]);

        assert_eq!(exchange(&mut client, &[0x01, 0x01, 9, 8, 7, 6]).await, vec![0x00]);
        assert_eq!(exchange(&mut client, &[0x02, 0x01]).await, vec![0x00, 9, 8, 7, 6]);

        // Rejected writes
        assert_eq!(exchange(&mut client, &[0x01, 0x01, 9, 8]).await, vec![0x0D]);
        assert_eq!(exchange(&mut client, &[0x01, 0x04, 99]).await, vec![0x0E]);
        assert_eq!(exchange(&mut client, &[0x02, 0x01]).await, vec![0x00, 9, 8, 7, 6]);

        // Malformed frames keep the connection open
        assert_eq!(exchange(&mut client, &[0x42]).await, vec![0x0E]);
        assert_eq!(exchange(&mut client, &[]).await, vec![0x0E]);

        assert_eq!(
            exchange(&mut client, &[0x03]).await,
            vec![0x00, Pattern::Circle.id()]
        );
        assert_eq!(exchange(&mut client, &[0x01, 0x03, 1]).await, vec![0x00]);
        assert_eq!(exchange(&mut client, &[0x02, 0x03]).await, vec![0x00, 1]);

        handle.stop().await.unwrap();
        assert_eq!(exchange(&mut client, &[0x02, 0x03]).await, vec![0x0E]);
    }
}
