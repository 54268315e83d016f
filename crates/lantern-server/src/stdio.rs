//! Single-client pipe transport over stdin/stdout.
//!
//! One envelope per line in each direction. There is no session: the pipe
//! serves exactly one client, so every reply is written to it.

use futures::{SinkExt, StreamExt};
use lantern_core::{decode_str, encode, ChannelKind, Envelope, Inbound, Outbound, OutboundSink, RequestContext};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{Result, TransportError};
use crate::session::Payload;

/// Engine output destined for the pipe.
pub struct StdioSink {
    tx: mpsc::Sender<Payload>,
}

impl OutboundSink for StdioSink {
    fn emit(&self, outbound: Outbound) {
        match encode(&outbound.envelope) {
            Ok(line) => {
                if self.tx.try_send(line.into()).is_err() {
                    warn!("stdout queue full or closed, dropping envelope");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode outbound envelope"),
        }
    }
}

/// Create the sink and the receiver [`run_stdio`] drains.
pub fn stdio_sink(capacity: usize) -> (StdioSink, mpsc::Receiver<Payload>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (StdioSink { tx }, rx)
}

async fn write_line<W>(writer: &mut FramedWrite<W, LinesCodec>, line: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.send(line).await.map_err(|e| match e {
        LinesCodecError::Io(io) => TransportError::Io(io),
        LinesCodecError::MaxLineLengthExceeded => {
            TransportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, "line too long"))
        }
    })
}

async fn write_envelope<W>(writer: &mut FramedWrite<W, LinesCodec>, envelope: &Envelope) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    match encode(envelope) {
        Ok(line) => write_line(writer, &line).await,
        Err(e) => {
            warn!(error = %e, "failed to encode envelope");
            Ok(())
        }
    }
}

/// Pump lines between the pipe and the engine until EOF or cancellation.
///
/// On EOF the inbound side is closed and replies keep flowing until every
/// sink clone is dropped, so requests still in flight are answered.
pub async fn run_stdio<R, W>(
    reader: R,
    writer: W,
    inbound_tx: mpsc::Sender<Inbound>,
    mut outbound_rx: mpsc::Receiver<Payload>,
    max_line: usize,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(max_line));
    let mut out = FramedWrite::new(writer, LinesCodec::new());
    info!("stdio transport started");

    let mut input_closed = false;
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            payload = outbound_rx.recv() => match payload {
                Some(payload) => write_line(&mut out, &payload).await?,
                None => break,
            },
            line = lines.next() => match line {
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match decode_str(&line) {
                        Ok(envelope) => {
                            let inbound = Inbound {
                                context: RequestContext::detached(ChannelKind::Stdio),
                                envelope,
                            };
                            if inbound_tx.send(inbound).await.is_err() {
                                return Err(TransportError::EngineClosed);
                            }
                        }
                        Err(failure) => {
                            debug!(issues = ?failure.issues, "rejecting malformed line");
                            write_envelope(&mut out, &failure.to_envelope()).await?;
                        }
                    }
                }
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    let issue = format!("line exceeds {max_line} bytes");
                    write_envelope(&mut out, &lantern_core::errors::parse_error(&[issue])).await?;
                }
                Some(Err(LinesCodecError::Io(e))) => return Err(TransportError::Io(e)),
                None => {
                    input_closed = true;
                    break;
                }
            },
        }
    }
    drop(inbound_tx);

    if input_closed {
        debug!("stdin closed, draining pending replies");
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                payload = outbound_rx.recv() => match payload {
                    Some(payload) => write_line(&mut out, &payload).await?,
                    None => break,
                },
            }
        }
    }

    // Flush replies already queued.
    while let Ok(payload) = outbound_rx.try_recv() {
        write_line(&mut out, &payload).await?;
    }
    info!("stdio transport stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lantern_core::{Request, Response};
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[tokio::test]
    async fn forwards_lines_and_writes_replies() {
        let (mut client_in, server_in) = tokio::io::duplex(4096);
        let (server_out, client_out) = tokio::io::duplex(4096);
        let (inbound_tx, mut inbound_rx) = mpsc::channel(8);
        let (sink, outbound_rx) = stdio_sink(8);
        let cancel = CancellationToken::new();

        let pump = tokio::spawn(run_stdio(server_in, server_out, inbound_tx, outbound_rx, 1024, cancel.clone()));

        client_in
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n")
            .await
            .unwrap();
        let inbound = inbound_rx.recv().await.unwrap();
        assert_eq!(inbound.context.channel, ChannelKind::Stdio);
        assert!(inbound.context.session_id.is_none());
        let expected: Envelope = Request::new(1_i64, "ping", None).into();
        assert_eq!(inbound.envelope, expected);

        let reply: Envelope = Response::success(inbound.envelope.id().cloned(), json!({})).into();
        sink.emit(Outbound::broadcast(reply.clone()));

        let mut reader = BufReader::new(client_out).lines();
        let line = reader.next_line().await.unwrap().unwrap();
        assert_eq!(decode_str(&line).unwrap(), reply);

        drop(sink);
        drop(client_in);
        pump.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn malformed_line_gets_parse_error() {
        let (mut client_in, server_in) = tokio::io::duplex(4096);
        let (server_out, client_out) = tokio::io::duplex(4096);
        let (inbound_tx, mut inbound_rx) = mpsc::channel(8);
        let (sink, outbound_rx) = stdio_sink(8);

        let pump = tokio::spawn(run_stdio(
            server_in,
            server_out,
            inbound_tx,
            outbound_rx,
            1024,
            CancellationToken::new(),
        ));

        client_in.write_all(b"not json\n\n").await.unwrap();
        let mut reader = BufReader::new(client_out).lines();
        let line = reader.next_line().await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["error"]["code"], lantern_core::errors::PARSE_ERROR);

        drop(sink);
        drop(client_in);
        pump.await.unwrap().unwrap();
        assert!(inbound_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stops_on_cancel() {
        let (_client_in, server_in) = tokio::io::duplex(64);
        let (server_out, _client_out) = tokio::io::duplex(64);
        let (inbound_tx, _inbound_rx) = mpsc::channel(1);
        let (_sink, outbound_rx) = stdio_sink(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        run_stdio(server_in, server_out, inbound_tx, outbound_rx, 64, cancel)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn replies_after_stdin_eof_are_written() {
        let (mut client_in, server_in) = tokio::io::duplex(4096);
        let (server_out, client_out) = tokio::io::duplex(64 * 1024);
        let (inbound_tx, inbound_rx) = mpsc::channel(8);
        let (sink, outbound_rx) = stdio_sink(8);
        let cancel = CancellationToken::new();

        let engine = lantern_rpc::Engine::with_default_handlers(
            lantern_rpc::EngineDeps::new(None),
            std::time::Duration::from_secs(5),
        );
        let engine_task = tokio::spawn(engine.run(inbound_rx, std::sync::Arc::new(sink), cancel.clone()));
        let pump = tokio::spawn(run_stdio(server_in, server_out, inbound_tx, outbound_rx, 1024, cancel));

        client_in
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n")
            .await
            .unwrap();
        drop(client_in);

        pump.await.unwrap().unwrap();
        engine_task.await.unwrap();

        let mut reader = BufReader::new(client_out).lines();
        let line = reader.next_line().await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["id"], 1);
        assert!(value["result"]["tools"].is_array(), "got: {line}");
    }
}
