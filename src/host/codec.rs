//! Native messaging framing: a 32-bit length in native byte order followed by
//! that many bytes of UTF-8 JSON.

use crate::domain::{InboundMessage, OutboundMessage};
use crate::error::{GuardError, Result};
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound accepted from the browser.
pub const MAX_INBOUND_FRAME: usize = 64 * 1024 * 1024;

/// Browsers reject host messages larger than 1 MiB.
pub const MAX_OUTBOUND_FRAME: usize = 1024 * 1024;

/// Read one frame. `Ok(None)` on a clean EOF before the length prefix; EOF
/// inside the prefix is a protocol error.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        match reader.read(&mut len_buf[filled..]).await {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(GuardError::Protocol(format!(
                    "truncated length prefix ({filled} of 4 bytes)"
                )))
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }

    let len = u32::from_ne_bytes(len_buf) as usize;
    if len > MAX_INBOUND_FRAME {
        return Err(GuardError::Protocol(format!(
            "frame length {len} exceeds maximum {MAX_INBOUND_FRAME}"
        )));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(|err| {
        GuardError::Protocol(format!("truncated frame ({len} bytes expected): {err}"))
    })?;
    Ok(Some(payload))
}

pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_OUTBOUND_FRAME {
        return Err(GuardError::Protocol(format!(
            "outbound message of {} bytes exceeds maximum {MAX_OUTBOUND_FRAME}",
            payload.len()
        )));
    }

    let len = payload.len() as u32;
    writer.write_all(&len.to_ne_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

pub fn decode_message(payload: &[u8]) -> Result<InboundMessage> {
    serde_json::from_slice(payload)
        .map_err(|err| GuardError::Protocol(format!("Invalid host message: {err}")))
}

pub async fn write_message<W>(writer: &mut W, message: &OutboundMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(message)?;
    write_frame(writer, &payload).await
}
