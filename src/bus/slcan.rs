//! # SLCAN Serial Transport
//!
//! Drives a USB-to-CAN adapter speaking the Lawicel SLCAN ASCII protocol over a
//! serial port. Standard data frames look like `t<id:3><len:1><data:2*len>\r`.
//!
//! [`open`] configures the adapter and returns two halves:
//!
//! - [`SlcanBus`], the non-blocking egress side. Frames go through a bounded
//!   channel to a writer task; a full channel drops the frame with an error.
//! - [`SlcanReader`], a [`FrameSource`] for [`crate::bus::pump_frames`].

use crate::bus::{CanBus, CanFrame, FrameSource};
use crate::error::GatewayError;
use crate::logging::{log_error, log_warn};
use crate::util::hex::{decode_hex, encode_hex_upper};
use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use std::collections::VecDeque;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf};
use tokio::sync::mpsc;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

const BELL: u8 = 0x07;
const CR: u8 = b'\r';

/// Configuration for an SLCAN adapter.
#[derive(Debug, Clone)]
pub struct SlcanConfig {
    pub port: String,
    pub baudrate: u32,
    /// CAN bus bitrate; Elster buses run at 20 kbit/s or 125 kbit/s
    pub bitrate: u32,
    /// Outbound frames buffered ahead of the writer task
    pub queue_depth: usize,
}

impl Default for SlcanConfig {
    fn default() -> Self {
        SlcanConfig {
            port: "/dev/ttyACM0".to_string(),
            baudrate: 115_200,
            bitrate: 125_000,
            queue_depth: 64,
        }
    }
}

/// SLCAN `S<n>` command for a bus bitrate.
pub fn bitrate_command(bitrate: u32) -> Result<&'static str, GatewayError> {
    Ok(match bitrate {
        10_000 => "S0",
        20_000 => "S1",
        50_000 => "S2",
        100_000 => "S3",
        125_000 => "S4",
        250_000 => "S5",
        500_000 => "S6",
        800_000 => "S7",
        1_000_000 => "S8",
        other => return Err(GatewayError::Config(format!("unsupported SLCAN bitrate {other}"))),
    })
}

/// Render a frame as an SLCAN transmit command.
pub fn encode_frame(frame: &CanFrame) -> String {
    format!(
        "t{:03X}{}{}\r",
        frame.id,
        frame.data().len(),
        encode_hex_upper(frame.data())
    )
}

/// Parse one SLCAN line (without the terminator).
///
/// Returns `Ok(None)` for lines that are not standard data frames, such as
/// transmit acknowledgements, remote frames and extended-identifier frames.
pub fn decode_line(line: &str) -> Result<Option<CanFrame>, GatewayError> {
    if !line.starts_with('t') {
        return Ok(None);
    }
    let malformed = || GatewayError::Bus(format!("malformed SLCAN line {line:?}"));

    let id = line.get(1..4).ok_or_else(malformed)?;
    let id = u16::from_str_radix(id, 16).map_err(|_| malformed())?;
    let len = line
        .get(4..5)
        .and_then(|l| l.parse::<usize>().ok())
        .ok_or_else(malformed)?;
    let data = match len {
        0 => Vec::new(),
        n => decode_hex(line.get(5..5 + 2 * n).ok_or_else(malformed)?)?,
    };
    CanFrame::new(id, &data).map(Some)
}

/// Splits a serial byte stream into SLCAN lines.
#[derive(Debug, Default)]
pub struct SlcanDecoder {
    buffer: BytesMut,
}

impl SlcanDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes and return every complete data frame.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<CanFrame> {
        self.buffer.extend_from_slice(bytes);
        let mut frames = Vec::new();

        while let Some(end) = self.buffer.iter().position(|b| *b == CR || *b == BELL) {
            let line = self.buffer.split_to(end);
            let terminator = self.buffer[0];
            self.buffer.advance(1);

            if terminator == BELL {
                log_warn("SLCAN adapter rejected a command");
                continue;
            }
            match std::str::from_utf8(&line) {
                Ok(text) => match decode_line(text) {
                    Ok(Some(frame)) => frames.push(frame),
                    Ok(None) => {}
                    Err(e) => log_warn(&format!("Dropping SLCAN input: {e}")),
                },
                Err(_) => log_warn("Dropping non-ASCII SLCAN input"),
            }
        }
        frames
    }
}

/// Receiving half of an SLCAN adapter.
pub struct SlcanReader {
    port: ReadHalf<SerialStream>,
    decoder: SlcanDecoder,
    pending: VecDeque<CanFrame>,
}

#[async_trait]
impl FrameSource for SlcanReader {
    async fn recv_frame(&mut self) -> Result<CanFrame, GatewayError> {
        let mut buf = [0u8; 256];
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }
            let n = self.port.read(&mut buf).await?;
            if n == 0 {
                return Err(GatewayError::Bus("SLCAN port closed".into()));
            }
            self.pending.extend(self.decoder.feed(&buf[..n]));
        }
    }
}

/// Transmitting half of an SLCAN adapter.
#[derive(Debug, Clone)]
pub struct SlcanBus {
    tx: mpsc::Sender<CanFrame>,
}

impl CanBus for SlcanBus {
    fn send_frame(&mut self, frame: &CanFrame) -> Result<(), GatewayError> {
        self.tx
            .try_send(*frame)
            .map_err(|e| GatewayError::Bus(format!("SLCAN transmit queue: {e}")))
    }
}

/// Open the serial port, configure the adapter and start the writer task.
///
/// Must be called from within a tokio runtime.
pub async fn open(config: &SlcanConfig) -> Result<(SlcanBus, SlcanReader), GatewayError> {
    let mut port = tokio_serial::new(&config.port, config.baudrate)
        .data_bits(tokio_serial::DataBits::Eight)
        .stop_bits(tokio_serial::StopBits::One)
        .parity(tokio_serial::Parity::None)
        .open_native_async()
        .map_err(|e| GatewayError::Bus(e.to_string()))?;

    let setup = format!("C\r{}\rO\r", bitrate_command(config.bitrate)?);
    port.write_all(setup.as_bytes()).await?;
    port.flush().await?;

    let (read_half, mut write_half) = tokio::io::split(port);
    let (tx, mut rx) = mpsc::channel::<CanFrame>(config.queue_depth.max(1));

    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = write_half.write_all(encode_frame(&frame).as_bytes()).await {
                log_error(&format!("SLCAN write failed: {e}"));
                break;
            }
        }
    });

    Ok((
        SlcanBus { tx },
        SlcanReader {
            port: read_half,
            decoder: SlcanDecoder::new(),
            pending: VecDeque::new(),
        },
    ))
}
