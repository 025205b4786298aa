//! Peer report wire format.
//!
//! Sensor nodes forward their fresh sightings to the coordinator as UDP
//! datagrams carrying one or more fixed-size frames:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     Magic (0x54524C01, little-endian)
//! 4       6     Device address
//! 10      2     Signal strength in dBm (i16)
//! 12      4     Reserved, zero
//! 16      4     Sensor X (f32)
//! 20      4     Sensor Y (f32)
//! ```
//!
//! Frames are concatenated back to back. A datagram is decoded all or
//! nothing: one bad frame rejects the whole datagram.

use std::io::Cursor;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use wifi_trilat_core::{MacAddress, Position, SensorReport};

use crate::error::WireError;

/// Frame magic, "TRL" plus format version 1.
pub const FRAME_MAGIC: u32 = 0x5452_4C01;

/// Size of one encoded report.
pub const FRAME_LEN: usize = 24;

/// Frames per datagram, keeping a datagram under a 1500-byte MTU.
pub const MAX_FRAMES_PER_DATAGRAM: usize = 60;

/// Encoder and decoder for peer report frames.
pub struct ReportCodec;

impl ReportCodec {
    /// Encode one report into a frame.
    ///
    /// Signals outside the `i16` range are saturated.
    pub fn encode_frame(report: &SensorReport) -> [u8; FRAME_LEN] {
        let mut buf = [0u8; FRAME_LEN];
        LittleEndian::write_u32(&mut buf[0..4], FRAME_MAGIC);
        buf[4..10].copy_from_slice(report.address.as_bytes());
        let signal = report.signal.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        LittleEndian::write_i16(&mut buf[10..12], signal);
        // 12..16 reserved
        LittleEndian::write_f32(&mut buf[16..20], report.sensor.x as f32);
        LittleEndian::write_f32(&mut buf[20..24], report.sensor.y as f32);
        buf
    }

    /// Encode reports into as many datagrams as needed.
    pub fn encode_datagrams(reports: &[SensorReport]) -> Vec<Vec<u8>> {
        reports
            .chunks(MAX_FRAMES_PER_DATAGRAM)
            .map(|chunk| {
                let mut datagram = Vec::with_capacity(chunk.len() * FRAME_LEN);
                for report in chunk {
                    datagram.extend_from_slice(&Self::encode_frame(report));
                }
                datagram
            })
            .collect()
    }

    /// Decode the frame at the start of `data`.
    ///
    /// Returns the report and the number of bytes consumed.
    pub fn decode_frame(data: &[u8]) -> Result<(SensorReport, usize), WireError> {
        if data.len() < FRAME_LEN {
            return Err(WireError::InsufficientData {
                needed: FRAME_LEN,
                got: data.len(),
            });
        }

        let short = |_| WireError::InsufficientData {
            needed: FRAME_LEN,
            got: data.len(),
        };
        let mut cursor = Cursor::new(&data[..FRAME_LEN]);

        let magic = cursor.read_u32::<LittleEndian>().map_err(short)?;
        if magic != FRAME_MAGIC {
            return Err(WireError::InvalidMagic {
                expected: FRAME_MAGIC,
                got: magic,
            });
        }

        let mut mac = [0u8; 6];
        for byte in mac.iter_mut() {
            *byte = cursor.read_u8().map_err(short)?;
        }
        let signal = cursor.read_i16::<LittleEndian>().map_err(short)?;
        let _reserved = cursor.read_u32::<LittleEndian>().map_err(short)?;
        let x = cursor.read_f32::<LittleEndian>().map_err(short)?;
        let y = cursor.read_f32::<LittleEndian>().map_err(short)?;

        if !x.is_finite() || !y.is_finite() {
            return Err(WireError::NonFinitePosition { x, y });
        }

        let report = SensorReport::new(
            MacAddress(mac),
            i32::from(signal),
            Position::new(f64::from(x), f64::from(y)),
        );
        Ok((report, FRAME_LEN))
    }

    /// Decode every frame in a datagram.
    pub fn decode_datagram(data: &[u8]) -> Result<Vec<SensorReport>, WireError> {
        if data.is_empty() {
            return Err(WireError::InsufficientData {
                needed: FRAME_LEN,
                got: 0,
            });
        }

        let mut reports = Vec::with_capacity(data.len() / FRAME_LEN);
        let mut offset = 0;
        while offset < data.len() {
            let (report, consumed) = Self::decode_frame(&data[offset..])?;
            reports.push(report);
            offset += consumed;
        }
        Ok(reports)
    }
}
