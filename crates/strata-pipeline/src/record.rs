// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The wire format of queued records.
//!
//! Every record is a little-endian `i32` opcode followed by fixed fields.
//! 8-byte fields are always 8-byte aligned relative to the start of the flushed
//! block; encoders pad with a 4-byte `NOOP` record when needed.

use crate::buffer::CommandBuffer;
use strata_core::{
    AffineTransform, CompositeRule, ExecutionError, NativeHandle, PixelFormat, Rect,
};

/// Record opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Opcode {
    /// Fill a rectangle with the current paint.
    FillRect = 21,
    /// Copy, scale or transform pixels onto the bound destination.
    Blit = 31,
    /// Read pixels from a surface into a CPU image.
    SurfaceToSwBlit = 32,
    /// Clip to one rectangle.
    SetRectClip = 51,
    /// Start a span-list clip.
    BeginShapeClip = 52,
    /// Add spans to the clip being built.
    SetShapeClipSpans = 53,
    /// Finish a span-list clip.
    EndShapeClip = 54,
    /// Remove the clip.
    ResetClip = 55,
    /// Select an alpha composite.
    SetAlphaComposite = 56,
    /// Select XOR painting.
    SetXorComposite = 57,
    /// Back to the default composite.
    ResetComposite = 58,
    /// Set the current transform.
    SetTransform = 59,
    /// Back to the identity transform.
    ResetTransform = 60,
    /// Bind source and destination surfaces.
    SetSurfaces = 70,
    /// Bind the hidden scratch surface of a config.
    SetScratchSurface = 71,
    /// Release a surface's native pixels.
    FlushSurface = 72,
    /// Release a surface entirely.
    DisposeSurface = 73,
    /// Release a config and its context.
    DisposeConfig = 74,
    /// Forget the current binding.
    InvalidateContext = 75,
    /// Wait for the driver to finish.
    Sync = 76,
    /// Present the back buffer of a surface.
    SwapBuffers = 80,
    /// Alignment padding.
    Noop = 90,
    /// Remove the paint.
    ResetPaint = 100,
    /// Paint with a flat colour.
    SetColor = 101,
}

impl Opcode {
    /// Decodes an opcode.
    pub fn from_i32(v: i32) -> Option<Self> {
        Some(match v {
            21 => Opcode::FillRect,
            31 => Opcode::Blit,
            32 => Opcode::SurfaceToSwBlit,
            51 => Opcode::SetRectClip,
            52 => Opcode::BeginShapeClip,
            53 => Opcode::SetShapeClipSpans,
            54 => Opcode::EndShapeClip,
            55 => Opcode::ResetClip,
            56 => Opcode::SetAlphaComposite,
            57 => Opcode::SetXorComposite,
            58 => Opcode::ResetComposite,
            59 => Opcode::SetTransform,
            60 => Opcode::ResetTransform,
            70 => Opcode::SetSurfaces,
            71 => Opcode::SetScratchSurface,
            72 => Opcode::FlushSurface,
            73 => Opcode::DisposeSurface,
            74 => Opcode::DisposeConfig,
            75 => Opcode::InvalidateContext,
            76 => Opcode::Sync,
            80 => Opcode::SwapBuffers,
            90 => Opcode::Noop,
            100 => Opcode::ResetPaint,
            101 => Opcode::SetColor,
            _ => return None,
        })
    }
}

/// The packed parameter word of a `BLIT` record.
///
/// | bits  | meaning                                                        |
/// |-------|----------------------------------------------------------------|
/// | 0     | surface-to-surface copy                                        |
/// | 1     | the current transform applies                                  |
/// | 2     | the source is a render-target texture                          |
/// | 3     | texture path: sampling a texture source, or uploading into one |
/// | 8-15  | interpolation hint                                             |
/// | 16-31 | CPU source pixel-format id                                     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PackedParams(pub u32);

impl PackedParams {
    const ISO: u32 = 1 << 0;
    const XFORM: u32 = 1 << 1;
    const RTT: u32 = 1 << 2;
    const TEXTURE: u32 = 1 << 3;

    /// Packs the parameters.
    pub fn new(iso: bool, xform: bool, rtt: bool, texture: bool, hint: u8, src_format: u16) -> Self {
        let mut bits = (src_format as u32) << 16 | (hint as u32) << 8;
        if iso {
            bits |= Self::ISO;
        }
        if xform {
            bits |= Self::XFORM;
        }
        if rtt {
            bits |= Self::RTT;
        }
        if texture {
            bits |= Self::TEXTURE;
        }
        Self(bits)
    }

    /// Surface-to-surface copy.
    pub fn is_iso(self) -> bool {
        self.0 & Self::ISO != 0
    }

    /// The current transform applies.
    pub fn has_transform(self) -> bool {
        self.0 & Self::XFORM != 0
    }

    /// The source is a render-target texture.
    pub fn is_rtt(self) -> bool {
        self.0 & Self::RTT != 0
    }

    /// Texture path.
    pub fn is_texture(self) -> bool {
        self.0 & Self::TEXTURE != 0
    }

    /// The interpolation hint.
    pub fn hint(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// The CPU source pixel-format id.
    pub fn src_format(self) -> u16 {
        (self.0 >> 16) as u16
    }
}

/// A decoded record.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Record {
    Noop,
    FillRect {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
    },
    /// Source coordinates are integer pixels; destination coordinates are
    /// device space (user space when the transform bit is set).
    Blit {
        params: PackedParams,
        sx1: i32,
        sy1: i32,
        sx2: i32,
        sy2: i32,
        dx1: f64,
        dy1: f64,
        dx2: f64,
        dy2: f64,
        src: NativeHandle,
        dst: NativeHandle,
    },
    SurfaceToSwBlit {
        sx: i32,
        sy: i32,
        dx: i32,
        dy: i32,
        w: i32,
        h: i32,
        dst_format: PixelFormat,
        src: NativeHandle,
        dst: NativeHandle,
    },
    SetRectClip(Rect),
    BeginShapeClip,
    SetShapeClipSpans(Vec<Rect>),
    EndShapeClip,
    ResetClip,
    SetAlphaComposite {
        rule: CompositeRule,
        extra_alpha: f32,
        flags: u32,
    },
    SetXorComposite {
        xor_pixel: u32,
    },
    ResetComposite,
    SetTransform(AffineTransform),
    ResetTransform,
    SetSurfaces {
        src: NativeHandle,
        dst: NativeHandle,
    },
    SetScratchSurface {
        config: NativeHandle,
    },
    FlushSurface(NativeHandle),
    DisposeSurface(NativeHandle),
    DisposeConfig(NativeHandle),
    InvalidateContext,
    Sync,
    SwapBuffers(NativeHandle),
    ResetPaint,
    SetColor {
        argb_pre: u32,
    },
}

impl Record {
    /// The record's opcode.
    pub fn opcode(&self) -> Opcode {
        match self {
            Record::Noop => Opcode::Noop,
            Record::FillRect { .. } => Opcode::FillRect,
            Record::Blit { .. } => Opcode::Blit,
            Record::SurfaceToSwBlit { .. } => Opcode::SurfaceToSwBlit,
            Record::SetRectClip(_) => Opcode::SetRectClip,
            Record::BeginShapeClip => Opcode::BeginShapeClip,
            Record::SetShapeClipSpans(_) => Opcode::SetShapeClipSpans,
            Record::EndShapeClip => Opcode::EndShapeClip,
            Record::ResetClip => Opcode::ResetClip,
            Record::SetAlphaComposite { .. } => Opcode::SetAlphaComposite,
            Record::SetXorComposite { .. } => Opcode::SetXorComposite,
            Record::ResetComposite => Opcode::ResetComposite,
            Record::SetTransform(_) => Opcode::SetTransform,
            Record::ResetTransform => Opcode::ResetTransform,
            Record::SetSurfaces { .. } => Opcode::SetSurfaces,
            Record::SetScratchSurface { .. } => Opcode::SetScratchSurface,
            Record::FlushSurface(_) => Opcode::FlushSurface,
            Record::DisposeSurface(_) => Opcode::DisposeSurface,
            Record::DisposeConfig(_) => Opcode::DisposeConfig,
            Record::InvalidateContext => Opcode::InvalidateContext,
            Record::Sync => Opcode::Sync,
            Record::SwapBuffers(_) => Opcode::SwapBuffers,
            Record::ResetPaint => Opcode::ResetPaint,
            Record::SetColor { .. } => Opcode::SetColor,
        }
    }

    /// Encoded size in bytes, opcode included.
    pub fn encoded_len(&self) -> usize {
        match self {
            Record::Blit { .. } => 72,
            Record::SurfaceToSwBlit { .. } => 48,
            Record::SetTransform(_) => 52,
            Record::FillRect { .. } | Record::SetRectClip(_) | Record::SetSurfaces { .. } => 20,
            Record::SetAlphaComposite { .. } => 16,
            Record::SetScratchSurface { .. }
            | Record::FlushSurface(_)
            | Record::DisposeSurface(_)
            | Record::DisposeConfig(_)
            | Record::SwapBuffers(_) => 12,
            Record::SetXorComposite { .. } | Record::SetColor { .. } => 8,
            Record::SetShapeClipSpans(spans) => 8 + 16 * spans.len(),
            _ => 4,
        }
    }

    /// Offset of the first 8-byte field from the start of the record, if any.
    pub fn first_long_offset(&self) -> Option<usize> {
        match self {
            Record::Blit { .. } => Some(24),
            Record::SurfaceToSwBlit { .. } => Some(32),
            Record::SetTransform(_)
            | Record::SetSurfaces { .. }
            | Record::SetScratchSurface { .. }
            | Record::FlushSurface(_)
            | Record::DisposeSurface(_)
            | Record::DisposeConfig(_)
            | Record::SwapBuffers(_) => Some(4),
            _ => None,
        }
    }

    /// Reserves space for this record in `buf` and writes it.
    pub fn encode(&self, buf: &mut CommandBuffer) {
        let len = self.encoded_len();
        match self.first_long_offset() {
            Some(offset) => buf.ensure_capacity_and_alignment(len, offset),
            None => buf.ensure_capacity(len),
        }
        buf.put_opcode(self.opcode());
        match self {
            Record::FillRect { x, y, w, h } => {
                buf.put_int(*x).put_int(*y).put_int(*w).put_int(*h);
            }
            Record::Blit {
                params,
                sx1,
                sy1,
                sx2,
                sy2,
                dx1,
                dy1,
                dx2,
                dy2,
                src,
                dst,
            } => {
                buf.put_int(params.0 as i32)
                    .put_int(*sx1)
                    .put_int(*sy1)
                    .put_int(*sx2)
                    .put_int(*sy2)
                    .put_double(*dx1)
                    .put_double(*dy1)
                    .put_double(*dx2)
                    .put_double(*dy2)
                    .put_handle(*src)
                    .put_handle(*dst);
            }
            Record::SurfaceToSwBlit {
                sx,
                sy,
                dx,
                dy,
                w,
                h,
                dst_format,
                src,
                dst,
            } => {
                buf.put_int(*sx)
                    .put_int(*sy)
                    .put_int(*dx)
                    .put_int(*dy)
                    .put_int(*w)
                    .put_int(*h)
                    .put_int(dst_format.id() as i32)
                    .put_handle(*src)
                    .put_handle(*dst);
            }
            Record::SetRectClip(r) => {
                buf.put_int(r.x1).put_int(r.y1).put_int(r.x2).put_int(r.y2);
            }
            Record::SetShapeClipSpans(spans) => {
                buf.put_int(spans.len() as i32);
                for r in spans {
                    buf.put_int(r.x1).put_int(r.y1).put_int(r.x2).put_int(r.y2);
                }
            }
            Record::SetAlphaComposite {
                rule,
                extra_alpha,
                flags,
            } => {
                buf.put_int(rule.id())
                    .put_float(*extra_alpha)
                    .put_int(*flags as i32);
            }
            Record::SetXorComposite { xor_pixel } => {
                buf.put_int(*xor_pixel as i32);
            }
            Record::SetTransform(t) => {
                for m in t.to_array() {
                    buf.put_double(m);
                }
            }
            Record::SetSurfaces { src, dst } => {
                buf.put_handle(*src).put_handle(*dst);
            }
            Record::SetScratchSurface { config: handle }
            | Record::FlushSurface(handle)
            | Record::DisposeSurface(handle)
            | Record::DisposeConfig(handle)
            | Record::SwapBuffers(handle) => {
                buf.put_handle(*handle);
            }
            Record::SetColor { argb_pre } => {
                buf.put_int(*argb_pre as i32);
            }
            Record::Noop
            | Record::BeginShapeClip
            | Record::EndShapeClip
            | Record::ResetClip
            | Record::ResetComposite
            | Record::ResetTransform
            | Record::InvalidateContext
            | Record::Sync
            | Record::ResetPaint => {}
        }
        log::trace!("encoded {:?} ({} bytes)", self.opcode(), len);
    }
}

/// Decodes a flushed block back into records, in order.
///
/// Yields `(offset, record)` pairs. After the first error the iterator is
/// exhausted.
#[derive(Debug, Clone)]
pub struct RecordReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> RecordReader<'a> {
    /// Creates a reader over a flushed block.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn malformed(&self, offset: usize, reason: impl Into<String>) -> ExecutionError {
        ExecutionError::MalformedRecord {
            offset,
            reason: reason.into(),
        }
    }

    fn take<const N: usize>(&mut self, start: usize) -> Result<[u8; N], ExecutionError> {
        let end = self.pos + N;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| self.malformed(start, "truncated record"))?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn int(&mut self, start: usize) -> Result<i32, ExecutionError> {
        self.take::<4>(start).map(i32::from_le_bytes)
    }

    fn float(&mut self, start: usize) -> Result<f32, ExecutionError> {
        self.take::<4>(start).map(f32::from_le_bytes)
    }

    fn long_bytes(&mut self, start: usize) -> Result<[u8; 8], ExecutionError> {
        if self.pos % 8 != 0 {
            return Err(self.malformed(start, format!("misaligned 8-byte field at {}", self.pos)));
        }
        self.take::<8>(start)
    }

    fn double(&mut self, start: usize) -> Result<f64, ExecutionError> {
        self.long_bytes(start).map(f64::from_le_bytes)
    }

    fn handle(&mut self, start: usize) -> Result<NativeHandle, ExecutionError> {
        self.long_bytes(start).map(|b| NativeHandle(u64::from_le_bytes(b)))
    }

    fn rect(&mut self, start: usize) -> Result<Rect, ExecutionError> {
        Ok(Rect::new(
            self.int(start)?,
            self.int(start)?,
            self.int(start)?,
            self.int(start)?,
        ))
    }

    fn read_record(&mut self) -> Result<(usize, Record), ExecutionError> {
        let start = self.pos;
        let raw = self.int(start)?;
        let opcode = Opcode::from_i32(raw).ok_or(ExecutionError::UnknownOpcode {
            offset: start,
            opcode: raw,
        })?;
        let record = match opcode {
            Opcode::Noop => Record::Noop,
            Opcode::FillRect => Record::FillRect {
                x: self.int(start)?,
                y: self.int(start)?,
                w: self.int(start)?,
                h: self.int(start)?,
            },
            Opcode::Blit => Record::Blit {
                params: PackedParams(self.int(start)? as u32),
                sx1: self.int(start)?,
                sy1: self.int(start)?,
                sx2: self.int(start)?,
                sy2: self.int(start)?,
                dx1: self.double(start)?,
                dy1: self.double(start)?,
                dx2: self.double(start)?,
                dy2: self.double(start)?,
                src: self.handle(start)?,
                dst: self.handle(start)?,
            },
            Opcode::SurfaceToSwBlit => {
                let (sx, sy, dx, dy, w, h) = (
                    self.int(start)?,
                    self.int(start)?,
                    self.int(start)?,
                    self.int(start)?,
                    self.int(start)?,
                    self.int(start)?,
                );
                let format_id = self.int(start)?;
                let dst_format = u16::try_from(format_id)
                    .ok()
                    .and_then(PixelFormat::from_id)
                    .ok_or_else(|| {
                        self.malformed(start, format!("unknown pixel format {format_id}"))
                    })?;
                Record::SurfaceToSwBlit {
                    sx,
                    sy,
                    dx,
                    dy,
                    w,
                    h,
                    dst_format,
                    src: self.handle(start)?,
                    dst: self.handle(start)?,
                }
            }
            Opcode::SetRectClip => Record::SetRectClip(self.rect(start)?),
            Opcode::BeginShapeClip => Record::BeginShapeClip,
            Opcode::SetShapeClipSpans => {
                let count = self.int(start)?;
                if count < 0 || (count as usize) * 16 > self.bytes.len() - self.pos {
                    return Err(self.malformed(start, format!("bad span count {count}")));
                }
                let mut spans = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    spans.push(self.rect(start)?);
                }
                Record::SetShapeClipSpans(spans)
            }
            Opcode::EndShapeClip => Record::EndShapeClip,
            Opcode::ResetClip => Record::ResetClip,
            Opcode::SetAlphaComposite => {
                let rule_id = self.int(start)?;
                let rule = CompositeRule::from_id(rule_id)
                    .ok_or_else(|| self.malformed(start, format!("unknown rule {rule_id}")))?;
                Record::SetAlphaComposite {
                    rule,
                    extra_alpha: self.float(start)?,
                    flags: self.int(start)? as u32,
                }
            }
            Opcode::SetXorComposite => Record::SetXorComposite {
                xor_pixel: self.int(start)? as u32,
            },
            Opcode::ResetComposite => Record::ResetComposite,
            Opcode::SetTransform => {
                let mut m = [0.0; 6];
                for v in &mut m {
                    *v = self.double(start)?;
                }
                Record::SetTransform(AffineTransform::from_array(m))
            }
            Opcode::ResetTransform => Record::ResetTransform,
            Opcode::SetSurfaces => Record::SetSurfaces {
                src: self.handle(start)?,
                dst: self.handle(start)?,
            },
            Opcode::SetScratchSurface => Record::SetScratchSurface {
                config: self.handle(start)?,
            },
            Opcode::FlushSurface => Record::FlushSurface(self.handle(start)?),
            Opcode::DisposeSurface => Record::DisposeSurface(self.handle(start)?),
            Opcode::DisposeConfig => Record::DisposeConfig(self.handle(start)?),
            Opcode::InvalidateContext => Record::InvalidateContext,
            Opcode::Sync => Record::Sync,
            Opcode::SwapBuffers => Record::SwapBuffers(self.handle(start)?),
            Opcode::ResetPaint => Record::ResetPaint,
            Opcode::SetColor => Record::SetColor {
                argb_pre: self.int(start)? as u32,
            },
        };
        Ok((start, record))
    }
}

impl Iterator for RecordReader<'_> {
    type Item = Result<(usize, Record), ExecutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.bytes.len() {
            return None;
        }
        let result = self.read_record();
        if result.is_err() {
            self.pos = self.bytes.len();
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blit() -> Record {
        Record::Blit {
            params: PackedParams::new(true, false, true, false, 2, 0),
            sx1: 0,
            sy1: 0,
            sx2: 10,
            sy2: 10,
            dx1: 5.0,
            dy1: 5.0,
            dx2: 15.0,
            dy2: 15.0,
            src: NativeHandle(1),
            dst: NativeHandle(2),
        }
    }

    fn decode(buf: &CommandBuffer) -> Vec<Record> {
        RecordReader::new(buf.as_bytes())
            .map(|r| r.map(|(_, rec)| rec))
            .collect::<Result<Vec<_>, _>>()
            .expect("stream decodes")
    }

    #[test]
    fn blit_record_layout() {
        let mut buf = CommandBuffer::with_capacity(128);
        blit().encode(&mut buf);
        let bytes = buf.as_bytes();
        assert_eq!(bytes.len(), 72);
        assert_eq!(&bytes[0..4], &31i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &0x0205u32.to_le_bytes());
        assert_eq!(&bytes[24..32], &5.0f64.to_le_bytes());
        assert_eq!(&bytes[56..64], &1u64.to_le_bytes());
        assert_eq!(&bytes[64..72], &2u64.to_le_bytes());

        // After a 4-byte record the first double would be misaligned, so a NOOP goes first.
        Record::Sync.encode(&mut buf);
        blit().encode(&mut buf);
        assert_eq!(buf.position(), 72 + 4 + 4 + 72);
        assert_eq!(&buf.as_bytes()[76..80], &(Opcode::Noop as i32).to_le_bytes());
    }

    #[test]
    fn stream_decodes_in_order_with_padding() {
        let records = vec![
            Record::SetSurfaces {
                src: NativeHandle(3),
                dst: NativeHandle(4),
            },
            Record::SetShapeClipSpans(vec![Rect::new(0, 0, 2, 1), Rect::new(0, 1, 1, 2)]),
            Record::SetAlphaComposite {
                rule: CompositeRule::SrcOver,
                extra_alpha: 0.5,
                flags: 1,
            },
            Record::SetTransform(AffineTransform::rotation(0.3)),
            blit(),
            Record::SurfaceToSwBlit {
                sx: 1,
                sy: 2,
                dx: 3,
                dy: 4,
                w: 5,
                h: 6,
                dst_format: PixelFormat::Ushort565Rgb,
                src: NativeHandle(7),
                dst: NativeHandle::cpu(8),
            },
            Record::SetColor { argb_pre: 0xFF00_FF00 },
        ];
        let mut buf = CommandBuffer::with_capacity(16);
        for r in &records {
            r.encode(&mut buf);
        }
        assert_eq!(buf.record_count(), records.len());
        let decoded: Vec<Record> = decode(&buf).into_iter().filter(|r| *r != Record::Noop).collect();
        assert_eq!(decoded, records);
    }

    #[test]
    fn truncated_and_unknown_records_are_rejected() {
        let mut buf = CommandBuffer::with_capacity(16);
        buf.ensure_capacity(8);
        buf.put_int(Opcode::SetColor as i32);
        let err = RecordReader::new(buf.as_bytes()).next().unwrap().unwrap_err();
        assert!(matches!(err, ExecutionError::MalformedRecord { offset: 0, .. }));

        let bytes = 12345i32.to_le_bytes();
        let mut reader = RecordReader::new(&bytes);
        assert_eq!(
            reader.next().unwrap().unwrap_err(),
            ExecutionError::UnknownOpcode {
                offset: 0,
                opcode: 12345
            }
        );
        assert!(reader.next().is_none());
    }

    #[test]
    fn misaligned_long_is_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(Opcode::DisposeSurface as i32).to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
        let err = RecordReader::new(&bytes).next().unwrap().unwrap_err();
        assert!(matches!(err, ExecutionError::MalformedRecord { .. }));
    }

    #[test]
    fn packed_params_fields() {
        let p = PackedParams::new(false, true, false, true, 3, PixelFormat::ThreeByteBgr.id());
        assert!(!p.is_iso() && p.has_transform() && !p.is_rtt() && p.is_texture());
        assert_eq!(p.hint(), 3);
        assert_eq!(p.src_format(), 11);
    }
}
