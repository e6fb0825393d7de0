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

//! Tracks which native context is bound, and for which state, so that draws
//! only enqueue the state changes they actually need.

use crate::buffer::CommandBuffer;
use crate::record::Record;
use bitflags::bitflags;
use strata_core::{
    AffineTransform, ClipRegion, Composite, GraphicsConfig, NativeHandle, Paint,
    SurfaceDescriptor,
};

bitflags! {
    /// Hints passed along with a composite when validating.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ValidateFlags: u32 {
        /// The source has no alpha, so blending may be skipped.
        const SRC_IS_OPAQUE = 1 << 0;
        /// The draw will use a coverage mask.
        const USE_MASK = 1 << 1;
    }
}

/// What the native context is currently bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    /// A real source/destination pair of one config.
    Surfaces {
        /// The config whose context is current.
        config: NativeHandle,
        /// The bound source (the destination itself when there is none).
        src: NativeHandle,
        /// The bound destination.
        dst: NativeHandle,
    },
    /// The hidden scratch surface of a config.
    Scratch {
        /// The config whose context is current.
        config: NativeHandle,
    },
}

impl Binding {
    /// The config whose context this binding makes current.
    pub fn config(&self) -> NativeHandle {
        match *self {
            Binding::Surfaces { config, .. } | Binding::Scratch { config } => config,
        }
    }
}

/// The full state a draw needs bound.
#[derive(Debug, Clone, Copy)]
pub struct ValidateRequest<'a> {
    /// The source surface, if the draw reads from one.
    pub src: Option<NativeHandle>,
    /// The destination surface.
    pub dst: &'a SurfaceDescriptor,
    /// The clip, or `None` for no clip.
    pub clip: Option<&'a ClipRegion>,
    /// The composite, or `None` for the driver default.
    pub composite: Option<&'a Composite>,
    /// The transform, or `None` for identity.
    pub transform: Option<&'a AffineTransform>,
    /// The paint, or `None` for no paint.
    pub paint: Option<&'a Paint>,
    /// Composite hints.
    pub flags: ValidateFlags,
}

impl<'a> ValidateRequest<'a> {
    /// A request for `dst` with every other input unset.
    pub fn new(dst: &'a SurfaceDescriptor) -> Self {
        Self {
            src: None,
            dst,
            clip: None,
            composite: None,
            transform: None,
            paint: None,
            flags: ValidateFlags::empty(),
        }
    }

    /// Sets the source surface.
    pub fn src(mut self, src: NativeHandle) -> Self {
        self.src = Some(src);
        self
    }

    /// Sets the clip.
    pub fn clip(mut self, clip: &'a ClipRegion) -> Self {
        self.clip = Some(clip);
        self
    }

    /// Sets the composite and its hints.
    pub fn composite(mut self, composite: &'a Composite, flags: ValidateFlags) -> Self {
        self.composite = Some(composite);
        self.flags = flags;
        self
    }

    /// Sets the transform.
    pub fn transform(mut self, transform: &'a AffineTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Sets the paint.
    pub fn paint(mut self, paint: &'a Paint) -> Self {
        self.paint = Some(paint);
        self
    }
}

/// Counters describing how much work the cache saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextStats {
    /// `SET_SURFACES` records emitted.
    pub rebinds: u64,
    /// `SET_SCRATCH_SURFACE` records emitted.
    pub scratch_binds: u64,
    /// Clip, composite, transform and paint updates emitted.
    pub state_updates: u64,
    /// Explicit invalidations.
    pub invalidations: u64,
}

#[derive(Debug, Clone, PartialEq)]
enum Cached<T> {
    Unknown,
    Reset,
    Set(T),
}

impl<T: PartialEq + Clone> Cached<T> {
    fn matches(&self, value: Option<&T>) -> bool {
        match (self, value) {
            (Cached::Reset, None) => true,
            (Cached::Set(cached), Some(value)) => cached == value,
            _ => false,
        }
    }

    fn of(value: Option<&T>) -> Self {
        value.map_or(Cached::Reset, |v| Cached::Set(v.clone()))
    }
}

/// Decides which context records a draw needs and remembers what was bound.
///
/// There is one manager per queue and it is only touched under the queue
/// lock, so at most one binding is current at a time.
#[derive(Debug)]
pub struct ContextManager {
    binding: Option<Binding>,
    validated_dst: Option<NativeHandle>,
    clip: Cached<ClipRegion>,
    composite: Cached<(Composite, ValidateFlags)>,
    transform: Cached<AffineTransform>,
    paint: Cached<Paint>,
    stats: ContextStats,
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextManager {
    /// Creates a manager with nothing bound.
    pub fn new() -> Self {
        Self {
            binding: None,
            validated_dst: None,
            clip: Cached::Unknown,
            composite: Cached::Unknown,
            transform: Cached::Unknown,
            paint: Cached::Unknown,
            stats: ContextStats::default(),
        }
    }

    /// The current binding, if any.
    pub fn binding(&self) -> Option<Binding> {
        self.binding
    }

    /// Counters since creation.
    pub fn stats(&self) -> ContextStats {
        self.stats
    }

    fn forget_state(&mut self) {
        self.validated_dst = None;
        self.clip = Cached::Unknown;
        self.composite = Cached::Unknown;
        self.transform = Cached::Unknown;
        self.paint = Cached::Unknown;
    }

    /// Makes sure the context for `req.dst` is bound with the requested state,
    /// encoding only the records whose inputs changed since the last call.
    ///
    /// A change of destination always re-sends the clip, and a change of
    /// composite always re-sends the paint.
    pub fn validate(&mut self, buf: &mut CommandBuffer, req: &ValidateRequest<'_>) {
        let config = req.dst.config().native_config();
        let dst = req.dst.handle();
        let wanted = Binding::Surfaces {
            config,
            src: req.src.unwrap_or(dst),
            dst,
        };

        let mut update_clip = false;
        let mut update_paint = false;

        if self.binding.map(|b| b.config()) != Some(config) {
            self.forget_state();
        }
        if self.binding != Some(wanted) {
            if self.validated_dst != Some(dst) {
                update_clip = true;
            }
            if req.paint.is_none() {
                update_paint = true;
            }
            if let Binding::Surfaces { src, dst, .. } = wanted {
                Record::SetSurfaces { src, dst }.encode(buf);
            }
            log::debug!("Context rebound to {wanted:?}");
            self.binding = Some(wanted);
            self.validated_dst = Some(dst);
            self.stats.rebinds += 1;
        }

        if update_clip || !self.clip.matches(req.clip) {
            encode_clip(buf, req.clip);
            self.clip = Cached::of(req.clip);
            self.stats.state_updates += 1;
        }

        let composite = req.composite.map(|c| (*c, req.flags));
        if !self.composite.matches(composite.as_ref()) {
            let record = match composite {
                Some((Composite::Alpha { rule, extra_alpha }, flags)) => Record::SetAlphaComposite {
                    rule,
                    extra_alpha,
                    flags: flags.bits(),
                },
                Some((Composite::Xor { xor_pixel }, _)) => Record::SetXorComposite { xor_pixel },
                None => Record::ResetComposite,
            };
            record.encode(buf);
            self.composite = Cached::of(composite.as_ref());
            self.stats.state_updates += 1;
            update_paint = true;
        }

        if !self.transform.matches(req.transform) {
            match req.transform {
                Some(t) => Record::SetTransform(*t).encode(buf),
                None => Record::ResetTransform.encode(buf),
            }
            self.transform = Cached::of(req.transform);
            self.stats.state_updates += 1;
        }

        if update_paint || !self.paint.matches(req.paint) {
            match req.paint {
                Some(p) => Record::SetColor {
                    argb_pre: p.argb_pre(),
                }
                .encode(buf),
                None => Record::ResetPaint.encode(buf),
            }
            self.paint = Cached::of(req.paint);
            self.stats.state_updates += 1;
        }
    }

    /// Binds the hidden scratch surface of `config`, for work that needs a
    /// current context but has no drawable destination.
    pub fn bind_scratch(&mut self, buf: &mut CommandBuffer, config: &dyn GraphicsConfig) {
        let config = config.native_config();
        let wanted = Binding::Scratch { config };
        if self.binding == Some(wanted) {
            return;
        }
        if self.binding.map(|b| b.config()) != Some(config) {
            self.forget_state();
        }
        Record::SetScratchSurface { config }.encode(buf);
        log::debug!("Context bound to scratch surface of config {config}");
        self.binding = Some(wanted);
        self.stats.scratch_binds += 1;
    }

    /// Forgets the binding and every cached state, so the next validate or
    /// scratch bind rebinds unconditionally. Must follow any disposal of a
    /// native surface or context.
    pub fn invalidate(&mut self) {
        self.binding = None;
        self.forget_state();
        self.stats.invalidations += 1;
    }
}

fn encode_clip(buf: &mut CommandBuffer, clip: Option<&ClipRegion>) {
    match clip {
        None => Record::ResetClip.encode(buf),
        Some(clip) if clip.is_rectangular() => Record::SetRectClip(clip.bounds()).encode(buf),
        Some(clip) => {
            Record::BeginShapeClip.encode(buf);
            Record::SetShapeClipSpans(clip.spans()).encode(buf);
            Record::EndShapeClip.encode(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordReader;
    use crate::testing::{descriptor, TestConfig};
    use std::sync::Arc;
    use strata_core::{CompositeRule, Rect, SurfaceKind};

    fn drain(buf: &mut CommandBuffer) -> Vec<Record> {
        let records = RecordReader::new(buf.as_bytes())
            .map(|r| r.expect("decodes").1)
            .filter(|r| *r != Record::Noop)
            .collect();
        buf.position_and_clear();
        records
    }

    #[test]
    fn identical_validation_is_free() {
        let config = Arc::new(TestConfig::new(1));
        let dst = descriptor(&config, 10, SurfaceKind::OnscreenSurface);
        let clip = ClipRegion::rect(Rect::new(0, 0, 5, 5));
        let comp = Composite::SRC_OVER;
        let mut mgr = ContextManager::new();
        let mut buf = CommandBuffer::with_capacity(256);

        let req = ValidateRequest::new(&dst)
            .clip(&clip)
            .composite(&comp, ValidateFlags::empty());
        mgr.validate(&mut buf, &req);
        let first = drain(&mut buf);
        assert_eq!(
            first,
            vec![
                Record::SetSurfaces {
                    src: dst.handle(),
                    dst: dst.handle()
                },
                Record::SetRectClip(Rect::new(0, 0, 5, 5)),
                Record::SetAlphaComposite {
                    rule: CompositeRule::SrcOver,
                    extra_alpha: 1.0,
                    flags: 0
                },
                Record::ResetTransform,
                Record::ResetPaint,
            ]
        );

        mgr.validate(&mut buf, &req);
        assert!(buf.is_empty());
        assert_eq!(mgr.stats().rebinds, 1);
    }

    #[test]
    fn invalidate_forces_rebind() {
        let config = Arc::new(TestConfig::new(1));
        let dst = descriptor(&config, 10, SurfaceKind::OnscreenSurface);
        let mut mgr = ContextManager::new();
        let mut buf = CommandBuffer::with_capacity(256);
        let req = ValidateRequest::new(&dst);

        mgr.validate(&mut buf, &req);
        buf.position_and_clear();
        mgr.invalidate();
        mgr.validate(&mut buf, &req);
        let records = drain(&mut buf);
        assert!(matches!(records[0], Record::SetSurfaces { .. }));
        assert_eq!(mgr.stats().rebinds, 2);
        assert_eq!(mgr.stats().invalidations, 1);
    }

    #[test]
    fn changing_destination_resends_clip_only() {
        let config = Arc::new(TestConfig::new(1));
        let a = descriptor(&config, 10, SurfaceKind::OnscreenSurface);
        let b = descriptor(&config, 11, SurfaceKind::RenderTargetTexture);
        let clip = ClipRegion::rect(Rect::new(0, 0, 5, 5));
        let paint = Paint::Color(0xFFFF_0000);
        let mut mgr = ContextManager::new();
        let mut buf = CommandBuffer::with_capacity(256);

        mgr.validate(&mut buf, &ValidateRequest::new(&a).clip(&clip).paint(&paint));
        buf.position_and_clear();
        mgr.validate(&mut buf, &ValidateRequest::new(&b).clip(&clip).paint(&paint));
        assert_eq!(
            drain(&mut buf),
            vec![
                Record::SetSurfaces {
                    src: b.handle(),
                    dst: b.handle()
                },
                Record::SetRectClip(Rect::new(0, 0, 5, 5)),
            ]
        );
    }

    #[test]
    fn composite_change_resends_paint() {
        let config = Arc::new(TestConfig::new(1));
        let dst = descriptor(&config, 10, SurfaceKind::OnscreenSurface);
        let paint = Paint::Color(0xFF00_00FF);
        let xor = Composite::xor(0x00FF_FFFF);
        let mut mgr = ContextManager::new();
        let mut buf = CommandBuffer::with_capacity(256);

        mgr.validate(&mut buf, &ValidateRequest::new(&dst).paint(&paint));
        buf.position_and_clear();
        mgr.validate(
            &mut buf,
            &ValidateRequest::new(&dst)
                .paint(&paint)
                .composite(&xor, ValidateFlags::empty()),
        );
        assert_eq!(
            drain(&mut buf),
            vec![
                Record::SetXorComposite {
                    xor_pixel: 0x00FF_FFFF
                },
                Record::SetColor {
                    argb_pre: 0xFF00_00FF
                },
            ]
        );
    }

    #[test]
    fn complex_clip_is_sent_as_spans() {
        let config = Arc::new(TestConfig::new(1));
        let dst = descriptor(&config, 10, SurfaceKind::OnscreenSurface);
        let clip = ClipRegion::from_spans([Rect::new(0, 0, 4, 2), Rect::new(0, 2, 2, 4)]);
        let mut mgr = ContextManager::new();
        let mut buf = CommandBuffer::with_capacity(256);

        mgr.validate(&mut buf, &ValidateRequest::new(&dst).clip(&clip));
        let records = drain(&mut buf);
        assert_eq!(records[1], Record::BeginShapeClip);
        assert_eq!(records[2], Record::SetShapeClipSpans(clip.spans()));
        assert_eq!(records[3], Record::EndShapeClip);
    }

    #[test]
    fn scratch_binding_is_cached_per_config() {
        let one = Arc::new(TestConfig::new(1));
        let two = Arc::new(TestConfig::new(2));
        let mut mgr = ContextManager::new();
        let mut buf = CommandBuffer::with_capacity(256);

        mgr.bind_scratch(&mut buf, one.as_ref());
        mgr.bind_scratch(&mut buf, one.as_ref());
        mgr.bind_scratch(&mut buf, two.as_ref());
        assert_eq!(
            drain(&mut buf),
            vec![
                Record::SetScratchSurface {
                    config: NativeHandle(1)
                },
                Record::SetScratchSurface {
                    config: NativeHandle(2)
                },
            ]
        );
        assert_eq!(mgr.stats().scratch_binds, 2);
        assert_eq!(mgr.binding(), Some(Binding::Scratch { config: NativeHandle(2) }));
    }

    #[test]
    fn validate_flags_travel_with_the_composite() {
        let config = Arc::new(TestConfig::new(1));
        let dst = descriptor(&config, 10, SurfaceKind::OnscreenSurface);
        let comp = Composite::SRC_OVER;
        let mut mgr = ContextManager::new();
        let mut buf = CommandBuffer::with_capacity(256);
        mgr.validate(&mut buf, &ValidateRequest::new(&dst).composite(&comp, ValidateFlags::empty()));
        drain(&mut buf);

        let flags = ValidateFlags::SRC_IS_OPAQUE | ValidateFlags::USE_MASK;
        assert!(flags.contains(ValidateFlags::USE_MASK));
        mgr.validate(&mut buf, &ValidateRequest::new(&dst).composite(&comp, flags));
        assert_eq!(
            drain(&mut buf),
            vec![
                Record::SetAlphaComposite {
                    rule: CompositeRule::SrcOver,
                    extra_alpha: 1.0,
                    flags: 0b11
                },
                Record::ResetPaint,
            ]
        );
    }
}
