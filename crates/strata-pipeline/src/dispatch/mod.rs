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

//! The primitive dispatch registry.
//!
//! Every loop that moves pixels is registered under a [`DispatchKey`] of
//! (source type, composite class, destination type). Lookup tries the exact
//! key, then the key with the composite broadened to its class, then the
//! generic adapter registered for the destination type. A loop found at any
//! level may still decline a particular request through [`Primitive::accepts`],
//! in which case lookup moves on to the next level.

mod generic;
mod intermediate;

pub use generic::{GenericAdapter, GenericStats};
pub use intermediate::IntermediateCache;

use crate::error::PipelineError;
use crate::ops::{BlitRect, Interpolation, ScaleRect, TransformRect};
use crate::queue::RenderQueue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use strata_core::{
    AffineTransform, ClipRegion, Composite, CompositeKind, PixelFormat, Rect, SurfaceKind,
    SurfaceRef,
};

/// The source side of a dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// Matches any source. Only used by generic adapters.
    Any,
    /// A driver-resident surface of the given kind.
    Gpu(SurfaceKind),
    /// A CPU image of the given format.
    Cpu(PixelFormat),
}

impl SourceType {
    /// The type of a concrete source.
    pub fn of(src: &SurfaceRef) -> Self {
        match src {
            SurfaceRef::Gpu(desc) => SourceType::Gpu(desc.kind()),
            SurfaceRef::Cpu(image) => SourceType::Cpu(image.format()),
        }
    }
}

/// The destination side of a dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestType {
    /// A driver-resident surface of the given kind.
    Gpu(SurfaceKind),
    /// A CPU image of the given format.
    Cpu(PixelFormat),
}

impl DestType {
    /// The type of a concrete destination.
    pub fn of(dst: &SurfaceRef) -> Self {
        match dst {
            SurfaceRef::Gpu(desc) => DestType::Gpu(desc.kind()),
            SurfaceRef::Cpu(image) => DestType::Cpu(image.format()),
        }
    }

    /// Every destination type, GPU kinds first.
    pub fn all() -> impl Iterator<Item = DestType> {
        SurfaceKind::ALL
            .into_iter()
            .map(DestType::Gpu)
            .chain(PixelFormat::ALL.into_iter().map(DestType::Cpu))
    }
}

/// The key loops are registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchKey {
    /// Source type, or [`SourceType::Any`].
    pub src: SourceType,
    /// Composite class the loop handles. A broad class such as
    /// [`CompositeKind::AnyAlpha`] is found by the broadened lookup.
    pub composite: CompositeKind,
    /// Destination type.
    pub dst: DestType,
}

impl DispatchKey {
    /// Creates a key.
    pub const fn new(src: SourceType, composite: CompositeKind, dst: DestType) -> Self {
        Self {
            src,
            composite,
            dst,
        }
    }

    /// The key of the generic adapter for `dst`.
    pub const fn generic(dst: DestType) -> Self {
        Self::new(SourceType::Any, CompositeKind::Any, dst)
    }
}

impl fmt::Display for DispatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {:?}, {:?})", self.src, self.composite, self.dst)
    }
}

/// Everything a loop needs besides the geometry.
#[derive(Clone, Copy)]
pub struct DrawContext<'a> {
    /// The queue GPU loops encode into.
    pub queue: &'a RenderQueue,
    /// The registry, for loops that dispatch further.
    pub registry: &'a PrimitiveRegistry,
    /// Where pixels come from.
    pub src: &'a SurfaceRef,
    /// Where pixels go.
    pub dst: &'a SurfaceRef,
    /// How they are combined.
    pub composite: &'a Composite,
    /// Which destination pixels may be written, in device space.
    pub clip: &'a ClipRegion,
}

impl fmt::Debug for DrawContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawContext")
            .field("src", &self.src.handle())
            .field("dst", &self.dst.handle())
            .field("composite", self.composite)
            .field("clip", &self.clip.bounds())
            .finish()
    }
}

/// Source and destination coordinates as written into a blit record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlitQuad {
    /// Source rectangle in integer pixels.
    pub src: Rect,
    /// Destination corners `(x1, y1, x2, y2)`, in user space when a transform
    /// is present and in device space otherwise.
    pub dst: (f64, f64, f64, f64),
    /// User to device transform.
    pub transform: Option<AffineTransform>,
}

/// The geometry of one kind of pixel-moving operation.
///
/// Each geometry has its own dispatch table in the registry.
pub trait Geometry: Copy + fmt::Debug + Send + Sync + 'static {
    /// The table of loops for this geometry.
    fn table(registry: &PrimitiveRegistry) -> &DispatchTable<Self>;

    /// The table of loops for this geometry, for registration.
    fn table_mut(registry: &mut PrimitiveRegistry) -> &mut DispatchTable<Self>;

    /// The source rectangle read.
    fn src_rect(&self) -> Rect;

    /// The same operation reading the same pixels after they were moved so
    /// the source rectangle starts at `(x, y)`.
    fn with_src_origin(&self, x: i32, y: i32) -> Self;

    /// Maps source pixel space to destination device space.
    fn to_device(&self) -> AffineTransform;

    /// The requested interpolation.
    fn hint(&self) -> Interpolation;

    /// The coordinates written into a blit record.
    fn quad(&self) -> BlitQuad;

    /// Bounds of the destination pixels this operation may touch.
    fn device_bounds(&self) -> Rect {
        let s = self.src_rect();
        let (x1, y1, x2, y2) =
            self.to_device()
                .transform_bounds(s.x1 as f64, s.y1 as f64, s.x2 as f64, s.y2 as f64);
        Rect::covering(x1, y1, x2, y2)
    }
}

/// A loop moving pixels for one or more dispatch keys.
pub trait Primitive<G>: Send + Sync {
    /// Name used in logs and tests.
    fn name(&self) -> &'static str;

    /// Returns `false` when this loop cannot serve this particular request
    /// even though its key matched, for example because the destination
    /// lacks a capability.
    fn accepts(&self, _cx: &DrawContext<'_>, _geom: &G) -> bool {
        true
    }

    /// Performs the operation.
    fn draw(&self, cx: &DrawContext<'_>, geom: &G) -> Result<(), PipelineError>;
}

/// The loops registered for one geometry.
pub struct DispatchTable<G> {
    entries: HashMap<DispatchKey, Arc<dyn Primitive<G>>>,
}

impl<G> Default for DispatchTable<G> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<G> fmt::Debug for DispatchTable<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<G: Geometry> DispatchTable<G> {
    /// Registers `primitive` under `key`, replacing any previous entry.
    pub fn register(&mut self, key: DispatchKey, primitive: Arc<dyn Primitive<G>>) {
        if let Some(previous) = self.entries.insert(key, primitive) {
            log::debug!("Loop {} replaced at {key}", previous.name());
        }
    }

    /// The loop registered under exactly `key`.
    pub fn get(&self, key: &DispatchKey) -> Option<&dyn Primitive<G>> {
        self.entries.get(key).map(|p| p.as_ref())
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn accepting(
        &self,
        key: DispatchKey,
        cx: &DrawContext<'_>,
        geom: &G,
    ) -> Option<&dyn Primitive<G>> {
        self.get(&key).filter(|p| p.accepts(cx, geom))
    }

    /// Finds a direct loop: the exact key first, then the key with the
    /// composite broadened to its class. Never returns a generic adapter.
    pub fn lookup_direct(
        &self,
        cx: &DrawContext<'_>,
        geom: &G,
        src: SourceType,
        composite: CompositeKind,
        dst: DestType,
    ) -> Option<&dyn Primitive<G>> {
        let exact = DispatchKey::new(src, composite, dst);
        self.accepting(exact, cx, geom).or_else(|| {
            let broad = composite.broadest();
            (broad != composite)
                .then(|| self.accepting(DispatchKey::new(src, broad, dst), cx, geom))
                .flatten()
        })
    }

    /// Finds the loop for a request, falling back to the generic adapter of
    /// the destination type.
    pub fn lookup(&self, cx: &DrawContext<'_>, geom: &G) -> Option<&dyn Primitive<G>> {
        let src = SourceType::of(cx.src);
        let dst = DestType::of(cx.dst);
        let composite = effective_kind(cx);
        self.lookup_direct(cx, geom, src, composite, dst).or_else(|| {
            let generic = self.accepting(DispatchKey::generic(dst), cx, geom);
            if let Some(p) = generic {
                log::debug!(
                    "No direct loop for {}; using {}",
                    DispatchKey::new(src, composite, dst),
                    p.name()
                );
            }
            generic
        })
    }
}

/// The composite class used for lookup. Source-over from an opaque source
/// is a plain copy.
pub fn effective_kind(cx: &DrawContext<'_>) -> CompositeKind {
    match cx.composite.kind() {
        CompositeKind::SrcOverNoEa if cx.src.is_opaque() => CompositeKind::SrcNoEa,
        kind => kind,
    }
}

/// One dispatch table per geometry, plus the generic adapter they share.
///
/// Built once, then only read. Share it between threads behind an `Arc`.
#[derive(Debug)]
pub struct PrimitiveRegistry {
    blit: DispatchTable<BlitRect>,
    scale: DispatchTable<ScaleRect>,
    transform: DispatchTable<TransformRect>,
    generic: Arc<GenericAdapter>,
    readback: IntermediateCache,
}

impl Default for PrimitiveRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PrimitiveRegistry {
    /// Creates a registry with every built-in loop and a generic adapter for
    /// every destination type.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        crate::ops::register_loops(&mut registry);
        registry.register_generic();
        log::info!(
            "Primitive registry populated: {} blit, {} scale, {} transform entries.",
            registry.blit.len(),
            registry.scale.len(),
            registry.transform.len()
        );
        registry
    }

    /// Creates a registry with no loops at all.
    pub fn empty() -> Self {
        Self {
            blit: DispatchTable::default(),
            scale: DispatchTable::default(),
            transform: DispatchTable::default(),
            generic: Arc::new(GenericAdapter::new()),
            readback: IntermediateCache::new(),
        }
    }

    /// Registers the shared generic adapter under `(Any, Any, dst)` for every
    /// destination type in every table.
    pub fn register_generic(&mut self) {
        for dst in DestType::all() {
            let key = DispatchKey::generic(dst);
            self.blit.register(key, self.generic.clone());
            self.scale.register(key, self.generic.clone());
            self.transform.register(key, self.generic.clone());
        }
    }

    /// Registers a loop for geometry `G`.
    pub fn register<G: Geometry>(&mut self, key: DispatchKey, primitive: Arc<dyn Primitive<G>>) {
        G::table_mut(self).register(key, primitive);
    }

    /// The table for geometry `G`.
    pub fn table<G: Geometry>(&self) -> &DispatchTable<G> {
        G::table(self)
    }

    /// Counters of the generic adapter.
    pub fn generic_stats(&self) -> GenericStats {
        self.generic.stats()
    }

    /// Drops cached intermediate images that nothing else holds.
    pub fn purge_intermediates(&self) {
        self.generic.purge();
        self.readback.purge();
    }

    pub(crate) fn readback_cache(&self) -> &IntermediateCache {
        &self.readback
    }

    /// Runs `geom` through the loop chosen for `cx`.
    pub fn dispatch<G: Geometry>(&self, cx: &DrawContext<'_>, geom: &G) -> Result<(), PipelineError> {
        match G::table(self).lookup(cx, geom) {
            Some(primitive) => {
                log::trace!("{} handles {geom:?}", primitive.name());
                primitive.draw(cx, geom)
            }
            None => Err(PipelineError::NoLoop {
                src: SourceType::of(cx.src),
                composite: effective_kind(cx),
                dst: DestType::of(cx.dst),
            }),
        }
    }
}

impl Geometry for BlitRect {
    fn table(registry: &PrimitiveRegistry) -> &DispatchTable<Self> {
        &registry.blit
    }

    fn table_mut(registry: &mut PrimitiveRegistry) -> &mut DispatchTable<Self> {
        &mut registry.blit
    }

    fn src_rect(&self) -> Rect {
        Rect::from_xywh(self.sx, self.sy, self.w, self.h)
    }

    fn with_src_origin(&self, x: i32, y: i32) -> Self {
        Self { sx: x, sy: y, ..*self }
    }

    fn to_device(&self) -> AffineTransform {
        AffineTransform::translation((self.dx - self.sx) as f64, (self.dy - self.sy) as f64)
    }

    fn hint(&self) -> Interpolation {
        Interpolation::Nearest
    }

    fn quad(&self) -> BlitQuad {
        BlitQuad {
            src: self.src_rect(),
            dst: (
                self.dx as f64,
                self.dy as f64,
                (self.dx + self.w) as f64,
                (self.dy + self.h) as f64,
            ),
            transform: None,
        }
    }

    fn device_bounds(&self) -> Rect {
        Rect::from_xywh(self.dx, self.dy, self.w, self.h)
    }
}

impl Geometry for ScaleRect {
    fn table(registry: &PrimitiveRegistry) -> &DispatchTable<Self> {
        &registry.scale
    }

    fn table_mut(registry: &mut PrimitiveRegistry) -> &mut DispatchTable<Self> {
        &mut registry.scale
    }

    fn src_rect(&self) -> Rect {
        self.src
    }

    fn with_src_origin(&self, x: i32, y: i32) -> Self {
        Self {
            src: self.src.translate(x - self.src.x1, y - self.src.y1),
            ..*self
        }
    }

    fn to_device(&self) -> AffineTransform {
        let (dx1, dy1, dx2, dy2) = self.dst;
        AffineTransform::rect_to_rect(
            self.src.x1 as f64,
            self.src.y1 as f64,
            self.src.x2 as f64,
            self.src.y2 as f64,
            dx1,
            dy1,
            dx2,
            dy2,
        )
    }

    fn hint(&self) -> Interpolation {
        self.hint
    }

    fn quad(&self) -> BlitQuad {
        BlitQuad {
            src: self.src,
            dst: self.dst,
            transform: None,
        }
    }
}

impl Geometry for TransformRect {
    fn table(registry: &PrimitiveRegistry) -> &DispatchTable<Self> {
        &registry.transform
    }

    fn table_mut(registry: &mut PrimitiveRegistry) -> &mut DispatchTable<Self> {
        &mut registry.transform
    }

    fn src_rect(&self) -> Rect {
        self.src
    }

    fn with_src_origin(&self, x: i32, y: i32) -> Self {
        Self {
            src: self.src.translate(x - self.src.x1, y - self.src.y1),
            ..*self
        }
    }

    fn to_device(&self) -> AffineTransform {
        let (dx1, dy1, dx2, dy2) = self.dst;
        AffineTransform::rect_to_rect(
            self.src.x1 as f64,
            self.src.y1 as f64,
            self.src.x2 as f64,
            self.src.y2 as f64,
            dx1,
            dy1,
            dx2,
            dy2,
        )
        .then(&self.transform)
    }

    fn hint(&self) -> Interpolation {
        self.hint
    }

    fn quad(&self) -> BlitQuad {
        BlitQuad {
            src: self.src,
            dst: self.dst,
            transform: Some(self.transform),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{queue_with, FakeExecutor};
    use std::sync::atomic::{AtomicBool, Ordering};
    use strata_core::{CompositeRule, CpuImage};

    struct Named(&'static str, AtomicBool);

    impl Named {
        fn new(name: &'static str, accepts: bool) -> Arc<Self> {
            Arc::new(Self(name, AtomicBool::new(accepts)))
        }
    }

    impl Primitive<BlitRect> for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn accepts(&self, _cx: &DrawContext<'_>, _geom: &BlitRect) -> bool {
            self.1.load(Ordering::SeqCst)
        }

        fn draw(&self, _cx: &DrawContext<'_>, _geom: &BlitRect) -> Result<(), PipelineError> {
            Ok(())
        }
    }

    fn pick(registry: &PrimitiveRegistry, src: &SurfaceRef, composite: &Composite) -> Option<&'static str> {
        let (queue, _log) = queue_with(FakeExecutor::default(), 0);
        let dst: SurfaceRef = CpuImage::new(PixelFormat::IntRgb, 4, 4).into();
        let clip = ClipRegion::unbounded();
        let cx = DrawContext {
            queue: &queue,
            registry,
            src,
            dst: &dst,
            composite,
            clip: &clip,
        };
        registry
            .table::<BlitRect>()
            .lookup(&cx, &BlitRect::new(0, 0, 0, 0, 1, 1))
            .map(|p| p.name())
    }

    #[test]
    fn lookup_prefers_exact_then_class_then_generic() {
        let src: SurfaceRef = CpuImage::new(PixelFormat::IntArgb, 4, 4).into();
        let src_type = SourceType::Cpu(PixelFormat::IntArgb);
        let dst_type = DestType::Cpu(PixelFormat::IntRgb);
        let exact = Named::new("exact", true);
        let class = Named::new("class", true);
        let generic = Named::new("generic", true);

        let mut registry = PrimitiveRegistry::empty();
        registry.register::<BlitRect>(DispatchKey::new(src_type, CompositeKind::SrcOver, dst_type), exact.clone());
        registry.register::<BlitRect>(DispatchKey::new(src_type, CompositeKind::AnyAlpha, dst_type), class.clone());
        registry.register::<BlitRect>(DispatchKey::generic(dst_type), generic.clone());

        let half = Composite::alpha(CompositeRule::SrcOver, 0.5);
        assert_eq!(pick(&registry, &src, &half), Some("exact"));
        assert_eq!(pick(&registry, &src, &Composite::SRC), Some("class"));
        assert_eq!(pick(&registry, &src, &Composite::xor(0)), Some("generic"));

        exact.1.store(false, Ordering::SeqCst);
        assert_eq!(pick(&registry, &src, &half), Some("class"));
        class.1.store(false, Ordering::SeqCst);
        assert_eq!(pick(&registry, &src, &half), Some("generic"));
        generic.1.store(false, Ordering::SeqCst);
        assert_eq!(pick(&registry, &src, &half), None);
    }

    #[test]
    fn opaque_source_over_is_looked_up_as_copy() {
        let src: SurfaceRef = CpuImage::new(PixelFormat::IntRgb, 4, 4).into();
        let copy = Named::new("copy", true);
        let mut registry = PrimitiveRegistry::empty();
        registry.register::<BlitRect>(
            DispatchKey::new(
                SourceType::Cpu(PixelFormat::IntRgb),
                CompositeKind::SrcNoEa,
                DestType::Cpu(PixelFormat::IntRgb),
            ),
            copy,
        );
        assert_eq!(pick(&registry, &src, &Composite::SRC_OVER), Some("copy"));
    }

    #[test]
    fn default_registry_covers_every_destination() {
        let registry = PrimitiveRegistry::new();
        assert_eq!(DestType::all().count(), SurfaceKind::ALL.len() + PixelFormat::ALL.len());
        for dst in DestType::all() {
            let key = DispatchKey::generic(dst);
            assert_eq!(registry.table::<BlitRect>().get(&key).map(|p| p.name()), Some("GenericAdapter"));
            assert!(registry.table::<ScaleRect>().get(&key).is_some());
            assert!(registry.table::<TransformRect>().get(&key).is_some());
        }
    }

    #[test]
    fn blit_geometry_maps_by_translation() {
        let geom = BlitRect::new(2, 3, 10, 20, 4, 4);
        assert_eq!(geom.device_bounds(), Rect::new(10, 20, 14, 24));
        assert_eq!(geom.to_device().transform_point(2.0, 3.0), (10.0, 20.0));
        let moved = geom.with_src_origin(0, 0);
        assert_eq!(moved.src_rect(), Rect::new(0, 0, 4, 4));
        assert_eq!(moved.device_bounds(), geom.device_bounds());
    }
}
