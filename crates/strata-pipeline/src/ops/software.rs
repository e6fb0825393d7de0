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

//! CPU image to CPU image draws, composited in software.

use crate::dispatch::{DrawContext, Geometry, Primitive};
use crate::error::PipelineError;
use std::sync::Arc;
use strata_core::pixel::blend;
use strata_core::SurfaceRef;

/// Draws between two CPU images without touching the queue.
#[derive(Debug, Default)]
pub struct SoftwareLoop;

impl<G: Geometry> Primitive<G> for SoftwareLoop {
    fn name(&self) -> &'static str {
        "Software"
    }

    fn accepts(&self, cx: &DrawContext<'_>, _geom: &G) -> bool {
        matches!((cx.src, cx.dst), (SurfaceRef::Cpu(_), SurfaceRef::Cpu(_)))
    }

    fn draw(&self, cx: &DrawContext<'_>, geom: &G) -> Result<(), PipelineError> {
        let (SurfaceRef::Cpu(src), SurfaceRef::Cpu(dst)) = (cx.src, cx.dst) else {
            return Ok(());
        };
        let to_device = geom.to_device();
        let written = if Arc::ptr_eq(src, dst) {
            let snapshot = src.snapshot();
            blend::draw_mapped(
                &snapshot,
                geom.src_rect(),
                &mut dst.write(),
                &to_device,
                cx.clip,
                cx.composite,
            )
        } else {
            blend::draw_mapped(
                &src.read(),
                geom.src_rect(),
                &mut dst.write(),
                &to_device,
                cx.clip,
                cx.composite,
            )
        };
        log::trace!("Software loop wrote {written} pixels into {}", dst.handle());
        Ok(())
    }
}
