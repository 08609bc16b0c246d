//! TwinText Render Library
//!
//! CPU rendering for TwinText canvases built on tiny-skia: a [`DrawContext`]
//! implementation, a [`Rasterizer`] for reflection sources and a scene renderer.
//!
//! [`DrawContext`]: twintext_core::draw::DrawContext
//! [`Rasterizer`]: twintext_core::raster::Rasterizer

mod rasterizer;
mod renderer;
mod skia;
mod skia_impl;
mod text;

pub use rasterizer::SkiaRasterizer;
pub use renderer::{RenderContext, RenderResult, Renderer, RendererError};
pub use skia::SkiaContext;
pub use skia_impl::SkiaRenderer;
pub use text::paint_text;
