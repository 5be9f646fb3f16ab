//! GPU integration tests rendering into offscreen targets.
//!
//! These tests require a GPU. Run with:
//! ```
//! cargo test --package glyphcast-render -- --ignored
//! ```

use glyphcast_render::{
    Color, FrameRenderer, GlyphLayout, GpuContext, GraphicsConfig, GridAtlas, OffscreenConfig,
    GridLayout, OffscreenTarget, Point, PointBatcher, RenderError, RendererConfig,
    glam::{Vec2, Vec3},
};

const SIZE: u32 = 64;

fn setup() -> (GpuContext, OffscreenTarget, FrameRenderer) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let ctx = GpuContext::new(&GraphicsConfig::default()).expect("failed to init graphics");
    let target = OffscreenTarget::new(&ctx, OffscreenConfig::new(SIZE, SIZE)).unwrap();
    let atlas = GridAtlas::block(8, 16).unwrap();
    let renderer =
        FrameRenderer::new(&ctx, target.format(), &atlas, RendererConfig::default()).unwrap();
    (ctx, target, renderer)
}

fn pixel(pixels: &[u8], x: u32, y: u32) -> [u8; 4] {
    let i = ((y * SIZE + x) * 4) as usize;
    [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
}

#[test]
#[ignore = "requires GPU"]
fn test_renders_glyph_coverage() {
    let (ctx, target, mut renderer) = setup();
    renderer.resize(SIZE, SIZE);

    let atlas = GridAtlas::block(8, 16).unwrap();
    let run = GlyphLayout::default().layout("# #", &[], &atlas, Point::ZERO);

    let frame = renderer.frame_context();
    let stats = renderer
        .render(&ctx, target.view(), &frame, &run.glyphs, &[])
        .unwrap();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.glyphs, 3);

    let pixels = target.read_pixels(&ctx).unwrap();
    assert_eq!(pixels.len(), (SIZE * SIZE * 4) as usize);

    // Solid block glyph, then a blank space cell, then another block.
    assert_eq!(pixel(&pixels, 4, 8), [255, 255, 255, 255]);
    assert_eq!(pixel(&pixels, 12, 8)[..3], [0, 0, 0]);
    assert_eq!(pixel(&pixels, 20, 8), [255, 255, 255, 255]);
    // Below the line.
    assert_eq!(pixel(&pixels, 4, 40)[..3], [0, 0, 0]);
}

#[test]
#[ignore = "requires GPU"]
fn test_renders_points() {
    let (ctx, target, mut renderer) = setup();
    renderer.resize(SIZE, SIZE);

    let mut batcher = PointBatcher::new();
    batcher.emit_colored(Vec3::new(32.0, 32.0, 0.0), 0.25, Vec2::ZERO, Color::RED);

    let frame = renderer.frame_context();
    let stats = renderer
        .render(&ctx, target.view(), &frame, &[], batcher.instances())
        .unwrap();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.points, 1);
    batcher.clear();

    let pixels = target.read_pixels(&ctx).unwrap();
    assert_eq!(pixel(&pixels, 32, 32), [255, 0, 0, 255]);
    assert_eq!(pixel(&pixels, 2, 2)[..3], [0, 0, 0]);
}

#[test]
#[ignore = "requires GPU"]
fn test_zero_viewport_drops_frame() {
    let (ctx, target, mut renderer) = setup();

    let frame = renderer.frame_context();
    let err = renderer
        .render(&ctx, target.view(), &frame, &[], &[])
        .unwrap_err();
    assert!(err.is_frame_dropped());
    assert!(matches!(err, RenderError::FrameDropped { .. }));
}

#[test]
#[ignore = "requires GPU"]
fn test_buffers_grow_for_large_frames() {
    let (ctx, target, mut renderer) = setup();
    renderer.resize(SIZE, SIZE);

    let atlas = GridAtlas::block(8, 16).unwrap();
    let text = "x".repeat(4096);
    let run = GlyphLayout::default().layout(&text, &[], &atlas, Point::ZERO);

    let frame = renderer.frame_context();
    let stats = renderer
        .render(&ctx, target.view(), &frame, &run.glyphs, &[])
        .unwrap();
    assert_eq!(stats.glyphs, 4096);
    assert_eq!(stats.vertices, 4096 * 4);
}

#[test]
#[ignore = "requires GPU"]
fn test_offscreen_target_resize() {
    let ctx = GpuContext::new(&GraphicsConfig::default()).expect("failed to init graphics");
    let mut target = OffscreenTarget::new(&ctx, OffscreenConfig::new(32, 32)).unwrap();

    target.resize(&ctx, 100, 50).unwrap();
    assert_eq!(target.size(), (100, 50));
    assert_eq!(target.read_pixels(&ctx).unwrap().len(), 100 * 50 * 4);

    assert!(target.resize(&ctx, 0, 50).is_err());
    assert!(OffscreenTarget::new(&ctx, OffscreenConfig::new(0, 10)).is_err());
}

#[test]
#[ignore = "requires GPU"]
fn test_set_atlas_replaces_coverage() {
    let (ctx, target, mut renderer) = setup();
    renderer.resize(SIZE, SIZE);

    // Same size as the block atlas, but every cell is empty.
    let layout = GridLayout::ascii(8, 16);
    let (w, h) = layout.dimensions();
    let blank = GridAtlas::new(layout, vec![0; (w * h) as usize]).unwrap();
    renderer.set_atlas(&ctx, &blank).unwrap();

    let run = GlyphLayout::default().layout("#", &[], &blank, Point::ZERO);
    let frame = renderer.frame_context();
    renderer
        .render(&ctx, target.view(), &frame, &run.glyphs, &[])
        .unwrap();

    let pixels = target.read_pixels(&ctx).unwrap();
    assert_eq!(pixel(&pixels, 4, 8)[..3], [0, 0, 0]);
}
