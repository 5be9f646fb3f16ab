//! Placement of styled text as glyph quads.
//!
//! Layout is pure CPU work: it consumes the spans from the tokenizer and a
//! [`FontAtlas`], and produces one [`GlyphInstance`] per renderable
//! character in editor space (pixels, origin at top-left, y down). It does
//! not depend on the viewport, so a resize never invalidates a run.

use glyphcast_syntax::{Format, StyledSpan};
use tracing::{trace, warn};

use crate::atlas::{AtlasGlyph, FontAtlas, GlyphStyle};
use crate::types::{Color, Point, Rect};

/// Layout options.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Tab stop width in columns of the space advance.
    pub tab_width: usize,
    /// Line height override; the atlas line height when `None`.
    pub line_height: Option<f32>,
    /// Horizontal shift of a synthesized italic's top edge, per pixel of height.
    pub italic_slant: f32,
}

impl LayoutConfig {
    /// Set the tab width in columns.
    pub fn with_tab_width(mut self, columns: usize) -> Self {
        self.tab_width = columns;
        self
    }

    /// Override the atlas line height.
    pub fn with_line_height(mut self, line_height: f32) -> Self {
        self.line_height = Some(line_height);
        self
    }

    /// Set the synthesized italic slant.
    pub fn with_italic_slant(mut self, slant: f32) -> Self {
        self.italic_slant = slant;
        self
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            tab_width: 4,
            line_height: None,
            italic_slant: 0.2,
        }
    }
}

/// One positioned glyph quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphInstance {
    /// Quad in editor space.
    pub rect: Rect,
    /// Normalized atlas rectangle.
    pub tex_rect: Rect,
    /// Format color.
    pub color: Color,
    /// Styles the renderer must synthesize (the atlas had no such bitmap).
    pub synthesize: GlyphStyle,
    /// Horizontal shift of the quad's top edge in pixels.
    pub skew: f32,
    /// Code-point index of the source character.
    pub char_index: usize,
}

/// Result of laying out one text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlyphRun {
    /// Glyph quads in text order.
    pub glyphs: Vec<GlyphInstance>,
    /// Characters the atlas lacked, in order of first appearance.
    pub missing: Vec<char>,
    /// Area covered by the laid-out lines.
    pub bounds: Rect,
    /// Number of lines (0 for empty text).
    pub line_count: usize,
}

/// Lays out styled text against a font atlas.
#[derive(Debug, Clone, Default)]
pub struct GlyphLayout {
    config: LayoutConfig,
}

impl GlyphLayout {
    /// Create a layout with the given options.
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// The layout options.
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lay out `text` starting with the pen at `origin`.
    ///
    /// `spans` are the tokenizer output for `text`; characters no span
    /// covers use the default format. Control characters other than `\n`
    /// and `\t` emit nothing and do not advance.
    pub fn layout(
        &self,
        text: &str,
        spans: &[StyledSpan],
        atlas: &dyn FontAtlas,
        origin: Point,
    ) -> GlyphRun {
        let metrics = atlas.metrics();
        let line_height = self.config.line_height.unwrap_or(metrics.line_height);
        let tab_stop = self.config.tab_width as f32 * metrics.space_advance;

        let mut run = GlyphRun::default();
        if text.is_empty() {
            run.bounds = Rect::new(origin.x, origin.y, 0.0, 0.0);
            return run;
        }

        let mut pen = origin;
        let mut max_x = origin.x;
        let mut line_count = 1;
        let mut spans = spans.iter().peekable();
        let default_format = Format::default();

        for (index, ch) in text.chars().enumerate() {
            match ch {
                '\n' => {
                    pen.x = origin.x;
                    pen.y += line_height;
                    line_count += 1;
                    continue;
                }
                '\t' => {
                    if tab_stop > 0.0 {
                        let column = ((pen.x - origin.x) / tab_stop).floor() + 1.0;
                        pen.x = origin.x + column * tab_stop;
                        max_x = max_x.max(pen.x);
                    }
                    continue;
                }
                c if c.is_control() => continue,
                _ => {}
            }

            while spans.next_if(|s| s.end <= index).is_some() {}
            let format = spans
                .peek()
                .filter(|s| s.contains(index))
                .map_or(default_format, |s| s.format);

            let requested = GlyphStyle::new(format.bold, format.italic);
            let glyph = match atlas.glyph(ch, requested) {
                Some(glyph) => glyph,
                None => {
                    if !run.missing.contains(&ch) {
                        warn!(
                            target: "glyphcast_render::layout",
                            ch = ?ch,
                            index,
                            "glyph missing from atlas, using fallback"
                        );
                        run.missing.push(ch);
                    }
                    atlas.fallback_glyph()
                }
            };

            run.glyphs
                .push(self.place(&glyph, requested, format, pen, index));
            pen.x += glyph.advance;
            max_x = max_x.max(pen.x);
        }

        run.line_count = line_count;
        run.bounds = Rect::new(
            origin.x,
            origin.y,
            max_x - origin.x,
            line_count as f32 * line_height,
        );

        trace!(
            target: "glyphcast_render::layout",
            glyphs = run.glyphs.len(),
            lines = run.line_count,
            missing = run.missing.len(),
            "laid out text"
        );

        run
    }

    fn place(
        &self,
        glyph: &AtlasGlyph,
        requested: GlyphStyle,
        format: Format,
        pen: Point,
        char_index: usize,
    ) -> GlyphInstance {
        // Styles the bitmap already has are not synthesized again.
        let synthesize = GlyphStyle::new(
            requested.bold && !glyph.style.bold,
            requested.italic && !glyph.style.italic,
        );
        let skew = if synthesize.italic {
            self.config.italic_slant * glyph.size.height
        } else {
            0.0
        };

        GlyphInstance {
            rect: Rect::new(
                pen.x + glyph.offset.x,
                pen.y + glyph.offset.y,
                glyph.size.width,
                glyph.size.height,
            ),
            tex_rect: glyph.tex_rect,
            color: Color::from(format.foreground),
            synthesize,
            skew,
            char_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{GridAtlas, GridLayout};
    use glyphcast_syntax::{Format, Rgba};

    fn atlas() -> GridAtlas {
        GridAtlas::block(8, 16).unwrap()
    }

    fn layout(text: &str, spans: &[StyledSpan]) -> GlyphRun {
        GlyphLayout::default().layout(text, spans, &atlas(), Point::ZERO)
    }

    fn xs(run: &GlyphRun) -> Vec<f32> {
        run.glyphs.iter().map(|g| g.rect.left()).collect()
    }

    #[test]
    fn test_pen_advances() {
        let run = layout("ab c", &[]);
        assert_eq!(xs(&run), vec![0.0, 8.0, 16.0, 24.0]);
        assert_eq!(run.line_count, 1);
        assert_eq!(run.bounds, Rect::new(0.0, 0.0, 32.0, 16.0));
        assert!(run.missing.is_empty());
    }

    #[test]
    fn test_newline_and_origin() {
        let run = GlyphLayout::default().layout("ab\ncd", &[], &atlas(), Point::new(10.0, 5.0));
        let pos: Vec<_> = run.glyphs.iter().map(|g| (g.rect.left(), g.rect.top())).collect();
        assert_eq!(pos, vec![(10.0, 5.0), (18.0, 5.0), (10.0, 21.0), (18.0, 21.0)]);
        assert_eq!(run.line_count, 2);
        assert_eq!(run.glyphs[2].char_index, 3);
    }

    #[test]
    fn test_tabs_snap_to_stops() {
        // Tab stops every 4 columns of 8px.
        let run = layout("a\tb\t\tc", &[]);
        assert_eq!(xs(&run), vec![0.0, 32.0, 96.0]);

        let run = GlyphLayout::new(LayoutConfig::default().with_tab_width(2)).layout(
            "\tx",
            &[],
            &atlas(),
            Point::ZERO,
        );
        assert_eq!(xs(&run), vec![16.0]);
    }

    #[test]
    fn test_control_characters_are_skipped() {
        let run = layout("a\r\nb\u{7}c", &[]);
        assert_eq!(run.glyphs.len(), 3);
        assert_eq!(run.glyphs[1].rect.left(), 0.0);
        assert_eq!(run.glyphs[2].rect.left(), 8.0);
    }

    #[test]
    fn test_missing_glyph_uses_fallback() {
        let atlas = atlas();
        let run = GlyphLayout::default().layout("aéé", &[], &atlas, Point::ZERO);
        assert_eq!(run.glyphs.len(), 3);
        assert_eq!(run.missing, vec!['é']);
        assert_eq!(run.glyphs[1].tex_rect, atlas.fallback_glyph().tex_rect);
    }

    #[test]
    fn test_span_colors_and_styles() {
        let red = Format::fg(Rgba::rgb(255, 0, 0)).with_bold();
        let blue = Format::fg(Rgba::rgb(0, 0, 255)).with_italic();
        let spans = [
            StyledSpan::new(0, 2, red, None),
            StyledSpan::new(3, 4, blue, None),
        ];
        let run = layout("ab cd", &spans);

        assert_eq!(run.glyphs[0].color, Color::RED);
        assert!(run.glyphs[0].synthesize.bold);
        assert_eq!(run.glyphs[0].skew, 0.0);

        // Not covered by a span: default format.
        assert_eq!(run.glyphs[2].color, Color::WHITE);
        assert_eq!(run.glyphs[2].synthesize, GlyphStyle::REGULAR);

        assert_eq!(run.glyphs[3].color, Color::BLUE);
        assert!(run.glyphs[3].synthesize.italic);
        assert!((run.glyphs[3].skew - 0.2 * 16.0).abs() < 1e-6);

        assert_eq!(run.glyphs[4].color, Color::WHITE);
    }

    #[test]
    fn test_native_variant_is_not_synthesized() {
        let layout_desc = GridLayout::ascii(8, 16).with_styles([GlyphStyle::REGULAR, GlyphStyle::BOLD]);
        let (w, h) = layout_desc.dimensions();
        let atlas = GridAtlas::new(layout_desc, vec![0; (w * h) as usize]).unwrap();

        let bold_italic = Format::default().with_bold().with_italic();
        let spans = [StyledSpan::new(0, 1, bold_italic, None)];
        let run = GlyphLayout::default().layout("x", &spans, &atlas, Point::ZERO);

        // Bold comes from the atlas; italic still has to be synthesized.
        assert_eq!(run.glyphs[0].synthesize, GlyphStyle::ITALIC);
        assert!(run.glyphs[0].tex_rect.top() >= 0.5);
    }

    #[test]
    fn test_line_height_override() {
        let run = GlyphLayout::new(LayoutConfig::default().with_line_height(20.0)).layout(
            "a\nb",
            &[],
            &atlas(),
            Point::ZERO,
        );
        assert_eq!(run.glyphs[1].rect.top(), 20.0);
        assert_eq!(run.bounds.height(), 40.0);
    }

    #[test]
    fn test_empty_text() {
        let run = layout("", &[]);
        assert!(run.glyphs.is_empty());
        assert_eq!(run.line_count, 0);
        assert!(run.bounds.is_empty());
    }
}
