//! Integration tests for string measurement and mesh building.

mod common;

use common::{FONT, Harness};
use lowram_text::testing::MockFontEngine;
use lowram_text::{AtlasConfig, LazyFont, LoadOptions, Rect, TextDirection, TextFont};

fn loaded(harness: &mut Harness, size: u32) -> LazyFont {
    let mut font = LazyFont::new();
    font.load(&mut harness.cache, FONT, size, true).unwrap();
    font
}

#[test]
fn test_line_metrics_come_from_the_face() {
    let mut harness = Harness::new(MockFontEngine::new());
    let font = loaded(&mut harness, 16);

    assert!(font.is_loaded());
    assert_eq!(font.line_height(), 26.0);
    assert_eq!(font.ascender_height(), 18.0);
    assert_eq!(font.descender_height(), -5.0);
}

#[test]
fn test_string_width_sums_advances() {
    let mut harness = Harness::new(MockFontEngine::new());
    let font = loaded(&mut harness, 16);

    assert_eq!(font.string_width(""), 0.0);
    assert_eq!(font.string_width("A"), 12.0);
    assert_eq!(font.string_width("AB"), 24.0);
    assert_eq!(font.string_width("A B"), 29.0);
}

#[test]
fn test_whitespace_never_touches_the_atlas() {
    let mut harness = Harness::new(MockFontEngine::new());
    let font = loaded(&mut harness, 16);

    assert_eq!(font.string_width("\t"), 20.0);
    assert_eq!(font.string_width("  "), 10.0);
    assert_eq!(harness.engine.rasterizations(), 0);
    assert_eq!(font.loaded_glyph_count(), 0);
}

#[test]
fn test_space_size_scales_spaces_and_tabs() {
    let mut harness = Harness::new(MockFontEngine::new());
    let mut font = loaded(&mut harness, 16);
    font.set_space_size(2.0);

    assert_eq!(font.string_width("A B"), 34.0);
    assert_eq!(font.string_width("\t"), 40.0);
}

#[test]
fn test_letter_spacing_widens_gaps() {
    let mut harness = Harness::new(MockFontEngine::new());
    let mut font = loaded(&mut harness, 16);
    font.set_letter_spacing(2.0);

    // Each glyph gains one space advance.
    assert_eq!(font.string_width("AB"), 34.0);
}

#[test]
fn test_kerning_applies_to_adjacent_glyphs_only() {
    let engine = MockFontEngine::new().kerning_pair('A', 'V', -2.0);
    let mut harness = Harness::new(engine);
    let font = loaded(&mut harness, 16);

    assert_eq!(font.string_width("AV"), 22.0);
    assert_eq!(font.string_width("VA"), 24.0);
    assert_eq!(font.string_width("A V"), 29.0);
    assert_eq!(font.string_width("A\nV"), 12.0);
}

#[test]
fn test_right_to_left_moves_pen_backwards() {
    let engine = MockFontEngine::new().kerning_pair('A', 'V', -2.0);
    let mut harness = Harness::new(engine);
    let mut font = loaded(&mut harness, 16);
    font.set_direction(TextDirection::RightToLeft);

    let mut pens = Vec::new();
    font.walk("AB", 0.0, 0.0, false, |step| pens.push(step.pen.x));
    assert_eq!(pens, vec![-12.0, -24.0]);
    assert_eq!(font.string_width("AB"), 24.0);

    // Right-to-left kerning looks up the pair in visual order and moves
    // against the pen, so the negative pair pulls 'A' back toward 'V'.
    assert_eq!(font.string_width("VA"), 22.0);
    pens.clear();
    font.walk("VA", 0.0, 0.0, false, |step| pens.push(step.pen.x));
    assert_eq!(pens, vec![-12.0, -22.0]);
}

#[test]
fn test_newline_returns_to_line_start() {
    let mut harness = Harness::new(MockFontEngine::new());
    let font = loaded(&mut harness, 16);

    let mut pens = Vec::new();
    font.walk("AB\nC", 5.0, 100.0, false, |step| pens.push((step.ch, step.pen)));
    let pens: Vec<_> = pens.iter().map(|(ch, pen)| (*ch, pen.x, pen.y)).collect();
    assert_eq!(
        pens,
        vec![('A', 5.0, 100.0), ('B', 17.0, 100.0), ('C', 5.0, 74.0)]
    );

    let mut flipped = Vec::new();
    font.walk("A\nB", 0.0, 0.0, true, |step| flipped.push(step.pen.y));
    assert_eq!(flipped, vec![0.0, 26.0]);
    assert_eq!(font.string_width("ABC\nD"), 36.0);
}

#[test]
fn test_bounding_box_of_single_glyph() {
    let mut harness = Harness::new(MockFontEngine::new());
    let font = loaded(&mut harness, 16);

    assert_eq!(
        font.string_bounding_box("A", 0.0, 0.0, false),
        Rect::new(0.0, 0.0, 12.0, 14.0)
    );
    assert_eq!(
        font.string_bounding_box("A", 0.0, 0.0, true),
        Rect::new(0.0, -14.0, 12.0, 14.0)
    );
    assert_eq!(
        font.string_bounding_box("AB", 10.0, 20.0, false),
        Rect::new(10.0, 20.0, 24.0, 14.0)
    );
    assert_eq!(font.string_height("A"), 14.0);
}

#[test]
fn test_bounding_box_of_blank_strings() {
    let mut harness = Harness::new(MockFontEngine::new());
    let font = loaded(&mut harness, 16);

    assert_eq!(
        font.string_bounding_box("", 3.0, 4.0, false),
        Rect::new(3.0, 4.0, 0.0, 0.0)
    );
    let spaces = font.string_bounding_box("  ", 0.0, 0.0, false);
    assert_eq!(spaces.width, 10.0);
    assert_eq!(spaces.height, 0.0);
}

#[test]
fn test_meshes_emit_one_quad_per_drawn_glyph() {
    let mut harness = Harness::new(MockFontEngine::new());
    let font = loaded(&mut harness, 16);

    let meshes = font.string_meshes("A B", 0.0, 0.0, true);
    assert_eq!(meshes.len(), 1);
    let mesh = &meshes[0];
    assert_eq!(mesh.quad_count(), 2);
    assert_eq!(mesh.indices.len(), 12);

    // With y pointing down, the quad of 'A' spans from its top to the baseline.
    let a = font.glyph('A').unwrap();
    assert_eq!(mesh.vertices[0].position, [1.0, -14.0]);
    assert_eq!(mesh.vertices[2].position, [11.0, 0.0]);
    assert_eq!(mesh.vertices[0].tex_coords, [a.tex.left, a.tex.top]);
    assert_eq!(mesh.vertices[2].tex_coords, [a.tex.right, a.tex.bottom]);
    // 'B' starts after 'A' and the space.
    assert_eq!(mesh.vertices[4].position, [18.0, -14.0]);

    let upright = font.string_mesh("A", 0.0, 0.0, false);
    assert_eq!(upright.vertices[0].position, [1.0, 14.0]);
    assert_eq!(upright.vertices[2].position, [11.0, 0.0]);
}

#[test]
fn test_meshes_are_split_by_page() {
    let config = AtlasConfig::new().max_texture_size(256);
    let mut harness = Harness::with_config(MockFontEngine::new().glyph_size(60, 60), config, 4096);
    let font = loaded(&mut harness, 64);

    // Seventeen 60px glyphs overflow a 256px page that may not grow.
    font.string_width("ABCDEFGHIJKLMNOPQ");
    assert_eq!(font.atlas_count(), 2);

    let meshes = font.string_meshes("AQ", 0.0, 0.0, false);
    assert_eq!(meshes.len(), 2);
    assert_eq!(meshes[0].quad_count(), 1);
    assert_eq!(meshes[1].quad_count(), 1);

    let only_second = font.string_meshes("Q", 0.0, 0.0, false);
    assert_eq!(only_second.len(), 2);
    assert!(only_second[0].is_empty());

    assert_eq!(font.string_mesh("AQ", 0.0, 0.0, false).quad_count(), 1);
    assert!(font.string_mesh("Q", 0.0, 0.0, false).is_empty());
    assert!(font.texture(1).is_some());
    assert!(font.texture(2).is_none());
}

#[test]
fn test_unmapped_characters_are_skipped() {
    let mut harness = Harness::new(MockFontEngine::new().unmapped('x'));
    let font = loaded(&mut harness, 16);

    assert!(!font.is_valid_glyph('x'));
    assert!(!font.is_valid_glyph('\u{E000}'));
    assert!(font.is_valid_glyph('y'));
    assert!(!font.has_glyph('y'));

    assert_eq!(font.string_width("axb"), 24.0);
    assert_eq!(font.string_meshes("axb", 0.0, 0.0, true)[0].quad_count(), 2);
    assert!(font.glyph('x').is_none());
    assert_eq!(font.loaded_glyph_count(), 2);
}

#[test]
fn test_missing_space_glyph_uses_fallback_advance() {
    let mut harness = Harness::new(MockFontEngine::new().without_space());
    let font = loaded(&mut harness, 16);

    // Half the point size.
    assert_eq!(font.string_width(" "), 8.0);
}

#[test]
fn test_load_options_are_applied() {
    let mut harness = Harness::new(MockFontEngine::new());
    let mut font = LazyFont::new();
    let options = LoadOptions::new(FONT, 16)
        .full_character_set(true)
        .contours(true, 0.3)
        .unicode_range(0x4E00..=0x9FFF)
        .direction(TextDirection::RightToLeft);
    font.load_with(&mut harness.cache, &options).unwrap();

    assert_eq!(font.direction(), TextDirection::RightToLeft);
    assert_eq!(font.identity().unwrap().dpi, 96);
    // Nothing is preloaded, whatever the options ask for.
    assert_eq!(font.loaded_glyph_count(), 0);
    assert_eq!(harness.engine.rasterizations(), 0);
}

#[test]
fn test_clones_share_the_atlas_but_not_settings() {
    let mut harness = Harness::new(MockFontEngine::new());
    let font = loaded(&mut harness, 16);
    let mut wide = font.clone();
    wide.set_letter_spacing(3.0);

    assert_eq!(wide.string_width("AB"), 44.0);
    assert_eq!(font.string_width("AB"), 24.0);
    assert_eq!(font.loaded_glyph_count(), 2);
    assert_eq!(harness.cache.len(), 1);
}

#[test]
fn test_texture_matches_atlas_filter() {
    let mut harness = Harness::new(MockFontEngine::new());
    let small = loaded(&mut harness, 12);
    let large = loaded(&mut harness, 32);

    let small_texture = small.texture(0).unwrap();
    assert_eq!(small_texture.filter(), lowram_text::FilterMode::Nearest);
    assert_eq!(small_texture.dimensions(), (64, 64));
    drop(small_texture);

    assert_eq!(large.texture(0).unwrap().filter(), lowram_text::FilterMode::Linear);
    assert_eq!(large.texture(0).unwrap().dimensions(), (128, 128));
}
