//! Loads a font, lays out a paragraph of mixed-script text and reports how
//! much of the atlas it used.
//!
//! Run with: cargo run -p lowram-text --example atlas_report -- [font] [size]
//!
//! `font` is a file path or a family name such as `sans-serif`. Set
//! `RUST_LOG=lowram_text=debug` to watch pages being created and grown.

use std::rc::Rc;

use lowram_text::{FontCache, HeadlessTextures, LazyFont, SANS_SERIF, SwashEngine, TextFont};
use tracing_subscriber::EnvFilter;

const SAMPLE: &str = "The quick brown fox jumps over the lazy dog.\n\
    吾輩は猫である。名前はまだ無い。\n\
    Съешь же ещё этих мягких французских булок.\n\
    다람쥐 헌 쳇바퀴에 타고파";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let font_name = args.next().unwrap_or_else(|| SANS_SERIF.to_string());
    let size: u32 = match args.next() {
        Some(size) => size.parse()?,
        None => 24,
    };

    let textures = Rc::new(HeadlessTextures::default());
    let mut cache = FontCache::new(Rc::new(SwashEngine::new()), textures.clone());

    let mut body = LazyFont::new();
    body.load(&mut cache, &font_name, size, true)?;
    let mut heading = LazyFont::new();
    heading.load(&mut cache, &font_name, size, true)?;

    let bounds = body.string_bounding_box(SAMPLE, 0.0, 0.0, true);
    let meshes = heading.string_meshes(SAMPLE, 0.0, 0.0, true);
    let quads: usize = meshes.iter().map(|mesh| mesh.quad_count()).sum();

    println!("font:           {font_name} @ {size}pt");
    println!("line height:    {}", body.line_height());
    println!("bounds:         {:.1} x {:.1}", bounds.width, bounds.height);
    println!("glyphs loaded:  {}", body.loaded_glyph_count());
    println!("quads:          {quads} across {} page(s)", meshes.len());

    let Some(atlas) = body.atlas() else {
        return Ok(());
    };
    let atlas = atlas.borrow();
    for (index, page) in atlas.pages().iter().enumerate() {
        let (x, y) = page.cursor();
        println!(
            "page {index}:         {}x{} (cursor {x},{y})",
            page.width(),
            page.height()
        );
    }
    println!("atlas stats:    {:?}", atlas.stats());
    println!("raster stats:   {:?}", atlas.raster_stats());
    println!("texture stats:  {:?}", textures.stats());
    println!("cache entries:  {}", cache.len());
    println!("memory:         {} bytes", cache.total_memory_usage());
    Ok(())
}
