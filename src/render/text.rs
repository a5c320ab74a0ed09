use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    foundation::core::Rgba8,
    foundation::error::{ViewerError, ViewerResult},
};

/// Environment variable naming a font file used when `--font` is not given.
pub const FONT_ENV: &str = "WAREPLAY_FONT";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<Rgba8> for TextBrushRgba8 {
    fn from(c: Rgba8) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// Raw font data plus the face index inside it.
#[derive(Clone)]
pub struct FontBytes {
    pub data: Vec<u8>,
    pub index: u32,
    /// Where the bytes came from, for diagnostics.
    pub origin: String,
}

impl std::fmt::Debug for FontBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBytes")
            .field("len", &self.data.len())
            .field("index", &self.index)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Pick the label font: explicit path, then `WAREPLAY_FONT`, then a system sans-serif face.
///
/// An explicit path that cannot be read is an error; a missing system font is not, labels
/// are simply not drawn.
pub fn resolve_font(explicit: Option<&Path>) -> ViewerResult<Option<FontBytes>> {
    if let Some(path) = explicit {
        return read_font_file(path).map(Some);
    }
    if let Some(path) = std::env::var_os(FONT_ENV).map(PathBuf::from) {
        return read_font_file(&path).map(Some);
    }
    Ok(system_sans_serif())
}

fn read_font_file(path: &Path) -> ViewerResult<FontBytes> {
    let data = std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
    Ok(FontBytes {
        data,
        index: 0,
        origin: path.display().to_string(),
    })
}

fn system_sans_serif() -> Option<FontBytes> {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();

    let families = [
        usvg::fontdb::Family::Name("Inter"),
        usvg::fontdb::Family::SansSerif,
    ];
    let query = usvg::fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db.query(&query).or_else(|| db.faces().next().map(|f| f.id))?;
    let origin = db
        .face(id)
        .map(|f| {
            f.families
                .first()
                .map(|(name, _)| name.clone())
                .unwrap_or_default()
        })
        .unwrap_or_default();

    db.with_face_data(id, |data, index| FontBytes {
        data: data.to_vec(),
        index,
        origin: format!("system:{origin}"),
    })
}

/// Shapes short labels with a single registered font.
pub struct TextEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: String,
    font: vello_cpu::peniko::FontData,
}

impl TextEngine {
    /// Register `font` and keep it for every subsequent layout.
    pub fn new(font: &FontBytes) -> ViewerResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font.data.clone()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            ViewerError::validation(format!(
                "no font families registered from '{}'",
                font.origin
            ))
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ViewerError::validation("registered font family has no name"))?
            .to_string();

        tracing::debug!(family = %family_name, origin = %font.origin, "label font registered");

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
            font: vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(font.data.clone()),
                font.index,
            ),
        })
    }

    /// Family name the labels are set in.
    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    /// Font handle for glyph rendering.
    pub fn font(&self) -> &vello_cpu::peniko::FontData {
        &self.font
    }

    /// Lay out a single unwrapped line.
    pub fn layout_line(
        &mut self,
        text: &str,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> ViewerResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ViewerError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

/// Width guess used for label tiles when no font is available.
pub fn estimate_text_width(text: &str, size_px: f32) -> f64 {
    text.chars().count() as f64 * f64::from(size_px) * 0.6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_missing_font_is_an_error() {
        let err = resolve_font(Some(Path::new("target/no/such/font.ttf"))).unwrap_err();
        assert!(err.to_string().contains("font.ttf"));
    }

    #[test]
    fn garbage_bytes_register_no_family() {
        let font = FontBytes {
            data: vec![0u8; 16],
            index: 0,
            origin: "test".to_string(),
        };
        assert!(TextEngine::new(&font).is_err());
    }

    #[test]
    fn width_estimate_scales_with_length_and_size() {
        assert_eq!(estimate_text_width("", 10.0), 0.0);
        assert!((estimate_text_width("W1", 10.0) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn system_font_when_present_lays_out_nonzero_width() {
        let Ok(Some(font)) = resolve_font(None) else {
            return;
        };
        let Ok(mut engine) = TextEngine::new(&font) else {
            return;
        };
        let layout = engine
            .layout_line("W1", 10.0, TextBrushRgba8::default())
            .unwrap();
        assert!(layout.width() > 0.0);
        assert!(engine.layout_line("W1", 0.0, TextBrushRgba8::default()).is_err());
    }
}
