//! Raster layout of an encoded symbol.

use image::{GrayImage, Luma};

use super::code128::Code128;
use super::font::{self, GLYPH_ADVANCE, GLYPH_HEIGHT};
use super::{RenderError, RenderOptions};

const BLACK: Luma<u8> = Luma([0]);
const WHITE: Luma<u8> = Luma([255]);

/// Space between the bottom of the bars and the text line, in pixels
const TEXT_GAP: u32 = 6;

/// Largest canvas the renderer will allocate, in pixels
pub(crate) const MAX_PIXELS: u64 = 1 << 26;

/// Canvas geometry in pixels
struct Layout {
    width: u32,
    height: u32,
    symbol_width: u32,
    text_width: u32,
}

impl Layout {
    /// `None` when any dimension overflows or the canvas exceeds [`MAX_PIXELS`]
    fn compute(module_count: usize, text: Option<&str>, options: &RenderOptions) -> Option<Self> {
        let module_width = u64::from(options.module_width.max(1));
        let scale = options.font_scale.max(1);
        let margin = u64::from(options.margin);

        let symbol_width = (module_count as u64).checked_mul(module_width)?;
        let quiet = u64::from(options.quiet_zone).checked_mul(module_width)?.checked_mul(2)?;
        let bars_width = symbol_width.checked_add(quiet)?;

        let text_width = match text {
            Some(t) => font::text_width(t, scale)?,
            None => 0,
        };
        let width = bars_width.max(text_width.checked_add(2 * margin)?);

        let text_band = if text.is_some() {
            u64::from(TEXT_GAP) + u64::from(GLYPH_HEIGHT) * u64::from(scale)
        } else {
            0
        };
        let height = 2 * margin + u64::from(options.bar_height) + text_band;

        if width.checked_mul(height)? > MAX_PIXELS {
            return None;
        }

        Some(Self {
            width: u32::try_from(width).ok()?,
            height: u32::try_from(height).ok()?,
            symbol_width: u32::try_from(symbol_width).ok()?,
            text_width: u32::try_from(text_width).ok()?,
        })
    }
}

/// Draw bars (and optionally `text`) centered on a white canvas
pub(crate) fn draw(
    code: &Code128,
    text: Option<&str>,
    options: &RenderOptions,
) -> Result<GrayImage, RenderError> {
    let modules = code.modules();
    let layout = Layout::compute(modules.len(), text, options).ok_or(RenderError::Oversized {
        modules: modules.len(),
    })?;

    let module_width = options.module_width.max(1);
    let scale = options.font_scale.max(1);
    let mut image = GrayImage::from_pixel(layout.width, layout.height, WHITE);

    let x0 = (layout.width - layout.symbol_width) / 2;
    for (i, &bar) in modules.iter().enumerate() {
        if bar {
            let x = x0 + i as u32 * module_width;
            fill_rect(&mut image, x, options.margin, module_width, options.bar_height);
        }
    }

    if let Some(text) = text {
        let mut x = (layout.width - layout.text_width) / 2;
        let y = options.margin + options.bar_height + TEXT_GAP;
        for ch in text.chars() {
            draw_glyph(&mut image, ch, x, y, scale);
            x = x.saturating_add(GLYPH_ADVANCE * scale);
        }
    }

    Ok(image)
}

fn draw_glyph(image: &mut GrayImage, ch: char, x: u32, y: u32, scale: u32) {
    for (col, bits) in font::glyph(ch).iter().enumerate() {
        for row in 0..GLYPH_HEIGHT {
            if (bits >> row) & 1 == 1 {
                fill_rect(image, x + col as u32 * scale, y + row * scale, scale, scale);
            }
        }
    }
}

fn fill_rect(image: &mut GrayImage, x: u32, y: u32, w: u32, h: u32) {
    let x_end = x.saturating_add(w).min(image.width());
    let y_end = y.saturating_add(h).min(image.height());
    for py in y..y_end {
        for px in x..x_end {
            image.put_pixel(px, py, BLACK);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_without_text() {
        let code = Code128::encode("SN001").unwrap();
        let options = RenderOptions::default();
        let image = draw(&code, None, &options).unwrap();

        let expected_width = (code.module_count() as u32 + 2 * options.quiet_zone) * options.module_width;
        assert_eq!(image.width(), expected_width);
        assert_eq!(image.height(), 2 * options.margin + options.bar_height);
    }

    #[test]
    fn test_text_adds_band_below_bars() {
        let code = Code128::encode("SN001").unwrap();
        let options = RenderOptions::default();
        let plain = draw(&code, None, &options).unwrap();
        let labelled = draw(&code, Some("SN001"), &options).unwrap();

        assert_eq!(labelled.width(), plain.width());
        assert_eq!(
            labelled.height(),
            plain.height() + TEXT_GAP + GLYPH_HEIGHT * options.font_scale
        );

        let text_row = options.margin + options.bar_height + TEXT_GAP;
        let inked = (text_row..labelled.height())
            .flat_map(|y| (0..labelled.width()).map(move |x| (x, y)))
            .any(|(x, y)| labelled.get_pixel(x, y) == &BLACK);
        assert!(inked, "text band should contain glyph pixels");
    }

    #[test]
    fn test_quiet_zone_is_white() {
        let code = Code128::encode("1234").unwrap();
        let options = RenderOptions::default();
        let image = draw(&code, None, &options).unwrap();
        let y = options.margin + options.bar_height / 2;

        for x in 0..options.quiet_zone * options.module_width {
            assert_eq!(image.get_pixel(x, y), &WHITE);
        }
        let first_bar = options.quiet_zone * options.module_width;
        assert_eq!(image.get_pixel(first_bar, y), &BLACK);
    }

    #[test]
    fn test_oversized_layout_is_rejected() {
        let code = Code128::encode("SN001").unwrap();

        let wide = RenderOptions {
            module_width: u32::MAX / 50,
            ..RenderOptions::default()
        };
        assert!(matches!(
            draw(&code, Some("SN001"), &wide),
            Err(RenderError::Oversized { .. })
        ));

        let tall = RenderOptions {
            bar_height: u32::MAX,
            margin: u32::MAX,
            ..RenderOptions::default()
        };
        assert!(matches!(
            draw(&code, None, &tall),
            Err(RenderError::Oversized { .. })
        ));

        let big_font = RenderOptions {
            font_scale: u32::MAX,
            ..RenderOptions::default()
        };
        assert!(draw(&code, Some("SN001"), &big_font).is_err());
    }
}
