//! Raster ink surface and its snapshot codec.
//!
//! A [`Surface`] is one page's ink layer: an RGBA8 pixel buffer that strokes
//! and lasso deletions mutate in place. The rich-text note layer lives
//! elsewhere in the page model, so nothing painted or erased here can touch
//! note content. Snapshots round-trip through PNG data URIs, the same wire
//! format the page model persists.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use kurbo::{Point, Rect, Size};
use thiserror::Error;

/// Default logical page width in pixels.
pub const PAGE_WIDTH: u32 = 1600;
/// Default logical page height in pixels.
pub const PAGE_HEIGHT: u32 = 2000;

const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Surface errors.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("surface height may only grow (current {current}, requested {requested})")]
    ShrinkRejected { current: u32, requested: u32 },
    #[error("surface cannot be resized while a stroke or lasso session is open")]
    SessionActive,
    #[error("snapshot decode failed: {0}")]
    Decode(String),
    #[error("snapshot encode failed: {0}")]
    Encode(String),
}

/// RGBA8 color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Return the same color with its alpha scaled by `factor` (0.0..=1.0).
    pub fn with_alpha_scaled(self, factor: f64) -> Self {
        let a = (f64::from(self.a) * factor.clamp(0.0, 1.0)).round() as u8;
        Self::new(self.r, self.g, self.b, a)
    }
}

/// Paint rule for pixel composition.
///
/// `SourceOver` blends new pixels over existing content (ink);
/// `DestinationOut` destructively removes coverage (erase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    #[default]
    SourceOver,
    DestinationOut,
}

/// An addressable 2D pixel buffer holding one page's ink layer.
///
/// Pixel dimensions are fixed per page except for [`Surface::grow_height`],
/// which may only enlarge the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Surface {
    /// Create a fully transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    /// Create a surface at the default page dimensions.
    pub fn page() -> Self {
        Self::new(PAGE_WIDTH, PAGE_HEIGHT)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel dimensions as a geometric size.
    pub fn pixel_size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    /// Full surface rectangle in pixel coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    /// Read a pixel, or `None` outside the surface.
    pub fn pixel(&self, x: i64, y: i64) -> Option<Rgba> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some(Rgba::new(
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ))
    }

    /// Write a pixel directly, ignoring writes outside the surface.
    pub fn set_pixel(&mut self, x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[i] = color.r;
        self.pixels[i + 1] = color.g;
        self.pixels[i + 2] = color.b;
        self.pixels[i + 3] = color.a;
    }

    /// Composite a source color onto a pixel according to `mode`.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: Rgba, mode: CompositeMode) {
        let Some(dst) = self.pixel(x, y) else { return };
        let src_a = f64::from(color.a) / 255.0;
        let out = match mode {
            CompositeMode::SourceOver => {
                let dst_a = f64::from(dst.a) / 255.0;
                let out_a = src_a + dst_a * (1.0 - src_a);
                if out_a <= 0.0 {
                    Rgba::transparent()
                } else {
                    let blend = |s: u8, d: u8| -> u8 {
                        let s = f64::from(s);
                        let d = f64::from(d);
                        ((s * src_a + d * dst_a * (1.0 - src_a)) / out_a).round() as u8
                    };
                    Rgba::new(
                        blend(color.r, dst.r),
                        blend(color.g, dst.g),
                        blend(color.b, dst.b),
                        (out_a * 255.0).round() as u8,
                    )
                }
            }
            CompositeMode::DestinationOut => {
                let out_a = (f64::from(dst.a) * (1.0 - src_a)).round() as u8;
                Rgba::new(dst.r, dst.g, dst.b, out_a)
            }
        };
        self.set_pixel(x, y, out);
    }

    /// Stamp a filled disc centered at `center`.
    pub fn fill_disc(&mut self, center: Point, radius: f64, color: Rgba, mode: CompositeMode) {
        let r = radius.max(0.0);
        let x0 = (center.x - r).floor() as i64;
        let x1 = (center.x + r).ceil() as i64;
        let y0 = (center.y - r).floor() as i64;
        let y1 = (center.y + r).ceil() as i64;
        let r2 = r * r;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = (x as f64 + 0.5) - center.x;
                let dy = (y as f64 + 0.5) - center.y;
                if dx * dx + dy * dy <= r2 {
                    self.blend_pixel(x, y, color, mode);
                }
            }
        }
    }

    /// Commit one stroke segment with round caps.
    ///
    /// The segment is rendered by stamping discs along its length, so the
    /// result depends only on the endpoints, width, color and mode, and
    /// replaying the same segments reproduces the same pixels.
    pub fn stroke_segment(
        &mut self,
        from: Point,
        to: Point,
        width: f64,
        color: Rgba,
        mode: CompositeMode,
    ) {
        let radius = width / 2.0;
        let dist = from.distance(to);
        let steps = (dist / 0.5).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let p = Point::new(
                from.x + (to.x - from.x) * t,
                from.y + (to.y - from.y) * t,
            );
            self.fill_disc(p, radius, color, mode);
        }
    }

    /// Clear a rectangular region to transparent.
    pub fn clear_rect(&mut self, rect: Rect) {
        let x0 = rect.x0.floor().max(0.0) as i64;
        let y0 = rect.y0.floor().max(0.0) as i64;
        let x1 = (rect.x1.ceil() as i64).min(i64::from(self.width));
        let y1 = (rect.y1.ceil() as i64).min(i64::from(self.height));
        for y in y0..y1 {
            for x in x0..x1 {
                self.set_pixel(x, y, Rgba::transparent());
            }
        }
    }

    /// Clear the whole surface to transparent.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Draw another surface onto this one at an offset, source-over.
    pub fn blit(&mut self, src: &Surface, offset_x: i64, offset_y: i64) {
        for y in 0..i64::from(src.height) {
            for x in 0..i64::from(src.width) {
                // pixel() bounds are respected by blend_pixel on the target
                if let Some(c) = src.pixel(x, y) {
                    if c.a > 0 {
                        self.blend_pixel(x + offset_x, y + offset_y, c, CompositeMode::SourceOver);
                    }
                }
            }
        }
    }

    /// Grow the surface height, preserving existing content.
    ///
    /// Heights only grow, never shrink; shrinking would destructively crop
    /// existing strokes.
    pub fn grow_height(&mut self, new_height: u32) -> Result<(), SurfaceError> {
        if new_height < self.height {
            return Err(SurfaceError::ShrinkRejected {
                current: self.height,
                requested: new_height,
            });
        }
        if new_height == self.height {
            return Ok(());
        }
        let row = self.width as usize * 4;
        self.pixels.resize(row * new_height as usize, 0);
        self.height = new_height;
        Ok(())
    }

    /// Whether the surface holds no visible ink.
    pub fn is_blank(&self) -> bool {
        self.pixels.chunks_exact(4).all(|px| px[3] == 0)
    }

    /// Encode the surface to a PNG data URI, the persisted snapshot format.
    pub fn to_data_uri(&self) -> Result<String, SurfaceError> {
        let mut png_bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut png_bytes, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder
                .write_header()
                .map_err(|e| SurfaceError::Encode(e.to_string()))?;
            writer
                .write_image_data(&self.pixels)
                .map_err(|e| SurfaceError::Encode(e.to_string()))?;
        }
        Ok(format!("{}{}", DATA_URI_PREFIX, BASE64.encode(&png_bytes)))
    }

    /// Decode a surface from a PNG data URI.
    pub fn from_data_uri(uri: &str) -> Result<Self, SurfaceError> {
        let b64 = uri
            .strip_prefix(DATA_URI_PREFIX)
            .ok_or_else(|| SurfaceError::Decode("unsupported data URI scheme".to_string()))?;
        let png_bytes = BASE64
            .decode(b64)
            .map_err(|e| SurfaceError::Decode(e.to_string()))?;
        let decoder = png::Decoder::new(std::io::Cursor::new(png_bytes));
        let mut reader = decoder
            .read_info()
            .map_err(|e| SurfaceError::Decode(e.to_string()))?;
        let mut data = vec![0; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut data)
            .map_err(|e| SurfaceError::Decode(e.to_string()))?;
        if info.color_type != png::ColorType::Rgba || info.bit_depth != png::BitDepth::Eight {
            return Err(SurfaceError::Decode(format!(
                "unexpected pixel format {:?}/{:?}",
                info.color_type, info.bit_depth
            )));
        }
        data.truncate(info.buffer_size());
        Ok(Self {
            width: info.width,
            height: info.height,
            pixels: data,
        })
    }
}
