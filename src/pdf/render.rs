//! Rendering layout blocks into a PDF using lopdf
//!
//! Blocks flow from the top of a zero-margin page downwards. Images are
//! centered horizontally, captions are set in Helvetica-Bold and centered,
//! spacers push the cursor down. A page ends on an explicit page break or
//! when the next block does not fit.

use std::fs;
use std::path::Path;

use chrono::Local;
use image::{ImageFormat, ImageReader};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::layout::{PageDimensions, POINTS_PER_INCH};
use crate::paginate::LayoutBlock;

/// Horizontal space kept free on each side of a caption, in points
const CAPTION_SIDE_MARGIN: f64 = 36.0;

/// Line height as a multiple of the font size
const LINE_SPACING: f64 = 1.2;

/// Average Helvetica-Bold glyph width in em
const AVERAGE_GLYPH_WIDTH: f64 = 0.55;

const PRODUCER: &str = concat!("img-handouts ", env!("CARGO_PKG_VERSION"));

/// Options for rendering a layout into a PDF
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Physical page size
    pub page: PageDimensions,
    /// Caption font size in points
    pub caption_font_size: f32,
    /// Document title stored in the PDF info dictionary
    pub title: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            page: PageDimensions::a4(),
            caption_font_size: 18.0,
            title: None,
        }
    }
}

/// What ended up in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub pages: usize,
    pub images: usize,
}

/// Render `blocks` into a PDF at `output`
///
/// # Example
///
/// ```no_run
/// use img_handouts::paginate::{layout_images, FolderCaptions, ImageEntry};
/// use img_handouts::layout::LayoutPolicy;
/// use img_handouts::pdf::{render_pdf, RenderOptions};
/// use std::path::Path;
///
/// let policy = LayoutPolicy::default();
/// let layout = layout_images(&[ImageEntry::new("a.jpg")], &FolderCaptions::new(), &policy);
/// render_pdf(&layout.blocks, Path::new("out.pdf"), &RenderOptions::default())
///     .expect("Failed to render");
/// ```
pub fn render_pdf(blocks: &[LayoutBlock], output: &Path, options: &RenderOptions) -> Result<RenderSummary> {
    let mut renderer = Renderer::new(options);

    for (i, block) in blocks.iter().enumerate() {
        match block {
            LayoutBlock::Caption(text) => {
                let keep_with = following_image_height(
                    &blocks[i + 1..],
                    renderer.page_width,
                    renderer.page_height,
                );
                renderer.caption(text, keep_with);
            }
            LayoutBlock::Spacer(inches) => renderer.spacer(inches * POINTS_PER_INCH),
            LayoutBlock::ScaledImage { path, width, height } => {
                renderer.image(path, *width, *height)?;
            }
            LayoutBlock::PageBreak => renderer.page_break(),
        }
    }

    renderer.finish(output)
}

/// Height of the spacer and image a caption introduces, so the caption is
/// not left alone at the bottom of a page
fn following_image_height(rest: &[LayoutBlock], page_width: f64, page_height: f64) -> f64 {
    let mut height = 0.0;
    for block in rest {
        match block {
            LayoutBlock::Spacer(inches) => height += inches * POINTS_PER_INCH,
            LayoutBlock::ScaledImage { width, height: h, .. } => {
                return height + fit_page(*width, *h, page_width, page_height).1;
            }
            LayoutBlock::Caption(_) | LayoutBlock::PageBreak => return 0.0,
        }
    }
    0.0
}

/// Scale (width, height) down to fit within the page, keeping the aspect ratio
fn fit_page(width: f64, height: f64, page_width: f64, page_height: f64) -> (f64, f64) {
    let (width, height) = if width > page_width {
        (page_width, height * page_width / width)
    } else {
        (width, height)
    };
    if height > page_height {
        (width * page_height / height, page_height)
    } else {
        (width, height)
    }
}

/// Content and resources of the page being filled
#[derive(Default)]
struct PageContent {
    ops: Vec<u8>,
    images: Vec<(String, ObjectId)>,
    uses_font: bool,
    /// Points consumed from the top of the page
    cursor: f64,
    /// True once a caption or image has been drawn
    has_content: bool,
}

struct Renderer<'a> {
    options: &'a RenderOptions,
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    font_id: Option<ObjectId>,
    current: PageContent,
    page_width: f64,
    page_height: f64,
    image_count: usize,
}

impl<'a> Renderer<'a> {
    fn new(options: &'a RenderOptions) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            options,
            doc,
            pages_id,
            page_ids: Vec::new(),
            font_id: None,
            current: PageContent::default(),
            page_width: options.page.width.pt(),
            page_height: options.page.height.pt(),
            image_count: 0,
        }
    }

    fn remaining(&self) -> f64 {
        self.page_height - self.current.cursor
    }

    fn spacer(&mut self, height: f64) {
        if height > self.remaining() {
            // Spacers never carry over to the next page
            if self.current.has_content {
                self.finish_page();
            }
            return;
        }
        self.current.cursor += height;
    }

    fn page_break(&mut self) {
        if self.current.has_content {
            self.finish_page();
        }
    }

    /// Start a new page if `height` does not fit below the cursor
    fn make_room(&mut self, height: f64) {
        if height > self.remaining() {
            if self.current.has_content {
                self.finish_page();
            }
            if height > self.remaining() {
                // Leading spacers on an empty page give way to the content
                self.current.cursor = 0.0;
            }
        }
    }

    fn image(&mut self, path: &Path, width: f64, height: f64) -> Result<()> {
        if height * (self.page_width / width).min(1.0) > self.page_height {
            warn!("{} is taller than the page; scaling it down", path.display());
        }
        let (width, height) = fit_page(width, height, self.page_width, self.page_height);

        self.make_room(height);

        let xobject_id = embed_image(&mut self.doc, path)?;
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);

        let x = (self.page_width - width) / 2.0;
        let y = self.page_height - self.current.cursor - height;
        let ops = format!(
            "q\n{:.3} 0 0 {:.3} {:.3} {:.3} cm\n/{} Do\nQ\n",
            width, height, x, y, name
        );
        self.current.ops.extend_from_slice(ops.as_bytes());
        self.current.images.push((name, xobject_id));
        self.current.cursor += height;
        self.current.has_content = true;

        debug!("Placed {} at y={:.1} ({:.1}x{:.1} pt)", path.display(), y, width, height);
        Ok(())
    }

    fn caption(&mut self, text: &str, keep_with: f64) {
        let font_size = self.options.caption_font_size as f64;
        let line_height = font_size * LINE_SPACING;
        let max_width = (self.page_width - 2.0 * CAPTION_SIDE_MARGIN).max(font_size);
        let mut lines = wrap_text(text, font_size, max_width);
        let max_lines = (((self.page_height - font_size * 0.5) / line_height).floor() as usize).max(1);
        if lines.len() > max_lines {
            warn!(
                "Caption has {} lines, only the first {} fit on a page",
                lines.len(),
                max_lines
            );
            lines.truncate(max_lines);
        }
        let height = lines.len() as f64 * line_height + font_size * 0.5;

        if height + keep_with <= self.page_height {
            self.make_room(height + keep_with);
        } else {
            self.make_room(height);
        }

        let top = self.page_height - self.current.cursor;
        let mut ops = Vec::new();
        ops.extend_from_slice(b"0 g\n");
        for (i, line) in lines.iter().enumerate() {
            let baseline = top - font_size - i as f64 * line_height;
            let x = ((self.page_width - estimate_text_width(line, font_size)) / 2.0).max(0.0);
            ops.extend_from_slice(b"BT\n");
            ops.extend_from_slice(format!("/F1 {:.1} Tf\n", font_size).as_bytes());
            ops.extend_from_slice(format!("1 0 0 1 {:.3} {:.3} Tm\n", x, baseline).as_bytes());
            ops.push(b'(');
            ops.extend_from_slice(&encode_pdf_string(line));
            ops.extend_from_slice(b") Tj\nET\n");
        }

        self.current.ops.extend_from_slice(&ops);
        self.current.uses_font = true;
        self.current.cursor += height;
        self.current.has_content = true;
    }

    fn font(&mut self) -> ObjectId {
        match self.font_id {
            Some(id) => id,
            None => {
                let id = use_helvetica_bold(&mut self.doc);
                self.font_id = Some(id);
                id
            }
        }
    }

    fn finish_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        if !page.has_content {
            return;
        }

        let mut resources = Dictionary::new();
        if page.uses_font {
            let mut fonts = Dictionary::new();
            fonts.set("F1", Object::Reference(self.font()));
            resources.set("Font", Object::Dictionary(fonts));
        }
        if !page.images.is_empty() {
            let mut xobjects = Dictionary::new();
            for (name, id) in &page.images {
                xobjects.set(name.as_bytes().to_vec(), Object::Reference(*id));
            }
            resources.set("XObject", Object::Dictionary(xobjects));
        }

        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), page.ops));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(self.pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(self.page_width as f32),
                Object::Real(self.page_height as f32),
            ]),
        );
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(resources));

        let page_id = self.doc.add_object(Object::Dictionary(page_dict));
        self.page_ids.push(page_id);
    }

    fn finish(mut self, output: &Path) -> Result<RenderSummary> {
        self.finish_page();

        if self.page_ids.is_empty() {
            return Err(Error::General("Nothing to render".to_string()));
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|&id| Object::Reference(id)).collect();
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(self.page_ids.len() as i64));
        pages.set("Kids", Object::Array(kids));
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.doc.add_object(Object::Dictionary(catalog));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut info_dict = Dictionary::new();
        info_dict.set("Producer", pdf_text_string(PRODUCER));
        info_dict.set(
            "CreationDate",
            Object::String(
                Local::now().format("D:%Y%m%d%H%M%S").to_string().into_bytes(),
                StringFormat::Literal,
            ),
        );
        if let Some(title) = &self.options.title {
            info_dict.set("Title", pdf_text_string(title));
        }
        let info_id = self.doc.add_object(Object::Dictionary(info_dict));
        self.doc.trailer.set("Info", Object::Reference(info_id));

        self.doc.compress();
        self.doc.save(output)?;

        let summary = RenderSummary {
            pages: self.page_ids.len(),
            images: self.image_count,
        };
        info!(
            "Wrote {} ({} pages, {} images)",
            output.display(),
            summary.pages,
            summary.images
        );
        Ok(summary)
    }
}

/// Add an image file as an image XObject
///
/// JPEG files are embedded as they are, with a DCTDecode filter. Other
/// formats are decoded into 8-bit RGB; sources with an alpha channel get a
/// DeviceGray soft mask.
fn embed_image(doc: &mut Document, path: &Path) -> Result<ObjectId> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    if reader.format() == Some(ImageFormat::Jpeg) {
        let data = fs::read(path)?;
        if let Some(id) = embed_jpeg(doc, data) {
            return Ok(id);
        }
        debug!("{} is not an 8-bit gray or RGB JPEG; decoding it", path.display());
    }

    let img = reader.decode()?;
    let (width, height) = (img.width(), img.height());

    if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
        let mut alpha = Vec::with_capacity(width as usize * height as usize);
        for pixel in rgba.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        let smask_id = doc.add_object(Stream::new(image_dict(width, height, b"DeviceGray"), alpha));
        let mut dict = image_dict(width, height, b"DeviceRGB");
        dict.set("SMask", Object::Reference(smask_id));
        Ok(doc.add_object(Stream::new(dict, rgb)))
    } else {
        let rgb = img.to_rgb8().into_raw();
        Ok(doc.add_object(Stream::new(image_dict(width, height, b"DeviceRGB"), rgb)))
    }
}

/// Embed JPEG bytes unchanged
///
/// Returns `None` for frames a DCTDecode image cannot be drawn with directly
/// (CMYK, 12-bit samples, unreadable headers).
fn embed_jpeg(doc: &mut Document, data: Vec<u8>) -> Option<ObjectId> {
    let frame = jpeg_frame(&data).filter(|f| f.bits == 8)?;
    let color_space: &[u8] = match frame.components {
        1 => b"DeviceGray",
        3 => b"DeviceRGB",
        _ => return None,
    };

    let mut dict = image_dict(frame.width, frame.height, color_space);
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    let stream = Stream::new(dict, data).with_compression(false);
    Some(doc.add_object(stream))
}

/// Start-of-frame header of a JPEG file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegFrame {
    width: u32,
    height: u32,
    bits: u8,
    components: u8,
}

/// Find the SOFn segment by walking the marker segments after SOI
fn jpeg_frame(data: &[u8]) -> Option<JpegFrame> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        if marker == 0xFF {
            // Fill byte
            pos += 1;
            continue;
        }
        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        // C4 (DHT), C8 (JPG) and CC (DAC) share the range but are not frames
        if (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            let segment = data.get(pos + 4..pos + 2 + length)?;
            if segment.len() < 6 {
                return None;
            }
            return Some(JpegFrame {
                bits: segment[0],
                height: u16::from_be_bytes([segment[1], segment[2]]) as u32,
                width: u16::from_be_bytes([segment[3], segment[4]]) as u32,
                components: segment[5],
            });
        }
        pos += 2 + length;
    }
    None
}

fn image_dict(width: u32, height: u32, color_space: &[u8]) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict
}

/// Use Helvetica-Bold (standard PDF font - nothing to embed)
fn use_helvetica_bold(doc: &mut Document) -> ObjectId {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica-Bold".to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    doc.add_object(Object::Dictionary(font))
}

/// Break caption text into lines that fit `max_width`
///
/// Explicit newlines are kept; words longer than a line get a line of
/// their own.
fn wrap_text(text: &str, font_size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", line, word)
            };
            if !line.is_empty() && estimate_text_width(&candidate, font_size) > max_width {
                lines.push(std::mem::replace(&mut line, word.to_string()));
            } else {
                line = candidate;
            }
        }
        lines.push(line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Estimate text width for Helvetica-Bold
fn estimate_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * AVERAGE_GLYPH_WIDTH
}

/// Encode text for a WinAnsi literal string, escaping delimiters
///
/// Characters outside Latin-1 become `?`.
fn encode_pdf_string(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            ' '..='~' => out.push(c as u8),
            '\u{a0}'..='\u{ff}' => out.push(c as u32 as u8),
            '\t' => out.push(b' '),
            _ => out.push(b'?'),
        }
    }
    out
}

/// PDF text string: literal for ASCII, UTF-16BE with BOM otherwise
fn pdf_text_string(s: &str) -> Object {
    if s.is_ascii() {
        Object::String(s.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in s.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(width, height, Rgb([200, 30, 30])).save(&path).unwrap();
        path
    }

    fn image_block(path: &Path, width: f64, height: f64) -> LayoutBlock {
        LayoutBlock::ScaledImage {
            path: path.to_path_buf(),
            width,
            height,
        }
    }

    #[test]
    fn test_two_images_then_break() {
        let tmp = TempDir::new().unwrap();
        let a = write_png(tmp.path(), "a.png", 40, 20);
        let b = write_png(tmp.path(), "b.png", 40, 20);
        let c = write_png(tmp.path(), "c.png", 40, 20);
        let output = tmp.path().join("out.pdf");

        let blocks = vec![
            LayoutBlock::Caption("Holiday".to_string()),
            LayoutBlock::Spacer(0.45),
            image_block(&a, 483.0, 241.5),
            LayoutBlock::Spacer(0.45),
            LayoutBlock::Spacer(0.45),
            image_block(&b, 483.0, 241.5),
            LayoutBlock::Spacer(0.45),
            LayoutBlock::PageBreak,
            LayoutBlock::Spacer(0.45),
            image_block(&c, 483.0, 241.5),
            LayoutBlock::Spacer(0.45),
        ];

        let summary = render_pdf(&blocks, &output, &RenderOptions::default()).unwrap();
        assert_eq!(summary, RenderSummary { pages: 2, images: 3 });

        let doc = Document::load(&output).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_trailing_page_break_adds_no_page() {
        let tmp = TempDir::new().unwrap();
        let a = write_png(tmp.path(), "a.png", 10, 10);
        let output = tmp.path().join("out.pdf");

        let blocks = vec![
            image_block(&a, 100.0, 100.0),
            LayoutBlock::PageBreak,
            LayoutBlock::PageBreak,
        ];
        let summary = render_pdf(&blocks, &output, &RenderOptions::default()).unwrap();
        assert_eq!(summary.pages, 1);
    }

    #[test]
    fn test_image_that_does_not_fit_moves_to_next_page() {
        let tmp = TempDir::new().unwrap();
        let a = write_png(tmp.path(), "a.png", 10, 10);
        let output = tmp.path().join("out.pdf");

        // Two 500pt tall images cannot share an 842pt page
        let blocks = vec![image_block(&a, 500.0, 500.0), image_block(&a, 500.0, 500.0)];
        let summary = render_pdf(&blocks, &output, &RenderOptions::default()).unwrap();
        assert_eq!(summary.pages, 2);
    }

    #[test]
    fn test_oversized_image_is_scaled_to_page() {
        let tmp = TempDir::new().unwrap();
        let a = write_png(tmp.path(), "tall.png", 1, 10);
        let output = tmp.path().join("out.pdf");

        let blocks = vec![LayoutBlock::Spacer(2.0), image_block(&a, 483.0, 4830.0)];
        let summary = render_pdf(&blocks, &output, &RenderOptions::default()).unwrap();
        assert_eq!(summary.pages, 1);
    }

    #[test]
    fn test_alpha_image_gets_soft_mask() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("alpha.png");
        RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 128])).save(&path).unwrap();

        let mut doc = Document::with_version("1.5");
        let id = embed_image(&mut doc, &path).unwrap();
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        assert!(stream.dict.get(b"SMask").is_ok());
        assert_eq!(stream.content.len(), 4 * 4 * 3);
    }

    #[test]
    fn test_nothing_to_render() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("out.pdf");
        let result = render_pdf(&[LayoutBlock::Spacer(1.0), LayoutBlock::PageBreak], &output, &RenderOptions::default());
        assert!(result.is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_undecodable_image_is_error() {
        let tmp = TempDir::new().unwrap();
        let bad = tmp.path().join("bad.png");
        std::fs::write(&bad, b"not a png").unwrap();
        let output = tmp.path().join("out.pdf");

        let result = render_pdf(&[image_block(&bad, 10.0, 10.0)], &output, &RenderOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_wrap_text() {
        // 10pt at 0.55 em per glyph: 5.5pt per character
        let lines = wrap_text("one two three four", 10.0, 5.5 * 9.0);
        assert_eq!(lines, vec!["one two", "three", "four"]);

        let lines = wrap_text("first\nsecond", 10.0, 1000.0);
        assert_eq!(lines, vec!["first", "second"]);

        let lines = wrap_text("incomprehensibilities", 10.0, 20.0);
        assert_eq!(lines, vec!["incomprehensibilities"]);
    }

    #[test]
    fn test_encode_pdf_string() {
        assert_eq!(encode_pdf_string("a(b)c\\"), b"a\\(b\\)c\\\\".to_vec());
        assert_eq!(encode_pdf_string("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_pdf_string("日"), b"?".to_vec());
    }

    #[test]
    fn test_following_image_height() {
        let blocks = vec![
            LayoutBlock::Spacer(1.0),
            LayoutBlock::ScaledImage {
                path: PathBuf::from("x.png"),
                width: 1000.0,
                height: 500.0,
            },
        ];
        // Spacer 72pt plus the image fitted to a 500pt wide page
        assert_eq!(following_image_height(&blocks, 500.0, 800.0), 72.0 + 250.0);
        assert_eq!(following_image_height(&[LayoutBlock::PageBreak], 500.0, 800.0), 0.0);
    }

    #[test]
    fn test_following_image_height_clamped_to_page() {
        let blocks = vec![
            LayoutBlock::Spacer(1.0),
            LayoutBlock::ScaledImage {
                path: PathBuf::from("tall.png"),
                width: 400.0,
                height: 4000.0,
            },
        ];
        // The image is drawn at most one page tall
        assert_eq!(following_image_height(&blocks, 500.0, 800.0), 72.0 + 800.0);
    }

    #[test]
    fn test_fit_page() {
        assert_eq!(fit_page(100.0, 50.0, 500.0, 800.0), (100.0, 50.0));
        assert_eq!(fit_page(1000.0, 500.0, 500.0, 800.0), (500.0, 250.0));
        assert_eq!(fit_page(400.0, 1600.0, 500.0, 800.0), (200.0, 800.0));
    }

    #[test]
    fn test_caption_taller_than_page_is_cut() {
        let options = RenderOptions::default();
        let mut renderer = Renderer::new(&options);
        let text = vec!["line"; 200].join("\n");

        renderer.caption(&text, 0.0);

        assert!(renderer.current.cursor <= renderer.page_height);
        let shown = renderer.current.ops.windows(7).filter(|w| *w == b"(line) ").count();
        // 18pt font with 1.2 line spacing on an 842pt page
        assert_eq!(shown, 38);
    }

    #[test]
    fn test_jpeg_is_embedded_unchanged() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photo.jpg");
        RgbImage::from_pixel(32, 16, Rgb([10, 120, 200])).save(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();

        let mut doc = Document::with_version("1.5");
        let id = embed_image(&mut doc, &path).unwrap();
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();

        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
        assert_eq!(stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceRGB");
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 32);
        assert_eq!(stream.dict.get(b"Height").unwrap().as_i64().unwrap(), 16);
        assert_eq!(stream.content, bytes);
    }

    #[test]
    fn test_jpeg_survives_save() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photo.jpg");
        GrayImage::from_pixel(20, 20, Luma([90])).save(&path).unwrap();
        let output = tmp.path().join("out.pdf");

        render_pdf(&[image_block(&path, 200.0, 200.0)], &output, &RenderOptions::default()).unwrap();

        let doc = Document::load(&output).unwrap();
        let filters: Vec<Vec<u8>> = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter_map(|s| s.dict.get(b"Filter").ok()?.as_name().ok().map(<[u8]>::to_vec))
            .collect();
        assert!(filters.iter().any(|f| f.as_slice() == b"DCTDecode"));
        let gray = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .any(|s| matches!(s.dict.get(b"ColorSpace"), Ok(Object::Name(n)) if n.as_slice() == b"DeviceGray"));
        assert!(gray);
    }

    #[test]
    fn test_jpeg_frame() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("frame.jpg");
        RgbImage::from_pixel(300, 7, Rgb([1, 2, 3])).save(&path).unwrap();

        let frame = jpeg_frame(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(
            frame,
            JpegFrame {
                width: 300,
                height: 7,
                bits: 8,
                components: 3
            }
        );
        assert_eq!(jpeg_frame(b"\x89PNG\r\n"), None);
        assert_eq!(jpeg_frame(&[0xFF, 0xD8, 0xFF]), None);
    }
}
