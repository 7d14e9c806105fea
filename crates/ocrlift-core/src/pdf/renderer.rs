//! Page rasterization for scanned PDFs using lopdf.
//!
//! A page is rendered from the raster image it carries: the largest image
//! XObject in the page resources is decoded and resampled to the page
//! viewport (MediaBox in points times the scale factor). Pages made only of
//! vector text have nothing to rasterize; their embedded text is read back
//! instead through [`PdfDocument::page_text`].

use std::collections::BTreeSet;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgba};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{PdfDocument, PdfRenderer, Result};
use crate::error::PdfError;

/// Largest width or height a rendered page may have, in pixels.
pub const MAX_RENDER_DIMENSION: u32 = 10_000;

/// Loads PDFs with lopdf.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfRenderer;

impl LopdfRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl PdfRenderer for LopdfRenderer {
    type Document = LopdfDocument;

    fn load(&self, data: &[u8]) -> Result<LopdfDocument> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Load(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        let document = LopdfDocument { document: doc };
        debug!("Loaded PDF with {} pages", document.page_count());
        Ok(document)
    }
}

/// A PDF loaded by [`LopdfRenderer`].
pub struct LopdfDocument {
    document: Document,
}

impl LopdfDocument {
    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.document
            .get_pages()
            .get(&page)
            .copied()
            .ok_or(PdfError::InvalidPage(page))
    }

    /// Decode every raster image XObject the page references.
    fn page_images(&self, page_id: ObjectId) -> Vec<DynamicImage> {
        let doc = &self.document;
        let mut images = Vec::new();

        let Some(Object::Dictionary(resources)) = self.page_attribute(page_id, b"Resources") else {
            return images;
        };

        if let Ok(xobjects) = resources.get(b"XObject") {
            if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
                for (name, obj_ref) in xobj_dict.iter() {
                    if let Ok((_, obj)) = doc.dereference(obj_ref) {
                        match decode_image_object(doc, obj) {
                            Some(img) => images.push(img),
                            None => trace!(
                                "Skipping XObject {} on page",
                                String::from_utf8_lossy(name)
                            ),
                        }
                    }
                }
            }
        }

        images
    }

    /// Look up a page attribute, following the page tree for inherited values.
    /// A `/Parent` chain that loops back on itself yields `None`.
    fn page_attribute(&self, page_id: ObjectId, key: &[u8]) -> Option<Object> {
        let doc = &self.document;
        let mut visited = BTreeSet::new();
        let mut node_id = page_id;

        while visited.insert(node_id) {
            let Ok(Object::Dictionary(dict)) = doc.get_object(node_id) else {
                return None;
            };

            if let Ok(value) = dict.get(key) {
                if let Ok((_, resolved)) = doc.dereference(value) {
                    return Some(resolved.clone());
                }
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => node_id = *parent_id,
                _ => return None,
            }
        }

        debug!("Page tree cycle at object {:?}", node_id);
        None
    }

    /// Page size in points from the MediaBox.
    fn page_size(&self, page_id: ObjectId) -> Option<(f32, f32)> {
        let Some(Object::Array(media_box)) = self.page_attribute(page_id, b"MediaBox") else {
            return None;
        };
        if media_box.len() != 4 {
            return None;
        }

        let mut coords = [0.0f32; 4];
        for (slot, value) in coords.iter_mut().zip(media_box.iter()) {
            *slot = number(&self.document, value)?;
        }

        let width = (coords[2] - coords[0]).abs();
        let height = (coords[3] - coords[1]).abs();
        (width > 0.0 && height > 0.0).then_some((width, height))
    }
}

impl PdfDocument for LopdfDocument {
    fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    fn render_page(&self, page: u32, scale: f32) -> Result<DynamicImage> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(PdfError::Render {
                page,
                reason: format!("invalid scale {}", scale),
            });
        }

        let page_id = self.page_id(page)?;

        let image = self
            .page_images(page_id)
            .into_iter()
            .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()))
            .ok_or(PdfError::NoRasterContent(page))?;

        let (base_w, base_h) = self
            .page_size(page_id)
            .unwrap_or((image.width() as f32, image.height() as f32));

        let width = (base_w * scale).round().max(1.0);
        let height = (base_h * scale).round().max(1.0);
        if width > MAX_RENDER_DIMENSION as f32 || height > MAX_RENDER_DIMENSION as f32 {
            return Err(PdfError::Render {
                page,
                reason: format!("viewport {}x{} is too large", width, height),
            });
        }
        let (width, height) = (width as u32, height as u32);

        debug!(
            "Rendering page {} from {}x{} image to {}x{} (scale {})",
            page,
            image.width(),
            image.height(),
            width,
            height,
            scale
        );

        if image.dimensions() == (width, height) {
            Ok(image)
        } else {
            Ok(image.resize_exact(width, height, FilterType::Triangle))
        }
    }

    fn page_text(&self, page: u32) -> Result<Option<String>> {
        self.page_id(page)?;

        let text = match self.document.extract_text(&[page]) {
            Ok(text) => text,
            Err(e) => {
                debug!("No readable text on page {}: {}", page, e);
                return Ok(None);
            }
        };

        let text = text.trim_end();
        Ok((!text.trim_start().is_empty()).then(|| text.to_string()))
    }
}

fn number(doc: &Document, obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        Object::Reference(id) => number(doc, doc.get_object(*id).ok()?),
        _ => None,
    }
}

fn decode_image_object(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict: &Dictionary = &stream.dict;

    // Check if it's an image XObject
    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;

    trace!("Found image object: {}x{}", width, height);

    if let Ok(filter) = dict.get(b"Filter") {
        let filter_name = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) if !arr.is_empty() => arr.first().and_then(|o| o.as_name().ok()),
            _ => None,
        };

        match filter_name {
            Some(b"DCTDecode") => {
                // JPEG data - use raw stream content (already compressed)
                return image::load_from_memory_with_format(
                    &stream.content,
                    image::ImageFormat::Jpeg,
                )
                .ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Unsupported image filter");
                return None;
            }
            _ => {}
        }
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);

    image_from_raw(&data, width, height, color_space, bits)
}

fn image_from_raw(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: i64,
) -> Option<DynamicImage> {
    if bits_per_component != 8 {
        trace!("Unsupported bits per component: {}", bits_per_component);
        return None;
    }

    let pixels = (width as usize).checked_mul(height as usize)?;
    let channels = match color_space {
        b"DeviceRGB" | b"RGB" => 3,
        b"DeviceGray" | b"G" => 1,
        _ => return None,
    };
    let expected = pixels.checked_mul(channels)?;
    if data.len() < expected {
        trace!("Image data too short: {} < {}", data.len(), expected);
        return None;
    }

    let mut rgba = Vec::with_capacity(pixels * 4);
    for chunk in data[..expected].chunks(channels) {
        match chunk {
            [r, g, b] => rgba.extend_from_slice(&[*r, *g, *b, 255]),
            [gray] => rgba.extend_from_slice(&[*gray, *gray, *gray, 255]),
            _ => return None,
        }
    }

    ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};
    use pretty_assertions::assert_eq;

    /// Build a PDF whose pages are `(media_box, Some((width, height, gray)))`
    /// for a page carrying a gray image, or `None` for a page without images.
    pub(crate) fn build_pdf(pages: &[([i64; 4], Option<(u32, u32, u8)>)]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();

        for (media_box, image) in pages {
            let resources = match image {
                Some((w, h, gray)) => {
                    let data = vec![*gray; (*w * *h) as usize];
                    let image_id = doc.add_object(Stream::new(
                        dictionary! {
                            "Type" => "XObject",
                            "Subtype" => "Image",
                            "Width" => *w as i64,
                            "Height" => *h as i64,
                            "ColorSpace" => "DeviceGray",
                            "BitsPerComponent" => 8i64,
                        },
                        data,
                    ));
                    dictionary! { "XObject" => dictionary! { "Im0" => image_id } }
                }
                None => dictionary! {},
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources,
                "MediaBox" => media_box.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
            });
            kids.push(Object::Reference(page_id));
        }

        save_with_pages(doc, pages_id, kids)
    }

    /// Build a PDF with one text-only page per entry, drawn in Helvetica.
    pub(crate) fn build_text_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let mut kids = Vec::new();

        for text in pages {
            let content = format!("BT /F1 12 Tf 72 700 Td ({}) Tj ET", text);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
                "MediaBox" => [0, 0, 612, 792].map(Object::Integer).to_vec(),
            });
            kids.push(Object::Reference(page_id));
        }

        save_with_pages(doc, pages_id, kids)
    }

    fn save_with_pages(mut doc: Document, pages_id: ObjectId, kids: Vec<Object>) -> Vec<u8> {
        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut data = Vec::new();
        doc.save_to(&mut data).unwrap();
        data
    }

    /// A single page whose `/Parent` points back at the page itself.
    fn self_parented_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => page_id,
                "Contents" => content_id,
                "MediaBox" => [0, 0, 20, 10].map(Object::Integer).to_vec(),
            }),
        );

        save_with_pages(doc, pages_id, vec![Object::Reference(page_id)])
    }

    #[test]
    fn test_load_corrupt_pdf() {
        let result = LopdfRenderer::new().load(b"definitely not a pdf");
        assert!(matches!(result, Err(PdfError::Load(_))));
    }

    #[test]
    fn test_page_count() {
        let data = build_pdf(&[
            ([0, 0, 20, 10], Some((4, 2, 0))),
            ([0, 0, 20, 10], None),
            ([0, 0, 20, 10], Some((4, 2, 255))),
        ]);
        let doc = LopdfRenderer::new().load(&data).unwrap();
        assert_eq!(doc.page_count(), 3);
    }

    #[test]
    fn test_render_to_viewport() {
        let data = build_pdf(&[([0, 0, 20, 10], Some((4, 2, 128)))]);
        let doc = LopdfRenderer::new().load(&data).unwrap();

        let image = doc.render_page(1, 1.5).unwrap();
        assert_eq!(image.dimensions(), (30, 15));
        assert_eq!(image.to_rgba8().get_pixel(0, 0).0, [128, 128, 128, 255]);

        let image = doc.render_page(1, 1.0).unwrap();
        assert_eq!(image.dimensions(), (20, 10));
    }

    #[test]
    fn test_page_without_images_fails() {
        let data = build_pdf(&[([0, 0, 20, 10], None)]);
        let doc = LopdfRenderer::new().load(&data).unwrap();
        assert!(matches!(
            doc.render_page(1, 1.5),
            Err(PdfError::NoRasterContent(1))
        ));
        assert_eq!(doc.page_text(1).unwrap(), None);
    }

    #[test]
    fn test_text_only_page_yields_embedded_text() {
        let data = build_text_pdf(&["Release notes", "Breaking changes: none"]);
        let doc = LopdfRenderer::new().load(&data).unwrap();

        assert_eq!(doc.page_count(), 2);
        assert!(matches!(
            doc.render_page(2, 1.5),
            Err(PdfError::NoRasterContent(2))
        ));
        assert_eq!(
            doc.page_text(2).unwrap().as_deref(),
            Some("Breaking changes: none")
        );
        assert!(matches!(doc.page_text(3), Err(PdfError::InvalidPage(3))));
    }

    #[test]
    fn test_parent_cycle_does_not_recurse_forever() {
        let data = self_parented_pdf();
        let doc = LopdfRenderer::new().load(&data).unwrap();

        assert_eq!(doc.page_count(), 1);
        assert!(matches!(
            doc.render_page(1, 1.5),
            Err(PdfError::NoRasterContent(1))
        ));
        assert_eq!(doc.page_text(1).unwrap(), None);
    }

    #[test]
    fn test_invalid_page_and_scale() {
        let data = build_pdf(&[([0, 0, 20, 10], Some((4, 2, 0)))]);
        let doc = LopdfRenderer::new().load(&data).unwrap();
        assert!(matches!(doc.render_page(0, 1.5), Err(PdfError::InvalidPage(0))));
        assert!(matches!(doc.render_page(2, 1.5), Err(PdfError::InvalidPage(2))));
        assert!(matches!(doc.render_page(1, 0.0), Err(PdfError::Render { .. })));
    }

    #[test]
    fn test_raw_image_decoding() {
        let rgb = image_from_raw(&[255, 0, 0, 0, 255, 0], 2, 1, b"DeviceRGB", 8).unwrap();
        assert_eq!(rgb.to_rgba8().get_pixel(1, 0).0, [0, 255, 0, 255]);

        assert!(image_from_raw(&[1, 2], 2, 2, b"DeviceGray", 8).is_none());
        assert!(image_from_raw(&[1, 2, 3, 4], 2, 2, b"DeviceGray", 1).is_none());
        assert!(image_from_raw(&[1, 2, 3, 4], 2, 2, b"DeviceCMYK", 8).is_none());
    }
}
