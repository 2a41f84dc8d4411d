//! Per-applicant PDF records: one line per payload field, paginated on a
//! fixed line height, with an optional photo decoded from an inline
//! `<header>,<base64>` string and placed top-right.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::{Map, Value};
use tracing::warn;

use crate::intake::normalize::display_value;
use crate::intake::schema::PHOTO_FIELD;

// A4 in points.
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;

const LEFT_MARGIN: f32 = 50.0;
const TOP_CURSOR: f32 = 800.0;
const BOTTOM_MARGIN: f32 = 50.0;
const LINE_HEIGHT: f32 = 18.0;
const FONT_SIZE: f32 = 11.0;
const MAX_VALUE_CHARS: usize = 95;

const PHOTO_X: f32 = 430.0;
const PHOTO_Y: f32 = 650.0;
const PHOTO_WIDTH: f32 = 120.0;
const PHOTO_HEIGHT: f32 = 150.0;

/// Finalized document plus the facts callers assert on.
#[derive(Debug)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub pages: usize,
    pub embedded_photo: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("failed to assemble document: {0}")]
    Document(#[from] lopdf::Error),
    #[error("failed to write document: {0}")]
    Io(#[from] std::io::Error),
}

/// Output filename derived from the registration identifier and the
/// whitespace-stripped applicant name.
pub fn pdf_filename(registration: &str, name: &str) -> String {
    let name = name.split_whitespace().collect::<Vec<_>>().join("_");
    format!("{registration}_{name}.pdf")
}

/// Render a payload into a paginated document.
///
/// Iterates the raw payload (not the schema), skipping the photo field in the
/// text block. A malformed photo is logged and skipped; the document is still
/// produced.
pub fn render(payload: &Map<String, Value>) -> Result<RenderedPdf, PdfError> {
    let mut composer = TextComposer::new();
    for (key, value) in payload {
        if key == PHOTO_FIELD {
            continue;
        }
        let value: String = display_value(value).chars().take(MAX_VALUE_CHARS).collect();
        composer.write_line(&format!("{key}: {value}"));
    }
    let pages = composer.finish();

    let photo = payload
        .get(PHOTO_FIELD)
        .and_then(Value::as_str)
        .and_then(decode_photo);
    let embedded_photo = photo.is_some();

    let bytes = assemble(pages, photo)?;
    let rendered = RenderedPdf {
        pages: page_count(&bytes)?,
        bytes,
        embedded_photo,
    };
    Ok(rendered)
}

fn page_count(bytes: &[u8]) -> Result<usize, PdfError> {
    Ok(Document::load_mem(bytes)?.get_pages().len())
}

/// Descending text cursor with the pagination rule: a fixed line height per
/// field, and a page break whenever the cursor falls below the bottom margin.
struct TextComposer {
    completed: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    cursor: f32,
}

impl TextComposer {
    fn new() -> Self {
        Self {
            completed: Vec::new(),
            current: Vec::new(),
            cursor: TOP_CURSOR,
        }
    }

    fn write_line(&mut self, text: &str) {
        if self.cursor < BOTTOM_MARGIN {
            self.completed.push(std::mem::take(&mut self.current));
            self.cursor = TOP_CURSOR;
        }

        self.current.push(Operation::new("BT", vec![]));
        self.current
            .push(Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]));
        self.current.push(Operation::new(
            "Td",
            vec![LEFT_MARGIN.into(), self.cursor.into()],
        ));
        self.current
            .push(Operation::new("Tj", vec![Object::string_literal(text)]));
        self.current.push(Operation::new("ET", vec![]));

        self.cursor -= LINE_HEIGHT;
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.completed.push(self.current);
        self.completed
    }
}

struct PhotoImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Decode an inline `<header>,<base64>` image to raw RGB pixels. Every
/// failure path is recovered: log it and render without the photo, since a
/// lost photo must never block the textual record.
fn decode_photo(data: &str) -> Option<PhotoImage> {
    let Some((_, encoded)) = data.split_once(',') else {
        warn!("photo value has no data-uri header, rendering without photo");
        return None;
    };

    let bytes = match BASE64.decode(encoded.trim()) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(%err, "photo base64 payload undecodable, rendering without photo");
            return None;
        }
    };

    let decoded = match image::load_from_memory(&bytes) {
        Ok(image) => image,
        Err(err) => {
            warn!(%err, "photo bytes are not a decodable raster image, rendering without photo");
            return None;
        }
    };

    let rgb = decoded.to_rgb8();
    Some(PhotoImage {
        width: rgb.width(),
        height: rgb.height(),
        data: rgb.into_raw(),
    })
}

fn assemble(pages: Vec<Vec<Operation>>, photo: Option<PhotoImage>) -> Result<Vec<u8>, PdfError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let mut resources = dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    };

    let photo_ops = photo.map(|image| {
        let xobject = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            image.data,
        );
        let xobject_id = doc.add_object(xobject);
        resources.set("XObject", dictionary! { "Im1" => xobject_id });

        vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    PHOTO_WIDTH.into(),
                    0.into(),
                    0.into(),
                    PHOTO_HEIGHT.into(),
                    PHOTO_X.into(),
                    PHOTO_Y.into(),
                ],
            ),
            Operation::new("Do", vec!["Im1".into()]),
            Operation::new("Q", vec![]),
        ]
    });
    let resources_id = doc.add_object(resources);

    let mut kids: Vec<Object> = Vec::new();
    for (index, mut operations) in pages.into_iter().enumerate() {
        // The photo sits at a fixed position on the first page.
        if index == 0 {
            if let Some(ops) = &photo_ops {
                operations.extend(ops.iter().cloned());
            }
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_total = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_total,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
