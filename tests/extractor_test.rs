//! Extraction tests over the mock backend and over real lopdf documents.

mod common;

use common::*;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document as LopdfDocument, Object, Stream};
use pdf2epub::layout::{resolve_page, LayoutConfig};
use pdf2epub::model::{FontWeight, ImageEncoding, PageStream};
use pdf2epub::parser::{
    ContentOp, Extractor, GlyphWidths, LopdfBackend, PageSelection, ParseOptions, PdfBackend,
    PdfValue, ResourceScope,
};
use pdf2epub::{convert_bytes, ConvertOptions};

fn extract(backend: &MockBackend) -> Vec<PageStream> {
    let options = ParseOptions::default();
    Extractor::new(backend, &options).extract_all().unwrap()
}

#[test]
fn test_text_fragment_geometry() {
    let backend = MockBackend::new().page(text("F2", 20.0, 100.0, 700.0, "Title"));
    let pages = extract(&backend);
    let fragment = &pages[0].fragments[0];
    let content = fragment.as_text().unwrap();

    assert_eq!(content.text, "Title");
    assert_eq!(content.font_name, "Helvetica-Bold");
    assert_eq!(content.weight, FontWeight::Bold);
    assert!((content.font_size - 20.0).abs() < 1e-4);
    assert_eq!(fragment.page(), 1);
    // Top-left origin: baseline 700 plus ascent lands 76pt below the top
    assert!((fragment.bbox.left() - 100.0).abs() < 1e-3);
    assert!((fragment.bbox.top() - 76.0).abs() < 1e-3);
    assert!((fragment.bbox.height - 20.0).abs() < 1e-3);
}

#[test]
fn test_tj_kerning_inserts_word_space() {
    let backend = MockBackend::new().page(vec![
        ContentOp::new("BT", vec![]),
        ContentOp::new(
            "Tf",
            vec![PdfValue::Name(b"F1".to_vec()), PdfValue::Real(12.0)],
        ),
        ContentOp::new("Td", vec![PdfValue::Real(72.0), PdfValue::Real(700.0)]),
        ContentOp::new(
            "TJ",
            vec![PdfValue::Array(vec![
                PdfValue::Str(b"Hello".to_vec()),
                PdfValue::Integer(-300),
                PdfValue::Str(b"World".to_vec()),
                PdfValue::Integer(-20),
                PdfValue::Str(b"!".to_vec()),
            ])],
        ),
        ContentOp::new("ET", vec![]),
    ]);

    let pages = extract(&backend);
    assert_eq!(pages[0].fragments[0].text_str(), "Hello World!");
}

#[test]
fn test_next_line_operators() {
    let backend = MockBackend::new().page(vec![
        ContentOp::new("BT", vec![]),
        ContentOp::new(
            "Tf",
            vec![PdfValue::Name(b"F1".to_vec()), PdfValue::Real(10.0)],
        ),
        ContentOp::new("TL", vec![PdfValue::Real(14.0)]),
        ContentOp::new("Td", vec![PdfValue::Real(72.0), PdfValue::Real(700.0)]),
        ContentOp::new("Tj", vec![PdfValue::Str(b"first".to_vec())]),
        ContentOp::new("'", vec![PdfValue::Str(b"second".to_vec())]),
        ContentOp::new("T*", vec![]),
        ContentOp::new("Tj", vec![PdfValue::Str(b"third".to_vec())]),
        ContentOp::new("ET", vec![]),
    ]);

    let pages = extract(&backend);
    let tops: Vec<f32> = pages[0].fragments.iter().map(|f| f.bbox.top()).collect();

    assert_eq!(pages[0].fragments.len(), 3);
    assert!((tops[1] - tops[0] - 14.0).abs() < 1e-3);
    assert!((tops[2] - tops[1] - 14.0).abs() < 1e-3);
}

fn ordered_texts(backend: &MockBackend) -> Vec<String> {
    let config = LayoutConfig::default();
    extract(backend)
        .into_iter()
        .flat_map(|page| resolve_page(page, &config).fragments)
        .map(|f| f.text_str().to_string())
        .collect()
}

#[test]
fn test_run_width_follows_font_widths() {
    let backend = MockBackend::new()
        .font_widths("F1", GlyphWidths::simple(b'a' as u32, &[600.0; 26], None))
        .page(text("F1", 10.0, 72.0, 700.0, "abc"));
    let pages = extract(&backend);
    assert!((pages[0].fragments[0].bbox.width - 18.0).abs() < 1e-3);
}

#[test]
fn test_split_cjk_lines_read_line_by_line() {
    let mut parts = Vec::new();
    for n in 0..4 {
        let y = 700.0 - 15.0 * n as f32;
        parts.push(text("F1", 12.0, 72.0, y, &format!("日本語の文章{}です", n)));
        parts.push(text("F1", 12.0, 168.0, y, &format!("続き{}の文", n)));
    }
    let backend = MockBackend::new().page(ops(parts));

    let pages = extract(&backend);
    // Nine glyphs, eight of them full width
    assert!((pages[0].fragments[0].bbox.width - 102.0).abs() < 1e-3);
    assert_eq!(
        ordered_texts(&backend),
        vec![
            "日本語の文章0です", "続き0の文",
            "日本語の文章1です", "続き1の文",
            "日本語の文章2です", "続き2の文",
            "日本語の文章3です", "続き3の文",
        ]
    );
}

#[test]
fn test_wide_latin_glyphs_do_not_open_gutters() {
    let mut parts = Vec::new();
    for n in 0..4 {
        let y = 700.0 - 15.0 * n as f32;
        parts.push(text("F1", 12.0, 72.0, y, "MMMMMMMMMM"));
        parts.push(text("F1", 12.0, 176.0, y, &format!("tail {}", n)));
    }
    let mut widths = vec![500.0; 95];
    widths[(b'M' - 32) as usize] = 833.0;
    let backend = MockBackend::new()
        .font_widths("F1", GlyphWidths::simple(32, &widths, None))
        .page(ops(parts));

    let texts = ordered_texts(&backend);
    assert_eq!(texts[0], "MMMMMMMMMM");
    assert_eq!(texts[1], "tail 0");
    assert_eq!(texts[2], "MMMMMMMMMM");
    assert_eq!(texts[3], "tail 1");
}

#[test]
fn test_ligatures_are_expanded() {
    let backend = MockBackend::new().page(text("F1", 12.0, 72.0, 700.0, "e\u{FB03}cient \u{FB01}x"));
    let pages = extract(&backend);
    assert_eq!(pages[0].fragments[0].text_str(), "efficient fix");
}

#[test]
fn test_image_placement_follows_ctm() {
    let backend = MockBackend::new()
        .image("Im0", rgb_image(1))
        .page(draw("Im0", 50.0, 100.0, 200.0, 150.0));

    let pages = extract(&backend);
    let fragment = &pages[0].fragments[0];
    let image = fragment.as_image().unwrap();

    assert_eq!(image.encoding, ImageEncoding::Raw { components: 3 });
    assert!((fragment.bbox.left() - 50.0).abs() < 1e-3);
    assert!((fragment.bbox.width - 200.0).abs() < 1e-3);
    assert!((fragment.bbox.top() - (792.0 - 250.0)).abs() < 1e-3);
}

#[test]
fn test_images_can_be_skipped() {
    let backend = MockBackend::new()
        .image("Im0", rgb_image(1))
        .page(draw("Im0", 50.0, 100.0, 200.0, 150.0));
    let options = ParseOptions::new().with_images(false);

    let pages = Extractor::new(&backend, &options).extract_all().unwrap();
    assert!(pages[0].fragments.is_empty());
}

#[test]
fn test_self_referencing_form_is_bounded() {
    let form_ops = ops(vec![
        text("F1", 12.0, 72.0, 700.0, "Inside the form"),
        vec![ContentOp::new("Do", vec![PdfValue::Name(b"Fm1".to_vec())])],
    ]);
    let backend = MockBackend::new()
        .form("Fm1", (40, 0), form_ops)
        .page(vec![ContentOp::new("Do", vec![PdfValue::Name(b"Fm1".to_vec())])]);

    let pages = extract(&backend);
    assert_eq!(pages[0].fragments.len(), 1);
    assert_eq!(pages[0].fragments[0].text_str(), "Inside the form");
}

#[test]
fn test_undecodable_text_is_flagged() {
    let backend = MockBackend::new().page(raw_text("F1", 12.0, 72.0, 700.0, &[UNDECODABLE]));
    let pages = extract(&backend);
    let fragment = &pages[0].fragments[0];

    assert!(fragment.is_undecodable());
    assert_eq!(fragment.text_str(), "");
}

#[test]
fn test_blank_page_yields_no_fragments() {
    let backend = MockBackend::new()
        .page(Vec::new())
        .page(text("F1", 12.0, 72.0, 700.0, "   "));
    let pages = extract(&backend);

    assert_eq!(pages.len(), 2);
    assert!(pages.iter().all(|p| p.fragments.is_empty()));
}

#[test]
fn test_fragment_ids_follow_extraction_order() {
    let backend = MockBackend::new().page(ops(vec![
        text("F1", 12.0, 72.0, 600.0, "lower"),
        text("F1", 12.0, 72.0, 700.0, "upper"),
    ]));
    let pages = extract(&backend);
    let seqs: Vec<u32> = pages[0].fragments.iter().map(|f| f.id.seq).collect();
    assert_eq!(seqs, vec![0, 1]);
}

#[test]
fn test_page_selection() {
    let backend = MockBackend::new()
        .page(text("F1", 12.0, 72.0, 700.0, "one"))
        .page(text("F1", 12.0, 72.0, 700.0, "two"))
        .page(text("F1", 12.0, 72.0, 700.0, "three"));
    let options = ParseOptions::new().with_pages(PageSelection::parse("2-3").unwrap());

    let pages = Extractor::new(&backend, &options).extract_all().unwrap();
    let numbers: Vec<u32> = pages.iter().map(|p| p.number).collect();
    assert_eq!(numbers, vec![2, 3]);
}

/// A one-page PDF with a bold heading and a line of body text.
fn lopdf_sample() -> Vec<u8> {
    let mut doc = LopdfDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "FirstChar" => 32,
        "LastChar" => 126,
        "Widths" => vec![Object::Integer(600); 95],
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => bold_id,
            "F2" => regular_id,
        },
    });

    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 760.into()]),
            Operation::new("Tj", vec![Object::string_literal("Getting Started")]),
            Operation::new("ET", vec![]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F2".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal("Body text in a lopdf page.")]),
            Operation::new("ET", vec![]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F2".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 705.into()]),
            Operation::new("Tj", vec![Object::string_literal("A second body line.")]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Lopdf Sample"),
        "Author" => Object::string_literal("Test Author"),
    });
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

#[test]
fn test_lopdf_backend_pages_and_metadata() {
    let backend = LopdfBackend::load_bytes(&lopdf_sample()).unwrap();

    assert_eq!(backend.pages().len(), 1);
    let page_id = backend.pages()[&1];
    assert_eq!(backend.media_box(page_id), [0.0, 0.0, 595.0, 842.0]);

    let widths = backend.glyph_widths(&ResourceScope::page(page_id), b"F2").unwrap();
    assert_eq!(widths.width(b'A' as u32), Some(600.0));
    assert!(backend.glyph_widths(&ResourceScope::page(page_id), b"F1").is_none());

    let metadata = backend.metadata();
    assert_eq!(metadata.title.as_deref(), Some("Lopdf Sample"));
    assert_eq!(metadata.author.as_deref(), Some("Test Author"));
    assert_eq!(metadata.page_count, 1);
}

#[test]
fn test_lopdf_backend_extraction() {
    let backend = LopdfBackend::load_bytes(&lopdf_sample()).unwrap();
    let options = ParseOptions::default();
    let pages = Extractor::new(&backend, &options).extract_all().unwrap();

    let texts: Vec<&str> = pages[0].fragments.iter().map(|f| f.text_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Getting Started",
            "Body text in a lopdf page.",
            "A second body line."
        ]
    );
    let heading = pages[0].fragments[0].as_text().unwrap();
    assert!(heading.is_bold());
    assert!((pages[0].width - 595.0).abs() < 1e-3);
    // 26 Courier glyphs of 600 units at 12pt
    assert!((pages[0].fragments[1].bbox.width - 187.2).abs() < 1e-2);
}

#[test]
fn test_lopdf_document_converts_end_to_end() {
    let (epub, report) = convert_bytes(&lopdf_sample(), &ConvertOptions::default()).unwrap();

    assert!(epub.starts_with(b"PK"));
    assert_eq!(report.title.as_deref(), Some("Lopdf Sample"));
    assert_eq!(report.stats.heading_count, 1);
    assert_eq!(report.stats.paragraph_count, 1);
    assert_eq!(report.chapters.len(), 1);
    assert_eq!(report.chapters[0].title, "Getting Started");
}
