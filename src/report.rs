use crate::error::{Result, VisualizerError};
use crate::store::UploadedDataset;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

// A4 in PDF points
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN_LEFT: i64 = 50;
const FIRST_LINE_Y: i64 = 800;
const BOTTOM_Y: i64 = 50;
const LINE_HEIGHT: i64 = 20;
const FONT_SIZE: i64 = 12;

/// Attachment file name for a dataset report
pub fn report_file_name(id: u64) -> String {
    format!("dataset_{}.pdf", id)
}

/// All lines printed in a dataset report, title first
pub fn report_lines(dataset: &UploadedDataset) -> Vec<String> {
    let mut lines = vec![
        format!("Dataset Report - ID {}", dataset.id),
        format!(
            "Uploaded: {}",
            dataset.uploaded_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        format!(
            "Uploaded by: {}",
            dataset.uploaded_by.as_deref().unwrap_or("unknown")
        ),
        format!("File: {}", dataset.original_name),
        String::new(),
    ];
    lines.extend(dataset.summary.lines());
    lines
}

/// Render a dataset summary as a simple paginated PDF
///
/// One line per summary entry; when a page is full the remaining lines
/// continue on a new A4 page.
///
/// # Arguments
/// * `dataset` - The stored dataset to describe
///
/// # Returns
/// * `Result<Vec<u8>>` - The PDF document bytes
pub fn render_report(dataset: &UploadedDataset) -> Result<Vec<u8>> {
    let lines = report_lines(dataset);
    let lines_per_page = ((FIRST_LINE_Y - BOTTOM_Y) / LINE_HEIGHT + 1) as usize;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for chunk in lines.chunks(lines_per_page) {
        let page_id = add_page(&mut doc, pages_id, chunk)?;
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| VisualizerError::Report(e.to_string()))?;
    Ok(buffer)
}

fn add_page(doc: &mut Document, pages_id: ObjectId, lines: &[String]) -> Result<ObjectId> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
        Operation::new("TL", vec![LINE_HEIGHT.into()]),
        Operation::new("Td", vec![MARGIN_LEFT.into(), FIRST_LINE_Y.into()]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(latin1(line))]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let encoded = content
        .encode()
        .map_err(|e| VisualizerError::Report(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    }))
}

/// Standard Type1 fonts only cover single-byte text
fn latin1(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}
