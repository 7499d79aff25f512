// src/report.rs

use chrono::NaiveDate;
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerIndex,
    PdfLayerReference, PdfPageIndex, Point,
};
use thiserror::Error;
use tracing::debug;

use crate::attendance::{AttendanceLine, AttendanceSummary};

// Official unit letterhead. These strings identify the unit on every report
// and must be reproduced verbatim, diacritics included.
pub const UNIT_COMMAND: &str = "COMANDO DA AERONÁUTICA";
pub const UNIT_NAME: &str = "ESQUADRÃO DE APOIO OPERACIONAL";
pub const UNIT_MOTTO: &str = "\"SEMPRE ALERTA\"";
pub const REPORT_TITLE: &str = "RELATÓRIO DE CHAMADA DIÁRIA";

const PAGE_WIDTH_MM: f64 = 210.0;
const PAGE_HEIGHT_MM: f64 = 297.0;
const MARGIN_LEFT_MM: f64 = 15.0;
const MARGIN_RIGHT_MM: f64 = 15.0;
const MARGIN_BOTTOM_MM: f64 = 25.0;
const TOP_START_MM: f64 = 282.0;
const ROW_HEIGHT_MM: f64 = 5.5;

const COL_NAME_MM: f64 = MARGIN_LEFT_MM;
const COL_STATUS_MM: f64 = 112.0;
const COL_OBSERVATION_MM: f64 = 148.0;

// Points-to-millimetres conversion for the width heuristic below.
const PT_TO_MM: f64 = 0.3528;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

/// Attachment name for a generated report, e.g.
/// `chamada_2024-01-10_alvorada.pdf`.
pub fn report_file_name(date: NaiveDate, call_type: Option<&str>) -> String {
    match call_type.map(sanitize_label).filter(|label| !label.is_empty()) {
        Some(label) => format!("chamada_{}_{}.pdf", date.format("%Y-%m-%d"), label),
        None => format!("chamada_{}.pdf", date.format("%Y-%m-%d")),
    }
}

fn sanitize_label(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

// Rough width estimate for Helvetica at the given size; good enough to
// centre letterhead lines without embedding font metrics.
fn centered_x(text: &str, font_size: f64) -> Mm {
    let width_mm = text.chars().count() as f64 * font_size * 0.5 * PT_TO_MM;
    let x = (PAGE_WIDTH_MM - width_mm) / 2.0;
    Mm(x.max(MARGIN_LEFT_MM) as f32)
}

struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: &'a IndirectFontRef,
    bold: &'a IndirectFontRef,
    y: f64,
}

impl<'a> PageWriter<'a> {
    fn new(
        doc: &'a PdfDocumentReference,
        page: PdfPageIndex,
        layer: PdfLayerIndex,
        regular: &'a IndirectFontRef,
        bold: &'a IndirectFontRef,
    ) -> Self {
        Self {
            doc,
            layer: doc.get_page(page).get_layer(layer),
            regular,
            bold,
            y: TOP_START_MM,
        }
    }

    fn text(&self, text: &str, size: f64, x: Mm, bold: bool) {
        let font = if bold { self.bold } else { self.regular };
        self.layer.use_text(text, size as f32, x, Mm(self.y as f32), font);
    }

    fn centered(&mut self, text: &str, size: f64, bold: bool, advance: f64) {
        self.text(text, size, centered_x(text, size), bold);
        self.y -= advance;
    }

    fn rule(&mut self, advance: f64) {
        let line = Line {
            points: vec![
                (Point::new(Mm(MARGIN_LEFT_MM as f32), Mm(self.y as f32)), false),
                (
                    Point::new(Mm((PAGE_WIDTH_MM - MARGIN_RIGHT_MM) as f32), Mm(self.y as f32)),
                    false,
                ),
            ],
            is_closed: false,
        };
        self.layer.set_outline_thickness(0.6);
        self.layer.add_line(line);
        self.y -= advance;
    }

    fn table_header(&mut self) {
        self.text("POSTO/NOME", 9.5, Mm(COL_NAME_MM as f32), true);
        self.text("SITUAÇÃO", 9.5, Mm(COL_STATUS_MM as f32), true);
        self.text("OBSERVAÇÃO", 9.5, Mm(COL_OBSERVATION_MM as f32), true);
        self.y -= 2.5;
        self.rule(ROW_HEIGHT_MM - 1.0);
    }

    /// Starts a fresh page and repeats the table header on it.
    fn break_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM as f32), Mm(PAGE_HEIGHT_MM as f32), "Camada 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = TOP_START_MM;
        self.table_header();
    }

    fn ensure_room(&mut self, needed: f64) {
        if self.y - needed < MARGIN_BOTTOM_MM {
            self.break_page();
        }
    }
}

/// Renders the fixed-layout attendance report: letterhead, one table row per
/// roster member, and the summary tallies. With no lines the table renders
/// headers only and the summary still shows its zero counts.
pub fn render_attendance_pdf(
    lines: &[AttendanceLine],
    summary: &AttendanceSummary,
    call_type_label: &str,
    date: NaiveDate,
) -> Result<Vec<u8>, ReportError> {
    debug!(
        "Rendering attendance report for {} ({} lines)",
        date,
        lines.len()
    );
    let (doc, page, layer) = PdfDocument::new(
        REPORT_TITLE,
        Mm(PAGE_WIDTH_MM as f32),
        Mm(PAGE_HEIGHT_MM as f32),
        "Camada 1",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Pdf(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::Pdf(e.to_string()))?;

    let mut writer = PageWriter::new(&doc, page, layer, &regular, &bold);

    // Letterhead block.
    writer.centered(UNIT_COMMAND, 12.0, true, 6.0);
    writer.centered(UNIT_NAME, 11.0, true, 5.5);
    writer.centered(UNIT_MOTTO, 10.0, false, 9.0);
    writer.centered(REPORT_TITLE, 13.0, true, 6.5);
    let subtitle = format!(
        "DATA: {}   CHAMADA: {}",
        date.format("%d/%m/%Y"),
        call_type_label
    );
    writer.centered(&subtitle, 10.0, false, 9.0);

    // Table section.
    writer.table_header();
    for line in lines {
        writer.ensure_room(ROW_HEIGHT_MM);
        let who = truncate(&format!("{} {}", line.rank.code(), line.name), 52);
        writer.text(&who, 9.0, Mm(COL_NAME_MM as f32), false);
        writer.text(&line.status, 9.0, Mm(COL_STATUS_MM as f32), false);
        let observation = truncate(&line.observation, 30);
        writer.text(&observation, 9.0, Mm(COL_OBSERVATION_MM as f32), false);
        writer.y -= ROW_HEIGHT_MM;
    }

    // Summary block.
    writer.ensure_room(6.0 * ROW_HEIGHT_MM + 8.0);
    writer.y -= 2.0;
    writer.rule(ROW_HEIGHT_MM);
    let tallies = [
        format!("EFETIVO: {}", summary.total),
        format!("PRESENTES: {}", summary.present),
        format!("AUSENTES: {}", summary.absent),
        format!("JUSTIFICADOS: {}", summary.justified),
        format!("PERCENTUAL DE PRESENÇA: {}%", summary.percentage),
    ];
    for tally in &tallies {
        writer.text(tally, 10.0, Mm(COL_NAME_MM as f32), true);
        writer.y -= ROW_HEIGHT_MM;
    }

    doc.save_to_bytes().map_err(|e| ReportError::Pdf(e.to_string()))
}
