use anyhow::Result;
use chrono::NaiveDateTime;
use html_escape::encode_text;
use std::fmt::Write;

use crate::models::requisition::Requisition;

/// Snapshot handed to a renderer.
#[derive(Debug, Clone)]
pub struct RequisitionDocument {
    pub requisition: Requisition,
    pub generated_at: NaiveDateTime,
}

impl RequisitionDocument {
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{extension}", self.requisition.number)
    }
}

/// Produces the archived representation of a requisition.
///
/// Output must depend only on the document.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, document: &RequisitionDocument) -> Result<Vec<u8>>;

    fn extension(&self) -> &'static str;
}

/// Self-contained HTML page with a header block and the line table.
pub struct HtmlDocumentRenderer;

impl DocumentRenderer for HtmlDocumentRenderer {
    fn render(&self, document: &RequisitionDocument) -> Result<Vec<u8>> {
        let r = &document.requisition;
        let mut html = String::with_capacity(2048);

        let _ = write!(
            html,
            "<!DOCTYPE html>\n<html lang=\"es\">\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n",
            encode_text(&r.number)
        );
        let _ = writeln!(html, "<h1>Requisicion {}</h1>", encode_text(&r.number));
        html.push_str("<table class=\"header\">\n");

        let rows: [(&str, String); 8] = [
            ("Fecha", r.created_at.format("%Y-%m-%d %H:%M").to_string()),
            ("Solicitante", r.requester_name.clone()),
            ("Departamento", r.department.clone()),
            ("Prioridad", r.priority.to_string()),
            ("Estado", r.status.label().to_string()),
            ("Comentario", r.status_comment.clone().unwrap_or_default()),
            ("Observaciones", r.observations.clone().unwrap_or_default()),
            (
                "Generado",
                document.generated_at.format("%Y-%m-%d %H:%M").to_string(),
            ),
        ];
        for (label, value) in &rows {
            let _ = writeln!(
                html,
                "<tr><th>{label}</th><td>{}</td></tr>",
                encode_text(value)
            );
        }
        html.push_str("</table>\n");

        html.push_str(
            "<table class=\"lines\">\n<tr><th>#</th><th>Producto</th><th>Cantidad</th><th>Unidad</th></tr>\n",
        );
        for (index, line) in r.lines.iter().enumerate() {
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                index + 1,
                encode_text(&line.product),
                line.quantity,
                encode_text(&line.unit)
            );
        }
        html.push_str("</table>\n</body>\n</html>\n");

        Ok(html.into_bytes())
    }

    fn extension(&self) -> &'static str {
        "html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, RequisitionId, RequisitionStatus};
    use crate::models::requisition::RequisitionLine;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn document() -> RequisitionDocument {
        let at = NaiveDate::from_ymd_opt(2026, 2, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        RequisitionDocument {
            requisition: Requisition {
                id: RequisitionId::new(1),
                number: "RQ-20260201083000000".to_string(),
                created_at: at,
                updated_at: at,
                requester_name: "Ana & Co".to_string(),
                requester_id: None,
                requester_email: None,
                department: "Sistemas".to_string(),
                priority: Priority::Low,
                status: RequisitionStatus::Closed,
                observations: None,
                creator_id: None,
                status_comment: None,
                archived_document_url: None,
                lines: vec![
                    RequisitionLine {
                        product: "Cable Utp".to_string(),
                        quantity: Decimal::new(100, 0),
                        unit: "Metro".to_string(),
                    },
                    RequisitionLine {
                        product: "Conector Rj45".to_string(),
                        quantity: Decimal::new(20, 0),
                        unit: "Pieza".to_string(),
                    },
                ],
            },
            generated_at: at,
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let doc = document();
        let first = HtmlDocumentRenderer.render(&doc).unwrap();
        let second = HtmlDocumentRenderer.render(&doc).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_contains_header_and_lines() {
        let html = String::from_utf8(HtmlDocumentRenderer.render(&document()).unwrap()).unwrap();
        assert!(html.contains("<h1>Requisicion RQ-20260201083000000</h1>"));
        assert!(html.contains("Ana &amp; Co"));
        assert!(html.contains("Cerrada"));
        assert!(html.contains("<td>2</td><td>Conector Rj45</td><td>20</td><td>Pieza</td>"));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            document().file_name(HtmlDocumentRenderer.extension()),
            "RQ-20260201083000000.html"
        );
    }
}
