//! Mail subjects and bodies. Every interpolated value is HTML-escaped.

use html_escape::encode_text;
use std::fmt::Write;

use crate::domain::RequisitionStatus;
use crate::models::requisition::Requisition;

#[must_use]
pub fn subject(requisition: &Requisition) -> String {
    format!(
        "Requisicion {}: {}",
        requisition.number,
        requisition.status.label()
    )
}

/// Body for a requisition that just reached its current status.
#[must_use]
pub fn body(
    requisition: &Requisition,
    previous: Option<RequisitionStatus>,
    app_url: &str,
) -> String {
    let mut html = String::with_capacity(1024);

    let _ = write!(
        html,
        "<p>La requisicion <strong>{}</strong> ",
        encode_text(&requisition.number)
    );
    match previous {
        Some(from) => {
            let _ = write!(
                html,
                "cambio de <em>{}</em> a <strong>{}</strong>.</p>",
                from.label(),
                requisition.status.label()
            );
        }
        None => {
            let _ = write!(
                html,
                "fue creada con estado <strong>{}</strong>.</p>",
                requisition.status.label()
            );
        }
    }

    let _ = write!(
        html,
        "<p>Solicitante: {}<br>Departamento: {}<br>Prioridad: {}</p>",
        encode_text(&requisition.requester_name),
        encode_text(&requisition.department),
        requisition.priority
    );

    if let Some(comment) = requisition.status_comment.as_deref().filter(|c| !c.is_empty()) {
        let _ = write!(html, "<p>Comentario: {}</p>", encode_text(comment));
    }

    html.push_str("<table><tr><th>Producto</th><th>Cantidad</th><th>Unidad</th></tr>");
    for line in &requisition.lines {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            encode_text(&line.product),
            line.quantity,
            encode_text(&line.unit)
        );
    }
    html.push_str("</table>");

    let _ = write!(
        html,
        "<p><a href=\"{}/requisitions/{}\">Ver requisicion</a></p>",
        app_url.trim_end_matches('/'),
        requisition.id
    );

    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, RequisitionId};
    use crate::models::requisition::RequisitionLine;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn requisition() -> Requisition {
        let at = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Requisition {
            id: RequisitionId::new(3),
            number: "RQ-20260302090000000".to_string(),
            created_at: at,
            updated_at: at,
            requester_name: "Ana <script>".to_string(),
            requester_id: None,
            requester_email: None,
            department: "Mantenimiento".to_string(),
            priority: Priority::High,
            status: RequisitionStatus::WarehouseRejected,
            observations: None,
            creator_id: None,
            status_comment: Some("Sin presupuesto".to_string()),
            archived_document_url: None,
            lines: vec![RequisitionLine {
                product: "Guantes".to_string(),
                quantity: Decimal::new(25, 1),
                unit: "Caja".to_string(),
            }],
        }
    }

    #[test]
    fn test_subject_uses_label() {
        assert_eq!(
            subject(&requisition()),
            "Requisicion RQ-20260302090000000: Rechazada por almacen"
        );
    }

    #[test]
    fn test_body_escapes_and_links() {
        let html = body(
            &requisition(),
            Some(RequisitionStatus::PendingWarehouseReview),
            "https://rq.example.com/",
        );
        assert!(html.contains("Ana &lt;script&gt;"));
        assert!(html.contains("Sin presupuesto"));
        assert!(html.contains("<td>2.5</td>"));
        assert!(html.contains("https://rq.example.com/requisitions/3"));
        assert!(html.contains("Pendiente de revision de almacen"));
    }
}
