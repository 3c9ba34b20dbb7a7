//! Invoice and delivery note rendering.
//!
//! Both documents are askama HTML pages built from an order and its cart
//! project; [`super::pdf`] turns them into PDFs.

use std::fmt;

use askama::Template;
use askama_web::WebTemplate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::filters;
use crate::models::{CartProject, Order, User};

/// Which document to produce, from `?type=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    #[default]
    Invoice,
    DeliveryNote,
}

impl DocumentKind {
    /// Download file name for an order.
    #[must_use]
    pub fn file_name(self, order_number: &str) -> String {
        match self {
            Self::Invoice => format!("invoice-{order_number}.pdf"),
            Self::DeliveryNote => format!("delivery-note-{order_number}.pdf"),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Invoice => "invoice",
            Self::DeliveryNote => "delivery-note",
        })
    }
}

/// Buyer block shown on both documents.
#[derive(Debug, Clone)]
pub struct PartyView {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub vat_number: Option<String>,
    pub phone: Option<String>,
    pub address_lines: Vec<String>,
}

impl From<&User> for PartyView {
    fn from(user: &User) -> Self {
        let p = &user.profile;
        let mut address_lines = Vec::new();
        if let Some(street) = &p.street {
            address_lines.push(street.clone());
        }
        let city_line = [p.postcode.as_deref(), p.city.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if !city_line.is_empty() {
            address_lines.push(city_line);
        }
        if let Some(country) = &p.country {
            address_lines.push(country.clone());
        }

        Self {
            name: user.display_name(),
            email: user.email.to_string(),
            company: p.company.clone(),
            vat_number: p.vat_number.clone(),
            phone: p.phone.clone(),
            address_lines,
        }
    }
}

/// One sign design on a document.
#[derive(Debug, Clone)]
pub struct DocumentLineView {
    pub position: usize,
    pub description: String,
    pub thickness_mm: Decimal,
    pub tape: bool,
    pub copies: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub preview_svg: Option<String>,
}

/// An accessory on a document.
#[derive(Debug, Clone)]
pub struct DocumentAccessoryView {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

/// Order header and totals.
#[derive(Debug, Clone)]
pub struct DocumentOrderView {
    pub order_number: String,
    pub created_at: String,
    pub status: String,
    pub country: String,
    pub project_name: String,
    pub signs: i32,
    pub currency: &'static str,
    pub subtotal: Decimal,
    pub discount_percent: Decimal,
    pub discount: Decimal,
    pub net: Decimal,
    pub vat_percent: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
    pub has_discount: bool,
    /// Business buyer abroad with 0 % VAT.
    pub reverse_charge: bool,
}

/// Invoice template.
#[derive(Template, WebTemplate)]
#[template(path = "documents/invoice.html")]
pub struct InvoiceTemplate {
    pub order: DocumentOrderView,
    pub buyer: PartyView,
    pub lines: Vec<DocumentLineView>,
    pub accessories: Vec<DocumentAccessoryView>,
    pub printed_at: String,
}

/// Delivery note template. Quantities only, no prices.
#[derive(Template, WebTemplate)]
#[template(path = "documents/delivery_note.html")]
pub struct DeliveryNoteTemplate {
    pub order: DocumentOrderView,
    pub buyer: PartyView,
    pub lines: Vec<DocumentLineView>,
    pub accessories: Vec<DocumentAccessoryView>,
    pub printed_at: String,
}

fn order_view(order: &Order, project: &CartProject) -> DocumentOrderView {
    let quote = &project.quote;
    DocumentOrderView {
        order_number: order.order_number.clone(),
        created_at: order.created_at.format("%Y-%m-%d").to_string(),
        status: order.status.label().to_owned(),
        country: order.country.clone(),
        project_name: project.project_name.clone(),
        signs: order.signs,
        currency: quote.currency.code(),
        subtotal: quote.subtotal,
        discount_percent: quote.discount_percent,
        discount: quote.discount,
        net: order.net_amount,
        vat_percent: quote.vat_percent,
        vat: order.vat_amount,
        total: order.total_amount,
        has_discount: quote.discount > Decimal::ZERO,
        reverse_charge: quote.vat_percent.is_zero() && order.net_amount > Decimal::ZERO,
    }
}

fn line_views(project: &CartProject) -> Vec<DocumentLineView> {
    project
        .canvases
        .iter()
        .enumerate()
        .map(|(i, canvas)| DocumentLineView {
            position: i + 1,
            description: format!("{} #{}", project.project_name, i + 1),
            thickness_mm: canvas.thickness_mm,
            tape: canvas.tape,
            copies: canvas.copies_count,
            unit_price: canvas.price.unit.unit,
            line_total: canvas.price.line_total,
            preview_svg: canvas.preview_svg.clone(),
        })
        .collect()
}

fn accessory_views(project: &CartProject) -> Vec<DocumentAccessoryView> {
    project
        .accessories
        .iter()
        .map(|a| DocumentAccessoryView {
            name: a.name.clone(),
            quantity: a.quantity,
            unit_price: a.unit_price,
            total: a.unit_price * Decimal::from(a.quantity),
        })
        .collect()
}

/// Render a document as HTML.
///
/// # Errors
///
/// Returns `askama::Error` if the template fails to render.
pub fn render_html(
    kind: DocumentKind,
    buyer: &User,
    order: &Order,
    project: &CartProject,
) -> Result<String, askama::Error> {
    let order_view = order_view(order, project);
    let buyer = PartyView::from(buyer);
    let lines = line_views(project);
    let accessories = accessory_views(project);
    let printed_at = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();

    match kind {
        DocumentKind::Invoice => InvoiceTemplate {
            order: order_view,
            buyer,
            lines,
            accessories,
            printed_at,
        }
        .render(),
        DocumentKind::DeliveryNote => DeliveryNoteTemplate {
            order: order_view,
            buyer,
            lines,
            accessories,
            printed_at,
        }
        .render(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::CartCanvas;
    use chrono::Utc;
    use signcraft_core::api::ProfileFields;
    use signcraft_core::pricing::{AccessoryLine, LineQuote, PriceQuote, UnitPriceBreakdown};
    use signcraft_core::{
        CartProjectId, CurrencyCode, Email, OrderId, OrderStatus, UserId, UserType,
    };

    fn fixture() -> (User, Order, CartProject) {
        let now = Utc::now();
        let user = User {
            id: UserId::new(1),
            email: Email::parse("buyer@example.com").unwrap(),
            user_type: UserType::Business,
            profile: ProfileFields {
                company: Some("Acme Sp. z o.o.".to_owned()),
                vat_number: Some("PL1234567890".to_owned()),
                street: Some("Prosta 1".to_owned()),
                postcode: Some("00-001".to_owned()),
                city: Some("Warszawa".to_owned()),
                country: Some("PL".to_owned()),
                ..ProfileFields::default()
            },
            created_at: now,
            updated_at: now,
        };
        let line = LineQuote {
            unit: UnitPriceBreakdown {
                base: Decimal::new(400, 2),
                engraving: Decimal::new(112, 2),
                border: Decimal::ZERO,
                unit: Decimal::new(512, 2),
            },
            copies: 4,
            line_total: Decimal::new(2048, 2),
        };
        let project = CartProject {
            id: CartProjectId::generate(),
            user_id: user.id,
            project_name: "Door plates".to_owned(),
            canvases: vec![CartCanvas {
                canvas: serde_json::json!({"objects": []}),
                preview_svg: Some("<svg id=\"p1\"></svg>".to_owned()),
                copies_count: 4,
                thickness_mm: Decimal::new(16, 1),
                tape: true,
                price: line.clone(),
            }],
            accessories: vec![AccessoryLine {
                id: "screws".to_owned(),
                name: "Mounting screws".to_owned(),
                quantity: 2,
                unit_price: Decimal::new(150, 2),
            }],
            quote: PriceQuote {
                currency: CurrencyCode::EUR,
                lines: vec![line],
                accessories_total: Decimal::new(300, 2),
                subtotal: Decimal::new(2348, 2),
                discount_percent: Decimal::ZERO,
                discount: Decimal::ZERO,
                net: Decimal::new(2348, 2),
                vat_percent: Decimal::ZERO,
                vat: Decimal::ZERO,
                total: Decimal::new(2348, 2),
            },
            created_at: now,
        };
        let order = Order {
            id: OrderId::new(9),
            order_number: "SC-2025-1009".to_owned(),
            user_id: user.id,
            cart_project_id: project.id,
            signs: 4,
            net_amount: Decimal::new(2348, 2),
            vat_amount: Decimal::ZERO,
            total_amount: Decimal::new(2348, 2),
            status: OrderStatus::New,
            country: "PL".to_owned(),
            created_at: now,
            updated_at: now,
        };
        (user, order, project)
    }

    #[test]
    fn test_invoice_lists_prices() {
        let (user, order, project) = fixture();
        let html = render_html(DocumentKind::Invoice, &user, &order, &project).unwrap();
        assert!(html.contains("SC-2025-1009"));
        assert!(html.contains("PL1234567890"));
        assert!(html.contains("20.48"));
        assert!(html.contains("Mounting screws"));
        assert!(html.contains("23.48"));
    }

    #[test]
    fn test_delivery_note_has_no_prices() {
        let (user, order, project) = fixture();
        let html = render_html(DocumentKind::DeliveryNote, &user, &order, &project).unwrap();
        assert!(html.contains("SC-2025-1009"));
        assert!(html.contains("Warszawa"));
        assert!(!html.contains("20.48"));
        assert!(!html.contains("23.48"));
    }

    #[test]
    fn test_document_kind_from_query() {
        let kind: DocumentKind = serde_json::from_str("\"delivery-note\"").unwrap();
        assert_eq!(kind, DocumentKind::DeliveryNote);
        assert_eq!(DocumentKind::default(), DocumentKind::Invoice);
        assert_eq!(kind.file_name("SC-1"), "delivery-note-SC-1.pdf");
    }
}
