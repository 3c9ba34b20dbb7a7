//! Email service for order confirmations.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and text templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::filters;
use crate::models::{CartProject, Order, User};

/// One line of the confirmation email.
#[derive(Debug, Clone)]
pub struct ConfirmationLine {
    pub position: usize,
    pub copies: u32,
    pub thickness_mm: Decimal,
    pub line_total: Decimal,
}

/// HTML template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    name: &'a str,
    order: &'a Order,
    project_name: &'a str,
    lines: &'a [ConfirmationLine],
    currency: &'a str,
    order_url: &'a str,
}

/// Plain text template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    name: &'a str,
    order: &'a Order,
    project_name: &'a str,
    lines: &'a [ConfirmationLine],
    currency: &'a str,
    order_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("from_address", &self.from_address)
            .finish_non_exhaustive()
    }
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send the order confirmation for a freshly placed order.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_confirmation(
        &self,
        user: &User,
        order: &Order,
        project: &CartProject,
        public_url: &str,
    ) -> Result<(), EmailError> {
        let (subject, text, html) = render_order_confirmation(user, order, project, public_url)?;
        self.send_multipart_email(&user.email.to_string(), &subject, &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

/// Render subject, text and HTML bodies of an order confirmation.
///
/// # Errors
///
/// Returns `EmailError::Template` if a template fails to render.
pub fn render_order_confirmation(
    user: &User,
    order: &Order,
    project: &CartProject,
    public_url: &str,
) -> Result<(String, String, String), EmailError> {
    let name = user.display_name();
    let lines = confirmation_lines(project);
    let currency = project.quote.currency.code();
    let order_url = format!("{}/orders/{}", public_url.trim_end_matches('/'), order.id);

    let html = OrderConfirmationHtml {
        name: &name,
        order,
        project_name: &project.project_name,
        lines: &lines,
        currency,
        order_url: &order_url,
    }
    .render()?;
    let text = OrderConfirmationText {
        name: &name,
        order,
        project_name: &project.project_name,
        lines: &lines,
        currency,
        order_url: &order_url,
    }
    .render()?;

    Ok((format!("Order {} confirmed", order.order_number), text, html))
}

fn confirmation_lines(project: &CartProject) -> Vec<ConfirmationLine> {
    project
        .canvases
        .iter()
        .enumerate()
        .map(|(i, canvas)| ConfirmationLine {
            position: i + 1,
            copies: canvas.copies_count,
            thickness_mm: canvas.thickness_mm,
            line_total: canvas.price.line_total,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::CartCanvas;
    use chrono::Utc;
    use signcraft_core::api::ProfileFields;
    use signcraft_core::pricing::{LineQuote, PriceQuote, UnitPriceBreakdown};
    use signcraft_core::{
        CartProjectId, CurrencyCode, Email, OrderId, OrderStatus, UserId, UserType,
    };

    fn fixture() -> (User, Order, CartProject) {
        let now = Utc::now();
        let user = User {
            id: UserId::new(7),
            email: Email::parse("olena@example.com").unwrap(),
            user_type: UserType::Consumer,
            profile: ProfileFields {
                first_name: Some("Olena".to_owned()),
                ..ProfileFields::default()
            },
            created_at: now,
            updated_at: now,
        };
        let line = LineQuote {
            unit: UnitPriceBreakdown {
                base: Decimal::new(500, 2),
                engraving: Decimal::new(250, 2),
                border: Decimal::ZERO,
                unit: Decimal::new(750, 2),
            },
            copies: 2,
            line_total: Decimal::new(1500, 2),
        };
        let project = CartProject {
            id: CartProjectId::generate(),
            user_id: user.id,
            project_name: "Office doors".to_owned(),
            canvases: vec![CartCanvas {
                canvas: serde_json::json!({"objects": []}),
                preview_svg: None,
                copies_count: 2,
                thickness_mm: Decimal::new(16, 1),
                tape: false,
                price: line.clone(),
            }],
            accessories: Vec::new(),
            quote: PriceQuote {
                currency: CurrencyCode::EUR,
                lines: vec![line],
                accessories_total: Decimal::ZERO,
                subtotal: Decimal::new(1500, 2),
                discount_percent: Decimal::ZERO,
                discount: Decimal::ZERO,
                net: Decimal::new(1500, 2),
                vat_percent: Decimal::new(20, 0),
                vat: Decimal::new(300, 2),
                total: Decimal::new(1800, 2),
            },
            created_at: now,
        };
        let order = Order {
            id: OrderId::new(3),
            order_number: "SC-2025-1003".to_owned(),
            user_id: user.id,
            cart_project_id: project.id,
            signs: 2,
            net_amount: Decimal::new(1500, 2),
            vat_amount: Decimal::new(300, 2),
            total_amount: Decimal::new(1800, 2),
            status: OrderStatus::New,
            country: "UA".to_owned(),
            created_at: now,
            updated_at: now,
        };
        (user, order, project)
    }

    #[test]
    fn test_render_order_confirmation() {
        let (user, order, project) = fixture();
        let (subject, text, html) =
            render_order_confirmation(&user, &order, &project, "https://signs.example/").unwrap();

        assert_eq!(subject, "Order SC-2025-1003 confirmed");
        assert!(text.contains("Olena"));
        assert!(text.contains("18.00 EUR"));
        assert!(text.contains("https://signs.example/orders/3"));
        assert!(html.contains("Office doors"));
        assert!(html.contains("15.00"));
    }
}
