//! PDF receipt for a confirmed booking.

use crate::branding::{TenantBranding, DEFAULT_COMPANY_NAME, DEFAULT_CONTACT_EMAIL, DEFAULT_PRIMARY_COLOR};
use crate::error::{NotificationError, NotificationResult};
use crate::models::BookingDetails;
use crate::templates::format_money;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Rgb,
};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const LEFT: f32 = 20.0;
const RIGHT: f32 = 150.0;
const TOP: f32 = 270.0;
const BOTTOM: f32 = 30.0;

/// One priced receipt line.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptLine {
    pub description: String,
    pub quantity: u32,
    pub amount: f64,
}

/// Everything a receipt shows, with money already normalized to numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptPayload {
    pub receipt_number: String,
    pub issued_on: String,
    pub company_name: String,
    pub contact_email: String,
    pub brand_color: String,
    pub customer_name: String,
    pub customer_email: String,
    pub tour_name: String,
    pub tour_date: String,
    pub guests: u32,
    pub currency: String,
    pub lines: Vec<ReceiptLine>,
    pub subtotal: f64,
    pub discount: f64,
    pub taxes: f64,
    pub total: f64,
}

impl ReceiptPayload {
    pub fn from_booking(booking: &BookingDetails, branding: Option<&TenantBranding>) -> Self {
        let pricing = &booking.pricing;
        let total = pricing.total.amount();
        let guests = booking.participants.total();

        let mut lines: Vec<ReceiptLine> = pricing
            .line_items
            .iter()
            .map(|item| ReceiptLine {
                description: item.description.clone(),
                quantity: item.quantity.unwrap_or(1),
                amount: item.amount.amount(),
            })
            .collect();

        let subtotal = match &pricing.subtotal {
            Some(value) => value.amount(),
            None if !lines.is_empty() => lines.iter().map(|l| l.amount).sum(),
            None => total,
        };

        if lines.is_empty() {
            lines.push(ReceiptLine {
                description: booking.tour_name.clone(),
                quantity: guests.max(1),
                amount: subtotal,
            });
        }

        let company_name = branding
            .and_then(|b| b.company_name.clone())
            .unwrap_or_else(|| DEFAULT_COMPANY_NAME.to_string());
        let contact_email = branding
            .and_then(|b| b.reply_to().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_CONTACT_EMAIL.to_string());
        let brand_color = branding
            .and_then(|b| b.primary_color.clone())
            .unwrap_or_else(|| DEFAULT_PRIMARY_COLOR.to_string());

        Self {
            receipt_number: booking.booking_id.clone(),
            issued_on: chrono::Utc::now().format("%Y-%m-%d").to_string(),
            company_name,
            contact_email,
            brand_color,
            customer_name: booking.customer_name.clone(),
            customer_email: booking.customer_email.clone(),
            tour_name: booking.tour_name.clone(),
            tour_date: booking.tour_date.clone(),
            guests,
            currency: pricing.currency.clone(),
            lines,
            subtotal,
            discount: pricing.discount.as_ref().map(|v| v.amount().abs()).unwrap_or(0.0),
            taxes: pricing.taxes.as_ref().map(|v| v.amount()).unwrap_or(0.0),
            total,
        }
    }
}

/// Lays out a receipt document.
#[cfg_attr(test, mockall::automock)]
pub trait ReceiptComposer: Send + Sync {
    /// PDF bytes for the receipt.
    fn compose(&self, receipt: &ReceiptPayload) -> NotificationResult<Vec<u8>>;
}

/// Single-column A4 receipt using the built-in Helvetica faces.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfReceiptComposer;

/// `#rrggbb` to a PDF fill color. Anything else falls back to black.
fn hex_to_rgb(hex: &str) -> Rgb {
    let digits = hex.trim_start_matches('#');
    let channel = |i: usize| {
        digits
            .get(i..i + 2)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .map(|v| v as f32 / 255.0)
    };
    match (digits.len(), channel(0), channel(2), channel(4)) {
        (6, Some(r), Some(g), Some(b)) => Rgb::new(r, g, b, None),
        _ => Rgb::new(0.0, 0.0, 0.0, None),
    }
}

fn pdf_err(e: impl std::fmt::Display) -> NotificationError {
    NotificationError::ArtifactError(format!("PDF generation failed: {}", e))
}

struct Cursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: &'a IndirectFontRef,
    y: f32,
}

impl Cursor<'_> {
    fn line(&mut self, text: &str, size: f32) {
        self.ensure_room();
        self.layer.use_text(text, size, Mm(LEFT), Mm(self.y), self.regular);
        self.y -= size * 0.6;
    }

    fn row(&mut self, label: &str, value: &str, font: &IndirectFontRef) {
        self.ensure_room();
        self.layer.use_text(label, 11.0, Mm(LEFT), Mm(self.y), font);
        self.layer.use_text(value, 11.0, Mm(RIGHT), Mm(self.y), font);
        self.y -= 7.0;
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn ensure_room(&mut self) {
        if self.y < BOTTOM {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Receipt");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP;
        }
    }
}

impl ReceiptComposer for PdfReceiptComposer {
    fn compose(&self, receipt: &ReceiptPayload) -> NotificationResult<Vec<u8>> {
        let title = format!("Receipt {}", receipt.receipt_number);
        let (doc, page, layer) =
            PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Receipt");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_err)?;

        let first = doc.get_page(page).get_layer(layer);
        first.set_fill_color(Color::Rgb(hex_to_rgb(&receipt.brand_color)));
        first.use_text(&receipt.company_name, 22.0, Mm(LEFT), Mm(TOP), &bold);
        first.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));

        let mut cursor = Cursor {
            doc: &doc,
            layer: first,
            regular: &regular,
            y: TOP - 14.0,
        };

        cursor.line(&format!("Receipt #{}", receipt.receipt_number), 14.0);
        cursor.line(&format!("Issued {}", receipt.issued_on), 10.0);
        cursor.gap(6.0);

        cursor.line(&format!("Billed to: {}", receipt.customer_name), 11.0);
        cursor.line(&receipt.customer_email, 11.0);
        cursor.gap(4.0);
        cursor.line(&format!("Tour: {}", receipt.tour_name), 11.0);
        cursor.line(
            &format!("Date: {}   Guests: {}", receipt.tour_date, receipt.guests),
            11.0,
        );
        cursor.gap(8.0);

        let currency = Some(receipt.currency.as_str());
        for item in &receipt.lines {
            let label = if item.quantity > 1 {
                format!("{} x {}", item.description, item.quantity)
            } else {
                item.description.clone()
            };
            cursor.row(&label, &format_money(item.amount, currency), &regular);
        }
        cursor.gap(4.0);

        cursor.row("Subtotal", &format_money(receipt.subtotal, currency), &regular);
        if receipt.discount > 0.0 {
            cursor.row(
                "Discount",
                &format!("-{}", format_money(receipt.discount, currency)),
                &regular,
            );
        }
        if receipt.taxes > 0.0 {
            cursor.row("Taxes & fees", &format_money(receipt.taxes, currency), &regular);
        }
        cursor.row("Total", &format_money(receipt.total, currency), &bold);
        cursor.gap(10.0);

        cursor.line(
            &format!("Questions about this receipt? {}", receipt.contact_email),
            9.0,
        );
        drop(cursor);

        doc.save_to_bytes().map_err(pdf_err)
    }
}
