//! # Tabular Export / Import
//!
//! Spreadsheet-compatible CSV round-trip of invoices: one row per
//! (invoice, line), grouped back into invoices on import.
//!
//! ## Row Shape
//! ```text
//! Invoice Number | Date | Customer Name | Customer Email | Customer Mobile
//! Payment Type | Remarks | Subtotal | Total Discount | CGST | SGST
//! Total Tax | Grand Total | Item Name | HSN | Batch Number | Category
//! Quantity | Price | Discount% | Item Total
//! ```
//!
//! Invoice-level columns repeat on every row of the same invoice; the
//! first row of a group is authoritative on import. An invoice with no
//! lines still exports as one row carrying the `NO ITEMS` sentinel in the
//! item columns, and such rows contribute zero lines on import.
//!
//! Import is lenient the way a bulk loader has to be: malformed rows are
//! skipped with a warning instead of failing the whole file. The tabular
//! format does not carry line tax slabs or batch expiry dates, so those
//! are reconstructed (uniform invoices derive the slab from tax ÷ base;
//! mixed ones fall back to the default slab per line).

use std::collections::HashMap;
use std::io::{Read, Write};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::debug;

use meridian_core::{
    loyalty::coins_earned, CartLine, CustomerRef, Invoice, InvoiceLine, InvoiceTotals, Money,
    PaymentType, Rate, TaxBreakdown, DEFAULT_TAX_SLAB,
};

// =============================================================================
// Format Constants
// =============================================================================

/// Column order of the tabular format.
pub const EXPORT_HEADERS: [&str; 21] = [
    "Invoice Number",
    "Date",
    "Customer Name",
    "Customer Email",
    "Customer Mobile",
    "Payment Type",
    "Remarks",
    "Subtotal",
    "Total Discount",
    "CGST",
    "SGST",
    "Total Tax",
    "Grand Total",
    "Item Name",
    "HSN",
    "Batch Number",
    "Category",
    "Quantity",
    "Price",
    "Discount%",
    "Item Total",
];

/// Item-name marker for an invoice exported with zero lines.
pub const NO_ITEMS_SENTINEL: &str = "NO ITEMS";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// =============================================================================
// Errors & Results
// =============================================================================

/// Failures that abort an export or import outright.
///
/// Row-level problems on import do not land here; they become warnings on
/// the [`ImportResult`].
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unrecognized header row: missing column '{0}'")]
    MissingColumn(&'static str),
}

/// Outcome of a bulk import.
#[derive(Debug, Default)]
pub struct ImportResult {
    /// Reconstructed invoices, in first-row order.
    pub invoices: Vec<Invoice>,
    /// Rows that were skipped, with the reason.
    pub warnings: Vec<String>,
}

// =============================================================================
// Export
// =============================================================================

/// Writes the invoices as CSV, one row per (invoice, line).
pub fn export_invoices<W: Write>(invoices: &[Invoice], writer: W) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(EXPORT_HEADERS)?;

    for invoice in invoices {
        if invoice.lines.is_empty() {
            csv.write_record(row_for(invoice, None))?;
            continue;
        }
        for line in &invoice.lines {
            csv.write_record(row_for(invoice, Some(line)))?;
        }
    }

    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn row_for(invoice: &Invoice, line: Option<&InvoiceLine>) -> Vec<String> {
    let totals = &invoice.totals;
    let mut row = vec![
        invoice.number.clone(),
        invoice.date.format(DATE_FORMAT).to_string(),
        invoice.customer.name.clone(),
        invoice.customer.email.clone().unwrap_or_default(),
        invoice.customer.mobile.clone(),
        invoice.payment_type.to_string(),
        invoice.remarks.clone().unwrap_or_default(),
        format_money(totals.subtotal),
        format_money(totals.discount),
        format_money(totals.cgst()),
        format_money(totals.sgst()),
        format_money(totals.tax),
        format_money(totals.grand_total),
    ];

    match line {
        Some(l) => row.extend([
            l.line.product_name.clone(),
            l.line.hsn_code.clone(),
            l.line.batch_number.clone(),
            l.line.category.clone(),
            l.line.quantity.to_string(),
            format_money(l.line.unit_price),
            format_percent(l.line.discount),
            format_money(l.final_amount),
        ]),
        None => row.extend([
            NO_ITEMS_SENTINEL.to_string(),
            String::new(),
            String::new(),
            String::new(),
            "0".to_string(),
            format_money(Money::zero()),
            "0".to_string(),
            format_money(Money::zero()),
        ]),
    }

    row
}

// =============================================================================
// Import
// =============================================================================

/// Reads a CSV produced by [`export_invoices`] (or a spreadsheet edit of
/// one) back into invoices.
///
/// Rows sharing an Invoice Number group, in row order, into one invoice
/// with one line per non-sentinel row.
pub fn import_invoices<R: Read>(reader: R) -> Result<ImportResult, ExportError> {
    let mut csv = csv::Reader::from_reader(reader);

    // Column name → index, so spreadsheet column reordering survives
    let columns: HashMap<String, usize> = csv
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_string(), i))
        .collect();
    for required in EXPORT_HEADERS {
        if !columns.contains_key(required) {
            return Err(ExportError::MissingColumn(required));
        }
    }

    let mut result = ImportResult::default();
    let mut index_by_number: HashMap<String, usize> = HashMap::new();

    for (row_num, record) in csv.records().enumerate() {
        let row_num = row_num + 2; // 1-based, after the header row
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                result.warnings.push(format!("row {}: parse error: {}", row_num, e));
                continue;
            }
        };
        let row = RowView { columns: &columns, record: &record };

        let number = row.field("Invoice Number").to_string();
        if number.is_empty() {
            result.warnings.push(format!("row {}: missing invoice number", row_num));
            continue;
        }

        // First row of a group establishes the invoice
        if !index_by_number.contains_key(&number) {
            match parse_invoice_header(&number, &row) {
                Ok(invoice) => {
                    index_by_number.insert(number.clone(), result.invoices.len());
                    result.invoices.push(invoice);
                }
                Err(reason) => {
                    result.warnings.push(format!("row {}: {}", row_num, reason));
                    continue;
                }
            }
        }
        let invoice = &mut result.invoices[index_by_number[&number]];

        // Sentinel rows carry no line
        if row.field("Item Name") == NO_ITEMS_SENTINEL {
            continue;
        }

        match parse_line(invoice, &row) {
            Ok(line) => invoice.lines.push(line),
            Err(reason) => result.warnings.push(format!("row {}: {}", row_num, reason)),
        }
    }

    debug!(
        invoices = result.invoices.len(),
        warnings = result.warnings.len(),
        "bulk import parsed"
    );
    Ok(result)
}

/// One record plus the header's column map.
struct RowView<'a> {
    columns: &'a HashMap<String, usize>,
    record: &'a csv::StringRecord,
}

impl RowView<'_> {
    fn field(&self, name: &str) -> &str {
        self.columns
            .get(name)
            .and_then(|i| self.record.get(*i))
            .unwrap_or("")
            .trim()
    }
}

/// Builds the invoice shell (header + totals) from the invoice-level
/// columns of one row.
fn parse_invoice_header(number: &str, row: &RowView<'_>) -> Result<Invoice, String> {
    let field = |name: &str| row.field(name);
    let date = parse_date(field("Date"))?;

    let subtotal = parse_money(field("Subtotal"))?;
    let discount = parse_money(field("Total Discount"))?;
    let cgst = parse_money(field("CGST"))?;
    let sgst = parse_money(field("SGST"))?;
    let tax = parse_money(field("Total Tax"))?;
    let grand_total = parse_money(field("Grand Total"))?;

    // Columns carry no explicit promo figure; it is whatever of the
    // post-item-discount amount the grand total does not account for.
    let promo_discount = subtotal - discount - grand_total;
    let base_value = grand_total - tax;

    let tax_breakdown = if cgst.is_zero() && sgst.is_zero() && tax.is_positive() {
        TaxBreakdown::Mixed { tax }
    } else {
        TaxBreakdown::Uniform {
            rate: derive_rate(tax, base_value),
            cgst,
            sgst,
        }
    };
    let distinct_tax_rates = match tax_breakdown {
        TaxBreakdown::Uniform { rate, .. } => [rate.bps()].into_iter().collect(),
        TaxBreakdown::Mixed { .. } => Default::default(),
    };

    let email = field("Customer Email");
    let remarks = field("Remarks");

    Ok(Invoice {
        number: number.to_string(),
        date,
        customer: CustomerRef {
            // The tabular format has no directory id; re-linking happens
            // against the directory by mobile when the import is applied.
            id: String::new(),
            name: field("Customer Name").to_string(),
            mobile: field("Customer Mobile").to_string(),
            email: (!email.is_empty()).then(|| email.to_string()),
        },
        payment_type: parse_payment_type(field("Payment Type")),
        remarks: (!remarks.is_empty()).then(|| remarks.to_string()),
        totals: InvoiceTotals {
            subtotal,
            discount,
            promo_discount,
            base_value,
            tax,
            tax_breakdown,
            distinct_tax_rates,
            grand_total,
            loyalty_coins: coins_earned(base_value),
        },
        lines: Vec::new(),
    })
}

/// Builds one invoice line from the item-level columns of a row.
fn parse_line(invoice: &Invoice, row: &RowView<'_>) -> Result<InvoiceLine, String> {
    let field = |name: &str| row.field(name);
    let name = field("Item Name");
    if name.is_empty() {
        return Err("missing item name".to_string());
    }

    let quantity: i64 = field("Quantity")
        .parse()
        .map_err(|_| format!("bad quantity '{}'", field("Quantity")))?;
    let unit_price = parse_money(field("Price"))?;
    let discount = parse_percent(field("Discount%"))?;
    let final_amount = parse_money(field("Item Total"))?;

    // Slab per line is not in the format; uniform invoices know it, mixed
    // ones fall back to the default
    let tax_slab = match invoice.totals.tax_breakdown {
        TaxBreakdown::Uniform { rate, .. } => rate,
        TaxBreakdown::Mixed { .. } => DEFAULT_TAX_SLAB,
    };

    let gross = unit_price.multiply_quantity(quantity);
    let base_value = final_amount.excluding(tax_slab);
    let tax_amount = final_amount - base_value;
    let (cgst_amount, sgst_amount) = match invoice.totals.tax_breakdown {
        TaxBreakdown::Uniform { .. } => tax_amount.split_halves(),
        TaxBreakdown::Mixed { .. } => (Money::zero(), Money::zero()),
    };

    Ok(InvoiceLine {
        line: CartLine {
            product_id: String::new(),
            batch_number: field("Batch Number").to_string(),
            product_name: name.to_string(),
            category: field("Category").to_string(),
            hsn_code: field("HSN").to_string(),
            barcode: None,
            unit_price,
            discount,
            tax_slab,
            quantity,
            // Expiry is not part of the tabular format
            expiry_date: invoice.date.date_naive(),
        },
        discount_amount: gross.portion(discount),
        base_value,
        tax_amount,
        cgst_amount,
        sgst_amount,
        final_amount,
    })
}

// =============================================================================
// Field Formatting & Parsing
// =============================================================================

fn format_money(amount: Money) -> String {
    let sign = if amount.is_negative() { "-" } else { "" };
    format!("{}{}.{:02}", sign, amount.rupees().abs(), amount.cents_part())
}

fn parse_money(text: &str) -> Result<Money, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Money::zero());
    }

    let (sign, text) = match text.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, text),
    };

    let (rupees, paise) = match text.split_once('.') {
        Some((r, p)) => {
            // Normalize "1180.5" and "1180.50" alike to paise
            let mut p = p.to_string();
            while p.len() < 2 {
                p.push('0');
            }
            if p.len() > 2 || !p.chars().all(|c| c.is_ascii_digit()) {
                return Err(format!("bad amount '{}'", text));
            }
            (r, p)
        }
        None => (text, "00".to_string()),
    };

    let rupees: i64 = rupees.parse().map_err(|_| format!("bad amount '{}'", text))?;
    let paise: i64 = paise.parse().map_err(|_| format!("bad amount '{}'", text))?;
    Ok(Money::from_cents(sign * (rupees * 100 + paise)))
}

fn format_percent(rate: Rate) -> String {
    if rate.bps() % 100 == 0 {
        (rate.bps() / 100).to_string()
    } else {
        format!("{:.2}", rate.percentage())
    }
}

fn parse_percent(text: &str) -> Result<Rate, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Rate::zero());
    }
    let pct: f64 = text.parse().map_err(|_| format!("bad percentage '{}'", text))?;
    if !(0.0..=100.0).contains(&pct) {
        return Err(format!("percentage out of range '{}'", text));
    }
    Ok(Rate::from_percentage(pct))
}

fn parse_date(text: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, DATE_FORMAT) {
        return Ok(dt.and_utc());
    }
    // Spreadsheets commonly strip the time portion
    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    Err(format!("bad date '{}'", text))
}

fn parse_payment_type(text: &str) -> PaymentType {
    match text.to_lowercase().as_str() {
        "card" => PaymentType::Card,
        "upi" => PaymentType::Upi,
        _ => PaymentType::Cash,
    }
}

/// Derives a slab from aggregate tax over base, rounded to the nearest bp.
fn derive_rate(tax: Money, base: Money) -> Rate {
    if !base.is_positive() {
        return Rate::zero();
    }
    let bps = (tax.cents() as i128 * 10000 + base.cents() as i128 / 2) / base.cents() as i128;
    Rate::from_bps(bps as u32)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    fn sample_invoice(number: &str, lines: Vec<InvoiceLine>) -> Invoice {
        let has_lines = !lines.is_empty();
        Invoice {
            number: number.to_string(),
            date: Utc.with_ymd_and_hms(2026, 8, 15, 10, 30, 0).unwrap(),
            customer: CustomerRef {
                id: "c-1".to_string(),
                name: "Asha Rao".to_string(),
                mobile: "9876543210".to_string(),
                email: Some("asha@example.com".to_string()),
            },
            payment_type: PaymentType::Upi,
            remarks: Some("walk-in".to_string()),
            totals: InvoiceTotals {
                subtotal: Money::from_cents(118000),
                discount: Money::zero(),
                promo_discount: Money::zero(),
                base_value: Money::from_cents(100000),
                tax: Money::from_cents(18000),
                tax_breakdown: TaxBreakdown::Uniform {
                    rate: Rate::from_bps(1800),
                    cgst: Money::from_cents(9000),
                    sgst: Money::from_cents(9000),
                },
                distinct_tax_rates: BTreeSet::from([1800]),
                grand_total: Money::from_cents(118000),
                loyalty_coins: if has_lines { 10 } else { 0 },
            },
            lines,
        }
    }

    fn sample_line(name: &str, batch: &str, qty: i64, final_cents: i64) -> InvoiceLine {
        let final_amount = Money::from_cents(final_cents);
        let base = final_amount.excluding(Rate::from_bps(1800));
        let tax = final_amount - base;
        let (cgst, sgst) = tax.split_halves();
        InvoiceLine {
            line: CartLine {
                product_id: "p-1".to_string(),
                batch_number: batch.to_string(),
                product_name: name.to_string(),
                category: "Analgesics".to_string(),
                hsn_code: "3004".to_string(),
                barcode: None,
                unit_price: Money::from_cents(final_cents / qty),
                discount: Rate::zero(),
                tax_slab: Rate::from_bps(1800),
                quantity: qty,
                expiry_date: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
            },
            discount_amount: Money::zero(),
            base_value: base,
            tax_amount: tax,
            cgst_amount: cgst,
            sgst_amount: sgst,
            final_amount,
        }
    }

    fn export_to_string(invoices: &[Invoice]) -> String {
        let mut buf = Vec::new();
        export_invoices(invoices, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_export_one_row_per_line() {
        let invoice = sample_invoice(
            "INV-1",
            vec![
                sample_line("Paracetamol 500mg", "B-01", 10, 59000),
                sample_line("Cough Syrup", "B-07", 5, 59000),
            ],
        );

        let text = export_to_string(&[invoice]);
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 3); // header + 2 lines
        assert!(rows[0].starts_with("Invoice Number,Date,Customer Name"));
        assert!(rows[1].contains("INV-1"));
        assert!(rows[1].contains("Paracetamol 500mg"));
        assert!(rows[2].contains("Cough Syrup"));
        // Invoice-level columns repeat on each row
        assert!(rows[1].contains("1180.00") && rows[2].contains("1180.00"));
    }

    #[test]
    fn test_export_empty_invoice_emits_sentinel() {
        let invoice = sample_invoice("INV-9", vec![]);
        let text = export_to_string(&[invoice]);
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].contains(NO_ITEMS_SENTINEL));
    }

    #[test]
    fn test_import_groups_rows_by_invoice_number() {
        let invoices = vec![
            sample_invoice(
                "INV-1",
                vec![
                    sample_line("Paracetamol 500mg", "B-01", 10, 59000),
                    sample_line("Cough Syrup", "B-07", 5, 59000),
                ],
            ),
            sample_invoice("INV-2", vec![sample_line("Bandage", "B-11", 1, 118000)]),
        ];
        let text = export_to_string(&invoices);

        let result = import_invoices(text.as_bytes()).unwrap();
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(result.invoices.len(), 2);

        let inv1 = &result.invoices[0];
        assert_eq!(inv1.number, "INV-1");
        assert_eq!(inv1.lines.len(), 2);
        // Lines come back in row order
        assert_eq!(inv1.lines[0].line.product_name, "Paracetamol 500mg");
        assert_eq!(inv1.lines[1].line.product_name, "Cough Syrup");

        assert_eq!(result.invoices[1].number, "INV-2");
        assert_eq!(result.invoices[1].lines.len(), 1);
    }

    #[test]
    fn test_import_round_trips_totals() {
        let invoice = sample_invoice("INV-1", vec![sample_line("Paracetamol 500mg", "B-01", 10, 118000)]);
        let text = export_to_string(&[invoice]);

        let result = import_invoices(text.as_bytes()).unwrap();
        let totals = &result.invoices[0].totals;
        assert_eq!(totals.subtotal.cents(), 118000);
        assert_eq!(totals.grand_total.cents(), 118000);
        assert_eq!(totals.tax.cents(), 18000);
        assert_eq!(totals.cgst().cents(), 9000);
        assert_eq!(totals.sgst().cents(), 9000);
        assert_eq!(totals.base_value.cents(), 100000);
        assert_eq!(totals.loyalty_coins, 10);
        assert!(!totals.has_mixed_tax_rates());
        // The uniform slab is derivable from tax over base
        match totals.tax_breakdown {
            TaxBreakdown::Uniform { rate, .. } => assert_eq!(rate.bps(), 1800),
            TaxBreakdown::Mixed { .. } => panic!("expected uniform breakdown"),
        }
    }

    #[test]
    fn test_import_sentinel_contributes_no_lines() {
        let invoices = vec![
            sample_invoice("INV-9", vec![]),
            sample_invoice("INV-1", vec![sample_line("Bandage", "B-11", 1, 118000)]),
        ];
        let text = export_to_string(&invoices);

        let result = import_invoices(text.as_bytes()).unwrap();
        assert_eq!(result.invoices.len(), 2);
        assert_eq!(result.invoices[0].number, "INV-9");
        assert!(result.invoices[0].lines.is_empty());
        assert_eq!(result.invoices[1].lines.len(), 1);
    }

    #[test]
    fn test_import_skips_malformed_rows_with_warning() {
        let invoice = sample_invoice("INV-1", vec![sample_line("Bandage", "B-11", 1, 118000)]);
        let mut text = export_to_string(&[invoice]);
        // A second row for INV-1 with garbage in the quantity column
        text.push_str("INV-1,2026-08-15 10:30:00,Asha Rao,asha@example.com,9876543210,UPI,walk-in,1180.00,0.00,90.00,90.00,180.00,1180.00,Gauze,3005,B-12,First Aid,lots,10.00,0,10.00\n");

        let result = import_invoices(text.as_bytes()).unwrap();
        assert_eq!(result.invoices.len(), 1);
        assert_eq!(result.invoices[0].lines.len(), 1); // bad row skipped
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("bad quantity"));
    }

    #[test]
    fn test_import_rejects_missing_column() {
        let text = "Invoice Number,Date\nINV-1,2026-08-15 10:30:00\n";
        let err = import_invoices(text.as_bytes()).unwrap_err();
        assert!(matches!(err, ExportError::MissingColumn(_)));
    }

    #[test]
    fn test_money_field_round_trip() {
        assert_eq!(parse_money("1180.00").unwrap().cents(), 118000);
        assert_eq!(parse_money("1180.5").unwrap().cents(), 118050);
        assert_eq!(parse_money("1180").unwrap().cents(), 118000);
        assert_eq!(parse_money("-5.50").unwrap().cents(), -550);
        assert_eq!(parse_money("").unwrap().cents(), 0);
        assert!(parse_money("12.345").is_err());
        assert!(parse_money("abc").is_err());

        assert_eq!(format_money(Money::from_cents(118050)), "1180.50");
        assert_eq!(format_money(Money::from_cents(-550)), "-5.50");
    }

    #[test]
    fn test_percent_field_round_trip() {
        assert_eq!(format_percent(Rate::from_bps(500)), "5");
        assert_eq!(format_percent(Rate::from_bps(1275)), "12.75");
        assert_eq!(parse_percent("5").unwrap().bps(), 500);
        assert_eq!(parse_percent("12.75").unwrap().bps(), 1275);
        assert_eq!(parse_percent("").unwrap().bps(), 0);
        assert!(parse_percent("150").is_err());
    }
}
