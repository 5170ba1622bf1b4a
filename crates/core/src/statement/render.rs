//! PDF rendering of account statements.
//!
//! The renderer is a pure function of its input: the same account, entries,
//! period and generation time always produce the same bytes. Pages are A4
//! portrait with 40pt margins and use the standard Helvetica faces, so no
//! font data is embedded.

use chrono::{NaiveDate, NaiveDateTime};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use thiserror::Error;

use egabank_shared::AppError;
use egabank_shared::types::money::{format_amount, format_with_currency};

use crate::account::{Account, format_identifier};
use crate::ledger::{LedgerEntry, Period};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 40;
const CONTENT_WIDTH: i64 = PAGE_WIDTH - 2 * MARGIN;
const ROW_HEIGHT: i64 = 18;
const BANNER_HEIGHT: i64 = 70;
/// Space kept free at the bottom of each page for the footer.
const FOOTER_SPACE: i64 = 50;
/// Space needed below the last row for the summary block.
const SUMMARY_SPACE: i64 = 60;

/// Bank name printed in the banner.
pub const BANK_NAME: &str = "EGA BANK";
/// Document subtitle.
pub const TITLE: &str = "Account Statement";
/// Text of the row shown when the period has no entries.
pub const EMPTY_PERIOD: &str = "No transactions for this period";
const DISCLAIMER: &str =
    "This statement is generated automatically and is valid without signature.";

const COLUMNS: [(&str, i64); 5] = [
    ("Date", MARGIN + 5),
    ("Operation", MARGIN + 105),
    ("Amount", MARGIN + 230),
    ("Balance before", MARGIN + 335),
    ("Balance after", MARGIN + 430),
];

/// Failure while building or serializing the document.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Page content could not be encoded.
    #[error("failed to encode page content: {0}")]
    Content(String),

    /// The document could not be written out.
    #[error("failed to write document: {0}")]
    Write(String),
}

impl From<RenderError> for AppError {
    fn from(error: RenderError) -> Self {
        Self::StatementGeneration(error.to_string())
    }
}

/// Everything printed on a statement.
#[derive(Debug, Clone, Copy)]
pub struct StatementInput<'a> {
    /// Account holder's full name.
    pub holder: &'a str,
    /// Account as of generation time.
    pub account: &'a Account,
    /// Covered period.
    pub period: Period,
    /// Entries within the period, oldest first.
    pub entries: &'a [LedgerEntry],
    /// Generation timestamp printed in the footer.
    pub generated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy)]
enum Face {
    Regular,
    Bold,
}

impl Face {
    const fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Color {
    Ink,
    Muted,
    White,
    Banner,
    HeaderFill,
    EmptyFill,
    Credit,
    Debit,
}

impl Color {
    fn components(self) -> Vec<Object> {
        let (r, g, b) = match self {
            Self::Ink => (Object::Real(0.13), Object::Real(0.13), Object::Real(0.13)),
            Self::Muted => (Object::Real(0.45), Object::Real(0.45), Object::Real(0.45)),
            Self::White => (Object::Real(1.0), Object::Real(1.0), Object::Real(1.0)),
            Self::Banner => (Object::Real(0.05), Object::Real(0.28), Object::Real(0.55)),
            Self::HeaderFill => (Object::Real(0.86), Object::Real(0.90), Object::Real(0.95)),
            Self::EmptyFill => (Object::Real(0.96), Object::Real(0.96), Object::Real(0.96)),
            Self::Credit => (Object::Real(0.10), Object::Real(0.55), Object::Real(0.20)),
            Self::Debit => (Object::Real(0.78), Object::Real(0.12), Object::Real(0.12)),
        };
        vec![r, g, b]
    }
}

/// Encodes text for a WinAnsi Helvetica font. Characters outside Latin-1
/// become `?`.
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn date(day: NaiveDate) -> String {
    day.format("%d/%m/%Y").to_string()
}

/// Drawing operations for one page.
#[derive(Default)]
struct Page {
    ops: Vec<Operation>,
}

impl Page {
    fn text(&mut self, face: Face, size: i64, color: Color, x: i64, y: i64, text: &str) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new("rg", color.components()));
        self.ops.push(Operation::new(
            "Tf",
            vec![face.resource().into(), size.into()],
        ));
        self.ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        self.ops
            .push(Operation::new("Tj", vec![Object::string_literal(latin1(text))]));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn fill(&mut self, color: Color, x: i64, y: i64, width: i64, height: i64) {
        self.ops.push(Operation::new("rg", color.components()));
        self.ops.push(Operation::new(
            "re",
            vec![x.into(), y.into(), width.into(), height.into()],
        ));
        self.ops.push(Operation::new("f", vec![]));
    }

    fn rule(&mut self, y: i64) {
        self.ops.push(Operation::new("RG", Color::Muted.components()));
        self.ops.push(Operation::new("w", vec![Object::Real(0.5)]));
        self.ops.push(Operation::new("m", vec![MARGIN.into(), y.into()]));
        self.ops
            .push(Operation::new("l", vec![(PAGE_WIDTH - MARGIN).into(), y.into()]));
        self.ops.push(Operation::new("S", vec![]));
    }

    fn table_header(&mut self, y: i64) {
        self.fill(Color::HeaderFill, MARGIN, y - 5, CONTENT_WIDTH, ROW_HEIGHT);
        for (title, x) in COLUMNS {
            self.text(Face::Bold, 10, Color::Ink, x, y, title);
        }
    }

    fn entry_row(&mut self, y: i64, entry: &LedgerEntry) {
        let amount_color = if entry.kind.is_credit() {
            Color::Credit
        } else {
            Color::Debit
        };
        let cells = [
            (entry.occurred_at.format("%d/%m/%Y %H:%M").to_string(), Color::Ink),
            (entry.kind.label().to_string(), Color::Ink),
            (format_with_currency(entry.amount), amount_color),
            (format_amount(entry.balance_before), Color::Ink),
            (format_amount(entry.balance_after), Color::Ink),
        ];
        for ((text, color), (_, x)) in cells.iter().zip(COLUMNS) {
            self.text(Face::Regular, 9, *color, x, y, text);
        }
    }
}

/// Top of the table area on continuation pages.
const CONTINUATION_TOP: i64 = PAGE_HEIGHT - MARGIN - 10;

fn first_page(input: &StatementInput<'_>) -> (Page, i64) {
    let mut page = Page::default();
    page.fill(
        Color::Banner,
        0,
        PAGE_HEIGHT - BANNER_HEIGHT,
        PAGE_WIDTH,
        BANNER_HEIGHT,
    );
    page.text(Face::Bold, 22, Color::White, MARGIN, PAGE_HEIGHT - 45, BANK_NAME);
    page.text(Face::Bold, 14, Color::Ink, MARGIN, PAGE_HEIGHT - 100, TITLE);

    let account = input.account;
    let lines = [
        format!("Holder: {}", input.holder),
        format!("Account: {}", format_identifier(&account.identifier)),
        format!("Type: {}", account.kind.label()),
        format!(
            "Period: {} - {}",
            date(input.period.start),
            date(input.period.end)
        ),
    ];
    let mut y = PAGE_HEIGHT - 125;
    for line in &lines {
        page.text(Face::Regular, 10, Color::Ink, MARGIN, y, line);
        y -= 16;
    }

    y -= 20;
    page.table_header(y);
    (page, y - ROW_HEIGHT)
}

fn footer(page: &mut Page, generated_at: NaiveDateTime, number: usize, count: usize) {
    page.rule(MARGIN + 28);
    page.text(
        Face::Regular,
        8,
        Color::Muted,
        MARGIN,
        MARGIN + 15,
        &format!("Generated on {}", generated_at.format("%d/%m/%Y %H:%M:%S")),
    );
    page.text(Face::Regular, 8, Color::Muted, MARGIN, MARGIN + 3, DISCLAIMER);
    page.text(
        Face::Regular,
        8,
        Color::Muted,
        PAGE_WIDTH - MARGIN - 50,
        MARGIN + 15,
        &format!("Page {number} / {count}"),
    );
}

fn layout(input: &StatementInput<'_>) -> Vec<Page> {
    let (mut page, mut y) = first_page(input);
    let mut pages = Vec::new();

    if input.entries.is_empty() {
        page.fill(Color::EmptyFill, MARGIN, y - 5, CONTENT_WIDTH, ROW_HEIGHT);
        page.text(
            Face::Regular,
            9,
            Color::Muted,
            MARGIN + CONTENT_WIDTH / 2 - 70,
            y,
            EMPTY_PERIOD,
        );
        y -= ROW_HEIGHT;
    }

    for entry in input.entries {
        if y < MARGIN + FOOTER_SPACE {
            pages.push(std::mem::take(&mut page));
            page.table_header(CONTINUATION_TOP);
            y = CONTINUATION_TOP - ROW_HEIGHT;
        }
        page.entry_row(y, entry);
        y -= ROW_HEIGHT;
    }

    if y - SUMMARY_SPACE < MARGIN + FOOTER_SPACE {
        pages.push(std::mem::take(&mut page));
        y = CONTINUATION_TOP;
    }
    y -= 5;
    page.rule(y + ROW_HEIGHT - 5);
    page.text(
        Face::Regular,
        10,
        Color::Ink,
        MARGIN,
        y - 10,
        &format!("Number of operations: {}", input.entries.len()),
    );
    page.text(
        Face::Bold,
        11,
        Color::Ink,
        MARGIN,
        y - 28,
        &format!("Current balance: {}", format_with_currency(input.account.balance)),
    );
    pages.push(page);

    let count = pages.len();
    for (index, page) in pages.iter_mut().enumerate() {
        footer(page, input.generated_at, index + 1, count);
    }
    pages
}

/// Renders a statement to PDF bytes.
///
/// # Errors
///
/// Returns `RenderError` if a page cannot be encoded or the document cannot
/// be serialized.
pub fn render(input: &StatementInput<'_>) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            Face::Regular.resource() => regular_id,
            Face::Bold.resource() => bold_id,
        },
    });

    let mut kids = Vec::new();
    for page in layout(input) {
        let content = Content { operations: page.ops }
            .encode()
            .map_err(|e| RenderError::Content(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    let count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| RenderError::Write(e.to_string()))?;
    Ok(bytes)
}
