//! Downloads of the user's expense history as CSV, an Excel workbook or PDF.

use std::{
    io::BufWriter,
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Redirect, Response},
};
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerIndex,
    PdfPageIndex, Point,
};
use rusqlite::Connection;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use time::{OffsetDateTime, UtcOffset, macros::format_description};
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    AppState, Error,
    auth::{UserID, get_user_by_id},
    endpoints,
    expense::{Expense, format_expense_date, get_expenses, round_to_cents},
    html::format_currency,
    timezone::local_now,
};

/// The file types expenses can be exported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Excel,
    Pdf,
}

impl ExportFormat {
    fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }

    fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(ExportFormat::Csv),
            "excel" => Ok(ExportFormat::Excel),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(format!("unsupported export format {other:?}")),
        }
    }
}

/// The name of the downloaded file, e.g. "expenses_20250618.csv".
pub fn export_file_name(format: ExportFormat, today: OffsetDateTime) -> String {
    let date = today
        .format(format_description!("[year][month][day]"))
        .unwrap_or_else(|error| {
            tracing::error!("Could not format export date: {error}");
            "export".to_owned()
        });

    format!("expenses_{date}.{}", format.extension())
}

const EXPORT_HEADER: [&str; 5] = ["Date", "Item", "Category", "Amount", "Original Text"];

/// Write expenses as CSV with a header row, dates in the local timezone.
pub fn expenses_to_csv(expenses: &[Expense], local_offset: UtcOffset) -> Result<Vec<u8>, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(EXPORT_HEADER)
        .map_err(|error| Error::ExportError(error.to_string()))?;

    for expense in expenses {
        writer
            .write_record([
                format_expense_date(expense, local_offset),
                expense.item.clone(),
                expense.category_label().to_owned(),
                format!("{:.2}", expense.amount),
                expense.raw_text.clone(),
            ])
            .map_err(|error| Error::ExportError(error.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|error| Error::ExportError(error.to_string()))
}

/// The name of the worksheet in the Excel export.
pub const EXCEL_SHEET_NAME: &str = "Expenses";

#[derive(Debug, Clone, PartialEq)]
enum SheetCell {
    Text(String),
    Number(f64),
}

/// The header row followed by one row per expense.
fn spreadsheet_rows(expenses: &[Expense], local_offset: UtcOffset) -> Vec<Vec<SheetCell>> {
    let header = EXPORT_HEADER
        .iter()
        .map(|title| SheetCell::Text((*title).to_owned()))
        .collect();

    let rows = expenses.iter().map(|expense| {
        vec![
            SheetCell::Text(format_expense_date(expense, local_offset)),
            SheetCell::Text(expense.item.clone()),
            SheetCell::Text(expense.category_label().to_owned()),
            SheetCell::Number(expense.amount),
            SheetCell::Text(expense.raw_text.clone()),
        ]
    });

    std::iter::once(header).chain(rows).collect()
}

fn xlsx_error(error: XlsxError) -> Error {
    Error::ExportError(error.to_string())
}

/// Write expenses to a single "Expenses" worksheet with a bold header row.
pub fn expenses_to_xlsx(expenses: &[Expense], local_offset: UtcOffset) -> Result<Vec<u8>, Error> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let amount_format = Format::new().set_num_format("0.00");

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXCEL_SHEET_NAME).map_err(xlsx_error)?;

    for (row, cells) in (0u32..).zip(spreadsheet_rows(expenses, local_offset)) {
        for (column, cell) in (0u16..).zip(cells) {
            let written = match cell {
                SheetCell::Text(text) if row == 0 => {
                    worksheet.write_string_with_format(row, column, text, &header_format)
                }
                SheetCell::Text(text) => worksheet.write_string(row, column, text),
                SheetCell::Number(number) => {
                    worksheet.write_number_with_format(row, column, number, &amount_format)
                }
            };
            written.map_err(xlsx_error)?;
        }
    }

    workbook.save_to_buffer().map_err(xlsx_error)
}

// A4 page in millimetres.
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const ROW_HEIGHT: f32 = 6.0;
const FONT_SIZE: f32 = 9.0;
const TITLE_SIZE: f32 = 16.0;
// Column offsets from the left margin: date, item, category, amount (right aligned).
const COLUMNS: [f32; 4] = [0.0, 32.0, 100.0, 170.0];
const MAX_ITEM_GRAPHEMES: usize = 38;

fn approx_text_width(text: &str, size: f32) -> f32 {
    text.graphemes(true).count() as f32 * size * 0.18
}

/// Shorten `text` to at most `max_graphemes` user-perceived characters,
/// ending with "..." if anything was cut.
fn truncate(text: &str, max_graphemes: usize) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();

    if graphemes.len() <= max_graphemes {
        return text.to_owned();
    }

    let keep = max_graphemes.saturating_sub(3);
    let mut truncated = graphemes[..keep].concat();
    truncated.push_str("...");
    truncated
}

fn pdf_error(error: impl std::fmt::Debug) -> Error {
    Error::ExportError(format!("{error:?}"))
}

/// Lays out rows of text top to bottom, starting new pages as needed.
struct ReportWriter {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    page: PdfPageIndex,
    layer: PdfLayerIndex,
    // Distance from the top of the page.
    y: f32,
}

impl ReportWriter {
    fn new(title: &str) -> Result<Self, Error> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;

        Ok(Self {
            doc,
            font,
            font_bold,
            page,
            layer,
            y: MARGIN,
        })
    }

    fn text(&self, text: &str, x: f32, size: f32, bold: bool) {
        let font = if bold { &self.font_bold } else { &self.font };

        self.doc
            .get_page(self.page)
            .get_layer(self.layer)
            .use_text(text, size, Mm(x), Mm(PAGE_HEIGHT - self.y), font);
    }

    fn text_right(&self, text: &str, right: f32, size: f32, bold: bool) {
        self.text(text, right - approx_text_width(text, size), size, bold);
    }

    fn rule(&self) {
        let layer = self.doc.get_page(self.page).get_layer(self.layer);
        layer.set_outline_thickness(0.5);
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(PAGE_HEIGHT - self.y)), false),
                (
                    Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(PAGE_HEIGHT - self.y)),
                    false,
                ),
            ],
            is_closed: false,
        });
    }

    fn ensure_space(&mut self, needed: f32) {
        if self.y + needed > PAGE_HEIGHT - MARGIN {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.page = page;
            self.layer = layer;
            self.y = MARGIN;
        }
    }

    fn row(&mut self, cells: [&str; 4], bold: bool) {
        self.ensure_space(ROW_HEIGHT);

        for (cell, offset) in cells.iter().zip(COLUMNS).take(3) {
            self.text(cell, MARGIN + offset, FONT_SIZE, bold);
        }
        self.text_right(cells[3], PAGE_WIDTH - MARGIN, FONT_SIZE, bold);

        self.y += ROW_HEIGHT;
    }

    fn into_bytes(self) -> Result<Vec<u8>, Error> {
        let mut buffer = BufWriter::new(Vec::new());
        self.doc.save(&mut buffer).map_err(pdf_error)?;

        buffer
            .into_inner()
            .map_err(|error| Error::ExportError(error.to_string()))
    }
}

/// Render an expense report for `username` listing every expense and the total.
pub fn expenses_to_pdf(
    expenses: &[Expense],
    username: &str,
    generated_at: OffsetDateTime,
    local_offset: UtcOffset,
) -> Result<Vec<u8>, Error> {
    let mut report = ReportWriter::new("Expense Report")?;

    report.text("Expense Report", MARGIN, TITLE_SIZE, true);
    report.y += 8.0;
    let generated = generated_at
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .map_err(|error| Error::ExportError(error.to_string()))?;
    report.text(
        &format!("{username}, generated {generated}"),
        MARGIN,
        FONT_SIZE,
        false,
    );
    report.y += ROW_HEIGHT;
    report.rule();
    report.y += ROW_HEIGHT;

    report.row(["Date", "Item", "Category", "Amount"], true);
    report.rule();
    report.y += 2.0;

    for expense in expenses {
        let date = format_expense_date(expense, local_offset);
        let item = truncate(&expense.item, MAX_ITEM_GRAPHEMES);
        let amount = format_currency(expense.amount);

        report.row(
            [
                date.as_str(),
                item.as_str(),
                expense.category_label(),
                amount.as_str(),
            ],
            false,
        );
    }

    let total = round_to_cents(expenses.iter().map(|expense| expense.amount).sum());
    report.ensure_space(ROW_HEIGHT * 2.0);
    report.rule();
    report.y += ROW_HEIGHT;
    let total = format_currency(total);
    report.row(["Total", "", "", total.as_str()], true);

    report.into_bytes()
}

/// The state needed for exporting expenses.
#[derive(Debug, Clone)]
pub struct ExportExpensesState {
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kathmandu".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExportExpensesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Download all of the user's expenses, newest first.
///
/// Unknown formats redirect to the expense history page.
pub async fn export_expenses_endpoint(
    Path(format): Path<String>,
    State(state): State<ExportExpensesState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let Ok(format) = format.parse::<ExportFormat>() else {
        tracing::debug!("Redirecting export with unknown format {format:?}");
        return Ok(Redirect::to(endpoints::EXPENSES_VIEW).into_response());
    };

    let now = local_now(&state.local_timezone)?;

    let (expenses, username) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let expenses = get_expenses(user_id, &connection)?;
        let user = get_user_by_id(user_id, &connection)?;

        (expenses, user.username.to_string())
    };

    let body = match format {
        ExportFormat::Csv => expenses_to_csv(&expenses, now.offset())?,
        ExportFormat::Excel => expenses_to_xlsx(&expenses, now.offset())?,
        ExportFormat::Pdf => expenses_to_pdf(&expenses, &username, now, now.offset())?,
    };

    let content_disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(format, now)
    );

    Ok((
        [
            (CONTENT_TYPE, format.content_type().to_owned()),
            (CONTENT_DISPOSITION, content_disposition),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod export_tests {
    use std::{
        io::Cursor,
        sync::{Arc, Mutex},
    };

    use axum::{
        Extension,
        extract::{Path, State},
        http::{StatusCode, header::CONTENT_DISPOSITION, header::CONTENT_TYPE, header::LOCATION},
    };
    use rusqlite::Connection;
    use time::{OffsetDateTime, UtcOffset, macros::datetime};

    use crate::{
        auth::UserID,
        category::{CategoryName, get_or_create_category},
        db::initialize,
        expense::{Expense, NewExpense, create_expense},
    };

    use super::{
        EXCEL_SHEET_NAME, EXPORT_HEADER, ExportExpensesState, ExportFormat, SheetCell, export_expenses_endpoint,
        export_file_name, expenses_to_csv, expenses_to_pdf, expenses_to_xlsx, spreadsheet_rows,
        truncate,
    };

    fn expense(item: &str, amount: f64, category_name: Option<&str>) -> Expense {
        Expense {
            id: 1,
            user_id: UserID::new(1),
            item: item.to_owned(),
            amount,
            category_id: category_name.map(|_| 1),
            category_name: category_name.map(str::to_owned),
            raw_text: format!("{item}, {amount}"),
            created_at: datetime!(2025-06-18 14:05 UTC),
        }
    }

    #[test]
    fn csv_has_header_and_rows() {
        let expenses = [expense("Burger", 500.0, Some("Food")), expense("Gift", 20.5, None)];

        let csv = expenses_to_csv(&expenses, UtcOffset::UTC).unwrap();

        let csv = String::from_utf8(csv).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(
            lines,
            [
                "Date,Item,Category,Amount,Original Text",
                "2025-06-18 14:05,Burger,Food,500.00,\"Burger, 500\"",
                "2025-06-18 14:05,Gift,Uncategorized,20.50,\"Gift, 20.5\"",
            ]
        );
    }

    #[test]
    fn pdf_is_a_pdf() {
        let expenses: Vec<_> = (0..120)
            .map(|i| expense(&format!("Item number {i} with a rather long name"), 10.0, None))
            .collect();

        let pdf = expenses_to_pdf(
            &expenses,
            "alice",
            datetime!(2025-06-18 14:05 UTC),
            UtcOffset::UTC,
        )
        .unwrap();

        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn file_name_uses_date() {
        let today = datetime!(2025-06-08 23:59 UTC);

        assert_eq!(export_file_name(ExportFormat::Csv, today), "expenses_20250608.csv");
        assert_eq!(export_file_name(ExportFormat::Excel, today), "expenses_20250608.xlsx");
        assert_eq!(export_file_name(ExportFormat::Pdf, today), "expenses_20250608.pdf");
    }

    #[test]
    fn parse_format() {
        assert_eq!("csv".parse(), Ok(ExportFormat::Csv));
        assert_eq!("excel".parse(), Ok(ExportFormat::Excel));
        assert_eq!("pdf".parse(), Ok(ExportFormat::Pdf));
        assert!("xlsx".parse::<ExportFormat>().is_err());
        assert!("doc".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn spreadsheet_has_header_then_rows() {
        let expenses = [expense("Burger", 500.0, Some("Food")), expense("Gift", 20.5, None)];

        let rows = spreadsheet_rows(&expenses, UtcOffset::from_hms(5, 45, 0).unwrap());

        let header: Vec<_> = EXPORT_HEADER
            .iter()
            .map(|title| SheetCell::Text((*title).to_owned()))
            .collect();
        assert_eq!(rows[0], header);
        assert_eq!(
            rows[1],
            [
                SheetCell::Text("2025-06-18 19:50".to_owned()),
                SheetCell::Text("Burger".to_owned()),
                SheetCell::Text("Food".to_owned()),
                SheetCell::Number(500.0),
                SheetCell::Text("Burger, 500".to_owned()),
            ]
        );
        assert_eq!(rows[2][2], SheetCell::Text("Uncategorized".to_owned()));
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn xlsx_has_expenses_sheet_with_header_row() {
        use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};

        let expenses = [expense("Tea", 30.0, Some("Food"))];
        let xlsx = expenses_to_xlsx(&expenses, UtcOffset::UTC).unwrap();

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(xlsx)).unwrap();
        assert_eq!(workbook.sheet_names(), [EXCEL_SHEET_NAME]);
        let range = workbook.worksheet_range(EXCEL_SHEET_NAME).unwrap();
        let rows: Vec<_> = range.rows().collect();
        assert_eq!(rows.len(), 2);
        let header: Vec<_> = rows[0].iter().map(ToString::to_string).collect();
        assert_eq!(header, EXPORT_HEADER);
        assert_eq!(rows[1][1], Data::String("Tea".to_owned()));
        assert_eq!(rows[1][2], Data::String("Food".to_owned()));
        assert_eq!(rows[1][3], Data::Float(30.0));
    }

    #[test]
    fn truncate_keeps_whole_graphemes() {
        assert_eq!(truncate("Tea", 38), "Tea");

        let accented = "e\u{301}".repeat(40);
        let truncated = truncate(&accented, 10);

        assert_eq!(truncated, format!("{}...", "e\u{301}".repeat(7)));

        let flags = "\u{1F1F3}\u{1F1F5}".repeat(5);
        assert_eq!(
            truncate(&flags, 4),
            format!("{}...", "\u{1F1F3}\u{1F1F5}")
        );
    }

    fn get_state() -> ExportExpensesState {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
            .execute_batch(
                "INSERT INTO user (id, username, password) VALUES (1, 'alice', 'hash');
                INSERT INTO user (id, username, password) VALUES (2, 'bob', 'hash');",
            )
            .unwrap();
        let food =
            get_or_create_category(CategoryName::new_unchecked("Food"), &connection).unwrap();
        for (user_id, item) in [(1, "Tea"), (2, "Steak")] {
            create_expense(
                NewExpense {
                    item: item.to_owned(),
                    amount: 30.0,
                    category_id: Some(food.id),
                    raw_text: String::new(),
                },
                UserID::new(user_id),
                OffsetDateTime::now_utc(),
                &connection,
            )
            .unwrap();
        }

        ExportExpensesState {
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    async fn body_text(response: axum::response::Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8_lossy(&body).to_string()
    }

    #[tokio::test]
    async fn csv_download_has_only_own_expenses() {
        let response = export_expenses_endpoint(
            Path("csv".to_owned()),
            State(get_state()),
            Extension(UserID::new(1)),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/csv");
        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned();
        assert!(disposition.starts_with("attachment; filename=\"expenses_"));
        assert!(disposition.ends_with(".csv\""));
        let text = body_text(response).await;
        assert!(text.contains(",Tea,Food,30.00,"));
        assert!(!text.contains("Steak"));
    }

    #[tokio::test]
    async fn pdf_download() {
        let response = export_expenses_endpoint(
            Path("pdf".to_owned()),
            State(get_state()),
            Extension(UserID::new(1)),
        )
        .await
        .unwrap();

        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/pdf");
    }

    #[tokio::test]
    async fn excel_download() {
        let response = export_expenses_endpoint(
            Path("excel".to_owned()),
            State(get_state()),
            Extension(UserID::new(1)),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned();
        assert!(disposition.ends_with(".xlsx\""), "got {disposition}");
    }

    #[tokio::test]
    async fn unknown_format_redirects_to_history() {
        let response = export_expenses_endpoint(
            Path("doc".to_owned()),
            State(get_state()),
            Extension(UserID::new(1)),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/expenses");
    }
}
