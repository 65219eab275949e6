//! Row extraction from uploaded spreadsheets.
//!
//! The worker only depends on [`RowExtractor`]. [`SpreadsheetExtractor`] is
//! the default implementation: first worksheet of an xls/xlsx/ods workbook
//! (via calamine) or a CSV file, with the header row mapped onto the known
//! record fields.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use serde_json::{Map, Value};
use thiserror::Error;

/// One spreadsheet row with cells mapped to record fields.
///
/// Every field is optional; amounts are kept as text and parsed later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub docno: Option<String>,
    pub docname: Option<String>,
    pub registrationdate: Option<String>,
    pub dateofexecution: Option<String>,
    pub purchasername: Option<String>,
    pub sellername: Option<String>,
    pub propertydescription: Option<String>,
    pub areaname: Option<String>,
    pub sroname: Option<String>,
    pub consideration_amt: Option<String>,
    pub marketvalue: Option<String>,
    /// JSON object of every non-empty cell keyed by its header.
    pub raw_payload: Option<String>,
}

pub type RowIter = Box<dyn Iterator<Item = RawRow> + Send>;

/// Failure to read a whole file. Individual bad rows never produce one.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported spreadsheet type '{0}'")]
    UnsupportedFormat(String),

    #[error("Failed to open workbook '{path}': {reason}")]
    Workbook { path: PathBuf, reason: String },

    #[error("Workbook '{0}' has no worksheets")]
    NoWorksheet(PathBuf),

    #[error("Failed to read CSV '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Produces the rows of one file. Calling `extract` again restarts from the
/// first row.
pub trait RowExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<RowIter, ExtractError>;
}

/// Record field a spreadsheet column maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    DocNo,
    DocName,
    RegistrationDate,
    DateOfExecution,
    PurchaserName,
    SellerName,
    PropertyDescription,
    AreaName,
    SroName,
    ConsiderationAmt,
    MarketValue,
}

impl Field {
    /// Matches a header after lowercasing and dropping spaces, `_`, `-` and `.`.
    fn from_header(header: &str) -> Option<Self> {
        let key: String = header
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-' | '.'))
            .flat_map(char::to_lowercase)
            .collect();

        let field = match key.as_str() {
            "docno" | "documentno" | "documentnumber" => Field::DocNo,
            "docname" | "documentname" | "documenttype" => Field::DocName,
            "registrationdate" | "regdate" | "dateofregistration" => Field::RegistrationDate,
            "dateofexecution" | "executiondate" => Field::DateOfExecution,
            "purchasername" | "purchaser" | "purchaserparty" | "buyername" | "buyer" => {
                Field::PurchaserName
            }
            "sellername" | "seller" | "sellerparty" => Field::SellerName,
            "propertydescription" | "description" | "property" => Field::PropertyDescription,
            "areaname" | "area" | "village" => Field::AreaName,
            "sroname" | "sro" | "subregistraroffice" => Field::SroName,
            "considerationamt" | "considerationamount" | "consideration" => {
                Field::ConsiderationAmt
            }
            "marketvalue" | "marketvalueamt" => Field::MarketValue,
            _ => return None,
        };
        Some(field)
    }
}

/// Header layout shared by every row of a sheet.
#[derive(Debug, Clone)]
struct HeaderMap {
    names: Vec<String>,
    fields: Vec<Option<Field>>,
}

impl HeaderMap {
    fn new(names: Vec<String>) -> Self {
        let fields = names.iter().map(|n| Field::from_header(n)).collect();
        Self { names, fields }
    }

    /// Builds a row from cell texts, `None` when every cell is empty.
    fn build_row<I>(&self, cells: I) -> Option<RawRow>
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let mut row = RawRow::default();
        let mut payload = Map::new();

        for (idx, cell) in cells.into_iter().enumerate() {
            let Some(text) = cell.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()) else {
                continue;
            };

            let header = self
                .names
                .get(idx)
                .filter(|h| !h.is_empty())
                .cloned()
                .unwrap_or_else(|| format!("column_{}", idx + 1));
            payload.insert(header, Value::String(text.clone()));

            let slot = match self.fields.get(idx).copied().flatten() {
                Some(Field::DocNo) => &mut row.docno,
                Some(Field::DocName) => &mut row.docname,
                Some(Field::RegistrationDate) => &mut row.registrationdate,
                Some(Field::DateOfExecution) => &mut row.dateofexecution,
                Some(Field::PurchaserName) => &mut row.purchasername,
                Some(Field::SellerName) => &mut row.sellername,
                Some(Field::PropertyDescription) => &mut row.propertydescription,
                Some(Field::AreaName) => &mut row.areaname,
                Some(Field::SroName) => &mut row.sroname,
                Some(Field::ConsiderationAmt) => &mut row.consideration_amt,
                Some(Field::MarketValue) => &mut row.marketvalue,
                None => continue,
            };
            // First matching column wins when a header alias repeats.
            if slot.is_none() {
                *slot = Some(text);
            }
        }

        if payload.is_empty() {
            return None;
        }
        row.raw_payload = Some(Value::Object(payload).to_string());
        Some(row)
    }
}

/// Converts a workbook cell to display text.
fn cell_to_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                Some(format!("{}", *f as i64))
            } else {
                Some(f.to_string())
            }
        }
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) if value.time() == chrono::NaiveTime::MIN => {
                Some(value.format("%Y-%m-%d").to_string())
            }
            Some(value) => Some(value.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Some(dt.as_f64().to_string()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

/// Reads `.xls`, `.xlsx`, `.xlsm`, `.ods` and `.csv` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetExtractor;

impl SpreadsheetExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_workbook(path: &Path) -> Result<RowIter, ExtractError> {
        let mut workbook = open_workbook_auto(path).map_err(|e| ExtractError::Workbook {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ExtractError::NoWorksheet(path.to_path_buf()))?
            .map_err(|e| ExtractError::Workbook {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let (height, width) = range.get_size();
        if height == 0 {
            return Ok(Box::new(std::iter::empty()));
        }

        let headers = HeaderMap::new(
            (0..width)
                .map(|c| {
                    range
                        .get((0, c))
                        .and_then(cell_to_text)
                        .map(|h| h.trim().to_string())
                        .unwrap_or_default()
                })
                .collect(),
        );

        Ok(Box::new((1..height).filter_map(move |r| {
            headers.build_row((0..width).map(|c| range.get((r, c)).and_then(cell_to_text)))
        })))
    }

    fn extract_csv(path: &Path) -> Result<RowIter, ExtractError> {
        let csv_err = |source| ExtractError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(csv_err)?;

        let headers = HeaderMap::new(
            reader
                .headers()
                .map_err(csv_err)?
                .iter()
                .map(str::to_string)
                .collect(),
        );

        let source = path.display().to_string();
        Ok(Box::new(reader.into_records().filter_map(move |record| {
            match record {
                Ok(record) => headers.build_row(record.iter().map(|c| Some(c.to_string()))),
                Err(e) => {
                    log::debug!("Skipping malformed CSV row in {}: {}", source, e);
                    None
                }
            }
        })))
    }
}

impl RowExtractor for SpreadsheetExtractor {
    fn extract(&self, path: &Path) -> Result<RowIter, ExtractError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Self::extract_csv(path),
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Self::extract_workbook(path),
            other => Err(ExtractError::UnsupportedFormat(other.to_string())),
        }
    }
}
