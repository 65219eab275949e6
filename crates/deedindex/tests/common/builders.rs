//! Builders for spreadsheet fixtures.
//!
//! Rows are described with [`DeedRow`] and rendered to the bytes of a CSV or
//! XLSX upload, so tests exercise the same extraction path as real uploads.

#![allow(dead_code)]

use rust_xlsxwriter::Workbook;

pub const HEADERS: &[&str] = &[
    "Doc No",
    "Doc Name",
    "Registration Date",
    "Date of Execution",
    "Purchaser Name",
    "Seller Name",
    "Property Description",
    "Area Name",
    "SRO Name",
    "Consideration Amt",
    "Market Value",
];

/// One registry entry as it appears in an uploaded sheet.
#[derive(Debug, Clone, Default)]
pub struct DeedRow {
    cells: [String; 11],
}

impl DeedRow {
    pub fn new(docno: &str) -> Self {
        let mut row = Self::default();
        row.cells[0] = docno.to_string();
        row
    }

    pub fn docname(mut self, value: &str) -> Self {
        self.cells[1] = value.to_string();
        self
    }

    pub fn registered(mut self, value: &str) -> Self {
        self.cells[2] = value.to_string();
        self
    }

    pub fn executed(mut self, value: &str) -> Self {
        self.cells[3] = value.to_string();
        self
    }

    pub fn purchaser(mut self, value: &str) -> Self {
        self.cells[4] = value.to_string();
        self
    }

    pub fn seller(mut self, value: &str) -> Self {
        self.cells[5] = value.to_string();
        self
    }

    pub fn property(mut self, value: &str) -> Self {
        self.cells[6] = value.to_string();
        self
    }

    pub fn area(mut self, value: &str) -> Self {
        self.cells[7] = value.to_string();
        self
    }

    pub fn sro(mut self, value: &str) -> Self {
        self.cells[8] = value.to_string();
        self
    }

    /// Raw amount text, e.g. `"1,50,000"`.
    pub fn consideration(mut self, value: &str) -> Self {
        self.cells[9] = value.to_string();
        self
    }

    pub fn market_value(mut self, value: &str) -> Self {
        self.cells[10] = value.to_string();
        self
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }
}

/// `count` sale deeds bought by `purchaser`, numbered from `first`.
pub fn sale_deeds(purchaser: &str, first: usize, count: usize) -> Vec<DeedRow> {
    (first..first + count)
        .map(|i| {
            DeedRow::new(&format!("{}/2024", i))
                .docname("Sale Deed")
                .registered("2024-01-15")
                .purchaser(purchaser)
                .seller("Land Holdings Ltd")
                .consideration("1,00,000")
        })
        .collect()
}

pub fn csv_bytes(rows: &[DeedRow]) -> Vec<u8> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS).expect("write CSV header");
    for row in rows {
        writer.write_record(row.cells()).expect("write CSV row");
    }
    writer.into_inner().expect("flush CSV")
}

pub fn xlsx_bytes(rows: &[DeedRow]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, header) in HEADERS.iter().enumerate() {
        sheet
            .write_string(0, col as u16, *header)
            .expect("write XLSX header");
    }
    for (r, row) in rows.iter().enumerate() {
        for (col, cell) in row.cells().iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            sheet
                .write_string((r + 1) as u32, col as u16, cell.as_str())
                .expect("write XLSX cell");
        }
    }

    workbook.save_to_buffer().expect("render XLSX")
}

/// Bytes with an `.xlsx` name that no workbook reader accepts.
pub fn corrupt_xlsx_bytes() -> Vec<u8> {
    b"PK\x03\x04 this is not a real workbook".to_vec()
}
