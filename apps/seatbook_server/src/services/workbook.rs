// apps/seatbook_server/src/services/workbook.rs

//! Renders a `seatbook::Workbook` as an .xlsx file.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, XlsxError};
use seatbook::report::SHEET_HEADER;
use seatbook::{OrderReportRow, Workbook};

fn money(value: Decimal) -> f64 {
  value.to_f64().unwrap_or_default()
}

fn write_row(sheet: &mut rust_xlsxwriter::Worksheet, row_idx: u32, row: &OrderReportRow) -> Result<(), XlsxError> {
  sheet.write_string(row_idx, 0, row.order_id.to_string())?;
  sheet.write_string(row_idx, 1, row.date_display())?;
  sheet.write_string(row_idx, 2, &row.customer_name)?;
  sheet.write_string(row_idx, 3, &row.customer_phone)?;
  sheet.write_string(row_idx, 4, &row.meal_name)?;
  sheet.write_number(row_idx, 5, money(row.amount))?;
  sheet.write_number(row_idx, 6, money(row.admin_fee))?;
  sheet.write_number(row_idx, 7, money(row.total))?;
  sheet.write_string(row_idx, 8, row.status.as_str())?;
  sheet.write_string(row_idx, 9, row.payment_method_display())?;
  sheet.write_string(row_idx, 10, row.proof_display())?;
  Ok(())
}

/// One worksheet per sheet in `workbook`, in order, each with a bold header row.
pub fn render_xlsx(workbook: &Workbook) -> anyhow::Result<Vec<u8>> {
  let mut xlsx = XlsxWorkbook::new();
  let header_format = Format::new().set_bold();

  for sheet in &workbook.sheets {
    let worksheet = xlsx.add_worksheet();
    worksheet.set_name(&sheet.name)?;
    for (col, title) in SHEET_HEADER.iter().enumerate() {
      worksheet.write_string_with_format(0, col as u16, *title, &header_format)?;
    }
    for (i, row) in sheet.rows.iter().enumerate() {
      write_row(worksheet, i as u32 + 1, row)?;
    }
    worksheet.set_column_width(0, 38)?;
    worksheet.set_column_width(1, 17)?;
  }

  Ok(xlsx.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use rust_decimal_macros::dec;
  use seatbook::{OrderStatus, Sheet};
  use uuid::Uuid;

  #[test]
  fn renders_a_zip_container_with_every_sheet() {
    let event_id = Uuid::new_v4();
    let row = OrderReportRow {
      order_id: Uuid::new_v4(),
      event_id,
      created_at: Utc::now(),
      customer_name: "Aisyah".to_string(),
      customer_phone: "+60 12-345 6789".to_string(),
      event_title: "Charity Dinner".to_string(),
      meal_name: "Chicken Rice".to_string(),
      amount: dec!(50),
      admin_fee: dec!(1),
      total: dec!(51),
      status: OrderStatus::Paid,
      payment_method: None,
      proof_reference: None,
    };
    let workbook = Workbook {
      sheets: vec![
        Sheet {
          event_id,
          name: "Charity Dinner".to_string(),
          rows: vec![row],
        },
        Sheet {
          event_id: Uuid::new_v4(),
          name: "Quiet Evening".to_string(),
          rows: Vec::new(),
        },
      ],
    };

    let bytes = render_xlsx(&workbook).unwrap();

    assert!(bytes.starts_with(b"PK"));
  }
}
