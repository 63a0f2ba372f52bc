// Primitives for reading survey responses from Excel workbooks.

use calamine::DataType;

use crate::session::*;

pub fn read_excel_table(path: String, worksheet_name: Option<String>) -> SessionResult<Table> {
    let wrange = get_range(&path, worksheet_name)?;

    let header = wrange
        .rows()
        .next()
        .context(EmptyWorkbookSnafu { path: path.clone() })?;
    debug!("read_excel_table: header: {:?}", header);
    let headers: Vec<String> = header.iter().map(read_header_calamine).collect();

    let mut builder = TableBuilder::new(headers);
    let mut iter = wrange.rows();
    iter.next();
    for row in iter {
        builder.add_row(row.iter().map(read_cell_calamine).collect());
    }
    Ok(builder.build())
}

fn read_header_calamine(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Empty => "".to_string(),
        other => format!("{}", other),
    }
}

fn read_cell_calamine(cell: &DataType) -> Cell {
    match cell {
        DataType::String(s) if s.trim().is_empty() => Cell::Empty,
        DataType::String(s) => Cell::Text(s.clone()),
        DataType::Float(f) => Cell::Num(*f),
        DataType::Int(i) => Cell::Num(*i as f64),
        DataType::Bool(true) => Cell::Num(1.0),
        DataType::Bool(false) => Cell::Num(0.0),
        _ => Cell::Empty,
    }
}

fn get_range(
    path: &String,
    worksheet_name_o: Option<String>,
) -> SessionResult<calamine::Range<DataType>> {
    debug!(
        "read_excel_table: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let p = path.clone();
    let mut workbook: Xlsx<_> =
        open_workbook(p).context(OpeningExcelSnafu { path: path.clone() })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyWorkbookSnafu { path: path.clone() })?
            .context(OpeningExcelSnafu { path: path.clone() })?;

        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => EmptyWorkbookSnafu { path: path.clone() }.fail(),
            [(worksheet_name, wrange)] => {
                debug!(
                    "read_excel_table: path: {:?} worksheet: {:?}",
                    &path, &worksheet_name
                );
                Ok(wrange.clone())
            }
            _ => {
                whatever!(
                    "read_excel_table: several worksheets in {}, the worksheet name must be provided",
                    path
                )
            }
        }
    }
}
