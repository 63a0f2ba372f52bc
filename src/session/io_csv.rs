// Primitives for reading survey responses from CSV files.

use crate::session::*;

pub fn read_csv_table(path: String) -> SessionResult<Table> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path.clone())
        .context(CsvOpenSnafu {})?;

    let mut records = rdr.into_records();
    let header = match records.next() {
        Some(line_r) => line_r.context(CsvLineParseSnafu {})?,
        None => whatever!("read_csv_table: no header row in {}", path),
    };
    let headers: Vec<String> = header.iter().map(|s| s.to_string()).collect();
    debug!("read_csv_table: header: {:?}", headers);

    let mut builder = TableBuilder::new(headers);
    for line_r in records {
        let line = line_r.context(CsvLineParseSnafu {})?;
        builder.add_row(line.iter().map(read_cell_csv).collect());
    }
    Ok(builder.build())
}

fn read_cell_csv(field: &str) -> Cell {
    if field.trim().is_empty() {
        Cell::Empty
    } else {
        Cell::Text(field.to_string())
    }
}
