use crate::error::{Result, VisualizerError};

/// Identifier column of an equipment reading
pub const NAME_COLUMN: &str = "Equipment Name";

/// Categorical column the type distribution is computed over
pub const TYPE_COLUMN: &str = "Type";

/// Numeric columns, in the order they are reported
pub const NUMERIC_COLUMNS: [&str; 3] = ["Flowrate", "Pressure", "Temperature"];

/// Every column an upload must carry, in canonical order
pub const REQUIRED_COLUMNS: [&str; 5] = [
    NAME_COLUMN,
    TYPE_COLUMN,
    NUMERIC_COLUMNS[0],
    NUMERIC_COLUMNS[1],
    NUMERIC_COLUMNS[2],
];

/// One data row of an upload after numeric coercion
///
/// A numeric cell that could not be coerced is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentRow {
    pub name: String,
    pub equipment_type: String,
    /// Values for `NUMERIC_COLUMNS`, index-aligned
    pub readings: [Option<f64>; 3],
}

/// A validated upload
#[derive(Debug, Clone, Default)]
pub struct ParsedTable {
    pub rows: Vec<EquipmentRow>,
}

impl ParsedTable {
    /// Number of data rows, blank lines excluded
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Iterate over one numeric column
    ///
    /// # Arguments
    /// * `index` - Position in `NUMERIC_COLUMNS`
    pub fn column(&self, index: usize) -> impl Iterator<Item = Option<f64>> + '_ {
        self.rows.iter().map(move |row| row.readings[index])
    }
}

/// Parse and validate an uploaded CSV body
///
/// The header row determines the column mapping. Extra columns are ignored
/// and blank lines are skipped. A row shorter than the header is kept with
/// its absent cells treated as empty.
///
/// # Arguments
/// * `bytes` - Raw upload body
///
/// # Returns
/// * `Result<ParsedTable>` - The coerced rows
///
/// # Errors
/// * `MalformedInput` if the body is not delimited text with a header row,
///   or a row has more fields than the header
/// * `MissingColumns` naming every absent required column
///
/// # Examples
/// ```
/// use equipment_visualizer::ingest::parse_upload;
///
/// let csv = "Equipment Name,Type,Flowrate,Pressure,Temperature\nPump1,Pump,10,5,70\n";
/// let table = parse_upload(csv.as_bytes()).unwrap();
/// assert_eq!(table.row_count(), 1);
/// ```
pub fn parse_upload(bytes: &[u8]) -> Result<ParsedTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| VisualizerError::MalformedInput(e.to_string()))?
        .clone();

    if headers.is_empty() {
        return Err(VisualizerError::MalformedInput(
            "no columns to parse from file".to_string(),
        ));
    }

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|h| h == **required))
        .map(|required| required.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(VisualizerError::MissingColumns(missing));
    }

    // Presence was checked above, so every lookup succeeds
    let position = |name: &str| headers.iter().position(|h| h == name).unwrap_or_default();
    let name_idx = position(NAME_COLUMN);
    let type_idx = position(TYPE_COLUMN);
    let numeric_idx = NUMERIC_COLUMNS.map(position);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| VisualizerError::MalformedInput(e.to_string()))?;
        if record.len() > headers.len() {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            return Err(VisualizerError::MalformedInput(format!(
                "expected {} fields in line {}, saw {}",
                headers.len(),
                line,
                record.len()
            )));
        }
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        rows.push(EquipmentRow {
            name: cell(name_idx).to_string(),
            equipment_type: cell(type_idx).to_string(),
            readings: numeric_idx.map(|idx| coerce_numeric(cell(idx))),
        });
    }

    Ok(ParsedTable { rows })
}

/// Coerce one cell to a finite float, or `None` when it is not numeric
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
