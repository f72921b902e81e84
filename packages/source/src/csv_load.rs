//! Delimited-file loader.
//!
//! Reads a header row, resolves every mapped [`IncidentField`] to a column
//! index once, then turns each data row into an [`IncidentRecord`]. Cells
//! are read as raw bytes so that non-UTF-8 exports load without error (see
//! [`decode_cell`]).
//!
//! Loading is fail-fast: a row that cannot be parsed aborts the whole load
//! instead of being skipped, so a malformed file is never silently
//! truncated. Empty cells are fine and become absent fields.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use incident_atlas_incident_models::{IncidentField, IncidentRecord};

use crate::SourceReadError;
use crate::parsing::{decode_cell, non_empty, parse_float, parse_int};
use crate::progress::{ProgressCallback, null_progress};
use crate::source_def::{ColumnMapping, DatasetDefinition};

/// Number of rows between progress updates.
const PROGRESS_BATCH: u64 = 10_000;

/// Loads [`IncidentRecord`]s from delimited text.
#[derive(Clone)]
pub struct CsvLoader {
    /// Source column for each field.
    columns: ColumnMapping,
    /// Field delimiter byte.
    delimiter: u8,
    /// Optional cap on the number of data rows to read.
    max_records: Option<u64>,
    /// Receives row counts as the file is read.
    progress: Arc<dyn ProgressCallback>,
}

impl std::fmt::Debug for CsvLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvLoader")
            .field("columns", &self.columns)
            .field("delimiter", &char::from(self.delimiter))
            .field("max_records", &self.max_records)
            .finish_non_exhaustive()
    }
}

impl CsvLoader {
    /// Creates a loader for the given dataset definition.
    ///
    /// # Errors
    ///
    /// Returns [`SourceReadError::Definition`] if the definition's delimiter
    /// is unusable.
    pub fn new(definition: &DatasetDefinition) -> Result<Self, SourceReadError> {
        Ok(Self {
            columns: definition.columns.clone(),
            delimiter: definition.delimiter_byte()?,
            max_records: None,
            progress: null_progress(),
        })
    }

    /// Stops reading after `max` data rows.
    #[must_use]
    pub const fn with_max_records(mut self, max: u64) -> Self {
        self.max_records = Some(max);
        self
    }

    /// Reports rows read to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Opens and loads the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceReadError`] if the file cannot be opened or any row
    /// fails to parse.
    pub fn load_path(&self, path: &Path) -> Result<Vec<IncidentRecord>, SourceReadError> {
        log::info!("Loading incidents from {}", path.display());
        let file = File::open(path).map_err(|source| SourceReadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.load(BufReader::new(file))
    }

    /// Loads every data row from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceReadError`] if the header lacks a required column,
    /// a row has the wrong number of cells, or a typed cell cannot be
    /// parsed.
    pub fn load<R: Read>(&self, reader: R) -> Result<Vec<IncidentRecord>, SourceReadError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(false)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| decode_cell(h).trim().to_owned())
            .collect();

        let resolved = ResolvedColumns::resolve(&self.columns, &headers)?;

        let mut records = Vec::new();
        let mut raw = csv::ByteRecord::new();
        let mut row: u64 = 0;

        if let Some(max) = self.max_records {
            self.progress.set_total(max);
        }

        loop {
            if let Some(max) = self.max_records
                && row >= max
            {
                log::info!("Reached max_records limit ({max}), stopping load");
                break;
            }
            if !reader.read_byte_record(&mut raw)? {
                break;
            }

            row += 1;
            records.push(resolved.parse_row(row, &raw)?);

            if row % PROGRESS_BATCH == 0 {
                self.progress.inc(PROGRESS_BATCH);
            }
        }

        self.progress.inc(row % PROGRESS_BATCH);
        log::info!("Loaded {} incident records", records.len());
        Ok(records)
    }
}

/// Column indices for each mapped field, resolved against one header row.
struct ResolvedColumns {
    /// Field -> (column name, column index).
    indices: BTreeMap<IncidentField, (String, usize)>,
}

impl ResolvedColumns {
    fn resolve(mapping: &ColumnMapping, headers: &[String]) -> Result<Self, SourceReadError> {
        let mut indices = BTreeMap::new();

        for &field in IncidentField::all() {
            let Some(column) = mapping.column_for(field) else {
                continue;
            };
            match headers.iter().position(|h| h == column) {
                Some(idx) => {
                    indices.insert(field, (column.to_owned(), idx));
                }
                None if field.is_required() => {
                    return Err(SourceReadError::MissingColumn {
                        field,
                        column: column.to_owned(),
                    });
                }
                None => {
                    log::warn!("Column '{column}' for {field} not found; field will be empty");
                }
            }
        }

        let ignored = headers.len().saturating_sub(indices.len());
        if ignored > 0 {
            log::debug!("Ignoring {ignored} unmapped column(s)");
        }

        Ok(Self { indices })
    }

    /// Returns the decoded cell for `field`, or an empty string if the
    /// field is unmapped.
    fn cell(&self, raw: &csv::ByteRecord, field: IncidentField) -> String {
        self.indices
            .get(&field)
            .and_then(|(_, idx)| raw.get(*idx))
            .map(decode_cell)
            .unwrap_or_default()
    }

    fn text(&self, raw: &csv::ByteRecord, field: IncidentField) -> Option<String> {
        non_empty(&self.cell(raw, field)).map(str::to_owned)
    }

    fn float(
        &self,
        row: u64,
        raw: &csv::ByteRecord,
        field: IncidentField,
    ) -> Result<Option<f64>, SourceReadError> {
        parse_float(&self.cell(raw, field)).map_err(|value| self.invalid(row, field, value))
    }

    fn int(
        &self,
        row: u64,
        raw: &csv::ByteRecord,
        field: IncidentField,
    ) -> Result<Option<i64>, SourceReadError> {
        parse_int(&self.cell(raw, field)).map_err(|value| self.invalid(row, field, value))
    }

    fn unsigned(
        &self,
        row: u64,
        raw: &csv::ByteRecord,
        field: IncidentField,
    ) -> Result<Option<u32>, SourceReadError> {
        self.int(row, raw, field)?
            .map(|v| u32::try_from(v).map_err(|_| self.invalid(row, field, v.to_string())))
            .transpose()
    }

    fn invalid(&self, row: u64, field: IncidentField, value: String) -> SourceReadError {
        SourceReadError::InvalidValue {
            row,
            field,
            column: self
                .indices
                .get(&field)
                .map(|(name, _)| name.clone())
                .unwrap_or_default(),
            value,
        }
    }

    fn parse_row(&self, row: u64, raw: &csv::ByteRecord) -> Result<IncidentRecord, SourceReadError> {
        let year = self
            .int(row, raw, IncidentField::Year)?
            .ok_or_else(|| self.invalid(row, IncidentField::Year, String::new()))?;
        let year =
            i32::try_from(year).map_err(|_| self.invalid(row, IncidentField::Year, year.to_string()))?;

        Ok(IncidentRecord {
            row,
            year,
            month: self.unsigned(row, raw, IncidentField::Month)?,
            day: self.unsigned(row, raw, IncidentField::Day)?,
            country: self.text(raw, IncidentField::Country),
            city: self.text(raw, IncidentField::City),
            region: self.text(raw, IncidentField::Region),
            latitude: self.float(row, raw, IncidentField::Latitude)?,
            longitude: self.float(row, raw, IncidentField::Longitude)?,
            attack_type: self.text(raw, IncidentField::AttackType),
            target_type: self.text(raw, IncidentField::TargetType),
            group_name: self.text(raw, IncidentField::GroupName),
            killed: self.float(row, raw, IncidentField::Killed)?,
            wounded: self.float(row, raw, IncidentField::Wounded)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{default_dataset, find_dataset};

    fn loader() -> CsvLoader {
        CsvLoader::new(&find_dataset("incidents").unwrap()).unwrap()
    }

    #[test]
    fn maps_columns_by_name_in_any_order() {
        let csv = "killed,city,year,extra,attack_type\n3,Lima,1990,x,Bombing\n";
        let records = loader().load(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.row, 1);
        assert_eq!(r.year, 1990);
        assert_eq!(r.city.as_deref(), Some("Lima"));
        assert_eq!(r.attack_type.as_deref(), Some("Bombing"));
        assert_eq!(r.killed, Some(3.0));
        assert_eq!(r.wounded, None);
        assert_eq!(r.latitude, None);
    }

    #[test]
    fn empty_cells_become_missing() {
        let csv = "year,city,latitude,killed,group_name\n2001,,, ,\n";
        let r = &loader().load(csv.as_bytes()).unwrap()[0];
        assert_eq!(r.city, None);
        assert_eq!(r.latitude, None);
        assert_eq!(r.killed, None);
        assert_eq!(r.group_name, None);
    }

    #[test]
    fn missing_year_column_fails() {
        let csv = "city,killed\nLima,1\n";
        let err = loader().load(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            SourceReadError::MissingColumn {
                field: IncidentField::Year,
                ..
            }
        ));
    }

    #[test]
    fn unparseable_number_fails_whole_load() {
        let csv = "year,killed\n2000,1\n2000,lots\n2000,2\n";
        let err = loader().load(csv.as_bytes()).unwrap_err();
        match err {
            SourceReadError::InvalidValue {
                row, column, value, ..
            } => {
                assert_eq!(row, 2);
                assert_eq!(column, "killed");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_year_fails() {
        let csv = "year,city\n,Lima\n";
        assert!(matches!(
            loader().load(csv.as_bytes()).unwrap_err(),
            SourceReadError::InvalidValue { row: 1, .. }
        ));
    }

    #[test]
    fn ragged_row_fails() {
        let csv = "year,city\n2000,Lima\n2001\n";
        assert!(matches!(
            loader().load(csv.as_bytes()).unwrap_err(),
            SourceReadError::Csv(_)
        ));
    }

    #[test]
    fn tolerates_latin1_bytes() {
        let mut csv = b"year,city\n1985,Bogot".to_vec();
        csv.push(0xe1);
        csv.push(b'\n');
        let records = loader().load(csv.as_slice()).unwrap();
        assert_eq!(records[0].city.as_deref(), Some("Bogotá"));
    }

    #[test]
    fn respects_max_records() {
        let csv = "year\n2000\n2001\n2002\n";
        let records = loader().with_max_records(2).load(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[derive(Default)]
    struct Recorded {
        total: std::sync::Mutex<Option<u64>>,
        position: std::sync::atomic::AtomicU64,
    }

    impl ProgressCallback for Recorded {
        fn set_total(&self, total: u64) {
            *self.total.lock().unwrap() = Some(total);
        }
        fn inc(&self, delta: u64) {
            self.position
                .fetch_add(delta, std::sync::atomic::Ordering::Relaxed);
        }
        fn set_message(&self, _msg: String) {}
        fn finish(&self, _msg: String) {}
    }

    #[test]
    fn max_records_sets_progress_total() {
        let progress = Arc::new(Recorded::default());
        let csv = "year\n2000\n2001\n2002\n";
        loader()
            .with_max_records(2)
            .with_progress(Arc::clone(&progress) as Arc<dyn ProgressCallback>)
            .load(csv.as_bytes())
            .unwrap();
        assert_eq!(*progress.total.lock().unwrap(), Some(2));
        assert_eq!(
            progress.position.load(std::sync::atomic::Ordering::Relaxed),
            2
        );
    }

    #[test]
    fn unbounded_load_leaves_total_unknown() {
        let progress = Arc::new(Recorded::default());
        loader()
            .with_progress(Arc::clone(&progress) as Arc<dyn ProgressCallback>)
            .load("year\n2000\n".as_bytes())
            .unwrap();
        assert_eq!(*progress.total.lock().unwrap(), None);
        assert_eq!(
            progress.position.load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }

    #[test]
    fn zero_max_records_loads_nothing() {
        let csv = "year\n2000\n2001\n";
        let records = loader().with_max_records(0).load(csv.as_bytes()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn rows_past_max_records_are_never_parsed() {
        let csv = "year\n2000\nnot-a-year\n";
        let records = loader().with_max_records(1).load(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].year, 2000);
    }

    #[test]
    fn loads_gtd_headers() {
        let csv = "eventid,iyear,imonth,iday,country_txt,region_txt,city,latitude,longitude,\
                   attacktype1_txt,targtype1_txt,gname,nkill,nwound\n\
                   1,1970,7,2,Dominican Republic,Central America & Caribbean,Santo Domingo,\
                   18.456792,-69.951164,Assassination,Private Citizens & Property,MANO-D,1.0,0.0\n";
        let loader = CsvLoader::new(&default_dataset()).unwrap();
        let r = &loader.load(csv.as_bytes()).unwrap()[0];
        assert_eq!(r.year, 1970);
        assert_eq!(r.month, Some(7));
        assert_eq!(r.country.as_deref(), Some("Dominican Republic"));
        assert_eq!(r.group_name.as_deref(), Some("MANO-D"));
        assert_eq!(r.killed, Some(1.0));
        assert!((r.longitude.unwrap() - -69.951_164).abs() < 1e-9);
    }

    #[test]
    fn negative_month_is_invalid() {
        let csv = "year,month\n2000,-1\n";
        assert!(matches!(
            loader().load(csv.as_bytes()).unwrap_err(),
            SourceReadError::InvalidValue {
                field: IncidentField::Month,
                ..
            }
        ));
    }
}
