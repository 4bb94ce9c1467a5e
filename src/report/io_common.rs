// Primitives shared by the Excel and CSV readers.

use std::collections::HashMap;

use turnout_stats::builder::DatasetBuilder;
use turnout_stats::{Record, Settlement, Sex, FIRST_AGE, LAST_AGE, NUM_AGES};

use crate::report::*;

/// The content of one cell, independent of the format of the source.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Empty,
}

impl<'a> Cell<'a> {
    fn is_empty(&self) -> bool {
        match self {
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
            Cell::Empty => true,
        }
    }

    /// Reads a count. Anything that is not a non-negative number counts as zero.
    pub fn as_count(&self) -> u64 {
        let x = match self {
            Cell::Number(f) => Some(*f),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Empty => None,
        };
        match x {
            Some(f) if f.is_finite() && f >= 0.0 => f.round() as u64,
            Some(f) => {
                debug!("as_count: ignoring value {:?}", f);
                0
            }
            None => 0,
        }
    }

    /// Reads an identifier. Whole numbers are printed without a decimal part, so
    /// that a numeric code `1017.0` reads as `1017`.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
            Cell::Number(f) => f.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

/// Given the header of a file (names of each of the columns), and the names of the
/// requested columns, finds the position of each requested column.
///
/// The requested columns that cannot be found are returned separately.
pub fn get_col_index_mapping(
    req_col_names: &[String],
    header: &[Option<String>],
) -> (HashMap<String, usize>, Vec<String>) {
    let col_names: HashMap<&str, usize> = header
        .iter()
        .enumerate()
        .filter_map(|(idx, x)| x.as_ref().map(|s| (s.as_str(), idx)))
        .collect();

    let mut found: HashMap<String, usize> = HashMap::new();
    let mut missing: Vec<String> = Vec::new();
    for cname in req_col_names {
        match col_names.get(cname.as_str()) {
            Some(idx) => {
                found.insert(cname.clone(), *idx);
            }
            None => missing.push(cname.clone()),
        }
    }
    (found, missing)
}

fn cell_at<'a>(row: &[Cell<'a>], idx: Option<usize>) -> Cell<'a> {
    idx.and_then(|i| row.get(i)).cloned().unwrap_or(Cell::Empty)
}

/// Where each field of a record is located in a row.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnLayout {
    county: Option<usize>,
    uat: Option<usize>,
    locality: Option<usize>,
    settlement: Option<usize>,
    registered: Option<usize>,
    votes_cast: Option<usize>,
    male: Option<usize>,
    female: Option<usize>,
    female_ages: Vec<Option<usize>>,
    male_ages: Vec<Option<usize>>,
    /// The requested columns that are not in the source.
    pub missing: Vec<String>,
}

impl ColumnLayout {
    pub fn from_header(header: &[Option<String>], cols: &ColumnConfig) -> ColumnLayout {
        let ages = FIRST_AGE..=LAST_AGE;
        let mut req_col_names = cols.base_columns();
        req_col_names.extend(ages.clone().map(|age| cols.age_column(Sex::Female, age)));
        req_col_names.extend(ages.clone().map(|age| cols.age_column(Sex::Male, age)));

        let (found, missing) = get_col_index_mapping(&req_col_names, header);
        debug!(
            "ColumnLayout::from_header: {} columns found, missing: {:?}",
            found.len(),
            missing
        );
        let pos = |name: &String| found.get(name).cloned();
        ColumnLayout {
            county: pos(&cols.county),
            uat: pos(&cols.uat),
            locality: pos(&cols.locality),
            settlement: pos(&cols.settlement),
            registered: pos(&cols.registered),
            votes_cast: pos(&cols.votes_cast),
            male: pos(&cols.male),
            female: pos(&cols.female),
            female_ages: ages
                .clone()
                .map(|age| pos(&cols.age_column(Sex::Female, age)))
                .collect(),
            male_ages: ages.map(|age| pos(&cols.age_column(Sex::Male, age))).collect(),
            missing,
        }
    }

    fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        [
            self.county,
            self.uat,
            self.locality,
            self.settlement,
            self.registered,
            self.votes_cast,
            self.male,
            self.female,
        ]
        .into_iter()
        .chain(self.female_ages.iter().cloned())
        .chain(self.male_ages.iter().cloned())
        .flatten()
    }

    /// Builds the record for one row.
    ///
    /// Returns None for a row where all the requested cells are empty (typically
    /// trailing lines of a spreadsheet).
    pub fn read_record(&self, row: &[Cell]) -> Option<Record> {
        let cell = |idx: Option<usize>| cell_at(row, idx);
        if self.positions().all(|i| cell(Some(i)).is_empty()) {
            return None;
        }
        let settlement = Settlement::parse(&cell(self.settlement).as_text());
        if !settlement.is_known() && !settlement.label().is_empty() {
            warn!(
                "Unknown settlement type {:?}, kept as is",
                settlement.label()
            );
        }
        let mut record = Record::new(&cell(self.county).as_text(), &cell(self.locality).as_text())
            .with_uat(&cell(self.uat).as_text())
            .with_settlement(settlement)
            .with_counts(
                cell(self.registered).as_count(),
                cell(self.votes_cast).as_count(),
            )
            .with_sex_totals(cell(self.male).as_count(), cell(self.female).as_count());
        for idx in 0..NUM_AGES {
            let age = FIRST_AGE + idx as u32;
            record
                .age_votes
                .set(age, Sex::Female, cell(self.female_ages[idx]).as_count());
            record
                .age_votes
                .set(age, Sex::Male, cell(self.male_ages[idx]).as_count());
        }
        Some(record)
    }

    /// Prepares a builder that knows which age columns are absent.
    pub fn new_builder(&self) -> DatasetBuilder {
        let mut builder = DatasetBuilder::new();
        for idx in 0..NUM_AGES {
            let age = FIRST_AGE + idx as u32;
            if self.female_ages[idx].is_none() {
                builder.mark_missing_age(age, Sex::Female);
            }
            if self.male_ages[idx].is_none() {
                builder.mark_missing_age(age, Sex::Male);
            }
        }
        builder
    }

    pub fn warn_missing(&self, path: &str) {
        if !self.missing.is_empty() {
            warn!(
                "{}: {} requested columns are not in the source and are skipped: {:?}",
                path,
                self.missing.len(),
                self.missing
            );
        }
    }
}

/// Accumulates the records of a source, one row at a time.
pub struct RowCollector<'l> {
    layout: &'l ColumnLayout,
    builder: DatasetBuilder,
    skipped: usize,
}

impl<'l> RowCollector<'l> {
    pub fn new(layout: &'l ColumnLayout) -> RowCollector<'l> {
        RowCollector {
            layout,
            builder: layout.new_builder(),
            skipped: 0,
        }
    }

    /// `lineno` is only used for logging.
    pub fn add_row(&mut self, lineno: usize, row: &[Cell]) {
        match self.layout.read_record(row) {
            Some(r) => {
                debug!("add_row: line {}: {:?}", lineno, r.locality);
                self.builder.add_record(r);
            }
            None => self.skipped += 1,
        }
    }

    /// Fails if not a single row could be used.
    pub fn finish(self) -> ReportResult<LoadedSource> {
        if self.skipped > 0 {
            debug!("RowCollector::finish: skipped {} empty rows", self.skipped);
        }
        info!("Read {} records", self.builder.len());
        let dataset = self.builder.build().ok().context(EmptyDatasetSnafu {})?;
        Ok(LoadedSource {
            dataset,
            missing_columns: self.layout.missing.clone(),
        })
    }
}
