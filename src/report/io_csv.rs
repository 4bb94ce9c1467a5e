// Reads a CSV file with a header line.

use crate::report::io_common::{Cell, ColumnLayout, RowCollector};
use crate::report::*;

pub fn read_csv_source(path: &str, cols: &ColumnConfig) -> ReportResult<LoadedSource> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .context(CsvSourceUnavailableSnafu { path })?;

    let header: Vec<Option<String>> = rdr
        .headers()
        .context(CsvSourceUnavailableSnafu { path })?
        .iter()
        .map(|s| s.trim())
        // Excel adds a byte order mark when saving as UTF-8 CSV.
        .map(|s| s.trim_start_matches('\u{feff}'))
        .map(|s| {
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        })
        .collect();
    debug!("read_csv_source: header: {:?}", header);
    ensure!(header.iter().any(|h| h.is_some()), EmptySourceSnafu { path });

    let layout = ColumnLayout::from_header(&header, cols);
    layout.warn_missing(path);

    let mut collector = RowCollector::new(&layout);
    for (idx, line_r) in rdr.records().enumerate() {
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let cells: Vec<Cell> = line
            .iter()
            .map(|s| if s.trim().is_empty() { Cell::Empty } else { Cell::Text(s) })
            .collect();
        collector.add_row(lineno, &cells);
    }
    collector.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn reads_allow_listed_columns() {
        let f = write_csv(
            "Judet,Localitate,Mediu,Înscriși pe liste permanente,Voturi Totale,Noise,Femei 30\n\
             CJ,Turda,U,100,50,x,7\n\
             CJ,Dej,R,50,30,y,\n",
        );
        let src = read_csv_source(f.path().to_str().unwrap(), &ColumnConfig::default()).unwrap();
        let ds = &src.dataset;
        assert_eq!(ds.records.len(), 2);
        let r = &ds.records[0];
        assert_eq!(r.locality, "Turda");
        assert_eq!(r.settlement.label(), "U");
        assert_eq!((r.registered, r.votes_cast), (100, 50));
        assert_eq!(r.age_votes.get(30).unwrap().female, 7);
        assert_eq!(ds.records[1].age_votes.get(30).unwrap().female, 0);
        assert!(!ds.age_presence.is_present(30, turnout_stats::Sex::Male));
        // UAT, Barbati, Femei, then every age column but "Femei 30".
        assert_eq!(src.missing_columns.len(), 3 + 205);
        assert_eq!(src.missing_columns[0], "UAT");
        assert!(!src.missing_columns.contains(&"Noise".to_string()));
    }

    #[test]
    fn header_only_is_empty_dataset() {
        let f = write_csv("Judet,Voturi Totale\n");
        let res = read_csv_source(f.path().to_str().unwrap(), &ColumnConfig::default());
        assert!(matches!(res, Err(ReportError::EmptyDataset {})));
    }
}
