// Reads the first worksheet of an Excel workbook.

use calamine::DataType;

use crate::report::io_common::{Cell, ColumnLayout, RowCollector};
use crate::report::*;

pub fn read_excel_source(path: &str, cols: &ColumnConfig) -> ReportResult<LoadedSource> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(SourceUnavailableSnafu { path })?;
    let wrange = workbook
        .worksheet_range_at(0)
        .context(EmptySourceSnafu { path })?
        .context(SourceUnavailableSnafu { path })?;
    debug!(
        "read_excel_source: path: {:?} size: {:?}",
        path,
        wrange.get_size()
    );

    let mut iter = wrange.rows();
    let header: Vec<Option<String>> = iter
        .next()
        .context(EmptySourceSnafu { path })?
        .iter()
        .map(header_name)
        .collect();
    debug!("read_excel_source: header: {:?}", header);

    let layout = ColumnLayout::from_header(&header, cols);
    layout.warn_missing(path);

    let mut collector = RowCollector::new(&layout);
    for (idx, row) in iter.enumerate() {
        let cells: Vec<Cell> = row.iter().map(read_cell).collect();
        // The first line is the header, and lines start at 1.
        collector.add_row(idx + 2, &cells);
    }
    collector.finish()
}

fn header_name(cell: &DataType) -> Option<String> {
    match cell {
        DataType::Empty => None,
        x => {
            let c = read_cell(x).as_text();
            if c.is_empty() {
                None
            } else {
                Some(c)
            }
        }
    }
}

fn read_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::String(s) => Cell::Text(s.as_str()),
        DataType::Float(f) => Cell::Number(*f),
        DataType::Int(i) => Cell::Number(*i as f64),
        DataType::Empty => Cell::Empty,
        x => {
            debug!("read_cell: ignoring cell {:?}", x);
            Cell::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use turnout_stats::Sex;

    enum XCell<'a> {
        S(&'a str),
        N(f64),
    }

    fn sheet_xml(rows: &[Vec<XCell>]) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );
        for (r, row) in rows.iter().enumerate() {
            xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, cell) in row.iter().enumerate() {
                let pos = format!("{}{}", (b'A' + c as u8) as char, r + 1);
                match cell {
                    XCell::S(s) => xml.push_str(&format!(
                        r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        pos, s
                    )),
                    XCell::N(n) => xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, pos, n)),
                }
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        xml
    }

    // A workbook with the given sheets, in order.
    fn write_workbook(path: &std::path::Path, sheets: &[(&str, String)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zw = zip::ZipWriter::new(file);
        let opts = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);

        let mut types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        );
        let mut workbook = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
        );
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (idx, (name, _)) in sheets.iter().enumerate() {
            let n = idx + 1;
            types.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                n
            ));
            workbook.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                name, n, n
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                n, n
            ));
        }
        types.push_str("</Types>");
        workbook.push_str("</sheets></workbook>");
        rels.push_str("</Relationships>");
        let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

        let mut parts: Vec<(String, String)> = vec![
            ("[Content_Types].xml".to_string(), types),
            ("_rels/.rels".to_string(), root_rels.to_string()),
            ("xl/workbook.xml".to_string(), workbook),
            ("xl/_rels/workbook.xml.rels".to_string(), rels),
        ];
        for (idx, (_, xml)) in sheets.iter().enumerate() {
            parts.push((format!("xl/worksheets/sheet{}.xml", idx + 1), xml.clone()));
        }
        for (name, content) in parts.iter() {
            zw.start_file(name.as_str(), opts).unwrap();
            zw.write_all(content.as_bytes()).unwrap();
        }
        zw.finish().unwrap();
    }

    #[test]
    fn reads_the_first_worksheet() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("Adatbazis.xlsx");
        let first = sheet_xml(&[
            vec![
                XCell::S("Voturi Totale"),
                XCell::S("Localitate"),
                XCell::S("Judet"),
                XCell::S("Femei 20"),
                XCell::S("Înscriși pe liste permanente"),
                XCell::S("Mediu"),
            ],
            vec![
                XCell::N(30.0),
                XCell::S("Turda"),
                XCell::S("CJ"),
                XCell::N(5.0),
                XCell::N(50.0),
                XCell::S("U"),
            ],
            vec![
                XCell::N(10.0),
                XCell::S("Dej"),
                XCell::S("CJ"),
                XCell::N(2.0),
                XCell::N(40.0),
                XCell::S("R"),
            ],
        ]);
        let second = sheet_xml(&[
            vec![XCell::S("Judet"), XCell::S("Localitate")],
            vec![XCell::S("XX"), XCell::S("Elsewhere")],
        ]);
        write_workbook(&p, &[("Adatok", first), ("Other", second)]);

        let src = read_excel_source(p.to_str().unwrap(), &ColumnConfig::default()).unwrap();
        let ds = &src.dataset;
        let localities: Vec<&str> = ds.records.iter().map(|r| r.locality.as_str()).collect();
        assert_eq!(localities, vec!["Turda", "Dej"]);
        let r = &ds.records[0];
        assert_eq!(r.county, "CJ");
        assert_eq!((r.registered, r.votes_cast), (50, 30));
        assert_eq!(r.settlement.label(), "U");
        assert_eq!(r.age_votes.get(20).unwrap().female, 5);

        assert!(ds.age_presence.is_present(20, Sex::Female));
        assert!(!ds.age_presence.is_present(21, Sex::Female));
        assert!(!ds.age_presence.is_present(20, Sex::Male));
        assert!(src.missing_columns.contains(&"UAT".to_string()));
        assert!(!src.missing_columns.contains(&"Femei 20".to_string()));
    }

    #[test]
    fn cells_from_calamine() {
        assert_eq!(read_cell(&DataType::Int(4)), Cell::Number(4.0));
        assert_eq!(read_cell(&DataType::Float(2.5)), Cell::Number(2.5));
        assert_eq!(read_cell(&DataType::Bool(true)), Cell::Empty);
        let s = DataType::String("Cluj".to_string());
        assert_eq!(read_cell(&s), Cell::Text("Cluj"));
    }

    #[test]
    fn numeric_headers_are_names() {
        assert_eq!(
            header_name(&DataType::String(" Judet ".to_string())),
            Some("Judet".to_string())
        );
        assert_eq!(header_name(&DataType::Float(2024.0)), Some("2024".to_string()));
        assert_eq!(header_name(&DataType::Empty), None);
    }

    #[test]
    fn not_a_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("broken.xlsx");
        std::fs::write(&p, "this is not a zip archive").unwrap();
        let res = read_excel_source(p.to_str().unwrap(), &ColumnConfig::default());
        assert!(matches!(res, Err(ReportError::SourceUnavailable { .. })));
    }
}
