// src/persist/writer.rs
use std::io::Write;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tracing::{info, debug, error};

use crate::error::{LineageError, LineageResult};
use super::{ensure_directory, write_atomic, Table};

/// Who generated a file, written as the first header line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub tool: String,
    pub version: String,
    pub url: String,
}

impl Default for Provenance {
    fn default() -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            url: env!("CARGO_PKG_REPOSITORY").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterConfig {
    pub delimiter: char,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

/// Persists tables as commented, delimited text files with atomic replacement
#[derive(Debug, Clone, Default)]
pub struct TableWriter {
    config: WriterConfig,
    provenance: Provenance,
}

impl TableWriter {
    pub fn new(config: WriterConfig) -> Self {
        Self {
            config,
            provenance: Provenance::default(),
        }
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Save `table` to `directory/filename`.
    ///
    /// Returns `Ok(Some(path))` when saved and `Ok(None)` when the table has no rows,
    /// in which case nothing on disk is touched. Errors are logged before being returned;
    /// a failed write leaves any previous file at the destination as it was.
    pub fn write(
        &self,
        table: &Table,
        directory: &Path,
        filename: &str,
        comment: &str,
    ) -> LineageResult<Option<PathBuf>> {
        if table.is_empty() {
            info!("No data to save for {}", filename);
            return Ok(None);
        }

        let result = self.write_table(table, directory, filename, comment, Utc::now());
        if let Err(e) = &result {
            error!("{}", e);
        }
        result.map(Some)
    }

    fn write_table(
        &self,
        table: &Table,
        directory: &Path,
        filename: &str,
        comment: &str,
        generated_at: DateTime<Utc>,
    ) -> LineageResult<PathBuf> {
        if filename.is_empty() || Path::new(filename).file_name().map(|name| name != filename).unwrap_or(true) {
            return Err(LineageError::InvalidInput(format!("Invalid file name: {:?}", filename)));
        }

        ensure_directory(directory)?;

        let destination = directory.join(filename);
        info!("Saving {}", destination.display());

        let header = self.header(comment, generated_at);
        write_atomic(&destination, |out: &mut dyn Write| {
            out.write_all(header.as_bytes())?;
            self.write_rows(table, out)
        })?;

        debug!("Saved {} rows to {}", table.len(), destination.display());
        Ok(destination)
    }

    fn header(&self, comment: &str, generated_at: DateTime<Utc>) -> String {
        let mut header = format!("# Generated by {} v{}", self.provenance.tool, self.provenance.version);
        if !self.provenance.url.is_empty() {
            header.push_str(", ");
            header.push_str(&self.provenance.url);
        }
        header.push('\n');
        header.push_str(&format!("# Generated at {} UTC\n", generated_at.format("%Y-%m-%d %H:%M:%S")));

        for line in comment.lines() {
            if !line.starts_with('#') {
                header.push_str("# ");
            }
            header.push_str(line);
            header.push('\n');
        }

        header
    }

    fn write_rows(&self, table: &Table, out: &mut dyn Write) -> std::io::Result<()> {
        let separator = self.config.delimiter.to_string();

        let names: Vec<String> = table.columns().iter().map(|name| self.quote(name)).collect();
        writeln!(out, "{}", names.join(separator.as_str()))?;

        for row in table.rows() {
            let cells: Vec<String> = row.iter().map(|cell| self.quote(&cell.to_string())).collect();
            writeln!(out, "{}", cells.join(separator.as_str()))?;
        }

        Ok(())
    }

    /// Quote a field that contains the delimiter, a quote or a line break
    fn quote(&self, field: &str) -> String {
        if field.contains(self.config.delimiter) || field.contains(&['"', '\n', '\r'][..]) {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};
    use crate::persist::Cell;

    fn sample() -> Table {
        Table::new(["rsid", "chrom", "pos", "genotype"])
            .with_rows([
                vec![Cell::from("rs3094315"), Cell::from("1"), Cell::from(752566), Cell::from("AA")],
                vec![Cell::from("rs12124819"), Cell::from("1"), Cell::from(776546), Cell::Missing],
                vec![Cell::from("i3001"), Cell::from("MT"), Cell::Missing, Cell::from("")],
            ])
            .unwrap()
    }

    #[test]
    fn test_write_three_rows() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("output/nested");
        let writer = TableWriter::default();

        let path = writer
            .write(&sample(), &dir, "genome.csv", "# Source: test\nbuild 37")
            .unwrap()
            .expect("table should be saved");

        assert_eq!(path, dir.join("genome.csv"));
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(
            lines[0],
            format!("# Generated by lineage v{}, https://github.com/apriha/lineage", env!("CARGO_PKG_VERSION"))
        );
        let stamp = lines[1]
            .strip_prefix("# Generated at ")
            .and_then(|rest| rest.strip_suffix(" UTC"))
            .unwrap();
        assert!(NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S").is_ok());
        assert_eq!(lines[2], "# Source: test");
        assert_eq!(lines[3], "# build 37");
        assert_eq!(lines[4], "rsid,chrom,pos,genotype");
        assert_eq!(lines[5], "rs3094315,1,752566,AA");
        assert_eq!(lines[6], "rs12124819,1,776546,--");
        assert_eq!(lines[7], "i3001,MT,--,");
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn test_empty_table_is_noop() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("never-created");
        let table = Table::new(["a", "b"]);

        let result = TableWriter::default().write(&table, &dir, "empty.csv", "").unwrap();

        assert_eq!(result, None);
        assert!(!dir.exists());
    }

    #[test]
    fn test_directory_failure_aborts_write() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let result = TableWriter::default().write(&sample(), &blocker, "genome.csv", "");

        assert!(matches!(result, Err(LineageError::DirectoryCreation { .. })));
    }

    #[test]
    fn test_rejects_file_name_with_path() {
        let root = tempfile::tempdir().unwrap();
        let writer = TableWriter::default();

        for name in ["", "../escape.csv", "a/b.csv"] {
            let result = writer.write(&sample(), root.path(), name, "");
            assert!(matches!(result, Err(LineageError::InvalidInput(_))), "{:?}", name);
        }
    }

    #[test]
    fn test_header_and_quoting() {
        let writer = TableWriter::new(WriterConfig { delimiter: '\t' }).with_provenance(Provenance {
            tool: "tool".to_string(),
            version: "1.2.3".to_string(),
            url: String::new(),
        });
        let at = Utc.with_ymd_and_hms(2019, 6, 1, 12, 30, 5).unwrap();

        assert_eq!(
            writer.header("", at),
            "# Generated by tool v1.2.3\n# Generated at 2019-06-01 12:30:05 UTC\n"
        );

        let table = Table::new(["name", "note"])
            .with_rows([[Cell::from("a\tb"), Cell::from("say \"hi\"")], [Cell::from("a,b"), Cell::Missing]])
            .unwrap();
        let mut out = Vec::new();
        writer.write_rows(&table, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "name\tnote\n\"a\tb\"\t\"say \"\"hi\"\"\"\na,b\t--\n"
        );
    }

    #[test]
    fn test_rewrite_replaces_previous_file() {
        let root = tempfile::tempdir().unwrap();
        let writer = TableWriter::default();
        let first = writer.write(&sample(), root.path(), "genome.csv", "first").unwrap().unwrap();

        let smaller = Table::new(["x"]).with_rows([[1], [2]]).unwrap();
        let second = writer.write(&smaller, root.path(), "genome.csv", "second").unwrap().unwrap();

        assert_eq!(first, second);
        let content = std::fs::read_to_string(&second).unwrap();
        assert!(content.contains("# second\nx\n1\n2\n"));
        assert!(!content.contains("first"));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 1);
    }
}
