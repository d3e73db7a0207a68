//! Raw Record Reader: a lazy, restartable pass over the immutable raw store.
//! The store is a directory of append-only NDJSON files written by the
//! external fetcher; files are read in name order (dated names sort
//! chronologically), lines in file order.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::PathBuf;

use payerpulse_common::{PayerPulseError, RawRecord};

pub struct RawStoreReader {
    dir: PathBuf,
}

impl RawStoreReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Start a pass over the store. An unreadable store directory is fatal;
    /// an unparseable line is a record-level error yielded in place.
    pub fn records(&self) -> Result<RawRecordIter, PayerPulseError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)
            .map_err(|e| {
                PayerPulseError::RawStore(format!(
                    "cannot read raw store {}: {e}",
                    self.dir.display()
                ))
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("ndjson" | "jsonl")
                )
            })
            .collect();
        files.sort();
        Ok(RawRecordIter {
            files: files.into(),
            current: None,
        })
    }
}

pub struct RawRecordIter {
    files: VecDeque<PathBuf>,
    current: Option<CurrentFile>,
}

struct CurrentFile {
    name: String,
    lines: Lines<BufReader<File>>,
    line: u64,
}

impl Iterator for RawRecordIter {
    type Item = Result<RawRecord, PayerPulseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(cur) = &mut self.current {
                match cur.lines.next() {
                    Some(Ok(line)) => {
                        cur.line += 1;
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        let item = match serde_json::from_str(trimmed) {
                            Ok(doc) => Ok(RawRecord {
                                source: cur.name.clone(),
                                line: cur.line,
                                doc,
                            }),
                            Err(e) => Err(PayerPulseError::UnreadableRecord {
                                position: format!("{}:{}", cur.name, cur.line),
                                reason: e.to_string(),
                            }),
                        };
                        return Some(item);
                    }
                    Some(Err(e)) => {
                        let context = format!("{}:{}: read failed: {e}", cur.name, cur.line + 1);
                        self.current = None;
                        return Some(Err(PayerPulseError::RawStore(context)));
                    }
                    None => {
                        self.current = None;
                        continue;
                    }
                }
            }

            let path = self.files.pop_front()?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("<raw file>")
                .to_string();
            match File::open(&path) {
                Ok(f) => {
                    self.current = Some(CurrentFile {
                        name,
                        lines: BufReader::new(f).lines(),
                        line: 0,
                    });
                }
                Err(e) => {
                    return Some(Err(PayerPulseError::RawStore(format!(
                        "cannot open {}: {e}",
                        path.display()
                    ))));
                }
            }
        }
    }
}
