//! Relevance judgments: `queryText|documentId|relevanceLabel|sourceTag`

use crate::errors::{LtrError, LtrResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const FIELD_SEPARATOR: char = '|';
const FIELD_COUNT: usize = 4;

/// One labeled (query, document) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Judgment {
    pub query: String,
    pub doc_id: String,
    /// Relevance label as written in the file; always numeric
    pub label: String,
    pub source: String,
}

impl Judgment {
    /// Parse one line. Blank lines yield `Ok(None)`.
    pub fn parse_line(line_number: usize, line: &str) -> LtrResult<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() != FIELD_COUNT {
            return Err(LtrError::judgment(
                line_number,
                format!("expected {FIELD_COUNT} fields, found {}", fields.len()),
            ));
        }

        let label = fields[2].trim();
        if label.parse::<f64>().is_err() {
            return Err(LtrError::judgment(
                line_number,
                format!("relevance label '{label}' is not a number"),
            ));
        }

        Ok(Some(Self {
            query: fields[0].trim().to_string(),
            doc_id: fields[1].trim().to_string(),
            label: label.to_string(),
            source: fields[3].trim().to_string(),
        }))
    }
}

/// Forward-only reader over a judgments source.
pub struct JudgmentReader<R> {
    lines: std::io::Lines<R>,
    line_number: usize,
    failed: bool,
}

impl<R: BufRead> JudgmentReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            failed: false,
        }
    }
}

impl JudgmentReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> LtrResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| LtrError::io(format!("opening judgments {}", path.display()), e))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Iterator for JudgmentReader<R> {
    type Item = LtrResult<Judgment>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(LtrError::io("reading judgments", e)));
                }
            };
            self.line_number += 1;

            match Judgment::parse_line(self.line_number, &line) {
                Ok(Some(judgment)) => return Some(Ok(judgment)),
                Ok(None) => continue,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Stream through a judgments file once, checking every line parses.
/// Returns the number of judgments.
pub fn validate_file(path: impl AsRef<Path>) -> LtrResult<usize> {
    let mut count = 0;
    for judgment in JudgmentReader::open(path)? {
        judgment?;
        count += 1;
    }
    Ok(count)
}
