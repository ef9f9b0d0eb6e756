//! Training-set formatting in the sparse `id:value` syntax LIBSVM-family
//! trainers read. Feature names are mapped to integer ids in first-seen order;
//! the resulting [`FeatureDictionary`] is what the model converter uses to
//! put names back on the trained weights.

use crate::config::TrainingFormat;
use crate::errors::{LtrError, LtrResult};
use crate::feature_extractor::FeatureTuple;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

type SparseVector = BTreeMap<usize, f64>;

/// Stable, 1-based feature name ↔ id mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureDictionary {
    names: Vec<String>,
    ids: HashMap<String, usize>,
}

impl FeatureDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name`, assigning the next one if unseen.
    pub fn id_for(&mut self, name: &str) -> usize {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        self.names.push(name.to_string());
        let id = self.names.len();
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn id(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        id.checked_sub(1)
            .and_then(|index| self.names.get(index))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in id order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// What a formatting pass produced.
#[derive(Debug, Clone)]
pub struct TrainingSetSummary {
    pub records: usize,
    pub query_groups: usize,
    pub dictionary: FeatureDictionary,
}

struct GroupEntry {
    label: String,
    relevance: f64,
    features: SparseVector,
}

pub struct TrainingSetFormatter {
    format: TrainingFormat,
    dictionary: FeatureDictionary,
    records: usize,
    query_groups: usize,
}

impl TrainingSetFormatter {
    pub fn new(format: TrainingFormat) -> Self {
        Self {
            format,
            dictionary: FeatureDictionary::new(),
            records: 0,
            query_groups: 0,
        }
    }

    /// Write every tuple to `path`, stopping at the first upstream error.
    pub fn write<I>(self, tuples: I, path: &Path) -> LtrResult<TrainingSetSummary>
    where
        I: IntoIterator<Item = LtrResult<FeatureTuple>>,
    {
        let file = File::create(path)
            .map_err(|e| LtrError::io(format!("creating training file {}", path.display()), e))?;
        let mut out = BufWriter::new(file);
        let summary = self.write_to(tuples, &mut out)?;
        out.flush()
            .map_err(|e| LtrError::io(format!("writing training file {}", path.display()), e))?;

        info!(
            path = %path.display(),
            records = summary.records,
            query_groups = summary.query_groups,
            features = summary.dictionary.len(),
            "training set written"
        );
        Ok(summary)
    }

    pub fn write_to<I, W>(mut self, tuples: I, out: &mut W) -> LtrResult<TrainingSetSummary>
    where
        I: IntoIterator<Item = LtrResult<FeatureTuple>>,
        W: Write,
    {
        let mut current_key: Option<(String, String)> = None;
        let mut group: Vec<GroupEntry> = Vec::new();

        for tuple in tuples {
            let tuple = tuple?;
            let key = (tuple.query.clone(), tuple.source.clone());
            if current_key.as_ref() != Some(&key) {
                self.flush_group(&group, out)?;
                group.clear();
                current_key = Some(key);
            }
            group.push(self.entry(&tuple)?);
        }
        self.flush_group(&group, out)?;

        Ok(TrainingSetSummary {
            records: self.records,
            query_groups: self.query_groups,
            dictionary: self.dictionary,
        })
    }

    fn entry(&mut self, tuple: &FeatureTuple) -> LtrResult<GroupEntry> {
        let relevance = tuple.label.parse::<f64>().map_err(|_| {
            LtrError::training_set(format!(
                "label '{}' of document {} is not a number",
                tuple.label, tuple.doc_id
            ))
        })?;

        let mut features = SparseVector::new();
        for entry in &tuple.features {
            let (name, value) = entry.split_once('=').ok_or_else(|| {
                LtrError::training_set(format!(
                    "feature '{entry}' of document {} is not name=value",
                    tuple.doc_id
                ))
            })?;
            let value = value.trim().parse::<f64>().map_err(|_| {
                LtrError::training_set(format!(
                    "feature '{entry}' of document {} has a non-numeric value",
                    tuple.doc_id
                ))
            })?;
            features.insert(self.dictionary.id_for(name.trim()), value);
        }

        Ok(GroupEntry {
            label: tuple.label.clone(),
            relevance,
            features,
        })
    }

    fn flush_group<W: Write>(&mut self, group: &[GroupEntry], out: &mut W) -> LtrResult<()> {
        if group.is_empty() {
            return Ok(());
        }
        self.query_groups += 1;

        match self.format {
            TrainingFormat::Grouped => {
                let qid = format!("qid:{}", self.query_groups);
                for entry in group {
                    self.write_line(out, &entry.label, Some(&qid), &entry.features)?;
                }
            }
            TrainingFormat::Pairwise => {
                for (i, first) in group.iter().enumerate() {
                    for second in &group[i + 1..] {
                        let (better, worse) = if first.relevance > second.relevance {
                            (first, second)
                        } else if first.relevance < second.relevance {
                            (second, first)
                        } else {
                            continue;
                        };
                        let up = difference(&better.features, &worse.features);
                        let down = difference(&worse.features, &better.features);
                        self.write_line(out, "+1", None, &up)?;
                        self.write_line(out, "-1", None, &down)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn write_line<W: Write>(
        &mut self,
        out: &mut W,
        label: &str,
        qid: Option<&str>,
        features: &SparseVector,
    ) -> LtrResult<()> {
        let mut line = String::from(label);
        if let Some(qid) = qid {
            line.push(' ');
            line.push_str(qid);
        }
        for (id, value) in features {
            line.push_str(&format!(" {id}:{value}"));
        }
        line.push('\n');

        out.write_all(line.as_bytes())
            .map_err(|e| LtrError::io("writing training record", e))?;
        self.records += 1;
        Ok(())
    }
}

/// `a - b` over sparse vectors; entries that cancel out are dropped.
fn difference(a: &SparseVector, b: &SparseVector) -> SparseVector {
    let mut result = a.clone();
    for (id, b_value) in b {
        let value = a.get(id).map_or(-b_value, |a_value| a_value - b_value);
        if value != 0.0 {
            result.insert(*id, value);
        } else {
            result.remove(id);
        }
    }
    result
}
