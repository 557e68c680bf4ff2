//! Reaction database views per ionization label.
//!
//! The database is a tab-separated tagged text file: a preamble closed by a
//! `</column properties>` line, one header row of column names, the data rows,
//! and a trailing metadata block starting at the first line beginning with `<`.
//! Ionization rows carry `kind = ionization`, a `label` and a `mode` column.

use crate::common::constants::{EXCLUDED_ADDUCT_LABELS, IONIZATION_KIND};
use crate::domain::{AdductLabel, ChallengerError, IonMode};
use std::collections::HashMap;
use tracing::debug;

const COLUMN_PROPERTIES_END: &str = "</column properties>";
const ROWCOUNT_PREFIX: &str = "<rowcount=\"";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReactionDatabaseError {
    #[error("reaction database has no '{COLUMN_PROPERTIES_END}' marker")]
    MissingColumnProperties,
    #[error("reaction database has no column header row after '{COLUMN_PROPERTIES_END}'")]
    MissingHeaderRow,
}

impl From<ReactionDatabaseError> for ChallengerError {
    fn from(error: ReactionDatabaseError) -> Self {
        ChallengerError::input_validation("INPUT.MALFORMED_DATABASE", error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionDatabase {
    preamble: Vec<String>,
    columns: Vec<String>,
    rows: Vec<String>,
    epilogue: Vec<String>,
}

impl ReactionDatabase {
    pub fn parse(text: &str) -> Result<Self, ReactionDatabaseError> {
        let lines: Vec<&str> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();

        let header_index = lines
            .iter()
            .position(|line| line.starts_with(COLUMN_PROPERTIES_END))
            .map(|marker| marker + 1)
            .ok_or(ReactionDatabaseError::MissingColumnProperties)?;
        let header = lines
            .get(header_index)
            .filter(|line| !line.is_empty())
            .ok_or(ReactionDatabaseError::MissingHeaderRow)?;

        let data_end = lines[header_index + 1..]
            .iter()
            .position(|line| line.starts_with('<'))
            .map_or(lines.len(), |offset| header_index + 1 + offset);

        Ok(Self {
            preamble: owned(&lines[..header_index]),
            columns: header.split('\t').map(str::to_string).collect(),
            rows: owned(&lines[header_index + 1..data_end]),
            epilogue: owned(&lines[data_end..]),
        })
    }

    /// Data rows that are not blank.
    pub fn row_count(&self) -> usize {
        self.rows.iter().filter(|row| !row.trim().is_empty()).count()
    }

    /// Distinct ionization labels applicable to `mode`, in first-seen order.
    pub fn discover_labels(&self, mode: IonMode) -> Vec<AdductLabel> {
        let mut labels: Vec<AdductLabel> = Vec::new();
        for record in self.records() {
            let label = record.get("label");
            if record.get("kind") == IONIZATION_KIND
                && record.get("mode").contains(mode.as_str())
                && !label.is_empty()
                && !labels.iter().any(|known| known == label)
            {
                labels.push(label.to_string());
            }
        }
        labels
    }

    /// Copy keeping every non-ionization row and only the ionization rows
    /// tagged with `label`. The preamble row count follows the filtered rows.
    pub fn filter_by_label(&self, label: &str) -> Self {
        let rows: Vec<String> = self
            .rows
            .iter()
            .filter(|row| !row.trim().is_empty())
            .filter(|row| {
                let record = Record::new(&self.columns, row);
                record.get("kind") != IONIZATION_KIND || record.get("label") == label
            })
            .cloned()
            .collect();

        let preamble = self
            .preamble
            .iter()
            .map(|line| rewrite_rowcount(line, rows.len()))
            .collect();

        Self {
            preamble,
            columns: self.columns.clone(),
            rows,
            epilogue: self.epilogue.clone(),
        }
    }

    pub fn to_text(&self) -> String {
        let header = self.columns.join("\t");
        self.preamble
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(header.as_str()))
            .chain(self.rows.iter().map(String::as_str))
            .chain(self.epilogue.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows
            .iter()
            .filter(|row| !row.trim().is_empty())
            .map(|row| Record::new(&self.columns, row))
    }
}

/// One filtered database per adduct label, ready for the fragmentation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdductView {
    pub label: AdductLabel,
    pub database: String,
}

/// Labels for `mode` minus the deny-list, each with its own database copy.
pub fn resolve_adducts(database: &ReactionDatabase, mode: IonMode) -> Vec<AdductView> {
    let views: Vec<AdductView> = database
        .discover_labels(mode)
        .into_iter()
        .filter(|label| !EXCLUDED_ADDUCT_LABELS.contains(&label.as_str()))
        .map(|label| {
            let database = database.filter_by_label(&label).to_text();
            AdductView { label, database }
        })
        .collect();

    debug!(
        mode = %mode,
        labels = ?views.iter().map(|view| view.label.as_str()).collect::<Vec<_>>(),
        "resolved adduct labels"
    );
    views
}

pub fn discover_labels(text: &str, mode: IonMode) -> Result<Vec<AdductLabel>, ChallengerError> {
    Ok(ReactionDatabase::parse(text)?.discover_labels(mode))
}

struct Record<'a> {
    values: HashMap<&'a str, &'a str>,
}

impl<'a> Record<'a> {
    fn new(columns: &'a [String], row: &'a str) -> Self {
        let mut cells = row.split('\t');
        let values = columns
            .iter()
            .map(|column| (column.as_str(), cells.next().unwrap_or("")))
            .collect();
        Self { values }
    }

    fn get(&self, column: &str) -> &'a str {
        self.values.get(column).copied().unwrap_or("")
    }
}

fn owned(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|line| line.to_string()).collect()
}

fn rewrite_rowcount(line: &str, count: usize) -> String {
    let Some(start) = line.find(ROWCOUNT_PREFIX) else {
        return line.to_string();
    };
    let digits_start = start + ROWCOUNT_PREFIX.len();
    let digits_len = line[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    let digits_end = digits_start + digits_len;
    if digits_len == 0 || !line[digits_end..].starts_with("\">") {
        return line.to_string();
    }
    format!("{}{}{}", &line[..digits_start], count, &line[digits_end..])
}
