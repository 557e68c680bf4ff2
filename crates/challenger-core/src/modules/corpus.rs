//! Corpus discovery and the flat-file readers for candidates, solutions and
//! peaklists.

use crate::common::RunConfig;
use crate::common::constants::{CANDIDATE_FILE_GLOB, PEAKLIST_EXTENSION};
use crate::domain::{
    Candidate, Challenge, ChallengerError, ExecutionMode, IonMode, ParserResult, Solution,
    Spectrum,
};
use globset::GlobBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse CSV '{}': {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },
    #[error("invalid candidate file pattern '{pattern}': {source}")]
    Pattern {
        pattern: &'static str,
        source: globset::Error,
    },
    #[error("peaklist not found for {challenge} (looked in '{}' and '{}')", .positive.display(), .negative.display())]
    PeaklistNotFound {
        challenge: String,
        positive: PathBuf,
        negative: PathBuf,
    },
    #[error(
        "data directory '{}' is missing and no recovery archive is available",
        .data_root.display()
    )]
    DataRootMissing { data_root: PathBuf },
    #[error("failed to extract '{}': {reason}", .archive.display())]
    Extract { archive: PathBuf, reason: String },
}

impl From<CorpusError> for ChallengerError {
    fn from(error: CorpusError) -> Self {
        let message = error.to_string();
        match error {
            CorpusError::Read { .. } => ChallengerError::io_system("IO.CORPUS_READ", message),
            CorpusError::Csv { .. } => ChallengerError::input_validation("INPUT.CORPUS_CSV", message),
            CorpusError::Pattern { .. } => ChallengerError::internal("SYS.CORPUS_PATTERN", message),
            CorpusError::PeaklistNotFound { .. } => {
                ChallengerError::io_system("IO.PEAKLIST_NOT_FOUND", message)
            }
            CorpusError::DataRootMissing { .. } => {
                ChallengerError::io_system("IO.DATA_ROOT_MISSING", message)
            }
            CorpusError::Extract { .. } => ChallengerError::io_system("IO.DATA_EXTRACT", message),
        }
    }
}

/// Challenges split by ionization mode, each in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChallengeGroups {
    pub positive: Vec<Challenge>,
    pub negative: Vec<Challenge>,
}

impl ChallengeGroups {
    pub fn group(&self, mode: IonMode) -> &[Challenge] {
        match mode {
            IonMode::Positive => &self.positive,
            IonMode::Negative => &self.negative,
        }
    }

    pub fn len(&self) -> usize {
        self.positive.len() + self.negative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Makes sure the data root exists, unpacking the configured archive next to
/// it when it does not.
pub fn ensure_data_root(config: &RunConfig) -> ParserResult<()> {
    if config.data_root.is_dir() {
        return Ok(());
    }

    let Some(archive) = config.data_archive.as_deref().filter(|path| path.is_file()) else {
        return Err(CorpusError::DataRootMissing {
            data_root: config.data_root.clone(),
        }
        .into());
    };

    let destination = config
        .data_root
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    info!(
        archive = %archive.display(),
        destination = %destination.display(),
        "data directory missing, extracting archive"
    );

    let status = Command::new("unzip")
        .arg("-q")
        .arg("-o")
        .arg(archive)
        .arg("-d")
        .arg(destination)
        .status()
        .map_err(|source| CorpusError::Extract {
            archive: archive.to_path_buf(),
            reason: source.to_string(),
        })?;
    if !status.success() {
        return Err(CorpusError::Extract {
            archive: archive.to_path_buf(),
            reason: status.to_string(),
        }
        .into());
    }
    if !config.data_root.is_dir() {
        return Err(CorpusError::Extract {
            archive: archive.to_path_buf(),
            reason: format!("archive did not contain '{}'", config.data_root.display()),
        }
        .into());
    }
    Ok(())
}

/// Every candidate file in the corpus, sorted by file name, with its peaklist
/// resolved.
pub fn discover_challenges(config: &RunConfig) -> ParserResult<Vec<Challenge>> {
    let matcher = GlobBuilder::new(CANDIDATE_FILE_GLOB)
        .case_insensitive(true)
        .build()
        .map_err(|source| CorpusError::Pattern {
            pattern: CANDIDATE_FILE_GLOB,
            source,
        })?
        .compile_matcher();

    let candidates_dir = config.candidates_dir();
    let read_error = |source| CorpusError::Read {
        path: candidates_dir.clone(),
        source,
    };
    let mut file_names = Vec::new();
    for entry in fs::read_dir(&candidates_dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        if !entry.file_type().map_err(read_error)?.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if matcher.is_match(&file_name) {
            file_names.push(file_name);
        }
    }
    file_names.sort();

    file_names
        .into_iter()
        .map(|file_name| {
            let name = challenge_name_from_file(&file_name).to_string();
            let (spectrum_path, ion_mode) = resolve_peaklist(config, &name)?;
            Ok(Challenge {
                candidates_path: candidates_dir.join(&file_name),
                name,
                ion_mode,
                spectrum_path,
            })
        })
        .collect()
}

pub fn partition_by_mode(challenges: Vec<Challenge>, mode: ExecutionMode) -> ChallengeGroups {
    let (mut positive, mut negative): (Vec<_>, Vec<_>) = challenges
        .into_iter()
        .partition(|challenge| challenge.ion_mode == IonMode::Positive);

    if let Some(limit) = mode.challenge_limit() {
        positive.truncate(limit);
        negative.truncate(limit);
    }
    ChallengeGroups { positive, negative }
}

/// `<name>.txt` in the positive peaklist directory, then the negative one.
pub fn resolve_peaklist(config: &RunConfig, challenge_name: &str) -> ParserResult<(PathBuf, IonMode)> {
    let file_name = format!("{challenge_name}.{PEAKLIST_EXTENSION}");
    for mode in IonMode::ALL {
        let path = config.peaklist_dir(mode).join(&file_name);
        if path.is_file() {
            return Ok((path, mode));
        }
    }

    Err(CorpusError::PeaklistNotFound {
        challenge: challenge_name.to_string(),
        positive: config.peaklist_dir(IonMode::Positive),
        negative: config.peaklist_dir(IonMode::Negative),
    }
    .into())
}

pub fn read_spectrum(path: &Path) -> ParserResult<Spectrum> {
    Ok(parse_peaklist(&read_text(path)?))
}

pub fn parse_peaklist(content: &str) -> Spectrum {
    let peaks = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let mz = tokens.next()?.parse::<f64>().ok()?;
            let intensity = tokens.next()?.parse::<f64>().ok()?;
            Some((mz, intensity))
        })
        .collect();
    Spectrum::from_peaks(peaks)
}

pub fn read_candidates(path: &Path) -> ParserResult<Vec<Candidate>> {
    let records = read_csv_records(path, 7)?;
    Ok(records
        .into_iter()
        .map(|record| Candidate {
            identifier: record[0].to_string(),
            compound_name: record[1].to_string(),
            monoisotopic_mass: record[2].parse().ok(),
            molecular_formula: record[3].to_string(),
            smiles: record[4].to_string(),
            inchi: record[5].to_string(),
            inchi_key: record[6].to_string(),
        })
        .collect())
}

pub fn read_solutions(path: &Path) -> ParserResult<Vec<Solution>> {
    let records = read_csv_records(path, 12)?;
    Ok(records
        .into_iter()
        .map(|record| Solution {
            source_file: record[0].to_string(),
            challenge_name: record[1].to_string(),
            precursor_mz: record[2].parse().ok(),
            ion_mode: record[3].to_string(),
            retention_time: record[4].parse().ok(),
            peak_count: record[5].parse().ok(),
            name: record[6].to_string(),
            smiles: record[7].to_string(),
            inchi: record[8].to_string(),
            inchi_key: record[9].to_string(),
            chemspider_id: record[10].to_string(),
            pubchem_cid: record[11].to_string(),
        })
        .collect())
}

pub fn challenge_name_from_file(file_name: &str) -> &str {
    let split = file_name.len().saturating_sub(4);
    match file_name.get(split..) {
        Some(extension) if extension.eq_ignore_ascii_case(".csv") => &file_name[..split],
        _ => file_name,
    }
}

pub(crate) fn read_text(path: &Path) -> ParserResult<String> {
    fs::read_to_string(path).map_err(|source| {
        CorpusError::Read {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

/// Header row skipped, blank lines skipped, records shorter than
/// `min_fields` dropped.
fn read_csv_records(path: &Path, min_fields: usize) -> ParserResult<Vec<csv::StringRecord>> {
    let content = read_text(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| CorpusError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        if record.len() >= min_fields {
            records.push(record);
        }
    }
    Ok(records)
}
