use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{DashError, DashResult};

pub mod source;

pub const REQUIRED_COLUMNS: [&str; 4] = ["age", "balance", "job", "marital"];

/// Marital value counted by the married KPI.
pub const MARRIED: &str = "married";

/// One source row. Columns beyond the required four are kept verbatim for the table view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub age: f64,
    pub balance: f64,
    pub job: String,
    pub marital: String,
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    /// Every header column in file order.
    pub columns: Vec<String>,
    /// Names of the `Record::extra` cells, in file order.
    pub extra_columns: Vec<String>,
    pub records: Vec<Record>,
    pub hash_sha256: String,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Rows matching one job value. Built once per run and never mutated.
#[derive(Debug, Clone)]
pub struct FilteredBase {
    pub job: String,
    pub rows: Vec<Record>,
    pub married: usize,
}

impl FilteredBase {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub path: String,
    pub hash_sha256: String,
    pub row_count: u64,
    pub bad_rows: u64,
    pub columns: Vec<String>,
    pub jobs: Vec<String>,
    pub warnings: Vec<String>,
    pub generated_at_epoch: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaReport {
    pub columns: Vec<String>,
    pub required: Vec<String>,
    pub missing: Vec<String>,
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub rows: u64,
    pub bad_rows: u64,
    pub distinct_jobs: u64,
    pub warnings: Vec<String>,
}

/// Split one CSV line on commas, honouring double-quoted fields and `""` escapes.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                cur.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                cells.push(cur.trim().to_string());
                cur.clear();
            }
            _ => cur.push(ch),
        }
    }
    cells.push(cur.trim().to_string());
    cells
}

fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
}

struct ColumnMap {
    width: usize,
    age: usize,
    balance: usize,
    job: usize,
    marital: usize,
    extra: Vec<usize>,
}

impl ColumnMap {
    fn from_header(header: &[String]) -> DashResult<Self> {
        let find = |name: &str| header.iter().position(|h| h.eq_ignore_ascii_case(name));
        let (age, balance, job, marital) = match (find("age"), find("balance"), find("job"), find("marital")) {
            (Some(a), Some(b), Some(j), Some(m)) => (a, b, j, m),
            _ => return Err(DashError::MissingColumns(missing_columns(header))),
        };
        let required = [age, balance, job, marital];
        let extra = (0..header.len()).filter(|i| !required.contains(i)).collect();
        Ok(Self { width: header.len(), age, balance, job, marital, extra })
    }

    fn record(&self, line_no: usize, cells: &[String], header: &[String]) -> DashResult<Record> {
        if cells.len() != self.width {
            return Err(DashError::Parse {
                line: line_no,
                msg: format!("expected {} columns, got {}", self.width, cells.len()),
            });
        }
        // `parse` also accepts NaN and inf; neither is a usable age or balance.
        let num = |idx: usize| -> DashResult<f64> {
            match cells[idx].parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(DashError::Parse {
                    line: line_no,
                    msg: format!("bad {}: {:?}", header[idx], cells[idx]),
                }),
            }
        };
        Ok(Record {
            age: num(self.age)?,
            balance: num(self.balance)?,
            job: cells[self.job].clone(),
            marital: cells[self.marital].clone(),
            extra: self.extra.iter().map(|&i| cells[i].clone()).collect(),
        })
    }
}

fn missing_columns(header: &[String]) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|c| !header.iter().any(|h| h.eq_ignore_ascii_case(c)))
        .map(|c| c.to_string())
        .collect()
}

/// Parse CSV text into a dataset. The first data line is the header.
pub fn parse_dataset(text: &str) -> DashResult<Dataset> {
    let mut lines = data_lines(text);
    let header = match lines.next() {
        Some((_, line)) => split_csv_line(line),
        None => return Err(DashError::MissingColumns(REQUIRED_COLUMNS.iter().map(|s| s.to_string()).collect())),
    };
    let map = ColumnMap::from_header(&header)?;

    let mut records = Vec::new();
    for (line_no, line) in lines {
        let cells = split_csv_line(line);
        records.push(map.record(line_no, &cells, &header)?);
    }

    Ok(Dataset {
        columns: header.clone(),
        extra_columns: map.extra.iter().map(|&i| header[i].clone()).collect(),
        records,
        hash_sha256: sha256_hex(text.as_bytes()),
    })
}

/// Distinct job values in first-appearance order.
pub fn distinct_jobs(records: &[Record]) -> Vec<String> {
    let mut jobs: Vec<String> = Vec::new();
    for r in records {
        if !jobs.iter().any(|j| j == &r.job) {
            jobs.push(r.job.clone());
        }
    }
    jobs
}

pub fn filter_by_job(dataset: &Dataset, job: &str) -> DashResult<FilteredBase> {
    let rows: Vec<Record> = dataset.records.iter().filter(|r| r.job == job).cloned().collect();
    if rows.is_empty() {
        return Err(DashError::EmptyFilterResult(job.to_string()));
    }
    let married = rows.iter().filter(|r| r.marital == MARRIED).count();
    Ok(FilteredBase { job: job.to_string(), rows, married })
}

/// Scan a CSV file without failing on bad rows; the data-quality view of a source.
pub fn analyze_csv(path: &Path, now_ts: u64) -> DashResult<(DatasetManifest, DataQualityReport)> {
    let text = std::fs::read_to_string(path)?;
    let mut warnings = Vec::new();
    let mut lines = data_lines(&text);

    let header = lines.next().map(|(_, l)| split_csv_line(l)).unwrap_or_default();
    if header.is_empty() {
        warnings.push("missing_header".to_string());
    }
    let map = ColumnMap::from_header(&header).ok();
    if map.is_none() {
        warnings.push(format!("missing_columns: {:?}", missing_columns(&header)));
    }

    let mut row_count = 0u64;
    let mut bad_rows = 0u64;
    let mut good = Vec::new();
    for (line_no, line) in lines {
        row_count += 1;
        let cells = split_csv_line(line);
        match map.as_ref().map(|m| m.record(line_no, &cells, &header)) {
            Some(Ok(rec)) => good.push(rec),
            Some(Err(err)) => {
                bad_rows += 1;
                warnings.push(format!("bad_row: {}", err));
            }
            None => bad_rows += 1,
        }
    }

    let jobs = distinct_jobs(&good);
    let manifest = DatasetManifest {
        path: path.display().to_string(),
        hash_sha256: sha256_hex(text.as_bytes()),
        row_count,
        bad_rows,
        columns: header,
        jobs: jobs.clone(),
        warnings: warnings.clone(),
        generated_at_epoch: now_ts,
    };
    let report = DataQualityReport {
        rows: row_count,
        bad_rows,
        distinct_jobs: jobs.len() as u64,
        warnings,
    };
    Ok((manifest, report))
}

pub fn validate_schema(path: &Path) -> DashResult<SchemaReport> {
    let header = read_header(path)?;
    let missing = missing_columns(&header);
    let ok = missing.is_empty();
    let message = if ok {
        "schema ok".to_string()
    } else {
        format!("schema mismatch: missing {:?} in {:?}", missing, header)
    };
    Ok(SchemaReport {
        columns: header,
        required: REQUIRED_COLUMNS.iter().map(|s| s.to_string()).collect(),
        missing,
        ok,
        message,
    })
}

pub fn read_header(path: &Path) -> DashResult<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    let header = data_lines(&text).next().map(|(_, l)| split_csv_line(l));
    Ok(header.unwrap_or_default())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn file_sha256(path: &Path) -> DashResult<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn default_manifest_path(dataset_path: &Path) -> PathBuf {
    let mut p = dataset_path.to_path_buf();
    let fname = dataset_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset.csv");
    p.set_file_name(format!("{}.manifest.json", fname));
    p
}
