//! Dataset storage API.
//!
//! A dataset is a directory holding `manifest.json`, `netlists.jsonl` and
//! `equations.jsonl`. Records are appended as circuits complete, so a dataset
//! interrupted mid-batch still holds every circuit written before the stop.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::types::{DatasetManifest, EquationRecord, NetlistRecord};
use crate::{ResultsError, ResultsResult};

const MANIFEST: &str = "manifest.json";
const NETLISTS: &str = "netlists.jsonl";
const EQUATIONS: &str = "equations.jsonl";

#[derive(Clone, Debug)]
pub struct DatasetStore {
    dir: PathBuf,
}

impl DatasetStore {
    /// Open (creating if needed) the dataset directory `dir`.
    pub fn new(dir: PathBuf) -> ResultsResult<Self> {
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    /// Open an existing dataset without creating anything.
    pub fn open(dir: &Path) -> ResultsResult<Self> {
        if !dir.join(MANIFEST).exists() {
            return Err(ResultsError::DatasetNotFound {
                path: dir.display().to_string(),
            });
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Truncate both record files so a fresh batch starts empty.
    pub fn reset(&self) -> ResultsResult<()> {
        fs::write(self.dir.join(NETLISTS), "")?;
        fs::write(self.dir.join(EQUATIONS), "")?;
        Ok(())
    }

    pub fn save_manifest(&self, manifest: &DatasetManifest) -> ResultsResult<()> {
        let json = serde_json::to_string_pretty(manifest)?;
        fs::write(self.dir.join(MANIFEST), json)?;
        Ok(())
    }

    pub fn load_manifest(&self) -> ResultsResult<DatasetManifest> {
        let path = self.dir.join(MANIFEST);
        if !path.exists() {
            return Err(ResultsError::DatasetNotFound {
                path: self.dir.display().to_string(),
            });
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn append_netlist(&self, record: &NetlistRecord) -> ResultsResult<()> {
        self.append(NETLISTS, record)
    }

    pub fn append_equations(&self, record: &EquationRecord) -> ResultsResult<()> {
        self.append(EQUATIONS, record)
    }

    pub fn load_netlists(&self) -> ResultsResult<Vec<NetlistRecord>> {
        self.load(NETLISTS)
    }

    pub fn load_equations(&self) -> ResultsResult<Vec<EquationRecord>> {
        self.load(EQUATIONS)
    }

    /// Netlist records paired with their equations, when derived.
    pub fn joined(&self) -> ResultsResult<Vec<(NetlistRecord, Option<EquationRecord>)>> {
        let mut equations = self.load_equations()?;
        let netlists = self.load_netlists()?;
        Ok(netlists
            .into_iter()
            .map(|n| {
                let eq = equations
                    .iter()
                    .position(|e| e.circuit_id == n.circuit_id)
                    .map(|i| equations.swap_remove(i));
                (n, eq)
            })
            .collect())
    }

    /// Manifests of every dataset directly under `root`.
    pub fn list_datasets(root: &Path) -> ResultsResult<Vec<DatasetManifest>> {
        let mut manifests = Vec::new();
        if !root.exists() {
            return Ok(manifests);
        }
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if entry.path().is_dir()
                && let Ok(store) = Self::open(&entry.path())
                && let Ok(manifest) = store.load_manifest()
            {
                manifests.push(manifest);
            }
        }
        manifests.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(manifests)
    }

    fn append<T: Serialize>(&self, file: &str, record: &T) -> ResultsResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file))?;
        handle.write_all(line.as_bytes())?;
        Ok(())
    }

    fn load<T: DeserializeOwned>(&self, file: &'static str) -> ResultsResult<Vec<T>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        let mut records = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(line).map_err(|source| ResultsError::Record {
                file,
                line: index + 1,
                source,
            })?;
            records.push(record);
        }
        Ok(records)
    }
}
