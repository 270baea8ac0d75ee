use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// File name of the roster inside the working directory.
pub const ROSTER_FILE: &str = "agents.csv";

/// One agent user to create in the instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentRecord {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// The `agents.csv` roster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentRoster {
    records: Vec<AgentRecord>,
}

impl AgentRoster {
    pub fn new(records: Vec<AgentRecord>) -> Self {
        Self { records }
    }

    /// Parse a roster with a `Username,FirstName,LastName,Password` header.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, StoreError> {
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let mut records = Vec::new();
        for (index, row) in csv.deserialize::<AgentRecord>().enumerate() {
            let record = row?;
            if record.username.is_empty() {
                return Err(StoreError::InvalidRoster(format!(
                    "row {} has an empty Username",
                    index + 1
                )));
            }
            records.push(record);
        }

        Ok(Self { records })
    }

    pub fn read(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
        Self::from_reader(file)
    }

    pub fn write(&self, path: &Path) -> Result<(), StoreError> {
        let mut writer = csv::Writer::from_path(path)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush().map_err(|e| StoreError::io(path, e))?;
        Ok(())
    }

    pub fn records(&self) -> &[AgentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
