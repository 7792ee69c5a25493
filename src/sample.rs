use fake::faker::company::en::CompanyName;
use fake::faker::name::en::Name;
use fake::Fake;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_AGE: u8 = 18;
pub const MAX_AGE: u8 = 70;

/// Placeholder payload carried by every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleData {
    pub name: String,
    pub age: u8,
    pub company: String,
}

impl SampleData {
    pub fn new(name: impl Into<String>, age: u8, company: impl Into<String>) -> SampleData {
        SampleData {
            name: name.into(),
            age,
            company: company.into(),
        }
    }

    pub fn fake() -> SampleData {
        SampleData::new(
            Name().fake::<String>(),
            (MIN_AGE..=MAX_AGE).fake::<u8>(),
            CompanyName().fake::<String>(),
        )
    }
}

impl fmt::Display for SampleData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name={} age={} company={}",
            self.name, self.age, self.company
        )
    }
}

pub trait RecordSource: Send + Sync {
    fn next_record(&self) -> SampleData;
}

pub struct FakeRecords;

impl RecordSource for FakeRecords {
    fn next_record(&self) -> SampleData {
        SampleData::fake()
    }
}
