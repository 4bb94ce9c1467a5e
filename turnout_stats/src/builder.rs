pub use crate::config::*;

use log::debug;

/// A builder for assembling a dataset, one record at a time.
///
/// The readers use it to accumulate the rows of a source file, but it is also
/// the simplest way to build a dataset by hand.
///
/// ```
/// pub use turnout_stats::builder::DatasetBuilder;
/// pub use turnout_stats::{Record, Sex};
/// # use turnout_stats::StatsError;
///
/// let mut builder = DatasetBuilder::new();
/// builder.add_record(Record::new("Cluj", "Turda").with_counts(100, 50));
/// builder.add_record(Record::new("Cluj", "Dej").with_counts(50, 30));
/// builder.mark_missing_age(120, Sex::Male);
///
/// let dataset = builder.build()?;
/// assert_eq!(dataset.records.len(), 2);
///
/// # Ok::<(), StatsError>(())
/// ```
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    pub(crate) _records: Vec<Record>,
    pub(crate) _age_presence: AgePresence,
}

impl DatasetBuilder {
    pub fn new() -> DatasetBuilder {
        DatasetBuilder::default()
    }

    pub fn add_record(&mut self, record: Record) {
        self._records.push(record);
    }

    /// Records that the column for this age and sex does not exist in the source.
    pub fn mark_missing_age(&mut self, age: u32, sex: Sex) {
        self._age_presence.mark_missing(age, sex);
    }

    pub fn len(&self) -> usize {
        self._records.len()
    }

    pub fn is_empty(&self) -> bool {
        self._records.is_empty()
    }

    /// Finishes the dataset. A dataset without any record cannot be summarized.
    pub fn build(self) -> Result<Dataset, StatsError> {
        if self._records.is_empty() {
            return Err(StatsError::EmptyDataset);
        }
        debug!(
            "DatasetBuilder::build: {} records, {} missing age columns",
            self._records.len(),
            self._age_presence.num_missing()
        );
        Ok(Dataset {
            records: self._records,
            age_presence: self._age_presence,
        })
    }
}

impl Record {
    /// A record with the given location and all the counts set to zero.
    pub fn new(county: &str, locality: &str) -> Record {
        Record {
            county: county.to_string(),
            uat: String::new(),
            locality: locality.to_string(),
            settlement: Settlement::default(),
            registered: 0,
            votes_cast: 0,
            male: 0,
            female: 0,
            age_votes: AgeVotes::default(),
        }
    }

    pub fn with_uat(self, uat: &str) -> Record {
        Record {
            uat: uat.to_string(),
            ..self
        }
    }

    pub fn with_settlement(self, settlement: Settlement) -> Record {
        Record { settlement, ..self }
    }

    pub fn with_counts(self, registered: u64, votes_cast: u64) -> Record {
        Record {
            registered,
            votes_cast,
            ..self
        }
    }

    pub fn with_sex_totals(self, male: u64, female: u64) -> Record {
        Record {
            male,
            female,
            ..self
        }
    }

    /// Sets the votes for one age. Ages outside of the tracked range are ignored.
    pub fn with_age_votes(mut self, age: u32, female: u64, male: u64) -> Record {
        self.age_votes.set(age, Sex::Female, female);
        self.age_votes.set(age, Sex::Male, male);
        self
    }
}
