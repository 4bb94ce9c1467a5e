// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The youngest age with a dedicated vote column.
pub const FIRST_AGE: u32 = 18;
/// The oldest age with a dedicated vote column (inclusive).
pub const LAST_AGE: u32 = 120;
/// Number of single-year age bands between `FIRST_AGE` and `LAST_AGE`.
pub const NUM_AGES: usize = (LAST_AGE - FIRST_AGE + 1) as usize;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Sex {
    Female,
    Male,
}

/// The settlement type of a locality, as labelled in the source. The data of the
/// electoral authority uses `U` for urban and `R` for rural localities.
///
/// The label is kept as-is: settlements are grouped and displayed by label, in
/// alphabetical order.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Default)]
pub struct Settlement(String);

impl Settlement {
    pub fn parse(label: &str) -> Settlement {
        Settlement(label.trim().to_string())
    }

    pub fn label(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_urban(&self) -> bool {
        matches!(self.label(), "U" | "u" | "Urban" | "urban" | "URBAN")
    }

    pub fn is_rural(&self) -> bool {
        matches!(self.label(), "R" | "r" | "Rural" | "rural" | "RURAL")
    }

    /// True for the labels that name a rural or an urban settlement.
    pub fn is_known(&self) -> bool {
        self.is_urban() || self.is_rural()
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct SexCounts {
    pub female: u64,
    pub male: u64,
}

impl SexCounts {
    pub fn get(&self, sex: Sex) -> u64 {
        match sex {
            Sex::Female => self.female,
            Sex::Male => self.male,
        }
    }

    pub fn set(&mut self, sex: Sex, count: u64) {
        match sex {
            Sex::Female => self.female = count,
            Sex::Male => self.male = count,
        }
    }
}

/// Votes cast per single year of age, split by sex.
///
/// There is always exactly one entry per age between `FIRST_AGE` and `LAST_AGE`.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AgeVotes([SexCounts; NUM_AGES]);

impl Default for AgeVotes {
    fn default() -> Self {
        AgeVotes([SexCounts::default(); NUM_AGES])
    }
}

impl AgeVotes {
    /// Returns None if the age is outside of the tracked range.
    pub fn get(&self, age: u32) -> Option<SexCounts> {
        age_index(age).map(|idx| self.0[idx])
    }

    /// Returns false (and does nothing) if the age is outside of the tracked range.
    pub fn set(&mut self, age: u32, sex: Sex, count: u64) -> bool {
        match age_index(age) {
            Some(idx) => {
                self.0[idx].set(sex, count);
                true
            }
            None => false,
        }
    }

    /// Iterates over (age, counts), by increasing age.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &SexCounts)> + '_ {
        self.0
            .iter()
            .enumerate()
            .map(|(idx, c)| (idx as u32 + FIRST_AGE, c))
    }
}

pub(crate) fn age_index(age: u32) -> Option<usize> {
    if (FIRST_AGE..=LAST_AGE).contains(&age) {
        Some((age - FIRST_AGE) as usize)
    } else {
        None
    }
}

/// One row of the source: a locality and its counts.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Record {
    pub county: String,
    /// The administrative unit code. Kept as text since it is only used as an identifier.
    pub uat: String,
    pub locality: String,
    pub settlement: Settlement,
    pub registered: u64,
    pub votes_cast: u64,
    pub male: u64,
    pub female: u64,
    pub age_votes: AgeVotes,
}

/// Which per-age columns were present in the source.
///
/// A missing column is not the same as a column full of zeros: the
/// corresponding age is reported without a value.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AgePresence {
    female: [bool; NUM_AGES],
    male: [bool; NUM_AGES],
}

impl Default for AgePresence {
    fn default() -> Self {
        AgePresence {
            female: [true; NUM_AGES],
            male: [true; NUM_AGES],
        }
    }
}

impl AgePresence {
    pub fn is_present(&self, age: u32, sex: Sex) -> bool {
        match (age_index(age), sex) {
            (Some(idx), Sex::Female) => self.female[idx],
            (Some(idx), Sex::Male) => self.male[idx],
            (None, _) => false,
        }
    }

    pub fn mark_missing(&mut self, age: u32, sex: Sex) {
        if let Some(idx) = age_index(age) {
            match sex {
                Sex::Female => self.female[idx] = false,
                Sex::Male => self.male[idx] = false,
            }
        }
    }

    pub fn num_missing(&self) -> usize {
        self.female.iter().chain(self.male.iter()).filter(|p| !**p).count()
    }
}

/// The full collection of records, as loaded once from the source.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Dataset {
    pub records: Vec<Record>,
    pub age_presence: AgePresence,
}

// ******** Output data structures *********

/// Turnout of a group of localities, computed as a ratio of sums.
#[derive(PartialEq, Debug, Clone)]
pub struct GroupTurnout<K> {
    pub key: K,
    pub votes_cast: u64,
    pub registered: u64,
    /// None when nobody is registered in the group.
    pub ratio: Option<f64>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct SexTotals {
    pub male: u64,
    pub female: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct AgeBucket {
    pub age: u32,
    /// None if the column for this age was not in the source.
    pub female: Option<u64>,
    pub male: Option<u64>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AgeDistribution {
    pub buckets: Vec<AgeBucket>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct RankedLocality {
    /// Position of the record in the source collection (0-based).
    pub row: usize,
    pub locality: String,
    pub ratio: f64,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CountySexTotals {
    pub county: String,
    pub male: u64,
    pub female: u64,
}

/// All the views derived from one dataset.
#[derive(PartialEq, Debug, Clone)]
pub struct Aggregates {
    pub county_turnout: Vec<GroupTurnout<String>>,
    pub settlement_turnout: Vec<GroupTurnout<Settlement>>,
    pub sex_totals: SexTotals,
    pub age_distribution: AgeDistribution,
    pub top_localities: Vec<RankedLocality>,
    pub sex_by_county: Vec<CountySexTotals>,
}

/// Errors that prevent the statistics from being computed.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum StatsError {
    /// There is not a single usable record.
    EmptyDataset,
}

impl Error for StatsError {}

impl Display for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsError::EmptyDataset => write!(f, "the dataset contains no usable record"),
        }
    }
}
