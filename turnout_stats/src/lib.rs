mod config;
pub mod builder;
pub mod manual;

use log::{debug, info};

use std::{cmp::Ordering, collections::BTreeMap};

pub use crate::config::*;

/// The number of localities kept in the turnout ranking by default.
pub const DEFAULT_TOP_N: usize = 10;

/// The ratio between the votes cast and the registered voters.
///
/// Returns None when nobody is registered: the ratio is undefined and it is up to
/// the caller to decide what to do with it.
pub fn turnout_ratio(votes_cast: u64, registered: u64) -> Option<f64> {
    if registered == 0 {
        None
    } else {
        Some(votes_cast as f64 / registered as f64)
    }
}

impl Record {
    pub fn turnout(&self) -> Option<f64> {
        turnout_ratio(self.votes_cast, self.registered)
    }
}

// Sums the counts per key. The BTreeMap gives a stable key order.
fn group_turnout<K: Ord + Clone>(
    records: &[Record],
    key: impl Fn(&Record) -> K,
) -> Vec<GroupTurnout<K>> {
    let mut sums: BTreeMap<K, (u64, u64)> = BTreeMap::new();
    for r in records.iter() {
        let e = sums.entry(key(r)).or_insert((0, 0));
        e.0 = e.0.saturating_add(r.votes_cast);
        e.1 = e.1.saturating_add(r.registered);
    }
    sums.into_iter()
        .map(|(key, (votes_cast, registered))| GroupTurnout {
            key,
            votes_cast,
            registered,
            ratio: turnout_ratio(votes_cast, registered),
        })
        .collect()
}

// Undefined ratios sort after all the defined ones.
fn cmp_ratio(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// The turnout of each county, as the ratio of the summed votes over the summed
/// registrations. Larger localities weigh more in the result of their county.
///
/// The counties are sorted by increasing turnout. Counties without any
/// registered voter come last. Equal turnouts keep the alphabetical order.
pub fn county_turnout(records: &[Record]) -> Vec<GroupTurnout<String>> {
    let mut res = group_turnout(records, |r| r.county.clone());
    res.sort_by(|a, b| cmp_ratio(a.ratio, b.ratio));
    res
}

/// The turnout for each settlement type, computed the same way as for the counties.
/// The groups are in the alphabetical order of their labels.
pub fn settlement_turnout(records: &[Record]) -> Vec<GroupTurnout<Settlement>> {
    group_turnout(records, |r| r.settlement.clone())
}

pub fn sex_totals(records: &[Record]) -> SexTotals {
    records.iter().fold(SexTotals::default(), |acc, r| SexTotals {
        male: acc.male.saturating_add(r.male),
        female: acc.female.saturating_add(r.female),
    })
}

/// Sums the votes per age and per sex.
///
/// There is one bucket for every age from 18 to 120. When the column of an age was
/// missing from the source, the bucket carries no value for that sex.
pub fn age_distribution(records: &[Record], presence: &AgePresence) -> AgeDistribution {
    let mut totals: Vec<SexCounts> = vec![SexCounts::default(); NUM_AGES];
    for r in records.iter() {
        for (idx, (_, counts)) in r.age_votes.iter().enumerate() {
            let t = &mut totals[idx];
            t.female = t.female.saturating_add(counts.female);
            t.male = t.male.saturating_add(counts.male);
        }
    }
    let buckets = totals
        .iter()
        .enumerate()
        .map(|(idx, c)| {
            let age = FIRST_AGE + idx as u32;
            AgeBucket {
                age,
                female: Some(c.female).filter(|_| presence.is_present(age, Sex::Female)),
                male: Some(c.male).filter(|_| presence.is_present(age, Sex::Male)),
            }
        })
        .collect();
    AgeDistribution { buckets }
}

/// The localities with the highest turnout, best first.
///
/// Localities with an undefined turnout are not ranked. Ties keep the order of the
/// source.
pub fn top_localities(records: &[Record], n: usize) -> Vec<RankedLocality> {
    let mut ranked: Vec<RankedLocality> = records
        .iter()
        .enumerate()
        .filter_map(|(row, r)| {
            r.turnout().map(|ratio| RankedLocality {
                row,
                locality: r.locality.clone(),
                ratio,
            })
        })
        .collect();
    debug!(
        "top_localities: {} ranked out of {} records",
        ranked.len(),
        records.len()
    );
    // sort_by is stable
    ranked.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));
    ranked.truncate(n);
    ranked
}

/// The male and female totals per county, by increasing female total.
pub fn sex_by_county(records: &[Record]) -> Vec<CountySexTotals> {
    let mut sums: BTreeMap<String, SexTotals> = BTreeMap::new();
    for r in records.iter() {
        let e = sums.entry(r.county.clone()).or_default();
        e.male = e.male.saturating_add(r.male);
        e.female = e.female.saturating_add(r.female);
    }
    let mut res: Vec<CountySexTotals> = sums
        .into_iter()
        .map(|(county, t)| CountySexTotals {
            county,
            male: t.male,
            female: t.female,
        })
        .collect();
    res.sort_by_key(|c| c.female);
    res
}

/// Computes all the views of a dataset in one go.
///
/// Arguments:
/// * `dataset` the records, as loaded from the source
/// * `top_n` how many localities to keep in the turnout ranking
pub fn derive_all(dataset: &Dataset, top_n: usize) -> Result<Aggregates, StatsError> {
    let records = &dataset.records;
    info!("Processing {:?} records", records.len());
    if records.is_empty() {
        return Err(StatsError::EmptyDataset);
    }

    let res = Aggregates {
        county_turnout: county_turnout(records),
        settlement_turnout: settlement_turnout(records),
        sex_totals: sex_totals(records),
        age_distribution: age_distribution(records, &dataset.age_presence),
        top_localities: top_localities(records, top_n),
        sex_by_county: sex_by_county(records),
    };
    info!(
        "derive_all: {} counties, {} settlement types, {} ranked localities",
        res.county_turnout.len(),
        res.settlement_turnout.len(),
        res.top_localities.len()
    );
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::builder::DatasetBuilder;
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    // Three rows: two in X, one in Y without any registered voter.
    fn small_dataset() -> Dataset {
        let mut b = DatasetBuilder::new();
        b.add_record(Record::new("X", "A").with_counts(100, 50));
        b.add_record(Record::new("X", "B").with_counts(50, 30));
        b.add_record(Record::new("Y", "C").with_counts(0, 0));
        b.build().unwrap()
    }

    #[test]
    fn ratio_is_exact_or_undefined() {
        assert_eq!(turnout_ratio(50, 100), Some(0.5));
        assert_eq!(turnout_ratio(3, 4), Some(3.0 / 4.0));
        assert_eq!(turnout_ratio(0, 0), None);
        assert_eq!(turnout_ratio(10, 0), None);
        // Not validated: more votes than registrations.
        assert_eq!(turnout_ratio(12, 10), Some(1.2));
    }

    #[test]
    fn small_scenario() {
        init();
        let ds = small_dataset();
        let aggs = derive_all(&ds, 2).unwrap();

        let x = aggs
            .county_turnout
            .iter()
            .find(|g| g.key == "X")
            .unwrap();
        assert_eq!(x.votes_cast, 80);
        assert_eq!(x.registered, 150);
        assert!(close(x.ratio.unwrap(), 80.0 / 150.0));

        let y = aggs
            .county_turnout
            .iter()
            .find(|g| g.key == "Y")
            .unwrap();
        assert_eq!(y.ratio, None);
        // Undefined turnouts come last
        assert_eq!(aggs.county_turnout.last().unwrap().key, "Y");

        let names: Vec<&str> = aggs
            .top_localities
            .iter()
            .map(|l| l.locality.as_str())
            .collect();
        assert_eq!(names, vec!["B", "A"]);
        assert!(close(aggs.top_localities[0].ratio, 0.6));
        assert_eq!(aggs.top_localities[0].row, 1);
        assert_eq!(aggs.top_localities[1].row, 0);
    }

    #[test]
    fn ratio_of_sums_not_average_of_ratios() {
        // Big locality at 10%, small locality at 90%.
        let records = vec![
            Record::new("Big", "b1").with_counts(1000, 100),
            Record::new("Big", "b2").with_counts(10, 9),
            Record::new("Small", "s1").with_counts(10, 5),
        ];
        let res = county_turnout(&records);
        let big = res.iter().find(|g| g.key == "Big").unwrap();
        assert!(close(big.ratio.unwrap(), 109.0 / 1010.0));
        let mean_of_ratios = (0.1 + 0.9) / 2.0;
        assert!(!close(big.ratio.unwrap(), mean_of_ratios));
        // Ascending order
        assert_eq!(res[0].key, "Big");
        assert_eq!(res[1].key, "Small");
    }

    #[test]
    fn grouping_conserves_votes() {
        let records = vec![
            Record::new("A", "1").with_counts(10, 7),
            Record::new("B", "2").with_counts(20, 3),
            Record::new("A", "3").with_counts(30, 11),
            Record::new("C", "4").with_counts(0, 0),
        ];
        let total: u64 = records.iter().map(|r| r.votes_cast).sum();
        let grouped: u64 = county_turnout(&records).iter().map(|g| g.votes_cast).sum();
        assert_eq!(total, grouped);
        let by_settlement: u64 = settlement_turnout(&records)
            .iter()
            .map(|g| g.votes_cast)
            .sum();
        assert_eq!(total, by_settlement);
    }

    #[test]
    fn settlement_groups_by_label() {
        let records = vec![
            Record::new("A", "1")
                .with_settlement(Settlement::parse("U"))
                .with_counts(100, 40),
            Record::new("A", "2")
                .with_settlement(Settlement::parse("R"))
                .with_counts(100, 60),
            Record::new("B", "3")
                .with_settlement(Settlement::parse("U"))
                .with_counts(300, 60),
        ];
        let res = settlement_turnout(&records);
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].key.label(), "R");
        assert_eq!(res[1].key.label(), "U");
        assert!(res[0].key.is_rural());
        assert!(close(res[1].ratio.unwrap(), 100.0 / 400.0));
    }

    #[test]
    fn settlement_labels_are_kept_as_in_the_source() {
        let records = vec![
            Record::new("A", "1").with_settlement(Settlement::parse(" Urban ")),
            Record::new("A", "2").with_settlement(Settlement::parse("Rural")),
            Record::new("A", "3").with_settlement(Settlement::parse("Mixt")),
            Record::new("A", "4").with_settlement(Settlement::parse("U")),
        ];
        let labels: Vec<String> = settlement_turnout(&records)
            .iter()
            .map(|g| g.key.label().to_string())
            .collect();
        assert_eq!(labels, vec!["Mixt", "Rural", "U", "Urban"]);
        assert!(Settlement::parse("Urban").is_urban());
        assert!(!Settlement::parse("Mixt").is_known());
    }

    #[test]
    fn top_n_is_bounded_sorted_and_defined() {
        let mut records: Vec<Record> = (0..15u64)
            .map(|i| Record::new("A", &format!("L{}", i)).with_counts(100, i * 5))
            .collect();
        records.push(Record::new("A", "empty").with_counts(0, 0));
        let res = top_localities(&records, DEFAULT_TOP_N);
        assert_eq!(res.len(), 10);
        assert!(res.windows(2).all(|w| w[0].ratio >= w[1].ratio));
        assert!(res.iter().all(|l| l.locality != "empty"));
        assert_eq!(res[0].locality, "L14");
    }

    #[test]
    fn top_n_ties_keep_source_order() {
        let records = vec![
            Record::new("A", "first").with_counts(10, 5),
            Record::new("A", "second").with_counts(20, 10),
            Record::new("A", "third").with_counts(40, 20),
        ];
        let res = top_localities(&records, 10);
        let names: Vec<&str> = res.iter().map(|l| l.locality.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn age_distribution_has_all_ages() {
        let records = vec![
            Record::new("A", "1")
                .with_age_votes(18, 1, 2)
                .with_age_votes(50, 10, 20)
                .with_age_votes(120, 0, 1),
            Record::new("A", "2")
                .with_age_votes(18, 3, 4)
                .with_age_votes(121, 100, 100),
        ];
        let mut presence = AgePresence::default();
        presence.mark_missing(119, Sex::Female);
        let res = age_distribution(&records, &presence);
        assert_eq!(res.buckets.len(), NUM_AGES);
        assert_eq!(res.buckets.first().unwrap().age, 18);
        assert_eq!(res.buckets.last().unwrap().age, 120);
        assert_eq!(res.buckets[0].female, Some(4));
        assert_eq!(res.buckets[0].male, Some(6));
        assert_eq!(res.buckets[32].female, Some(10));
        assert_eq!(res.buckets[101].female, None);
        assert_eq!(res.buckets[101].male, Some(0));
        assert_eq!(res.buckets[102].male, Some(1));
    }

    #[test]
    fn sex_views() {
        let records = vec![
            Record::new("B", "1").with_sex_totals(10, 30),
            Record::new("A", "2").with_sex_totals(5, 40),
            Record::new("C", "3").with_sex_totals(7, 1),
            Record::new("B", "4").with_sex_totals(1, 2),
        ];
        assert_eq!(
            sex_totals(&records),
            SexTotals {
                male: 23,
                female: 73
            }
        );
        let by_county = sex_by_county(&records);
        let counties: Vec<&str> = by_county.iter().map(|c| c.county.as_str()).collect();
        assert_eq!(counties, vec!["C", "B", "A"]);
        assert_eq!(by_county[1].male, 11);
        assert_eq!(by_county[1].female, 32);
    }

    #[test]
    fn huge_counts_saturate() {
        let records = vec![
            Record::new("A", "1")
                .with_counts(u64::MAX, u64::MAX)
                .with_sex_totals(u64::MAX, 1)
                .with_age_votes(18, u64::MAX, 0),
            Record::new("A", "2")
                .with_counts(10, 5)
                .with_sex_totals(3, 1)
                .with_age_votes(18, 2, 0),
        ];
        let by_county = county_turnout(&records);
        assert_eq!(by_county[0].votes_cast, u64::MAX);
        assert_eq!(by_county[0].registered, u64::MAX);
        assert_eq!(sex_totals(&records).male, u64::MAX);
        assert_eq!(sex_by_county(&records)[0].male, u64::MAX);
        let ages = age_distribution(&records, &AgePresence::default());
        assert_eq!(ages.buckets[0].female, Some(u64::MAX));
    }

    #[test]
    fn empty_dataset_is_an_error() {
        let ds = Dataset {
            records: Vec::new(),
            age_presence: AgePresence::default(),
        };
        assert_eq!(derive_all(&ds, 10), Err(StatsError::EmptyDataset));
        assert_eq!(
            DatasetBuilder::new().build(),
            Err(StatsError::EmptyDataset)
        );
    }
}
