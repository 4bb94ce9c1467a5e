use crate::report::*;

use serde::{Deserialize, Serialize};
use turnout_stats::{Sex, DEFAULT_TOP_N};

/// The names of the columns to read from the source.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub county: String,
    pub uat: String,
    pub locality: String,
    pub settlement: String,
    pub registered: String,
    #[serde(rename = "votesCast")]
    pub votes_cast: String,
    pub male: String,
    pub female: String,
    /// The per-age columns are named `<prefix><age>`.
    #[serde(rename = "femaleAgePrefix")]
    pub female_age_prefix: String,
    #[serde(rename = "maleAgePrefix")]
    pub male_age_prefix: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        ColumnConfig {
            county: "Judet".to_string(),
            uat: "UAT".to_string(),
            locality: "Localitate".to_string(),
            settlement: "Mediu".to_string(),
            registered: "Înscriși pe liste permanente".to_string(),
            votes_cast: "Voturi Totale".to_string(),
            male: "Barbati".to_string(),
            female: "Femei".to_string(),
            female_age_prefix: "Femei ".to_string(),
            male_age_prefix: "Barbati ".to_string(),
        }
    }
}

impl ColumnConfig {
    pub fn age_column(&self, sex: Sex, age: u32) -> String {
        match sex {
            Sex::Female => format!("{}{}", self.female_age_prefix, age),
            Sex::Male => format!("{}{}", self.male_age_prefix, age),
        }
    }

    pub fn base_columns(&self) -> Vec<String> {
        vec![
            self.county.clone(),
            self.uat.clone(),
            self.locality.clone(),
            self.settlement.clone(),
            self.registered.clone(),
            self.votes_cast.clone(),
            self.male.clone(),
            self.female.clone(),
        ]
    }
}

/// Presentation of one chart.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartStyle {
    /// Used both in the image and as the heading of the section.
    pub title: String,
    /// The alternative text of the image.
    pub alt: String,
    #[serde(rename = "xLabel")]
    pub x_label: Option<String>,
    #[serde(rename = "yLabel")]
    pub y_label: Option<String>,
    /// Applied in turn to the bars, or one per series.
    pub colors: Vec<String>,
    /// Display names of the categories or of the series, when they differ from the data.
    pub labels: Vec<String>,
}

impl Default for ChartStyle {
    fn default() -> Self {
        ChartStyle {
            title: String::new(),
            alt: String::new(),
            x_label: None,
            y_label: None,
            colors: vec!["steelblue".to_string()],
            labels: Vec::new(),
        }
    }
}

fn style(
    title: &str,
    x_label: Option<&str>,
    y_label: Option<&str>,
    colors: &[&str],
    labels: &[&str],
) -> ChartStyle {
    ChartStyle {
        title: title.to_string(),
        // The heading is numbered, the alternative text is not.
        alt: title
            .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.')
            .trim()
            .to_string(),
        x_label: x_label.map(|s| s.to_string()),
        y_label: y_label.map(|s| s.to_string()),
        colors: colors.iter().map(|s| s.to_string()).collect(),
        labels: labels.iter().map(|s| s.to_string()).collect(),
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    pub width: u32,
    pub height: u32,
    /// Shown in place of a chart that has nothing to display.
    #[serde(rename = "emptyCaption")]
    pub empty_caption: String,
    #[serde(rename = "countyTurnout")]
    pub county_turnout: ChartStyle,
    #[serde(rename = "settlementTurnout")]
    pub settlement_turnout: ChartStyle,
    #[serde(rename = "sexTotals")]
    pub sex_totals: ChartStyle,
    #[serde(rename = "ageDistribution")]
    pub age_distribution: ChartStyle,
    #[serde(rename = "topLocalities")]
    pub top_localities: ChartStyle,
    #[serde(rename = "sexByCounty")]
    pub sex_by_county: ChartStyle,
}

// The viridis palette, sampled for 10 bars.
const VIRIDIS_10: [&str; 10] = [
    "#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779", "#6ece58",
    "#b5de2b", "#fde725",
];

impl Default for ChartsConfig {
    fn default() -> Self {
        ChartsConfig {
            width: 1200,
            height: 600,
            empty_caption: "Nincs megjeleníthető adat".to_string(),
            county_turnout: style(
                "1. Megyénkénti részvételi arány",
                Some("Részvételi arány"),
                None,
                &["teal"],
                &[],
            ),
            settlement_turnout: style(
                "2. Városi vs falusi részvétel",
                None,
                Some("Részvételi arány"),
                &["skyblue", "orange"],
                &[],
            ),
            sex_totals: style(
                "3. Nemek szerinti részvétel",
                None,
                Some("Szavazatszám"),
                &["cornflowerblue", "lightcoral"],
                &["Férfiak", "Nők"],
            ),
            age_distribution: style(
                "4. Életkori eloszlás nemek szerint",
                Some("Életkor"),
                Some("Szavazatszám"),
                &["red", "blue"],
                &["Nők", "Férfiak"],
            ),
            top_localities: style(
                "5. Top 10 település részvételi arány szerint",
                Some("Részvételi arány"),
                None,
                &VIRIDIS_10,
                &[],
            ),
            sex_by_county: style(
                "6. Megyénkénti férfi/nő részvétel összevetése",
                Some("Szavazatszám"),
                None,
                &["blue", "pink"],
                &["Barbati", "Femei"],
            ),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

fn qa(question: &str, answer: &str) -> QuestionAnswer {
    QuestionAnswer {
        question: question.to_string(),
        answer: answer.to_string(),
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    #[serde(rename = "sourcePath")]
    pub source_path: String,
    /// `xlsx` or `csv`. Inferred from the extension of the source if not provided.
    #[serde(rename = "inputType")]
    pub input_type: Option<String>,
    #[serde(rename = "outputPath")]
    pub output_path: String,
    #[serde(rename = "topN")]
    pub top_n: usize,
    pub columns: ColumnConfig,
    pub charts: ChartsConfig,
    pub title: String,
    /// The language tag of the document.
    pub lang: String,
    /// The narrative blocks at the top of the report. There are always four of them.
    pub questions: [QuestionAnswer; 4],
    /// Printed once the report has been written.
    #[serde(rename = "successMessage")]
    pub success_message: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            source_path: "Adatbazis.xlsx".to_string(),
            input_type: None,
            output_path: "jelentes.html".to_string(),
            top_n: DEFAULT_TOP_N,
            columns: ColumnConfig::default(),
            charts: ChartsConfig::default(),
            title: "A romániai államelnöki választások elsőkörös részvételi arányának elemzése"
                .to_string(),
            lang: "hu".to_string(),
            questions: [
                qa(
                    "Q1: Miről szól a projekt?",
                    "A projekt a 20205-ös államelnöki választás első körében leadott szavazatszámok eloszlását dolgozza fel. Célja szemléltetni földrajzi, nemszerinti és korszerinti bontásban a választási részvétel alakulását.",
                ),
                qa(
                    "Q2: Milyen adatokat használsz?",
                    "Az adatok az Állandó Választási Iroda weboldaláról kerültek letöltésre. Utólagos feldolgozásnak vetettük alá, a meglévő adatokból új, releváns változókat hoztunk létre.",
                ),
                qa(
                    "Q3: Miért érdekesek az adatok?",
                    "A jelenlegi politikai és szociális kontextusban talán egyike a legrelevánsabb témáknak. Az adatok egy olyan, a teljes társadalomra kiterjedő döntés numerikus aspektusait vetítik le, amely az elkövetkezendő időszak alakulását hordozza magában.",
                ),
                qa(
                    "Q4: Ki a cél-felhasználó?",
                    "A vizualizációink cél-felhasználói a választóképes állampolgárok, valamint azon hatóságok és csoportosulások, akik stratégiai döntések meghozatalában hasonló eloszlásokra támaszkodnak.",
                ),
            ],
            success_message: "A jelentes.html fájl elkészült, nyisd meg a böngésződben!"
                .to_string(),
        }
    }
}

pub fn read_config(path: &str) -> ReportResult<ReportConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: ReportConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// Reads a summary produced by an earlier run.
pub fn read_summary(path: &str) -> ReportResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}
