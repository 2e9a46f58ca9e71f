//! Configuration types deserialized from `kestrel.toml`.

use kestrel_common::Logic;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// The top-level configuration parsed from `kestrel.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Simulation settings.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Settings for a simulation run.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of random vectors to generate.
    pub vectors: Option<u32>,
    /// Replay vectors from this file instead of generating them.
    pub input_vectors: Option<PathBuf>,
    /// Golden output-vector file to verify the run against.
    pub expected_outputs: Option<PathBuf>,
    /// Directory receiving `input_vectors`, `output_vectors` and `test.do`.
    pub output_dir: PathBuf,
    /// Which clock phase produces an output-vector row.
    pub record_edge: RecordEdge,
    /// Generate unknown (`x`) stimulus bits as well as 0 and 1.
    pub three_valued: bool,
    /// Value of never-written signals and undriven pins.
    #[serde(deserialize_with = "deserialize_logic")]
    pub initial_value: Logic,
    /// Extra nets, pins or nodes to record as output lines.
    #[serde(deserialize_with = "deserialize_pattern_list")]
    pub monitor: Vec<String>,
    /// Input lines that start low and are held high after the warm-up cycles.
    #[serde(deserialize_with = "deserialize_pattern_list")]
    pub hold_high: Vec<String>,
    /// Input lines that start high and are held low after the warm-up cycles.
    #[serde(deserialize_with = "deserialize_pattern_list")]
    pub hold_low: Vec<String>,
    /// Seed for the random vector generator.
    pub seed: u64,
    /// Number of evaluation threads. `1` evaluates every stage sequentially.
    pub workers: usize,
    /// Load memory contents from `.mif` files.
    pub read_mif: bool,
    /// Directory searched for `.mif` files. Defaults to the working directory.
    pub mif_dir: Option<PathBuf>,
    /// Report conditions that are usually benign, such as nets with several drivers.
    pub all_warnings: bool,
    /// Keep generating batches of `vectors` until toggle coverage reaches
    /// this percentage. Ignored when replaying a vector file.
    pub min_coverage: Option<f64>,
    /// Keep generating vectors while toggle coverage improves. Ignored when
    /// replaying a vector file or when `min_coverage` is set.
    pub achieve_best: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            vectors: None,
            input_vectors: None,
            expected_outputs: None,
            output_dir: PathBuf::from("."),
            record_edge: RecordEdge::default(),
            three_valued: false,
            initial_value: Logic::X,
            monitor: Vec::new(),
            hold_high: Vec::new(),
            hold_low: Vec::new(),
            seed: 1,
            workers: 1,
            read_mif: false,
            mif_dir: None,
            all_warnings: false,
            min_coverage: None,
            achieve_best: false,
        }
    }
}

/// Clock phase whose cycles are written to the output-vector file.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordEdge {
    /// Even cycles, where the clock rises (default).
    #[default]
    Rising,
    /// Odd cycles, where the clock falls.
    Falling,
    /// Every cycle.
    Both,
}

impl RecordEdge {
    /// Returns `true` if `cycle` produces an output row for this edge.
    pub fn records(self, cycle: u64) -> bool {
        match self {
            RecordEdge::Rising => cycle % 2 == 0,
            RecordEdge::Falling => cycle % 2 == 1,
            RecordEdge::Both => true,
        }
    }

    /// Output rows written per test vector.
    pub fn rows_per_vector(self) -> u64 {
        match self {
            RecordEdge::Both => 2,
            RecordEdge::Rising | RecordEdge::Falling => 1,
        }
    }
}

/// Deserializes a logic value given as `0`, `1`, `-1` or `"x"`.
fn deserialize_logic<'de, D>(deserializer: D) -> Result<Logic, D::Error>
where
    D: Deserializer<'de>,
{
    struct LogicVisitor;

    impl<'de> Visitor<'de> for LogicVisitor {
        type Value = Logic;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("0, 1, -1 or \"x\"")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            match v {
                0 => Ok(Logic::Zero),
                1 => Ok(Logic::One),
                -1 => Ok(Logic::X),
                _ => Err(E::custom(format!("invalid logic value {v}"))),
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            v.parse().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(LogicVisitor)
}

/// Deserializes a pattern list given either as an array or as one comma-separated string.
///
/// Allows both `monitor = "count,state"` and `monitor = ["count", "state"]`.
fn deserialize_pattern_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct PatternList;

    impl<'de> Visitor<'de> for PatternList {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a comma-separated string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect())
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(PatternList)
}
