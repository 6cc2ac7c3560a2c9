//! Filter dimensions and random draws over their value domains.
//!
//! A [`DimensionSet`] is the validated, ordered list of filter axes for a
//! scenario. Its order is the canonical order used when rendering query
//! strings. Every iteration takes one fresh [`Draw`] from it.

use crate::error::ConfigError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Upper bound on dimensions; the variant set holds `2^n - 1` entries.
pub const MAX_DIMENSIONS: usize = 12;

// =============================================================================
// Domains
// =============================================================================

/// Value domain of a single dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Domain {
    /// Inclusive integer range
    Range {
        /// Lowest value
        low: i64,
        /// Highest value
        high: i64,
    },
    /// Fixed set of string tokens
    Choice {
        /// Tokens, in configured order
        values: Vec<String>,
    },
}

impl Domain {
    /// Create an inclusive integer range domain
    pub fn range(low: i64, high: i64) -> Self {
        Self::Range { low, high }
    }

    /// Create a token set domain
    pub fn choice<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Choice {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of distinct values in the domain
    pub fn cardinality(&self) -> u64 {
        match self {
            Self::Range { low, high } if low <= high => high.abs_diff(*low).saturating_add(1),
            Self::Range { .. } => 0,
            Self::Choice { values } => values.len() as u64,
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        match self {
            Self::Range { low, high } if low > high => Err(ConfigError::EmptyRange {
                name: name.to_string(),
                low: *low,
                high: *high,
            }),
            Self::Range { .. } => Ok(()),
            Self::Choice { values } if values.is_empty() => Err(ConfigError::EmptyChoices {
                name: name.to_string(),
            }),
            Self::Choice { values } if values.iter().any(|v| v.trim().is_empty()) => {
                Err(ConfigError::BlankChoice {
                    name: name.to_string(),
                })
            }
            Self::Choice { .. } => Ok(()),
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Range { low, high } => write!(f, "{}..={}", low, high),
            Self::Choice { values } => write!(f, "{{{}}}", values.join(", ")),
        }
    }
}

// =============================================================================
// Dimensions
// =============================================================================

/// A named filter axis with a non-empty domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    name: String,
    domain: Domain,
}

impl Dimension {
    /// Create a dimension, rejecting empty domains.
    ///
    /// Names are checked by [`DimensionSet::new`].
    pub fn new(name: impl Into<String>, domain: Domain) -> Result<Self, ConfigError> {
        let name = name.into();
        domain.validate(&name)?;
        Ok(Self { name, domain })
    }

    /// Dimension name as it appears in the query string
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value domain
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Draw one value uniformly from the domain
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        match &self.domain {
            Domain::Range { low, high } => rng.random_range(*low..=*high).to_string(),
            Domain::Choice { values } => values[rng.random_range(0..values.len())].clone(),
        }
    }
}

/// Ordered, validated set of dimensions.
///
/// The order given at construction is the canonical rendering order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionSet {
    dimensions: Vec<Dimension>,
}

impl DimensionSet {
    /// Build a set, failing on an empty list, blank or duplicate names
    pub fn new(dimensions: Vec<Dimension>) -> Result<Self, ConfigError> {
        if dimensions.is_empty() {
            return Err(ConfigError::NoDimensions);
        }
        if dimensions.len() > MAX_DIMENSIONS {
            return Err(ConfigError::TooManyDimensions {
                count: dimensions.len(),
                max: MAX_DIMENSIONS,
            });
        }
        let mut seen = HashSet::new();
        for (index, dimension) in dimensions.iter().enumerate() {
            if dimension.name.trim().is_empty() {
                return Err(ConfigError::BlankDimensionName { index });
            }
            if !seen.insert(dimension.name.as_str()) {
                return Err(ConfigError::DuplicateDimension {
                    name: dimension.name.clone(),
                });
            }
        }
        Ok(Self { dimensions })
    }

    /// The age/country/gender/platform set used by the ad banner endpoint
    pub fn ad_filters() -> Self {
        Self {
            dimensions: vec![
                Dimension {
                    name: "age".to_string(),
                    domain: Domain::range(1, 100),
                },
                Dimension {
                    name: "country".to_string(),
                    domain: Domain::choice([
                        "TW", "JP", "US", "KR", "CN", "CA", "UK", "FR", "DE", "IT",
                    ]),
                },
                Dimension {
                    name: "gender".to_string(),
                    domain: Domain::choice(["M", "F"]),
                },
                Dimension {
                    name: "platform".to_string(),
                    domain: Domain::choice(["ios", "android", "web"]),
                },
            ],
        }
    }

    /// Number of dimensions
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    /// Always false for a constructed set
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Iterate dimensions in canonical order
    pub fn iter(&self) -> std::slice::Iter<'_, Dimension> {
        self.dimensions.iter()
    }

    /// Dimension names in canonical order
    pub fn names(&self) -> Vec<&str> {
        self.dimensions.iter().map(Dimension::name).collect()
    }

    /// Draw one value for every dimension, independently
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Draw {
        Draw {
            entries: self
                .dimensions
                .iter()
                .map(|d| DrawEntry {
                    name: d.name.clone(),
                    value: d.sample(rng),
                })
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DimensionSet {
    type Item = &'a Dimension;
    type IntoIter = std::slice::Iter<'a, Dimension>;

    fn into_iter(self) -> Self::IntoIter {
        self.dimensions.iter()
    }
}

// =============================================================================
// Draws
// =============================================================================

/// One drawn value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawEntry {
    /// Dimension name
    pub name: String,
    /// Drawn value, rendered as text
    pub value: String,
}

/// One value per dimension for a single iteration, in canonical order.
///
/// Never empty: obtained from [`DimensionSet::draw`] or [`Draw::from_pairs`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Draw {
    entries: Vec<DrawEntry>,
}

impl Draw {
    /// Build a draw from explicit `(name, value)` pairs in canonical order.
    ///
    /// Names follow the same rules as a [`DimensionSet`]: at most
    /// [`MAX_DIMENSIONS`], none blank, none repeated.
    pub fn from_pairs<I, N, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: ToString,
    {
        let entries: Vec<DrawEntry> = pairs
            .into_iter()
            .map(|(name, value)| DrawEntry {
                name: name.into(),
                value: value.to_string(),
            })
            .collect();
        if entries.is_empty() {
            return Err(ConfigError::EmptyDraw);
        }
        if entries.len() > MAX_DIMENSIONS {
            return Err(ConfigError::TooManyDimensions {
                count: entries.len(),
                max: MAX_DIMENSIONS,
            });
        }
        let mut seen = HashSet::new();
        for (index, entry) in entries.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::BlankDimensionName { index });
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::DuplicateDimension {
                    name: entry.name.clone(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Value drawn for a dimension
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }

    /// Entries in canonical order
    pub fn entries(&self) -> &[DrawEntry] {
        &self.entries
    }

    /// Number of dimensions drawn
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed draw
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn chi_square(counts: &HashMap<String, u64>, categories: u64, samples: u64) -> f64 {
        let expected = samples as f64 / categories as f64;
        let observed_sum: f64 = counts
            .values()
            .map(|&c| (c as f64 - expected).powi(2) / expected)
            .sum();
        // categories never observed contribute `expected` each
        let missing = categories - counts.len() as u64;
        observed_sum + missing as f64 * expected
    }

    #[test]
    fn test_dimension_rejects_empty_choices() {
        let err = Dimension::new("country", Domain::choice(Vec::<String>::new())).unwrap_err();
        assert_eq!(
            err,
            ConfigError::EmptyChoices {
                name: "country".to_string()
            }
        );
    }

    #[test]
    fn test_dimension_rejects_inverted_range() {
        let err = Dimension::new("age", Domain::range(100, 1)).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyRange { low: 100, high: 1, .. }));
    }

    #[test]
    fn test_dimension_rejects_blank_token() {
        let err = Dimension::new("gender", Domain::choice(["M", " "])).unwrap_err();
        assert!(matches!(err, ConfigError::BlankChoice { .. }));
    }

    #[test]
    fn test_single_value_range_is_valid() {
        let dim = Dimension::new("age", Domain::range(42, 42)).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10 {
            assert_eq!(dim.sample(&mut rng), "42");
        }
    }

    #[test]
    fn test_set_rejects_empty_and_duplicates() {
        assert_eq!(DimensionSet::new(vec![]), Err(ConfigError::NoDimensions));

        let age = Dimension::new("age", Domain::range(1, 100)).unwrap();
        let err = DimensionSet::new(vec![age.clone(), age]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateDimension { .. }));

        let blank = Dimension::new("", Domain::range(1, 2)).unwrap();
        let err = DimensionSet::new(vec![blank]).unwrap_err();
        assert_eq!(err, ConfigError::BlankDimensionName { index: 0 });
    }

    #[test]
    fn test_set_rejects_too_many_dimensions() {
        let dims = (0..=MAX_DIMENSIONS)
            .map(|i| Dimension::new(format!("d{i}"), Domain::range(0, 1)).unwrap())
            .collect();
        assert!(matches!(
            DimensionSet::new(dims),
            Err(ConfigError::TooManyDimensions { .. })
        ));
    }

    #[test]
    fn test_ad_filters_preset() {
        let set = DimensionSet::ad_filters();
        assert_eq!(set.names(), vec!["age", "country", "gender", "platform"]);
        let cardinalities: Vec<u64> = set.iter().map(|d| d.domain().cardinality()).collect();
        assert_eq!(cardinalities, vec![100, 10, 2, 3]);
    }

    #[test]
    fn test_draw_covers_every_dimension_in_order() {
        let set = DimensionSet::ad_filters();
        let mut rng = StdRng::seed_from_u64(7);
        let draw = set.draw(&mut rng);

        let names: Vec<&str> = draw.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, set.names());

        let age: i64 = draw.get("age").unwrap().parse().unwrap();
        assert!((1..=100).contains(&age));
        assert!(["M", "F"].contains(&draw.get("gender").unwrap()));
    }

    #[test]
    fn test_draw_from_pairs_rejects_empty() {
        let pairs: Vec<(String, String)> = Vec::new();
        assert_eq!(Draw::from_pairs(pairs), Err(ConfigError::EmptyDraw));
    }

    #[test]
    fn test_draw_from_pairs_enforces_dimension_rules() {
        let wide = (0..64).map(|i| (format!("d{i}"), i));
        assert_eq!(
            Draw::from_pairs(wide),
            Err(ConfigError::TooManyDimensions { count: 64, max: MAX_DIMENSIONS })
        );

        let widest = (0..MAX_DIMENSIONS).map(|i| (format!("d{i}"), i));
        assert_eq!(Draw::from_pairs(widest).unwrap().len(), MAX_DIMENSIONS);

        assert_eq!(
            Draw::from_pairs([("age", "1"), ("age", "2")]),
            Err(ConfigError::DuplicateDimension { name: "age".to_string() })
        );
        assert_eq!(
            Draw::from_pairs([("age", "1"), (" ", "2")]),
            Err(ConfigError::BlankDimensionName { index: 1 })
        );
    }

    #[test]
    fn test_choice_draws_are_uniform() {
        let dim = Dimension::new(
            "country",
            Domain::choice(["TW", "JP", "US", "KR", "CN", "CA", "UK", "FR", "DE", "IT"]),
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let samples = 20_000;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for _ in 0..samples {
            *counts.entry(dim.sample(&mut rng)).or_default() += 1;
        }
        // df = 9, p = 0.001
        assert!(chi_square(&counts, 10, samples) < 27.88);
    }

    #[test]
    fn test_range_draws_are_uniform() {
        let dim = Dimension::new("age", Domain::range(1, 100)).unwrap();
        let mut rng = StdRng::seed_from_u64(0xa9e);
        let samples = 100_000;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for _ in 0..samples {
            *counts.entry(dim.sample(&mut rng)).or_default() += 1;
        }
        assert_eq!(counts.len(), 100);
        // df = 99, p = 0.001
        assert!(chi_square(&counts, 100, samples) < 148.23);
    }

    #[test]
    fn test_full_range_cardinality_saturates() {
        assert_eq!(Domain::range(i64::MIN, i64::MAX).cardinality(), u64::MAX);
        assert_eq!(Domain::range(-5, 5).cardinality(), 11);
        assert!(Dimension::new("id", Domain::range(i64::MIN, i64::MAX)).is_ok());
    }

    #[test]
    fn test_domain_display() {
        assert_eq!(Domain::range(1, 100).to_string(), "1..=100");
        assert_eq!(Domain::choice(["M", "F"]).to_string(), "{M, F}");
    }
}
