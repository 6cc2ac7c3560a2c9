//! Request variant generation.
//!
//! For one [`Draw`] over `n` dimensions the variant set holds one URL per
//! non-empty subset of dimensions (`2^n - 1`), plus the bare base URL when
//! unfiltered traffic is enabled. Subsets are enumerated by size, then in
//! lexicographic order of canonical dimension positions; inside a URL the
//! dimensions always appear in canonical order.
//!
//! Selection is uniform over the enumerated list, so single-filter requests
//! and the bare URL are each as likely as any single multi-filter
//! combination.

use crate::domain::Draw;
use rand::Rng;
use serde::Serialize;
use url::form_urlencoded;

/// Shape label of the unfiltered variant
pub const BARE_SHAPE: &str = "(bare)";

/// One concrete request target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    url: String,
    shape: String,
}

impl Variant {
    /// Full request URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Dimension names present, joined by `&`, or [`BARE_SHAPE`]
    pub fn shape(&self) -> &str {
        &self.shape
    }

    /// Whether this is the unfiltered base URL
    pub fn is_bare(&self) -> bool {
        self.shape == BARE_SHAPE
    }
}

/// Non-empty, ordered list of variants for one draw
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantSet {
    variants: Vec<Variant>,
}

impl VariantSet {
    /// Number of variants
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Always false: a draw has at least one dimension
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Variants in enumeration order
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// URLs in enumeration order
    pub fn urls(&self) -> Vec<&str> {
        self.variants.iter().map(Variant::url).collect()
    }

    /// Pick one variant uniformly at random
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &Variant {
        &self.variants[rng.random_range(0..self.variants.len())]
    }
}

/// Number of variants produced for `dimensions` dimensions.
///
/// Saturates at `usize::MAX`; a [`Draw`] never carries more than
/// [`MAX_DIMENSIONS`](crate::domain::MAX_DIMENSIONS) entries.
pub fn variant_count(dimensions: usize, include_bare: bool) -> usize {
    let filtered = u32::try_from(dimensions)
        .ok()
        .and_then(|shift| 1usize.checked_shl(shift))
        .map_or(usize::MAX, |n| n - 1);
    filtered.saturating_add(usize::from(include_bare))
}

/// Enumerate every variant for a draw.
pub fn build_variants(base_url: &str, draw: &Draw, include_bare: bool) -> VariantSet {
    let entries = draw.entries();
    let mut variants = Vec::with_capacity(variant_count(entries.len(), include_bare));

    if include_bare {
        variants.push(Variant {
            url: base_url.to_string(),
            shape: BARE_SHAPE.to_string(),
        });
    }

    for subset in subsets(entries.len()) {
        let mut query = form_urlencoded::Serializer::new(String::new());
        let mut shape = String::new();
        for &i in &subset {
            let entry = &entries[i];
            query.append_pair(&entry.name, &entry.value);
            if !shape.is_empty() {
                shape.push('&');
            }
            shape.push_str(&entry.name);
        }
        variants.push(Variant {
            url: format!("{}?{}", base_url, query.finish()),
            shape,
        });
    }

    VariantSet { variants }
}

/// Uniform pick over an enumerated set
pub fn choose_variant<'a, R: Rng + ?Sized>(variants: &'a VariantSet, rng: &mut R) -> &'a Variant {
    variants.choose(rng)
}

/// Non-empty index subsets of `0..n`, by size then lexicographically.
fn subsets(n: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::with_capacity(variant_count(n, false));
    let mut current = Vec::with_capacity(n);
    for size in 1..=n {
        push_combinations(n, size, 0, &mut current, &mut out);
    }
    out
}

fn push_combinations(
    n: usize,
    size: usize,
    start: usize,
    current: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if current.len() == size {
        out.push(current.clone());
        return;
    }
    let needed = size - current.len();
    for i in start..=(n - needed) {
        current.push(i);
        push_combinations(n, size, i + 1, current, out);
        current.pop();
    }
}
