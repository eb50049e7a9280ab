//! Overload selection by type distance.
//!
//! Given candidate signatures and actual argument values, every candidate
//! receives a numeric distance (the sum of per-position distances) and the
//! unique minimum wins. Distance is computed from an explicit capability
//! table — no runtime reflection:
//!
//! - `0`: the declared default type of the value's kind, or a wrapper
//!   declaration matching the layer's tag
//! - `1`: the kind's capability interface, implemented directly
//! - `2`: the root capability (any data), one more level of indirection
//! - `+0.1` per decorator layer peeled before the matching layer, so an
//!   outer-layer match always beats the value it wraps, while a deep
//!   exact match still beats a shallow interface match
//! - infinite: no relationship
//!
//! A null argument matches any position at 0 (wildcard).

use whistle_data::{Data, DataKind};

use std::fmt;

/// Distance added per decorator layer peeled before a match.
pub const WRAPPER_PENALTY: f64 = 0.1;

/// Distance added when a single pre-expanded array/dataset stands in for
/// individually-spread variadic arguments. The exact value is load-bearing:
/// it breaks ties in favor of the spread call form.
pub const ARRAY_UNPACK_PENALTY: f64 = 0.1;

/// Declared parameter type of a callable signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    /// The root capability: matches every value at distance 2.
    Any,
    /// A kind's capability interface: matches values of that kind at 1.
    Kind(DataKind),
    /// A kind's concrete default type: matches values of that kind at 0.
    Default(DataKind),
    /// A named decorator type: matches a wrapper layer with this tag at 0.
    Wrapper(String),
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Any => write!(f, "data"),
            ParamType::Kind(kind) => write!(f, "{kind}"),
            ParamType::Default(kind) => write!(f, "default {kind}"),
            ParamType::Wrapper(tag) => write!(f, "wrapper<{tag}>"),
        }
    }
}

/// A callable's declared signature.
#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    pub package: String,
    pub name: String,
    pub params: Vec<ParamType>,
    /// When set, the last entry of `params` is the variadic element type.
    pub variadic: bool,
}

impl Signature {
    pub fn new(package: impl Into<String>, name: impl Into<String>, params: Vec<ParamType>) -> Self {
        Signature {
            package: package.into(),
            name: name.into(),
            params,
            variadic: false,
        }
    }

    /// A variadic signature; `params` must end with the element type.
    pub fn new_variadic(
        package: impl Into<String>,
        name: impl Into<String>,
        params: Vec<ParamType>,
    ) -> Self {
        Signature {
            variadic: true,
            ..Signature::new(package, name, params)
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}(", self.package, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
            if self.variadic && i + 1 == self.params.len() {
                write!(f, "...")?;
            }
        }
        write!(f, ")")
    }
}

/// Distance between one declared parameter type and one actual value.
pub fn distance(want: &ParamType, actual: &Data) -> f64 {
    // Null is a wildcard at any position.
    if matches!(actual.unwrap_all(), Data::Null) {
        return 0.0;
    }
    // The root capability is implemented by every layer; no peeling.
    if matches!(want, ParamType::Any) {
        return 2.0;
    }
    let mut layer = actual;
    let mut depth = 0u32;
    let mut best = f64::INFINITY;
    loop {
        let penalty = WRAPPER_PENALTY * f64::from(depth);
        if let Data::Wrapped(wrapped) = layer {
            if let ParamType::Wrapper(tag) = want {
                if tag == wrapped.tag() {
                    best = best.min(penalty);
                }
            }
            layer = wrapped.inner();
            depth += 1;
            continue;
        }
        // Innermost, non-wrapper layer.
        let base = match want {
            ParamType::Kind(kind) if layer.kind() == *kind => 1.0,
            ParamType::Default(kind) if layer.kind() == *kind => 0.0,
            _ => f64::INFINITY,
        };
        best = best.min(base + penalty);
        break;
    }
    best
}

/// Distance of a whole signature against the actual argument values.
pub fn signature_distance(signature: &Signature, args: &[Data]) -> f64 {
    if signature.variadic {
        let Some((element, fixed)) = signature.params.split_last() else {
            return f64::INFINITY;
        };
        if args.len() < fixed.len() {
            return f64::INFINITY;
        }
        let prefix: f64 = fixed
            .iter()
            .zip(args)
            .map(|(param, arg)| distance(param, arg))
            .sum();
        prefix + variadic_distance(element, &args[fixed.len()..])
    } else {
        if args.len() != signature.params.len() {
            return f64::INFINITY;
        }
        signature
            .params
            .iter()
            .zip(args)
            .map(|(param, arg)| distance(param, arg))
            .sum()
    }
}

/// Score the trailing variadic arguments: the worst single element score
/// counts once; no arguments score 0; a sole pre-expanded array/dataset
/// scores as its elements individually plus [`ARRAY_UNPACK_PENALTY`].
fn variadic_distance(element: &ParamType, rest: &[Data]) -> f64 {
    if rest.is_empty() {
        return 0.0;
    }
    let spread = rest
        .iter()
        .map(|arg| distance(element, arg))
        .fold(0.0, f64::max);
    if let [sole] = rest {
        if let Some(items) = expansion_items(sole) {
            let expanded = items
                .iter()
                .map(|item| distance(element, item))
                .fold(0.0, f64::max)
                + ARRAY_UNPACK_PENALTY;
            return spread.min(expanded);
        }
    }
    spread
}

/// Elements a sole variadic argument would expand into.
fn expansion_items(value: &Data) -> Option<Vec<Data>> {
    match value.unwrap_all() {
        Data::Array(items) => Some(items.to_vec()),
        Data::Dataset(ds) => Some(ds.materialize()),
        _ => None,
    }
}

/// Why no single best candidate exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverloadFailure {
    /// Candidates existed but every one scored infinite.
    NoMatch,
    /// Multiple candidates tied at the minimum distance.
    Ambiguous { tied: Vec<usize> },
}

/// Select the unique minimum-distance candidate, by index.
#[expect(
    clippy::float_cmp,
    reason = "distances are exact sums of representable constants; ties must compare equal"
)]
pub fn select_overload(signatures: &[Signature], args: &[Data]) -> Result<usize, OverloadFailure> {
    let mut best: Option<f64> = None;
    let mut tied: Vec<usize> = Vec::new();
    for (index, signature) in signatures.iter().enumerate() {
        let score = signature_distance(signature, args);
        if score.is_infinite() {
            continue;
        }
        match best {
            None => {
                best = Some(score);
                tied = vec![index];
            }
            Some(current) if score < current => {
                best = Some(score);
                tied = vec![index];
            }
            Some(current) if score == current => tied.push(index),
            Some(_) => {}
        }
    }
    match tied.len() {
        0 => Err(OverloadFailure::NoMatch),
        1 => Ok(tied[0]),
        _ => Err(OverloadFailure::Ambiguous { tied }),
    }
}

/// Compute the Levenshtein edit distance between two strings.
///
/// Returns the minimum number of single-character edits (insertions,
/// deletions, or substitutions) required to change one string into the
/// other.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();

    // Early termination for empty strings
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    // Use two rows instead of full matrix (space optimization)
    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];

    for (i, a_char) in a.chars().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_char) in b.chars().enumerate() {
            let cost = usize::from(a_char != b_char);

            curr_row[j + 1] = (prev_row[j + 1] + 1) // deletion
                .min(curr_row[j] + 1) // insertion
                .min(prev_row[j] + cost); // substitution
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

/// "Did you mean" candidates for a failed lookup: registered symbols whose
/// name is within the edit-distance threshold, closest first.
pub fn closest_symbols(
    attempted: &str,
    symbols: &[(String, String)],
    limit: usize,
) -> Vec<String> {
    // Threshold: allow 2 edits for short names, 3 for longer names
    let max_distance = if attempted.len() <= 4 { 2 } else { 3 };

    let mut scored: Vec<(usize, String)> = symbols
        .iter()
        .filter_map(|(package, name)| {
            let d = edit_distance(attempted, name);
            (d <= max_distance).then(|| (d, format!("{package}::{name}")))
        })
        .collect();
    scored.sort();
    scored.dedup();
    scored.into_iter().map(|(_, label)| label).take(limit).collect()
}
