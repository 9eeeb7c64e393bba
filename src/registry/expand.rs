//! Expansion of parameter sources into argument tuples, and the naming rules
//! for expanded cases.

use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use sha2::{Digest, Sha256};

use super::builder::{ParamSpec, Strategy};
use crate::value::{Arg, ArgKind, Args};

/// Why one parameter produced no usable values.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParamIssue {
    NoValues,
    InvalidRange(String),
}

/// A generator for random parameters, seeded from the run seed and the
/// method's full name so a seed reproduces a run exactly.
pub(crate) fn rng_for(seed: u64, method_full_name: &str) -> Xoshiro256StarStar {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(method_full_name.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    Xoshiro256StarStar::from_seed(bytes)
}

/// Produces the values of one parameter.
pub(crate) fn param_values(
    spec: &ParamSpec,
    datapoints: &[Arg],
    rng: &mut Xoshiro256StarStar,
) -> Result<Vec<Arg>, ParamIssue> {
    let values = match spec {
        ParamSpec::Values(values) => values.clone(),
        ParamSpec::Range { from, to, step } => {
            if *step == 0 {
                return Err(ParamIssue::InvalidRange("step must not be zero".into()));
            }
            if (*step > 0 && from > to) || (*step < 0 && from < to) {
                return Err(ParamIssue::InvalidRange(format!(
                    "step {step} never reaches {to} from {from}"
                )));
            }
            let mut values = Vec::new();
            let mut current = *from;
            while (*step > 0 && current <= *to) || (*step < 0 && current >= *to) {
                values.push(Arg::Int(current));
                match current.checked_add(*step) {
                    Some(next) => current = next,
                    None => break,
                }
            }
            values
        }
        ParamSpec::RandomInt { count, min, max } => {
            if min >= max {
                return Err(ParamIssue::InvalidRange(format!(
                    "min {min} must be less than max {max}"
                )));
            }
            (0..*count)
                .map(|_| Arg::Int(rng.gen_range(*min..*max)))
                .collect()
        }
        ParamSpec::RandomFloat { count, min, max } => {
            if min >= max || !min.is_finite() || !max.is_finite() {
                return Err(ParamIssue::InvalidRange(format!(
                    "min {min} must be less than max {max}"
                )));
            }
            (0..*count)
                .map(|_| Arg::Float(rng.gen_range(*min..*max)))
                .collect()
        }
        ParamSpec::Datapoints(kind) => {
            let matching: Vec<Arg> = datapoints
                .iter()
                .filter(|d| d.kind() == *kind)
                .cloned()
                .collect();
            if matching.is_empty() && *kind == ArgKind::Bool {
                vec![Arg::Bool(true), Arg::Bool(false)]
            } else {
                matching
            }
        }
    };
    if values.is_empty() {
        return Err(ParamIssue::NoValues);
    }
    Ok(values)
}

/// Combines per-parameter value lists into argument tuples.
///
/// `Combinatorial` yields the cross product in row-major order (the last
/// parameter varies fastest); `Sequential` zips, padding with `Null`.
pub(crate) fn combine(strategy: Strategy, lists: &[Vec<Arg>]) -> Vec<Args> {
    if lists.is_empty() {
        return Vec::new();
    }
    match strategy {
        Strategy::Combinatorial => {
            let mut rows: Vec<Vec<Arg>> = vec![Vec::new()];
            for list in lists {
                rows = rows
                    .into_iter()
                    .flat_map(|row| {
                        list.iter().map(move |value| {
                            let mut next = row.clone();
                            next.push(value.clone());
                            next
                        })
                    })
                    .collect();
            }
            rows.into_iter().map(Args::new).collect()
        }
        Strategy::Sequential => {
            let longest = lists.iter().map(Vec::len).max().unwrap_or(0);
            (0..longest)
                .map(|i| {
                    Args::new(
                        lists
                            .iter()
                            .map(|list| list.get(i).cloned().unwrap_or_default())
                            .collect(),
                    )
                })
                .collect()
        }
    }
}

/// The derived display name of one case: `Method(args)`.
pub(crate) fn case_name(method: &str, args: &Args) -> String {
    format!("{method}{args}")
}

/// Makes sibling names unique. The first occurrence keeps its name; later
/// ones get `#2`, `#3`, ... skipping suffixes that are already taken.
pub(crate) fn disambiguate(names: &mut [String]) {
    let mut taken: HashSet<String> = names.iter().cloned().collect();
    let mut seen: HashSet<String> = HashSet::new();
    for name in names.iter_mut() {
        if seen.insert(name.clone()) {
            continue;
        }
        let mut n = 2;
        let unique = loop {
            let candidate = format!("{name}#{n}");
            if !taken.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        taken.insert(unique.clone());
        seen.insert(unique.clone());
        *name = unique;
    }
}
