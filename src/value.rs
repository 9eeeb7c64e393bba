use std::fmt;

use serde::{Deserialize, Serialize};

use crate::signal::Abort;

/// A single parameter value supplied to a test case or fixture.
///
/// # Examples
///
/// ```rust
/// use verdict::value::Arg;
/// let n = Arg::from(42);
/// assert_eq!(n.type_name(), "Int");
/// assert_eq!(n.to_string(), "42");
/// let s = Arg::from("hello");
/// assert_eq!(s.to_string(), "\"hello\"");
/// assert!(Arg::default().is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Arg {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
}

/// The kind of an [`Arg`], used to match theory parameters against datapoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgKind {
    Null,
    Bool,
    Int,
    Float,
    Char,
    Str,
}

impl Arg {
    /// Returns the type name of the value as a string.
    pub fn type_name(&self) -> &'static str {
        match self {
            Arg::Null => "Null",
            Arg::Bool(_) => "Bool",
            Arg::Int(_) => "Int",
            Arg::Float(_) => "Float",
            Arg::Char(_) => "Char",
            Arg::Str(_) => "Str",
        }
    }

    pub fn kind(&self) -> ArgKind {
        match self {
            Arg::Null => ArgKind::Null,
            Arg::Bool(_) => ArgKind::Bool,
            Arg::Int(_) => ArgKind::Int,
            Arg::Float(_) => ArgKind::Float,
            Arg::Char(_) => ArgKind::Char,
            Arg::Str(_) => ArgKind::Str,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Arg::Null)
    }

    /// Returns the contained integer if this is an Int value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use verdict::value::Arg;
    /// assert_eq!(Arg::Int(7).as_int(), Some(7));
    /// assert_eq!(Arg::Str("7".into()).as_int(), None);
    /// ```
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Arg::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as a float. Integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Arg::Float(n) => Some(*n),
            Arg::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Arg::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Null => write!(f, "null"),
            Arg::Bool(b) => write!(f, "{b}"),
            Arg::Int(n) => write!(f, "{n}"),
            Arg::Float(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{n:.1}"),
            Arg::Float(n) => write!(f, "{n}"),
            Arg::Char(c) => write!(f, "'{c}'"),
            Arg::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Int(value)
    }
}

impl From<i32> for Arg {
    fn from(value: i32) -> Self {
        Arg::Int(i64::from(value))
    }
}

impl From<u32> for Arg {
    fn from(value: u32) -> Self {
        Arg::Int(i64::from(value))
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Float(value)
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Bool(value)
    }
}

impl From<char> for Arg {
    fn from(value: char) -> Self {
        Arg::Char(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Str(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Str(value)
    }
}

// ============================================================================
// ARGUMENT LISTS
// ============================================================================

/// The ordered argument tuple of one test case or fixture instance.
///
/// Typed accessors return an [`Abort`] fault on a missing index or a type
/// mismatch so a body can use `?` on them.
///
/// # Examples
///
/// ```rust
/// use verdict::{args, value::Args};
/// let a = Args::new(args![2, 2, 4]);
/// assert_eq!(a.to_string(), "(2,2,4)");
/// assert_eq!(a.int(2).ok(), Some(4));
/// assert!(a.str(0).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Args(Vec<Arg>);

impl Args {
    pub fn new(values: Vec<Arg>) -> Self {
        Self(values)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arg> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Arg] {
        &self.0
    }

    fn typed<T>(
        &self,
        index: usize,
        expected: &str,
        pick: impl FnOnce(&Arg) -> Option<T>,
    ) -> Result<T, Abort> {
        let arg = self.0.get(index).ok_or_else(|| {
            Abort::fault(format!(
                "argument {index} is missing; only {} were supplied",
                self.0.len()
            ))
        })?;
        pick(arg).ok_or_else(|| {
            Abort::fault(format!(
                "argument {index} is {} ({arg}), expected {expected}",
                arg.type_name()
            ))
        })
    }

    pub fn int(&self, index: usize) -> Result<i64, Abort> {
        self.typed(index, "Int", Arg::as_int)
    }

    pub fn float(&self, index: usize) -> Result<f64, Abort> {
        self.typed(index, "Float", Arg::as_float)
    }

    pub fn bool(&self, index: usize) -> Result<bool, Abort> {
        self.typed(index, "Bool", Arg::as_bool)
    }

    pub fn str(&self, index: usize) -> Result<&str, Abort> {
        let arg = self
            .0
            .get(index)
            .ok_or_else(|| Abort::fault(format!("argument {index} is missing")))?;
        arg.as_str().ok_or_else(|| {
            Abort::fault(format!(
                "argument {index} is {} ({arg}), expected Str",
                arg.type_name()
            ))
        })
    }
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, arg) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

impl From<Vec<Arg>> for Args {
    fn from(values: Vec<Arg>) -> Self {
        Self(values)
    }
}

impl<'a> IntoIterator for &'a Args {
    type Item = &'a Arg;
    type IntoIter = std::slice::Iter<'a, Arg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Builds a `Vec<Arg>` from heterogeneous literals.
///
/// ```rust
/// use verdict::{args, value::Arg};
/// assert_eq!(args![1, "a", true], vec![Arg::Int(1), Arg::Str("a".into()), Arg::Bool(true)]);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::value::Arg>::new()
    };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::value::Arg::from($value)),+]
    };
}
