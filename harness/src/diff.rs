//! Recursive structural diff between two values.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use control_kit_common::value::{index_path, key_path, ValueKind, ROOT_PATH};

/// How two values differ at one path.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DifferenceKind {
    /// The values have different kinds.
    KindMismatch { left: ValueKind, right: ValueKind },
    /// A key present on the right only.
    MissingLeft,
    /// A key present on the left only.
    MissingRight,
    /// Sequences of different length; items are not compared further.
    LengthMismatch { left: usize, right: usize },
    /// Scalars of the same kind with different values.
    ValueMismatch { left: String, right: String },
}

/// One difference, keyed by path (`$.a.b[2]`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Difference {
    pub path: String,
    #[serde(flatten)]
    pub kind: DifferenceKind,
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DifferenceKind::KindMismatch { left, right } => {
                write!(f, "{}: kind mismatch {} vs {}", self.path, left, right)
            }
            DifferenceKind::MissingLeft => write!(f, "{}: missing in first value", self.path),
            DifferenceKind::MissingRight => write!(f, "{}: missing in second value", self.path),
            DifferenceKind::LengthMismatch { left, right } => {
                write!(f, "{}: length mismatch {} vs {}", self.path, left, right)
            }
            DifferenceKind::ValueMismatch { left, right } => {
                write!(f, "{}: value mismatch {} vs {}", self.path, left, right)
            }
        }
    }
}

/// Every difference between `left` and `right`, in key order.
pub fn diff(left: &Value, right: &Value) -> Vec<Difference> {
    let mut out = Vec::new();
    diff_at(left, right, ROOT_PATH, &mut out);
    out
}

/// The first difference, if any.
pub fn first_difference(left: &Value, right: &Value) -> Option<Difference> {
    diff(left, right).into_iter().next()
}

fn diff_at(left: &Value, right: &Value, path: &str, out: &mut Vec<Difference>) {
    let push = |out: &mut Vec<Difference>, kind| {
        out.push(Difference {
            path: path.to_string(),
            kind,
        })
    };

    match (left, right) {
        (Value::Object(l), Value::Object(r)) => {
            let mut keys: Vec<&String> = l.keys().chain(r.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child = key_path(path, key);
                match (l.get(key), r.get(key)) {
                    (Some(a), Some(b)) => diff_at(a, b, &child, out),
                    (None, Some(_)) => out.push(Difference {
                        path: child,
                        kind: DifferenceKind::MissingLeft,
                    }),
                    (Some(_), None) => out.push(Difference {
                        path: child,
                        kind: DifferenceKind::MissingRight,
                    }),
                    (None, None) => {}
                }
            }
        }
        (Value::Array(l), Value::Array(r)) => {
            if l.len() != r.len() {
                push(
                    out,
                    DifferenceKind::LengthMismatch {
                        left: l.len(),
                        right: r.len(),
                    },
                );
                return;
            }
            for (index, (a, b)) in l.iter().zip(r).enumerate() {
                diff_at(a, b, &index_path(path, index), out);
            }
        }
        _ => {
            let (lk, rk) = (ValueKind::of(left), ValueKind::of(right));
            if lk != rk {
                push(
                    out,
                    DifferenceKind::KindMismatch {
                        left: lk,
                        right: rk,
                    },
                );
            } else if left != right {
                push(
                    out,
                    DifferenceKind::ValueMismatch {
                        left: left.to_string(),
                        right: right.to_string(),
                    },
                );
            }
        }
    }
}
