//! Declarative predicates over raw frame payloads.
//!
//! Matching is textual containment over the serialized JSON, not structural:
//! every required fragment must occur somewhere in the payload (logical AND,
//! order-independent, case-sensitive). This keeps predicates immune to key
//! reordering and formatting differences between client builds; matched
//! payloads are decoded into typed frames afterwards.

/// A set of substrings a payload must all contain to match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FramePredicate {
    required: Vec<String>,
}

impl FramePredicate {
    /// An empty predicate. Matches every payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a predicate from a list of required fragments.
    pub fn all<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { required: required.into_iter().map(Into::into).collect() }
    }

    /// Add one more required fragment.
    pub fn and(mut self, fragment: impl Into<String>) -> Self {
        self.required.push(fragment.into());
        self
    }

    /// True iff every required fragment occurs in `payload`.
    pub fn matches(&self, payload: &str) -> bool {
        self.required.iter().all(|fragment| payload.contains(fragment.as_str()))
    }

    pub fn len(&self) -> usize {
        self.required.len()
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }
}

impl std::fmt::Display for FramePredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.required.join(", "))
    }
}

impl<S: Into<String>> FromIterator<S> for FramePredicate {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::all(iter)
    }
}
