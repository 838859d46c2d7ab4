//! Tagged result of a keyed read.

/// Result of reading one key through the cache or a loader.
///
/// `NotFound` is a confirmed absence and is cached like a value.
/// `Error` is a failure to find out and is never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V, E> {
    /// The remote holds a value for the key
    Found(V),
    /// The remote confirmed there is no value for the key
    NotFound,
    /// The remote could not be asked
    Error(E),
}

impl<V, E> Lookup<V, E> {
    /// Returns true for `Found`.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Returns true for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Returns true for `Error`.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Borrow the value, if any.
    pub fn value(&self) -> Option<&V> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    /// Collapse into a `Result`, mapping `NotFound` to `Ok(None)`.
    pub fn into_result(self) -> Result<Option<V>, E> {
        match self {
            Self::Found(value) => Ok(Some(value)),
            Self::NotFound => Ok(None),
            Self::Error(err) => Err(err),
        }
    }

    /// Map the found value.
    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> Lookup<U, E> {
        match self {
            Self::Found(value) => Lookup::Found(f(value)),
            Self::NotFound => Lookup::NotFound,
            Self::Error(err) => Lookup::Error(err),
        }
    }

    /// Map the error.
    pub fn map_err<F>(self, f: impl FnOnce(E) -> F) -> Lookup<V, F> {
        match self {
            Self::Found(value) => Lookup::Found(value),
            Self::NotFound => Lookup::NotFound,
            Self::Error(err) => Lookup::Error(f(err)),
        }
    }

    /// Stored form of a settled lookup; `None` for errors.
    pub(crate) fn settled(&self) -> Option<Option<V>>
    where
        V: Clone,
    {
        match self {
            Self::Found(value) => Some(Some(value.clone())),
            Self::NotFound => Some(None),
            Self::Error(_) => None,
        }
    }
}

impl<V, E> From<Option<V>> for Lookup<V, E> {
    fn from(value: Option<V>) -> Self {
        match value {
            Some(value) => Self::Found(value),
            None => Self::NotFound,
        }
    }
}
