const COUNTER_NAME_CHARS: &str = "abcdefghijklmnopqrstuvwxyz0123456789_.-";

/// A counter's name.
///
/// Characters supported: a-z 0-9 . _ -
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, std::hash::Hash, Debug)]
pub struct CounterName<'a>(&'a str);

impl std::fmt::Display for CounterName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'a> TryFrom<&'a str> for CounterName<'a> {
    type Error = ();

    fn try_from(value: &'a str) -> Result<Self, Self::Error> {
        if value.is_empty() || value.chars().any(|c| !COUNTER_NAME_CHARS.contains(c)) {
            Err(())
        } else {
            Ok(Self(value))
        }
    }
}

impl<'a> std::ops::Deref for CounterName<'a> {
    type Target = &'a str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for CounterName<'_> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
