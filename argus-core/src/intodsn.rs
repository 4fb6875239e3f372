use std::borrow::Cow;

use argus_types::Dsn;

/// Helper trait to convert a DSN-ish value into an optional [`Dsn`].
///
/// A string that fails to parse converts to `None` with a diagnostic
/// log line instead of an error, so misconfiguration disables the
/// client rather than taking the host application down.
pub trait IntoDsn {
    /// Converts the value into a [`Dsn`].
    fn into_dsn(self) -> Option<Dsn>;
}

impl<I: IntoDsn> IntoDsn for Option<I> {
    fn into_dsn(self) -> Option<Dsn> {
        self.and_then(IntoDsn::into_dsn)
    }
}

impl IntoDsn for () {
    fn into_dsn(self) -> Option<Dsn> {
        None
    }
}

impl<'a> IntoDsn for &'a str {
    fn into_dsn(self) -> Option<Dsn> {
        if self.is_empty() {
            return None;
        }
        match self.parse() {
            Ok(dsn) => Some(dsn),
            Err(err) => {
                crate::argus_debug!("discarding invalid DSN: {}", err);
                None
            }
        }
    }
}

impl<'a> IntoDsn for Cow<'a, str> {
    fn into_dsn(self) -> Option<Dsn> {
        self.as_ref().into_dsn()
    }
}

impl<'a> IntoDsn for &'a String {
    fn into_dsn(self) -> Option<Dsn> {
        self.as_str().into_dsn()
    }
}

impl IntoDsn for String {
    fn into_dsn(self) -> Option<Dsn> {
        self.as_str().into_dsn()
    }
}

impl<'a> IntoDsn for &'a Dsn {
    fn into_dsn(self) -> Option<Dsn> {
        Some(self.clone())
    }
}

impl IntoDsn for Dsn {
    fn into_dsn(self) -> Option<Dsn> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_dsn() {
        assert!("https://public@example.com/42".into_dsn().is_some());
        assert!("".into_dsn().is_none());
        assert!("not a dsn".into_dsn().is_none());
        assert!(().into_dsn().is_none());
        assert!(None::<&str>.into_dsn().is_none());
    }
}
