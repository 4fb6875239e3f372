use std::error::Error;

use crate::protocol::{Event, Exception, Level};

/// Extracts the exception chain from an error.
///
/// Walks [`Error::source`] and emits one [`Exception`] per link,
/// ordered from innermost cause to the error itself, which matches the
/// order the server expects.
pub fn exceptions_from_error(err: &dyn Error) -> Vec<Exception> {
    let mut exceptions = vec![exception_from_error(err)];

    let mut source = err.source();
    while let Some(err) = source {
        exceptions.push(exception_from_error(err));
        source = err.source();
    }

    exceptions.reverse();
    exceptions
}

fn exception_from_error(err: &dyn Error) -> Exception {
    let dbg = format!("{:?}", err);
    let value = err.to_string();

    // `Debug` usually starts with the type name, which `Display` does
    // not carry; strip a `Variant { .. }` or `Variant(..)` payload and
    // keep what is left as the type
    let ty = dbg
        .split(&[' ', '(', '{', '\n'][..])
        .next()
        .filter(|ty| !ty.is_empty() && *ty != value)
        .unwrap_or("Error")
        .to_owned();

    Exception {
        ty,
        value: Some(value),
        ..Default::default()
    }
}

/// Creates an error event from an error.
pub fn event_from_error<E: Error + ?Sized>(err: &E) -> Event {
    Event {
        exception: exceptions_from_error(&err),
        level: Level::Error,
        ..Event::new()
    }
}
