/// Logs a message with the internal diagnostic logger.
///
/// All SDK internals report through this instead of panicking or
/// printing unconditionally. The message goes to the `log` facade
/// under the `argus` target and, when [`ClientOptions::debug`] is set,
/// additionally to stderr.
///
/// [`ClientOptions::debug`]: crate::ClientOptions
#[macro_export]
macro_rules! argus_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!(target: "argus", $($arg)*);
        if $crate::debug_enabled() {
            eprintln!("[argus] {}", format_args!($($arg)*));
        }
    }};
}

/// Returns the crate release name from cargo metadata.
///
/// Expands to a `&'static str` in the form `pkgname@version`.
#[macro_export]
macro_rules! release_name {
    () => {
        concat!(env!("CARGO_PKG_NAME"), "@", env!("CARGO_PKG_VERSION"))
    };
}
