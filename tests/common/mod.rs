//! Utility helpers shared across integration tests.

/// Build a single text block, one `\n`-terminated line per argument.
///
/// This macro is primarily used in tests to reduce boilerplate when
/// constructing multi-line documents.
macro_rules! text_block {
    ($($line:expr),* $(,)?) => {
        concat!($($line, "\n"),*)
    };
}
