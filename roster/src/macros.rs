//! Macros for roster error handling.
//!
//! Provides convenience macros for creating and returning
//! [`crate::error::RosterError`] instances with reduced boilerplate.

/// Creates a [`crate::error::RosterError`] from error kind and description.
///
/// Accepts an optional dynamic detail (anything implementing `ToString`) and
/// an optional source error.
#[macro_export]
macro_rules! roster_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::RosterError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::RosterError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::RosterError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::RosterError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Creates and returns a [`crate::error::RosterError`] from the current function.
///
/// Combines error creation with early return for error conditions that should
/// immediately terminate execution. Supports the same optional detail and
/// source arguments as [`roster_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return ::core::result::Result::Err($crate::roster_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::roster_error!($kind, $desc, source: $source))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::roster_error!($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::roster_error!(
            $kind,
            $desc,
            $detail,
            source: $source
        ))
    };
}
