//! Macros for BigQuery error handling.

/// Creates a [`crate::error::BqError`] from error kind and static message.
///
/// Accepts an optional dynamic detail (use `detail =` to move an owned [`String`]) and
/// an optional source error.
#[macro_export]
macro_rules! bq_error {
    ($kind:expr, $msg:expr) => {
        $crate::error::BqError::from(($kind, $msg))
    };
    ($kind:expr, $msg:expr, source: $source:expr) => {
        $crate::error::BqError::from(($kind, $msg)).with_source($source)
    };
    ($kind:expr, $msg:expr, detail = $detail:expr) => {
        $crate::error::BqError::from(($kind, $msg, $detail))
    };
    ($kind:expr, $msg:expr, detail = $detail:expr, source: $source:expr) => {
        $crate::error::BqError::from(($kind, $msg, $detail)).with_source($source)
    };
    ($kind:expr, $msg:expr, $detail:expr) => {
        $crate::error::BqError::from(($kind, $msg, $detail.to_string()))
    };
    ($kind:expr, $msg:expr, $detail:expr, source: $source:expr) => {
        $crate::error::BqError::from(($kind, $msg, $detail.to_string())).with_source($source)
    };
}

/// Creates and returns a [`crate::error::BqError`] from the current function.
///
/// Supports the same optional detail argument as [`bq_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $msg:expr) => {
        return ::core::result::Result::Err($crate::bq_error!($kind, $msg))
    };
    ($kind:expr, $msg:expr, detail = $detail:expr) => {
        return ::core::result::Result::Err($crate::bq_error!($kind, $msg, detail = $detail))
    };
    ($kind:expr, $msg:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::bq_error!($kind, $msg, $detail))
    };
}
