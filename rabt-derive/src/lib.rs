//! Derive macros for rabt.
//!
//! Re-exported from the `rabt` facade; depend on that instead.

pub use rabt_macros::Injectable;
