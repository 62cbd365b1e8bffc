//! # Transactional Mutation Primitives
//!
//! One module per primitive family, each an `impl StockEngine` block:
//!
//! - [`adjust`] - Direct signed adjustment of a product's quantity
//! - [`transfer`] - Inter-location transfer (two counters, two ledger rows)
//! - [`batch`] - Batch create/adjust/delete
//! - [`purchase`] - Purchase order place/cancel/receive
//! - [`sale`] - Sale checkout and void
//! - [`bulk`] - Bulk adjust/delete/import
//! - [`location`] - Guarded location deletion
//!
//! Every primitive follows the shape documented on
//! [`crate::engine::StockEngine`]: authenticate, validate, ownership
//! check, one transaction around guard + counters + ledger, then
//! fire-and-forget audit and cache invalidation.

pub mod adjust;
pub mod batch;
pub mod bulk;
pub mod location;
pub mod purchase;
pub mod sale;
pub mod transfer;
