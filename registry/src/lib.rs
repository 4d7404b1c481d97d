//! # Agora Asset Registry
//!
//! Identity primitives and the ownership-tracking seam that the Agora
//! listing ledger builds on. The registry answers three questions the
//! marketplace cannot answer from its own state:
//!
//! - **Who owns this asset?** — [`AssetRegistry::owner_of`]
//! - **May the marketplace move it?** — [`AssetRegistry::is_approved_for`]
//! - **Move it.** — [`AssetRegistry::transfer`]
//!
//! The marketplace never takes custody of an asset; it only asks the
//! registry to transfer one at settlement time. Any ownership backend that
//! can answer the three questions above can sit behind the
//! [`AssetRegistry`] trait. [`InMemoryAssetRegistry`] is the reference
//! implementation, used in tests and as a template for real backends.
//!
//! ## Design Principles
//!
//! 1. Assets are identified by a composite key — collection plus numeric
//!    id — never by a synthetic surrogate ([`AssetKey`]).
//! 2. Approvals are per-asset and revocable. There is no blanket
//!    "operator for everything" grant.
//! 3. Every public type is serializable (serde) for persistence and
//!    wire transport.

pub mod asset;
pub mod registry;

pub use asset::{Address, AssetKey};
pub use registry::{AssetRegistry, InMemoryAssetRegistry, RegistryError};
