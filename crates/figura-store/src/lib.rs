//! On-disk store for rendered diagram assets.
//!
//! Assets are partitioned by [`Theme`] and addressed by content hash. Live
//! editing sessions additionally get path-keyed aliases under `dev/`:
//!
//! ```text
//! {root}/
//! +-- light/
//! |   +-- 3f2a9c0d1e4b5a67.svg     # hashed asset
//! |   +-- dev/
//! |       +-- 9b1c2d3e4f5a6b7c.svg # alias, overwritten on every pass
//! +-- dark/
//!     +-- ...
//! ```

mod store;
mod theme;

pub use store::{AssetStore, StoreError};
pub use theme::Theme;
