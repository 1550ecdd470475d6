mod candidate;
mod catalog;
mod video;

pub use candidate::Candidate;
pub use catalog::{Alias, AliasSource, Catalog, CatalogEntry, CatalogMeta, WhitelistChannel};
pub use video::{ApiStatus, VideoRecord};
