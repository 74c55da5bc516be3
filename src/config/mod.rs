// Re-export all items from the submodules
mod collection_plan;
mod env_vars;

pub use collection_plan::{load_or_default, ArtifactSpec, CollectionPlan, MetadataEntry};

pub use env_vars::expand_env_vars;
