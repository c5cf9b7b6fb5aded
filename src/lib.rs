pub mod experiments;
pub mod metrics;
pub mod optimize;
pub mod pipeline;
pub mod rewrite;
pub mod selection;
pub mod types;
