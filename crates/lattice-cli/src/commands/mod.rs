pub mod analytics;
pub mod pricing;
