/// Модуль предобработки данных

pub mod feature_engineering;
pub mod loader;
pub mod normalization;
pub mod split;
pub mod target;

pub use feature_engineering::{engineer_features, FeatureEngineer};
pub use loader::load_dataset;
pub use normalization::{fit_scale, StandardScaler};
pub use split::{split, Partition, Split};
pub use target::normalize_target;
