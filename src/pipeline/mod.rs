pub mod normalizer;
pub mod fuzzy;
pub mod extraction;
