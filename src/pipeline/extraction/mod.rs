pub mod types;
pub mod measurements;
pub mod fallback;
pub mod diseases;
pub mod medications;
pub mod sections;
pub mod header;

pub use types::*;
pub use measurements::{extract_measurements, MeasurementExtraction, MeasurementSet};
pub use fallback::{normalize_test_name, scan_generic_lines};
pub use diseases::{extract_diseases, DiseaseNormalizer};
pub use medications::{extract_medications, CanonicalMedication, MedicationNormalizer};
pub use sections::{extract_findings, extract_recommendations, SectionMap};
pub use header::extract_header;
