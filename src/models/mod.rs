pub mod contour;
pub mod image;
pub mod lead;
pub mod matrix;
pub mod point;
pub mod signal;

pub use contour::TraceContour;
pub use image::{GrayscaleImage, IntensityStats, SourceImage};
pub use lead::{Lead, LeadRegion, PixelRect};
pub use matrix::BitMatrix;
pub use point::PointI;
pub use signal::{Condition, DiagnosisLabel, FeatureVector, LeadSignal, ReducedVector};
