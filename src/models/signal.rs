use std::fmt;

use serde::{Deserialize, Serialize};

use super::lead::Lead;

/// Digitized waveform of one lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadSignal {
    /// Lead this waveform belongs to
    pub lead: Lead,
    /// Amplitude samples, fixed length across leads
    pub samples: Vec<f64>,
    /// Millivolts per working-image pixel used for amplitude scaling
    pub mv_per_pixel: f64,
    /// True if the lead had no trace and was substituted with zeros
    pub zero_filled: bool,
}

impl LeadSignal {
    /// Zero signal used when a lead is degraded instead of aborting
    pub fn zeros(lead: Lead, len: usize, mv_per_pixel: f64) -> Self {
        Self {
            lead,
            samples: vec![0.0; len],
            mv_per_pixel,
            zero_filled: true,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if there are no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Peak-to-peak amplitude
    pub fn peak_to_peak(&self) -> f64 {
        let min = self.samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = self.samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if self.samples.is_empty() { 0.0 } else { max - min }
    }
}

/// All lead signals concatenated in canonical lead order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Flat feature values
    pub values: Vec<f64>,
    /// Samples contributed by each lead
    pub samples_per_lead: usize,
}

impl FeatureVector {
    /// Total length
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if there are no features
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Slice belonging to the lead at canonical position `index`
    pub fn lead_slice(&self, index: usize) -> Option<&[f64]> {
        let start = index * self.samples_per_lead;
        self.values.get(start..start + self.samples_per_lead)
    }
}

/// PCA-projected feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedVector(pub Vec<f64>);

impl ReducedVector {
    /// Projected values
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no components
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Final classification result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisLabel {
    /// Index into the classifier's label set
    pub class_index: usize,
    /// Class name
    pub name: String,
}

impl DiagnosisLabel {
    /// Typed condition, if the name is one of the known classes
    pub fn condition(&self) -> Option<Condition> {
        Condition::from_name(&self.name)
    }
}

impl fmt::Display for DiagnosisLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Known diagnostic classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    /// Irregular heartbeat
    AbnormalHeartbeat,
    /// Acute myocardial infarction
    MyocardialInfarction,
    /// Normal sinus rhythm
    Normal,
    /// Evidence of a previous infarction
    HistoryOfMyocardialInfarction,
}

impl Condition {
    /// Classes in the order the shipped classifier emits them
    pub const ALL: [Condition; 4] = [
        Condition::AbnormalHeartbeat,
        Condition::MyocardialInfarction,
        Condition::Normal,
        Condition::HistoryOfMyocardialInfarction,
    ];

    /// Label text
    pub fn name(self) -> &'static str {
        match self {
            Condition::AbnormalHeartbeat => "Abnormal Heartbeat",
            Condition::MyocardialInfarction => "Myocardial Infarction",
            Condition::Normal => "Normal",
            Condition::HistoryOfMyocardialInfarction => "History of Myocardial Infarction",
        }
    }

    /// Parse a label, ignoring case and surrounding whitespace
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    /// Default ordered label set
    pub fn default_labels() -> Vec<String> {
        Self::ALL.iter().map(|c| c.name().to_string()).collect()
    }
}
