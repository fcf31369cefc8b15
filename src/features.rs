//! Feature assembly: lead signals to one flat vector

use crate::error::{EcgError, Result};
use crate::models::{FeatureVector, LeadSignal};

/// Concatenate lead signals in canonical lead order
/// (I, II, III, aVR, aVL, aVF, V1-V6, rhythm), whatever order they arrive in.
///
/// Every signal must have exactly `samples_per_lead` samples and each lead
/// may appear once.
pub fn assemble(
    signals: &[LeadSignal],
    expected_leads: usize,
    samples_per_lead: usize,
) -> Result<FeatureVector> {
    if signals.len() != expected_leads {
        return Err(EcgError::LeadCount {
            expected: expected_leads,
            actual: signals.len(),
        });
    }
    if let Some(bad) = signals.iter().find(|s| s.len() != samples_per_lead) {
        return Err(EcgError::SignalLength {
            lead: bad.lead,
            expected: samples_per_lead,
            actual: bad.len(),
        });
    }

    let mut ordered: Vec<&LeadSignal> = signals.iter().collect();
    ordered.sort_by_key(|s| s.lead.canonical_index());
    if let Some(pair) = ordered.windows(2).find(|w| w[0].lead == w[1].lead) {
        return Err(EcgError::DuplicateLead { lead: pair[0].lead });
    }

    let mut values = Vec::with_capacity(expected_leads * samples_per_lead);
    for signal in ordered {
        values.extend_from_slice(&signal.samples);
    }

    Ok(FeatureVector {
        values,
        samples_per_lead,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Lead;

    fn signal(lead: Lead, value: f64, len: usize) -> LeadSignal {
        LeadSignal {
            lead,
            samples: vec![value; len],
            mv_per_pixel: 0.01,
            zero_filled: false,
        }
    }

    #[test]
    fn orders_by_canonical_lead() {
        // Grid order as segmented: I, aVR, V1, ..., rhythm
        let grid = [
            Lead::I,
            Lead::AVR,
            Lead::V1,
            Lead::V4,
            Lead::II,
            Lead::AVL,
            Lead::V2,
            Lead::V5,
            Lead::III,
            Lead::AVF,
            Lead::V3,
            Lead::V6,
            Lead::Rhythm,
        ];
        let signals: Vec<LeadSignal> = grid
            .iter()
            .map(|&l| signal(l, l.canonical_index() as f64, 4))
            .collect();
        let fv = assemble(&signals, 13, 4).unwrap();
        assert_eq!(fv.len(), 13 * 4);
        for (i, lead) in Lead::CANONICAL.iter().enumerate() {
            assert_eq!(fv.lead_slice(i).unwrap(), &[lead.canonical_index() as f64; 4]);
        }
    }

    #[test]
    fn rejects_wrong_lengths_and_counts() {
        let mut signals: Vec<LeadSignal> =
            Lead::CANONICAL.iter().map(|&l| signal(l, 0.0, 5)).collect();
        assert!(matches!(
            assemble(&signals[..12], 13, 5),
            Err(EcgError::LeadCount {
                expected: 13,
                actual: 12
            })
        ));
        signals[3].samples.pop();
        assert!(matches!(
            assemble(&signals, 13, 5),
            Err(EcgError::SignalLength {
                lead: Lead::AVR,
                expected: 5,
                actual: 4
            })
        ));
    }

    #[test]
    fn rejects_duplicate_leads() {
        let mut signals: Vec<LeadSignal> =
            Lead::CANONICAL.iter().map(|&l| signal(l, 0.0, 2)).collect();
        signals[1].lead = Lead::I;
        let err = assemble(&signals, 13, 2).unwrap_err();
        assert!(matches!(err, EcgError::DuplicateLead { lead: Lead::I }));
        assert!(!err.is_fatal());
        assert!(!err.is_input_error());
    }
}
