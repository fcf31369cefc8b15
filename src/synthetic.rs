//! Synthetic ECG printouts
//!
//! Renders a sheet in the standard layout with a waveform drawn inside each
//! lead box. Amplitudes are given in millivolts and mapped to pixels with
//! the same paper calibration the digitizer uses, so a rendered sheet can
//! be digitized back to known values.

use crate::artifacts::ModelArtifacts;
use crate::classifier::{Classifier, ClassifierModel};
use crate::config::{Calibration, PipelineConfig};
use crate::digitizer;
use crate::error::{EcgError, Result};
use crate::features;
use crate::models::{Condition, FeatureVector, Lead, LeadSignal, PixelRect, SourceImage};
use crate::projection::Pca;
use crate::segmentation::{self, LeadLayout};
use crate::utils::grayscale;

/// Seconds of signal shown in a grid lead box
pub const GRID_LEAD_SECONDS: f64 = 2.5;
/// Seconds of signal shown in the rhythm strip
pub const RHYTHM_SECONDS: f64 = 10.0;

/// Colours and stroke of a rendered sheet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetStyle {
    /// Background colour
    pub paper: [u8; 3],
    /// Grid line colour; `None` for plain paper
    pub grid: Option<[u8; 3]>,
    /// Grid spacing in millimetres
    pub grid_mm: f64,
    /// Trace colour
    pub ink: [u8; 3],
    /// Half-width of the trace stroke in pixels
    pub stroke_radius: usize,
}

impl Default for SheetStyle {
    fn default() -> Self {
        Self {
            paper: [255, 240, 240],
            grid: Some([250, 225, 225]),
            grid_mm: 5.0,
            ink: [20, 20, 20],
            stroke_radius: 1,
        }
    }
}

/// Sheet renderer
#[derive(Debug, Clone)]
pub struct SyntheticSheet {
    /// Sheet width in pixels
    pub width: usize,
    /// Sheet height in pixels
    pub height: usize,
    /// Where each lead is drawn
    pub layout: LeadLayout,
    /// Paper and ink
    pub style: SheetStyle,
    /// Millimetre and millivolt scale
    pub calibration: Calibration,
}

impl SyntheticSheet {
    /// Standard layout and style at the given size
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            layout: LeadLayout::standard(),
            style: SheetStyle::default(),
            calibration: Calibration::default(),
        }
    }

    /// Use plain paper without grid lines
    pub fn without_grid(mut self) -> Self {
        self.style.grid = None;
        self
    }

    /// Pixels per millivolt on this sheet
    pub fn px_per_mv(&self) -> f64 {
        self.calibration.mm_per_mv * self.height as f64 / self.calibration.paper_height_mm
    }

    /// Render every lead with `waveform(lead, seconds) -> millivolts`
    pub fn render<F>(&self, waveform: F) -> Result<SourceImage>
    where
        F: Fn(Lead, f64) -> f64,
    {
        let mut canvas = Canvas::new(self.width, self.height, self.style.paper);
        if let Some(grid) = self.style.grid {
            let mm = self.height as f64 / self.calibration.paper_height_mm;
            let step = (self.style.grid_mm * mm).max(2.0);
            canvas.grid(step, grid);
        }

        let px_per_mv = self.px_per_mv();
        for b in &self.layout.boxes {
            let rect = b.pixel_rect(self.width, self.height);
            let seconds = if b.lead.is_rhythm() {
                RHYTHM_SECONDS
            } else {
                GRID_LEAD_SECONDS
            };
            self.draw_lead(&mut canvas, rect, |t| waveform(b.lead, t * seconds) * px_per_mv);
        }

        SourceImage::new(self.width, self.height, canvas.data)
    }

    /// Draw a trace across `rect`; `offset(t)` is the upward displacement in
    /// pixels at `t` in [0, 1]
    fn draw_lead(&self, canvas: &mut Canvas, rect: PixelRect, offset: impl Fn(f64) -> f64) {
        let margin_x = (rect.width / 20).max(2);
        let margin_y = (rect.height / 20).max(2) + self.style.stroke_radius;
        if rect.width <= 2 * margin_x + 1 || rect.height <= 2 * margin_y + 1 {
            return;
        }
        let x0 = rect.x + margin_x;
        let x1 = rect.x + rect.width - margin_x;
        let top = (rect.y + margin_y) as f64;
        let bottom = (rect.y + rect.height - margin_y - 1) as f64;
        let center = (top + bottom) / 2.0;
        let span = (x1 - 1 - x0).max(1) as f64;

        let mut prev: Option<i64> = None;
        for x in x0..x1 {
            let t = (x - x0) as f64 / span;
            let y = (center - offset(t)).clamp(top, bottom).round() as i64;
            let (lo, hi) = match prev {
                Some(p) => (p.min(y), p.max(y)),
                None => (y, y),
            };
            for yy in lo..=hi {
                canvas.stamp(x as i64, yy, self.style.stroke_radius as i64, self.style.ink);
            }
            prev = Some(y);
        }
    }
}

struct Canvas {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Canvas {
    fn new(width: usize, height: usize, colour: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            data.extend_from_slice(&colour);
        }
        Self {
            width,
            height,
            data,
        }
    }

    fn put(&mut self, x: usize, y: usize, colour: [u8; 3]) {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * 3;
            self.data[idx..idx + 3].copy_from_slice(&colour);
        }
    }

    fn grid(&mut self, step: f64, colour: [u8; 3]) {
        let mut pos: f64 = 0.0;
        while (pos as usize) < self.width.max(self.height) {
            let p = pos.round() as usize;
            for y in 0..self.height {
                self.put(p, y, colour);
            }
            for x in 0..self.width {
                self.put(x, p, colour);
            }
            pos += step;
        }
    }

    /// Square brush centred on (x, y)
    fn stamp(&mut self, x: i64, y: i64, radius: i64, colour: [u8; 3]) {
        for yy in y - radius..=y + radius {
            for xx in x - radius..=x + radius {
                if xx >= 0 && yy >= 0 {
                    self.put(xx as usize, yy as usize, colour);
                }
            }
        }
    }
}

/// Pure sine wave, same on every lead
pub fn sinusoid(frequency_hz: f64, amplitude_mv: f64) -> impl Fn(Lead, f64) -> f64 {
    move |_, t| amplitude_mv * (2.0 * std::f64::consts::PI * frequency_hz * t).sin()
}

/// Gaussian bump
fn wave(t: f64, center: f64, width: f64, amplitude: f64) -> f64 {
    let z = (t - center) / width;
    amplitude * (-0.5 * z * z).exp()
}

/// Shape of one beat, parameterised per condition
#[derive(Debug, Clone, Copy)]
struct BeatShape {
    p: f64,
    q: f64,
    r: f64,
    s: f64,
    st: f64,
    t: f64,
}

impl BeatShape {
    fn for_condition(condition: Condition) -> Self {
        let normal = Self {
            p: 0.15,
            q: -0.1,
            r: 1.2,
            s: -0.25,
            st: 0.0,
            t: 0.3,
        };
        match condition {
            Condition::Normal => normal,
            Condition::AbnormalHeartbeat => Self { p: 0.0, ..normal },
            Condition::MyocardialInfarction => Self {
                st: 0.35,
                t: 0.5,
                ..normal
            },
            Condition::HistoryOfMyocardialInfarction => Self {
                q: -0.45,
                r: 0.7,
                t: -0.25,
                ..normal
            },
        }
    }

    /// Millivolts `dt` seconds after beat onset
    fn value(&self, dt: f64) -> f64 {
        wave(dt, 0.10, 0.025, self.p)
            + wave(dt, 0.19, 0.008, self.q)
            + wave(dt, 0.21, 0.012, self.r)
            + wave(dt, 0.23, 0.010, self.s)
            + wave(dt, 0.32, 0.060, self.st)
            + wave(dt, 0.45, 0.050, self.t)
    }
}

/// Beat onsets in seconds covering `duration`
fn beat_onsets(condition: Condition, duration: f64) -> Vec<f64> {
    const IRREGULAR: [f64; 6] = [0.55, 1.05, 0.62, 0.9, 0.5, 0.98];
    let mut onsets = Vec::new();
    let mut t = -0.6;
    let mut i = 0;
    while t < duration {
        onsets.push(t);
        t += match condition {
            Condition::AbnormalHeartbeat => IRREGULAR[i % IRREGULAR.len()],
            _ => 0.8,
        };
        i += 1;
    }
    onsets
}

/// Relative gain of each lead
fn lead_gain(lead: Lead) -> f64 {
    match lead {
        Lead::I => 0.8,
        Lead::II | Lead::Rhythm => 1.0,
        Lead::III => 0.5,
        Lead::AVR => -0.8,
        Lead::AVL => 0.4,
        Lead::AVF => 0.7,
        Lead::V1 => -0.6,
        Lead::V2 => 0.4,
        Lead::V3 => 0.8,
        Lead::V4 => 1.1,
        Lead::V5 => 1.0,
        Lead::V6 => 0.8,
    }
}

/// Waveform typical of `condition`, in millivolts
pub fn condition_waveform(condition: Condition) -> impl Fn(Lead, f64) -> f64 {
    let shape = BeatShape::for_condition(condition);
    let onsets = beat_onsets(condition, RHYTHM_SECONDS);
    move |lead, t| {
        let v: f64 = onsets
            .iter()
            .filter(|&&o| t - o > -0.1 && t - o < 1.0)
            .map(|&o| shape.value(t - o))
            .sum();
        v * lead_gain(lead)
    }
}

/// Render a sheet showing `condition`
pub fn render_condition(width: usize, height: usize, condition: Condition) -> Result<SourceImage> {
    SyntheticSheet::new(width, height).render(condition_waveform(condition))
}

/// Feature vector of a rendered `condition` sheet under `config`
pub fn template_features(
    config: &PipelineConfig,
    width: usize,
    height: usize,
    condition: Condition,
) -> Result<FeatureVector> {
    let image = render_condition(width, height, condition)?;
    let gray = grayscale::normalize(&image)?;
    let regions = segmentation::segment(&gray, &config.layout);
    let signals: Vec<LeadSignal> = digitizer::digitize_leads(&regions, &config.digitizer)?
        .into_iter()
        .map(|d| d.signal)
        .collect();
    features::assemble(&signals, config.layout.len(), config.digitizer.sample_count)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Demonstration artifacts fitted to one rendered template per condition.
///
/// The projection is an orthonormal basis of the centred templates and the
/// classifier is 1-nearest-neighbour over the projected templates, so a
/// sheet is labelled with the condition whose template it most resembles.
pub fn demo_artifacts(
    config: PipelineConfig,
    width: usize,
    height: usize,
) -> Result<ModelArtifacts> {
    let templates = Condition::ALL
        .iter()
        .map(|&c| template_features(&config, width, height, c))
        .collect::<Result<Vec<_>>>()?;

    let d = config.feature_len();
    let count = templates.len() as f64;
    let mean: Vec<f64> = (0..d)
        .map(|j| templates.iter().map(|t| t.values[j]).sum::<f64>() / count)
        .collect();

    // Gram-Schmidt over the centred templates
    let mut components: Vec<Vec<f64>> = Vec::new();
    for t in &templates {
        let mut v: Vec<f64> = t.values.iter().zip(&mean).map(|(x, m)| x - m).collect();
        for c in &components {
            let proj = dot(&v, c);
            for (vi, ci) in v.iter_mut().zip(c) {
                *vi -= proj * ci;
            }
        }
        let norm = dot(&v, &v).sqrt();
        if norm > 1e-9 {
            v.iter_mut().for_each(|x| *x /= norm);
            components.push(v);
        }
    }
    if components.is_empty() {
        return Err(EcgError::InvalidArtifact(
            "condition templates are indistinguishable".to_string(),
        ));
    }

    let pca = Pca { mean, components };
    let samples = templates
        .iter()
        .map(|t| pca.project(t).map(|r| r.0))
        .collect::<Result<Vec<_>>>()?;
    let classifier = Classifier {
        labels: Condition::default_labels(),
        model: ClassifierModel::KNearest {
            k: 1,
            targets: (0..samples.len()).collect(),
            samples,
        },
    };
    ModelArtifacts::from_parts(config, pca, classifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::grayscale::normalize;

    #[test]
    fn renders_requested_size() {
        let img = render_condition(400, 300, Condition::Normal).unwrap();
        assert_eq!((img.width(), img.height()), (400, 300));
    }

    #[test]
    fn trace_is_drawn_inside_each_box() {
        let sheet = SyntheticSheet::new(600, 430).without_grid();
        let img = sheet.render(sinusoid(1.2, 0.5)).unwrap();
        let gray = normalize(&img).unwrap();
        for b in &sheet.layout.boxes {
            let rect = b.pixel_rect(600, 430);
            let crop = gray.crop(rect);
            let dark = crop.as_bytes().iter().filter(|&&v| v < 100).count();
            assert!(dark > rect.width, "lead {} has no ink", b.lead);
        }
        // Header band above the grid stays blank
        let header = gray.crop(PixelRect {
            x: 0,
            y: 0,
            width: 600,
            height: 60,
        });
        assert!(header.as_bytes().iter().all(|&v| v > 200));
    }

    #[test]
    fn grid_lines_follow_paper_spacing() {
        let sheet = SyntheticSheet::new(600, 430);
        let img = sheet.render(|_, _| 0.0).unwrap();
        let (paper, grid) = (sheet.style.paper, sheet.style.grid.unwrap());
        // 5 mm at 430 px per 210 mm is ~10.24 px
        assert_eq!(img.pixel(0, 5), grid);
        assert_eq!(img.pixel(10, 5), grid);
        assert_eq!(img.pixel(20, 5), grid);
        assert_eq!(img.pixel(11, 5), paper);
        assert_eq!(img.pixel(5, 10), grid);
        assert_eq!(img.pixel(5, 4), paper);
    }

    #[test]
    fn conditions_differ() {
        let normal = condition_waveform(Condition::Normal);
        let mi = condition_waveform(Condition::MyocardialInfarction);
        let old_mi = condition_waveform(Condition::HistoryOfMyocardialInfarction);
        // ST segment of the second beat
        assert!(mi(Lead::II, 0.2 + 0.32) > normal(Lead::II, 0.2 + 0.32) + 0.2);
        // Inverted T wave
        assert!(old_mi(Lead::II, 0.2 + 0.45) < 0.0);
        assert!(normal(Lead::AVR, 0.2 + 0.21) < 0.0);
    }

    #[test]
    fn rendering_is_deterministic() {
        let a = render_condition(300, 220, Condition::AbnormalHeartbeat).unwrap();
        let b = render_condition(300, 220, Condition::AbnormalHeartbeat).unwrap();
        assert_eq!(a, b);
    }
}
