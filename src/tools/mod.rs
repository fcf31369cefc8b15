use crate::error::Result;
use crate::models::{BitMatrix, Condition, FeatureVector, GrayscaleImage, LeadSignal, SourceImage};
use image::ImageFormat;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Decode an image file into an RGB scan
pub fn load_rgb<P: AsRef<Path>>(path: P) -> Result<SourceImage> {
    SourceImage::from_rgb_image(image::open(path)?.to_rgb8())
}

/// Write an RGB scan as an image file; format follows the extension.
pub fn save_rgb<P: AsRef<Path>>(image: &SourceImage, path: P) -> Result<()> {
    image.to_rgb_image().save(path)?;
    Ok(())
}

/// Write a grayscale image.
pub fn save_gray<P: AsRef<Path>>(image: &GrayscaleImage, path: P) -> Result<()> {
    image.to_luma_image().save(path)?;
    Ok(())
}

/// Write an ink mask, ink black on white.
pub fn save_mask<P: AsRef<Path>>(mask: &BitMatrix, path: P) -> Result<()> {
    mask.to_luma_image().save(path)?;
    Ok(())
}

/// Write lead signals as CSV: one column per lead, one row per sample.
pub fn write_signals_csv<W: Write>(mut out: W, signals: &[LeadSignal]) -> Result<()> {
    let header: Vec<&str> = signals.iter().map(|s| s.lead.name()).collect();
    writeln!(out, "sample,{}", header.join(","))?;
    let rows = signals.iter().map(LeadSignal::len).max().unwrap_or(0);
    for i in 0..rows {
        let cells: Vec<String> = signals
            .iter()
            .map(|s| s.samples.get(i).map(|v| format!("{v:.6}")).unwrap_or_default())
            .collect();
        writeln!(out, "{i},{}", cells.join(","))?;
    }
    Ok(())
}

/// Append one feature vector as a CSV row, optionally prefixed by a label.
pub fn write_feature_row<W: Write>(
    mut out: W,
    label: Option<&str>,
    features: &FeatureVector,
) -> Result<()> {
    let values: Vec<String> = features.values.iter().map(|v| format!("{v:.6}")).collect();
    match label {
        Some(label) => writeln!(out, "{label},{}", values.join(","))?,
        None => writeln!(out, "{}", values.join(","))?,
    }
    Ok(())
}

/// Class named by a dataset folder.
///
/// Folder names such as `Normal Person ECG Images` or
/// `ECG Images of Patient that have History of MI` are recognised.
pub fn condition_from_dir_name(name: &str) -> Option<Condition> {
    let name = name.to_lowercase();
    if name.contains("history") {
        Some(Condition::HistoryOfMyocardialInfarction)
    } else if name.contains("abnormal") {
        Some(Condition::AbnormalHeartbeat)
    } else if name.contains("myocardial")
        || name.split(|c: char| !c.is_alphanumeric()).any(|w| w == "mi")
    {
        Some(Condition::MyocardialInfarction)
    } else if name.contains("normal") {
        Some(Condition::Normal)
    } else {
        None
    }
}

/// One scan of an ECG image dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetScan {
    /// Image file
    pub path: PathBuf,
    /// Class implied by the folder holding the scan
    pub expected: Option<Condition>,
}

fn is_scan(path: &Path) -> bool {
    path.is_file() && ImageFormat::from_path(path).is_ok()
}

/// Scans of a dataset laid out as one folder per class.
///
/// Images directly under `root` are returned unlabelled; images inside a
/// class folder carry that folder's condition. Results are sorted by path
/// and cut to `limit`.
pub fn dataset_scans(root: &Path, limit: Option<usize>) -> Result<Vec<DatasetScan>> {
    let mut scans = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if is_scan(&path) {
            scans.push(DatasetScan {
                path,
                expected: None,
            });
            continue;
        }
        if !path.is_dir() {
            continue;
        }
        let expected = path
            .file_name()
            .and_then(|n| condition_from_dir_name(&n.to_string_lossy()));
        for inner in fs::read_dir(&path)? {
            let inner = inner?.path();
            if is_scan(&inner) {
                scans.push(DatasetScan {
                    path: inner,
                    expected,
                });
            }
        }
    }
    scans.sort_by(|a, b| a.path.cmp(&b.path));
    if let Some(limit) = limit {
        scans.truncate(limit);
    }
    Ok(scans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Lead;
    use std::env;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let sequence = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let name = format!("ecg_scan_tools_{}_{sequence}", std::process::id());
        let dir = env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("failed to create temp dir");
        dir
    }

    #[test]
    fn signals_csv_has_one_column_per_lead() {
        let signals = vec![
            LeadSignal {
                lead: Lead::I,
                samples: vec![0.0, 0.5],
                mv_per_pixel: 0.01,
                zero_filled: false,
            },
            LeadSignal::zeros(Lead::AVR, 2, 0.01),
        ];
        let mut out = Vec::new();
        write_signals_csv(&mut out, &signals).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "sample,I,aVR");
        assert_eq!(lines[2], "1,0.500000,0.000000");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn feature_row_with_label() {
        let fv = FeatureVector {
            values: vec![1.0, -2.0],
            samples_per_lead: 1,
        };
        let mut out = Vec::new();
        write_feature_row(&mut out, Some("Normal"), &fv).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Normal,1.000000,-2.000000\n");
    }

    #[test]
    fn condition_from_dataset_folders() {
        let cases = [
            ("Normal Person ECG Images", Some(Condition::Normal)),
            (
                "ECG Images of Patient that have abnormal heartbeat",
                Some(Condition::AbnormalHeartbeat),
            ),
            (
                "ECG Images of Myocardial Infarction Patients",
                Some(Condition::MyocardialInfarction),
            ),
            (
                "ECG Images of Patient that have History of MI",
                Some(Condition::HistoryOfMyocardialInfarction),
            ),
            ("MI cases", Some(Condition::MyocardialInfarction)),
            ("Minutes", None),
            ("unknown", None),
        ];
        for (name, expected) in cases {
            assert_eq!(condition_from_dir_name(name), expected, "{name}");
        }
    }

    #[test]
    fn dataset_scans_follow_class_folders() {
        let dir = temp_dir();
        let normal = dir.join("Normal Person ECG Images");
        let old_mi = dir.join("ECG Images of Patient that have History of MI");
        fs::create_dir_all(&normal).unwrap();
        fs::create_dir_all(&old_mi).unwrap();
        for path in [
            normal.join("Normal(2).jpg"),
            normal.join("Normal(1).png"),
            normal.join("notes.txt"),
            old_mi.join("PMI(1).jpg"),
            dir.join("loose.png"),
        ] {
            fs::write(path, b"x").unwrap();
        }

        let scans = dataset_scans(&dir, None).unwrap();
        assert_eq!(scans.len(), 4);
        assert!(scans.windows(2).all(|w| w[0].path <= w[1].path));
        let expected_of = |name: &str| {
            scans
                .iter()
                .find(|s| s.path.file_name().unwrap() == name)
                .map(|s| s.expected)
        };
        assert_eq!(expected_of("Normal(1).png"), Some(Some(Condition::Normal)));
        assert_eq!(
            expected_of("PMI(1).jpg"),
            Some(Some(Condition::HistoryOfMyocardialInfarction))
        );
        assert_eq!(expected_of("loose.png"), Some(None));
        assert_eq!(expected_of("notes.txt"), None);

        assert_eq!(dataset_scans(&dir, Some(2)).unwrap().len(), 2);
        assert!(dataset_scans(&dir.join("missing"), None).is_err());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = temp_dir();
        let path = dir.join("scan.png");
        let img = SourceImage::new(2, 1, vec![255, 0, 0, 0, 0, 255]).unwrap();
        save_rgb(&img, &path).unwrap();
        assert_eq!(load_rgb(&path).unwrap(), img);
        let _ = fs::remove_dir_all(dir);
    }
}
