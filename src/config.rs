use crate::codec::DEFAULT_QUALITY;
use crate::enhance::{lighting, PipelineOptions, Thresholds};
use crate::error::EnhanceError;
use crate::Args;
use image::ImageFormat;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One input file and where its result goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Run configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub files: Vec<FileJob>,
    pub pipeline: PipelineOptions,
    pub quality: u8,
    pub jobs: usize,
    pub report: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            pipeline: PipelineOptions::default(),
            quality: DEFAULT_QUALITY,
            jobs: default_jobs(),
            report: None,
        }
    }
}

impl TryFrom<Args> for Config {
    type Error = EnhanceError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if let Some(sigma) = args.sigma {
            lighting::validate_sigma(sigma)?;
        }

        let thresholds = match args.thrs.as_deref() {
            None => None,
            Some(&[low, high]) => Some(Thresholds::new(low, high)),
            Some(other) => {
                return Err(EnhanceError::InvalidParameter(format!(
                    "expected two thresholds, got {}",
                    other.len()
                )))
            }
        };
        if let Some(thresholds) = thresholds {
            thresholds.validate(args.range)?;
        }

        if !(1..=100).contains(&args.quality) {
            return Err(EnhanceError::InvalidParameter(format!(
                "quality must be between 1 and 100, got {}",
                args.quality
            )));
        }

        let jobs = args.jobs.unwrap_or_else(default_jobs);
        if jobs == 0 {
            return Err(EnhanceError::InvalidParameter(
                "jobs must be at least 1".to_string(),
            ));
        }

        let outputs = resolve_outputs(
            &args.paths,
            &args.outputs,
            args.format.as_deref(),
            args.suffix.as_deref(),
        )?;
        let files = args
            .paths
            .into_iter()
            .zip(outputs)
            .map(|(input, output)| FileJob { input, output })
            .collect();

        Ok(Self {
            files,
            pipeline: PipelineOptions {
                grayscale: args.gray,
                lighting: args.lighting,
                sigma: args.sigma,
                range_method: args.range,
                thresholds,
            },
            quality: args.quality,
            jobs,
            report: args.report,
        })
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Work out the output path for every input
///
/// Explicit outputs must match the inputs one to one. The suffix and format
/// overrides apply to whichever list is used.
pub fn resolve_outputs(
    inputs: &[PathBuf],
    outputs: &[PathBuf],
    format: Option<&str>,
    suffix: Option<&str>,
) -> Result<Vec<PathBuf>, EnhanceError> {
    if inputs.is_empty() {
        return Err(EnhanceError::InvalidParameter(
            "no input paths given".to_string(),
        ));
    }
    if !outputs.is_empty() && outputs.len() != inputs.len() {
        return Err(EnhanceError::InvalidParameter(format!(
            "got {} output path(s) for {} input(s)",
            outputs.len(),
            inputs.len()
        )));
    }

    let format = match format {
        Some(ext) => {
            let ext = ext.trim_start_matches('.');
            if ImageFormat::from_extension(ext).is_none() {
                return Err(EnhanceError::InvalidParameter(format!(
                    "unknown output format '{}'",
                    ext
                )));
            }
            Some(ext)
        }
        None => None,
    };

    let base = if outputs.is_empty() { inputs } else { outputs };
    let resolved: Vec<PathBuf> = base
        .iter()
        .map(|path| {
            let path = match suffix {
                Some(suffix) => append_to_stem(path, suffix),
                None => path.clone(),
            };
            match format {
                Some(ext) => derive_output_path(&path, ext),
                None => path,
            }
        })
        .collect();

    let mut seen = HashSet::new();
    for path in &resolved {
        if !seen.insert(path) {
            return Err(EnhanceError::InvalidParameter(format!(
                "output path {} is used more than once",
                path.display()
            )));
        }
    }

    Ok(resolved)
}

/// Swap the extension of `path` for `format`
pub fn derive_output_path(path: &Path, format: &str) -> PathBuf {
    path.with_extension(format.trim_start_matches('.'))
}

fn append_to_stem(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    path.with_file_name(name)
}

impl Config {
    /// Thresholds that will actually be applied
    pub fn effective_thresholds(&self) -> Thresholds {
        self.pipeline
            .thresholds
            .unwrap_or_else(|| Thresholds::default_for(self.pipeline.range_method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhance::{LightingMode, RangeMethod};
    use clap::Parser;

    fn parse(argv: &[&str]) -> Result<Config, EnhanceError> {
        let mut full = vec!["auto-enhance"];
        full.extend_from_slice(argv);
        Config::try_from(Args::try_parse_from(full).unwrap())
    }

    fn paths(list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_defaults_overwrite_inputs() {
        let config = parse(&["a.png", "b.jpg"]).unwrap();
        assert_eq!(config.files[0].output, PathBuf::from("a.png"));
        assert_eq!(config.files[1].output, PathBuf::from("b.jpg"));
        assert_eq!(config.pipeline.range_method, RangeMethod::Mode);
        assert_eq!(config.pipeline.lighting, LightingMode::None);
        assert_eq!(config.effective_thresholds(), Thresholds::new(0.7, 1.0));
        assert_eq!(config.quality, 95);
    }

    #[test]
    fn test_all_flags() {
        let config = parse(&[
            "in.tif", "-g", "-s", "12.5", "-t", "1", "99", "-r", "percentile", "-l", "log",
            "-q", "80", "-j", "2", "-f", "png",
        ])
        .unwrap();
        assert!(config.pipeline.grayscale);
        assert_eq!(config.pipeline.sigma, Some(12.5));
        assert_eq!(config.pipeline.thresholds, Some(Thresholds::new(1.0, 99.0)));
        assert_eq!(config.pipeline.range_method, RangeMethod::Percentile);
        assert_eq!(config.pipeline.lighting, LightingMode::Log);
        assert_eq!(config.quality, 80);
        assert_eq!(config.jobs, 2);
        assert_eq!(config.files[0].output, PathBuf::from("in.png"));
    }

    #[test]
    fn test_threshold_flags_parse_as_doubles() {
        let config = parse(&["in.png", "-r", "percentile", "-t", "0.1", "99.9"]).unwrap();
        assert_eq!(
            config.effective_thresholds(),
            Thresholds::default_for(RangeMethod::Percentile)
        );
        assert_eq!(config.effective_thresholds().low / 100.0, 0.001);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        for argv in [
            vec!["a.png", "-s", "0"],
            vec!["a.png", "-s", "-3"],
            vec!["a.png", "-t", "1.0", "0.7"],
            vec!["a.png", "-r", "percentile", "-t", "0", "150"],
            vec!["a.png", "-q", "0"],
            vec!["a.png", "-j", "0"],
            vec!["a.png", "-f", "notaformat"],
        ] {
            let err = parse(&argv).unwrap_err();
            assert_eq!(err.code(), "INVALID_PARAMETER", "{:?}", argv);
        }
    }

    #[test]
    fn test_output_count_must_match_inputs() {
        let err = resolve_outputs(&paths(&["a.png", "b.png"]), &paths(&["x.png"]), None, None)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMETER");
    }

    #[test]
    fn test_explicit_outputs_with_format() {
        let out = resolve_outputs(
            &paths(&["a.png", "b.png"]),
            &paths(&["out/x.tif", "out/y"]),
            Some(".jpg"),
            None,
        )
        .unwrap();
        assert_eq!(out, paths(&["out/x.jpg", "out/y.jpg"]));
    }

    #[test]
    fn test_suffix_is_added_to_stem() {
        let out = resolve_outputs(
            &paths(&["dir/scan.page1.png", "noext"]),
            &[],
            None,
            Some("_enh"),
        )
        .unwrap();
        assert_eq!(out, paths(&["dir/scan.page1_enh.png", "noext_enh"]));
    }

    #[test]
    fn test_colliding_outputs_are_rejected() {
        let err = resolve_outputs(&paths(&["a.png", "a.jpg"]), &[], Some("png"), None)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMETER");
    }

    #[test]
    fn test_derive_output_path() {
        assert_eq!(
            derive_output_path(Path::new("photos/img.jpeg"), "png"),
            PathBuf::from("photos/img.png")
        );
    }
}
