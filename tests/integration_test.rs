use image::{GrayImage, Luma, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_auto-enhance"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run auto-enhance")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

/// Low-contrast RGB fixture: every channel confined to a narrow band
fn write_dull_rgb(path: &Path) {
    RgbImage::from_fn(40, 30, |x, y| {
        Rgb([
            (90 + x) as u8,
            (120 + y) as u8,
            (100 + (x + y) / 2) as u8,
        ])
    })
    .save(path)
    .expect("Failed to write fixture");
}

fn write_dull_gray(path: &Path) {
    GrayImage::from_fn(32, 32, |x, y| Luma([(80 + (x + y)) as u8]))
        .save(path)
        .expect("Failed to write fixture");
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| l.to_string())
        .collect()
}

#[test]
fn test_version_flag() {
    let output = run_cli(&["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_single_file_with_explicit_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dull.png");
    let output_path = dir.path().join("bright.png");
    write_dull_rgb(&input);

    let output = run_cli(&[path_arg(&input), "-o", path_arg(&output_path)]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout_lines(&output), vec![format!("{}: done", input.display())]);

    let result = image::open(&output_path).unwrap().to_rgb8();
    assert_eq!(result.dimensions(), (40, 30));
    // The stretch pushes every channel to full white somewhere
    for channel in 0..3 {
        let max = result.pixels().map(|p| p.0[channel]).max().unwrap();
        assert_eq!(max, 255, "channel {}", channel);
    }
}

#[test]
fn test_format_override_and_percentile_mode() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.png");
    write_dull_gray(&input);

    let output = run_cli(&[
        path_arg(&input),
        "-f",
        "tiff",
        "-r",
        "percentile",
        "-t",
        "0.01",
        "99.99",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let converted = dir.path().join("scan.tiff");
    let result = image::open(&converted).unwrap().to_luma8();
    let min = result.pixels().map(|p| p.0[0]).min().unwrap();
    let max = result.pixels().map(|p| p.0[0]).max().unwrap();
    assert_eq!((min, max), (0, 255));
}

#[test]
fn test_grayscale_and_lighting_flags() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("photo.png");
    let out = dir.path().join("photo_gray.jpg");
    write_dull_rgb(&input);

    let output = run_cli(&[
        path_arg(&input),
        "-o",
        path_arg(&out),
        "-g",
        "-l",
        "ratio",
        "-s",
        "4",
        "-q",
        "90",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(image::open(&out).unwrap().color(), image::ColorType::L8);
}

#[test]
fn test_batch_continues_after_bad_file() {
    let dir = tempfile::tempdir().unwrap();
    let good_a = dir.path().join("a.png");
    let bad = dir.path().join("b.png");
    let good_c = dir.path().join("c.png");
    write_dull_gray(&good_a);
    std::fs::write(&bad, b"not an image").unwrap();
    write_dull_rgb(&good_c);
    let report = dir.path().join("report.json");

    let output = run_cli(&[
        path_arg(&good_a),
        path_arg(&bad),
        path_arg(&good_c),
        "--suffix",
        "_enh",
        "-j",
        "1",
        "--report",
        path_arg(&report),
    ]);

    // One failure makes the run fail overall, but the others still complete
    assert!(!output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec![
            format!("{}: done", good_a.display()),
            format!("{}: done", good_c.display()),
        ]
    );
    assert!(dir.path().join("a_enh.png").exists());
    assert!(dir.path().join("c_enh.png").exists());
    assert!(!dir.path().join("b_enh.png").exists());

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(report["total"], 3);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["files"][1]["error"]["code"], "INVALID_INPUT");
}

#[test]
fn test_mismatched_output_count_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    write_dull_gray(&a);
    write_dull_gray(&b);
    let only_out: PathBuf = dir.path().join("x.png");

    let output = run_cli(&[path_arg(&a), path_arg(&b), "-o", path_arg(&only_out)]);

    assert!(!output.status.success());
    assert!(stdout_lines(&output).is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("output path"));
    assert!(!only_out.exists());
}

#[test]
fn test_invalid_sigma_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.png");
    write_dull_gray(&input);

    let output = run_cli(&[path_arg(&input), "-l", "log", "-s", "0"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("sigma"));
}
