use image::{Rgba, RgbaImage};
use std::path::Path;
use std::process::{Command, Output};

fn top_colors(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_top_colors"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn missing_input_file_fails_and_keeps_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("absent.csv");
    let output = dir.path().join("out.csv");
    std::fs::write(&output, "precious\n").unwrap();

    let run = top_colors(&["-i", path_str(&input), "-o", path_str(&output)]);

    assert!(!run.status.success());
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "precious\n");
}

#[test]
fn unwritable_output_fails() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("red.png");
    RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])).save(&image).unwrap();
    let output = dir.path().join("missing").join("out.csv");

    let run = top_colors(&["-o", path_str(&output), path_str(&image)]);

    assert!(!run.status.success());
    assert!(!output.exists());
}

#[test]
fn one_failing_reference_still_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("red.png");
    RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])).save(&image).unwrap();
    let missing = dir.path().join("gone.png");
    let output = dir.path().join("out.csv");

    let run = top_colors(&["-o", path_str(&output), path_str(&image), path_str(&missing)]);

    assert!(run.status.success(), "stderr: {}", String::from_utf8_lossy(&run.stderr));
    let written = std::fs::read_to_string(&output).unwrap();
    let mut lines: Vec<&str> = written.lines().collect();
    lines.sort_unstable();
    let mut expected = vec![
        format!("{},0xff0000;0x000000;0x000000", image.display()),
        format!("{},ERR", missing.display()),
    ];
    expected.sort_unstable();
    assert_eq!(lines, expected);
}

#[test]
fn input_file_with_positional_references_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("links.csv");
    std::fs::write(&input, "a.png\n").unwrap();

    let run = top_colors(&["-i", path_str(&input), "b.png"]);

    assert!(!run.status.success());
}
