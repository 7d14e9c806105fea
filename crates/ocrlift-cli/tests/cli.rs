use std::io::Cursor;

use assert_cmd::Command;
use image::{DynamicImage, ImageFormat};
use lopdf::{Document, Object, Stream, dictionary};
use predicates::prelude::*;
use tempfile::TempDir;

fn ocrlift() -> Command {
    Command::cargo_bin("ocrlift").unwrap()
}

/// A config file in `dir` so runs never pick up the user's own config.
fn write_config(dir: &TempDir) -> String {
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{}").unwrap();
    path.display().to_string()
}

fn empty_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut data = Vec::new();
    doc.save_to(&mut data).unwrap();
    data
}

/// A one-page PDF whose only content is `text` in Helvetica.
fn text_pdf(text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let content = format!("BT /F1 12 Tf 72 700 Td ({}) Tj ET", text);
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        "MediaBox" => [0, 0, 612, 792].map(Object::Integer).to_vec(),
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut data = Vec::new();
    doc.save_to(&mut data).unwrap();
    data
}

#[test]
fn extract_reads_stdin() {
    let dir = TempDir::new().unwrap();
    ocrlift()
        .args(["-c", &write_config(&dir), "extract"])
        .write_stdin("Build AppOCR finished 3/7/2024 08:05 ok")
        .assert()
        .success()
        .stdout("3/7/2024 08:05\n");
}

#[test]
fn extract_reports_not_found() {
    let dir = TempDir::new().unwrap();
    ocrlift()
        .args(["-c", &write_config(&dir), "extract"])
        .write_stdin("AppOCR but no date here")
        .assert()
        .success()
        .stdout(predicate::str::contains("No date/time found near the anchor keyword."));
}

#[test]
fn extract_with_label_from_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("notes.txt");
    std::fs::write(&input, "v2.0\nbreaking changes:  removed the v1 API  \nthanks").unwrap();

    ocrlift()
        .args(["-c", &write_config(&dir), "extract", "--label", "Breaking changes:", "--json"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"found\""))
        .stdout(predicate::str::contains("removed the v1 API"));
}

#[test]
fn label_conflicts_with_anchor() {
    ocrlift()
        .args(["extract", "--label", "X:", "--anchor", "Y"])
        .assert()
        .failure();
}

#[test]
fn process_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    ocrlift()
        .args(["-c", &write_config(&dir), "process", "does-not-exist.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn process_corrupt_pdf_reports_pdf_failure() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("broken.pdf");
    std::fs::write(&input, b"this is not a pdf").unwrap();

    ocrlift()
        .args(["-c", &write_config(&dir), "process"])
        .arg(&input)
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"status\": \"failed\""))
        .stderr(predicate::str::contains("PDF processing failed."));
}

#[test]
fn process_without_models_reports_engine_not_ready() {
    let dir = TempDir::new().unwrap();
    let models = dir.path().join("no-models");
    std::fs::create_dir(&models).unwrap();
    let input = dir.path().join("scan.png");
    let mut png = Vec::new();
    DynamicImage::new_rgb8(16, 16)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();
    std::fs::write(&input, png).unwrap();

    ocrlift()
        .args(["-c", &write_config(&dir), "process", "--model-dir"])
        .arg(&models)
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("OCR engine is not ready."));
}

#[test]
fn process_empty_pdf_succeeds_without_models() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("empty.pdf");
    std::fs::write(&input, empty_pdf()).unwrap();

    ocrlift()
        .args(["-c", &write_config(&dir), "process", "--format", "csv", "--label", "Breaking changes:"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("pdf,succeeded,0"))
        .stdout(predicate::str::contains("No text found after the label."));
}

#[test]
fn process_text_only_pdf_without_models() {
    let dir = TempDir::new().unwrap();
    let models = dir.path().join("no-models");
    std::fs::create_dir(&models).unwrap();
    let input = dir.path().join("notes.pdf");
    std::fs::write(&input, text_pdf("Breaking changes: none")).unwrap();

    ocrlift()
        .args(["-c", &write_config(&dir), "process", "--label", "Breaking changes:", "--model-dir"])
        .arg(&models)
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"succeeded\""))
        .stdout(predicate::str::contains("\"value\": \"none\""));
}

#[test]
fn process_rejects_unknown_extension() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("notes.txt");
    std::fs::write(&input, "hello").unwrap();

    ocrlift()
        .args(["-c", &write_config(&dir), "process"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file format"));
}

#[test]
fn config_set_then_get() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("nested").join("config.json");
    let config = config.display().to_string();

    ocrlift()
        .args(["-c", &config, "config", "set", "pdf.render_scale", "2.0"])
        .assert()
        .success();

    ocrlift()
        .args(["-c", &config, "config", "get", "pdf.render_scale"])
        .assert()
        .success()
        .stdout("2.0\n");
}

#[test]
fn config_set_rejects_invalid_scale() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");

    ocrlift()
        .args(["-c", &config.display().to_string()])
        .args(["config", "set", "pdf.render_scale", "--", "-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pdf.render_scale must be a positive number"));

    assert!(!config.exists());
}

#[test]
fn config_set_rejected_leaves_no_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("nested");
    let config = nested.join("config.json").display().to_string();

    ocrlift()
        .args(["-c", &config, "config", "set", "pdf.render_scale", "0"])
        .assert()
        .failure();

    assert!(!nested.exists());
}

#[test]
fn config_set_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json").display().to_string();

    ocrlift()
        .args(["-c", &config, "config", "set", "pdf.dpi", "300"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found: pdf.dpi"));
}

#[test]
fn config_path_shows_explicit_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.json").display().to_string();

    ocrlift()
        .args(["-c", &config, "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.json"))
        .stdout(predicate::str::contains("not created"));
}
