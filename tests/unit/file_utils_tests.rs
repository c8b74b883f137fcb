/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::fs;
use std::path::Path;
use vidopt::file_utils::{FileManager, FileType};

use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_fileExists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "clip.mp4", "not really a video")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::file_exists(temp_dir.path()));
    assert!(!FileManager::file_exists("non_existent_file.tmp"));
    Ok(())
}

#[test]
fn test_generateOutputPath_withSuffixAndExtension_shouldBuildStagePath() {
    let output = FileManager::generate_output_path("/videos/talk.mkv", "/work/item_001", "silence", None);
    assert_eq!(output, Path::new("/work/item_001/talk_silence.mkv"));

    let output = FileManager::generate_output_path("/videos/talk.mkv", "/work/item_001", "thumbnail", Some("jpg"));
    assert_eq!(output, Path::new("/work/item_001/talk_thumbnail.jpg"));
}

#[test]
fn test_generateOutputPath_withEmptySuffix_shouldKeepStem() {
    let output = FileManager::generate_output_path("talk.mp4", "out", "", Some(".webm"));

    assert_eq!(output, Path::new("out/talk.webm"));
}

#[test]
fn test_findMediaFiles_shouldRecurseAndSort() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let nested = temp_dir.path().join("day2");
    fs::create_dir_all(&nested)?;
    common::create_test_file(temp_dir.path(), "b.mp4", "")?;
    common::create_test_file(temp_dir.path(), "a.MOV", "")?;
    common::create_test_file(temp_dir.path(), "notes.txt", "")?;
    common::create_test_file(&nested, "c.mkv", "")?;

    let files = FileManager::find_media_files(temp_dir.path())?;

    let names: Vec<String> = files
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["a.MOV", "b.mp4", "c.mkv"]);
    Ok(())
}

#[test]
fn test_readItemList_shouldSkipBlankLinesAndComments() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let list = common::create_test_file(
        temp_dir.path(),
        "batch.txt",
        "# uploads for monday\nhttps://example.com/watch?v=1\n\n  /videos/talk.mp4  \n",
    )?;

    let items = FileManager::read_item_list(&list)?;

    assert_eq!(items, vec!["https://example.com/watch?v=1", "/videos/talk.mp4"]);
    Ok(())
}

#[test]
fn test_writeAtomic_shouldReplaceExistingContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("reports").join("batch_report.json");

    FileManager::write_atomic(&path, "first")?;
    FileManager::write_atomic(&path, "second")?;

    assert_eq!(FileManager::read_to_string(&path)?, "second");
    // No temporary files are left next to the target
    assert_eq!(fs::read_dir(path.parent().unwrap())?.count(), 1);
    Ok(())
}

#[test]
fn test_detectFileType_shouldClassifyInputs() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let srt = common::create_test_file(temp_dir.path(), "talk.srt", "")?;
    let json = common::create_test_file(temp_dir.path(), "talk.json", "[]")?;
    let list = common::create_test_file(temp_dir.path(), "batch.txt", "")?;
    let video = common::create_test_file(temp_dir.path(), "talk.WebM", "")?;
    let other = common::create_test_file(temp_dir.path(), "logo.png", "")?;

    assert_eq!(FileManager::detect_file_type(temp_dir.path())?, FileType::Directory);
    assert_eq!(FileManager::detect_file_type(&srt)?, FileType::Transcript);
    assert_eq!(FileManager::detect_file_type(&json)?, FileType::Transcript);
    assert_eq!(FileManager::detect_file_type(&list)?, FileType::ItemList);
    assert_eq!(FileManager::detect_file_type(&video)?, FileType::Video);
    assert_eq!(FileManager::detect_file_type(&other)?, FileType::Unknown);
    assert!(FileManager::detect_file_type(temp_dir.path().join("missing.mp4")).is_err());
    Ok(())
}
