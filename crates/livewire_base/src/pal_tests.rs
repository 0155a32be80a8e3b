/* 📖 # PAL parity tests

The engine is tested against MockPal and run against RealPal, so the two must agree on
everything the engine relies on: flat sorted listings, glob filtering, UTF-8 checks and
not-found errors. Each scenario here is written once against `&dyn Pal` and run on both.
*/

#[cfg(test)]
mod pal_parity_tests {
    use std::io::Write;

    use tempfile::TempDir;

    use crate::pal::{FilePath, MockPal, Pal, PalHandle, RealPal};

    const DOCS: &[(&str, &[u8])] = &[
        ("docs/01_introduction.md", b"# Introduction\n"),
        ("docs/02_quickstart.md", b"# Quickstart\n"),
        ("docs/10_events.md", b"# Events\n"),
        ("docs/template.html", b"<html></html>"),
        ("docs/template.css", b"body {}"),
        ("docs/drafts/03_hidden.md", b"# Hidden\n"),
        ("docs/broken.md", &[0xFF, 0xFE]),
    ];

    fn mock_pal() -> MockPal {
        let pal = MockPal::new();
        for (path, content) in DOCS {
            pal.add_file(FilePath::from(*path), content.to_vec());
        }
        pal
    }

    fn real_pal() -> (TempDir, RealPal) {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        for (path, content) in DOCS {
            let full = temp_dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        let pal = RealPal::new(temp_dir.path().to_path_buf());
        (temp_dir, pal)
    }

    fn run_on_both(scenario: impl Fn(&dyn Pal)) {
        scenario(&mock_pal());
        let (_temp_dir, pal) = real_pal();
        scenario(&pal);
    }

    #[test]
    fn test_listing_is_flat_sorted_and_filtered() {
        run_on_both(|pal| {
            let files = pal
                .list_directory(&FilePath::from("docs"), &["*.md".to_string()])
                .unwrap();
            let names: Vec<String> = files.iter().map(|f| f.to_string()).collect();
            assert_eq!(
                names,
                vec![
                    "docs/01_introduction.md",
                    "docs/02_quickstart.md",
                    "docs/10_events.md",
                    "docs/broken.md",
                ]
            );
        });
    }

    #[test]
    fn test_multiple_glob_patterns() {
        run_on_both(|pal| {
            let files = pal
                .list_directory(
                    &FilePath::from("docs"),
                    &["*.html".to_string(), "*.css".to_string()],
                )
                .unwrap();
            assert_eq!(
                files,
                vec![
                    FilePath::from("docs/template.css"),
                    FilePath::from("docs/template.html"),
                ]
            );
        });
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        run_on_both(|pal| {
            let result = pal.list_directory(&FilePath::from("missing"), &["*.md".to_string()]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_read_file_to_string() {
        run_on_both(|pal| {
            let content = pal
                .read_file_to_string(&FilePath::from("docs/02_quickstart.md"))
                .unwrap();
            assert_eq!(content, "# Quickstart\n");
        });
    }

    #[test]
    fn test_read_file_to_string_invalid_utf8() {
        run_on_both(|pal| {
            let error = pal
                .read_file_to_string(&FilePath::from("docs/broken.md"))
                .unwrap_err();
            assert!(error.to_string().contains("not valid UTF-8"));
        });
    }

    #[test]
    fn test_create_then_read() {
        run_on_both(|pal| {
            pal.create_directory_all(&FilePath::from("resources/views/livewire"))
                .unwrap();
            let path = FilePath::from("resources/views/livewire/counter.html");
            let mut writer = pal.create_file(&path).unwrap();
            writer.write_all(b"<div>\n</div>\n").unwrap();
            drop(writer);

            assert!(pal.file_exists(&path).unwrap());
            assert_eq!(pal.read_file_to_string(&path).unwrap(), "<div>\n</div>\n");
        });
    }

    #[test]
    fn test_pal_handle_deref() {
        let handle = PalHandle::new(mock_pal());
        let clone = handle.clone();
        assert!(clone
            .file_exists(&FilePath::from("docs/template.html"))
            .unwrap());
    }
}
