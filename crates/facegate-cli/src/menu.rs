//! Interactive top-level menu.

use crate::flows;
use anyhow::Result;
use facegate_core::DatasetStore;
use std::io::{BufRead, Write};

/// Flows that need the camera and preview window.
pub trait CameraFlows {
    fn enroll(&mut self, name: &str, store: &mut DatasetStore, out: &mut dyn Write) -> Result<()>;
    fn recognize(&mut self, store: &DatasetStore, out: &mut dyn Write) -> Result<()>;
}

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[1;1H";

/// Show the menu until the user exits or input ends.
pub fn run<R: BufRead, W: Write>(
    store: &mut DatasetStore,
    camera: &mut impl CameraFlows,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    loop {
        write!(out, "{CLEAR_SCREEN}")?;
        writeln!(out, "Select an option:")?;
        writeln!(out, "1. Add face to dataset")?;
        writeln!(out, "2. Recognize face using camera")?;
        writeln!(out, "3. Delete face from dataset")?;
        writeln!(out, "4. Exit")?;

        let Some(choice) = prompt(input, out, "Enter your choice: ")? else {
            tracing::debug!("input closed, leaving menu");
            return Ok(());
        };

        match choice.trim() {
            "1" => {
                let Some(name) = prompt(input, out, "Input name: ")? else {
                    return Ok(());
                };
                camera.enroll(&name, store, out)?;
            }
            "2" => camera.recognize(store, out)?,
            "3" => {
                write!(out, "{CLEAR_SCREEN}")?;
                flows::delete(store, input, out)?;
            }
            "4" => {
                writeln!(out, "Exiting the program.")?;
                return Ok(());
            }
            _ => writeln!(out, "Invalid choice. Please try again.")?,
        }
    }
}

/// Print `message` and read one line without its line terminator; `None` at end of input.
fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, message: &str) -> Result<Option<String>> {
    write!(out, "{message}")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use facegate_core::Encoding;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingFlows {
        calls: Vec<String>,
    }

    impl CameraFlows for RecordingFlows {
        fn enroll(&mut self, name: &str, store: &mut DatasetStore, _out: &mut dyn Write) -> Result<()> {
            self.calls.push(format!("enroll:{name}"));
            store.add(Encoding::new(vec![0.0, 1.0]), name)?;
            Ok(())
        }

        fn recognize(&mut self, _store: &DatasetStore, _out: &mut dyn Write) -> Result<()> {
            self.calls.push("recognize".into());
            Ok(())
        }
    }

    fn run_script(script: &str) -> (TempDir, DatasetStore, RecordingFlows, String) {
        let dir = TempDir::new().unwrap();
        let mut store = DatasetStore::open(dir.path().join("face_dataset.json")).unwrap();
        let mut flows = RecordingFlows::default();
        let mut out = Vec::new();
        run(&mut store, &mut flows, &mut Cursor::new(script), &mut out).unwrap();
        (dir, store, flows, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_exit() {
        let (_dir, _store, flows, out) = run_script("4\n");
        assert!(flows.calls.is_empty());
        assert!(out.contains("1. Add face to dataset"));
        assert!(out.ends_with("Exiting the program.\n"));
    }

    #[test]
    fn test_add_recognize_delete() {
        let (_dir, store, flows, out) = run_script("1\nAlice Smith\n1\nBob\n2\n3\n1\n4\n");
        assert_eq!(flows.calls, ["enroll:Alice Smith", "enroll:Bob", "recognize"]);
        assert_eq!(store.names(), ["Bob"]);
        assert!(out.contains("Alice Smith's face has been successfully removed from the dataset."));
    }

    #[test]
    fn test_invalid_choice_reshows_menu() {
        let (_dir, _store, flows, out) = run_script("9\n4\n");
        assert!(flows.calls.is_empty());
        assert!(out.contains("Invalid choice. Please try again."));
        assert_eq!(out.matches("Select an option:").count(), 2);
    }

    #[test]
    fn test_end_of_input_exits() {
        let (_dir, _store, flows, _out) = run_script("1\n");
        assert!(flows.calls.is_empty());
    }

    #[test]
    fn test_empty_name_is_accepted() {
        let (_dir, store, flows, _out) = run_script("1\n\n4\n");
        assert_eq!(flows.calls, ["enroll:"]);
        assert_eq!(store.names(), [""]);
    }
}
