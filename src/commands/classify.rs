use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::classification::{ClassificationTable, ResolvedDefaults, resolve_defaults};
use crate::cli::ClassifyArgs;
use crate::commands::list_files::{SortMode, list_directory};
use crate::model::{ClassificationRecord, MAX_QUALITY};
use crate::util::image_extension;

const AUTOSAVE_EVERY: usize = 10;

struct FieldPrompt {
    label: &'static str,
    max: u8,
    current: fn(&ClassificationRecord) -> u8,
}

const FIELDS: [FieldPrompt; 4] = [
    FieldPrompt {
        label: "Only Images (0=No, 1=Yes)",
        max: 1,
        current: |record| record.only_images,
    },
    FieldPrompt {
        label: "Description Quality (0-5)",
        max: MAX_QUALITY,
        current: |record| record.description_quality,
    },
    FieldPrompt {
        label: "Heights Quality (0-5)",
        max: MAX_QUALITY,
        current: |record| record.heights_quality,
    },
    FieldPrompt {
        label: "Rotate (0=No, 1=Yes)",
        max: 1,
        current: |record| record.rotate,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Value(u8),
    Skip,
    Quit,
}

pub fn run(args: ClassifyArgs) -> Result<()> {
    let images = discover_images(&args.image_dir)?;
    if images.is_empty() {
        warn!(image_dir = %args.image_dir.display(), "no images found");
        return Ok(());
    }

    let table = ClassificationTable::load(&args.output_csv);
    info!(
        images = images.len(),
        classified = table.len(),
        preserved = table.preserved_rows(),
        "starting classification session"
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut session = ClassifierSession {
        table,
        output_csv: args.output_csv.clone(),
        image_dir: args.image_dir.clone(),
        open_images: !args.no_open,
        input: stdin.lock(),
        output: stdout.lock(),
    };
    session.run(&images)?;

    info!(
        path = %args.output_csv.display(),
        classified = session.table.len(),
        "classification session complete"
    );
    Ok(())
}

pub fn discover_images(image_dir: &Path) -> Result<Vec<String>> {
    let files = list_directory(image_dir, SortMode::Natural)?;
    Ok(files
        .into_iter()
        .filter(|name| image_extension(name).is_some())
        .collect())
}

struct ClassifierSession<R, W> {
    table: ClassificationTable,
    output_csv: PathBuf,
    image_dir: PathBuf,
    open_images: bool,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ClassifierSession<R, W> {
    fn run(&mut self, images: &[String]) -> Result<()> {
        let total = images.len();

        'images: for (position, filename) in images.iter().enumerate() {
            if let Some(existing) = self.table.get(filename).copied() {
                writeln!(self.output, "\n[{}/{}] {}", position + 1, total, filename)?;
                writeln!(
                    self.output,
                    "Already classified: Only Images={}, Description={}, Heights={}, Rotate={}",
                    existing.only_images,
                    existing.description_quality,
                    existing.heights_quality,
                    existing.rotate
                )?;
                match self.read_line("Re-classify? (y/N): ")? {
                    None => break,
                    Some(answer) if answer.eq_ignore_ascii_case("y") => {}
                    Some(_) => continue,
                }
            }

            writeln!(
                self.output,
                "\n[{}/{}] Classifying: {}",
                position + 1,
                total,
                filename
            )?;
            if self.open_images {
                open_image(&self.image_dir.join(filename));
            }

            let defaults = resolve_defaults(filename, &self.table);
            if let ResolvedDefaults::Inherited { from, .. } = defaults {
                info!(image = %filename, from, "using previous page defaults");
            }
            let has_current = defaults != ResolvedDefaults::Fallback;
            let current = defaults.record();

            let mut values = [0_u8; 4];
            for (slot, field) in values.iter_mut().zip(FIELDS.iter()) {
                let current_value = has_current.then(|| (field.current)(&current));
                match self.prompt_field(field, current_value)? {
                    Answer::Value(value) => *slot = value,
                    Answer::Skip => continue 'images,
                    Answer::Quit => break 'images,
                }
            }

            let [only_images, description_quality, heights_quality, rotate] = values;
            self.table.insert(
                filename.clone(),
                ClassificationRecord {
                    only_images,
                    description_quality,
                    heights_quality,
                    rotate,
                },
            );
            writeln!(self.output, "Saved classification for {filename}")?;

            if self.table.len() % AUTOSAVE_EVERY == 0 {
                self.table.save(&self.output_csv)?;
                info!(classified = self.table.len(), "auto-saved progress");
            }
        }

        self.table.save(&self.output_csv)?;
        Ok(())
    }

    fn prompt_field(&mut self, field: &FieldPrompt, current: Option<u8>) -> Result<Answer> {
        let prompt = match current {
            Some(value) => format!("{} (current: {value}, default: 0): ", field.label),
            None => format!("{} (default: 0): ", field.label),
        };

        loop {
            let Some(answer) = self.read_line(&prompt)? else {
                return Ok(Answer::Quit);
            };

            match answer.as_str() {
                "" => return Ok(Answer::Value(current.unwrap_or(0))),
                "q" => return Ok(Answer::Quit),
                "s" => return Ok(Answer::Skip),
                other => match other.parse::<u8>() {
                    Ok(value) if value <= field.max => return Ok(Answer::Value(value)),
                    _ => writeln!(
                        self.output,
                        "Invalid input. Please enter a number from 0 to {} (or 'q' to quit, 's' to skip, Enter for default)",
                        field.max
                    )?,
                },
            }
        }
    }

    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("failed to read from stdin")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

fn open_image(path: &Path) {
    let status = if cfg!(target_os = "macos") {
        Command::new("open").arg(path).status()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", ""]).arg(path).status()
    } else {
        Command::new("xdg-open").arg(path).status()
    };

    match status {
        Ok(status) if status.success() => {}
        Ok(status) => warn!(path = %path.display(), %status, "image viewer exited with failure"),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not open image automatically")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Cursor;

    use super::*;

    fn session(
        table: ClassificationTable,
        dir: &Path,
        input: &str,
    ) -> ClassifierSession<Cursor<Vec<u8>>, Vec<u8>> {
        ClassifierSession {
            table,
            output_csv: dir.join("image_classifications.csv"),
            image_dir: dir.to_path_buf(),
            open_images: false,
            input: Cursor::new(input.as_bytes().to_vec()),
            output: Vec::new(),
        }
    }

    fn record(only_images: u8, description: u8, heights: u8, rotate: u8) -> ClassificationRecord {
        ClassificationRecord {
            only_images,
            description_quality: description,
            heights_quality: heights,
            rotate,
        }
    }

    #[test]
    fn new_page_inherits_previous_page_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let table: ClassificationTable =
            [("doc_page1.png".to_string(), record(0, 5, 5, 0))].into_iter().collect();
        let images = vec!["doc_page1.png".to_string(), "doc_page2.png".to_string()];

        let mut session = session(table, dir.path(), "n\n\n\n\n\n");
        session.run(&images).expect("run");

        assert_eq!(session.table.get("doc_page2.png"), Some(&record(0, 5, 5, 0)));
        let transcript = String::from_utf8(session.output).expect("utf8");
        assert!(transcript.contains("Description Quality (0-5) (current: 5, default: 0): "));

        let saved = ClassificationTable::read(&dir.path().join("image_classifications.csv"))
            .expect("saved table");
        assert_eq!(saved.len(), 2);
    }

    #[test]
    fn invalid_answers_are_reprompted_and_skip_quit_stop_early() {
        let dir = tempfile::tempdir().expect("tempdir");
        let images = vec![
            "a_page1.png".to_string(),
            "b_page1.png".to_string(),
            "c_page1.png".to_string(),
        ];

        let mut session = session(
            ClassificationTable::new(),
            dir.path(),
            "1\n7\n4\n3\n\ns\nq\n",
        );
        session.run(&images).expect("run");

        assert_eq!(session.table.len(), 1);
        assert_eq!(session.table.get("a_page1.png"), Some(&record(1, 4, 3, 0)));
        let transcript = String::from_utf8(session.output).expect("utf8");
        assert!(transcript.contains("Invalid input."));
        assert!(dir.path().join("image_classifications.csv").exists());
    }

    #[test]
    fn end_of_input_saves_progress() {
        let dir = tempfile::tempdir().expect("tempdir");
        let images = vec!["x_page1.png".to_string(), "x_page2.png".to_string()];

        let mut session = session(ClassificationTable::new(), dir.path(), "0\n2\n2\n1\n");
        session.run(&images).expect("run");

        let raw = fs::read_to_string(dir.path().join("image_classifications.csv")).expect("read");
        assert_eq!(
            raw,
            "filename,only_images,description_quality,heights_quality,rotate\nx_page1.png,0,2,2,1\n"
        );
    }

    #[test]
    fn unreadable_rows_survive_a_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let csv_path = dir.path().join("image_classifications.csv");
        fs::write(
            &csv_path,
            "filename,only_images,description_quality,heights_quality,rotate\n\
             a_page1.png,0,5,5,0\n\
             b_page1.png,0,4,4,0\n\
             c_page1.png,0,3,3,2\n",
        )
        .expect("csv");

        let table = ClassificationTable::load(&csv_path);
        assert_eq!(table.len(), 2);
        assert_eq!(table.preserved_rows(), 1);

        let images = vec!["d_page1.png".to_string()];
        let mut session = session(table, dir.path(), "q\n");
        session.run(&images).expect("run");

        let raw = fs::read_to_string(&csv_path).expect("read");
        assert_eq!(
            raw,
            "filename,only_images,description_quality,heights_quality,rotate\n\
             a_page1.png,0,5,5,0\n\
             b_page1.png,0,4,4,0\n\
             c_page1.png,0,3,3,2\n"
        );
    }

    #[test]
    fn discover_images_ignores_other_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["p_page10.png", "p_page2.JPG", "notes.txt", ".hidden.png"] {
            fs::write(dir.path().join(name), b"x").expect("write");
        }

        let images = discover_images(dir.path()).expect("discover");
        assert_eq!(images, vec!["p_page2.JPG", "p_page10.png"]);
    }
}
