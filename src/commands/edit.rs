use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value;
use tracing::{info, warn};

use crate::classification::dataset_document_name;
use crate::cli::EditArgs;
use crate::dataset::{load_dataset, source_document};
use crate::error::EditError;
use crate::ground_truth::{
    BoreholeId, EditorSession, GroundwaterId, GroundwaterInput, LayerId, LayerInput,
    MoveDirection, SaveOutcome,
};
use crate::util::image_extension;

const USAGE: &str = "\
commands (fields after the command word are separated by '|'):
  show
  add-layer <borehole?>|<start>|<end>|<material>
  edit-layer <layer>|<start>|<end>|<material>
  delete-layer <layer>
  up <layer> / down <layer>
  add-gw <borehole?>|<date>|<depth>|<elevation>
  edit-gw <groundwater>|<date>|<depth>|<elevation>
  delete-gw <groundwater>
  save
  quit";

#[derive(Debug, Clone, PartialEq)]
enum EditCommand {
    Show,
    Help,
    Save,
    Quit,
    AddLayer {
        borehole: Option<BoreholeId>,
        input: LayerInput,
    },
    EditLayer {
        layer: LayerId,
        input: LayerInput,
    },
    DeleteLayer(LayerId),
    MoveLayer(LayerId, MoveDirection),
    AddGroundwater {
        borehole: Option<BoreholeId>,
        input: GroundwaterInput,
    },
    EditGroundwater {
        entry: GroundwaterId,
        input: GroundwaterInput,
    },
    DeleteGroundwater(GroundwaterId),
}

impl EditCommand {
    fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match word {
            "show" => Self::Show,
            "help" => Self::Help,
            "save" => Self::Save,
            "quit" | "exit" => Self::Quit,
            "add-layer" => {
                let [borehole, start, end, material] = fields(rest, "add-layer")?;
                Self::AddLayer {
                    borehole: optional_borehole(borehole)?,
                    input: LayerInput::new(start, end, material),
                }
            }
            "edit-layer" => {
                let [layer, start, end, material] = fields(rest, "edit-layer")?;
                Self::EditLayer {
                    layer: layer.parse()?,
                    input: LayerInput::new(start, end, material),
                }
            }
            "delete-layer" => Self::DeleteLayer(rest.parse()?),
            "up" => Self::MoveLayer(rest.parse()?, MoveDirection::Up),
            "down" => Self::MoveLayer(rest.parse()?, MoveDirection::Down),
            "add-gw" => {
                let [borehole, date, depth, elevation] = fields(rest, "add-gw")?;
                Self::AddGroundwater {
                    borehole: optional_borehole(borehole)?,
                    input: GroundwaterInput::new(date, depth, elevation),
                }
            }
            "edit-gw" => {
                let [entry, date, depth, elevation] = fields(rest, "edit-gw")?;
                Self::EditGroundwater {
                    entry: entry.parse()?,
                    input: GroundwaterInput::new(date, depth, elevation),
                }
            }
            "delete-gw" => Self::DeleteGroundwater(rest.parse()?),
            other => bail!("unknown command {other:?}; type 'help'"),
        };

        Ok(command)
    }
}

fn fields<'a, const N: usize>(rest: &'a str, command: &str) -> Result<[&'a str; N]> {
    let parts: Vec<&str> = rest.splitn(N, '|').map(str::trim).collect();
    <[&str; N]>::try_from(parts)
        .map_err(|_| anyhow!("{command} expects {N} '|'-separated fields"))
}

fn optional_borehole(raw: &str) -> Result<Option<BoreholeId>> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some)
}

pub fn run(args: EditArgs) -> Result<()> {
    let dataset = load_dataset(&args.predictions)?;
    let document_name = if image_extension(&args.document).is_some() {
        dataset_document_name(&args.document)
            .with_context(|| format!("cannot derive document name from {}", args.document))?
    } else {
        args.document.clone()
    };

    let source = source_document(&dataset, &document_name)?;
    if source.is_none() {
        warn!(document = %document_name, "no auto-extracted data; manual entry required");
    }
    let mut session = EditorSession::new(document_name, source);

    let stdin = io::stdin();
    let stdout = io::stdout();
    run_session(&mut session, &args.output_dir, stdin.lock(), stdout.lock())
}

fn run_session<R: BufRead, W: Write>(
    session: &mut EditorSession,
    output_dir: &Path,
    mut input: R,
    mut output: W,
) -> Result<()> {
    writeln!(output, "Editing ground truth for {}", session.document_name())?;
    render(session, &mut output)?;
    writeln!(output, "{USAGE}")?;

    loop {
        write!(output, "> ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line).context("failed to read from stdin")? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let command = match EditCommand::parse(&line) {
            Ok(command) => command,
            Err(err) => {
                writeln!(output, "error: {err:#}")?;
                continue;
            }
        };

        match command {
            EditCommand::Show => render(session, &mut output)?,
            EditCommand::Help => writeln!(output, "{USAGE}")?,
            EditCommand::Quit => break,
            EditCommand::Save => match session.save(output_dir) {
                Ok(SaveOutcome::Saved(path)) => {
                    info!(path = %path.display(), "saved ground truth");
                    writeln!(output, "saved {}", path.display())?;
                }
                Ok(SaveOutcome::NothingToSave) => writeln!(output, "nothing to save")?,
                Err(err) => writeln!(output, "error: {err:#}")?,
            },
            edit => {
                let outcome = apply(session, edit);
                match outcome {
                    Ok(message) => writeln!(output, "{message}")?,
                    Err(err) if err.is_validation() => writeln!(output, "invalid input: {err}")?,
                    Err(err) => writeln!(output, "error: {err}")?,
                }
            }
        }
    }

    if session.is_modified() {
        warn!(document = %session.document_name(), "session ended with unsaved changes");
    }
    Ok(())
}

fn apply(session: &mut EditorSession, command: EditCommand) -> Result<String, EditError> {
    let message = match command {
        EditCommand::AddLayer { borehole, input } => {
            format!("added {}", session.add_layer(borehole, &input)?)
        }
        EditCommand::EditLayer { layer, input } => {
            session.edit_layer(layer, &input)?;
            let material = session
                .document()
                .layer(layer)
                .map(|edited| edited.record.material_description.text().to_string())
                .unwrap_or_default();
            format!("updated {layer}: {material}")
        }
        EditCommand::DeleteLayer(layer) => {
            session.delete_layer(layer)?;
            format!("deleted {layer}")
        }
        EditCommand::MoveLayer(layer, direction) => {
            if session.move_layer(layer, direction)? {
                format!("moved {layer}")
            } else {
                format!("{layer} is already at the boundary")
            }
        }
        EditCommand::AddGroundwater { borehole, input } => {
            format!("added {}", session.add_groundwater(borehole, &input)?)
        }
        EditCommand::EditGroundwater { entry, input } => {
            session.edit_groundwater(entry, &input)?;
            let depth = session
                .document()
                .groundwater(entry)
                .map_or_else(|| "N/A".to_string(), |edited| display_value(&edited.record.depth));
            format!("updated {entry}: depth={depth}")
        }
        EditCommand::DeleteGroundwater(entry) => {
            session.delete_groundwater(entry)?;
            format!("deleted {entry}")
        }
        EditCommand::Show | EditCommand::Help | EditCommand::Save | EditCommand::Quit => {
            String::new()
        }
    };
    Ok(message)
}

fn render<W: Write>(session: &EditorSession, output: &mut W) -> Result<()> {
    let boreholes = session.document().boreholes();
    if boreholes.is_empty() {
        writeln!(output, "(no boreholes; add-layer or add-gw creates borehole 0)")?;
    }

    for borehole in boreholes {
        let coordinates = &borehole.metadata.coordinates;
        writeln!(
            output,
            "{} borehole_index={} elevation={} E={} N={}",
            borehole.id,
            borehole.borehole_index,
            display_number(borehole.metadata.elevation.value()),
            display_number(coordinates.east()),
            display_number(coordinates.north())
        )?;
        for layer in &borehole.layers {
            writeln!(
                output,
                "  {:<5} {:>8} - {:<8} {}",
                layer.id.to_string(),
                display_number(layer.record.depths.start.value()),
                display_number(layer.record.depths.end.value()),
                layer.record.material_description.text()
            )?;
        }
        for entry in &borehole.groundwater {
            writeln!(
                output,
                "  {:<5} date={} depth={} elevation={}",
                entry.id.to_string(),
                display_value(&entry.record.date),
                display_value(&entry.record.depth),
                display_value(&entry.record.elevation)
            )?;
        }
    }

    let state = if session.is_modified() {
        "modified - unsaved changes"
    } else if session.source_loaded() {
        "auto-extracted data loaded"
    } else {
        "no auto-extracted data - manual entry"
    };
    writeln!(output, "[{state}]")?;
    Ok(())
}

fn display_number(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |value| value.to_string())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Cursor;

    use serde_json::json;

    use super::*;
    use crate::ground_truth::SourceDocument;

    #[test]
    fn parse_splits_pipe_separated_fields() {
        assert_eq!(
            EditCommand::parse("add-layer | 0 | 1.5 | Sandy gravel | with cobbles").expect("parse"),
            EditCommand::AddLayer {
                borehole: None,
                input: LayerInput::new("0", "1.5", "Sandy gravel | with cobbles"),
            }
        );
        assert_eq!(
            EditCommand::parse("edit-gw G4|2020-01-01||12").expect("parse"),
            EditCommand::EditGroundwater {
                entry: GroundwaterId(4),
                input: GroundwaterInput::new("2020-01-01", "", "12"),
            }
        );
        assert_eq!(
            EditCommand::parse("down L2").expect("parse"),
            EditCommand::MoveLayer(LayerId(2), MoveDirection::Down)
        );
    }

    #[test]
    fn parse_rejects_unknown_or_incomplete_commands() {
        assert!(EditCommand::parse("frobnicate").is_err());
        assert!(EditCommand::parse("edit-layer L1|2").is_err());
        assert!(EditCommand::parse("delete-layer").is_err());
    }

    #[test]
    fn scripted_session_edits_and_saves() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source: SourceDocument = serde_json::from_value(json!({
            "boreholes": [{
                "borehole_index": 0,
                "layers": [
                    {"material_description": {"text": "Topsoil"}, "depths": {"start": {"value": 0.0}, "end": {"value": 0.3}}},
                    {"material_description": "Gravel", "depths": {"start": 0.3, "end": 2.0}}
                ]
            }]
        }))
        .expect("source");
        let mut session = EditorSession::new("42.pdf", Some(source));

        let script = "edit-layer L1|0|0.3|\nup L2\nadd-layer |2|4|Clay\nsave\nquit\n";
        let mut output = Vec::new();
        run_session(&mut session, dir.path(), Cursor::new(script), &mut output).expect("session");

        let transcript = String::from_utf8(output).expect("utf8");
        assert!(transcript.contains("invalid input: material description is required"));
        assert!(transcript.contains("moved L2"));
        assert!(transcript.contains("saved "));
        assert!(!session.is_modified());

        let written: serde_json::Value = serde_json::from_slice(
            &fs::read(dir.path().join("ground_truth").join("42_ground_truth.json")).expect("file"),
        )
        .expect("json");
        let materials: Vec<&str> = written["42.pdf"][0]["layers"]
            .as_array()
            .expect("layers")
            .iter()
            .filter_map(|layer| layer["material_description"].as_str())
            .collect();
        assert_eq!(materials, vec!["Gravel", "Topsoil", "Clay"]);
    }

    #[test]
    fn saving_without_data_reports_nothing_to_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = EditorSession::new("blank.pdf", None);
        let mut output = Vec::new();

        run_session(&mut session, dir.path(), Cursor::new("save\n"), &mut output)
            .expect("session");

        let transcript = String::from_utf8(output).expect("utf8");
        assert!(transcript.contains("nothing to save"));
    }
}
