use std::io::{BufRead, Write};

use super::command::{Command, HELP};
use super::frontend::Frontend;
use super::view::footer_line;
use super::AppError;

enum Flow {
    Continue,
    Quit,
}

/// Read commands line by line until `quit` or end of input.
///
/// Bad commands and unknown item ids are reported and the session goes on;
/// only I/O and export failures end it.
pub fn run<R: BufRead, W: Write>(
    frontend: &mut dyn Frontend,
    input: R,
    mut output: W,
) -> Result<(), AppError> {
    writeln!(
        output,
        "todo-lab ({} strategy). Type `help` for commands.",
        frontend.strategy().as_str()
    )?;
    write!(output, "{}", frontend.screen())?;

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                writeln!(output, "error: {e}")?;
                continue;
            }
        };
        tracing::debug!(?command, "Executing");

        match execute(frontend, command, &mut output) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(AppError::Store(e)) => writeln!(output, "error: {e}")?,
            Err(e) => return Err(e),
        }
    }
    output.flush()?;
    Ok(())
}

fn execute<W: Write>(
    frontend: &mut dyn Frontend,
    command: Command,
    output: &mut W,
) -> Result<Flow, AppError> {
    match command {
        Command::Add(action) => {
            let id = frontend.add(&action);
            writeln!(output, "Added #{id}")?;
        }
        Command::Toggle(id) => {
            let verb = if frontend.toggle(id)? { "Completed" } else { "Reopened" };
            writeln!(output, "{verb} #{id}")?;
        }
        Command::Rename { id, action } => {
            frontend.rename(id, &action)?;
            writeln!(output, "Renamed #{id}")?;
        }
        Command::Move { id, distance } => {
            frontend.move_item(id, distance)?;
            writeln!(output, "Moved #{id}")?;
        }
        Command::Delete(ids) => {
            let count = frontend.delete(&ids);
            writeln!(output, "Deleted {count} {}", plural(count))?;
        }
        Command::Purge => {
            let count = frontend.purge();
            writeln!(output, "Deleted {count} completed {}", plural(count))?;
        }
        Command::Order => {
            let state = if frontend.toggle_order() { "on" } else { "off" };
            writeln!(output, "Completed items last: {state}")?;
        }
        Command::Show => write!(output, "{}", frontend.screen())?,
        Command::Stats => write!(output, "{}", footer_line(frontend.render_stats()))?,
        Command::Export => {
            let json = serde_json::to_string_pretty(&frontend.items())?;
            writeln!(output, "{json}")?;
        }
        Command::Help => writeln!(output, "{HELP}")?,
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        "item"
    } else {
        "items"
    }
}
