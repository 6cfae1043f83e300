//! The operator console: a line-oriented prompt for stepping a [`Session`] by hand, tuning its
//! parameters between steps and inspecting vertices.
//!
//! ```text
//! $ next 3
//! day 1: 2 new cases, 0 new deaths, 3 active, 3 cumulative, 0 dead, 0 immune
//! ...
//! $ set r0 4
//! r0=4 r0-delta=2 infectious-period=3 immunity-duration=off quarantine-delay=off death-probability=0
//! $ status ana
//! ana: infected since day 0
//! ```
use std::io::{BufRead, Write};

use clap::{value_parser, Arg, ArgMatches, Command};

use crate::error::ContagionError;
use crate::report::StepReport;
use crate::runner::Session;
use crate::status::{Day, StatusKind};

fn cli() -> Command {
    // strip out "Usage: " in the default template
    const MAIN_HELP_TEMPLATE: &str = "\
        {all-args}
    ";
    // strip out name/version
    const COMMAND_TEMPLATE: &str = "\
        {about-with-newline}\n\
        {usage-heading}\n    {usage}\n\
        \n\
        {all-args}{after-help}\
    ";

    Command::new("console")
        .multicall(true)
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommand_value_name("COMMAND")
        .subcommand_help_heading("CONTAGION CONSOLE")
        .help_template(MAIN_HELP_TEMPLATE)
        .subcommand(
            Command::new("next")
                .about("Advance the simulation by one day, or by COUNT days")
                .arg(
                    Arg::new("count")
                        .value_parser(value_parser!(u32))
                        .default_value("1"),
                )
                .help_template(COMMAND_TEMPLATE),
        )
        .subcommand(
            Command::new("auto")
                .about("Run until the outbreak is over, or for at most DAYS days")
                .arg(Arg::new("days").value_parser(value_parser!(Day)))
                .help_template(COMMAND_TEMPLATE),
        )
        .subcommand(
            Command::new("params")
                .about("Show the current parameters")
                .help_template(COMMAND_TEMPLATE),
        )
        .subcommand(
            Command::new("set")
                .about("Change a parameter; it applies from the next step")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("value").required(true))
                .help_template(COMMAND_TEMPLATE),
        )
        .subcommand(
            Command::new("status")
                .about("Show the status of a vertex")
                .arg(Arg::new("vertex").required(true))
                .help_template(COMMAND_TEMPLATE),
        )
        .subcommand(
            Command::new("summary")
                .about("Show the counters of the current day")
                .help_template(COMMAND_TEMPLATE),
        )
        .subcommand(
            Command::new("rewind")
                .about("Go back to the previous day")
                .help_template(COMMAND_TEMPLATE),
        )
        .subcommand(
            Command::new("quit")
                .alias("exit")
                .about("Leave the console")
                .help_template(COMMAND_TEMPLATE),
        )
}

fn format_report(report: &StepReport) -> String {
    format!(
        "day {}: {} new cases, {} new deaths, {} active, {} cumulative, {} dead, {} immune",
        report.day,
        report.new_cases,
        report.new_deaths,
        report.total_cases,
        report.cumulative_cases,
        report.total_deaths,
        report.total_immune
    )
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .map_or("", String::as_str)
}

fn print<W: Write>(output: &mut W, message: &str) -> Result<(), String> {
    writeln!(output, "{message}").map_err(|e| e.to_string())?;
    output.flush().map_err(|e| e.to_string())
}

/// Handles one command line. Returns `Ok(true)` when the console should close.
fn respond<W: Write>(line: &str, session: &mut Session, output: &mut W) -> Result<bool, String> {
    let args = shlex::split(line).ok_or("error: Invalid quoting")?;
    let matches = cli()
        .try_get_matches_from(args)
        .map_err(|e| e.to_string())?;

    match matches.subcommand() {
        Some(("next", matches)) => {
            let count = matches.get_one::<u32>("count").copied().unwrap_or(1);
            for _ in 0..count {
                if session.simulation().is_over() {
                    print(output, "The outbreak is over")?;
                    break;
                }
                let report = session.step().map_err(|e| e.to_string())?;
                print(output, &format_report(&report))?;
            }
        }
        Some(("auto", matches)) => {
            let days = matches.get_one::<Day>("days").copied();
            let outcome = match days {
                Some(days) => session.run_auto_for(Some(days)),
                None => session.run_auto(),
            }
            .map_err(|e| e.to_string())?;
            print(
                output,
                &format!("Ran {} days ({:?})", outcome.days_run, outcome.reason),
            )?;
            print(output, &format_report(&session.simulation().current_report()))?;
        }
        Some(("params", _matches)) => {
            print(output, &session.parameters().snapshot().to_string())?;
        }
        Some(("set", matches)) => {
            let name = required(matches, "name");
            let value = required(matches, "value");
            let parameters = session
                .parameters()
                .update(|parameters| parameters.set(name, value).map(|()| parameters.clone()))
                .map_err(|e| e.to_string())?;
            print(output, &parameters.to_string())?;
        }
        Some(("status", matches)) => {
            let vertex = required(matches, "vertex");
            let status = session
                .simulation()
                .state()
                .status(vertex)
                .map_err(|e| e.to_string())?;
            print(output, &format!("{vertex}: {status}"))?;
        }
        Some(("summary", _matches)) => {
            let simulation = session.simulation();
            let counts = simulation.state().counts();
            print(output, &format_report(&simulation.current_report()))?;
            let breakdown: Vec<String> = StatusKind::ALL
                .iter()
                .map(|kind| format!("{kind}={}", counts[*kind]))
                .collect();
            print(output, &breakdown.join(" "))?;
        }
        Some(("rewind", _matches)) => {
            if session.rewind().map_err(|e| e.to_string())? {
                let day = session.simulation().state().day();
                print(output, &format!("Back to day {day}"))?;
            } else {
                print(output, "No earlier day to go back to")?;
            }
        }
        Some(("quit", _matches)) => {
            return Ok(true);
        }
        Some((name, _matches)) => return Err(format!("error: unknown command `{name}`")),
        None => return Err("error: a command is required".to_string()),
    }

    Ok(false)
}

/// Reads commands from `input` until `quit` or the end of input, writing prompts and answers
/// to `output`. A failing command prints its error and the console carries on.
///
/// # Errors
///
/// Returns `ContagionError::IoError` if `input` or `output` fail.
pub fn run<R: BufRead, W: Write>(
    session: &mut Session,
    input: &mut R,
    output: &mut W,
) -> Result<(), ContagionError> {
    writeln!(
        output,
        "Contagion console on day {}. Type `help` for commands.",
        session.simulation().state().day()
    )?;
    loop {
        write!(output, "$ ")?;
        output.flush()?;

        let mut buffer = String::new();
        if input.read_line(&mut buffer)? == 0 {
            break;
        }
        let line = buffer.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, session, output) {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => {
                writeln!(output, "{}", err.trim_end())?;
                output.flush()?;
            }
        }
    }
    Ok(())
}
