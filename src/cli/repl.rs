use crate::cli::commands::{Command, HELP_TEXT, is_command_line, parse_command};
use crate::cli::theme::Theme;
use crate::cli::transcript::Transcript;
use crate::lookup::{Encyclopedia, Geocoder, WeatherSource};
use crate::router::IntentRouter;
use crate::trace::SessionTrace;
use crate::units::UnitConverter;
use anyhow::{Result, anyhow};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

pub const PROMPT: &str = "you> ";

const BANNER: &str = "askbox: math, unit conversion, weather and Wikipedia summaries.\nTry: convert 10 km to miles, 2*(3+4)^2, weather in Delhi, who is Nikola Tesla.\nType /help for commands, exit to quit.";

pub struct AppState<U, G, W, E> {
    pub router: IntentRouter<U, G, W, E>,
    pub transcript: Transcript,
    pub theme: Theme,
    pub trace: SessionTrace,
}

impl<U, G, W, E> AppState<U, G, W, E>
where
    U: UnitConverter,
    G: Geocoder,
    W: WeatherSource,
    E: Encyclopedia,
{
    pub fn new(router: IntentRouter<U, G, W, E>, trace: SessionTrace, theme: Theme) -> Self {
        Self {
            router,
            transcript: Transcript::default(),
            theme,
            trace,
        }
    }
}

pub async fn run_repl<U, G, W, E>(state: &mut AppState<U, G, W, E>) -> Result<()>
where
    U: UnitConverter,
    G: Geocoder,
    W: WeatherSource,
    E: Encyclopedia,
{
    let input = BufReader::new(tokio::io::stdin());
    let mut output = std::io::stdout();
    run_session(state, input, &mut output).await
}

/// Reads lines until `exit`, `quit` or end of input.
pub(crate) async fn run_session<U, G, W, E, R, O>(
    state: &mut AppState<U, G, W, E>,
    input: R,
    output: &mut O,
) -> Result<()>
where
    U: UnitConverter,
    G: Geocoder,
    W: WeatherSource,
    E: Encyclopedia,
    R: AsyncBufRead + Unpin,
    O: Write,
{
    writeln!(output, "{}", state.theme.info(BANNER))?;
    let mut lines = input.lines();

    loop {
        write!(output, "{}", state.theme.prompt(PROMPT))?;
        output.flush()?;

        let Some(line) = lines
            .next_line()
            .await
            .map_err(|err| anyhow!("Failed to read input: {err}"))?
        else {
            writeln!(output)?;
            break;
        };

        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        if line.is_empty() {
            continue;
        }

        handle_line(state, line, output).await?;
    }

    output.flush()?;
    Ok(())
}

async fn handle_line<U, G, W, E, O>(
    state: &mut AppState<U, G, W, E>,
    line: &str,
    output: &mut O,
) -> Result<()>
where
    U: UnitConverter,
    G: Geocoder,
    W: WeatherSource,
    E: Encyclopedia,
    O: Write,
{
    if is_command_line(line) {
        match parse_command(line) {
            Ok(command) => run_command(state, command, output)?,
            Err(err) => writeln!(output, "{}", state.theme.error(err.message()))?,
        }
        return Ok(());
    }

    state.trace.log_input(line);
    let result = state.router.route(line).await;
    state.trace.log_reply(result.kind.as_str(), &result.message);

    state.transcript.push_user(line);
    state.transcript.push_reply(result.kind, &result.message);
    writeln!(
        output,
        "{} {}",
        state.theme.kind_label(result.kind),
        result.message
    )?;
    Ok(())
}

fn run_command<U, G, W, E, O>(
    state: &AppState<U, G, W, E>,
    command: Command,
    output: &mut O,
) -> Result<()>
where
    O: Write,
{
    match command {
        Command::Help => writeln!(output, "{}", state.theme.info(HELP_TEXT))?,
        Command::History(limit) => {
            if state.transcript.is_empty() {
                writeln!(output, "{}", state.theme.info("No conversation yet."))?;
            }
            for turn in state.transcript.tail(limit) {
                writeln!(output, "{}", turn.render())?;
            }
        }
        Command::Trace => writeln!(
            output,
            "{}",
            state
                .theme
                .info(&format!("Trace file: {}", state.trace.file_path().display()))
        )?,
    }
    Ok(())
}
