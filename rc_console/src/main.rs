//! # RC Console
//!
//! Interactive command line client for the drive executable. Each line typed is a command token,
//! sent to the rover as a TC message.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::{eyre::WrapErr, Report};
use rustyline::{error::ReadlineError, DefaultEditor};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::TcpStream;
use std::path::Path;
use std::time::Duration;
use structopt::StructOpt;

use comms_if::tc::{Mnvr, SpeedLevel, Tc, TcMessage, TcParseError, TcResponse};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const PROMPT: &str = "rover $ ";
const HISTORY_PATH: &str = "data/history.txt";

/// How long to wait for the rover to acknowledge a TC.
const ACK_TIMEOUT: Duration = Duration::from_millis(500);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "rc_console", about = "Send drive commands to the rover")]
struct Opt {
    /// Address of the rover
    #[structopt(long, default_value = "127.0.0.1")]
    host: String,

    /// TC port of the rover
    #[structopt(long, default_value = "5000")]
    port: u16,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum ConsoleAction {
    Nothing,
    Help,
    Exit,
    Send(Tc),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    let stream = TcpStream::connect((opt.host.as_str(), opt.port))
        .wrap_err_with(|| format!("Could not connect to {}:{}", opt.host, opt.port))?;
    stream
        .set_read_timeout(Some(ACK_TIMEOUT))
        .wrap_err("Could not set the socket timeout")?;
    let mut writer = stream.try_clone().wrap_err("Could not clone the socket")?;
    let mut reader = BufReader::new(stream);

    println!("Connected to {}:{}, type \"help\" for commands", opt.host, opt.port);

    let mut rl = DefaultEditor::new().wrap_err("Could not create the line editor")?;
    if rl.load_history(HISTORY_PATH).is_err() {
        println!("No history detected");
    }

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).wrap_err("Could not read the line"),
        };

        match parse(&line) {
            Ok(ConsoleAction::Nothing) => continue,
            Ok(ConsoleAction::Help) => print_help(),
            Ok(ConsoleAction::Exit) => break,
            Ok(ConsoleAction::Send(tc)) => {
                rl.add_history_entry(line.as_str()).ok();

                let mut msg = serde_json::to_vec(&TcMessage::from(tc))?;
                msg.push(b'\n');
                writer
                    .write_all(&msg)
                    .wrap_err("Connection to the rover lost")?;

                match recv_response(&mut reader)? {
                    Some(TcResponse::Success { command }) => println!("OK: {}", command),
                    Some(TcResponse::Error { error }) => println!("Rejected: {}", error),
                    None => println!("No acknowledgement received"),
                }
            }
            Err(e) => println!("{}", e),
        }
    }

    println!("Exiting...");

    if let Some(dir) = Path::new(HISTORY_PATH).parent() {
        std::fs::create_dir_all(dir).ok();
    }
    rl.save_history(HISTORY_PATH)
        .wrap_err("Could not save the history")?;

    Ok(())
}

fn parse(line: &str) -> Result<ConsoleAction, TcParseError> {
    match line.trim().to_lowercase().as_str() {
        "" => Ok(ConsoleAction::Nothing),
        "help" | "?" => Ok(ConsoleAction::Help),
        "exit" | "quit" => Ok(ConsoleAction::Exit),
        t => Tc::from_token(t).map(ConsoleAction::Send),
    }
}

/// Wait for a response line, returning `None` if none arrives before the timeout.
fn recv_response(reader: &mut BufReader<TcpStream>) -> Result<Option<TcResponse>, Report> {
    let mut line = String::new();

    match reader.read_line(&mut line) {
        Ok(0) => Err(color_eyre::eyre::eyre!("The rover closed the connection")),
        Ok(_) => Ok(Some(
            serde_json::from_str(&line).wrap_err("Could not parse the response")?,
        )),
        Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
        Err(e) => Err(e).wrap_err("Could not read the response"),
    }
}

fn print_help() {
    let mnvrs: Vec<&str> = Mnvr::ALL.iter().map(Mnvr::token).collect();
    let speeds: Vec<&str> = SpeedLevel::ALL.iter().map(SpeedLevel::token).collect();

    println!("Manouvres: {}", mnvrs.join(", "));
    println!("Speeds:    {}", speeds.join(", "));
    println!("Other:     help, exit");
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
