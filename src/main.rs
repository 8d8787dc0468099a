use std::fs;
use std::process;

use nom::character::complete::hex_digit1;
use nom::IResult;
use tracing::{event, Level};
use tracing_subscriber::prelude::*;

use bits_decoder::bitstream::Bitstream;
use bits_decoder::packet::Packet;

fn hex_parser(input: &str) -> IResult<&str, &str> {
    hex_digit1(input)
}

fn parse_input_line(line: &str) -> Result<&str, String> {
    match hex_parser(line) {
        Ok((unparsed, hex)) => {
            if unparsed.is_empty() {
                Ok(hex)
            } else {
                Err(format!("unexpected trailing junk: '{}'", unparsed))
            }
        }
        Err(e) => Err(format!("failed to parse '{}': {}", line, e)),
    }
}

#[test]
fn test_parse_input_line() {
    assert_eq!(parse_input_line("D2FE28"), Ok("D2FE28"));
    assert!(parse_input_line("D2FE28 oops").is_err());
    assert!(parse_input_line("").is_err());
}

fn run(input_file: &str) -> Result<(), String> {
    let input = fs::read_to_string(input_file)
        .map_err(|e| format!("failed to read {}: {}", input_file, e))?;
    let line = input.strip_suffix('\n').unwrap_or(input.as_str());
    let hex = parse_input_line(line)?;

    let mut bits = Bitstream::new(hex).map_err(|e| e.to_string())?;
    let packet = Packet::decode(&mut bits).map_err(|e| e.to_string())?;
    event!(
        Level::DEBUG,
        "decoded a top-level packet occupying {} of {} bits",
        bits.bit_pos(),
        hex.len() * 4,
    );
    let value = packet.value().map_err(|e| e.to_string())?;

    println!("Part 1:");
    println!("     Version sum: {}", packet.version_sum());
    println!("Part 2:");
    println!("     Value: {}", value);
    Ok(())
}

fn main() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
        Ok(layer) => layer,
    };
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: {} <input-file>", args[0]);
        process::exit(1);
    }
    if let Err(e) = run(&args[1]) {
        eprintln!("fail: {}", e);
        process::exit(1);
    }
}
