use clap::{App, Arg};
use log::{error, LevelFilter};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use rplc::environment::Value;
use rplc::lexer;
use rplc::Error;
use simple_logger::SimpleLogger;
use std::fs;
use std::io::{self, Read};
use std::process;

fn read_source(file: Option<&str>) -> io::Result<String> {
    match file {
        Some(file) => fs::read_to_string(file),
        None => {
            let mut source = String::new();
            io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}

fn dump_tokens(source: &str) -> i32 {
    match lexer::lex(source) {
        Ok(tokens) => {
            for token in tokens {
                println!("{:5} {:<10} {}", token.index, token.tokentype, token.literal);
            }
            0
        }
        Err(e) => {
            eprintln!("{}", e);
            65
        }
    }
}

/// Low byte of `x` in two's complement, as the process exit status would
/// keep it: `256` exits with 0, `-1` with 255.
fn exit_status(x: &BigInt) -> i32 {
    (x % BigInt::from(256)).to_i32().map_or(70, |code| code & 0xff)
}

fn exit_code(result: Result<Value, Error>) -> i32 {
    match result {
        Ok(Value::Integer(x)) => exit_status(&x),
        Ok(other) => {
            error!("main returned non-integer {}", other);
            70
        }
        Err(e @ Error::Runtime(_)) => {
            eprintln!("{}", e);
            70
        }
        Err(e) => {
            eprintln!("{}", e);
            65
        }
    }
}

fn main() {
    let matches = App::new("rplc")
        .about("Runs a PLC program and exits with the value returned by main")
        .arg(
            Arg::with_name("FILE")
                .help("Source file to run; standard input when absent")
                .index(1),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Log each pipeline stage"),
        )
        .arg(
            Arg::with_name("tokens")
                .long("tokens")
                .help("Print the tokens and stop"),
        )
        .get_matches();

    let level = if matches.is_present("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if let Err(e) = SimpleLogger::new().with_level(level).env().init() {
        eprintln!("could not install logger: {}", e);
    }

    let source = match read_source(matches.value_of("FILE")) {
        Ok(source) => source,
        Err(e) => {
            error!("could not read source: {}", e);
            process::exit(66);
        }
    };
    let code = if matches.is_present("tokens") {
        dump_tokens(&source)
    } else {
        exit_code(rplc::run(&source, Box::new(io::stdout())))
    };
    process::exit(code);
}

#[cfg(test)]
mod main_tests {
    use crate::{exit_code, exit_status};
    use num_bigint::BigInt;
    use rplc::environment::Value;
    use rplc::interpreter::RuntimeError;
    use rplc::Error;

    #[test]
    fn results_wrap_into_the_exit_range() {
        assert_eq!(exit_status(&BigInt::from(0)), 0);
        assert_eq!(exit_status(&BigInt::from(3)), 3);
        assert_eq!(exit_status(&BigInt::from(256)), 0);
        assert_eq!(exit_status(&BigInt::from(300)), 44);
        assert_eq!(exit_status(&BigInt::from(-1)), 255);
        assert_eq!(exit_status(&BigInt::from(i64::MAX)), 255);
        assert_eq!(exit_status(&(BigInt::from(1) << 100)), 0);
    }

    #[test]
    fn failures_use_fixed_codes() {
        assert_eq!(exit_code(Err(Error::Runtime(RuntimeError::DivisionByZero))), 70);
        assert_eq!(exit_code(Ok(Value::Nil)), 70);
        assert_eq!(exit_code(Ok(Value::Integer(BigInt::from(7)))), 7);
    }
}
