use std::path::Path;
use std::process::ExitCode;

use clap::{Args, Parser as ClapParser, Subcommand};

use thriftpp::compile::{ConvertOptions, convert};
use thriftpp::diag::format_error;

#[derive(ClapParser)]
#[command(
    name = "thriftpp",
    about = "convert thrift IDL to protobuf3",
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    args: ConvertArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Print the version number of thriftpp
    Version,

    /// Check reserved keywords in idl, emit nothing
    #[command(name = "checkKeys")]
    CheckKeys(ConvertArgs),
}

#[derive(Args, Default)]
struct ConvertArgs {
    /// Thrift files to convert
    #[arg(short = 'f', long = "idls", required = true)]
    idls: Vec<String>,

    /// Directories to search for included idl files
    #[arg(short = 'I', long = "dir", default_value = ".")]
    dirs: Vec<String>,

    /// Directory to store the generated pb file(s)
    #[arg(short = 'o', long = "output", default_value = "gen-pb")]
    output: String,

    /// Namespace scope used to pick the package name
    #[arg(short = 'l', long = "lang", default_value = "go")]
    lang: String,

    /// Single file mode, skip include resolution
    #[arg(short = 's', long = "single")]
    single: bool,

    /// Syntax check only
    #[arg(short = 'c', long = "check")]
    check: bool,

    /// Emit optional for non-container optional fields
    #[arg(short = 'p', long = "proto3-with-optional")]
    proto3_with_optional: bool,

    /// JSON file with extra reserved words, under the key "keyWords"
    #[arg(short = 'k', long = "keyWords")]
    key_words: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Version) => {
            println!("{}", thriftpp::VERSION);
            ExitCode::SUCCESS
        }
        Some(Command::CheckKeys(args)) => run_check_keys(&args),
        None => run_convert(&cli.args),
    }
}

fn run_convert(args: &ConvertArgs) -> ExitCode {
    let opts = ConvertOptions {
        dirs: &args.dirs,
        lang: &args.lang,
        key_words_file: args.key_words.as_deref().map(Path::new),
        single_mode: args.single,
        syntax_check_only: args.check,
        proto3_with_optional: args.proto3_with_optional,
        check_dirpc: true,
    };

    for idl in &args.idls {
        let source = match std::fs::read_to_string(idl) {
            Ok(source) => source,
            Err(e) => {
                println!("[Error]: failed to read {idl}: {e}");
                return ExitCode::FAILURE;
            }
        };
        let codes = match convert(&source, idl, &opts) {
            Ok(Some(codes)) => codes,
            Ok(None) => continue,
            Err(e) => {
                report_error(&source, &e);
                return ExitCode::FAILURE;
            }
        };

        if let Err(e) = std::fs::create_dir_all(&args.output) {
            println!("[Error]: {e}");
            return ExitCode::FAILURE;
        }
        if codes.is_empty() {
            println!("[WARN] nothing generated");
            return ExitCode::FAILURE;
        }
        for (name, text) in codes {
            let path = Path::new(&args.output).join(format!("{name}.proto"));
            if let Err(e) = std::fs::write(&path, text) {
                println!("fail to write file {}, due to {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
    }
    println!("Done!");
    ExitCode::SUCCESS
}

fn run_check_keys(args: &ConvertArgs) -> ExitCode {
    let opts = ConvertOptions {
        dirs: &args.dirs,
        lang: &args.lang,
        key_words_file: args.key_words.as_deref().map(Path::new),
        single_mode: true,
        syntax_check_only: true,
        proto3_with_optional: false,
        check_dirpc: false,
    };

    let mut failed = false;
    for idl in &args.idls {
        let source = match std::fs::read_to_string(idl) {
            Ok(source) => source,
            Err(e) => {
                println!("[Error]: failed to read {idl}: {e}");
                failed = true;
                continue;
            }
        };
        if let Err(e) = convert(&source, idl, &opts) {
            report_error(&source, &e);
            failed = true;
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn report_error(source: &str, error: &thriftpp::diag::CompileError) {
    match error.span() {
        Some(span) => print!("{}", format_error(source, span, error)),
        None => println!("[Error]: {error}"),
    }
}
