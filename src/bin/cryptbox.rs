use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use cryptbox::error::Result;
use cryptbox::file_ops;
use cryptbox::passphrase::{PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader};

#[derive(Parser, Debug)]
#[command(name = "cryptbox", version, about = "passphrase-based file encryption")]
struct Cli {
    /// Read passphrase from stdin instead of from terminal
    #[arg(long = "passphrase-stdin", action = ArgAction::SetTrue, global = true)]
    passphrase_stdin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(short = 'i', long = "input")]
        input: PathBuf,
        /// Path to write the encrypted container to [default: <input>.cbx]
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Decrypt a file
    Decrypt {
        /// Path to the encrypted container
        #[arg(short = 'i', long = "input")]
        input: PathBuf,
        /// Path to write the plaintext to [default: <input> minus .cbx]
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
}

fn run(cli: Cli) -> Result<()> {
    let mut reader: Box<dyn PassphraseReader> = if cli.passphrase_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(std::io::stdin())))
    } else {
        Box::new(TerminalPassphraseReader::new())
    };

    match cli.command {
        Commands::Encrypt { input, output } => {
            let output = output.unwrap_or_else(|| file_ops::encrypted_path(&input));
            file_ops::encrypt_file(&input, &output, reader.as_mut())
        }
        Commands::Decrypt { input, output } => {
            let output = match output {
                Some(path) => path,
                None => file_ops::decrypted_path(&input)?,
            };
            file_ops::decrypt_file(&input, &output, reader.as_mut())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        // Print the full context chain; the innermost message is the one
        // that says what actually went wrong.
        eprint!("cryptbox: {}", err.message());
        let mut source = err.source_error().map(|s| s as &dyn std::error::Error);
        while let Some(inner) = source {
            eprint!(": {}", inner);
            source = inner.source();
        }
        eprintln!();
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
