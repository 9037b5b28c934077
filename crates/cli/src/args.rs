use std::path::{Path, PathBuf};

use clap::Parser;

/// Runs a Wasm module with this interpreter.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None, trailing_var_arg = true)]
pub struct Args {
    /// The file containing the WebAssembly module to execute.
    #[clap(value_name = "MODULE", value_hint = clap::ValueHint::FilePath)]
    wasm_file: PathBuf,

    /// The function to invoke.
    ///
    /// If missing, the CLI runs the module's exported `_start` function.
    #[clap(long = "invoke", value_name = "FUNCTION")]
    invoke: Option<String>,

    /// Arguments given to the invoked function.
    #[clap(value_name = "ARGS")]
    func_args: Vec<String>,
}

impl Args {
    pub fn wasm_file(&self) -> &Path {
        &self.wasm_file
    }

    pub fn invoked(&self) -> Option<&str> {
        self.invoke.as_deref()
    }

    pub fn func_args(&self) -> &[String] {
        &self.func_args
    }
}
