use std::fs;

use anyhow::{anyhow, bail, Context, Error, Result};
use clap::Parser;
use wasmbox::{Config, ExportDesc, FuncIdx, Instance, Module, ModuleLoader};

mod args;
mod display;
mod utils;

use args::Args;
use display::{DisplayExportedFuncs, DisplayValue};

fn main() -> Result<()> {
    let args = Args::parse();
    run(&args)
}

fn run(args: &Args) -> Result<()> {
    let bytes = fs::read(args.wasm_file())
        .with_context(|| format!("failed to read Wasm file {:?}", args.wasm_file()))?;
    let module = ModuleLoader::load(&bytes)
        .map_err(|e| anyhow!("failed to parse and translate Wasm module: {e}"))?;

    let func_name = args.invoked().unwrap_or("_start");
    let func = resolve_func(&module, func_name)?;
    let func_type = module.func_type(func).clone();

    let func_args = utils::decode_func_args(&func_type, args.func_args())?;

    let config = Config::default();
    let mut instance =
        Instance::new(&module).map_err(|t| anyhow!("failed to instantiate module: {t}"))?;
    let results = wasmbox::eval_function(&module, &mut instance, &config, func, &func_args)
        .map_err(|t| anyhow!("failed during execution of {func_name}: {t}"))?;

    for (value, ty) in results.iter().zip(func_type.results()) {
        println!("{}", DisplayValue::new(*value, *ty));
    }
    Ok(())
}

/// Looks up `name` among the module's function exports.
fn resolve_func(module: &Module, name: &str) -> Result<FuncIdx, Error> {
    let export = module
        .export(name)
        .ok_or_else(|| anyhow!("no exported function named `{name}`\n\n{}", DisplayExportedFuncs::new(module)))?;
    match export.desc {
        ExportDesc::Func(func) => Ok(func),
        _ => bail!("export `{name}` is not a function\n\n{}", DisplayExportedFuncs::new(module)),
    }
}
