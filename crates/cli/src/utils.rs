use anyhow::{anyhow, bail, Error};
use wasmbox::{FuncType, UntypedValue, ValueType};

/// Decodes `args` as the parameter values `ty` expects, failing if the count
/// or the individual parses don't match. Each argument is parsed with its
/// declared type's own `FromStr`, not coerced from a single shared format.
pub fn decode_func_args(ty: &FuncType, args: &[String]) -> Result<Vec<UntypedValue>, Error> {
    if args.len() != ty.params().len() {
        bail!(
            "expected {} argument(s), found {}",
            ty.params().len(),
            args.len()
        );
    }
    ty.params()
        .iter()
        .zip(args)
        .enumerate()
        .map(|(n, (param_type, arg))| {
            let err = |_| anyhow!("failed to parse argument {arg} at index {n} as {param_type}");
            match param_type {
                ValueType::I32 => arg.parse::<i32>().map(UntypedValue::from).map_err(err),
                ValueType::I64 => arg.parse::<i64>().map(UntypedValue::from).map_err(err),
                ValueType::F32 => arg.parse::<f32>().map(UntypedValue::from).map_err(err),
                ValueType::F64 => arg.parse::<f64>().map(UntypedValue::from).map_err(err),
                ValueType::FuncRef => bail!("cannot pass a funcref argument from the command line"),
                ValueType::ExternRef => {
                    bail!("cannot pass an externref argument from the command line")
                }
            }
        })
        .collect()
}
