use std::fmt;

use wasmbox::{Module, UntypedValue, ValueType};

/// Formats an [`UntypedValue`] the way its declared [`ValueType`] says to
/// read it, since the cell itself carries no type tag.
pub struct DisplayValue {
    value: UntypedValue,
    ty: ValueType,
}

impl DisplayValue {
    pub fn new(value: UntypedValue, ty: ValueType) -> Self {
        Self { value, ty }
    }
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            ValueType::I32 => write!(f, "{}", self.value.to_i32()),
            ValueType::I64 => write!(f, "{}", self.value.to_i64()),
            ValueType::F32 => write!(f, "{}", self.value.to_f32()),
            ValueType::F64 => write!(f, "{}", self.value.to_f64()),
            ValueType::FuncRef | ValueType::ExternRef => write!(f, "<ref>"),
        }
    }
}

/// Lists every function the module exports, for the error message shown when
/// `--invoke` names a function that doesn't exist.
pub struct DisplayExportedFuncs<'a>(&'a Module);

impl<'a> DisplayExportedFuncs<'a> {
    pub fn new(module: &'a Module) -> Self {
        Self(module)
    }
}

impl fmt::Display for DisplayExportedFuncs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "exported functions:")?;
        for export in &self.0.exports {
            if let wasmbox::ExportDesc::Func(_) = export.desc {
                writeln!(f, "  - {}", export.name)?;
            }
        }
        Ok(())
    }
}
