use wasmbox_core::UntypedValue;
use wasmbox_ir::{FuncIdx, GlobalIdx};

/// A constant expression, used for global initializers, table element
/// offsets, and data segment offsets.
///
/// The MVP only allows `i32.const`/`i64.const`/`f32.const`/`f64.const` and
/// `global.get` of an imported immutable global here; this covers exactly
/// that set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstExpr {
    Value(UntypedValue),
    GlobalGet(GlobalIdx),
    RefFunc(FuncIdx),
}

/// Resolves the globals a [`ConstExpr::GlobalGet`] may reference.
pub trait ConstEvalContext {
    fn global_value(&self, index: GlobalIdx) -> UntypedValue;
}

impl ConstExpr {
    pub fn eval(&self, ctx: &impl ConstEvalContext) -> UntypedValue {
        match *self {
            Self::Value(v) => v,
            Self::GlobalGet(idx) => ctx.global_value(idx),
            Self::RefFunc(idx) => UntypedValue::from(idx.to_u32()),
        }
    }
}
