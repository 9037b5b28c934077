use core::fmt;

/// An untyped 64-bit value cell.
///
/// Mirrors the Wasm MVP's four value types (`i32`, `i64`, `f32`, `f64`) by
/// bit-pattern reinterpretation: the cell itself carries no type tag, the
/// same 64 bits can be read back as any of the four depending on which
/// accessor the caller uses. The tag lives only in [`ValueType`] and in the
/// translator's bookkeeping — never at runtime.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct UntypedValue(u64);

impl UntypedValue {
    /// The all-zero value, used to default-initialize locals and stack slots.
    pub const ZERO: Self = Self(0);

    /// Creates an [`UntypedValue`] from its raw 64-bit representation.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw 64-bit representation of this [`UntypedValue`].
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    pub fn to_i32(self) -> i32 {
        self.0 as u32 as i32
    }

    pub fn to_u32(self) -> u32 {
        self.0 as u32
    }

    pub fn to_i64(self) -> i64 {
        self.0 as i64
    }

    pub fn to_u64(self) -> u64 {
        self.0
    }

    pub fn to_f32(self) -> f32 {
        f32::from_bits(self.0 as u32)
    }

    pub fn to_f64(self) -> f64 {
        f64::from_bits(self.0)
    }

    /// Reads this cell as a boolean by the Wasm convention: nonzero `i32` is `true`.
    pub fn to_bool(self) -> bool {
        self.to_u32() != 0
    }
}

macro_rules! impl_from_int {
    ($($int:ty),* $(,)?) => {
        $(
            impl From<$int> for UntypedValue {
                fn from(value: $int) -> Self {
                    Self(value as u64)
                }
            }
        )*
    };
}
impl_from_int!(i8, u8, i16, u16, i32, u32, i64, u64, usize);

impl From<bool> for UntypedValue {
    fn from(value: bool) -> Self {
        Self(value as u64)
    }
}

impl From<f32> for UntypedValue {
    fn from(value: f32) -> Self {
        Self(value.to_bits() as u64)
    }
}

impl From<f64> for UntypedValue {
    fn from(value: f64) -> Self {
        Self(value.to_bits())
    }
}

/// The value type tag of a Wasm value.
///
/// Used only in type descriptors and during translation; [`UntypedValue`]
/// itself carries no such tag at runtime.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
    FuncRef,
    ExternRef,
}

impl ValueType {
    /// Returns `true` if values of this type are numeric (`i32`/`i64`/`f32`/`f64`).
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::FuncRef | Self::ExternRef)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::FuncRef => "funcref",
            Self::ExternRef => "externref",
        };
        f.write_str(name)
    }
}

/// A Wasm function signature: a tuple of parameter and result types.
///
/// Owned by `Module::types`; every `Function::ty` aliases an entry there.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FuncType {
    params: Box<[ValueType]>,
    results: Box<[ValueType]>,
}

impl FuncType {
    pub fn new(params: impl Into<Box<[ValueType]>>, results: impl Into<Box<[ValueType]>>) -> Self {
        Self {
            params: params.into(),
            results: results.into(),
        }
    }

    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    pub fn results(&self) -> &[ValueType] {
        &self.results
    }

    pub fn len_params(&self) -> u16 {
        self.params.len() as u16
    }

    pub fn len_results(&self) -> u16 {
        self.results.len() as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i32_round_trip() {
        let v = UntypedValue::from(-1i32);
        assert_eq!(v.to_i32(), -1);
        assert_eq!(v.to_u32(), u32::MAX);
    }

    #[test]
    fn f32_reinterpret_round_trip() {
        // 1.5f32 <-> 0x3FC00000.
        let v = UntypedValue::from(1.5f32);
        assert_eq!(v.to_u32(), 0x3FC0_0000);
        let back = UntypedValue::from(0x3FC0_0000u32);
        assert_eq!(back.to_f32(), 1.5f32);
    }

    #[test]
    fn f64_reinterpret_round_trip() {
        let v = UntypedValue::from(1.0f64);
        assert_eq!(v.to_u64(), 0x3FF0_0000_0000_0000);
        let back = UntypedValue::from(0x3FF0_0000_0000_0000u64);
        assert_eq!(back.to_f64(), 1.0f64);
    }

    #[test]
    fn i64_truncates_to_i32_lane() {
        let v = UntypedValue::from(-1i64);
        assert_eq!(v.to_i32(), -1);
    }
}
