use wasmbox_collections::ArenaIndex;

macro_rules! index_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            pub const fn to_u32(self) -> u32 {
                self.0
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl ArenaIndex for $name {
            fn into_usize(self) -> usize {
                self.0 as usize
            }

            fn from_usize(value: usize) -> Self {
                Self(value as u32)
            }
        }
    };
}

index_type!(
    /// Indexes a type signature in a module's type section.
    TypeIdx
);
index_type!(
    /// Indexes a function, whether defined locally or imported.
    FuncIdx
);
index_type!(
    /// Indexes a table, whether defined locally or imported.
    TableIdx
);
index_type!(
    /// Indexes the (at most one, per the MVP) linear memory.
    MemIdx
);
index_type!(
    /// Indexes a global, whether defined locally or imported.
    GlobalIdx
);
index_type!(
    /// Indexes an entry in the element section.
    ElemIdx
);
index_type!(
    /// Indexes an entry in the data section.
    DataIdx
);
index_type!(
    /// Indexes a local variable (including parameters) within a function body.
    LocalIdx
);
index_type!(
    /// An absolute offset into a function's frozen instruction stream.
    ///
    /// Branch targets are resolved to this form only after the translator's
    /// freeze step has flattened basic blocks into one flat array; during
    /// translation, targets are tracked relative to the block structure
    /// instead (see the translator's block-id bookkeeping).
    InstrIdx
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_arena_index() {
        let idx = FuncIdx::new(7);
        assert_eq!(FuncIdx::from_usize(idx.into_usize()), idx);
    }
}
