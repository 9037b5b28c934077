//! Binary-format section parsing.
//!
//! Walks a Wasm binary's sections in order, accumulating a [`Module`].
//! Function bodies are handed to [`translator`](super::translator) as soon
//! as the code section is reached, since by then every type, import, and
//! function signature the translator might need to resolve is already known.

use alloc::{boxed::Box, string::String, vec::Vec};

use wasmbox_collections::Arena;
use wasmbox_core::{FuncType, ValueType};
use wasmbox_ir::{FuncIdx, GlobalIdx, MemIdx, TableIdx, TypeIdx};

use super::{
    init_expr::ConstExpr,
    translator,
    DataSegment,
    ElementSegment,
    Export,
    ExportDesc,
    Function,
    Global,
    GlobalType,
    Import,
    ImportDesc,
    Limits,
    LocalFunction,
    MemoryType,
    Module,
    TableType,
};
use crate::error::ModuleError;
use crate::leb128::{read_i32, read_i64, read_u32};
use crate::stream::InputStream;

const WASM_MAGIC: [u8; 4] = *b"\0asm";
const WASM_VERSION: [u8; 4] = [1, 0, 0, 0];

pub fn parse_module(stream: &mut InputStream<'_>) -> Result<Module, ModuleError> {
    let magic = stream.read_bytes(4)?;
    let version = stream.read_bytes(4)?;
    if magic != WASM_MAGIC || version != WASM_VERSION {
        return Err(ModuleError::InvalidHeader);
    }

    let mut builder = ModuleBuilder::default();
    let mut last_section_id: Option<u8> = None;
    while !stream.is_empty() {
        let id = stream.read_u8()?;
        let size = read_u32(stream)? as usize;
        let mut section = stream.sub_stream(size)?;
        if id != 0 {
            // Custom sections (id 0) may appear anywhere, including between
            // or after any other section; every other id must strictly increase.
            if let Some(last) = last_section_id {
                if id <= last {
                    return Err(ModuleError::SectionOutOfOrder);
                }
            }
            last_section_id = Some(id);
        }
        match id {
            0 => { /* custom section: ignored */ }
            1 => parse_type_section(&mut section, &mut builder)?,
            2 => parse_import_section(&mut section, &mut builder)?,
            3 => parse_function_section(&mut section, &mut builder)?,
            4 => parse_table_section(&mut section, &mut builder)?,
            5 => parse_memory_section(&mut section, &mut builder)?,
            6 => parse_global_section(&mut section, &mut builder)?,
            7 => parse_export_section(&mut section, &mut builder)?,
            8 => parse_start_section(&mut section, &mut builder)?,
            9 => parse_element_section(&mut section, &mut builder)?,
            10 => parse_code_section(&mut section, &mut builder)?,
            11 => parse_data_section(&mut section, &mut builder)?,
            12 => { /* data count section: used only to preflight-validate the data section, safe to skip */ }
            other => return Err(ModuleError::InvalidSectionId(other)),
        }
    }

    builder.finish()
}

#[derive(Default)]
struct ModuleBuilder {
    types: Vec<FuncType>,
    imports: Vec<Import>,
    /// Type indices for locally defined functions (section 3), in declaration order.
    func_type_indices: Vec<TypeIdx>,
    /// Raw `(locals, code bytes)` for each locally defined function, filled by the code section.
    func_bodies: Vec<(Vec<ValueType>, Box<[u8]>)>,
    tables: Vec<TableType>,
    memories: Vec<MemoryType>,
    globals: Vec<Global>,
    exports: Vec<Export>,
    start: Option<FuncIdx>,
    elements: Vec<ElementSegment>,
    data: Vec<DataSegment>,
}

impl ModuleBuilder {
    fn finish(self) -> Result<Module, ModuleError> {
        let types: Arena<TypeIdx, FuncType> = self.types.into_iter().collect();

        let mut funcs: Arena<FuncIdx, Function> = Arena::new();
        for import in &self.imports {
            if let ImportDesc::Func(type_idx) = import.desc {
                funcs.alloc(Function::Imported {
                    type_idx,
                    module: import.module.clone(),
                    name: import.name.clone(),
                });
            }
        }
        if self.func_type_indices.len() != self.func_bodies.len() {
            return Err(ModuleError::InvalidControlFlow {
                message: "function and code section entry counts differ".into(),
            });
        }

        // Every function's signature, in `FuncIdx` order (imports first, then
        // locals), so the translator can resolve `call`'s callee arity
        // without needing the not-yet-built `funcs` arena.
        let mut func_types: Vec<TypeIdx> = self
            .imports
            .iter()
            .filter_map(|i| match i.desc {
                ImportDesc::Func(type_idx) => Some(type_idx),
                _ => None,
            })
            .collect();
        func_types.extend(self.func_type_indices.iter().copied());

        for (type_idx, (locals, code)) in self
            .func_type_indices
            .into_iter()
            .zip(self.func_bodies.into_iter())
        {
            let ty = types.get(type_idx).ok_or(ModuleError::IndexOutOfBounds {
                what: "type",
                index: type_idx.to_u32(),
            })?;
            let translated = translator::translate_function(ty, &locals, &code, &types, &func_types)?;
            funcs.alloc(Function::Local(LocalFunction {
                type_idx,
                locals: locals.into_boxed_slice(),
                code: translated.code,
                frame_size: translated.frame_size,
            }));
        }

        let mut tables: Arena<TableIdx, TableType> = Arena::new();
        for import in &self.imports {
            if let ImportDesc::Table(t) = import.desc {
                tables.alloc(t);
            }
        }
        for t in self.tables {
            tables.alloc(t);
        }

        let mut memories: Arena<MemIdx, MemoryType> = Arena::new();
        for import in &self.imports {
            if let ImportDesc::Memory(m) = import.desc {
                memories.alloc(m);
            }
        }
        for m in self.memories {
            memories.alloc(m);
        }

        let mut globals: Arena<GlobalIdx, Global> = Arena::new();
        for import in &self.imports {
            if let ImportDesc::Global(g) = import.desc {
                globals.alloc(Global {
                    global_type: g,
                    init: ConstExpr::Value(wasmbox_core::UntypedValue::ZERO),
                });
            }
        }
        for g in self.globals {
            globals.alloc(g);
        }

        Ok(Module {
            types,
            funcs,
            tables,
            memories,
            globals,
            exports: self.exports,
            start: self.start,
            elements: self.elements,
            data: self.data,
        })
    }
}

fn read_name(stream: &mut InputStream<'_>) -> Result<Box<str>, ModuleError> {
    let len = read_u32(stream)? as usize;
    let bytes = stream.read_bytes(len)?;
    let s = String::from_utf8(bytes.to_vec())
        .map_err(|_| ModuleError::InvalidControlFlow { message: "invalid UTF-8 name".into() })?;
    Ok(s.into_boxed_str())
}

fn read_value_type(stream: &mut InputStream<'_>) -> Result<ValueType, ModuleError> {
    let byte = stream.read_u8()?;
    Ok(match byte {
        0x7F => ValueType::I32,
        0x7E => ValueType::I64,
        0x7D => ValueType::F32,
        0x7C => ValueType::F64,
        0x70 => ValueType::FuncRef,
        0x6F => ValueType::ExternRef,
        other => return Err(ModuleError::UnsupportedOpcode(other)),
    })
}

fn read_limits(stream: &mut InputStream<'_>) -> Result<Limits, ModuleError> {
    let flag = stream.read_u8()?;
    let min = read_u32(stream)?;
    let max = if flag == 0x01 { Some(read_u32(stream)?) } else { None };
    Ok(Limits { min, max })
}

fn read_table_type(stream: &mut InputStream<'_>) -> Result<TableType, ModuleError> {
    let element = read_value_type(stream)?;
    let limits = read_limits(stream)?;
    Ok(TableType { element, limits })
}

fn read_global_type(stream: &mut InputStream<'_>) -> Result<GlobalType, ModuleError> {
    let value_type = read_value_type(stream)?;
    let mutable = match stream.read_u8()? {
        0x00 => false,
        0x01 => true,
        other => return Err(ModuleError::UnsupportedOpcode(other)),
    };
    Ok(GlobalType { value_type, mutable })
}

fn read_func_type(stream: &mut InputStream<'_>) -> Result<FuncType, ModuleError> {
    let tag = stream.read_u8()?;
    if tag != 0x60 {
        return Err(ModuleError::UnsupportedOpcode(tag));
    }
    let num_params = read_u32(stream)? as usize;
    let mut params = Vec::with_capacity(num_params);
    for _ in 0..num_params {
        params.push(read_value_type(stream)?);
    }
    let num_results = read_u32(stream)? as usize;
    let mut results = Vec::with_capacity(num_results);
    for _ in 0..num_results {
        results.push(read_value_type(stream)?);
    }
    Ok(FuncType::new(params, results))
}

/// Reads a constant expression: a short sequence of `const`/`global.get`/
/// `ref.func` instructions terminated by `end` (0x0B). This is the MVP's
/// restricted grammar for global initializers and segment offsets.
fn read_const_expr(stream: &mut InputStream<'_>) -> Result<ConstExpr, ModuleError> {
    let opcode = stream.read_u8()?;
    let expr = match opcode {
        0x41 => ConstExpr::Value(wasmbox_core::UntypedValue::from(read_i32(stream)?)),
        0x42 => ConstExpr::Value(wasmbox_core::UntypedValue::from(read_i64(stream)?)),
        0x43 => ConstExpr::Value(wasmbox_core::UntypedValue::from(stream.read_f32()?)),
        0x44 => ConstExpr::Value(wasmbox_core::UntypedValue::from(stream.read_f64()?)),
        0x23 => ConstExpr::GlobalGet(GlobalIdx::from(read_u32(stream)?)),
        0xD2 => ConstExpr::RefFunc(FuncIdx::from(read_u32(stream)?)),
        0xD0 => {
            // ref.null: only meaningful for table/element init; represented
            // as a zero value (an interpreter-level null funcref/externref).
            let _heap_type = stream.read_u8()?;
            ConstExpr::Value(wasmbox_core::UntypedValue::ZERO)
        }
        other => return Err(ModuleError::UnsupportedOpcode(other)),
    };
    let end = stream.read_u8()?;
    if end != 0x0B {
        return Err(ModuleError::InvalidControlFlow {
            message: "constant expression missing terminating `end`".into(),
        });
    }
    Ok(expr)
}

fn parse_type_section(stream: &mut InputStream<'_>, builder: &mut ModuleBuilder) -> Result<(), ModuleError> {
    let count = read_u32(stream)?;
    for _ in 0..count {
        builder.types.push(read_func_type(stream)?);
    }
    Ok(())
}

fn parse_import_section(stream: &mut InputStream<'_>, builder: &mut ModuleBuilder) -> Result<(), ModuleError> {
    let count = read_u32(stream)?;
    for _ in 0..count {
        let module = read_name(stream)?;
        let name = read_name(stream)?;
        let kind = stream.read_u8()?;
        let desc = match kind {
            0x00 => ImportDesc::Func(TypeIdx::from(read_u32(stream)?)),
            0x01 => ImportDesc::Table(read_table_type(stream)?),
            0x02 => ImportDesc::Memory(MemoryType { limits: read_limits(stream)? }),
            0x03 => ImportDesc::Global(read_global_type(stream)?),
            other => return Err(ModuleError::UnsupportedOpcode(other)),
        };
        builder.imports.push(Import { module, name, desc });
    }
    Ok(())
}

fn parse_function_section(stream: &mut InputStream<'_>, builder: &mut ModuleBuilder) -> Result<(), ModuleError> {
    let count = read_u32(stream)?;
    for _ in 0..count {
        builder.func_type_indices.push(TypeIdx::from(read_u32(stream)?));
    }
    Ok(())
}

fn parse_table_section(stream: &mut InputStream<'_>, builder: &mut ModuleBuilder) -> Result<(), ModuleError> {
    let count = read_u32(stream)?;
    for _ in 0..count {
        builder.tables.push(read_table_type(stream)?);
    }
    Ok(())
}

fn parse_memory_section(stream: &mut InputStream<'_>, builder: &mut ModuleBuilder) -> Result<(), ModuleError> {
    let count = read_u32(stream)?;
    for _ in 0..count {
        builder.memories.push(MemoryType { limits: read_limits(stream)? });
    }
    Ok(())
}

fn parse_global_section(stream: &mut InputStream<'_>, builder: &mut ModuleBuilder) -> Result<(), ModuleError> {
    let count = read_u32(stream)?;
    for _ in 0..count {
        let global_type = read_global_type(stream)?;
        let init = read_const_expr(stream)?;
        builder.globals.push(Global { global_type, init });
    }
    Ok(())
}

fn parse_export_section(stream: &mut InputStream<'_>, builder: &mut ModuleBuilder) -> Result<(), ModuleError> {
    let count = read_u32(stream)?;
    for _ in 0..count {
        let name = read_name(stream)?;
        let kind = stream.read_u8()?;
        let index = read_u32(stream)?;
        let desc = match kind {
            0x00 => ExportDesc::Func(FuncIdx::from(index)),
            0x01 => ExportDesc::Table(TableIdx::from(index)),
            0x02 => ExportDesc::Memory(MemIdx::from(index)),
            0x03 => ExportDesc::Global(GlobalIdx::from(index)),
            other => return Err(ModuleError::UnsupportedOpcode(other)),
        };
        builder.exports.push(Export { name, desc });
    }
    Ok(())
}

fn parse_start_section(stream: &mut InputStream<'_>, builder: &mut ModuleBuilder) -> Result<(), ModuleError> {
    builder.start = Some(FuncIdx::from(read_u32(stream)?));
    Ok(())
}

/// Every funcref-table element segment (flags 0-3) carries a byte after its
/// active offset (or in place of one, for passive/declarative segments)
/// declaring the element kind; `0x00` is the only one defined (`funcref`).
fn expect_funcref_elemkind(stream: &mut InputStream<'_>) -> Result<(), ModuleError> {
    let elemkind = stream.read_u8()?;
    if elemkind != 0x00 {
        return Err(ModuleError::UnsupportedOpcode(elemkind));
    }
    Ok(())
}

fn parse_element_section(stream: &mut InputStream<'_>, builder: &mut ModuleBuilder) -> Result<(), ModuleError> {
    let count = read_u32(stream)?;
    for _ in 0..count {
        let flag = read_u32(stream)?;
        let (table, offset) = match flag {
            // Active, implicit table 0.
            0 => (TableIdx::from(0), Some(read_const_expr(stream)?)),
            // Passive: no table, never applied at instantiation.
            1 => {
                expect_funcref_elemkind(stream)?;
                (TableIdx::from(0), None)
            }
            // Active, explicit table index.
            2 => {
                let table = TableIdx::from(read_u32(stream)?);
                let offset = read_const_expr(stream)?;
                expect_funcref_elemkind(stream)?;
                (table, Some(offset))
            }
            // Declarative: like passive, but never even reachable via `table.init`.
            3 => {
                expect_funcref_elemkind(stream)?;
                (TableIdx::from(0), None)
            }
            // Element expressions (flags 4-7) are a reftype extension this
            // interpreter's funcref-only tables don't need.
            other => return Err(ModuleError::UnsupportedOpcode(other as u8)),
        };
        let num_funcs = read_u32(stream)?;
        let mut func_indices = Vec::with_capacity(num_funcs as usize);
        for _ in 0..num_funcs {
            func_indices.push(FuncIdx::from(read_u32(stream)?));
        }
        builder.elements.push(ElementSegment { table, offset, func_indices: func_indices.into_boxed_slice() });
    }
    Ok(())
}

fn parse_code_section(stream: &mut InputStream<'_>, builder: &mut ModuleBuilder) -> Result<(), ModuleError> {
    let count = read_u32(stream)?;
    for _ in 0..count {
        let body_size = read_u32(stream)? as usize;
        let mut body = stream.sub_stream(body_size)?;

        let num_local_decls = read_u32(&mut body)?;
        let mut locals = Vec::new();
        for _ in 0..num_local_decls {
            let run_length = read_u32(&mut body)?;
            let ty = read_value_type(&mut body)?;
            for _ in 0..run_length {
                locals.push(ty);
            }
        }
        let code = body.read_bytes(body.remaining())?;
        builder.func_bodies.push((locals, code.to_vec().into_boxed_slice()));
    }
    Ok(())
}

fn parse_data_section(stream: &mut InputStream<'_>, builder: &mut ModuleBuilder) -> Result<(), ModuleError> {
    let count = read_u32(stream)?;
    for _ in 0..count {
        let flag = read_u32(stream)?;
        let (mem, offset) = match flag {
            // Active, implicit memory 0.
            0 => (MemIdx::from(0), Some(read_const_expr(stream)?)),
            // Passive: no memory, never applied at instantiation.
            1 => (MemIdx::from(0), None),
            // Active, explicit memory index.
            2 => {
                let mem = MemIdx::from(read_u32(stream)?);
                let offset = read_const_expr(stream)?;
                (mem, Some(offset))
            }
            other => return Err(ModuleError::UnsupportedOpcode(other as u8)),
        };
        let len = read_u32(stream)? as usize;
        let bytes = stream.read_bytes(len)?;
        builder.data.push(DataSegment { mem, offset, bytes: bytes.to_vec().into_boxed_slice() });
    }
    Ok(())
}
