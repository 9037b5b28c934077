//! End-to-end tests: parse and translate a `.wat` module, instantiate it, and
//! run its exported `_start` function over the real dispatch loop.

use wasmbox::{Config, ExportDesc, Instance, ModuleLoader, UntypedValue};

fn run_start(wat: &str, args: &[UntypedValue]) -> UntypedValue {
    let bytes = wat::parse_str(wat).expect("valid wat");
    let module = ModuleLoader::load(&bytes).expect("module parses and translates");
    let export = module.export("_start").expect("module exports _start");
    let ExportDesc::Func(func) = export.desc else {
        panic!("_start is not a function export");
    };
    let config = Config::default();
    let mut instance = Instance::new(&module).expect("instantiates");
    let results = wasmbox::eval_function(&module, &mut instance, &config, func, args)
        .expect("runs without trapping");
    results.first().copied().expect("_start returns a value")
}

#[test]
fn factorial_recursion() {
    let wat = r#"
        (module
          (func $start (export "_start") (param $x i32) (result i32)
            (if (result i32) (i32.le_s (local.get $x) (i32.const 1))
              (then (i32.const 1))
              (else
                (i32.mul
                  (call $start (i32.sub (local.get $x) (i32.const 1)))
                  (local.get $x))))))
    "#;
    let result = run_start(wat, &[UntypedValue::from(10i32)]);
    assert_eq!(result.to_i32(), 3628800);
}

#[test]
fn reinterpret_f32_to_i32() {
    let wat = r#"
        (module
          (func (export "_start") (param $x f32) (result i32)
            (i32.reinterpret_f32 (local.get $x))))
    "#;
    let result = run_start(wat, &[UntypedValue::from(1.5f32)]);
    assert_eq!(result.to_i32(), 0x3FC0_0000u32 as i32);
}

#[test]
fn reinterpret_i32_to_f32() {
    let wat = r#"
        (module
          (func (export "_start") (param $x i32) (result f32)
            (f32.reinterpret_i32 (local.get $x))))
    "#;
    let result = run_start(wat, &[UntypedValue::from(0x3F80_0000u32 as i32)]);
    assert_eq!(result.to_f32(), 1.0);
}

#[test]
fn reinterpret_f64_to_i64() {
    let wat = r#"
        (module
          (func (export "_start") (param $x f64) (result i64)
            (i64.reinterpret_f64 (local.get $x))))
    "#;
    let result = run_start(wat, &[UntypedValue::from(1.0f64)]);
    assert_eq!(result.to_i64(), 0x3FF0_0000_0000_0000u64 as i64);
}

#[test]
fn reinterpret_i64_to_f64() {
    let wat = r#"
        (module
          (func (export "_start") (param $x i64) (result f64)
            (f64.reinterpret_i64 (local.get $x))))
    "#;
    let result = run_start(wat, &[UntypedValue::from(0x3FF0_0000_0000_0000u64 as i64)]);
    assert_eq!(result.to_f64(), 1.0);
}

#[test]
fn call_with_multiple_results() {
    let wat = r#"
        (module
          (func $divmod (param $a i32) (param $b i32) (result i32 i32)
            (i32.div_s (local.get $a) (local.get $b))
            (i32.rem_s (local.get $a) (local.get $b)))
          (func (export "_start") (param $a i32) (param $b i32) (result i32)
            (local $q i32)
            (local $r i32)
            (call $divmod (local.get $a) (local.get $b))
            (local.set $r)
            (local.set $q)
            (i32.add (local.get $q) (local.get $r))))
    "#;
    let result = run_start(wat, &[UntypedValue::from(17i32), UntypedValue::from(5i32)]);
    assert_eq!(result.to_i32(), 5);
}

#[test]
fn trapping_function_loads_and_traps_at_runtime() {
    let wat = r#"
        (module
          (func (export "_start") (result i32)
            unreachable))
    "#;
    let bytes = wat::parse_str(wat).expect("valid wat");
    let module = ModuleLoader::load(&bytes).expect("unreachable tail still loads");
    let export = module.export("_start").expect("module exports _start");
    let ExportDesc::Func(func) = export.desc else {
        panic!("_start is not a function export");
    };
    let config = Config::default();
    let mut instance = Instance::new(&module).expect("instantiates");
    let trap = wasmbox::eval_function(&module, &mut instance, &config, func, &[])
        .expect_err("unreachable traps at runtime");
    assert_eq!(trap.code(), wasmbox::TrapCode::UnreachableCodeReached);
}

#[test]
fn call_indirect_dispatches_through_table() {
    let wat = r#"
        (module
          (type $binop (func (param i32 i32) (result i32)))
          (func $add (param i32 i32) (result i32) (i32.add (local.get 0) (local.get 1)))
          (func $mul (param i32 i32) (result i32) (i32.mul (local.get 0) (local.get 1)))
          (table funcref (elem $add $mul))
          (func (export "_start") (param $op i32) (result i32)
            (call_indirect (type $binop) (i32.const 6) (i32.const 7) (local.get $op))))
    "#;
    let add_result = run_start(wat, &[UntypedValue::from(0i32)]);
    assert_eq!(add_result.to_i32(), 13);
    let mul_result = run_start(wat, &[UntypedValue::from(1i32)]);
    assert_eq!(mul_result.to_i32(), 42);
}

#[test]
fn data_segment_initializes_memory() {
    let wat = r#"
        (module
          (memory 1)
          (data (i32.const 0) "\2a\00\00\00")
          (func (export "_start") (result i32)
            (i32.load (i32.const 0))))
    "#;
    let result = run_start(wat, &[]);
    assert_eq!(result.to_i32(), 42);
}

#[test]
fn element_segment_populates_table_for_call_indirect() {
    let wat = r#"
        (module
          (type $thunk (func (result i32)))
          (func $const_five (result i32) (i32.const 5))
          (table funcref (elem $const_five))
          (func (export "_start") (result i32)
            (call_indirect (type $thunk) (i32.const 0))))
    "#;
    let result = run_start(wat, &[]);
    assert_eq!(result.to_i32(), 5);
}

#[test]
fn loop_sum_via_br_if() {
    let wat = r#"
        (module
          (func (export "_start") (param $n i32) (result i32)
            (local $i i32)
            (local $sum i32)
            (local.set $i (i32.const 1))
            (block $exit
              (loop $top
                (br_if $exit (i32.gt_s (local.get $i) (local.get $n)))
                (local.set $sum (i32.add (local.get $sum) (local.get $i)))
                (local.set $i (i32.add (local.get $i) (i32.const 1)))
                (br $top)))
            (local.get $sum)))
    "#;
    let result = run_start(wat, &[UntypedValue::from(100i32)]);
    assert_eq!(result.to_i32(), 5050);
}
