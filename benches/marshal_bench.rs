//! Benchmarks for argument marshaling and native dispatch

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use dllcall::ffi::CallFrame;
use dllcall::{Argument, CallPrimitive, Module, NativeCall, Word, MAX_ARGS};

extern "C" fn add2(a: i32, b: i32) -> i32 {
    a.wrapping_add(b)
}

/// Benchmark frame building for varying argument counts
fn bench_frame_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_build");

    for &count in &[1, 4, 8, MAX_ARGS] {
        let args: Vec<Argument<'_>> = (0..count).map(|i| Argument::I32(i as i32 - 4)).collect();
        group.throughput(Throughput::Elements(count as u64));

        group.bench_function(format!("{}_ints", count), |b| {
            b.iter(|| {
                let frame = CallFrame::build(black_box(&args));
                black_box(frame)
            })
        });
    }

    group.finish();
}

/// Benchmark argument kinds that allocate temporaries
fn bench_scratch_args(c: &mut Criterion) {
    let mut group = c.benchmark_group("scratch_args");
    let text = "the quick brown fox jumps over the lazy dog";

    group.bench_function("text", |b| {
        b.iter(|| black_box(CallFrame::build(&[Argument::Text(black_box(text))])))
    });
    group.bench_function("text_ptr", |b| {
        b.iter(|| black_box(CallFrame::build(&[Argument::TextPtr(black_box(text))])))
    });
    group.bench_function("bool", |b| {
        b.iter(|| black_box(CallFrame::build(&[Argument::Bool(black_box(true))])))
    });

    group.finish();
}

/// Benchmark the raw call primitive against an in-process function
fn bench_native_call(c: &mut Criterion) {
    let addr = add2 as usize as Word;
    let mut words = [0 as Word; MAX_ARGS];
    words[0] = 2;
    words[1] = 3;

    c.bench_function("native_call_add2", |b| {
        b.iter(|| {
            let result = unsafe { NativeCall.invoke(addr, 2, black_box(&words)) };
            black_box(result)
        })
    });
}

/// Benchmark a full by-name call when the native fixture is available
fn bench_module_call(c: &mut Criterion) {
    let Some(path) = option_env!("DLLCALL_TEST_FIXTURE") else {
        return;
    };
    let module = match Module::open(path) {
        Ok(module) => module,
        Err(_) => return,
    };
    if module.resolve(["add2"]).is_err() {
        return;
    }

    c.bench_function("module_call_add2", |b| {
        b.iter(|| {
            let args = [Argument::I32(black_box(2)), Argument::I32(3)];
            let result = unsafe { module.call("add2", &args) };
            black_box(result)
        })
    });
}

criterion_group!(
    benches,
    bench_frame_build,
    bench_scratch_args,
    bench_native_call,
    bench_module_call,
);
criterion_main!(benches);
