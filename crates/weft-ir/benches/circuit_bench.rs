//! Benchmarks for Weft circuit operations
//!
//! Run with: cargo bench -p weft-ir

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use weft_ir::{Circuit, Expr, UnitKind};

fn sized(n_qubits: u32, n_bits: u32) -> Circuit {
    let mut circuit = Circuit::new();
    circuit.add_register("q", n_qubits, UnitKind::Qubit).unwrap();
    circuit.add_register("c", n_bits, UnitKind::Bit).unwrap();
    circuit
}

/// Benchmark circuit creation
fn bench_circuit_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("circuit_creation");

    for num_qubits in &[2u32, 5, 10, 20, 50] {
        group.bench_with_input(
            BenchmarkId::new("with_registers", num_qubits),
            num_qubits,
            |b, &n| {
                b.iter(|| sized(black_box(n), black_box(n)));
            },
        );
    }

    group.finish();
}

/// Benchmark adding gates to a circuit
fn bench_gate_addition(c: &mut Criterion) {
    let mut group = c.benchmark_group("gate_addition");

    group.bench_function("h_gate", |b| {
        let mut circuit = sized(10, 0);
        b.iter(|| {
            circuit.h(black_box(0)).unwrap();
        });
    });

    group.bench_function("rz_gate", |b| {
        let mut circuit = sized(10, 0);
        b.iter(|| {
            circuit.rz(black_box(0.25), black_box(0)).unwrap();
        });
    });

    group.bench_function("rz_symbolic", |b| {
        let mut circuit = sized(10, 0);
        b.iter(|| {
            circuit.rz(Expr::symbol("theta"), black_box(0)).unwrap();
        });
    });

    group.bench_function("cx_gate", |b| {
        let mut circuit = sized(10, 0);
        b.iter(|| {
            circuit.cx(black_box(0), black_box(1)).unwrap();
        });
    });

    group.finish();
}

/// Benchmark GHZ state circuit creation
fn bench_ghz_circuit(c: &mut Criterion) {
    let mut group = c.benchmark_group("ghz_circuit");

    for num_qubits in &[3u32, 5, 10, 20, 50, 100] {
        group.bench_with_input(
            BenchmarkId::new("create", num_qubits),
            num_qubits,
            |b, &n| {
                b.iter(|| {
                    let mut circuit = sized(n, n);
                    circuit.h(0).unwrap();
                    for i in 0..n - 1 {
                        circuit.cx(i, i + 1).unwrap();
                    }
                    for i in 0..n {
                        circuit.measure(i, i).unwrap();
                    }
                    black_box(circuit)
                });
            },
        );
    }

    group.finish();
}

/// Benchmark command iteration in stable topological order
fn bench_command_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("command_iteration");

    for num_qubits in &[5u32, 10, 20, 50] {
        let mut circuit = sized(*num_qubits, 0);
        for _layer in 0..5 {
            for i in 0..*num_qubits {
                circuit.h(i).unwrap();
            }
            for i in (0..*num_qubits - 1).step_by(2) {
                circuit.cx(i, i + 1).unwrap();
            }
        }

        group.bench_with_input(
            BenchmarkId::new("commands", num_qubits),
            &circuit,
            |b, circuit| {
                b.iter(|| black_box(circuit.commands().count()));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_circuit_creation,
    bench_gate_addition,
    bench_ghz_circuit,
    bench_command_iteration,
);

criterion_main!(benches);
