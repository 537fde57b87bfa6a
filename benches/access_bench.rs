// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use vmacmem::core::memory::{
    Access, Backing, MapLayout, MemoryMap, MemorySubsystem, NullHandler, RangeDescriptor,
    TableBuilder,
};

fn mac_plus() -> MemorySubsystem {
    let layout = MapLayout::mac_plus();
    let mut map = MemoryMap::with_banks(layout.build_banks().unwrap());
    let table = layout.build_table(map.banks()).unwrap();
    map.install(table).unwrap();
    MemorySubsystem::new(map, NullHandler)
}

fn cached_access_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached");

    group.bench_function("read_byte", |b| {
        let mut memory = mac_plus();
        memory.read_byte(0x1000);
        b.iter(|| black_box(memory.read_byte(black_box(0x1001))));
    });

    group.bench_function("read_word", |b| {
        let mut memory = mac_plus();
        memory.read_word(0x1000);
        b.iter(|| black_box(memory.read_word(black_box(0x1002))));
    });

    group.bench_function("read_long", |b| {
        let mut memory = mac_plus();
        memory.read_word(0x1000);
        b.iter(|| black_box(memory.read_long(black_box(0x1004))));
    });

    group.bench_function("write_long", |b| {
        let mut memory = mac_plus();
        memory.write_word(0x1000, 0);
        b.iter(|| memory.write_long(black_box(0x1004), black_box(0x4E71_4E71)));
    });

    group.finish();
}

fn slow_path_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("slow_path");

    // Alternating RAM and ROM defeats the single-entry cache every time
    group.bench_function("alternating_ranges", |b| {
        let mut memory = mac_plus();
        b.iter(|| {
            black_box(memory.read_word(black_box(0x0000_1000)));
            black_box(memory.read_word(black_box(0x0040_1000)));
        });
    });

    group.bench_function("odd_word", |b| {
        let mut memory = mac_plus();
        b.iter(|| black_box(memory.read_word(black_box(0x1001))));
    });

    group.bench_function("unmapped", |b| {
        let mut memory = mac_plus();
        b.iter(|| black_box(memory.read_word(black_box(0x0060_0000))));
    });

    group.finish();
}

fn table_depth_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_depth");

    for depth in [1u32, 8, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let mut map = MemoryMap::new();
            let ram = map.add_bank("ram", 0x1_0000);
            let table = (0..depth)
                .fold(TableBuilder::new(), |builder, i| {
                    builder.range(RangeDescriptor::memory(
                        0xFFFF_0000,
                        i << 16,
                        Access::READ_READY,
                        Backing::new(ram, 0, 0xFFFF),
                    ))
                })
                .build()
                .unwrap();
            map.install(table).unwrap();
            let mut memory = MemorySubsystem::new(map, NullHandler);

            // Cycling through every range keeps each lookup deep in the list
            let mut next = 0u32;
            b.iter(|| {
                next = (next + 1) % depth;
                black_box(memory.read_byte(black_box(next << 16)))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    cached_access_benchmark,
    slow_path_benchmark,
    table_depth_benchmark
);
criterion_main!(benches);
