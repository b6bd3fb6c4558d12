//! Benchmarks for makemkvcon robot output parsing
//!
//! Covers the disc info scan (a few hundred lines per title on real
//! Blu-rays) and the progress stream, which is parsed line by line for the
//! whole length of a rip.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ripvault_mkv::robot::{parse_line, split_fields};
use ripvault_mkv::{parse_disc_info, ProgressTracker};

/// Robot output for a disc with `titles` titles of `streams` streams each.
fn disc_output(titles: u32, streams: u32) -> String {
    let mut out = String::new();
    out.push_str("MSG:1005,0,1,\"MakeMKV v1.17.5 linux(x64-release) started\",\"%1 started\",\"MakeMKV v1.17.5 linux(x64-release)\"\n");
    out.push_str("CINFO:1,6209,\"Blu-ray disc\"\n");
    out.push_str("CINFO:2,0,\"Movie Title, The\"\n");
    out.push_str("CINFO:32,0,\"MOVIE_DISC\"\n");
    out.push_str(&format!("TCOUT:{}\n", titles));
    for t in 0..titles {
        out.push_str(&format!("TINFO:{t},2,0,\"Movie Title, The\"\n"));
        out.push_str(&format!("TINFO:{t},8,0,\"{}\"\n", 10 + t % 30));
        out.push_str(&format!("TINFO:{t},9,0,\"{}:{:02}:17\"\n", t % 3, t % 60));
        out.push_str(&format!("TINFO:{t},10,0,\"{}.4 GB\"\n", 1 + t % 40));
        out.push_str(&format!("TINFO:{t},16,0,\"{:05}.mpls\"\n", 800 + t));
        out.push_str(&format!("TINFO:{t},27,0,\"Movie_Title_t{:02}.mkv\"\n", t));
        for s in 0..streams {
            let (kind, code) = match s {
                0 => ("Video", 6201),
                s if s % 3 == 0 => ("Subtitles", 6203),
                _ => ("Audio", 6202),
            };
            out.push_str(&format!("SINFO:{t},{s},1,{code},\"{kind}\"\n"));
            out.push_str(&format!("SINFO:{t},{s},6,0,\"DTS-HD MA\"\n"));
            out.push_str(&format!("SINFO:{t},{s},3,0,\"eng\"\n"));
            if s == 0 {
                out.push_str(&format!("SINFO:{t},{s},19,0,\"1920x1080\"\n"));
            }
        }
    }
    out
}

/// Progress stream as emitted during a rip.
fn progress_output(updates: u32) -> Vec<String> {
    let mut lines = vec![
        "PRGT:5018,0,\"Saving to MKV file\"".to_string(),
        "PRGC:5017,0,\"Saving to MKV file\"".to_string(),
    ];
    for i in 0..updates {
        lines.push(format!("PRGV:{},{},65536", i % 65536, i * 65536 / updates));
        if i % 500 == 0 {
            lines.push(format!("MSG:3307,0,2,\"File #{} was added\",\"File #%1 was added\",\"{}\"", i, i));
        }
    }
    lines
}

fn bench_split_fields(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_fields");

    group.bench_function("plain", |b| {
        b.iter(|| split_fields(black_box(r#"0,0,19,0,"1920x1080""#)))
    });

    group.bench_function("quoted_commas_and_escapes", |b| {
        b.iter(|| {
            split_fields(black_box(
                r#"1005,0,1,"Title \"A, B, C\", extended","%1 started","Title, again""#,
            ))
        })
    });

    group.finish();
}

fn bench_parse_line(c: &mut Criterion) {
    let lines = [
        ("cinfo", r#"CINFO:2,0,"Movie Title, The""#),
        ("tinfo", r#"TINFO:0,9,0,"2:01:33""#),
        ("sinfo", r#"SINFO:0,0,19,0,"1920x1080""#),
        ("prgv", "PRGV:1024,32768,65536"),
        ("unknown", "DRV:0,2,999,1,\"BD-RE HL-DT-ST\",\"MOVIE_DISC\",\"/dev/sr0\""),
    ];

    let mut group = c.benchmark_group("parse_line");
    for (name, line) in lines {
        group.bench_with_input(BenchmarkId::from_parameter(name), &line, |b, line| {
            b.iter(|| parse_line(black_box(line)))
        });
    }
    group.finish();
}

fn bench_parse_disc_info(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_disc_info");

    for (titles, streams) in [(2, 4), (20, 12), (120, 24)] {
        let output = disc_output(titles, streams);
        group.throughput(Throughput::Bytes(output.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("titles", format!("{titles}x{streams}")),
            &output,
            |b, output| b.iter(|| parse_disc_info(black_box(output)).unwrap()),
        );
    }

    group.finish();
}

fn bench_progress_tracker(c: &mut Criterion) {
    let mut group = c.benchmark_group("progress_tracker");

    for updates in [1_000u32, 10_000] {
        let lines = progress_output(updates);
        group.throughput(Throughput::Elements(lines.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(updates), &lines, |b, lines| {
            b.iter(|| {
                let mut tracker = ProgressTracker::new();
                let mut last = None;
                for line in lines {
                    if let Some(progress) = tracker.feed(black_box(line)) {
                        last = Some(progress);
                    }
                }
                last
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_split_fields,
    bench_parse_line,
    bench_parse_disc_info,
    bench_progress_tracker,
);
criterion_main!(benches);
