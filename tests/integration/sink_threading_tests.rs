//! Integration tests for per-thread line assembly in `LineBufferedSink`.
//!
//! Validates:
//! - concurrent writers never interleave within a line
//! - a thread's unfinished line is discarded when the thread ends
//! - dropping the last handle flushes the dropping thread's pending line

use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use console_worker::sink::LineBufferedSink;

fn recording(prefix: &str) -> (LineBufferedSink, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink_lines = Arc::clone(&lines);
    let sink = LineBufferedSink::new(Some(prefix.to_owned()), move |line| {
        sink_lines.lock().unwrap().push(line.to_owned());
    });
    (sink, lines)
}

#[test]
fn concurrent_writers_do_not_interleave_lines() {
    const THREADS: usize = 4;
    const LINES: usize = 50;

    let (sink, lines) = recording("T");
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|id| {
            let sink = sink.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for n in 0..LINES {
                    sink.print(&format!("t{id}"));
                    sink.print("-");
                    sink.print_value(i32::try_from(n).unwrap());
                    sink.print("\n");
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let lines = lines.lock().unwrap().clone();
    assert_eq!(lines.len(), THREADS * LINES);
    for id in 0..THREADS {
        let own: Vec<&String> = lines
            .iter()
            .filter(|line| line.starts_with(&format!("T: t{id}-")))
            .collect();
        assert_eq!(own.len(), LINES);
        for (n, line) in own.iter().enumerate() {
            assert_eq!(**line, format!("T: t{id}-{n}"));
        }
    }
}

#[test]
fn unfinished_line_is_discarded_when_thread_ends() {
    let (sink, lines) = recording("T");

    let writer = sink.clone();
    thread::spawn(move || {
        writer.print("never finished");
        // `writer` is not the last handle, so nothing flushes here.
    })
    .join()
    .unwrap();

    sink.flush();
    assert!(lines.lock().unwrap().is_empty());
}

#[test]
fn each_thread_sees_only_its_own_pending_line() {
    let (sink, lines) = recording("T");
    sink.print("main ");

    let other = sink.clone();
    thread::spawn(move || {
        assert_eq!(other.pending_len(), 0);
        other.println("worker");
    })
    .join()
    .unwrap();

    sink.println("done");
    assert_eq!(*lines.lock().unwrap(), vec!["T: worker", "T: main done"]);
}

#[test]
fn dropping_last_handle_flushes_pending_line() {
    let (sink, lines) = recording("T");
    sink.print("tail");

    drop(sink);

    assert_eq!(*lines.lock().unwrap(), vec!["T: tail"]);
}

#[test]
fn last_handle_dropped_on_another_thread_flushes_that_thread() {
    let (sink, lines) = recording("T");
    sink.print("main pending");

    thread::spawn(move || {
        sink.print("worker pending");
        drop(sink);
    })
    .join()
    .unwrap();

    assert_eq!(*lines.lock().unwrap(), vec!["T: worker pending"]);
}
