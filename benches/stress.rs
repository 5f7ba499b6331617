use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tokio_postgres::Config;
use ulid::Ulid;

use roombook::backend::{Backend, RemoteStore};
use roombook::engine::{expand, infer_series, plan_create, plan_edit, Cadence, DailySlot, ReservationFields};
use roombook::model::*;
use roombook::time::{self, TimeOfDay};

const HOUR: i64 = 3_600_000;

fn config(host: &str, port: u16) -> Config {
    let password = std::env::var("ROOMBOOK_PASSWORD").unwrap_or_else(|_| "roombook".into());
    let mut config = Config::new();
    config
        .host(host)
        .port(port)
        .dbname("roombook")
        .user("bench")
        .password(password);
    config
}

async fn connect(host: &str, port: u16) -> RemoteStore {
    RemoteStore::connect(&config(host, port))
        .await
        .expect("connect failed")
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        println!("  {label}: no samples");
        return;
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().map_or(0.0, |d| d.as_secs_f64() * 1000.0),
    );
}

/// 2030-01-07 (a Monday) 00:00 +09:00; far enough ahead of any real data.
fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 7).expect("valid date")
}

fn base() -> Ms {
    time::at(base_date(), TimeOfDay::MIDNIGHT)
}

async fn new_room(store: &RemoteStore, label: &str) -> Room {
    store
        .insert_room(NewRoom {
            name: format!("bench {label} {}", Ulid::new()),
            capacity: Some(10),
            is_active: true,
            display_order: 0,
        })
        .await
        .expect("insert room failed")
}

/// One-hour reservation starting `i` hours after `base()`.
fn hourly(room_id: RoomId, i: i64) -> NewReservation {
    NewReservation {
        room_id,
        title: format!("bench {i}"),
        reserver_name: "bench".into(),
        reserver_team: "perf".into(),
        start: base() + i * HOUR,
        end: base() + (i + 1) * HOUR,
        created_by: Some("bench".into()),
    }
}

async fn phase1_sequential(host: &str, port: u16) {
    let store = connect(host, port).await;
    let room = new_room(&store, "sequential").await;

    let n = 2000;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();

    for i in 0..n {
        let t = Instant::now();
        store
            .insert_reservations(vec![hourly(room.id, i as i64)])
            .await
            .expect("insert failed");
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} reservations in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("write latency", &mut latencies);
}

async fn phase2_concurrent(host: &str, port: u16) {
    let n_tasks = 10;
    let n_per_task = 200;

    let start = Instant::now();
    let mut handles = Vec::new();

    for task in 0..n_tasks {
        let host = host.to_string();
        handles.push(tokio::spawn(async move {
            let store = connect(&host, port).await;
            let room = new_room(&store, &format!("concurrent {task}")).await;
            for j in 0..n_per_task {
                store
                    .insert_reservations(vec![hourly(room.id, j)])
                    .await
                    .expect("insert failed");
            }
        }));
    }

    for h in handles {
        h.await.expect("task panicked");
    }

    let elapsed = start.elapsed();
    let total = n_tasks * n_per_task as usize;
    let ops = total as f64 / elapsed.as_secs_f64();
    println!(
        "  {n_tasks} tasks x {n_per_task} reservations = {total} total in {:.2}s = {ops:.0} ops/sec",
        elapsed.as_secs_f64()
    );
}

async fn phase3_read_under_load(host: &str, port: u16) {
    let stop = Arc::new(AtomicBool::new(false));
    let mut writer_handles = Vec::new();
    for _ in 0..5 {
        let host = host.to_string();
        let stop = stop.clone();
        writer_handles.push(tokio::spawn(async move {
            let store = connect(&host, port).await;
            let room = new_room(&store, "writer").await;
            let mut i = 0i64;
            while !stop.load(Ordering::Relaxed) {
                let _ = store.insert_reservations(vec![hourly(room.id, i)]).await;
                i += 1;
            }
        }));
    }

    let n_readers = 10;
    let reads_per_reader = 200;
    let mut reader_handles = Vec::new();
    for _ in 0..n_readers {
        let host = host.to_string();
        reader_handles.push(tokio::spawn(async move {
            let store = connect(&host, port).await;
            let mut latencies = Vec::with_capacity(reads_per_reader);
            for _ in 0..reads_per_reader {
                let t = Instant::now();
                store.reservations().await.expect("select failed");
                latencies.push(t.elapsed());
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for h in reader_handles {
        all_latencies.extend(h.await.expect("reader panicked"));
    }

    stop.store(true, Ordering::Relaxed);
    for h in writer_handles {
        let _ = h.await;
    }

    print_latency("reservation list", &mut all_latencies);
}

/// Book a daily series, then move it repeatedly with plan + atomic replace,
/// the way the desk edits a series.
async fn phase4_series_edits(host: &str, port: u16) {
    let store = connect(host, port).await;
    let room = new_room(&store, "series").await;
    let fields = ReservationFields {
        title: "bench standup".into(),
        reserver_name: "bench".into(),
        reserver_team: "perf".into(),
        created_by: Some("bench".into()),
    };
    let first = base_date();
    let last = time::add_days(first, 27).expect("valid date");
    let dates = expand(first, last, Cadence::Daily).expect("expand failed");

    let slot_at = |minute: u16| DailySlot {
        room_id: room.id,
        start: TimeOfDay::from_minutes(minute).expect("valid minute"),
        end: TimeOfDay::from_minutes(minute + 30).expect("valid minute"),
    };

    let existing = store.reservations().await.expect("select failed");
    let batch = plan_create(&slot_at(9 * 60), &dates, &fields, &existing).expect("plan failed");
    store.insert_reservations(batch).await.expect("insert failed");

    let n = 200;
    let mut latencies = Vec::with_capacity(n);
    for i in 0..n {
        let t = Instant::now();
        let existing = store.reservations().await.expect("select failed");
        let Some(target) = existing.iter().find(|r| r.room_id == room.id) else {
            break;
        };
        let series = infer_series(target, &existing);
        let slot = slot_at(9 * 60 + (i as u16 % 2) * 60);
        let plan = plan_edit(&series, &slot, &dates, &fields, &existing).expect("plan failed");
        store
            .replace_reservations(&plan.to_delete, plan.to_create)
            .await
            .expect("replace failed");
        latencies.push(t.elapsed());
    }
    print_latency("series edit (read + plan + replace)", &mut latencies);
}

async fn phase5_connection_storm(host: &str, port: u16) {
    let n_conns = 50;
    let ops_per_conn = 10;

    let start = Instant::now();
    let mut handles = Vec::new();
    let success = Arc::new(AtomicUsize::new(0));

    for _ in 0..n_conns {
        let host = host.to_string();
        let success = success.clone();
        handles.push(tokio::spawn(async move {
            let store = connect(&host, port).await;
            let room = new_room(&store, "storm").await;
            for i in 0..ops_per_conn {
                store
                    .insert_reservations(vec![hourly(room.id, i)])
                    .await
                    .expect("insert failed");
            }
            success.fetch_add(1, Ordering::Relaxed);
        }));
    }

    for h in handles {
        let _ = h.await;
    }

    let elapsed = start.elapsed();
    let ok = success.load(Ordering::Relaxed);
    println!(
        "  {n_conns} connections, {ops_per_conn} ops each: {ok}/{n_conns} succeeded in {:.2}s",
        elapsed.as_secs_f64()
    );
}

#[tokio::main]
async fn main() {
    let host = std::env::var("ROOMBOOK_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let port: u16 = std::env::var("ROOMBOOK_PORT")
        .unwrap_or_else(|_| "5433".into())
        .parse()
        .expect("invalid ROOMBOOK_PORT");

    println!("=== roombook stress benchmark ===");
    println!("target: {host}:{port}\n");

    println!("[phase 1] sequential write throughput");
    phase1_sequential(&host, port).await;

    println!("\n[phase 2] concurrent write throughput");
    phase2_concurrent(&host, port).await;

    println!("\n[phase 3] read latency under write load");
    phase3_read_under_load(&host, port).await;

    println!("\n[phase 4] series edits");
    phase4_series_edits(&host, port).await;

    println!("\n[phase 5] connection storm");
    phase5_connection_storm(&host, port).await;

    println!("\n=== benchmark complete ===");
}
