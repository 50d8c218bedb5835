//! Basic usage examples for the connection pool

use esox_connpool::{check_state, Connection, PoolConfiguration, PoolRegistry};
use std::io::Write;
use std::net::TcpListener;
use std::thread;

fn main() {
    println!("=== EsoxSolutions.ConnectionPool - Basic Examples ===\n");

    let target = start_echo_sink();

    // Example 1: Round-robin acquisition
    round_robin(&target);

    // Example 2: Broken connections are replaced
    self_healing(&target);

    // Example 3: Unreachable targets
    unreachable();
}

fn start_echo_sink() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    addr
}

fn round_robin(target: &str) {
    println!("1. Round Robin:");
    let registry = PoolRegistry::with_tcp(PoolConfiguration::new().with_pool_size(3));

    for _ in 0..6 {
        let conn = registry.get_connection(target).unwrap();
        let mut stream = conn.stream();
        stream.write_all(b"ping\n").unwrap();
        println!("   Sent on local port {}", conn.local_addr().unwrap().port());
    }
    println!();
}

fn self_healing(target: &str) {
    println!("2. Self Healing:");
    let registry = PoolRegistry::with_tcp(PoolConfiguration::new().with_pool_size(1));

    let conn = registry.get_connection(target).unwrap();
    conn.mark_transient_failure();
    println!("   Marked failed: {:?}", check_state(&*conn));

    let fresh = registry.get_connection(target).unwrap();
    println!("   Old state: {}, new state: {}", conn.state(), fresh.state());

    let health = registry.pool(target).unwrap().get_health_status();
    println!("   Healthy slots: {}/{}\n", health.healthy_slots, health.capacity);
}

fn unreachable() {
    println!("3. Unreachable Target:");
    let registry = PoolRegistry::with_tcp(PoolConfiguration::default());

    match registry.get_connection("127.0.0.1:1") {
        Ok(_) => println!("   Unexpectedly connected"),
        Err(e) => println!("   Error: {}", e),
    }
    println!("   Registered pools: {}", registry.len());
}
