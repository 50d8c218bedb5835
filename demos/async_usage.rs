//! Async usage examples for the connection pool

use esox_connpool::{PoolConfiguration, PoolRegistry};
use std::net::TcpListener;
use std::thread;

#[tokio::main]
async fn main() {
    println!("=== EsoxSolutions.ConnectionPool - Async Examples ===\n");

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let target = listener.local_addr().unwrap().to_string();
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });

    let registry = PoolRegistry::with_tcp(PoolConfiguration::new().with_pool_size(4));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let registry = registry.clone();
        let target = target.clone();
        tasks.push(tokio::spawn(async move {
            let conn = registry.get_connection_async(&target).await?;
            println!("   Task {} got local port {}", i, conn.local_addr().map(|a| a.port()).unwrap_or(0));
            Ok::<_, esox_connpool::PoolError>(())
        }));
    }

    for task in tasks {
        if let Ok(Err(e)) = task.await {
            println!("   Task failed: {}", e);
        }
    }

    for metrics in registry.get_metrics() {
        println!("\nMetrics for {}:", metrics.target);
        for (key, value) in metrics.export() {
            println!("   {}: {}", key, value);
        }
    }

    #[cfg(feature = "metrics")]
    if let Ok(output) = registry.export_metrics_prometheus(None) {
        println!("\nPrometheus:\n{}", output);
    }
}
