//! ferry demo: store files in the relay, print their receipts, shut down.
//!
//! ```text
//! ferry-cli [--ttl MINUTES] FILE...
//! ```
//!
//! Configuration comes from `FERRY_*` environment variables (see
//! `ferry_core::config`); logging from `RUST_LOG`.

use std::error::Error;
use std::path::Path;

use ferry_core::observability::init_logging;
use ferry_core::{GCLoop, Relay, Store, StoreConfig};

struct Args {
    ttl: Option<String>,
    files: Vec<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut ttl = None;
    let mut files = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--ttl" => ttl = Some(args.next().ok_or("--ttl needs a value")?),
            "-h" | "--help" => return Err(String::new()),
            _ => files.push(arg),
        }
    }
    if files.is_empty() {
        return Err("no files given".to_string());
    }
    Ok(Args { ttl, files })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    init_logging("info")?;

    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            if !msg.is_empty() {
                eprintln!("error: {msg}");
            }
            eprintln!("usage: ferry-cli [--ttl MINUTES] FILE...");
            std::process::exit(2);
        }
    };

    // (A) Store を用意し、前回の残骸を掃除
    let config = StoreConfig::from_env()?;
    let store = Store::open(&config).await?;
    store.recover().await?;

    // (B) 回収ループを起動
    let gc = GCLoop::spawn(store.clone(), config.sweep_interval);
    let relay = Relay::new(store.clone());

    // (C) ファイルを投入
    for file in &args.files {
        let name = Path::new(file)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file.as_str());
        let mut body = match tokio::fs::File::open(file).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(file = %file, error = %e, "cannot read file");
                continue;
            }
        };
        match relay.handle_upload(name, &mut body, args.ttl.as_deref()).await {
            Ok(receipt) => println!("{}", serde_json::to_string(&receipt)?),
            Err(e) => tracing::error!(file = %file, error = %e, "upload failed"),
        }
    }

    // (D) 現在の状態を表示
    println!("{}", serde_json::to_string_pretty(&store.list())?);
    tracing::info!(stats = ?store.stats(), "store status");

    // (E) デモなので回収ループを止めて終了
    gc.shutdown_and_join().await;
    Ok(())
}
