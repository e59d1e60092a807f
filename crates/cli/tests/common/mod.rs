//! Shared fixtures for CLI and server integration tests: a canned node
//! endpoint and temp-dir relay configs.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONTRACT: &str = "abc123";
pub const CALLBACK_ROUTE: &str = "/api/v1/nft-dapp";

/// Start a node stand-in that answers every request with one chain-data
/// entry carrying `payload`. Returns its base URL.
pub fn stub_node(payload: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub node");
    let addr = listener.local_addr().expect("stub node address");
    let body = serde_json::json!({
        "status": true,
        "message": "Fetched Smart Contract Data",
        "result": null,
        "SCTDataReply": [
            {"BlockNo": 1, "BlockId": "1-genesis", "SmartContractData": payload}
        ],
    })
    .to_string();

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{}", addr)
}

/// Consume one request (headers plus Content-Length bytes of body).
fn read_request(stream: &mut TcpStream) {
    stream.set_read_timeout(Some(Duration::from_secs(5))).ok();
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return;
            }
        }
    }
}

/// Write a relay.toml into `dir` with a sqlite ledger in the same dir and
/// one `nft` contract executed by `sh -c <script>`.
pub fn write_config(dir: &Path, node_address: &str, script: &str) -> PathBuf {
    let content = format!(
        r#"user_did = "bafybmi-test"
node_address = "{node}"
ledger = "sqlite"
ledger_path = "{ledger}"
fetch_timeout_secs = 5
invoke_timeout_secs = 10

[contracts.nft]
contract_hash = "{contract}"
callback_url = "{route}"
runtime = {{ kind = "command", program = "sh", args = ["-c", "{script}"] }}
"#,
        node = node_address,
        ledger = dir.join("requests.db").display(),
        contract = CONTRACT,
        route = CALLBACK_ROUTE,
        script = script,
    );
    let path = dir.join("relay.toml");
    std::fs::write(&path, content).expect("write relay.toml");
    path
}
