// CLI integration tests for block-time-diff and block-export.
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::process::{Command, Output};
use std::thread;

use serde_json::json;

fn time_diff_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_block-time-diff"))
}

fn export_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_block-export"))
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Serves `GET /block/{height}` from a fixed map of height -> ms since nemesis.
/// Unknown heights get the REST server's 404 envelope.
fn spawn_block_server(blocks: BTreeMap<u64, u64>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            let _ = serve_block_request(stream, &blocks);
        }
    });
    format!("http://{addr}")
}

fn serve_block_request(stream: TcpStream, blocks: &BTreeMap<u64, u64>) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 || header == "\r\n" {
            break;
        }
    }

    let path = request_line.split_whitespace().nth(1).unwrap_or("/");
    let height = path
        .strip_prefix("/block/")
        .and_then(|rest| rest.parse::<u64>().ok());
    let (status, body) = match height.and_then(|h| blocks.get(&h).map(|ms| (h, *ms))) {
        Some((height, millis)) => (
            "200 OK",
            json!({
                "meta": {"hash": "00", "numTransactions": 0},
                "block": {
                    "height": [height & 0xFFFF_FFFF, height >> 32],
                    "timestamp": [millis & 0xFFFF_FFFF, millis >> 32],
                }
            }),
        ),
        None => (
            "404 Not Found",
            json!({
                "code": "ResourceNotFound",
                "message": format!("no resource exists with id '{}'", path.trim_start_matches("/block/")),
            }),
        ),
    };
    let body = body.to_string();
    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )?;
    stream.flush()
}

fn read_csv(path: &Path) -> String {
    std::fs::read_to_string(path).expect("csv output")
}

#[test]
fn time_diff_writes_rows_for_heights_with_predecessors() {
    let temp = tempfile::tempdir().expect("tempdir");
    let base = 250_000_000_000u64;
    let url = spawn_block_server(BTreeMap::from([
        (100, base),
        (101, base + 5_000),
        (102, base + 9_000),
    ]));

    let output = time_diff_cmd()
        .args(["--start", "100", "--end", "102", "--url", &url, "--out-dir"])
        .arg(temp.path())
        .env("RUST_LOG", "info")
        .output()
        .expect("run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        read_csv(&temp.path().join("block_timestamp_diff.csv")),
        "Height,Time Diff (Seconds)\n101,5.00\n102,4.00\n"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Error retrieving block 99"));
    assert!(stdout.contains("Created csv file"));
}

#[test]
fn time_diff_rejects_equal_bounds() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = time_diff_cmd()
        .args(["--start", "7", "--end", "7", "--url", "http://127.0.0.1:9", "--out-dir"])
        .arg(temp.path())
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_text(&output).contains("error: make sure 'start' is smaller than 'end'"));
    assert!(!temp.path().join("block_timestamp_diff.csv").exists());
}

#[test]
fn time_diff_missing_url_is_usage_error() {
    let output = time_diff_cmd()
        .args(["--start", "1", "--end", "2"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn time_diff_zero_start_is_usage_error() {
    let output = time_diff_cmd()
        .args(["--start", "0", "--end", "2", "--url", "http://127.0.0.1:9"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_text(&output).contains("error: missing required flags"));
}

#[test]
fn export_rejects_inverted_range_before_connecting() {
    let output = export_cmd()
        .args(["--start", "9", "--end", "3", "--url", "mongodb://127.0.0.1:9"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn export_rejects_equal_bounds() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = export_cmd()
        .args(["--start", "7", "--end", "7", "--url", "mongodb://127.0.0.1:9", "--out-dir"])
        .arg(temp.path())
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_text(&output).contains("error: make sure 'start' is smaller than 'end'"));
    assert_eq!(std::fs::read_dir(temp.path()).expect("dir").count(), 0);
}

#[test]
fn export_rejects_malformed_database_url() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = export_cmd()
        .args(["--start", "1", "--end", "3", "--url", "not-a-connection-string", "--out-dir"])
        .arg(temp.path())
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_text(&output).contains("error: invalid database url"));
    assert_eq!(std::fs::read_dir(temp.path()).expect("dir").count(), 0);
}

#[test]
fn help_exits_zero() {
    for mut cmd in [time_diff_cmd(), export_cmd()] {
        let output = cmd.arg("--help").output().expect("help");
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("--start"));
    }
}
