use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

const MISSING_NOTE_MESSAGE: &str = "Please enter a description before selecting an emoji.";
const MISSING_EMOJI_MESSAGE: &str = "Please select an emoji.";

#[derive(Debug, Deserialize)]
struct HistoryRow {
    date: String,
    emoji: String,
    note: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    entries: Vec<HistoryRow>,
}

#[derive(Debug, Deserialize)]
struct WeeklySummary {
    dates: Vec<String>,
    scores: Vec<u8>,
    average: Option<f64>,
    label: String,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_temp_path(name: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("moodmate_http_{}_{}_{name}", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/catalog")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_moodmate"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", unique_temp_path("state.json"))
        .env("REPORT_DIR", unique_temp_path("reports"))
        // Nothing listens here, so every analysis call fails.
        .env("ANALYSIS_BASE_URL", "http://127.0.0.1:9")
        .env("ANALYSIS_TIMEOUT_SECS", "2")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn put_mood(
    client: &Client,
    server: &TestServer,
    uid: &str,
    date: &str,
    emoji: &str,
    note: &str,
) -> reqwest::Response {
    client
        .put(format!("{}/api/users/{uid}/moods/{date}", server.base_url))
        .json(&serde_json::json!({ "emoji": emoji, "note": note }))
        .send()
        .await
        .unwrap()
}

async fn history(client: &Client, server: &TestServer, uid: &str) -> HistoryResponse {
    client
        .get(format!("{}/api/users/{uid}/moods", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_recorded_mood_reads_back() {
    let server = shared_server().await;
    let client = Client::new();

    let response = put_mood(&client, &server, "roundtrip", "2024-06-01", "😊", "great day").await;
    assert!(response.status().is_success());

    let history = history(&client, &server, "roundtrip").await;
    assert_eq!(history.entries.len(), 1);
    let entry = &history.entries[0];
    assert_eq!(entry.date, "2024-06-01");
    assert_eq!(entry.emoji, "😊");
    assert_eq!(entry.note, "great day");
}

#[tokio::test]
async fn http_blank_note_is_rejected() {
    let server = shared_server().await;
    let client = Client::new();

    let response = put_mood(&client, &server, "blank", "2024-06-01", "😊", "   ").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), MISSING_NOTE_MESSAGE);

    assert!(history(&client, &server, "blank").await.entries.is_empty());
}

#[tokio::test]
async fn http_missing_emoji_is_a_validation_error() {
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .put(format!("{}/api/users/noemoji/moods/2024-06-01", server.base_url))
        .json(&serde_json::json!({ "note": "forgot the face" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), MISSING_EMOJI_MESSAGE);

    assert!(history(&client, &server, "noemoji").await.entries.is_empty());
}

#[tokio::test]
async fn http_new_user_has_empty_history_and_no_data_summary() {
    let server = shared_server().await;
    let client = Client::new();

    assert!(history(&client, &server, "fresh").await.entries.is_empty());

    let summary: WeeklySummary = client
        .get(format!("{}/api/users/fresh/summary/weekly", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(summary.dates.is_empty());
    assert_eq!(summary.average, None);
    assert_eq!(summary.label, "No mood data to analyze.");
}

#[tokio::test]
async fn http_weekly_summary_uses_last_seven_entries() {
    let server = shared_server().await;
    let client = Client::new();

    for day in 1..=9 {
        let emoji = if day <= 2 { "😢" } else { "😄" };
        let response = put_mood(
            &client,
            &server,
            "weekly",
            &format!("2024-06-{day:02}"),
            emoji,
            "logged",
        )
        .await;
        assert!(response.status().is_success());
    }
    // Unknown glyphs are stored as-is and score as neutral.
    put_mood(&client, &server, "weekly", "2024-06-10", "🦀", "ok").await;

    let summary: WeeklySummary = client
        .get(format!("{}/api/users/weekly/summary/weekly", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary.dates.len(), 7);
    assert_eq!(summary.dates.first().map(String::as_str), Some("2024-06-04"));
    assert_eq!(summary.scores, vec![5, 5, 5, 5, 5, 5, 3]);
    assert_eq!(summary.average, Some(4.71));
    assert_eq!(summary.label, "Excellent");
}

#[tokio::test]
async fn http_report_downloads_pdf() {
    let server = shared_server().await;
    let client = Client::new();
    put_mood(&client, &server, "reporter", "2024-06-01", "❤️‍🩹", "healing").await;

    let response = client
        .get(format!("{}/api/users/reporter/report", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/pdf"
    );
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("moodmate_report.pdf"));
    let bytes = response.bytes().await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn http_ai_summary_requires_session() {
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/users/anonymous/summary/ai", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn http_ai_summary_backend_down_shows_fallback() {
    let server = shared_server().await;
    let client = Client::new();

    put_mood(&client, &server, "offline", "2024-06-01", "😊", "fine").await;
    let response = client
        .post(format!("{}/api/session", server.base_url))
        .json(&serde_json::json!({
            "uid": "offline",
            "display_name": "Ana",
            "email": "ana@example.com"
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    // Signing in merges the profile and leaves the entry alone.
    assert_eq!(history(&client, &server, "offline").await.entries.len(), 1);

    let response = client
        .post(format!("{}/api/users/offline/summary/ai", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        response.text().await.unwrap(),
        "Could not generate summary at this time."
    );

    let response = client
        .delete(format!("{}/api/session/offline", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn http_dashboard_form_shows_validation_message() {
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/users/former/moods", server.base_url))
        .form(&[("date", "2024-06-01"), ("emoji", "😊"), ("note", " ")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.text().await.unwrap().contains(MISSING_NOTE_MESSAGE));
}
